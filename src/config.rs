//! Estimator configuration.
//!
//! Every knob has a default matching the classic search: start at 50 bins,
//! step by 50, stop once the mixture integrates to 0.99, give up at 10000.
//! A JSON file may set any subset of fields:
//!
//! ```json
//! { "prior": 0.5, "threshold": 0.99, "rule": "fd", "max_resolution": 10000 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::binning::BinRule;
use crate::{Error, Result};

/// Which capacity integral the search reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formulation {
    /// `w·f·log2(f/m) + (1-w)·s·log2(s/m)` per bin.
    #[default]
    LogRatio,
    /// `H(m) - w·H(f) - (1-w)·H(s)` per bin.
    Entropy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EstimatorConfig {
    /// Prior probability of the foreign class. The self class gets `1 - prior`.
    pub prior: f64,
    /// Minimum trapezoid mass of the mixture density to accept a resolution.
    pub threshold: f64,
    /// Bin count of the first pass.
    pub initial_resolution: usize,
    /// Bins added after each failed pass.
    pub step: usize,
    /// Last resolution tried before reporting non-convergence.
    pub max_resolution: usize,
    /// Rule used to find each class's support.
    pub rule: BinRule,
    /// Decimal places at which the capacity and the normalization integral
    /// are compared for the disjoint-support clamp.
    pub degeneracy_decimals: u32,
    pub formulation: Formulation,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            prior: 0.5,
            threshold: 0.99,
            initial_resolution: 50,
            step: 50,
            max_resolution: 10_000,
            rule: BinRule::FreedmanDiaconis,
            degeneracy_decimals: 3,
            formulation: Formulation::LogRatio,
        }
    }
}

impl EstimatorConfig {
    /// Read a JSON config; missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: Self = serde_json::from_str(&text).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.prior > 0.0 && self.prior < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "prior must lie in (0, 1), got {}",
                self.prior
            )));
        }
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "threshold must lie in (0, 1], got {}",
                self.threshold
            )));
        }
        if self.initial_resolution == 0 {
            return Err(Error::InvalidResolution(0));
        }
        if self.step == 0 {
            return Err(Error::InvalidConfig("step must be positive".into()));
        }
        if self.max_resolution < self.initial_resolution {
            return Err(Error::InvalidConfig(format!(
                "max_resolution {} is below initial_resolution {}",
                self.max_resolution, self.initial_resolution
            )));
        }
        if self.degeneracy_decimals > 15 {
            return Err(Error::InvalidConfig(
                "degeneracy_decimals above 15 exceeds f64 precision".into(),
            ));
        }
        Ok(())
    }
}
