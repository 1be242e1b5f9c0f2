//! # Channel capacity by adaptive histogram search
//!
//! The capacity of the two-class channel under prior `w` is the mutual
//! information between the class label and the readout:
//!
//! ```text
//! C = ∫ [ w·f(x)·log2(f(x)/m(x)) + (1-w)·s(x)·log2(s(x)/m(x)) ] dx
//!   = ∫ [ -m·log2 m + w·f·log2 f + (1-w)·s·log2 s ] dx
//!
//! where m = w·f + (1-w)·s
//! ```
//!
//! Both forms are computed from histogram densities on a shared frame and
//! integrated with the trapezoid rule. They are algebraically equal per bin,
//! so disagreement beyond round-off points at a sanitization bug.
//!
//! ## Search
//!
//! ```text
//! resolution = 50
//! loop:
//!     edges   = make_edges(lo, hi, resolution)
//!     f, s    = density(foreign, edges), density(self, edges)
//!     norm    = trapz(m, dx)
//!     C       = trapz(terms, dx)
//!     if round(C_disjoint) == round(C): C = H(w), stop     (disjoint supports)
//!     if norm >= 0.99: stop                                (converged)
//!     if resolution + 50 > max_resolution: stop, flag      (non-convergence)
//!     resolution += 50
//! ```
//!
//! The trapezoid rule gives the first and last bins half weight, so the
//! normalization integral falls short of 1 by half the mass in the two edge
//! bins. Refining the frame shrinks those bins, which is what the search
//! waits for.
//!
//! When the two classes never share a bin, a foreign-only bin contributes
//! `-w·log2(w)·f` and a self-only bin `-(1-w)·log2(1-w)·s`, so the capacity
//! collapses to `-w·log2(w)·∫f - (1-w)·log2(1-w)·∫s`. The search compares the
//! capacity against that value and, on a match, reports the ceiling `H(w)`
//! (1 bit for 0.5/0.5). For `w = 0.5` the comparison reduces to
//! `norm == C`.

use serde::Serialize;

use crate::binning::{density, make_edges, support_bounds};
use crate::config::{EstimatorConfig, Formulation};
use crate::samples::SampleStore;
use crate::{binary_entropy, round_to, trapezoid, weighted_log2, xlog2x, Class, Error, Result};

/// How the resolution search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The mixture integrated past the threshold.
    Converged,
    /// No bin held both classes; capacity set to `H(prior)`.
    Degenerate,
    /// Hit `max_resolution` first. Numbers are from the last resolution tried.
    NonConvergence,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Converged => "converged",
            Status::Degenerate => "degenerate",
            Status::NonConvergence => "non_convergence",
        }
    }
}

/// Result of one estimator run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CapacityEstimate {
    /// Bits of information between class label and binned readout.
    pub capacity: f64,
    /// Bin count at which the search stopped.
    pub resolution: usize,
    /// Trapezoid mass of the mixture density at `resolution`.
    pub normalization_integral: f64,
    pub status: Status,
}

impl CapacityEstimate {
    /// `false` only for [`Status::NonConvergence`].
    pub fn converged(&self) -> bool {
        self.status != Status::NonConvergence
    }
}

/// Everything computed at one resolution.
#[derive(Debug, Clone)]
pub struct ResolutionPass {
    pub resolution: usize,
    pub edges: Vec<f64>,
    pub bin_width: f64,
    pub density_foreign: Vec<f64>,
    pub density_self: Vec<f64>,
    pub normalization_integral: f64,
    /// Log-ratio capacity, unclamped.
    pub log_ratio: f64,
    /// Entropy-decomposition capacity, unclamped.
    pub entropy: f64,
}

impl ResolutionPass {
    pub fn capacity(&self, formulation: Formulation) -> f64 {
        match formulation {
            Formulation::LogRatio => self.log_ratio,
            Formulation::Entropy => self.entropy,
        }
    }

    /// Capacity these densities would carry if no bin held both classes:
    /// `-w·log2(w)·∫f - (1-w)·log2(1-w)·∫s`.
    pub fn disjoint_capacity(&self, prior: f64) -> f64 {
        let mass_foreign = trapezoid(&self.density_foreign, self.bin_width);
        let mass_self = trapezoid(&self.density_self, self.bin_width);
        -xlog2x(prior) * mass_foreign - xlog2x(1.0 - prior) * mass_self
    }
}

/// Mixture density `w·f + (1-w)·s`.
pub fn mixture(density_foreign: &[f64], density_self: &[f64], prior: f64) -> Vec<f64> {
    density_foreign
        .iter()
        .zip(density_self)
        .map(|(&f, &s)| prior * f + (1.0 - prior) * s)
        .collect()
}

/// Capacity from per-bin log-ratios against the mixture:
/// `trapz(w·f·log2(f/m) + (1-w)·s·log2(s/m), dx)`.
///
/// Each term is sanitized after its ratio is formed: a zero density, a NaN
/// from `0/0`, or an infinite log contributes 0.
///
/// # Examples
///
/// ```rust
/// use chancap::log_ratio_capacity;
///
/// // Same density: nothing to learn.
/// let f = [0.0, 1.0, 1.0, 0.0];
/// assert!(log_ratio_capacity(&f, &f, 1.0, 0.5).abs() < 1e-12);
///
/// // Disjoint bins: every term is half its mixture mass.
/// let f = [2.0, 0.0, 0.0];
/// let s = [0.0, 0.0, 2.0];
/// assert!((log_ratio_capacity(&f, &s, 1.0, 0.5) - 1.0).abs() < 1e-12);
/// ```
pub fn log_ratio_capacity(
    density_foreign: &[f64],
    density_self: &[f64],
    dx: f64,
    prior: f64,
) -> f64 {
    let terms: Vec<f64> = density_foreign
        .iter()
        .zip(density_self)
        .map(|(&f, &s)| {
            let m = prior * f + (1.0 - prior) * s;
            weighted_log2(prior * f, f / m) + weighted_log2((1.0 - prior) * s, s / m)
        })
        .collect();
    trapezoid(&terms, dx)
}

/// Capacity from the entropy decomposition `H(m) - w·H(f) - (1-w)·H(s)`,
/// with no log-ratio anywhere. Agrees with [`log_ratio_capacity`] to
/// round-off on the same densities.
pub fn entropy_capacity(
    density_foreign: &[f64],
    density_self: &[f64],
    dx: f64,
    prior: f64,
) -> f64 {
    let terms: Vec<f64> = density_foreign
        .iter()
        .zip(density_self)
        .map(|(&f, &s)| {
            let m = prior * f + (1.0 - prior) * s;
            -xlog2x(m) + prior * xlog2x(f) + (1.0 - prior) * xlog2x(s)
        })
        .collect();
    trapezoid(&terms, dx)
}

/// Adaptive-resolution capacity estimator.
#[derive(Debug, Clone, Default)]
pub struct CapacityEstimator {
    config: EstimatorConfig,
}

impl CapacityEstimator {
    pub fn new(config: EstimatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn estimate(&self, store: &SampleStore) -> Result<CapacityEstimate> {
        self.estimate_samples(store.foreign(), store.self_samples())
    }

    /// Run the resolution search on two sample sets.
    ///
    /// Fails fast on an empty set. Non-convergence is not an error: check
    /// [`CapacityEstimate::status`].
    pub fn estimate_samples(&self, foreign: &[f64], self_: &[f64]) -> Result<CapacityEstimate> {
        check_non_empty(foreign, self_)?;
        let cfg = &self.config;
        let (lo, hi) = support_bounds(foreign, self_, cfg.rule)?;
        let ceiling = binary_entropy(cfg.prior);

        let mut resolution = cfg.initial_resolution;
        loop {
            let pass = self.pass(foreign, self_, lo, hi, resolution)?;
            let norm = pass.normalization_integral;
            let capacity = pass.capacity(cfg.formulation);
            tracing::debug!(resolution, norm, capacity, "resolution pass");

            let d = cfg.degeneracy_decimals;
            let disjoint = pass.disjoint_capacity(cfg.prior);
            if round_to(norm, d) > 0.0 && round_to(disjoint, d) == round_to(capacity, d) {
                tracing::debug!(resolution, norm, capacity, "disjoint supports, clamping");
                return Ok(CapacityEstimate {
                    capacity: ceiling,
                    resolution,
                    normalization_integral: norm,
                    status: Status::Degenerate,
                });
            }

            let status = if norm >= cfg.threshold {
                Status::Converged
            } else if resolution + cfg.step > cfg.max_resolution {
                tracing::warn!(
                    resolution,
                    norm,
                    threshold = cfg.threshold,
                    "normalization threshold not reached, reporting best effort"
                );
                Status::NonConvergence
            } else {
                resolution += cfg.step;
                continue;
            };

            return Ok(CapacityEstimate {
                capacity: capacity.clamp(0.0, ceiling),
                resolution,
                normalization_integral: norm,
                status,
            });
        }
    }

    /// One pass of the search at a fixed resolution, for inspection.
    pub fn capacity_at_resolution(
        &self,
        foreign: &[f64],
        self_: &[f64],
        resolution: usize,
    ) -> Result<ResolutionPass> {
        check_non_empty(foreign, self_)?;
        let (lo, hi) = support_bounds(foreign, self_, self.config.rule)?;
        self.pass(foreign, self_, lo, hi, resolution)
    }

    fn pass(
        &self,
        foreign: &[f64],
        self_: &[f64],
        lo: f64,
        hi: f64,
        resolution: usize,
    ) -> Result<ResolutionPass> {
        let prior = self.config.prior;
        let edges = make_edges(lo, hi, resolution)?;
        let bin_width = edges[1] - edges[0];
        let density_foreign = density(foreign, &edges);
        let density_self = density(self_, &edges);

        let mix = mixture(&density_foreign, &density_self, prior);
        let normalization_integral = trapezoid(&mix, bin_width);
        let log_ratio = log_ratio_capacity(&density_foreign, &density_self, bin_width, prior);
        let entropy = entropy_capacity(&density_foreign, &density_self, bin_width, prior);

        Ok(ResolutionPass {
            resolution,
            edges,
            bin_width,
            density_foreign,
            density_self,
            normalization_integral,
            log_ratio,
            entropy,
        })
    }
}

fn check_non_empty(foreign: &[f64], self_: &[f64]) -> Result<()> {
    if foreign.is_empty() {
        return Err(Error::EmptySampleSet(Class::Foreign));
    }
    if self_.is_empty() {
        return Err(Error::EmptySampleSet(Class::SelfLigand));
    }
    Ok(())
}
