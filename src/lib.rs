//! # chancap
//!
//! Channel capacity of a binary-input signaling channel, estimated from samples.
//!
//! A kinetic-proofreading network is driven by one of two ligand classes,
//! "self" or "foreign", and produces a continuous readout. Given simulated
//! readouts for each class, this crate estimates how many bits the readout
//! carries about the class label:
//!
//! ```text
//! C = Σ_i [ w·f_i·log2(f_i / m_i) + (1-w)·s_i·log2(s_i / m_i) ] · Δx
//!
//! where:
//!   f_i, s_i = histogram densities of the foreign / self readouts in bin i
//!   m_i      = w·f_i + (1-w)·s_i   (mixture density, w = prior, 0.5 by default)
//!   Δx       = bin width
//! ```
//!
//! ## Pipeline
//!
//! | Step | Module | What happens |
//! |------|--------|--------------|
//! | Load | [`samples`] | Two flat numeric files become a [`SampleStore`] |
//! | Frame | [`binning`] | A robust rule (Freedman-Diaconis by default) finds the joint support |
//! | Search | [`capacity`] | Bin count grows until the mixture integrates to ≥ 0.99 |
//! | Report | [`capacity`] | `(capacity, resolution, normalization_integral)` plus a status flag |
//!
//! ## Quick Start
//!
//! ```rust
//! use chancap::{CapacityEstimator, EstimatorConfig, SampleStore, Status};
//!
//! let foreign: Vec<f64> = (0..1000).map(|i| (i % 100) as f64 / 100.0).collect();
//! let self_: Vec<f64> = foreign.iter().map(|x| x + 100.0).collect();
//! let store = SampleStore::new(foreign, self_);
//!
//! let est = CapacityEstimator::new(EstimatorConfig::default())
//!     .unwrap()
//!     .estimate(&store)
//!     .unwrap();
//!
//! // Completely separated classes carry exactly one bit.
//! assert_eq!(est.capacity, 1.0);
//! assert_eq!(est.status, Status::Degenerate);
//! ```
//!
//! ## What Can Go Wrong
//!
//! 1. **Empty bins**: tails of a histogram are mostly zero. `0·log(0/m)` and
//!    `0/0` are sanitized to a zero contribution *after* the log-ratio is taken.
//! 2. **Point masses**: when most samples sit on a single value the mixture's
//!    trapezoid integral never reaches the threshold. The search stops at
//!    `max_resolution` and flags [`Status::NonConvergence`].
//! 3. **Finite samples**: histogram MI is biased upward by roughly
//!    `(bins - 1) / (2 n ln 2)` bits; two samples of the same distribution will
//!    not read exactly 0.
//! 4. **Disjoint supports**: no bin holds both classes, so the capacity is
//!    fixed by each class's trapezoid mass (it equals the normalization
//!    integral for 0.5/0.5). The estimate is clamped to the prior's entropy
//!    (1 bit for 0.5/0.5) and flagged [`Status::Degenerate`].
//!
//! ## References
//!
//! - Shannon (1948). "A Mathematical Theory of Communication"
//! - Freedman & Diaconis (1981). "On the histogram as a density estimator: L2 theory"
//! - Cover & Thomas (2006). "Elements of Information Theory"

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod batch;
pub mod binning;
pub mod capacity;
pub mod config;
pub mod samples;

pub use binning::{density, make_edges, rule_edges, support_bounds, BinRule};
pub use capacity::{
    entropy_capacity, log_ratio_capacity, CapacityEstimate, CapacityEstimator, ResolutionPass,
    Status,
};
pub use config::{EstimatorConfig, Formulation};
pub use samples::SampleStore;

/// Which of the two input classes a sample set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Class {
    Foreign,
    #[serde(rename = "self")]
    SelfLigand,
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Class::Foreign => f.write_str("foreign"),
            Class::SelfLigand => f.write_str("self"),
        }
    }
}

/// Error types for loading samples and estimating capacity.
#[derive(Debug, Error)]
pub enum Error {
    #[error("input not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: not a number: {token:?}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        token: String,
    },

    #[error("{0} sample set is empty")]
    EmptySampleSet(Class),

    #[error("resolution must be a positive bin count (got {0})")]
    InvalidResolution(usize),

    #[error("invalid bin bounds: lo = {lo}, hi = {hi}")]
    InvalidBounds { lo: f64, hi: f64 },

    #[error("invalid estimator configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown binning rule {0:?} (expected fd, scott, sturges, sqrt, rice or auto)")]
    UnknownRule(String),

    #[error("failed to parse configuration {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("batch table {}: {source}", path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("batch table {} has no {column:?} column", path.display())]
    MissingColumn { path: PathBuf, column: String },
}

pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Shared numerics: integration, entropy terms, rounding
// =============================================================================

/// Trapezoidal integral of uniformly spaced samples `y` with spacing `dx`.
///
/// Same convention as `numpy.trapz(y, dx=dx)`: the two end samples carry half
/// weight, so a histogram whose mass sits in its edge bins integrates to less
/// than one. Fewer than two samples integrate to 0.
///
/// # Arguments
///
/// * `y` - Per-bin values, one per bin
/// * `dx` - Bin width
///
/// # Example
///
/// ```rust
/// use chancap::trapezoid;
///
/// // A flat density of 1 over 4 bins of width 0.25 loses half of each edge bin.
/// let y = [1.0, 1.0, 1.0, 1.0];
/// assert!((trapezoid(&y, 0.25) - 0.75).abs() < 1e-12);
///
/// assert_eq!(trapezoid(&[3.0], 1.0), 0.0);
/// ```
pub fn trapezoid(y: &[f64], dx: f64) -> f64 {
    if y.len() < 2 {
        return 0.0;
    }
    let interior: f64 = y[1..y.len() - 1].iter().sum();
    dx * (interior + 0.5 * (y[0] + y[y.len() - 1]))
}

/// `x · log2(x)` with the `0 · log 0 = 0` convention.
///
/// Any non-finite logarithm (x = 0, or x negative from round-off) contributes 0.
pub fn xlog2x(x: f64) -> f64 {
    weighted_log2(x, x)
}

/// `weight · log2(ratio)`, sanitized: a zero weight or a non-finite log is 0.
///
/// The log is taken first and checked afterwards, so `0/0 = NaN` and
/// `log2(0) = -inf` are both told apart from a genuine zero density.
pub(crate) fn weighted_log2(weight: f64, ratio: f64) -> f64 {
    let l = ratio.log2();
    if weight == 0.0 || !l.is_finite() {
        return 0.0;
    }
    let v = weight * l;
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Binary entropy H(w) = -w log2 w - (1-w) log2 (1-w), in bits.
///
/// This is the capacity ceiling of a two-class channel with prior `w`.
///
/// # Example
///
/// ```rust
/// use chancap::binary_entropy;
///
/// assert_eq!(binary_entropy(0.5), 1.0);
/// assert_eq!(binary_entropy(0.0), 0.0);
/// assert!(binary_entropy(0.2) < 1.0);
/// ```
pub fn binary_entropy(w: f64) -> f64 {
    -(xlog2x(w) + xlog2x(1.0 - w))
}

/// Round `x` to `decimals` decimal places (half away from zero).
pub(crate) fn round_to(x: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (x * scale).round() / scale
}
