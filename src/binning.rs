//! # Adaptive binning
//!
//! Both classes are histogrammed on one shared, uniformly spaced frame.
//!
//! The frame's *extent* comes from an automatic bin rule applied to each
//! sample set on its own, so one class's outliers cannot distort the other's
//! rule. The frame's *resolution* is not taken from the rule: the capacity
//! search in [`crate::capacity`] chooses the bin count.
//!
//! ## Rules
//!
//! | Rule | Bin width h | Notes |
//! |------|-------------|-------|
//! | `fd` | 2·IQR·n^(-1/3) | Freedman-Diaconis, outlier resistant (default) |
//! | `scott` | (24√π / n)^(1/3)·σ | assumes near-normal data |
//! | `sturges` | range / (log2 n + 1) | few bins, small n |
//! | `sqrt` | range / √n | |
//! | `rice` | range / (2·n^(1/3)) | |
//! | `auto` | min(fd, sturges) | sturges when IQR = 0 |
//!
//! A rule that degenerates (zero IQR, zero spread, a single sample) falls back
//! to the 2-edge span `[min, max]`.
//!
//! # Examples
//!
//! ```rust
//! use chancap::{make_edges, support_bounds, BinRule};
//!
//! let a = [0.0, 1.0, 2.0, 3.0];
//! let b = [5.0, 6.0, 7.0];
//! let (lo, hi) = support_bounds(&a, &b, BinRule::FreedmanDiaconis).unwrap();
//! assert_eq!((lo, hi), (0.0, 7.0));
//!
//! let edges = make_edges(lo, hi, 7).unwrap();
//! assert_eq!(edges.len(), 8);
//! assert_eq!(edges[1] - edges[0], 1.0);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Class, Error, Result};

/// Upper bound on the number of bins a rule may ask for.
///
/// Only the rule's outer edges feed the frame, so a huge count buys nothing.
const MAX_RULE_BINS: usize = 1 << 20;

/// Automatic histogram bin rule, named as in `numpy.histogram_bin_edges`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BinRule {
    #[default]
    #[serde(rename = "fd")]
    FreedmanDiaconis,
    #[serde(rename = "scott")]
    Scott,
    #[serde(rename = "sturges")]
    Sturges,
    #[serde(rename = "sqrt")]
    Sqrt,
    #[serde(rename = "rice")]
    Rice,
    #[serde(rename = "auto")]
    Auto,
}

impl BinRule {
    pub fn name(self) -> &'static str {
        match self {
            BinRule::FreedmanDiaconis => "fd",
            BinRule::Scott => "scott",
            BinRule::Sturges => "sturges",
            BinRule::Sqrt => "sqrt",
            BinRule::Rice => "rice",
            BinRule::Auto => "auto",
        }
    }

    /// Bin width this rule picks for `sorted` (ascending, finite, non-empty).
    ///
    /// May be zero or non-finite; callers treat that as degenerate.
    fn width(self, sorted: &[f64]) -> f64 {
        let n = sorted.len() as f64;
        let range = sorted[sorted.len() - 1] - sorted[0];
        match self {
            BinRule::FreedmanDiaconis => {
                let iqr = quantile(sorted, 0.75) - quantile(sorted, 0.25);
                2.0 * iqr * n.powf(-1.0 / 3.0)
            }
            BinRule::Scott => {
                let factor = (24.0 * std::f64::consts::PI.sqrt() / n).powf(1.0 / 3.0);
                factor * std_dev(sorted)
            }
            BinRule::Sturges => range / (n.log2() + 1.0),
            BinRule::Sqrt => range / n.sqrt(),
            BinRule::Rice => range / (2.0 * n.powf(1.0 / 3.0)),
            BinRule::Auto => {
                let fd = BinRule::FreedmanDiaconis.width(sorted);
                let sturges = BinRule::Sturges.width(sorted);
                if fd > 0.0 {
                    fd.min(sturges)
                } else {
                    sturges
                }
            }
        }
    }
}

impl fmt::Display for BinRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BinRule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fd" | "freedman-diaconis" => Ok(BinRule::FreedmanDiaconis),
            "scott" => Ok(BinRule::Scott),
            "sturges" => Ok(BinRule::Sturges),
            "sqrt" => Ok(BinRule::Sqrt),
            "rice" => Ok(BinRule::Rice),
            "auto" => Ok(BinRule::Auto),
            _ => Err(Error::UnknownRule(s.to_string())),
        }
    }
}

/// Linear-interpolation quantile of ascending `sorted` (numpy's default).
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = pos - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

fn std_dev(xs: &[f64]) -> f64 {
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    (xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt()
}

/// Automatic histogram edges for one sample set.
///
/// The edges span `[min, max]` of the finite samples with the rule's bin
/// count. Degenerate rules return `[min, max]`; an empty set returns no edges.
pub fn rule_edges(samples: &[f64], rule: BinRule) -> Vec<f64> {
    let mut sorted: Vec<f64> = samples.iter().copied().filter(|x| x.is_finite()).collect();
    if sorted.is_empty() {
        return Vec::new();
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let (min, max) = (sorted[0], sorted[sorted.len() - 1]);
    let width = rule.width(&sorted);
    if !(width.is_finite() && width > 0.0) || max <= min {
        return vec![min, max];
    }

    let bins = ((max - min) / width).ceil();
    let bins = if bins.is_finite() && bins >= 1.0 {
        (bins as usize).min(MAX_RULE_BINS)
    } else {
        1
    };
    linspace(min, max, bins)
}

/// Shared frame `(lo, hi)` spanning both sets' automatic edges.
///
/// A set with no finite sample is reported as [`Error::EmptySampleSet`] for
/// its class. When every sample of both classes sits on one value the frame
/// is widened to `[v - 0.5, v + 0.5]` so bins keep a positive width.
pub fn support_bounds(foreign: &[f64], self_: &[f64], rule: BinRule) -> Result<(f64, f64)> {
    let ea = rule_edges(foreign, rule);
    if ea.is_empty() {
        return Err(Error::EmptySampleSet(Class::Foreign));
    }
    let eb = rule_edges(self_, rule);
    if eb.is_empty() {
        return Err(Error::EmptySampleSet(Class::SelfLigand));
    }

    let lo = ea.iter().chain(eb.iter()).copied().fold(f64::INFINITY, f64::min);
    let hi = ea.iter().chain(eb.iter()).copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        return Ok((lo - 0.5, hi + 0.5));
    }
    Ok((lo, hi))
}

/// `resolution + 1` evenly spaced edges from `lo` to `hi`, both exact.
pub fn make_edges(lo: f64, hi: f64, resolution: usize) -> Result<Vec<f64>> {
    if resolution == 0 {
        return Err(Error::InvalidResolution(resolution));
    }
    if !(lo.is_finite() && hi.is_finite()) || hi <= lo {
        return Err(Error::InvalidBounds { lo, hi });
    }
    Ok(linspace(lo, hi, resolution))
}

fn linspace(lo: f64, hi: f64, bins: usize) -> Vec<f64> {
    let step = (hi - lo) / bins as f64;
    let mut edges: Vec<f64> = (0..=bins).map(|i| lo + i as f64 * step).collect();
    edges[bins] = hi;
    edges
}

/// Index of the bin holding `x`, or `None` outside `[edges[0], edges[n]]`.
///
/// Bins are half-open `[e_i, e_{i+1})` except the last, which is closed.
fn bin_index(x: f64, edges: &[f64]) -> Option<usize> {
    let n = edges.len() - 1;
    let (lo, hi) = (edges[0], edges[n]);
    if !(x >= lo && x <= hi) {
        return None;
    }
    if x == hi {
        return Some(n - 1);
    }
    // Arithmetic guess, then settle against the actual edges.
    let mut i = (((x - lo) / (hi - lo)) * n as f64).floor() as usize;
    i = i.min(n - 1);
    while i > 0 && x < edges[i] {
        i -= 1;
    }
    while i + 1 < n && x >= edges[i + 1] {
        i += 1;
    }
    Some(i)
}

/// Probability density histogram: `(count_in_bin / total) / bin_width`.
///
/// `total` is the full sample count, including any samples outside the
/// edges. An empty sample set gives an all-zero vector.
pub fn density(samples: &[f64], edges: &[f64]) -> Vec<f64> {
    if edges.len() < 2 {
        return Vec::new();
    }
    let bins = edges.len() - 1;
    let mut counts = vec![0usize; bins];
    for &x in samples {
        if let Some(i) = bin_index(x, edges) {
            counts[i] += 1;
        }
    }

    if samples.is_empty() {
        return vec![0.0; bins];
    }
    let total = samples.len() as f64;
    counts
        .iter()
        .zip(edges.windows(2))
        .map(|(&c, w)| c as f64 / total / (w[1] - w[0]))
        .collect()
}
