//! Calibration
//!
//! The conformal threshold: an exact order statistic of the calibration
//! scores with the finite-sample `(m + 1)` correction.
//!
//! For `m` scores and miscoverage `alpha` the threshold is the `k`-th
//! smallest score, `k = ceil((1 - alpha) * (m + 1))`. When `k > m` (small
//! calibration sets with small `alpha`) the rank is clipped to `m`, the
//! maximum score is used and [`Threshold::clipped`] is set. The region built
//! from a clipped threshold is still a valid, conservative upper bound.
use crate::errors::ConformalError;
use crate::utils::validate_alpha;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Conformal threshold `q̂` and the order statistic it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    /// The threshold value.
    pub q_hat: f64,
    /// Miscoverage level it was calibrated for.
    pub alpha: f64,
    /// 1-indexed rank of `q_hat` among the sorted scores, after clipping.
    pub rank: usize,
    /// Number of calibration scores.
    pub n_calibration: usize,
    /// True when `ceil((1 - alpha) * (m + 1))` exceeded `m` and the maximum score was used.
    pub clipped: bool,
}

/// Rank of the conformal order statistic for `m` scores.
///
/// Returns the 1-indexed rank, clipped to `m`, and whether clipping happened.
pub fn quantile_rank(m: usize, alpha: f64) -> Result<(usize, bool), ConformalError> {
    validate_alpha(alpha)?;
    if m == 0 {
        return Err(ConformalError::EmptyCalibration);
    }
    let k = ((1.0 - alpha) * (m as f64 + 1.0)).ceil() as usize;
    if k > m {
        Ok((m, true))
    } else {
        Ok((k.max(1), false))
    }
}

fn validate_scores(scores: &[f64]) -> Result<(), ConformalError> {
    if scores.is_empty() {
        return Err(ConformalError::EmptyCalibration);
    }
    match scores.iter().position(|s| s.is_nan()) {
        Some(i) => Err(ConformalError::InvalidParameter(
            "scores".to_string(),
            "non-NaN nonconformity scores".to_string(),
            format!("NaN at position {}", i),
        )),
        None => Ok(()),
    }
}

fn threshold_at(sorted_value: f64, alpha: f64, rank: usize, m: usize, clipped: bool) -> Threshold {
    if clipped {
        warn!(
            "Conformal rank ceil((1 - {}) * {}) exceeds the {} calibration scores, using the maximum score.",
            alpha,
            m + 1,
            m
        );
    }
    debug!("alpha={} m={} rank={} q_hat={}", alpha, m, rank, sorted_value);
    Threshold {
        q_hat: sorted_value,
        alpha,
        rank,
        n_calibration: m,
        clipped,
    }
}

/// Compute the conformal threshold for one miscoverage level.
///
/// * `scores` - Nonconformity scores of the calibration partition.
/// * `alpha` - Target miscoverage, strictly between 0 and 1.
pub fn conformal_quantile(scores: &[f64], alpha: f64) -> Result<Threshold, ConformalError> {
    validate_alpha(alpha)?;
    validate_scores(scores)?;
    let m = scores.len();
    let (rank, clipped) = quantile_rank(m, alpha)?;
    let mut work = scores.to_vec();
    let (_, kth, _) = work.select_nth_unstable_by(rank - 1, f64::total_cmp);
    Ok(threshold_at(*kth, alpha, rank, m, clipped))
}

/// Compute conformal thresholds for several miscoverage levels from one sort.
///
/// Thresholds are returned in the order of `alphas`.
pub fn conformal_quantiles(scores: &[f64], alphas: &[f64]) -> Result<Vec<Threshold>, ConformalError> {
    for alpha in alphas {
        validate_alpha(*alpha)?;
    }
    validate_scores(scores)?;
    let m = scores.len();
    let mut sorted = scores.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    alphas
        .iter()
        .map(|alpha| {
            let (rank, clipped) = quantile_rank(m, *alpha)?;
            Ok(threshold_at(sorted[rank - 1], *alpha, rank, m, clipped))
        })
        .collect()
}
