//! Signed quantile-exceedance score for conformalized quantile regression.
use crate::data::{ModelOutput, Outcomes};
use crate::errors::ConformalError;
use crate::region::{Interval, Region};
use crate::score::{
    map_index, validate_not_nan, validate_outcomes, validate_region_inputs, validate_score_inputs, ScoreFunction,
    Task,
};
use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Deserialize, Serialize, Clone)]
/// Signed exceedance `s = max(t_lo - y, y - t_hi)`.
///
/// Negative when the outcome lies strictly inside the quantile band; the sign
/// is kept. The region `[t_lo - q̂, t_hi + q̂]` narrows the band for a negative
/// threshold.
pub struct QuantileExceedance {}

impl QuantileExceedance {
    #[inline]
    pub fn score_single(&self, y: f64, lower: f64, upper: f64) -> f64 {
        f64::max(lower - y, y - upper)
    }

    #[inline]
    pub fn region_single(&self, lower: f64, upper: f64, q_hat: f64) -> Interval {
        Interval::new(lower - q_hat, upper + q_hat)
    }
}

impl ScoreFunction for QuantileExceedance {
    fn task(&self) -> Task {
        Task::Cqr
    }

    fn score(
        &self,
        outputs: &ModelOutput,
        outcomes: &Outcomes,
        index: &[usize],
        parallel: bool,
    ) -> Result<Vec<f64>, ConformalError> {
        validate_score_inputs(self.task(), outputs, outcomes, index)?;
        let (ModelOutput::Quantiles { lower, upper }, Outcomes::Continuous(y)) = (outputs, outcomes) else {
            return Err(ConformalError::task_mismatch(self.task(), outputs.task()));
        };
        validate_not_nan("lower quantiles", lower, index)?;
        validate_not_nan("upper quantiles", upper, index)?;
        validate_outcomes(outputs, outcomes, index)?;
        Ok(map_index(index, parallel, |i| self.score_single(y[i], lower[i], upper[i])))
    }

    fn region(&self, outputs: &ModelOutput, index: &[usize], q_hat: f64) -> Result<Vec<Region>, ConformalError> {
        validate_region_inputs(self.task(), outputs, index, q_hat)?;
        let ModelOutput::Quantiles { lower, upper } = outputs else {
            return Err(ConformalError::task_mismatch(self.task(), outputs.task()));
        };
        validate_not_nan("lower quantiles", lower, index)?;
        validate_not_nan("upper quantiles", upper, index)?;
        Ok(index
            .iter()
            .map(|i| Region::Interval(self.region_single(lower[*i], upper[*i], q_hat)))
            .collect())
    }
}
