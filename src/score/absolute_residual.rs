//! Absolute residual score for point regression.
use crate::data::{ModelOutput, Outcomes};
use crate::errors::ConformalError;
use crate::region::{Interval, Region};
use crate::score::{
    map_index, validate_not_nan, validate_outcomes, validate_region_inputs, validate_score_inputs, ScoreFunction,
    Task,
};
use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Deserialize, Serialize, Clone)]
/// Absolute residual, `s = |y - ŷ|`. Region `[ŷ - q̂, ŷ + q̂]`.
pub struct AbsoluteResidual {}

impl AbsoluteResidual {
    #[inline]
    pub fn score_single(&self, y: f64, yhat: f64) -> f64 {
        (y - yhat).abs()
    }

    #[inline]
    pub fn region_single(&self, yhat: f64, q_hat: f64) -> Interval {
        Interval::new(yhat - q_hat, yhat + q_hat)
    }
}

impl ScoreFunction for AbsoluteResidual {
    fn task(&self) -> Task {
        Task::Regression
    }

    fn score(
        &self,
        outputs: &ModelOutput,
        outcomes: &Outcomes,
        index: &[usize],
        parallel: bool,
    ) -> Result<Vec<f64>, ConformalError> {
        validate_score_inputs(self.task(), outputs, outcomes, index)?;
        let (ModelOutput::Point(yhat), Outcomes::Continuous(y)) = (outputs, outcomes) else {
            return Err(ConformalError::task_mismatch(self.task(), outputs.task()));
        };
        validate_not_nan("point predictions", yhat, index)?;
        validate_outcomes(outputs, outcomes, index)?;
        Ok(map_index(index, parallel, |i| self.score_single(y[i], yhat[i])))
    }

    fn region(&self, outputs: &ModelOutput, index: &[usize], q_hat: f64) -> Result<Vec<Region>, ConformalError> {
        validate_region_inputs(self.task(), outputs, index, q_hat)?;
        let ModelOutput::Point(yhat) = outputs else {
            return Err(ConformalError::task_mismatch(self.task(), outputs.task()));
        };
        validate_not_nan("point predictions", yhat, index)?;
        Ok(index
            .iter()
            .map(|i| Region::Interval(self.region_single(yhat[*i], q_hat)))
            .collect())
    }
}
