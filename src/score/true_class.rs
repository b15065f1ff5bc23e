//! True-class miscoverage score for classification.
use crate::data::{Matrix, ModelOutput, Outcomes};
use crate::errors::ConformalError;
use crate::region::{ClassSet, Region};
use crate::score::{
    map_index, validate_outcomes, validate_region_inputs, validate_score_inputs, ScoreFunction, Task,
};
use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Deserialize, Serialize, Clone)]
/// One minus the probability of the true class, `s = 1 - p̂[y]`.
///
/// The region keeps every class with `p̂[j] >= 1 - q̂`. It may be empty, and it
/// holds all classes once `q̂ >= 1`. Probabilities are used as given, never
/// renormalised.
pub struct TrueClassMiscoverage {}

impl TrueClassMiscoverage {
    #[inline]
    pub fn score_single(&self, p_true: f64) -> f64 {
        1.0 - p_true
    }

    /// Region for one row of class probabilities.
    ///
    /// Membership is decided in score space, `1 - p̂[j] <= q̂`, so a class whose
    /// score equals `q̂` is always kept.
    pub fn region_single(&self, probs: &[f64], q_hat: f64) -> ClassSet {
        let classes = probs
            .iter()
            .enumerate()
            .filter(|(_, p)| self.score_single(**p) <= q_hat)
            .map(|(j, _)| j)
            .collect();
        ClassSet::new(classes, probs.len())
    }

    fn validate_probability(index: usize, class: usize, value: f64) -> Result<(), ConformalError> {
        if (0.0..=1.0).contains(&value) {
            Ok(())
        } else {
            Err(ConformalError::InvalidProbability { index, class, value })
        }
    }

    fn validate_rows(probs: &Matrix<f64>, index: &[usize]) -> Result<(), ConformalError> {
        for i in index {
            for j in 0..probs.cols {
                Self::validate_probability(*i, j, *probs.get(*i, j))?;
            }
        }
        Ok(())
    }
}

impl ScoreFunction for TrueClassMiscoverage {
    fn task(&self) -> Task {
        Task::Classification
    }

    fn score(
        &self,
        outputs: &ModelOutput,
        outcomes: &Outcomes,
        index: &[usize],
        parallel: bool,
    ) -> Result<Vec<f64>, ConformalError> {
        validate_score_inputs(self.task(), outputs, outcomes, index)?;
        let (ModelOutput::Probabilities(probs), Outcomes::Labels(labels)) = (outputs, outcomes) else {
            return Err(ConformalError::task_mismatch(self.task(), outputs.task()));
        };
        validate_outcomes(outputs, outcomes, index)?;
        for i in index {
            let label = labels[*i];
            Self::validate_probability(*i, label, *probs.get(*i, label))?;
        }
        Ok(map_index(index, parallel, |i| {
            self.score_single(*probs.get(i, labels[i]))
        }))
    }

    fn region(&self, outputs: &ModelOutput, index: &[usize], q_hat: f64) -> Result<Vec<Region>, ConformalError> {
        validate_region_inputs(self.task(), outputs, index, q_hat)?;
        let ModelOutput::Probabilities(probs) = outputs else {
            return Err(ConformalError::task_mismatch(self.task(), outputs.task()));
        };
        Self::validate_rows(probs, index)?;
        Ok(index
            .iter()
            .map(|i| Region::Set(self.region_single(&probs.get_row(*i), q_hat)))
            .collect())
    }
}
