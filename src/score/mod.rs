//! Score
//!
//! Nonconformity scores and the matching prediction-region rules, one pair
//! per task. Larger scores mark examples that are stranger relative to the
//! model; the region rule inverts the score at the conformal threshold.
mod absolute_residual;
mod quantile_exceedance;
mod true_class;

pub use absolute_residual::AbsoluteResidual;
pub use quantile_exceedance::QuantileExceedance;
pub use true_class::TrueClassMiscoverage;

use crate::constants::PARALLEL_SCORE_MIN_LEN;
use crate::data::{ModelOutput, Outcomes};
use crate::errors::ConformalError;
use crate::region::Region;
use crate::utils::{items_to_strings, validate_index, validate_lengths};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A nonconformity score paired with the region rule that inverts it.
///
/// Implementations are pure: identical inputs always give identical scores
/// and regions, whether or not `parallel` is set.
pub trait ScoreFunction: Send + Sync {
    /// The task this rule applies to.
    fn task(&self) -> Task;

    /// Score every example in `index`.
    ///
    /// # Arguments
    /// * `outputs` – model output for the whole dataset.
    /// * `outcomes` – ground truth for the whole dataset.
    /// * `index` – examples to score, usually the calibration partition.
    /// * `parallel` – score on the rayon pool for large partitions.
    fn score(
        &self,
        outputs: &ModelOutput,
        outcomes: &Outcomes,
        index: &[usize],
        parallel: bool,
    ) -> Result<Vec<f64>, ConformalError>;

    /// Build the prediction region of every example in `index` at threshold `q_hat`.
    fn region(&self, outputs: &ModelOutput, index: &[usize], q_hat: f64) -> Result<Vec<Region>, ConformalError>;
}

/// The conformal task, selecting exactly one scoring rule per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Task {
    /// Absolute residual around a point prediction.
    #[default]
    Regression,
    /// One minus the probability of the true class.
    Classification,
    /// Signed exceedance of a lower/upper quantile pair.
    Cqr,
}

impl Task {
    /// Check that the outputs and outcomes belong to this task and describe the same examples.
    pub fn validate_inputs(&self, outputs: &ModelOutput, outcomes: &Outcomes) -> Result<(), ConformalError> {
        self.validate_output(outputs)?;
        let expected = match self {
            Task::Classification => matches!(outcomes, Outcomes::Labels(_)),
            Task::Regression | Task::Cqr => matches!(outcomes, Outcomes::Continuous(_)),
        };
        if !expected {
            let want = match self {
                Task::Classification => "class labels",
                _ => "continuous outcomes",
            };
            return Err(ConformalError::task_mismatch(want, outcomes.kind()));
        }
        validate_lengths("model outputs", outputs.len(), "outcomes", outcomes.len())
    }

    /// Check that the outputs belong to this task and are well shaped.
    pub fn validate_output(&self, outputs: &ModelOutput) -> Result<(), ConformalError> {
        if outputs.task() != *self {
            return Err(ConformalError::task_mismatch(self, outputs.task()));
        }
        outputs.validate()
    }
}

impl ScoreFunction for Task {
    fn task(&self) -> Task {
        *self
    }

    fn score(
        &self,
        outputs: &ModelOutput,
        outcomes: &Outcomes,
        index: &[usize],
        parallel: bool,
    ) -> Result<Vec<f64>, ConformalError> {
        match self {
            Task::Regression => AbsoluteResidual::default().score(outputs, outcomes, index, parallel),
            Task::Classification => TrueClassMiscoverage::default().score(outputs, outcomes, index, parallel),
            Task::Cqr => QuantileExceedance::default().score(outputs, outcomes, index, parallel),
        }
    }

    fn region(&self, outputs: &ModelOutput, index: &[usize], q_hat: f64) -> Result<Vec<Region>, ConformalError> {
        match self {
            Task::Regression => AbsoluteResidual::default().region(outputs, index, q_hat),
            Task::Classification => TrueClassMiscoverage::default().region(outputs, index, q_hat),
            Task::Cqr => QuantileExceedance::default().region(outputs, index, q_hat),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Task::Regression => "Regression",
            Task::Classification => "Classification",
            Task::Cqr => "Cqr",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Task {
    type Err = ConformalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Regression" => Ok(Task::Regression),
            "Classification" => Ok(Task::Classification),
            "Cqr" | "CQR" => Ok(Task::Cqr),
            _ => Err(ConformalError::ParseString(
                s.to_string(),
                "Task".to_string(),
                items_to_strings(vec!["Regression", "Classification", "Cqr"]),
            )),
        }
    }
}

/// Evaluate `f` at every index, on the rayon pool when asked and worth it.
pub(crate) fn map_index<F>(index: &[usize], parallel: bool, f: F) -> Vec<f64>
where
    F: Fn(usize) -> f64 + Send + Sync,
{
    if parallel && index.len() >= PARALLEL_SCORE_MIN_LEN {
        index.par_iter().map(|i| f(*i)).collect()
    } else {
        index.iter().map(|i| f(*i)).collect()
    }
}

/// Reject NaN values in the rows that will be used.
pub(crate) fn validate_not_nan(name: &str, values: &[f64], index: &[usize]) -> Result<(), ConformalError> {
    match index.iter().find(|i| values[**i].is_nan()) {
        Some(i) => Err(ConformalError::InvalidParameter(
            name.to_string(),
            "a non-NaN value".to_string(),
            format!("NaN at example {}", i),
        )),
        None => Ok(()),
    }
}

/// Reject outcomes that no region could be judged against: NaN continuous
/// outcomes, or class labels outside `[0, K)`.
pub(crate) fn validate_outcomes(
    outputs: &ModelOutput,
    outcomes: &Outcomes,
    index: &[usize],
) -> Result<(), ConformalError> {
    match (outputs, outcomes) {
        (_, Outcomes::Continuous(y)) => validate_not_nan("outcomes", y, index),
        (ModelOutput::Probabilities(probs), Outcomes::Labels(labels)) => {
            match index.iter().find(|i| labels[**i] >= probs.cols) {
                Some(i) => Err(ConformalError::InvalidClassLabel {
                    index: *i,
                    label: labels[*i],
                    n_classes: probs.cols,
                }),
                None => Ok(()),
            }
        }
        (_, Outcomes::Labels(_)) => Err(ConformalError::task_mismatch(outputs.task(), outcomes.kind())),
    }
}

/// Shared checks run before any scoring: task, lengths and indices.
pub(crate) fn validate_score_inputs(
    task: Task,
    outputs: &ModelOutput,
    outcomes: &Outcomes,
    index: &[usize],
) -> Result<(), ConformalError> {
    task.validate_inputs(outputs, outcomes)?;
    validate_index(index, outputs.len())
}

/// Shared checks run before building regions.
pub(crate) fn validate_region_inputs(
    task: Task,
    outputs: &ModelOutput,
    index: &[usize],
    q_hat: f64,
) -> Result<(), ConformalError> {
    task.validate_output(outputs)?;
    validate_index(index, outputs.len())?;
    if q_hat.is_nan() {
        return Err(ConformalError::InvalidParameter(
            "q_hat".to_string(),
            "a non-NaN threshold".to_string(),
            "NaN".to_string(),
        ));
    }
    Ok(())
}
