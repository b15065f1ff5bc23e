//! Conformal Prediction
//!
//! The split conformal pipeline: score the calibration partition, take the
//! conformal quantile of the scores, build a region for every test example
//! and measure how often the regions cover the truth.
//!
//! Under exchangeability of calibration and test examples the regions cover
//! with probability at least `1 - alpha`, marginally over the test
//! distribution. The pipeline only has to compute `q̂` and the regions exactly.

// public modules
pub mod config;

// private modules
mod setters;
#[cfg(test)]
mod tests;

use crate::calibration::{conformal_quantile, Threshold};
use crate::conformal::config::{ConfigIO, ConformalConfig};
use crate::data::{ModelOutput, Outcomes};
use crate::errors::ConformalError;
use crate::metrics::CoverageReport;
use crate::region::Region;
use crate::score::{validate_outcomes, ScoreFunction, Task};
use crate::split::{split, Partition};
use crate::utils::{validate_index, validate_lengths};
use log::debug;
use serde::{Deserialize, Serialize};

/// Result of one complete split, score, calibrate, construct, evaluate run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub threshold: Threshold,
    pub coverage: CoverageReport,
}

/// Split conformal predictor.
///
/// Holds the configuration and, once calibrated, the conformal threshold.
/// The underlying model is external: the predictor only ever sees its outputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SplitConformal {
    pub cfg: ConformalConfig,
    pub threshold: Option<Threshold>,
}

impl ConfigIO for SplitConformal {}

impl SplitConformal {
    /// Split conformal predictor
    ///
    /// * `task` - Regression (absolute residual), Classification (one minus
    ///   true-class probability) or Cqr (signed quantile exceedance).
    /// * `alpha` - Target miscoverage, strictly between 0 and 1.
    pub fn new(task: Task, alpha: f64) -> Result<Self, ConformalError> {
        let model = SplitConformal {
            cfg: ConformalConfig {
                task,
                alpha,
                ..Default::default()
            },
            threshold: None,
        };
        model.validate_parameters()?;
        Ok(model)
    }

    pub fn validate_parameters(&self) -> Result<(), ConformalError> {
        self.cfg.validate()
    }

    /// The computed threshold, if calibrated.
    pub fn threshold(&self) -> Option<&Threshold> {
        self.threshold.as_ref()
    }

    /// Nonconformity scores of the examples in `index`.
    pub fn scores(&self, outputs: &ModelOutput, outcomes: &Outcomes, index: &[usize]) -> Result<Vec<f64>, ConformalError> {
        self.cfg.task.score(outputs, outcomes, index, self.cfg.parallel)
    }

    fn compute_threshold(
        &self,
        outputs: &ModelOutput,
        outcomes: &Outcomes,
        calib_index: &[usize],
    ) -> Result<Threshold, ConformalError> {
        self.validate_parameters()?;
        if calib_index.is_empty() {
            return Err(ConformalError::EmptyCalibration);
        }
        let scores = self.scores(outputs, outcomes, calib_index)?;
        conformal_quantile(&scores, self.cfg.alpha)
    }

    /// Calibrate the predictor on a held-out calibration partition.
    ///
    /// * `outputs` - Model output for the whole dataset.
    /// * `outcomes` - Ground truth for the whole dataset.
    /// * `calib_index` - Calibration examples. Must not have been used to fit the model.
    ///
    /// On failure any previous threshold is kept untouched.
    pub fn calibrate(
        &mut self,
        outputs: &ModelOutput,
        outcomes: &Outcomes,
        calib_index: &[usize],
    ) -> Result<&Threshold, ConformalError> {
        let threshold = self.compute_threshold(outputs, outcomes, calib_index)?;
        Ok(&*self.threshold.insert(threshold))
    }

    /// Calibrate from scores computed elsewhere.
    pub fn calibrate_scores(&mut self, scores: &[f64]) -> Result<&Threshold, ConformalError> {
        self.validate_parameters()?;
        let threshold = conformal_quantile(scores, self.cfg.alpha)?;
        Ok(&*self.threshold.insert(threshold))
    }

    /// Prediction regions of the examples in `index`, using the calibrated threshold.
    pub fn predict_regions(&self, outputs: &ModelOutput, index: &[usize]) -> Result<Vec<Region>, ConformalError> {
        let threshold = self.threshold.as_ref().ok_or(ConformalError::NotCalibrated)?;
        self.cfg.task.region(outputs, index, threshold.q_hat)
    }

    /// Coverage and size statistics of the regions built for `test_index`.
    ///
    /// * `groups` - Optional group label per example of the whole dataset, for stratified coverage.
    pub fn evaluate(
        &self,
        outputs: &ModelOutput,
        outcomes: &Outcomes,
        test_index: &[usize],
        groups: Option<&[u64]>,
    ) -> Result<CoverageReport, ConformalError> {
        self.cfg.task.validate_inputs(outputs, outcomes)?;
        validate_index(test_index, outcomes.len())?;
        validate_outcomes(outputs, outcomes, test_index)?;
        if let Some(g) = groups {
            validate_lengths("groups", g.len(), "outcomes", outcomes.len())?;
        }
        let regions = self.predict_regions(outputs, test_index)?;
        let test_outcomes = outcomes.select(test_index);
        let test_groups = groups.map(|g| test_index.iter().map(|i| g[*i]).collect::<Vec<u64>>());
        CoverageReport::new(&test_outcomes, &regions, test_groups.as_deref())
    }

    /// Run all four stages on a given partition.
    ///
    /// Either every stage completes or the first error is returned; `self` is
    /// never modified.
    pub fn run(
        &self,
        outputs: &ModelOutput,
        outcomes: &Outcomes,
        partition: &Partition,
        groups: Option<&[u64]>,
    ) -> Result<RunReport, ConformalError> {
        let threshold = self.compute_threshold(outputs, outcomes, &partition.calib)?;
        let calibrated = SplitConformal {
            cfg: self.cfg.clone(),
            threshold: Some(threshold),
        };
        let coverage = calibrated.evaluate(outputs, outcomes, &partition.test, groups)?;
        debug!(
            "q_hat={} coverage={} mean size={}",
            threshold.q_hat, coverage.coverage, coverage.size.mean
        );
        Ok(RunReport { threshold, coverage })
    }

    /// Draw a partition from the configured split and seed, then [`run`](Self::run) on it.
    ///
    /// The training block, if any, is not used: the outputs must come from a
    /// model fitted without the calibration and test examples.
    pub fn run_split(
        &self,
        outputs: &ModelOutput,
        outcomes: &Outcomes,
        groups: Option<&[u64]>,
    ) -> Result<(Partition, RunReport), ConformalError> {
        self.validate_parameters()?;
        let partition = split(outcomes.len(), &self.cfg.split, self.cfg.seed)?;
        let report = self.run(outputs, outcomes, &partition, groups)?;
        Ok((partition, report))
    }
}
