//! Monte Carlo
//!
//! Empirical validation of the coverage guarantee: repeat split, score,
//! calibrate, construct and evaluate over many random partitions and look
//! at the distribution of the per-run coverage.
//!
//! Run `r` is seeded with `base_seed + r`, so each run is reproducible on its
//! own and runs can execute on any thread in any order. A run that fails is
//! kept as an error in its slot and never enters the averages.
use crate::conformal::config::ConformalConfig;
use crate::conformal::{RunReport, SplitConformal};
use crate::data::{ModelOutput, ModelPredictions, Outcomes};
use crate::errors::ConformalError;
use crate::split::{seeded_rng, Partition};
use crate::utils::{mean_std, validate_lengths};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Outcome of a single Monte Carlo run.
#[derive(Debug)]
pub struct RunResult {
    /// Run number, `0..n_runs`.
    pub run: usize,
    /// Seed the run's partition was drawn with.
    pub seed: u64,
    pub outcome: Result<RunReport, ConformalError>,
}

/// Every run of a study, in run order.
#[derive(Debug)]
pub struct StudyReport {
    pub alpha: f64,
    pub base_seed: u64,
    pub runs: Vec<RunResult>,
}

/// Aggregate statistics over the successful runs of a study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySummary {
    pub target_coverage: f64,
    pub n_runs: usize,
    pub n_failed: usize,
    pub mean_coverage: f64,
    pub std_coverage: f64,
    /// Standard error of `mean_coverage`.
    pub standard_error: f64,
    pub mean_size: f64,
    /// Runs whose threshold rank had to be clipped to the maximum score.
    pub n_clipped: usize,
    pub base_seed: u64,
}

impl StudyReport {
    /// Coverage of each successful run, in run order.
    pub fn coverages(&self) -> Vec<f64> {
        self.successes().map(|r| r.coverage.coverage).collect()
    }

    pub fn successes(&self) -> impl Iterator<Item = &RunReport> {
        self.runs.iter().filter_map(|r| r.outcome.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&RunResult, &ConformalError)> {
        self.runs.iter().filter_map(|r| r.outcome.as_ref().err().map(|e| (r, e)))
    }

    pub fn summary(&self) -> StudySummary {
        let coverages = self.coverages();
        let sizes: Vec<f64> = self.successes().map(|r| r.coverage.size.mean).collect();
        let (mean_coverage, std_coverage) = mean_std(&coverages);
        let (mean_size, _) = mean_std(&sizes);
        StudySummary {
            target_coverage: 1.0 - self.alpha,
            n_runs: self.runs.len(),
            n_failed: self.runs.len() - coverages.len(),
            mean_coverage,
            std_coverage,
            standard_error: std_coverage / (coverages.len() as f64).sqrt(),
            mean_size,
            n_clipped: self.successes().filter(|r| r.threshold.clipped).count(),
            base_seed: self.base_seed,
        }
    }
}

/// Repeated conformal calibration over random partitions.
pub struct MonteCarloStudy {
    pub model: SplitConformal,
}

impl MonteCarloStudy {
    pub fn new(cfg: ConformalConfig) -> Result<Self, ConformalError> {
        cfg.validate()?;
        Ok(MonteCarloStudy {
            model: SplitConformal { cfg, threshold: None },
        })
    }

    /// Study with a pretrained model whose outputs cover every example.
    ///
    /// Each run draws a fresh partition from the configured split; a training
    /// block, if configured, is left unused.
    ///
    /// * `outputs` - Model output for the whole dataset.
    /// * `outcomes` - Ground truth for the whole dataset.
    /// * `groups` - Optional group label per example, for stratified coverage.
    pub fn run_pretrained(
        &self,
        outputs: &ModelOutput,
        outcomes: &Outcomes,
        groups: Option<&[u64]>,
    ) -> Result<StudyReport, ConformalError> {
        self.model.cfg.task.validate_inputs(outputs, outcomes)?;
        self.validate_groups(groups, outcomes.len())?;
        let n = outcomes.len();
        self.execute(|seed| {
            let partition = self.draw_partition(n, seed)?;
            self.model.run(outputs, outcomes, &partition, groups)
        })
    }

    /// Study that refits the model on every run.
    ///
    /// `fit` receives the run's partition, must train only on `partition.train`
    /// and return predictions for every example.
    pub fn run_with_model<F>(
        &self,
        outcomes: &Outcomes,
        groups: Option<&[u64]>,
        fit: F,
    ) -> Result<StudyReport, ConformalError>
    where
        F: Fn(&Partition) -> Result<ModelPredictions, ConformalError> + Sync,
    {
        self.validate_groups(groups, outcomes.len())?;
        let n = outcomes.len();
        self.execute(|seed| {
            let partition = self.draw_partition(n, seed)?;
            let predictions = fit(&partition)?;
            self.model.run(&predictions.view(), outcomes, &partition, groups)
        })
    }

    fn validate_groups(&self, groups: Option<&[u64]>, n: usize) -> Result<(), ConformalError> {
        match groups {
            Some(g) => validate_lengths("groups", g.len(), "outcomes", n),
            None => Ok(()),
        }
    }

    fn draw_partition(&self, n: usize, seed: u64) -> Result<Partition, ConformalError> {
        let mut rng = seeded_rng(Some(seed));
        self.model.cfg.split.splitter().split(&mut rng, n)
    }

    fn execute<J>(&self, job: J) -> Result<StudyReport, ConformalError>
    where
        J: Fn(u64) -> Result<RunReport, ConformalError> + Sync,
    {
        let cfg = &self.model.cfg;
        cfg.validate()?;
        let base_seed = cfg.seed.unwrap_or_else(rand::random::<u64>);
        let one = |run: usize| {
            let seed = base_seed.wrapping_add(run as u64);
            let outcome = job(seed);
            if let Err(e) = &outcome {
                debug!("Run {} (seed {}) failed: {}", run, seed, e);
            }
            RunResult { run, seed, outcome }
        };

        let runs: Vec<RunResult> = if cfg.parallel {
            match cfg.num_threads {
                Some(num_threads) => {
                    let pool = rayon::ThreadPoolBuilder::new()
                        .num_threads(num_threads)
                        .build()
                        .map_err(|e| {
                            ConformalError::InvalidParameter(
                                "num_threads".to_string(),
                                "a buildable thread pool".to_string(),
                                e.to_string(),
                            )
                        })?;
                    pool.install(|| (0..cfg.n_runs).into_par_iter().map(one).collect())
                }
                None => (0..cfg.n_runs).into_par_iter().map(one).collect(),
            }
        } else {
            (0..cfg.n_runs).map(one).collect()
        };

        let report = StudyReport {
            alpha: cfg.alpha,
            base_seed,
            runs,
        };
        let summary = report.summary();
        if summary.n_failed > 0 {
            warn!("{} of {} Monte Carlo runs failed.", summary.n_failed, summary.n_runs);
        }
        info!(
            "Monte Carlo coverage {:.4} ± {:.4} (target {:.4}) over {} runs, mean region size {:.4}.",
            summary.mean_coverage,
            summary.std_coverage,
            summary.target_coverage,
            summary.n_runs - summary.n_failed,
            summary.mean_size
        );
        Ok(report)
    }
}
