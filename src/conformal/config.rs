//! Conformal Configuration
//!
//! Serializable configuration shared by the single-run pipeline and the
//! Monte Carlo study, plus JSON persistence.
use crate::constants::{DEFAULT_ALPHA, DEFAULT_CALIBRATION_FRACTION, DEFAULT_N_RUNS};
use crate::errors::ConformalError;
use crate::score::Task;
use crate::split::SplitSpec;
use crate::utils::validate_alpha;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_alpha() -> f64 {
    DEFAULT_ALPHA
}
fn default_split() -> SplitSpec {
    SplitSpec::Fractions {
        train: 0.0,
        calib: DEFAULT_CALIBRATION_FRACTION,
    }
}
fn default_n_runs() -> usize {
    DEFAULT_N_RUNS
}
fn default_parallel() -> bool {
    true
}

/// Configuration for `SplitConformal` and `MonteCarloStudy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConformalConfig {
    /// Scoring rule and region rule.
    #[serde(default)]
    pub task: Task,
    /// Target miscoverage, strictly between 0 and 1.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// How the data is partitioned on each run.
    #[serde(default = "default_split")]
    pub split: SplitSpec,
    /// Seed for the partitions. `None` draws from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Number of repetitions in a Monte Carlo study.
    #[serde(default = "default_n_runs")]
    pub n_runs: usize,
    /// Use rayon for scoring and for independent Monte Carlo runs.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Size of a dedicated thread pool for Monte Carlo runs. `None` uses the global pool.
    #[serde(default)]
    pub num_threads: Option<usize>,
}

impl Default for ConformalConfig {
    fn default() -> Self {
        ConformalConfig {
            task: Task::Regression,
            alpha: DEFAULT_ALPHA,
            split: default_split(),
            seed: None,
            n_runs: DEFAULT_N_RUNS,
            parallel: true,
            num_threads: None,
        }
    }
}

impl ConformalConfig {
    /// Check every parameter that can be checked without data.
    pub fn validate(&self) -> Result<(), ConformalError> {
        validate_alpha(self.alpha)?;
        self.split.validate()?;
        if self.n_runs == 0 {
            return Err(ConformalError::InvalidParameter(
                "n_runs".to_string(),
                "at least one run".to_string(),
                "0".to_string(),
            ));
        }
        if self.num_threads == Some(0) {
            return Err(ConformalError::InvalidParameter(
                "num_threads".to_string(),
                "at least one thread".to_string(),
                "0".to_string(),
            ));
        }
        Ok(())
    }

    /// Coverage the marginal guarantee targets, `1 - alpha`.
    pub fn target_coverage(&self) -> f64 {
        1.0 - self.alpha
    }
}

/// IO
pub trait ConfigIO: Serialize + DeserializeOwned + Sized {
    /// Save as a json object to a file.
    ///
    /// * `path` - Path to save to.
    fn save_config<P: AsRef<Path>>(&self, path: P) -> Result<(), ConformalError> {
        fs::write(path, self.json_dump()?).map_err(|e| ConformalError::UnableToWrite(e.to_string()))
    }

    /// Dump as a json object
    fn json_dump(&self) -> Result<String, ConformalError> {
        serde_json::to_string(self).map_err(|e| ConformalError::UnableToWrite(e.to_string()))
    }

    /// Load from Json string
    ///
    /// * `json_str` - String object, which can be serialized to json.
    fn from_json(json_str: &str) -> Result<Self, ConformalError> {
        serde_json::from_str::<Self>(json_str).map_err(|e| ConformalError::UnableToRead(e.to_string()))
    }

    /// Load from a path to a json object.
    ///
    /// * `path` - Path to load from.
    fn load_config<P: AsRef<Path>>(path: P) -> Result<Self, ConformalError> {
        let json_str = fs::read_to_string(path).map_err(|e| ConformalError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}

impl ConfigIO for ConformalConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use tempfile::tempdir;

    #[test]
    fn test_config_default() {
        let config = ConformalConfig::default();
        assert_eq!(config.alpha, 0.1);
        assert_eq!(config.task, Task::Regression);
        assert_eq!(config.n_runs, 500);
        assert!(config.validate().is_ok());
        assert!((config.target_coverage() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_config_io_json() {
        let config = ConformalConfig {
            task: Task::Cqr,
            seed: Some(17),
            split: SplitSpec::CalibrationCount(100),
            ..Default::default()
        };
        let json = config.json_dump().unwrap();
        let config2 = ConformalConfig::from_json(&json).unwrap();
        assert_eq!(config, config2);
    }

    #[test]
    fn test_config_io_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("conformal.json");
        let config = ConformalConfig::default();
        config.save_config(&file_path).unwrap();
        let config2 = ConformalConfig::load_config(&file_path).unwrap();
        assert_eq!(config, config2);
    }

    #[test]
    fn test_config_serde_defaults() {
        let json = r#"{"task": "Classification", "alpha": 0.05}"#;
        let config = ConformalConfig::from_json(json).unwrap();
        assert_eq!(config.task, Task::Classification);
        assert_eq!(config.alpha, 0.05);
        assert_eq!(config.seed, None);
        assert_eq!(config.n_runs, 500);
        assert!(config.parallel);
    }

    #[test]
    fn test_config_read_errors() {
        let err = ConformalConfig::from_json("{not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        let err = ConformalConfig::load_config("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConformalError::UnableToRead(_)));
    }

    #[test]
    fn test_config_validate() {
        let mut config = ConformalConfig {
            alpha: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        config.alpha = 0.2;
        config.split = SplitSpec::Fractions { train: 0.8, calib: 0.3 };
        assert!(config.validate().is_err());
        config.split = SplitSpec::CalibrationCount(10);
        config.n_runs = 0;
        assert!(config.validate().is_err());
    }
}
