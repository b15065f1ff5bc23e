// Modules
pub mod calibration;
pub mod conformal;
pub mod constants;
pub mod data;
pub mod errors;
pub mod metrics;
pub mod monte_carlo;
pub mod region;
pub mod score;
pub mod split;
pub mod utils;

// Individual classes, and functions
pub use calibration::{conformal_quantile, conformal_quantiles, Threshold};
pub use conformal::config::{ConfigIO, ConformalConfig};
pub use conformal::{RunReport, SplitConformal};
pub use data::{Matrix, ModelOutput, ModelPredictions, Outcome, Outcomes};
pub use errors::ConformalError;
pub use metrics::CoverageReport;
pub use monte_carlo::{MonteCarloStudy, StudyReport, StudySummary};
pub use region::{ClassSet, Interval, Region};
pub use score::{ScoreFunction, Task};
pub use split::{split, Partition, SplitSpec};
