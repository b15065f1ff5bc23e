//! Metrics
//!
//! Empirical coverage and region-size statistics for constructed prediction regions.
pub mod coverage;

pub use coverage::{coverage, region_size_stats, stratified_coverage, CoverageReport, GroupCoverage, SizeStats};
