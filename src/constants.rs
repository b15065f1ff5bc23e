/// Default target miscoverage level.
pub const DEFAULT_ALPHA: f64 = 0.1;
/// Default share of the data held out for calibration.
pub const DEFAULT_CALIBRATION_FRACTION: f64 = 0.5;
/// Default number of repetitions for a Monte Carlo coverage study.
pub const DEFAULT_N_RUNS: usize = 500;
/// Calibration sets at least this large are scored on the rayon pool when `parallel` is set.
pub const PARALLEL_SCORE_MIN_LEN: usize = 4096;
