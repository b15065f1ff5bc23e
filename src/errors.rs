//! Errors
//!
//! Custom error types used throughout the `split_conformal` crate.
use thiserror::Error;

/// Broad classification of a [`ConformalError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input or configuration, reported before any computation.
    Configuration,
    /// No calibration scores reached the quantile calibrator.
    DegenerateCalibration,
    /// Reading or writing a configuration or report failed.
    Io,
}

/// Errors that can occur while calibrating or evaluating conformal regions.
#[derive(Debug, Error)]
pub enum ConformalError {
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// Two inputs that must describe the same examples differ in length.
    #[error("Length mismatch: {left_name} has {left} entries but {right_name} has {right}.")]
    LengthMismatch {
        left_name: String,
        left: usize,
        right_name: String,
        right: usize,
    },
    /// An example index points past the end of the data.
    #[error("Index {index} is out of bounds for {len} examples.")]
    IndexOutOfBounds { index: usize, len: usize },
    /// A class label is not a valid column of the probability matrix.
    #[error("Class label {label} at example {index} is outside [0, {n_classes}).")]
    InvalidClassLabel { index: usize, label: usize, n_classes: usize },
    /// A probability outside [0, 1] (or NaN) was found.
    #[error("Probability {value} for class {class} at example {index} is not within [0, 1].")]
    InvalidProbability { index: usize, class: usize, value: f64 },
    /// The model output, outcomes or regions do not belong to the configured task.
    #[error("Task mismatch: expected {expected}, found {found}.")]
    TaskMismatch { expected: String, found: String },
    /// Regions were requested before a threshold was computed.
    #[error("No conformal threshold available, calibrate before predicting regions.")]
    NotCalibrated,
    /// Coverage requested over zero test examples.
    #[error("Cannot evaluate coverage on an empty test set.")]
    EmptyTestSet,
    /// No calibration scores, no quantile can be defined.
    #[error("Calibration set is empty, no conformal threshold can be computed.")]
    EmptyCalibration,
    /// Invalid value parsing.
    #[error("Invalid value {0} passed for {1}, expected one of {2}.")]
    ParseString(String, String, String),
    /// Unable to write a configuration or report.
    #[error("Unable to write: {0}")]
    UnableToWrite(String),
    /// Unable to read a configuration.
    #[error("Unable to read: {0}")]
    UnableToRead(String),
}

impl ConformalError {
    /// Map the error onto the configuration / degenerate-calibration / io taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConformalError::EmptyCalibration => ErrorKind::DegenerateCalibration,
            ConformalError::UnableToWrite(_) | ConformalError::UnableToRead(_) => ErrorKind::Io,
            _ => ErrorKind::Configuration,
        }
    }

    pub(crate) fn length_mismatch(left_name: &str, left: usize, right_name: &str, right: usize) -> Self {
        ConformalError::LengthMismatch {
            left_name: left_name.to_string(),
            left,
            right_name: right_name.to_string(),
            right,
        }
    }

    pub(crate) fn task_mismatch(expected: impl ToString, found: impl ToString) -> Self {
        ConformalError::TaskMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        assert_eq!(ConformalError::EmptyCalibration.kind(), ErrorKind::DegenerateCalibration);
        assert_eq!(ConformalError::NotCalibrated.kind(), ErrorKind::Configuration);
        assert_eq!(ConformalError::UnableToRead("x".to_string()).kind(), ErrorKind::Io);
        let e = ConformalError::length_mismatch("outcomes", 3, "regions", 2);
        assert_eq!(e.kind(), ErrorKind::Configuration);
        assert_eq!(
            e.to_string(),
            "Length mismatch: outcomes has 3 entries but regions has 2."
        );
    }
}
