use crate::errors::ConformalError;

/// Create a string of all available items.
pub fn items_to_strings(items: Vec<&str>) -> String {
    let mut s = String::new();
    for i in items {
        s.push_str(i);
        s.push_str(&String::from(", "));
    }
    s
}

// Validation
pub fn validate_float_parameter(value: f64, min: f64, max: f64, parameter: &str) -> Result<(), ConformalError> {
    if value.is_nan() || value < min || max < value {
        let ex_msg = format!("real value within range {} and {}", min, max);
        Err(ConformalError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

/// The miscoverage level must lie in the open interval (0, 1).
pub fn validate_alpha(alpha: f64) -> Result<(), ConformalError> {
    if alpha.is_nan() || alpha <= 0.0 || alpha >= 1.0 {
        Err(ConformalError::InvalidParameter(
            "alpha".to_string(),
            "real value strictly between 0 and 1".to_string(),
            alpha.to_string(),
        ))
    } else {
        Ok(())
    }
}

pub fn validate_lengths(left_name: &str, left: usize, right_name: &str, right: usize) -> Result<(), ConformalError> {
    if left != right {
        Err(ConformalError::length_mismatch(left_name, left, right_name, right))
    } else {
        Ok(())
    }
}

/// Every index must address one of `len` examples.
pub fn validate_index(index: &[usize], len: usize) -> Result<(), ConformalError> {
    match index.iter().find(|i| **i >= len) {
        Some(i) => Err(ConformalError::IndexOutOfBounds { index: *i, len }),
        None => Ok(()),
    }
}

/// Mean and (population) standard deviation. Returns NaN for an empty slice.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
