//! Data
//!
//! Borrowed views over the numeric arrays the conformal procedure consumes:
//! model outputs (point predictions, class probabilities or quantile pairs)
//! and ground-truth outcomes. Nothing here fits or owns a model.
use crate::errors::ConformalError;
use crate::score::Task;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Contiguous dense matrix view.
///
/// The data lives in a single borrowed slice. [`Matrix::new`] interprets it
/// column-major (Fortran-style); [`Matrix::new_row_major`] interprets it
/// row-major, which is how `n × K` class-probability tables usually arrive.
#[derive(Debug, Clone, Copy)]
pub struct Matrix<'a, T> {
    /// The raw data stored in a single slice.
    pub data: &'a [T],
    /// Number of rows in the matrix.
    pub rows: usize,
    /// Number of columns in the matrix.
    pub cols: usize,
    stride1: usize,
    stride2: usize,
}

impl<'a, T> Matrix<'a, T> {
    // Defaults to column major
    /// Create a new column major Matrix.
    pub fn new(data: &'a [T], rows: usize, cols: usize) -> Self {
        Matrix {
            data,
            rows,
            cols,
            stride1: rows,
            stride2: 1,
        }
    }

    /// Create a new row major Matrix.
    pub fn new_row_major(data: &'a [T], rows: usize, cols: usize) -> Self {
        Matrix {
            data,
            rows,
            cols,
            stride1: 1,
            stride2: cols,
        }
    }

    /// Get a single reference to an item in the matrix.
    ///
    /// * `i` - The ith row of the data to get.
    /// * `j` - the jth column of the data to get.
    pub fn get(&self, i: usize, j: usize) -> &T {
        &self.data[self.item_index(i, j)]
    }

    fn item_index(&self, i: usize, j: usize) -> usize {
        let mut idx = self.stride2 * i;
        idx += j * self.stride1;
        idx
    }

    /// Check the backing slice holds exactly `rows * cols` values.
    pub fn validate_shape(&self) -> Result<(), ConformalError> {
        match self.rows.checked_mul(self.cols) {
            Some(n) if n == self.data.len() => Ok(()),
            _ => Err(ConformalError::length_mismatch(
                "matrix data",
                self.data.len(),
                "rows * cols",
                self.rows.saturating_mul(self.cols),
            )),
        }
    }
}

impl<'a, T> Matrix<'a, T>
where
    T: Copy,
{
    /// Get a row of the data as a vector.
    pub fn get_row(&self, row: usize) -> Vec<T> {
        (0..self.cols).map(|j| *self.get(row, j)).collect()
    }
}

impl<'a, T> fmt::Display for Matrix<'a, T>
where
    T: fmt::Display,
{
    /// Format a Matrix.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut val = String::new();
        for i in 0..self.rows {
            for j in 0..self.cols {
                val.push_str(self.get(i, j).to_string().as_str());
                if j == (self.cols - 1) {
                    val.push('\n');
                } else {
                    val.push(' ');
                }
            }
        }
        write!(f, "{}", val)
    }
}

/// Externally produced model output for every example of a dataset.
#[derive(Debug, Clone, Copy)]
pub enum ModelOutput<'a> {
    /// Scalar point prediction per example (regression).
    Point(&'a [f64]),
    /// `n × K` class probabilities, one row per example (classification).
    Probabilities(Matrix<'a, f64>),
    /// Lower and upper quantile predictions per example (CQR).
    Quantiles { lower: &'a [f64], upper: &'a [f64] },
}

impl<'a> ModelOutput<'a> {
    /// Number of examples covered by the output.
    pub fn len(&self) -> usize {
        match self {
            ModelOutput::Point(p) => p.len(),
            ModelOutput::Probabilities(m) => m.rows,
            ModelOutput::Quantiles { lower, .. } => lower.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The task this kind of output belongs to.
    pub fn task(&self) -> Task {
        match self {
            ModelOutput::Point(_) => Task::Regression,
            ModelOutput::Probabilities(_) => Task::Classification,
            ModelOutput::Quantiles { .. } => Task::Cqr,
        }
    }

    /// Check the internal shape of the output.
    pub fn validate(&self) -> Result<(), ConformalError> {
        match self {
            ModelOutput::Point(_) => Ok(()),
            ModelOutput::Probabilities(m) => m.validate_shape(),
            ModelOutput::Quantiles { lower, upper } => {
                crate::utils::validate_lengths("lower quantiles", lower.len(), "upper quantiles", upper.len())
            }
        }
    }
}

/// Owned model output, used when a model is fitted inside a Monte Carlo run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModelPredictions {
    Point(Vec<f64>),
    /// Row-major `rows × cols` class probabilities.
    Probabilities { data: Vec<f64>, rows: usize, cols: usize },
    Quantiles { lower: Vec<f64>, upper: Vec<f64> },
}

impl ModelPredictions {
    /// Borrow the predictions as a [`ModelOutput`].
    pub fn view(&self) -> ModelOutput<'_> {
        match self {
            ModelPredictions::Point(p) => ModelOutput::Point(p),
            ModelPredictions::Probabilities { data, rows, cols } => {
                ModelOutput::Probabilities(Matrix::new_row_major(data, *rows, *cols))
            }
            ModelPredictions::Quantiles { lower, upper } => ModelOutput::Quantiles { lower, upper },
        }
    }
}

/// Ground-truth outcomes for every example of a dataset.
#[derive(Debug, Clone, Copy)]
pub enum Outcomes<'a> {
    /// Real-valued targets (regression and CQR).
    Continuous(&'a [f64]),
    /// Integer class indices (classification).
    Labels(&'a [usize]),
}

impl<'a> Outcomes<'a> {
    pub fn len(&self) -> usize {
        match self {
            Outcomes::Continuous(y) => y.len(),
            Outcomes::Labels(y) => y.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Single outcome at example `i`.
    pub fn get(&self, i: usize) -> Outcome {
        match self {
            Outcomes::Continuous(y) => Outcome::Continuous(y[i]),
            Outcomes::Labels(y) => Outcome::Label(y[i]),
        }
    }

    /// Gather the outcomes of the examples in `index`, in index order.
    pub fn select(&self, index: &[usize]) -> Vec<Outcome> {
        index.iter().map(|i| self.get(*i)).collect()
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Outcomes::Continuous(_) => "continuous outcomes",
            Outcomes::Labels(_) => "class labels",
        }
    }
}

/// A single ground-truth outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Continuous(f64),
    Label(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_column_major() {
        let v = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let m = Matrix::new(&v, 3, 2);
        assert_eq!(m.get(0, 0), &1.0);
        assert_eq!(m.get(2, 1), &6.0);
        assert_eq!(m.get_row(1), vec![2.0, 5.0]);
        assert!(m.validate_shape().is_ok());
    }

    #[test]
    fn test_matrix_row_major() {
        let v = vec![0.05, 0.6, 0.35, 0.2, 0.2, 0.6];
        let m = Matrix::new_row_major(&v, 2, 3);
        assert_eq!(m.get(0, 1), &0.6);
        assert_eq!(m.get(1, 2), &0.6);
        assert_eq!(m.get_row(0), vec![0.05, 0.6, 0.35]);
        assert_eq!(format!("{}", m), "0.05 0.6 0.35\n0.2 0.2 0.6\n");
    }

    #[test]
    fn test_matrix_bad_shape() {
        let v = vec![1.0, 2.0, 3.0];
        assert!(Matrix::new_row_major(&v, 2, 2).validate_shape().is_err());
    }

    #[test]
    fn test_model_predictions_view() {
        let preds = ModelPredictions::Quantiles {
            lower: vec![1.0, 2.0],
            upper: vec![3.0, 4.0],
        };
        let view = preds.view();
        assert_eq!(view.len(), 2);
        assert_eq!(view.task(), Task::Cqr);
        assert!(view.validate().is_ok());

        let preds = ModelPredictions::Probabilities {
            data: vec![0.5, 0.5, 0.9, 0.1],
            rows: 2,
            cols: 2,
        };
        match preds.view() {
            ModelOutput::Probabilities(m) => assert_eq!(m.get(1, 0), &0.9),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_outcomes_get() {
        let y = [1.5, 2.5];
        let o = Outcomes::Continuous(&y);
        assert_eq!(o.get(1), Outcome::Continuous(2.5));
        let l = [2usize, 0];
        let o = Outcomes::Labels(&l);
        assert_eq!(o.len(), 2);
        assert_eq!(o.get(0), Outcome::Label(2));
        assert_eq!(o.select(&[1, 0]), vec![Outcome::Label(0), Outcome::Label(2)]);
    }
}
