//! Region
//!
//! Prediction regions produced from a conformal threshold: closed intervals
//! for regression and CQR, subsets of class indices for classification.
use crate::data::Outcome;
use crate::errors::ConformalError;
use serde::{Deserialize, Serialize};

/// Closed interval `[lower, upper]`.
///
/// A negative CQR threshold can shrink an interval past itself, leaving
/// `lower > upper`. Such an interval is kept as computed and contains nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    pub fn new(lower: f64, upper: f64) -> Self {
        Interval { lower, upper }
    }

    /// `lower <= y <= upper`.
    #[inline]
    pub fn contains(&self, y: f64) -> bool {
        self.lower <= y && y <= self.upper
    }

    /// `upper - lower`. Negative for an inverted interval.
    #[inline]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Set of class indices out of `n_classes`, stored in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSet {
    pub classes: Vec<usize>,
    pub n_classes: usize,
}

impl ClassSet {
    /// Build from indices which must already be sorted and unique.
    pub fn new(classes: Vec<usize>, n_classes: usize) -> Self {
        debug_assert!(classes.windows(2).all(|w| w[0] < w[1]));
        ClassSet { classes, n_classes }
    }

    /// `class` must be below `n_classes`.
    pub fn contains(&self, class: usize) -> bool {
        debug_assert!(class < self.n_classes, "class {} out of {}", class, self.n_classes);
        self.classes.binary_search(&class).is_ok()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// An empty set is a valid region for an extreme threshold.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Boolean membership mask of length `n_classes`.
    pub fn to_mask(&self) -> Vec<bool> {
        let mut mask = vec![false; self.n_classes];
        for c in &self.classes {
            mask[*c] = true;
        }
        mask
    }
}

/// Prediction region for a single test example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Region {
    Interval(Interval),
    Set(ClassSet),
}

impl Region {
    /// Whether the outcome falls inside the region.
    ///
    /// Interval regions only accept continuous outcomes and set regions only
    /// accept class labels.
    pub fn contains(&self, outcome: Outcome) -> Result<bool, ConformalError> {
        match (self, outcome) {
            (Region::Interval(i), Outcome::Continuous(y)) => Ok(i.contains(y)),
            (Region::Set(s), Outcome::Label(c)) => Ok(s.contains(c)),
            (Region::Interval(_), Outcome::Label(_)) => {
                Err(ConformalError::task_mismatch("continuous outcomes", "class labels"))
            }
            (Region::Set(_), Outcome::Continuous(_)) => {
                Err(ConformalError::task_mismatch("class labels", "continuous outcomes"))
            }
        }
    }

    /// Interval width, or set cardinality.
    pub fn size(&self) -> f64 {
        match self {
            Region::Interval(i) => i.width(),
            Region::Set(s) => s.len() as f64,
        }
    }

    pub fn as_interval(&self) -> Option<&Interval> {
        match self {
            Region::Interval(i) => Some(i),
            Region::Set(_) => None,
        }
    }

    pub fn as_set(&self) -> Option<&ClassSet> {
        match self {
            Region::Set(s) => Some(s),
            Region::Interval(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_contains_closed() {
        let i = Interval::new(67.5, 72.5);
        assert!(i.contains(67.5));
        assert!(i.contains(72.5));
        assert!(i.contains(69.9));
        assert!(!i.contains(73.0));
        assert_eq!(i.width(), 5.0);
    }

    #[test]
    fn test_inverted_interval_is_empty() {
        let i = Interval::new(2.0, 1.0);
        assert!(!i.contains(1.5));
        assert_eq!(i.width(), -1.0);
    }

    #[test]
    fn test_class_set() {
        let s = ClassSet::new(vec![1, 2], 3);
        assert!(s.contains(1));
        assert!(!s.contains(0));
        assert_eq!(s.to_mask(), vec![false, true, true]);
        assert!(ClassSet::new(vec![], 3).is_empty());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "class 3 out of 3")]
    fn test_class_set_label_out_of_range() {
        ClassSet::new(vec![0], 3).contains(3);
    }

    #[test]
    fn test_region_kind_mismatch() {
        let r = Region::Interval(Interval::new(0.0, 1.0));
        assert!(r.contains(Outcome::Continuous(0.5)).unwrap());
        assert!(r.contains(Outcome::Label(0)).is_err());
        let r = Region::Set(ClassSet::new(vec![0], 2));
        assert_eq!(r.size(), 1.0);
        assert!(r.contains(Outcome::Continuous(0.0)).is_err());
    }
}
