//! Split
//!
//! Random partitioning of a dataset's indices into disjoint train,
//! calibration and test blocks. Every split takes an explicit `StdRng`, so
//! a seed fully determines the partition.
use crate::errors::ConformalError;
use crate::utils::validate_float_parameter;
use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// How to size the partitions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SplitSpec {
    /// Three-way split. `floor(train * n)` training and `floor(calib * n)`
    /// calibration examples, the remainder goes to test.
    Fractions { train: f64, calib: f64 },
    /// Calibration/test split for a pretrained model, with exactly `m`
    /// calibration examples drawn as a random `m`-of-`n` mask.
    CalibrationCount(usize),
}

impl SplitSpec {
    /// Check the split on its own, independent of the dataset size.
    pub fn validate(&self) -> Result<(), ConformalError> {
        match self {
            SplitSpec::Fractions { train, calib } => {
                validate_float_parameter(*train, 0.0, 1.0, "train")?;
                validate_float_parameter(*calib, 0.0, 1.0, "calib")?;
                if train + calib > 1.0 + f64::EPSILON {
                    return Err(ConformalError::InvalidParameter(
                        "train + calib".to_string(),
                        "fractions summing to at most 1".to_string(),
                        (train + calib).to_string(),
                    ));
                }
                Ok(())
            }
            SplitSpec::CalibrationCount(m) => {
                if *m == 0 {
                    Err(ConformalError::InvalidParameter(
                        "m".to_string(),
                        "at least one calibration example".to_string(),
                        m.to_string(),
                    ))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Sizes of the (train, calib, test) blocks for `n` examples.
    pub fn sizes(&self, n: usize) -> Result<(usize, usize, usize), ConformalError> {
        self.validate()?;
        if n == 0 {
            return Err(ConformalError::InvalidParameter(
                "n".to_string(),
                "a non-empty dataset".to_string(),
                "0".to_string(),
            ));
        }
        let (n_train, n_calib) = match self {
            SplitSpec::Fractions { train, calib } => {
                let n_train = (train * n as f64).floor() as usize;
                let n_calib = (calib * n as f64).floor() as usize;
                if n_calib == 0 {
                    return Err(ConformalError::InvalidParameter(
                        "calib".to_string(),
                        format!("a fraction leaving at least one of {} examples for calibration", n),
                        calib.to_string(),
                    ));
                }
                (n_train, n_calib)
            }
            SplitSpec::CalibrationCount(m) => {
                if *m >= n {
                    return Err(ConformalError::InvalidParameter(
                        "m".to_string(),
                        format!("a calibration count below the {} available examples", n),
                        m.to_string(),
                    ));
                }
                (0, *m)
            }
        };
        match n.checked_sub(n_train + n_calib) {
            Some(n_test) if n_test > 0 => Ok((n_train, n_calib, n_test)),
            _ => Err(ConformalError::InvalidParameter(
                "split".to_string(),
                "a non-empty test block".to_string(),
                format!("{} train and {} calibration examples out of {}", n_train, n_calib, n),
            )),
        }
    }

    pub fn splitter(&self) -> Box<dyn Splitter> {
        match self {
            SplitSpec::Fractions { train, calib } => Box::new(RandomSplitter::new(*train, *calib)),
            SplitSpec::CalibrationCount(m) => Box::new(MaskSplitter::new(*m)),
        }
    }
}

/// Pairwise-disjoint index blocks whose union is `0..n`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Empty for calibration-only splits.
    pub train: Vec<usize>,
    pub calib: Vec<usize>,
    pub test: Vec<usize>,
}

impl Partition {
    /// Calibration/test partition from a boolean mask, `true` marking calibration.
    pub fn from_mask(mask: &[bool]) -> Self {
        let mut calib = Vec::new();
        let mut test = Vec::new();
        for (i, m) in mask.iter().enumerate() {
            if *m {
                calib.push(i);
            } else {
                test.push(i)
            }
        }
        Partition {
            train: Vec::new(),
            calib,
            test,
        }
    }

    /// Total number of indices across all blocks.
    pub fn len(&self) -> usize {
        self.train.len() + self.calib.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// A splitter partitions the indices 0..n using the provided generator.
pub trait Splitter: Send + Sync {
    fn split(&self, rng: &mut StdRng, n: usize) -> Result<Partition, ConformalError>;
}

/// Shuffle `0..n` and cut it into train, calib, test blocks in that order.
pub struct RandomSplitter {
    train: f64,
    calib: f64,
}

impl RandomSplitter {
    pub fn new(train: f64, calib: f64) -> Self {
        RandomSplitter { train, calib }
    }
}

impl Splitter for RandomSplitter {
    fn split(&self, rng: &mut StdRng, n: usize) -> Result<Partition, ConformalError> {
        let spec = SplitSpec::Fractions {
            train: self.train,
            calib: self.calib,
        };
        let (n_train, n_calib, _) = spec.sizes(n)?;
        let mut perm: Vec<usize> = (0..n).collect();
        perm.shuffle(rng);
        let test = perm.split_off(n_train + n_calib);
        let calib = perm.split_off(n_train);
        Ok(Partition {
            train: perm,
            calib,
            test,
        })
    }
}

/// Draw a uniformly random `m`-of-`n` calibration mask.
pub struct MaskSplitter {
    m: usize,
}

impl MaskSplitter {
    pub fn new(m: usize) -> Self {
        MaskSplitter { m }
    }
}

impl Splitter for MaskSplitter {
    fn split(&self, rng: &mut StdRng, n: usize) -> Result<Partition, ConformalError> {
        SplitSpec::CalibrationCount(self.m).sizes(n)?;
        Ok(Partition::from_mask(&calibration_mask(rng, n, self.m)))
    }
}

/// Boolean mask of length `n` with exactly `min(m, n)` entries set, chosen uniformly.
pub fn calibration_mask(rng: &mut StdRng, n: usize, m: usize) -> Vec<bool> {
    let mut mask = vec![false; n];
    for i in index::sample(rng, n, m.min(n)) {
        mask[i] = true;
    }
    mask
}

/// Seeded generator, or one drawn from OS entropy when no seed is given.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Partition `0..n` according to `spec`.
///
/// * `n` - Number of examples.
/// * `spec` - Fractions for a three-way split, or a calibration count.
/// * `seed` - Seed for reproducible partitions; `None` uses ambient randomness.
pub fn split(n: usize, spec: &SplitSpec, seed: Option<u64>) -> Result<Partition, ConformalError> {
    let mut rng = seeded_rng(seed);
    spec.splitter().split(&mut rng, n)
}
