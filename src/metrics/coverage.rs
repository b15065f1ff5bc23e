use crate::data::Outcome;
use crate::errors::ConformalError;
use crate::region::Region;
use crate::utils::validate_lengths;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::hash::Hash;

/// Descriptive statistics of region sizes (interval width or set cardinality).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Coverage within one subgroup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupCoverage<G> {
    pub group: G,
    /// Number of test examples in the group.
    pub n: usize,
    /// Number of those whose outcome fell inside its region.
    pub covered: usize,
    pub coverage: f64,
}

/// Coverage summary of a single calibration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Number of test examples evaluated.
    pub n: usize,
    pub coverage: f64,
    pub size: SizeStats,
    /// Per-group coverage, when group labels were supplied.
    #[serde(default)]
    pub groups: Option<Vec<GroupCoverage<u64>>>,
}

impl CoverageReport {
    /// Build the report from aligned outcomes and regions.
    pub fn new(outcomes: &[Outcome], regions: &[Region], groups: Option<&[u64]>) -> Result<Self, ConformalError> {
        let coverage = coverage(outcomes, regions)?;
        let size = region_size_stats(regions)?;
        let groups = match groups {
            Some(g) => Some(stratified_coverage(outcomes, regions, g)?),
            None => None,
        };
        Ok(CoverageReport {
            n: regions.len(),
            coverage,
            size,
            groups,
        })
    }
}

fn covered_flags(outcomes: &[Outcome], regions: &[Region]) -> Result<Vec<bool>, ConformalError> {
    validate_lengths("outcomes", outcomes.len(), "regions", regions.len())?;
    if regions.is_empty() {
        return Err(ConformalError::EmptyTestSet);
    }
    regions
        .iter()
        .zip(outcomes)
        .map(|(r, y)| r.contains(*y))
        .collect()
}

/// Fraction of test examples whose outcome lies inside its region.
///
/// * `outcomes` - True outcomes, aligned with `regions`.
/// * `regions` - Prediction regions of the same examples.
pub fn coverage(outcomes: &[Outcome], regions: &[Region]) -> Result<f64, ConformalError> {
    let flags = covered_flags(outcomes, regions)?;
    let covered = flags.iter().filter(|c| **c).count();
    Ok(covered as f64 / flags.len() as f64)
}

/// Coverage computed independently within each group, sorted by group.
///
/// Marginal coverage says nothing about any single group; this exposes the
/// difference.
pub fn stratified_coverage<G>(
    outcomes: &[Outcome],
    regions: &[Region],
    groups: &[G],
) -> Result<Vec<GroupCoverage<G>>, ConformalError>
where
    G: Hash + Eq + Ord + Clone,
{
    let flags = covered_flags(outcomes, regions)?;
    validate_lengths("groups", groups.len(), "regions", regions.len())?;
    let mut counts: HashMap<&G, (usize, usize)> = HashMap::new();
    for (g, c) in groups.iter().zip(&flags) {
        let entry = counts.entry(g).or_insert((0, 0));
        entry.0 += 1;
        if *c {
            entry.1 += 1;
        }
    }
    let mut res: Vec<GroupCoverage<G>> = counts
        .into_iter()
        .map(|(g, (n, covered))| GroupCoverage {
            group: g.clone(),
            n,
            covered,
            coverage: covered as f64 / n as f64,
        })
        .collect();
    res.sort_by(|a, b| a.group.cmp(&b.group));
    Ok(res)
}

/// Mean, min and max region size. No guarantee is attached to these.
pub fn region_size_stats(regions: &[Region]) -> Result<SizeStats, ConformalError> {
    if regions.is_empty() {
        return Err(ConformalError::EmptyTestSet);
    }
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for r in regions {
        let s = r.size();
        min = min.min(s);
        max = max.max(s);
        sum += s;
    }
    Ok(SizeStats {
        mean: sum / regions.len() as f64,
        min,
        max,
    })
}
