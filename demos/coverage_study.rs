//! Coverage study on synthetic data for all three tasks.
//!
//! Run with `RUST_LOG=info cargo run --release --example coverage_study`.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use split_conformal::data::{Matrix, ModelOutput, ModelPredictions, Outcomes};
use split_conformal::monte_carlo::MonteCarloStudy;
use split_conformal::score::Task;
use split_conformal::split::{Partition, SplitSpec};
use split_conformal::{ConformalConfig, ConformalError, SplitConformal};

fn main() -> Result<(), ConformalError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let n = 5000;
    let mut rng = StdRng::seed_from_u64(2024);
    let x: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..10.0)).collect();
    // heteroscedastic: noise grows with x
    let y: Vec<f64> = x.iter().map(|xi| 2.0 * xi + 1.0 + rng.gen_range(-1.0..1.0) * (0.2 + 0.3 * xi)).collect();
    let groups: Vec<u64> = x.iter().map(|xi| (*xi / 2.5) as u64).collect();

    let base = ConformalConfig {
        alpha: 0.1,
        seed: Some(7),
        n_runs: 500,
        ..Default::default()
    };

    // Regression: refit a least-squares line on each run's training block.
    let cfg = ConformalConfig {
        task: Task::Regression,
        split: SplitSpec::Fractions { train: 0.4, calib: 0.3 },
        ..base.clone()
    };
    let study = MonteCarloStudy::new(cfg)?;
    let report = study.run_with_model(&Outcomes::Continuous(&y), Some(&groups), |p: &Partition| {
        let (slope, intercept) = least_squares(&x, &y, &p.train);
        Ok(ModelPredictions::Point(x.iter().map(|xi| slope * xi + intercept).collect()))
    })?;
    print_summary("regression", &report.summary())?;

    // CQR: a pretrained model with fixed, too narrow quantile bands.
    let lower: Vec<f64> = x.iter().map(|xi| 2.0 * xi + 1.0 - 0.5).collect();
    let upper: Vec<f64> = x.iter().map(|xi| 2.0 * xi + 1.0 + 0.5).collect();
    let cfg = ConformalConfig {
        task: Task::Cqr,
        split: SplitSpec::CalibrationCount(1000),
        ..base.clone()
    };
    let report = MonteCarloStudy::new(cfg)?.run_pretrained(
        &ModelOutput::Quantiles {
            lower: &lower,
            upper: &upper,
        },
        &Outcomes::Continuous(&y),
        Some(&groups),
    )?;
    print_summary("cqr", &report.summary())?;

    // A single CQR run with a fixed seed, kept for inspection.
    let model = SplitConformal::new(Task::Cqr, 0.1)?
        .set_split(SplitSpec::CalibrationCount(1000))
        .set_seed(Some(7));
    let (partition, run) = model.run_split(
        &ModelOutput::Quantiles {
            lower: &lower,
            upper: &upper,
        },
        &Outcomes::Continuous(&y),
        Some(&groups),
    )?;
    let json = serde_json::to_string_pretty(&run).map_err(|e| ConformalError::UnableToWrite(e.to_string()))?;
    println!("single cqr run ({} test examples): {}", partition.test.len(), json);

    // Classification: softmax over distances to three class centres.
    let k = 3;
    let centres = [2.0, 5.0, 8.0];
    let mut probs = Vec::with_capacity(n * k);
    let mut labels = Vec::with_capacity(n);
    for xi in &x {
        let logits: Vec<f64> = centres.iter().map(|c| -(xi - c).powi(2) / 2.0).collect();
        let total: f64 = logits.iter().map(|l| l.exp()).sum();
        let row: Vec<f64> = logits.iter().map(|l| l.exp() / total).collect();
        let u = rng.gen::<f64>();
        let mut acc = 0.0;
        let mut label = k - 1;
        for (j, p) in row.iter().enumerate() {
            acc += p;
            if u < acc {
                label = j;
                break;
            }
        }
        labels.push(label);
        probs.extend(row);
    }
    let cfg = ConformalConfig {
        task: Task::Classification,
        split: SplitSpec::CalibrationCount(1000),
        ..base
    };
    let report = MonteCarloStudy::new(cfg)?.run_pretrained(
        &ModelOutput::Probabilities(Matrix::new_row_major(&probs, n, k)),
        &Outcomes::Labels(&labels),
        Some(&groups),
    )?;
    print_summary("classification", &report.summary())?;
    Ok(())
}

fn least_squares(x: &[f64], y: &[f64], index: &[usize]) -> (f64, f64) {
    let m = index.len() as f64;
    let mx = index.iter().map(|i| x[*i]).sum::<f64>() / m;
    let my = index.iter().map(|i| y[*i]).sum::<f64>() / m;
    let sxy: f64 = index.iter().map(|i| (x[*i] - mx) * (y[*i] - my)).sum();
    let sxx: f64 = index.iter().map(|i| (x[*i] - mx).powi(2)).sum();
    let slope = sxy / sxx;
    (slope, my - slope * mx)
}

fn print_summary(name: &str, summary: &split_conformal::StudySummary) -> Result<(), ConformalError> {
    let json = serde_json::to_string_pretty(summary).map_err(|e| ConformalError::UnableToWrite(e.to_string()))?;
    println!("{}: {}", name, json);
    Ok(())
}
