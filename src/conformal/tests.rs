use super::*;
use crate::data::Matrix;
use crate::errors::ErrorKind;
use crate::region::Interval;
use crate::split::SplitSpec;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn regression_data(n: usize, seed: u64) -> (Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let x: Vec<f64> = (0..n).map(|_| rng.gen::<f64>()).collect();
    let y: Vec<f64> = x.iter().map(|xi| 3.0 * xi + rng.gen_range(-0.5..0.5)).collect();
    let yhat: Vec<f64> = x.iter().map(|xi| 3.0 * xi).collect();
    (yhat, y)
}

// Row-major probabilities, with labels drawn from the probabilities themselves.
fn classification_data(n: usize, k: usize, seed: u64) -> (Vec<f64>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut probs = Vec::with_capacity(n * k);
    let mut labels = Vec::with_capacity(n);
    for _ in 0..n {
        let raw: Vec<f64> = (0..k).map(|_| rng.gen::<f64>().powi(3)).collect();
        let total: f64 = raw.iter().sum();
        let row: Vec<f64> = raw.iter().map(|r| r / total).collect();
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
    (probs, labels)
}

fn cqr_data(n: usize, seed: u64) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let y: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..10.0)).collect();
    // deliberately too narrow
    let lower = vec![3.0; n];
    let upper = vec![7.0; n];
    (lower, upper, y)
}

#[test]
fn test_regression_pipeline() {
    let (yhat, y) = regression_data(1000, 0);
    let outputs = ModelOutput::Point(&yhat);
    let outcomes = Outcomes::Continuous(&y);
    let model = SplitConformal::new(Task::Regression, 0.1)
        .unwrap()
        .set_split(SplitSpec::CalibrationCount(400))
        .set_seed(Some(1));
    let (partition, report) = model.run_split(&outputs, &outcomes, None).unwrap();
    assert_eq!(partition.calib.len(), 400);
    assert_eq!(report.coverage.n, 600);
    assert_eq!(report.threshold.n_calibration, 400);
    assert_eq!(report.threshold.rank, 361);
    assert!(!report.threshold.clipped);
    // residuals are uniform on [0, 0.5]
    assert!((report.threshold.q_hat - 0.45).abs() < 0.05);
    assert!(report.coverage.coverage > 0.85);
    assert!((report.coverage.size.mean - 2.0 * report.threshold.q_hat).abs() < 1e-9);
}

#[test]
fn test_calibrate_then_predict() {
    let yhat = [70.0, 10.0, 20.0, 30.0, 40.0];
    let y = [0.0, 11.0, 18.0, 30.5, 42.5];
    let outputs = ModelOutput::Point(&yhat);
    let outcomes = Outcomes::Continuous(&y);
    let mut model = SplitConformal::new(Task::Regression, 0.25).unwrap();
    // scores [1, 2, 0.5, 2.5], k = ceil(0.75 * 5) = 4
    let threshold = *model.calibrate(&outputs, &outcomes, &[1, 2, 3, 4]).unwrap();
    assert_eq!(threshold.q_hat, 2.5);
    let regions = model.predict_regions(&outputs, &[0]).unwrap();
    assert_eq!(regions[0].as_interval().unwrap(), &Interval::new(67.5, 72.5));
}

#[test]
fn test_classification_pipeline() {
    let k = 4;
    let (probs, labels) = classification_data(2000, k, 3);
    let outputs = ModelOutput::Probabilities(Matrix::new_row_major(&probs, 2000, k));
    let outcomes = Outcomes::Labels(&labels);
    let model = SplitConformal::new(Task::Classification, 0.1)
        .unwrap()
        .set_split(SplitSpec::Fractions { train: 0.0, calib: 0.5 })
        .set_seed(Some(5));
    let (partition, report) = model.run_split(&outputs, &outcomes, None).unwrap();
    assert_eq!(partition.test.len(), 1000);
    assert!(report.coverage.coverage > 0.86, "{:?}", report);
    assert!(report.coverage.size.max <= k as f64);

    let mut calibrated = model.clone();
    calibrated.calibrate(&outputs, &outcomes, &partition.calib).unwrap();
    for region in calibrated.predict_regions(&outputs, &partition.test).unwrap() {
        let set = region.as_set().unwrap();
        assert_eq!(set.n_classes, k);
        assert!(set.classes.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn test_cqr_pipeline_widens_narrow_quantiles() {
    let (lower, upper, y) = cqr_data(1000, 4);
    let outputs = ModelOutput::Quantiles {
        lower: &lower,
        upper: &upper,
    };
    let outcomes = Outcomes::Continuous(&y);
    let model = SplitConformal::new(Task::Cqr, 0.2)
        .unwrap()
        .set_split(SplitSpec::CalibrationCount(500))
        .set_seed(Some(2));
    let (_, report) = model.run_split(&outputs, &outcomes, None).unwrap();
    // 80% of uniform(0, 10) needs [1, 9]: exceedance close to 2
    assert!((report.threshold.q_hat - 2.0).abs() < 0.3, "{:?}", report.threshold);
    assert!(report.coverage.coverage > 0.75);
    assert!((report.coverage.size.mean - (4.0 + 2.0 * report.threshold.q_hat)).abs() < 1e-9);
}

#[test]
fn test_run_is_idempotent_for_a_seed() {
    let (yhat, y) = regression_data(300, 9);
    let outputs = ModelOutput::Point(&yhat);
    let outcomes = Outcomes::Continuous(&y);
    let model = SplitConformal::new(Task::Regression, 0.1)
        .unwrap()
        .set_split(SplitSpec::Fractions { train: 0.2, calib: 0.4 })
        .set_seed(Some(77));
    let (p1, r1) = model.run_split(&outputs, &outcomes, None).unwrap();
    let (p2, r2) = model.run_split(&outputs, &outcomes, None).unwrap();
    assert_eq!(p1, p2);
    assert_eq!(r1, r2);
    assert_eq!(
        model.scores(&outputs, &outcomes, &p1.calib).unwrap(),
        model.scores(&outputs, &outcomes, &p2.calib).unwrap()
    );
}

#[test]
fn test_run_does_not_modify_model() {
    let (yhat, y) = regression_data(100, 1);
    let outputs = ModelOutput::Point(&yhat);
    let outcomes = Outcomes::Continuous(&y);
    let model = SplitConformal::new(Task::Regression, 0.1).unwrap().set_seed(Some(0));
    let partition = split(100, &SplitSpec::CalibrationCount(30), Some(0)).unwrap();
    model.run(&outputs, &outcomes, &partition, None).unwrap();
    assert!(model.threshold().is_none());
}

#[test]
fn test_not_calibrated() {
    let yhat = [1.0, 2.0];
    let model = SplitConformal::new(Task::Regression, 0.1).unwrap();
    let err = model.predict_regions(&ModelOutput::Point(&yhat), &[0]).unwrap_err();
    assert!(matches!(err, ConformalError::NotCalibrated));
}

#[test]
fn test_empty_calibration() {
    let yhat = [1.0, 2.0];
    let y = [1.0, 2.0];
    let mut model = SplitConformal::new(Task::Regression, 0.1).unwrap();
    let err = model
        .calibrate(&ModelOutput::Point(&yhat), &Outcomes::Continuous(&y), &[])
        .unwrap_err();
    assert!(matches!(err, ConformalError::EmptyCalibration));
    assert_eq!(err.kind(), ErrorKind::DegenerateCalibration);
    assert!(model.threshold().is_none());

    let partition = Partition {
        train: vec![],
        calib: vec![],
        test: vec![0, 1],
    };
    let err = model
        .run(&ModelOutput::Point(&yhat), &Outcomes::Continuous(&y), &partition, None)
        .unwrap_err();
    assert!(matches!(err, ConformalError::EmptyCalibration));
}

#[test]
fn test_invalid_alpha() {
    for alpha in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
        let err = SplitConformal::new(Task::Regression, alpha).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
    // a bad alpha set after construction is caught before calibrating
    let mut model = SplitConformal::default().set_alpha(0.0);
    assert!(model.calibrate_scores(&[1.0, 2.0]).is_err());
}

#[test]
fn test_failed_calibration_keeps_threshold() {
    let mut model = SplitConformal::new(Task::Regression, 0.5).unwrap();
    model.calibrate_scores(&[1.0, 2.0, 3.0]).unwrap();
    let before = *model.threshold().unwrap();
    assert!(model.calibrate_scores(&[]).is_err());
    assert_eq!(model.threshold(), Some(&before));
    // changing alpha invalidates it
    let model = model.set_alpha(0.2);
    assert!(model.threshold().is_none());
}

#[test]
fn test_groups_stratified_and_checked() {
    let (yhat, y) = regression_data(200, 6);
    let outputs = ModelOutput::Point(&yhat);
    let outcomes = Outcomes::Continuous(&y);
    let groups: Vec<u64> = (0..200).map(|i| (i % 3) as u64).collect();
    let model = SplitConformal::new(Task::Regression, 0.1)
        .unwrap()
        .set_split(SplitSpec::CalibrationCount(100))
        .set_seed(Some(3));
    let (partition, report) = model.run_split(&outputs, &outcomes, Some(&groups)).unwrap();
    let strata = report.coverage.groups.unwrap();
    assert_eq!(strata.iter().map(|g| g.group).collect::<Vec<_>>(), vec![0, 1, 2]);
    assert_eq!(strata.iter().map(|g| g.n).sum::<usize>(), partition.test.len());

    let err = model.run_split(&outputs, &outcomes, Some(&groups[..10])).unwrap_err();
    assert!(matches!(err, ConformalError::LengthMismatch { .. }));
}

#[test]
fn test_task_and_output_mismatch() {
    let yhat = [1.0, 2.0, 3.0];
    let y = [1.0, 2.0, 3.0];
    let model = SplitConformal::new(Task::Cqr, 0.1).unwrap();
    let partition = Partition::from_mask(&[true, true, false]);
    let err = model
        .run(&ModelOutput::Point(&yhat), &Outcomes::Continuous(&y), &partition, None)
        .unwrap_err();
    assert!(matches!(err, ConformalError::TaskMismatch { .. }));
}

#[test]
fn test_model_config_io() {
    let mut model = SplitConformal::new(Task::Classification, 0.05)
        .unwrap()
        .set_split(SplitSpec::CalibrationCount(250))
        .set_seed(Some(12));
    model.calibrate_scores(&[0.1, 0.4, 0.2]).unwrap();
    let json = model.json_dump().unwrap();
    let model2 = SplitConformal::from_json(&json).unwrap();
    assert_eq!(model2.cfg, model.cfg);
    assert_eq!(model2.threshold(), model.threshold());
}

#[test]
fn test_malformed_test_outcomes_fail_the_run() {
    let yhat = [1.0, 2.0, 3.0, 4.0];
    let y = [1.0, 2.5, 3.0, f64::NAN];
    let model = SplitConformal::new(Task::Regression, 0.5).unwrap();
    let partition = Partition::from_mask(&[true, true, false, false]);
    let err = model
        .run(&ModelOutput::Point(&yhat), &Outcomes::Continuous(&y), &partition, None)
        .unwrap_err();
    assert!(matches!(err, ConformalError::InvalidParameter(_, _, _)), "{}", err);
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let probs = [0.8, 0.2, 0.4, 0.6, 0.5, 0.5];
    let labels = [0usize, 1, 7];
    let model = SplitConformal::new(Task::Classification, 0.5).unwrap();
    let partition = Partition::from_mask(&[true, true, false]);
    let err = model
        .run(
            &ModelOutput::Probabilities(Matrix::new_row_major(&probs, 3, 2)),
            &Outcomes::Labels(&labels),
            &partition,
            None,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ConformalError::InvalidClassLabel { index: 2, label: 7, n_classes: 2 }
    ));
}

#[test]
fn test_evaluate_checks_only_test_rows() {
    // the bad outcome sits outside the evaluated rows
    let yhat = [1.0, 2.0, 3.0];
    let y = [1.0, 2.5, f64::NAN];
    let mut model = SplitConformal::new(Task::Regression, 0.5).unwrap();
    model.calibrate_scores(&[0.5, 1.0]).unwrap();
    let report = model
        .evaluate(&ModelOutput::Point(&yhat), &Outcomes::Continuous(&y), &[0, 1], None)
        .unwrap();
    assert_eq!(report.coverage, 1.0);
    assert!(model
        .evaluate(&ModelOutput::Point(&yhat), &Outcomes::Continuous(&y), &[2], None)
        .is_err());
}
