//! Train-then-serve flow across the public API.

use cohortguard::common::config::AppCfg;
use cohortguard::data::{self, Cohort, ControlPct, Record};
use cohortguard::evaluation::repo_fs::FsReferenceRepo;
use cohortguard::evaluation::{ReferenceDistribution, ReferenceRepo};
use cohortguard::inference::{Decision, DecisionService, Scorer};
use cohortguard::training::repo_fs::FsThresholdRepo;
use cohortguard::training::{self, ScoredLabel, ThresholdRepo};
use cohortguard::GuardResult;

const JOBS: [&str; 4] = ["admin", "technician", "services", "management"];
const MONTHS: [&str; 4] = ["may", "jun", "jul", "aug"];

fn customers(n: i64) -> Vec<Record> {
    (0..n)
        .map(|i| {
            Record::new()
                .with("age", 20 + i % 50)
                .with("job", JOBS[(i % 4) as usize])
                .with("education", "secondary")
                .with("balance", (i * 37) % 5000)
                .with("day", 1 + i % 28)
                .with("month", MONTHS[(i % 3) as usize])
                .with("campaign", 1 + i % 5)
        })
        .collect()
}

/// Stand-in for the fitted classifier.
struct BalanceModel;

impl Scorer for BalanceModel {
    fn score(&self, record: &Record) -> GuardResult<f64> {
        let balance: f64 = record
            .get("balance")
            .map(|v| v.to_string())
            .unwrap_or_default()
            .parse()
            .unwrap_or(0.0);
        Ok(balance / 5000.0)
    }
}

fn converted(probability: f64) -> bool {
    probability > 0.6
}

#[test]
fn records_keep_their_cohort_across_runs() {
    let pct = ControlPct::new(20).unwrap();
    let first = data::split(customers(500), pct);
    let second = data::split(customers(500), pct);
    let ids = |side: &[data::service::Assigned]| {
        side.iter().map(|a| a.pseudo_id.clone()).collect::<Vec<_>>()
    };
    assert_eq!(ids(first.control.as_slice()), ids(second.control.as_slice()));
    assert_eq!(ids(first.train.as_slice()), ids(second.train.as_slice()));
    for a in &first.train {
        assert_eq!(data::assign(&a.pseudo_id, pct), Cohort::Train);
    }
}

#[test]
fn train_then_serve() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = AppCfg::default();
    cfg.data_root = dir.path().to_path_buf();

    let split = data::split(customers(2000), ControlPct::new(cfg.assignment.control_pct).unwrap());
    assert!(!split.control.is_empty());

    let model = BalanceModel;
    let validation: Vec<ScoredLabel> = split
        .train
        .iter()
        .map(|a| {
            let p = model.score(&a.record).unwrap();
            ScoredLabel::new(p, converted(p))
        })
        .collect();

    let control_labels: Vec<bool> = split
        .control
        .iter()
        .map(|a| converted(model.score(&a.record).unwrap()))
        .collect();
    let baseline = data::service::conversion_rate(&control_labels).unwrap();
    assert!(baseline > 0.0 && baseline < 1.0);

    let thresholds = FsThresholdRepo::new(&cfg);
    let best = training::fit_threshold(&cfg.optimizer, &validation, &thresholds).unwrap();
    // Only scores above 0.6 convert; the 0.6 grid point keeps all of them.
    assert!((best.threshold - 0.6).abs() < 1e-9, "{best:?}");
    assert!(best.profit > 0.0);

    let references = FsReferenceRepo::new(&cfg);
    let reference: Vec<f64> = validation.iter().map(|v| v.probability).collect();
    references
        .put_reference(&ReferenceDistribution::new(reference).unwrap())
        .unwrap();

    let service =
        DecisionService::from_repos(Box::new(BalanceModel), &cfg, &thresholds, &references)
            .unwrap();
    assert_eq!(service.threshold(), thresholds.get_threshold().unwrap());

    let mut calls = 0;
    for a in split.control.iter().cycle().take(1000) {
        let p = service.predict(&a.record).unwrap();
        if p.prediction == Decision::Call {
            calls += 1;
        }
    }
    assert!(calls > 0);
    let stats = service.monitor().stats();
    assert!(stats.ready);
    assert_eq!(stats.observations, 1000);
    assert!(stats.psi < 0.25, "same population should not drift: {}", stats.psi);
}
