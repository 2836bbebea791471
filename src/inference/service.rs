//! Serving-side orchestration: score, decide, monitor.
//!
//! `DecisionService` is built once at startup from persisted artefacts and
//! shared across request handlers; the drift monitor inside it does its own
//! locking.

use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Instant;

use crate::common::config::AppCfg;
use crate::common::error::{GuardError, GuardResult};
use crate::data::domain::Record;
use crate::evaluation::domain::ReferenceRepo;
use crate::evaluation::monitor::DriftMonitor;
use crate::evaluation::service::psi_alert;
use crate::training::domain::{ThresholdRepo, DEFAULT_THRESHOLD};

use super::domain::{round4, Decision, Monitoring, Prediction, Scorer};

pub struct DecisionService {
    scorer: Box<dyn Scorer>,
    threshold: f64,
    alert_threshold: f64,
    monitor: Arc<DriftMonitor>,
}

impl DecisionService {
    /// Service with the default threshold and an empty monitor.
    pub fn new(scorer: Box<dyn Scorer>, cfg: &AppCfg) -> GuardResult<Self> {
        Ok(Self {
            scorer,
            threshold: DEFAULT_THRESHOLD,
            alert_threshold: cfg.monitor.alert_threshold,
            monitor: Arc::new(DriftMonitor::with_config(cfg.monitor.clone())?),
        })
    }

    /// Startup path: the threshold must exist, the reference is optional.
    ///
    /// Without a reference file the monitor keeps reporting a neutral PSI.
    pub fn from_repos(
        scorer: Box<dyn Scorer>,
        cfg: &AppCfg,
        thresholds: &dyn ThresholdRepo,
        references: &dyn ReferenceRepo,
    ) -> GuardResult<Self> {
        let threshold = thresholds.get_threshold()?;
        let service = Self::new(scorer, cfg)?.with_threshold(threshold)?;

        match references.get_reference() {
            Ok(reference) => service.monitor.set_reference(&reference)?,
            Err(GuardError::Io { path, source }) if source.kind() == ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "no reference distribution, drift checks disabled");
            }
            Err(err) => return Err(err),
        }

        tracing::info!(threshold, "decision service ready");
        Ok(service)
    }

    pub fn with_threshold(mut self, threshold: f64) -> GuardResult<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(GuardError::config(format!(
                "decision threshold must be within [0, 1], got {threshold}"
            )));
        }
        self.threshold = threshold;
        Ok(self)
    }

    /// Share an externally owned monitor, e.g. one also read by a metrics task.
    pub fn with_monitor(mut self, monitor: Arc<DriftMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn monitor(&self) -> &Arc<DriftMonitor> {
        &self.monitor
    }

    /// Score one record, decide, and feed the score to the drift monitor.
    pub fn predict(&self, record: &Record) -> GuardResult<Prediction> {
        let start = Instant::now();

        let probability = self.scorer.score(record)?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(GuardError::invalid(format!(
                "scorer returned {probability}, expected a probability"
            )));
        }

        let decision = Decision::from_threshold(probability, self.threshold);
        self.monitor.observe(probability);
        let psi = self.monitor.current_psi();
        let alert = psi_alert(psi, self.alert_threshold);
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        tracing::info!(
            probability,
            decision = decision.as_str(),
            latency_ms,
            psi,
            "prediction served"
        );
        if alert {
            tracing::warn!(psi, alert_threshold = self.alert_threshold, "score drift detected");
        }

        Ok(Prediction {
            prediction: decision,
            probability: round4(probability),
            decision_threshold: self.threshold,
            monitoring: Monitoring {
                psi,
                psi_alert: alert,
                latency_ms: (latency_ms * 100.0).round() / 100.0,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::domain::ReferenceDistribution;
    use crate::evaluation::repo_fs::FsReferenceRepo;
    use crate::training::repo_fs::FsThresholdRepo;

    fn balance_scorer() -> Box<dyn Scorer> {
        Box::new(|record: &Record| -> GuardResult<f64> {
            match record.get("balance") {
                Some(v) => v
                    .to_string()
                    .parse::<f64>()
                    .map(|b| (b / 10_000.0).clamp(0.0, 1.0))
                    .map_err(|_| GuardError::invalid("balance is not numeric")),
                None => Err(GuardError::invalid("balance missing")),
            }
        })
    }

    fn customer(balance: i64) -> Record {
        Record::new().with("age", 41).with("balance", balance)
    }

    #[test]
    fn decides_against_threshold() {
        let service = DecisionService::new(balance_scorer(), &AppCfg::default())
            .unwrap()
            .with_threshold(0.3)
            .unwrap();
        let hot = service.predict(&customer(4_000)).unwrap();
        assert_eq!(hot.prediction, Decision::Call);
        assert_eq!(hot.probability, 0.4);
        assert_eq!(hot.decision_threshold, 0.3);

        let cold = service.predict(&customer(1_000)).unwrap();
        assert_eq!(cold.prediction, Decision::NoCall);
        assert_eq!(service.monitor().len(), 2);
    }

    #[test]
    fn default_threshold_is_half() {
        let service = DecisionService::new(balance_scorer(), &AppCfg::default()).unwrap();
        assert_eq!(service.threshold(), 0.5);
        assert!(service.with_threshold(1.5).is_err());
    }

    #[test]
    fn scorer_errors_and_bad_probabilities_propagate() {
        let service = DecisionService::new(balance_scorer(), &AppCfg::default()).unwrap();
        assert!(service.predict(&Record::new()).is_err());

        let wild = DecisionService::new(
            Box::new(|_: &Record| -> GuardResult<f64> { Ok(1.7) }),
            &AppCfg::default(),
        )
        .unwrap();
        assert!(matches!(
            wild.predict(&Record::new()),
            Err(GuardError::InvalidInput(_))
        ));
        assert!(wild.monitor().is_empty());
    }

    #[test]
    fn startup_requires_threshold_but_not_reference() {
        let dir = tempfile::tempdir().unwrap();
        let thresholds = FsThresholdRepo::at(dir.path());
        let references = FsReferenceRepo::at(dir.path());
        let cfg = AppCfg::default();

        assert!(DecisionService::from_repos(balance_scorer(), &cfg, &thresholds, &references)
            .is_err());

        thresholds.put_threshold(0.4).unwrap();
        let service =
            DecisionService::from_repos(balance_scorer(), &cfg, &thresholds, &references).unwrap();
        assert_eq!(service.threshold(), 0.4);
        assert!(!service.monitor().has_reference());
    }

    #[test]
    fn drift_alert_fires_on_shifted_traffic() {
        let dir = tempfile::tempdir().unwrap();
        let thresholds = FsThresholdRepo::at(dir.path());
        let references = FsReferenceRepo::at(dir.path());
        thresholds.put_threshold(0.5).unwrap();
        let reference: Vec<f64> = (0..1000).map(|i| f64::from(i) / 5000.0).collect();
        references
            .put_reference(&ReferenceDistribution::new(reference).unwrap())
            .unwrap();

        let service = DecisionService::from_repos(
            balance_scorer(),
            &AppCfg::default(),
            &thresholds,
            &references,
        )
        .unwrap();

        let mut last = None;
        for i in 0..150 {
            let p = service.predict(&customer(8_000 + i)).unwrap();
            if i < 99 {
                assert_eq!(p.monitoring.psi, 0.0);
                assert!(!p.monitoring.psi_alert);
            }
            last = Some(p);
        }
        let last = last.unwrap();
        assert!(last.monitoring.psi > 0.25);
        assert!(last.monitoring.psi_alert);
    }

    #[test]
    fn prediction_serialises_to_json() {
        let service = DecisionService::new(balance_scorer(), &AppCfg::default()).unwrap();
        let json = serde_json::to_value(service.predict(&customer(6_000)).unwrap()).unwrap();
        assert_eq!(json["prediction"], "CALL");
        assert_eq!(json["monitoring"]["psi_alert"], false);
    }
}
