//! Profit-maximising threshold search over a small candidate grid.
//!
//! The objective is piecewise constant in the threshold (it only moves when
//! a validation score crosses it), so an exhaustive scan is exact.

use crate::common::config::OptimizerCfg;
use crate::common::error::{GuardError, GuardResult};

use super::domain::{Economics, OptimizationResult, ScoredLabel, ThresholdRepo};

/// `points` evenly spaced values from `start` to `stop` inclusive.
pub fn threshold_grid(start: f64, stop: f64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![start],
        n => {
            let step = (stop - start) / (n - 1) as f64;
            let mut grid: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            grid[n - 1] = stop;
            grid
        }
    }
}

/// Evaluate every candidate in order and keep the first strict maximum.
///
/// Candidates with no qualifying calls are skipped. When every candidate is
/// skipped the search reports `NoUsableThreshold`.
pub fn optimize(
    candidates: &[f64],
    validation: &[ScoredLabel],
    economics: Economics,
) -> GuardResult<OptimizationResult> {
    if candidates.iter().any(|t| !t.is_finite()) {
        return Err(GuardError::invalid("threshold candidates must be finite"));
    }
    if candidates.windows(2).any(|w| w[0] >= w[1]) {
        return Err(GuardError::invalid(
            "threshold candidates must be strictly increasing",
        ));
    }

    let mut best: Option<OptimizationResult> = None;
    for &threshold in candidates {
        let (calls, true_positives) = validation
            .iter()
            .filter(|row| row.probability >= threshold)
            .fold((0usize, 0usize), |(calls, tp), row| {
                (calls + 1, tp + usize::from(row.converted))
            });
        if calls == 0 {
            tracing::debug!(threshold, "no calls at threshold, skipped");
            continue;
        }

        let profit = economics.profit(true_positives, calls);
        tracing::debug!(threshold, calls, true_positives, profit, "threshold evaluated");
        if best.map_or(true, |b| profit > b.profit) {
            best = Some(OptimizationResult {
                threshold,
                profit,
                calls,
                true_positives,
            });
        }
    }

    best.ok_or(GuardError::NoUsableThreshold {
        candidates: candidates.len(),
    })
}

/// Run the configured search and persist the winning threshold.
pub fn fit_threshold(
    cfg: &OptimizerCfg,
    validation: &[ScoredLabel],
    repo: &dyn ThresholdRepo,
) -> GuardResult<OptimizationResult> {
    let economics = Economics::new(cfg.reward_per_conversion, cfg.cost_per_call)?;
    let grid = threshold_grid(cfg.grid_start, cfg.grid_stop, cfg.grid_points);
    let result = optimize(&grid, validation, economics)?;
    repo.put_threshold(result.threshold)?;
    tracing::info!(
        threshold = result.threshold,
        profit = result.profit,
        calls = result.calls,
        validation_rows = validation.len(),
        "operating threshold selected"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::Cell;

    fn econ() -> Economics {
        Economics::new(100.0, 10.0).unwrap()
    }

    fn rows(pairs: &[(f64, u8)]) -> Vec<ScoredLabel> {
        pairs.iter().copied().map(ScoredLabel::from).collect()
    }

    fn campaign_rows() -> Vec<ScoredLabel> {
        rows(&[(0.9, 1), (0.8, 1), (0.3, 0), (0.2, 0)])
    }

    #[derive(Default)]
    struct MemRepo(Cell<Option<f64>>);

    impl ThresholdRepo for MemRepo {
        fn put_threshold(&self, threshold: f64) -> GuardResult<()> {
            self.0.set(Some(threshold));
            Ok(())
        }

        fn get_threshold(&self) -> GuardResult<f64> {
            self.0
                .get()
                .ok_or_else(|| GuardError::config("nothing stored"))
        }
    }

    #[test]
    fn grid_matches_linspace() {
        let grid = threshold_grid(0.1, 0.9, 9);
        assert_eq!(grid.len(), 9);
        assert_eq!(grid[0], 0.1);
        assert_eq!(grid[8], 0.9);
        for (i, t) in grid.iter().enumerate() {
            assert!((t - (0.1 + 0.1 * i as f64)).abs() < 1e-12);
        }
        assert!(threshold_grid(0.1, 0.9, 0).is_empty());
        assert_eq!(threshold_grid(0.4, 0.9, 1), vec![0.4]);
    }

    #[test]
    fn picks_profit_maximising_threshold_on_default_grid() {
        let result = optimize(&threshold_grid(0.1, 0.9, 9), &campaign_rows(), econ()).unwrap();
        // Calling only the two converters is optimal: 2 * 100 - 2 * 10.
        assert_eq!(result.profit, 180.0);
        assert_eq!(result.calls, 2);
        assert_eq!(result.true_positives, 2);
        // linspace puts 0.30000000000000004 here; the first maximum keeps it.
        assert_eq!(result.threshold, threshold_grid(0.1, 0.9, 9)[2]);
    }

    #[test]
    fn explicit_candidates() {
        let result = optimize(&[0.25, 0.5, 0.85], &campaign_rows(), econ()).unwrap();
        assert_eq!(result.threshold, 0.5);
        assert_eq!(result.profit, 180.0);
    }

    #[test]
    fn first_maximum_wins_ties() {
        let result = optimize(&[0.5, 0.6, 0.7], &rows(&[(0.9, 1)]), econ()).unwrap();
        assert_eq!(result.threshold, 0.5);
        assert_eq!(result.profit, 90.0);
    }

    #[test]
    fn empty_call_sets_are_skipped() {
        // 0.95 has no calls and must not register as profit 0.
        let data = rows(&[(0.9, 0), (0.8, 0)]);
        let result = optimize(&[0.5, 0.95], &data, econ()).unwrap();
        assert_eq!(result.threshold, 0.5);
        assert_eq!(result.profit, -20.0);
    }

    #[test]
    fn no_usable_threshold_is_reported() {
        let low = rows(&[(0.05, 1), (0.01, 0)]);
        let grid = threshold_grid(0.1, 0.9, 9);
        assert!(matches!(
            optimize(&grid, &low, econ()),
            Err(GuardError::NoUsableThreshold { candidates: 9 })
        ));
        assert!(matches!(
            optimize(&grid, &[], econ()),
            Err(GuardError::NoUsableThreshold { .. })
        ));
        assert!(matches!(
            optimize(&[], &campaign_rows(), econ()),
            Err(GuardError::NoUsableThreshold { candidates: 0 })
        ));
    }

    #[test]
    fn unordered_candidates_are_rejected() {
        assert!(matches!(
            optimize(&[0.5, 0.3], &campaign_rows(), econ()),
            Err(GuardError::InvalidInput(_))
        ));
        assert!(optimize(&[0.5, f64::NAN], &campaign_rows(), econ()).is_err());
    }

    #[test]
    fn fit_threshold_persists_result() {
        let repo = MemRepo::default();
        let result = fit_threshold(&OptimizerCfg::default(), &campaign_rows(), &repo).unwrap();
        assert_eq!(repo.get_threshold().unwrap(), result.threshold);
    }

    #[test]
    fn fit_threshold_leaves_repo_untouched_on_failure() {
        let repo = MemRepo::default();
        let err = fit_threshold(&OptimizerCfg::default(), &rows(&[(0.01, 1)]), &repo);
        assert!(err.is_err());
        assert!(repo.get_threshold().is_err());
    }

    proptest! {
        #[test]
        fn result_is_maximal_over_candidates(
            data in prop::collection::vec((0.0f64..1.0, any::<bool>()), 1..60),
        ) {
            let validation: Vec<ScoredLabel> =
                data.iter().map(|&(p, y)| ScoredLabel::new(p, y)).collect();
            let grid = threshold_grid(0.1, 0.9, 9);
            if let Ok(best) = optimize(&grid, &validation, econ()) {
                for &t in &grid {
                    let calls: Vec<_> = validation.iter().filter(|r| r.probability >= t).collect();
                    if calls.is_empty() {
                        continue;
                    }
                    let tp = calls.iter().filter(|r| r.converted).count();
                    let profit = econ().profit(tp, calls.len());
                    prop_assert!(profit <= best.profit);
                    if profit == best.profit {
                        prop_assert!(t >= best.threshold);
                    }
                }
            } else {
                prop_assert!(validation.iter().all(|r| r.probability < grid[0]));
            }
        }
    }
}
