//! Summary statistics for a replay.

use crate::engine::TickOutcome;
use serde::{Deserialize, Serialize};

/// Counters collected while replaying a tick tape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayMetrics {
    pub ticks: u64,
    pub ticks_rejected: u64,
    pub solves: u64,
    pub orders: u64,
    pub valid_cycles: u64,
    pub profitable_cycles: u64,
    /// Solves where Bellman-Ford found an arbitrage in the same prices
    pub reference_detections: u64,
    /// Solves where the annealer and Bellman-Ford agreed on whether a
    /// profitable cycle exists
    pub agreements: u64,
    pub total_solve_micros: u64,
    pub max_solve_micros: u64,
}

impl ReplayMetrics {
    pub fn record_rejected(&mut self) {
        self.ticks += 1;
        self.ticks_rejected += 1;
    }

    /// Fold in one processed tick. `reference` is the Bellman-Ford verdict
    /// for the prices the annealer saw, `None` when no solve ran.
    pub fn record(&mut self, outcome: &TickOutcome, reference: Option<bool>) {
        self.ticks += 1;
        self.orders += outcome.orders.len() as u64;

        let Some(detected) = reference else {
            return;
        };
        if outcome.solution.is_none() {
            return;
        }

        self.solves += 1;
        let micros = outcome.solve_time.as_micros() as u64;
        self.total_solve_micros += micros;
        self.max_solve_micros = self.max_solve_micros.max(micros);

        if outcome.valid_cycle {
            self.valid_cycles += 1;
        }
        if outcome.profitable {
            self.profitable_cycles += 1;
        }
        if detected {
            self.reference_detections += 1;
        }
        if detected == outcome.profitable {
            self.agreements += 1;
        }
    }

    /// Share of solves that agreed with Bellman-Ford, 1.0 with no solves.
    pub fn agreement_rate(&self) -> f64 {
        if self.solves == 0 {
            return 1.0;
        }
        self.agreements as f64 / self.solves as f64
    }

    /// Share of Bellman-Ford detections the annealer also turned into a
    /// profitable cycle.
    pub fn hit_rate(&self) -> f64 {
        if self.reference_detections == 0 {
            return 0.0;
        }
        self.profitable_cycles.min(self.reference_detections) as f64
            / self.reference_detections as f64
    }

    pub fn avg_solve_micros(&self) -> f64 {
        if self.solves == 0 {
            return 0.0;
        }
        self.total_solve_micros as f64 / self.solves as f64
    }

    /// Format metrics as a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            r#"
=== Replay Results ===

Ticks:
  Processed:           {}
  Rejected:            {}

Solver:
  Solves:              {}
  Avg Solve Time:      {:.1} us
  Max Solve Time:      {} us

Cycles:
  Valid Cycles:        {}
  Profitable Cycles:   {}
  Bellman-Ford Hits:   {}
  Agreement Rate:      {:.1}%
  Hit Rate:            {:.1}%

Orders:
  Emitted:             {}
"#,
            self.ticks,
            self.ticks_rejected,
            self.solves,
            self.avg_solve_micros(),
            self.max_solve_micros,
            self.valid_cycles,
            self.profitable_cycles,
            self.reference_detections,
            self.agreement_rate() * 100.0,
            self.hit_rate() * 100.0,
            self.orders,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::Solution;
    use std::time::Duration;

    fn solved(profitable: bool, micros: u64) -> TickOutcome {
        TickOutcome {
            orders: Vec::new(),
            solution: Some(Solution {
                spins: vec![false; 19],
                energy: -210.0,
                step: 0,
                ancilla_flipped: false,
            }),
            valid_cycle: profitable,
            profitable,
            solve_time: Duration::from_micros(micros),
        }
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = ReplayMetrics::default();
        assert_eq!(metrics.agreement_rate(), 1.0);
        assert_eq!(metrics.hit_rate(), 0.0);
        assert_eq!(metrics.avg_solve_micros(), 0.0);
    }

    #[test]
    fn test_agreement_and_timing() {
        let mut metrics = ReplayMetrics::default();
        metrics.record(&TickOutcome::default(), None);
        metrics.record(&solved(true, 100), Some(true));
        metrics.record(&solved(false, 300), Some(true));
        metrics.record(&solved(false, 200), Some(false));
        metrics.record_rejected();

        assert_eq!(metrics.ticks, 5);
        assert_eq!(metrics.ticks_rejected, 1);
        assert_eq!(metrics.solves, 3);
        assert_eq!(metrics.reference_detections, 2);
        assert_eq!(metrics.agreements, 2);
        assert!((metrics.agreement_rate() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(metrics.hit_rate(), 0.5);
        assert_eq!(metrics.avg_solve_micros(), 200.0);
        assert_eq!(metrics.max_solve_micros, 300);
        assert!(metrics.summary().contains("Agreement Rate:      66.7%"));
    }
}
