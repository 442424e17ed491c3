//! Offline replay of a tick tape through the pricing engine.

use super::metrics::ReplayMetrics;
use crate::engine::{PricingEngine, StatusSnapshot};
use crate::market::{find_negative_cycle, Order, TickSource};
use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

/// Complete result of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayResult {
    pub solver: String,
    pub metrics: ReplayMetrics,
    pub orders: Vec<Order>,
    pub status: StatusSnapshot,
    pub first_timestamp: Option<u64>,
    pub last_timestamp: Option<u64>,
}

impl ReplayResult {
    /// Get a summary string.
    pub fn summary(&self) -> String {
        let span = match (self.first_timestamp, self.last_timestamp) {
            (Some(first), Some(last)) => format!("{} .. {} ({} ms)", first, last, last - first),
            _ => "empty".to_string(),
        };
        format!(
            "{}\nSolver: {}\nTick Span: {}",
            self.metrics.summary(),
            self.solver,
            span
        )
    }
}

/// Drives every tick of a source through one [`PricingEngine`] in order.
pub struct ReplayEngine<S: TickSource> {
    source: S,
    engine: PricingEngine,
}

impl<S: TickSource> ReplayEngine<S> {
    pub fn new(source: S, engine: PricingEngine) -> Self {
        Self { source, engine }
    }

    pub fn engine(&self) -> &PricingEngine {
        &self.engine
    }

    pub fn into_engine(self) -> PricingEngine {
        self.engine
    }

    /// Replay the whole source.
    pub fn run(&mut self) -> Result<ReplayResult> {
        match self.source.available_range() {
            Some((start, end)) => self.run_range(start, end),
            None => Ok(self.finish(ReplayMetrics::default(), Vec::new(), None, None)),
        }
    }

    /// Replay ticks with `start <= timestamp <= end`.
    pub fn run_range(&mut self, start: u64, end: u64) -> Result<ReplayResult> {
        let ticks = self.source.load_range(start, end);
        info!(
            "⏪ [REPLAY] {} ticks from {} to {} with {}",
            ticks.len(),
            start,
            end,
            self.engine.solver_name()
        );

        let mut metrics = ReplayMetrics::default();
        let mut orders = Vec::new();

        for tick in &ticks {
            let outcome = match self.engine.on_tick(tick) {
                Ok(outcome) => outcome,
                Err(e) => {
                    debug!("[REPLAY] Skipped tick at {}: {}", tick.timestamp, e);
                    metrics.record_rejected();
                    continue;
                }
            };

            let reference = outcome.solution.as_ref().map(|_| {
                let model = self.engine.model();
                find_negative_cycle(model.table(), model.logged_prices()).is_some()
            });
            metrics.record(&outcome, reference);
            orders.extend_from_slice(&outcome.orders);
        }

        let first = ticks.iter().map(|t| t.timestamp).min();
        let last = ticks.iter().map(|t| t.timestamp).max();
        let result = self.finish(metrics, orders, first, last);

        info!(
            "⏪ [REPLAY] Complete: {} solves, {} profitable, {} orders, agreement {:.1}%",
            result.metrics.solves,
            result.metrics.profitable_cycles,
            result.metrics.orders,
            result.metrics.agreement_rate() * 100.0
        );
        Ok(result)
    }

    fn finish(
        &self,
        metrics: ReplayMetrics,
        orders: Vec<Order>,
        first_timestamp: Option<u64>,
        last_timestamp: Option<u64>,
    ) -> ReplayResult {
        ReplayResult {
            solver: self.engine.solver_name().to_string(),
            metrics,
            orders,
            status: self.engine.status().snapshot(),
            first_timestamp,
            last_timestamp,
        }
    }
}
