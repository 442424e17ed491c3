//! Per-tick processing: model update, solve, decode.

use super::decision::{
    check_all_zero, check_cycle, check_profitable, describe_edges, DecisionError, OrderEmitter,
};
use super::status::EngineStatus;
use crate::config::Config;
use crate::market::{EdgeTable, Order, Tick};
use crate::model::{CouplingModel, Penalty};
use crate::solver::{build_annealer, Annealer, Solution};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Tick rejected before it could touch the model.
#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    #[error("symbol {symbol} out of range ({symbols} symbols configured)")]
    UnknownSymbol { symbol: u16, symbols: usize },
    #[error("symbol {symbol} has a non-positive or non-finite quote (bid {bid}, ask {ask})")]
    InvalidPrice { symbol: u16, bid: f32, ask: f32 },
    #[error(transparent)]
    Decision(#[from] DecisionError),
}

/// What one tick produced.
#[derive(Debug, Clone, Default)]
pub struct TickOutcome {
    pub orders: Vec<Order>,
    /// `None` while the model is still waiting for prices
    pub solution: Option<Solution>,
    pub valid_cycle: bool,
    pub profitable: bool,
    pub solve_time: Duration,
}

/// Owns the model and the annealer; processes one tick to completion.
pub struct PricingEngine {
    model: CouplingModel,
    annealer: Box<dyn Annealer>,
    emitter: OrderEmitter,
    status: Arc<EngineStatus>,
}

impl PricingEngine {
    /// Build a model in the encoding the annealer expects.
    pub fn new(table: EdgeTable, penalty: Penalty, annealer: Box<dyn Annealer>) -> Self {
        let model = CouplingModel::new(table, annealer.encoding(), penalty);
        let status = Arc::new(EngineStatus::new());
        status.set_matrix_initialized(model.is_initialized());
        Self {
            model,
            annealer,
            emitter: OrderEmitter::new(),
            status,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        let annealer = build_annealer(config).context("Failed to build annealer")?;
        Ok(Self::new(config.edge_table()?, config.penalty(), annealer))
    }

    /// Number orders from an existing sequence.
    pub fn with_emitter(mut self, emitter: OrderEmitter) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn status(&self) -> Arc<EngineStatus> {
        Arc::clone(&self.status)
    }

    pub fn model(&self) -> &CouplingModel {
        &self.model
    }

    pub fn emitter(&self) -> &OrderEmitter {
        &self.emitter
    }

    pub fn solver_name(&self) -> &'static str {
        self.annealer.name()
    }

    /// Update both edges of the ticking symbol, solve, and decode.
    pub fn on_tick(&mut self, tick: &Tick) -> std::result::Result<TickOutcome, PricingError> {
        self.status.record_received();

        let symbols = self.model.table().symbol_count();
        if tick.symbol as usize >= symbols {
            self.status.record_rejected();
            warn!("⚠️  [TICK] Unknown symbol {} ({} configured)", tick.symbol, symbols);
            return Err(PricingError::UnknownSymbol {
                symbol: tick.symbol,
                symbols,
            });
        }
        let valid = |p: f32| p.is_finite() && p > 0.0;
        if !valid(tick.bid) || !valid(tick.ask) {
            self.status.record_rejected();
            warn!(
                "⚠️  [TICK] Rejected quote for symbol {}: bid={} ask={}",
                tick.symbol, tick.bid, tick.ask
            );
            return Err(PricingError::InvalidPrice {
                symbol: tick.symbol,
                bid: tick.bid,
                ask: tick.ask,
            });
        }

        let symbol = tick.symbol as usize;
        self.model.update_price(EdgeTable::bid_edge(symbol), tick.bid.ln());
        self.model.update_price(EdgeTable::ask_edge(symbol), tick.ask.ln());

        if !self.model.is_fully_populated() {
            self.status.record_skipped();
            self.status.record_processed();
            debug!(
                "[TICK] Waiting for prices: {}/{} edges populated",
                self.model.populated_count(),
                self.model.table().edge_count()
            );
            return Ok(TickOutcome::default());
        }

        let started = Instant::now();
        let solution = self.annealer.solve(&self.model);
        let solve_time = started.elapsed();
        self.status
            .record_solve(solution.energy, solution.step, solution.ancilla_flipped);

        let spins = &solution.spins;
        let valid_cycle = !check_all_zero(spins) && check_cycle(spins, self.model.table());
        let profitable = valid_cycle && check_profitable(spins, &self.model);
        if valid_cycle {
            self.status.record_cycle(profitable);
        }

        let orders = self.emitter.decide(&self.model, spins, tick).map_err(|e| {
            warn!("🛑 [ORDER] Dropping decision at ts={}: {}", tick.timestamp, e);
            e
        })?;
        self.status.record_orders(orders.len());
        self.status.record_processed();

        if profitable {
            info!(
                "🎯 [SOLVE] {} found cycle [{}] energy={:.4} in {:?}",
                self.annealer.name(),
                describe_edges(spins, self.model.table()),
                solution.energy,
                solve_time
            );
        } else {
            debug!(
                "[SOLVE] {} ts={} energy={:.4} cycle={} profitable={} active=[{}]",
                self.annealer.name(),
                tick.timestamp,
                solution.energy,
                valid_cycle,
                profitable,
                describe_edges(spins, self.model.table())
            );
        }

        Ok(TickOutcome {
            orders,
            solution: Some(solution),
            valid_cycle,
            profitable,
            solve_time,
        })
    }
}
