//! Process-wide, read-mostly status counters.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

/// Lock-free counters updated by the pricing engine and read from anywhere.
#[derive(Debug, Default)]
pub struct EngineStatus {
    ticks_received: AtomicU64,
    ticks_processed: AtomicU64,
    ticks_rejected: AtomicU64,
    matrix_initialized: AtomicBool,
    solver_runs: AtomicU64,
    solves_skipped: AtomicU64,
    ancilla_flips: AtomicU64,
    valid_cycles: AtomicU64,
    profitable_cycles: AtomicU64,
    orders_emitted: AtomicU64,
    last_energy_bits: AtomicU32,
    last_best_step: AtomicU64,
}

/// Point-in-time copy of [`EngineStatus`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub ticks_received: u64,
    pub ticks_processed: u64,
    pub ticks_rejected: u64,
    pub matrix_initialized: bool,
    pub solver_runs: u64,
    pub solves_skipped: u64,
    pub ancilla_flips: u64,
    pub valid_cycles: u64,
    pub profitable_cycles: u64,
    pub orders_emitted: u64,
    pub last_energy: f32,
    pub last_best_step: u64,
}

impl EngineStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.ticks_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_processed(&self) {
        self.ticks_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.ticks_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_matrix_initialized(&self, done: bool) {
        self.matrix_initialized.store(done, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.solves_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_solve(&self, energy: f32, best_step: usize, ancilla_flipped: bool) {
        self.solver_runs.fetch_add(1, Ordering::Relaxed);
        self.last_energy_bits.store(energy.to_bits(), Ordering::Relaxed);
        self.last_best_step.store(best_step as u64, Ordering::Relaxed);
        if ancilla_flipped {
            self.ancilla_flips.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_cycle(&self, profitable: bool) {
        self.valid_cycles.fetch_add(1, Ordering::Relaxed);
        if profitable {
            self.profitable_cycles.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_orders(&self, count: usize) {
        self.orders_emitted.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            ticks_received: self.ticks_received.load(Ordering::Relaxed),
            ticks_processed: self.ticks_processed.load(Ordering::Relaxed),
            ticks_rejected: self.ticks_rejected.load(Ordering::Relaxed),
            matrix_initialized: self.matrix_initialized.load(Ordering::Relaxed),
            solver_runs: self.solver_runs.load(Ordering::Relaxed),
            solves_skipped: self.solves_skipped.load(Ordering::Relaxed),
            ancilla_flips: self.ancilla_flips.load(Ordering::Relaxed),
            valid_cycles: self.valid_cycles.load(Ordering::Relaxed),
            profitable_cycles: self.profitable_cycles.load(Ordering::Relaxed),
            orders_emitted: self.orders_emitted.load(Ordering::Relaxed),
            last_energy: f32::from_bits(self.last_energy_bits.load(Ordering::Relaxed)),
            last_best_step: self.last_best_step.load(Ordering::Relaxed),
        }
    }
}
