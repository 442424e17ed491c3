//! # FX Arb Annealer
//!
//! Detects currency arbitrage cycles by encoding the exchange graph as an
//! Ising model and annealing it on every tick.
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `market`: Currencies, edges, ticks, orders, wire codec and tick data
//! - `model`: Incremental coupling matrix and energy diagnostics
//! - `solver`: Bifurcation and replica annealers
//! - `engine`: Per-tick pricing, order emission and the worker pipeline
//! - `persistence`: SQLite order journal
//! - `replay`: Offline replay with a Bellman-Ford reference

pub mod config;
pub mod engine;
pub mod market;
pub mod model;
pub mod persistence;
pub mod replay;
pub mod solver;

#[cfg(test)]
pub(crate) mod testkit;

pub use config::Config;
