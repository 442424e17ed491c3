//! Offline replay of recorded or generated ticks.
//!
//! Every solve is checked against a Bellman-Ford search over the same
//! prices, so a replay doubles as an accuracy report for the annealer.
//!
//! # Example
//!
//! ```rust,ignore
//! use fx_arb_annealer::market::CsvTickLoader;
//! use fx_arb_annealer::replay::ReplayEngine;
//!
//! let loader = CsvTickLoader::new("data/ticks.csv")?;
//! let engine = PricingEngine::from_config(&config)?;
//! let result = ReplayEngine::new(loader, engine).run()?;
//! println!("Agreement: {:.1}%", result.metrics.agreement_rate() * 100.0);
//! ```

mod engine;
mod metrics;

pub use engine::{ReplayEngine, ReplayResult};
pub use metrics::ReplayMetrics;
