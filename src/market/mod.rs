//! Market vocabulary and data plumbing.
//!
//! - `types`: currencies, symbols, edges, ticks and orders
//! - `codec`: fixed-width binary wire records
//! - `data`: CSV tick tapes and the synthetic generator
//! - `graph`: Bellman-Ford negative-cycle reference

pub mod codec;
pub mod data;
pub mod graph;
mod types;

pub use codec::{CodecError, ORDER_WIRE_LEN, TICK_WIRE_LEN};
pub use data::{CsvTickLoader, TickGenerator, TickSource};
pub use graph::{find_negative_cycle, has_arbitrage};
pub use types::{
    Direction, EdgeTable, ExchangeEdge, MarketError, OpCode, Order, SymbolPair, Tick,
    DEFAULT_CURRENCIES, DEFAULT_SYMBOLS,
};
