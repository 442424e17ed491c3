//! Tick processing engine.
//!
//! - `decision`: spin decoding, order emission and cycle checks
//! - `pricing`: one tick through model update, solve and decode
//! - `pipeline`: bounded queues and the worker thread around the engine
//! - `status`: process-wide counters

mod decision;
mod pipeline;
mod pricing;
mod status;

pub use decision::{
    check_all_zero, check_cycle, check_profitable, describe_edges, DecisionError, OrderEmitter,
    ORDER_QUANTITY,
};
pub use pipeline::{LogSink, OrderSink, Pipeline, PipelineReport, WireSink};
pub use pricing::{PricingEngine, PricingError, TickOutcome};
pub use status::{EngineStatus, StatusSnapshot};
