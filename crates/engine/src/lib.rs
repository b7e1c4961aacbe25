//! Campaign dispatch engine.
//!
//! Orchestrates the full send lifecycle: precondition checks, the Sending
//! state transition, concurrent per-recipient fan-out, outcome aggregation,
//! and the final state transition, with a compensating rollback on
//! catastrophic failure.

pub mod dispatch;
pub mod personalize;
pub mod recipients;
pub mod snapshot;
pub mod stats;

pub use dispatch::Dispatcher;
