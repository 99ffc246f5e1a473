//! EventBus - broadcast-based fan-out of execution state.
//!
//! Lets any number of observers (CLI printer, a WebSocket layer, test probes)
//! follow a run without the sequencer knowing about them.

/// Core event bus implementation (broadcast channel).
pub mod bus;
/// Event type definitions.
pub mod types;

pub use bus::EventBus;
pub use types::ExecutionEvent;

#[cfg(test)]
mod tests;
