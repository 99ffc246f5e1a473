//! AURA Assembly - Assembly graph data model
//!
//! The assembly graph is the spine of the system: execution walks it,
//! analytics index into it, and every policy checkpoint is keyed by one of
//! its step ids.
//!
//! - Models: parts, steps, handlers and typed success criteria
//! - Loading: JSON parsing with load-time validation of the step order

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod graph;
pub mod step;

pub use error::{Error, Result};
pub use graph::{AssemblyGraph, Part};
pub use step::{AssemblyStep, Handler, PrimitiveParams, SuccessCriteria};
