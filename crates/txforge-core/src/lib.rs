//! Pipeline orchestration for txforge.
//!
//! The [`Pipeline`] drives the two public operations, `create_intent` and
//! `build_transaction`, across the validation layer, the handler registry,
//! and the intent store. [`PipelineBuilder`] wires a pipeline from
//! configuration.

pub mod builder;
pub mod pipeline;

pub use builder::{BuildError, PipelineBuilder};
pub use pipeline::{IntentRef, Pipeline};
