//! Shared types for the txforge transaction-intent pipeline.
//!
//! This crate defines the domain types passed between the pipeline and its
//! handlers: persisted intents, unsigned transaction payloads, the payload
//! schema engine, exact amount conversion, and the error taxonomy every
//! other crate maps into.

pub mod address;
pub mod amount;
pub mod cache;
pub mod config;
pub mod error;
pub mod intent;
pub mod schema;
pub mod transaction;

pub use error::{IntentError, Result};
pub use intent::{IntentRecord, PreparedIntent, TransactionIntent};
pub use schema::{Field, FieldError, FieldType, Schema, ValidationErrors};
pub use transaction::{TxEncoding, UnsignedTransaction};
