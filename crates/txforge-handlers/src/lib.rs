//! Transaction handlers for the txforge pipeline.
//!
//! A handler owns everything protocol-specific about one intent kind: the
//! payload schema, the signer-independent eligibility checks performed at
//! creation time, and the assembly of unsigned, wire-ready transactions at
//! build time. The pipeline dispatches to handlers through the
//! [`HandlerRegistry`] and otherwise treats payloads as opaque.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use txforge_types::{IntentError, PreparedIntent, Schema, UnsignedTransaction};

mod util;

#[cfg(test)]
pub(crate) mod testing;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub(crate) mod common;

		pub mod bridge;
		pub mod lending;
		pub mod liquidity;
	}
	pub mod svm {
		pub mod transfer;
	}
}

pub use implementations::evm::bridge::BridgeHandler;
pub use implementations::evm::lending::{LendingHandler, LendingOperation};
pub use implementations::evm::liquidity::{LiquidityHandler, LiquidityOperation};
pub use implementations::svm::transfer::SvmTransferHandler;

/// Errors that can occur while wiring the handler registry.
#[derive(Debug, Error)]
pub enum RegistryError {
	#[error("handler for kind '{0}' already registered")]
	DuplicateKind(String),
}

/// The two-phase contract every intent kind implements.
///
/// `prepare` runs at intent creation: read-only, cheap to redo, independent
/// of the eventual signer. `assemble` runs at build time against live chain
/// state and must never touch key material.
#[async_trait]
pub trait TransactionHandler: Send + Sync {
	/// The kind discriminator this handler is registered under.
	fn kind(&self) -> &str;

	/// Structural and syntactic payload schema. Checked by the pipeline
	/// before `prepare`; never performs network I/O.
	fn schema(&self) -> Schema;

	/// Resolves eligibility (routes, market membership) and returns the
	/// normalized payload to persist, with an optional time-to-live when
	/// the resolved quote is time-sensitive.
	async fn prepare(&self, payload: &Value) -> Result<PreparedIntent, IntentError>;

	/// Assembles one or more unsigned transactions for the signer, fetching
	/// whatever live state it needs (fees, decimals, account existence).
	async fn assemble(
		&self,
		payload: &Value,
		signer: &str,
	) -> Result<Vec<UnsignedTransaction>, IntentError>;
}

/// Maps intent kinds to their handlers.
///
/// Built once at startup; read-only afterwards and shared across requests
/// via `Arc`.
pub struct HandlerRegistry {
	handlers: HashMap<String, Arc<dyn TransactionHandler>>,
}

impl HandlerRegistry {
	pub fn builder() -> HandlerRegistryBuilder {
		HandlerRegistryBuilder {
			handlers: HashMap::new(),
		}
	}

	/// Resolves the handler for a kind, failing closed on unknown kinds.
	pub fn resolve(&self, kind: &str) -> Result<Arc<dyn TransactionHandler>, IntentError> {
		self.handlers
			.get(kind)
			.cloned()
			.ok_or_else(|| IntentError::UnsupportedKind(kind.to_string()))
	}

	/// Every registered kind, for diagnostics.
	pub fn kinds(&self) -> Vec<&str> {
		self.handlers.keys().map(String::as_str).collect()
	}
}

pub struct HandlerRegistryBuilder {
	handlers: HashMap<String, Arc<dyn TransactionHandler>>,
}

impl HandlerRegistryBuilder {
	pub fn register(
		mut self,
		handler: Arc<dyn TransactionHandler>,
	) -> Result<Self, RegistryError> {
		let kind = handler.kind().to_string();
		if self.handlers.contains_key(&kind) {
			return Err(RegistryError::DuplicateKind(kind));
		}
		self.handlers.insert(kind, handler);
		Ok(self)
	}

	pub fn build(self) -> HandlerRegistry {
		HandlerRegistry {
			handlers: self.handlers,
		}
	}
}
