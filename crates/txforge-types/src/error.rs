//! Error taxonomy for the transaction-intent pipeline.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::schema::ValidationErrors;

pub type Result<T> = std::result::Result<T, IntentError>;

/// The error taxonomy exposed by every pipeline operation.
///
/// Variants are grouped by who can act on them: `Validation` is user-fixable,
/// `Domain`/`UnsupportedKind` mean the request is well-formed but not
/// serviceable, and `Io` is the only variant callers may retry without
/// changing the input.
#[derive(Debug, Error)]
pub enum IntentError {
	/// Input failed structural or semantic validation. Carries every
	/// violated field so the caller can fix the payload in one round trip.
	#[error("validation failed: {0}")]
	Validation(#[from] ValidationErrors),

	/// No handler is registered for the requested intent kind.
	#[error("unsupported intent kind: {0}")]
	UnsupportedKind(String),

	/// The request is well-formed but cannot be serviced: unsupported chain
	/// pair, no route found, amount outside allowed bounds.
	#[error("{0}")]
	Domain(String),

	/// The intent's build deadline has passed; the caller should create a
	/// fresh intent with current market data.
	#[error("intent {id} expired at {expires_at}")]
	Expired {
		id: String,
		expires_at: DateTime<Utc>,
	},

	/// Unknown intent reference.
	#[error("intent not found: {0}")]
	NotFound(String),

	/// The fee source could not supply current fee parameters. Never
	/// substituted with a default fee.
	#[error("fee data unavailable: {0}")]
	FeeDataUnavailable(String),

	/// An external dependency returned malformed or unexpected data.
	#[error("upstream returned malformed data: {0}")]
	UpstreamData(String),

	/// Timeout or transient failure talking to storage or chain RPC. Safe to
	/// retry with backoff at the caller's discretion.
	#[error("transient I/O failure: {0}")]
	Io(String),

	/// The storage layer rejected or failed an operation.
	#[error("storage error: {0}")]
	Storage(String),

	/// A transaction hash was already recorded against another intent.
	#[error("transaction hash {0} is already recorded")]
	DuplicateTxHash(String),

	/// Invariant violation inside the pipeline itself.
	#[error("internal error: {0}")]
	Internal(String),
}

impl IntentError {
	pub fn domain(message: impl Into<String>) -> Self {
		Self::Domain(message.into())
	}

	/// Whether the caller may retry the same request unchanged.
	pub fn is_retryable(&self) -> bool {
		matches!(self, IntentError::Io(_))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn only_io_failures_are_retryable() {
		assert!(IntentError::Io("connection reset".into()).is_retryable());
		assert!(!IntentError::Domain("no route".into()).is_retryable());
		assert!(!IntentError::FeeDataUnavailable("rpc error".into()).is_retryable());
		assert!(!IntentError::UpstreamData("bad shape".into()).is_retryable());
		assert!(!IntentError::NotFound("x".into()).is_retryable());
	}
}
