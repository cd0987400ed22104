//! Intent persistence for the txforge pipeline.
//!
//! This crate defines the [`IntentStore`] abstraction the orchestrator
//! writes through, plus in-memory and file-backed implementations. The one
//! cross-request invariant, global uniqueness of `confirmed_tx_hash`, is
//! enforced here, atomically, not by an application-level read-then-write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use txforge_types::{IntentError, TransactionIntent};

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

pub use implementations::file::FileStore;
pub use implementations::memory::MemoryStore;

/// Errors that can occur during intent storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// No intent exists under the requested id.
	#[error("not found")]
	NotFound,
	/// The transaction hash is already attached to another intent.
	#[error("duplicate transaction hash: {0}")]
	DuplicateTxHash(String),
	/// Error that occurs during serialization/deserialization.
	#[error("serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("backend error: {0}")]
	Backend(String),
}

impl From<StorageError> for IntentError {
	fn from(error: StorageError) -> Self {
		match error {
			StorageError::DuplicateTxHash(hash) => IntentError::DuplicateTxHash(hash),
			other => IntentError::Storage(other.to_string()),
		}
	}
}

/// Persistence contract for transaction intents.
///
/// Implementations must provide read-after-write consistency for a single
/// record: once `create` returns, `get` on the same id observes the intent.
#[async_trait]
pub trait IntentStore: Send + Sync {
	/// Persists a new intent record.
	async fn create(&self, intent: &TransactionIntent) -> Result<(), StorageError>;

	/// Loads an intent by id.
	async fn get(&self, id: &str) -> Result<TransactionIntent, StorageError>;

	/// Attaches a broadcast transaction hash to an intent.
	///
	/// Fails with [`StorageError::DuplicateTxHash`] if any intent already
	/// carries the hash; the check and the write are atomic.
	async fn confirm_tx_hash(
		&self,
		id: &str,
		tx_hash: &str,
	) -> Result<TransactionIntent, StorageError>;

	/// Deletes intents whose deadline passed before `cutoff`, returning how
	/// many were removed. Retention policy belongs to the deployer.
	async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<usize, StorageError>;
}
