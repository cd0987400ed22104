//! The two-phase create/build orchestrator.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use txforge_handlers::HandlerRegistry;
use txforge_storage::{IntentStore, StorageError};
use txforge_types::{IntentError, IntentRecord, TransactionIntent, UnsignedTransaction};

/// How a caller refers to the intent being built: a persisted record by id,
/// or an inline kind + payload that never touched the store.
#[derive(Debug, Clone)]
pub enum IntentRef {
	Id(String),
	Data { kind: String, payload: Value },
}

/// Stateless request/response orchestrator. Registry and store are shared
/// read-only across concurrent requests; nothing here holds a lock across
/// an operation.
pub struct Pipeline {
	registry: Arc<HandlerRegistry>,
	store: Arc<dyn IntentStore>,
}

impl Pipeline {
	pub fn new(registry: Arc<HandlerRegistry>, store: Arc<dyn IntentStore>) -> Self {
		Self { registry, store }
	}

	/// Validates and persists a new intent.
	///
	/// Validation failures, unknown kinds, and handler domain errors are all
	/// reported before anything is written: a failed create leaves no
	/// partial record behind.
	pub async fn create_intent(
		&self,
		kind: &str,
		payload: &Value,
	) -> Result<IntentRecord, IntentError> {
		let handler = self.registry.resolve(kind)?;
		handler.schema().validate(payload)?;

		let prepared = handler.prepare(payload).await?;
		let expires_at = match prepared.ttl {
			Some(ttl) => {
				let ttl = chrono::Duration::from_std(ttl)
					.map_err(|e| IntentError::Internal(format!("intent ttl out of range: {}", e)))?;
				Some(Utc::now() + ttl)
			}
			None => None,
		};

		let intent = TransactionIntent::new(kind, prepared.payload, expires_at);
		self.store.create(&intent).await?;
		info!(id = %intent.id, kind, "intent created");

		Ok(IntentRecord::from(&intent))
	}

	/// Builds the unsigned transactions for an intent and signer.
	///
	/// Building is a read-only projection: the intent record is never
	/// mutated, and concurrent builds of the same intent are allowed. The
	/// handler's error taxonomy is propagated unchanged.
	pub async fn build_transaction(
		&self,
		reference: IntentRef,
		signer: &str,
	) -> Result<Vec<UnsignedTransaction>, IntentError> {
		match reference {
			IntentRef::Id(id) => {
				let intent = match self.store.get(&id).await {
					Ok(intent) => intent,
					Err(StorageError::NotFound) => return Err(IntentError::NotFound(id)),
					Err(e) => return Err(e.into()),
				};

				if let Some(expires_at) = intent.expires_at {
					if Utc::now() > expires_at {
						return Err(IntentError::Expired {
							id: intent.id,
							expires_at,
						});
					}
				}

				let handler = self.registry.resolve(&intent.kind)?;
				handler.assemble(&intent.payload, signer).await
			}
			IntentRef::Data { kind, payload } => {
				let handler = self.registry.resolve(&kind)?;
				handler.schema().validate(&payload)?;
				handler.assemble(&payload, signer).await
			}
		}
	}

	/// Attaches a broadcast transaction hash to an intent; the storage
	/// layer guarantees no two intents share one.
	pub async fn record_confirmation(
		&self,
		id: &str,
		tx_hash: &str,
	) -> Result<IntentRecord, IntentError> {
		match self.store.confirm_tx_hash(id, tx_hash).await {
			Ok(intent) => {
				info!(id = %intent.id, tx_hash, "transaction hash recorded");
				Ok(IntentRecord::from(&intent))
			}
			Err(StorageError::NotFound) => Err(IntentError::NotFound(id.to_string())),
			Err(e) => Err(e.into()),
		}
	}

	/// Removes intents whose deadline passed before `cutoff`.
	pub async fn purge_expired(
		&self,
		cutoff: chrono::DateTime<Utc>,
	) -> Result<usize, IntentError> {
		Ok(self.store.purge_expired(cutoff).await?)
	}
}
