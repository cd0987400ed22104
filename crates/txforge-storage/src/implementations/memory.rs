//! In-memory intent store.
//!
//! Intents and the set of confirmed transaction hashes live behind a single
//! lock, so the hash-uniqueness check and the write happen atomically even
//! under concurrent confirmation attempts.

use crate::{IntentStore, StorageError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use txforge_types::TransactionIntent;

#[derive(Default)]
struct Inner {
	intents: HashMap<String, TransactionIntent>,
	tx_hashes: HashSet<String>,
}

#[derive(Default)]
pub struct MemoryStore {
	inner: RwLock<Inner>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of stored intents.
	pub async fn len(&self) -> usize {
		self.inner.read().await.intents.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.inner.read().await.intents.is_empty()
	}
}

#[async_trait]
impl IntentStore for MemoryStore {
	async fn create(&self, intent: &TransactionIntent) -> Result<(), StorageError> {
		let mut inner = self.inner.write().await;
		if inner.intents.contains_key(&intent.id) {
			return Err(StorageError::Backend(format!(
				"intent {} already exists",
				intent.id
			)));
		}
		inner.intents.insert(intent.id.clone(), intent.clone());
		Ok(())
	}

	async fn get(&self, id: &str) -> Result<TransactionIntent, StorageError> {
		self.inner
			.read()
			.await
			.intents
			.get(id)
			.cloned()
			.ok_or(StorageError::NotFound)
	}

	async fn confirm_tx_hash(
		&self,
		id: &str,
		tx_hash: &str,
	) -> Result<TransactionIntent, StorageError> {
		let mut inner = self.inner.write().await;

		if !inner.intents.contains_key(id) {
			return Err(StorageError::NotFound);
		}
		if !inner.tx_hashes.insert(tx_hash.to_string()) {
			return Err(StorageError::DuplicateTxHash(tx_hash.to_string()));
		}

		let intent = inner.intents.get_mut(id).expect("checked above");
		intent.confirmed_tx_hash = Some(tx_hash.to_string());
		intent.updated_at = Utc::now();
		Ok(intent.clone())
	}

	async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<usize, StorageError> {
		let mut inner = self.inner.write().await;
		let before = inner.intents.len();
		inner
			.intents
			.retain(|_, intent| !matches!(intent.expires_at, Some(deadline) if deadline < cutoff));
		Ok(before - inner.intents.len())
	}
}
