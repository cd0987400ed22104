//! File-backed intent store.
//!
//! Intents are stored as one JSON document per id under `intents/`, written
//! atomically via a temp file and rename. Hash uniqueness is delegated to
//! the filesystem: confirming reserves a marker file under `txhash/` with
//! `create_new`, so exactly one confirmation can win a given hash even
//! across processes sharing the directory.

use crate::{IntentStore, StorageError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use txforge_types::TransactionIntent;

pub struct FileStore {
	base_path: PathBuf,
}

impl FileStore {
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	fn intent_path(&self, id: &str) -> PathBuf {
		let safe_id = id.replace(['/', ':'], "_");
		self.base_path.join("intents").join(format!("{}.json", safe_id))
	}

	fn tx_hash_path(&self, tx_hash: &str) -> PathBuf {
		let safe_hash = tx_hash.replace(['/', ':'], "_");
		self.base_path.join("txhash").join(safe_hash)
	}

	async fn write_atomic(&self, path: &PathBuf, bytes: Vec<u8>) -> Result<(), StorageError> {
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}

		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, bytes)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&temp_path, path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}

	async fn read_intent(&self, path: &PathBuf) -> Result<TransactionIntent, StorageError> {
		let bytes = match fs::read(path).await {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Err(StorageError::NotFound),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}
}

#[async_trait]
impl IntentStore for FileStore {
	async fn create(&self, intent: &TransactionIntent) -> Result<(), StorageError> {
		let path = self.intent_path(&intent.id);
		if path.exists() {
			return Err(StorageError::Backend(format!(
				"intent {} already exists",
				intent.id
			)));
		}

		let bytes = serde_json::to_vec(intent)
			.map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.write_atomic(&path, bytes).await
	}

	async fn get(&self, id: &str) -> Result<TransactionIntent, StorageError> {
		self.read_intent(&self.intent_path(id)).await
	}

	async fn confirm_tx_hash(
		&self,
		id: &str,
		tx_hash: &str,
	) -> Result<TransactionIntent, StorageError> {
		let mut intent = self.get(id).await?;

		// Reserve the hash first: O_EXCL creation makes the uniqueness
		// check and the claim one atomic step.
		let marker_path = self.tx_hash_path(tx_hash);
		if let Some(parent) = marker_path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}
		let marker = fs::OpenOptions::new()
			.write(true)
			.create_new(true)
			.open(&marker_path)
			.await;
		match marker {
			Ok(mut file) => {
				file.write_all(id.as_bytes())
					.await
					.map_err(|e| StorageError::Backend(e.to_string()))?;
			}
			Err(e) if e.kind() == ErrorKind::AlreadyExists => {
				return Err(StorageError::DuplicateTxHash(tx_hash.to_string()));
			}
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		}

		intent.confirmed_tx_hash = Some(tx_hash.to_string());
		intent.updated_at = Utc::now();
		let bytes = serde_json::to_vec(&intent)
			.map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.write_atomic(&self.intent_path(id), bytes).await?;

		Ok(intent)
	}

	async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<usize, StorageError> {
		let dir = self.base_path.join("intents");
		let mut entries = match fs::read_dir(&dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		let mut removed = 0;
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.extension().and_then(|e| e.to_str()) != Some("json") {
				continue;
			}
			let Ok(intent) = self.read_intent(&path).await else {
				continue;
			};
			if matches!(intent.expires_at, Some(deadline) if deadline < cutoff) {
				fs::remove_file(&path)
					.await
					.map_err(|e| StorageError::Backend(e.to_string()))?;
				removed += 1;
			}
		}

		Ok(removed)
	}
}
