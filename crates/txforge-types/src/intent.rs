//! Persisted intent records and their lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// A validated, persisted description of a desired transaction, not yet
/// built or signed.
///
/// `payload` is owned by the handler identified by `kind`; the pipeline
/// passes it through without inspecting its internals. The payload is
/// immutable after creation: building reads it, never rewrites it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionIntent {
	pub id: String,
	pub kind: String,
	pub payload: Value,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires_at: Option<DateTime<Utc>>,
	/// Set by external reconciliation once a resulting transaction is known
	/// to have been broadcast. Globally unique when present.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub confirmed_tx_hash: Option<String>,
}

impl TransactionIntent {
	pub fn new(kind: impl Into<String>, payload: Value, expires_at: Option<DateTime<Utc>>) -> Self {
		let now = Utc::now();
		Self {
			id: Uuid::new_v4().to_string(),
			kind: kind.into(),
			payload,
			created_at: now,
			updated_at: now,
			expires_at,
			confirmed_tx_hash: None,
		}
	}

	/// An intent is expired strictly after its deadline: a build at exactly
	/// `expires_at` still succeeds.
	pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
		match self.expires_at {
			Some(expires_at) => now > expires_at,
			None => false,
		}
	}
}

/// The public echo of a created intent: identifier, kind, and the
/// normalized payload. Internal handler state is never included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRecord {
	pub id: String,
	pub kind: String,
	pub payload: Value,
	pub created_at: DateTime<Utc>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires_at: Option<DateTime<Utc>>,
}

impl From<&TransactionIntent> for IntentRecord {
	fn from(intent: &TransactionIntent) -> Self {
		Self {
			id: intent.id.clone(),
			kind: intent.kind.clone(),
			payload: intent.payload.clone(),
			created_at: intent.created_at,
			expires_at: intent.expires_at,
		}
	}
}

/// What a handler's `prepare` hands back to the pipeline: the normalized
/// payload to persist, and an optional time-to-live when the resolved
/// route or quote is time-sensitive.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedIntent {
	pub payload: Value,
	pub ttl: Option<Duration>,
}

impl PreparedIntent {
	pub fn new(payload: Value) -> Self {
		Self { payload, ttl: None }
	}

	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = Some(ttl);
		self
	}
}
