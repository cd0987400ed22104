//! Unsigned transaction payloads returned by `build_transaction`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// How the `bytes` field of an [`UnsignedTransaction`] is encoded, so the
/// caller knows how to interpret the blob before signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxEncoding {
	/// `0x`-prefixed hex of an EIP-2718 typed unsigned transaction.
	Hex,
	/// Base64 of a bincode-serialized unsigned SVM transaction.
	Base64,
}

/// A fully assembled, chain-native transaction payload lacking only a
/// signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
	pub encoding: TxEncoding,
	pub bytes: String,
}

impl UnsignedTransaction {
	pub fn hex(bytes: impl AsRef<[u8]>) -> Self {
		Self {
			encoding: TxEncoding::Hex,
			bytes: format!("0x{}", hex::encode(bytes)),
		}
	}

	pub fn base64(bytes: impl AsRef<[u8]>) -> Self {
		Self {
			encoding: TxEncoding::Base64,
			bytes: BASE64.encode(bytes),
		}
	}
}
