//! Native and token transfers on SVM chains.
//!
//! One handler instance serves one chain; the kind is derived from the
//! chain name (`solana-transfer`, `sonic-transfer`). Without a
//! `tokenAddress` the payload describes a native transfer in lamports; with
//! one, an SPL token transfer between associated token accounts, creating
//! the destination account only when it does not exist yet.

use crate::util::{amount_to_units_u64, parse_payload, parse_pubkey_field};
use crate::TransactionHandler;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use solana_sdk::message::Message;
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::get_associated_token_address;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use std::sync::Arc;
use tracing::debug;
use txforge_chains::SvmChain;
use txforge_types::address::svm_address_validator;
use txforge_types::amount::{positive_validator, serde_decimal};
use txforge_types::{
	Field, FieldType, IntentError, PreparedIntent, Schema, UnsignedTransaction,
};

/// Lamports-per-SOL exponent; the native asset has 9 decimals.
const NATIVE_DECIMALS: u8 = 9;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransferPayload {
	to_wallet_address: String,
	#[serde(with = "serde_decimal")]
	amount: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	token_address: Option<String>,
}

pub struct SvmTransferHandler {
	kind: String,
	chain: Arc<dyn SvmChain>,
}

impl SvmTransferHandler {
	pub fn new(chain: Arc<dyn SvmChain>) -> Self {
		Self {
			kind: format!("{}-transfer", chain.name()),
			chain,
		}
	}
}

#[async_trait]
impl TransactionHandler for SvmTransferHandler {
	fn kind(&self) -> &str {
		&self.kind
	}

	fn schema(&self) -> Schema {
		Schema::new(
			vec![
				Field::new("toWalletAddress", FieldType::NonEmptyString)
					.with_validator(svm_address_validator),
				Field::new("amount", FieldType::Amount).with_validator(positive_validator),
			],
			vec![Field::new("tokenAddress", FieldType::NonEmptyString)
				.with_validator(svm_address_validator)],
		)
	}

	async fn prepare(&self, payload: &Value) -> Result<PreparedIntent, IntentError> {
		let payload: TransferPayload = parse_payload(payload)?;
		parse_pubkey_field("toWalletAddress", &payload.to_wallet_address)?;
		if let Some(token_address) = &payload.token_address {
			parse_pubkey_field("tokenAddress", token_address)?;
		}

		let normalized = serde_json::to_value(&payload)
			.map_err(|e| IntentError::Internal(format!("payload serialization: {}", e)))?;
		Ok(PreparedIntent::new(normalized))
	}

	async fn assemble(
		&self,
		payload: &Value,
		signer: &str,
	) -> Result<Vec<UnsignedTransaction>, IntentError> {
		let payload: TransferPayload = parse_payload(payload)?;
		let owner = parse_pubkey_field("signerAddress", signer)?;
		let recipient = parse_pubkey_field("toWalletAddress", &payload.to_wallet_address)?;

		let mut instructions = Vec::new();

		if let Some(token_address) = &payload.token_address {
			let mint = parse_pubkey_field("tokenAddress", token_address)?;
			if !self.chain.account_exists(&mint).await? {
				return Err(IntentError::Domain(format!(
					"token mint {} does not exist on {}",
					token_address,
					self.chain.name()
				)));
			}

			let decimals = self.chain.mint_decimals(&mint).await?;
			let amount = amount_to_units_u64("amount", &payload.amount, decimals)?;

			let source = get_associated_token_address(&owner, &mint);
			let destination = get_associated_token_address(&recipient, &mint);

			if !self.chain.account_exists(&destination).await? {
				debug!(%destination, "destination token account missing, prepending creation");
				instructions.push(create_associated_token_account_idempotent(
					&owner,
					&recipient,
					&mint,
					&spl_token::id(),
				));
			}

			instructions.push(
				spl_token::instruction::transfer(
					&spl_token::id(),
					&source,
					&destination,
					&owner,
					&[],
					amount,
				)
				.map_err(|e| IntentError::Internal(format!("transfer instruction: {}", e)))?,
			);
		} else {
			let lamports = amount_to_units_u64("amount", &payload.amount, NATIVE_DECIMALS)?;
			instructions.push(system_instruction::transfer(&owner, &recipient, lamports));
		}

		let blockhash = self.chain.latest_blockhash().await?;
		let message = Message::new_with_blockhash(&instructions, Some(&owner), &blockhash);
		let transaction = Transaction::new_unsigned(message);
		let bytes = bincode::serialize(&transaction)
			.map_err(|e| IntentError::Internal(format!("transaction serialization: {}", e)))?;

		Ok(vec![UnsignedTransaction::base64(bytes)])
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::MockSvmChain;
	use base64::engine::general_purpose::STANDARD as BASE64;
	use base64::Engine;
	use serde_json::json;
	use solana_sdk::pubkey::Pubkey;
	use txforge_types::TxEncoding;

	fn decode(tx: &UnsignedTransaction) -> Transaction {
		assert_eq!(tx.encoding, TxEncoding::Base64);
		bincode::deserialize(&BASE64.decode(&tx.bytes).unwrap()).unwrap()
	}

	fn program_of(tx: &Transaction, index: usize) -> Pubkey {
		let instruction = &tx.message.instructions[index];
		tx.message.account_keys[instruction.program_id_index as usize]
	}

	fn handler(chain: MockSvmChain) -> SvmTransferHandler {
		SvmTransferHandler::new(Arc::new(chain))
	}

	#[test]
	fn kind_follows_chain_name() {
		assert_eq!(handler(MockSvmChain::new("solana")).kind(), "solana-transfer");
		assert_eq!(handler(MockSvmChain::new("sonic")).kind(), "sonic-transfer");
	}

	#[tokio::test]
	async fn native_transfer_is_a_single_system_instruction() {
		let handler = handler(MockSvmChain::new("solana"));
		let signer = Pubkey::new_unique();
		let payload = json!({
			"toWalletAddress": Pubkey::new_unique().to_string(),
			"amount": 1.5,
		});

		let prepared = handler.prepare(&payload).await.unwrap();
		let txs = handler
			.assemble(&prepared.payload, &signer.to_string())
			.await
			.unwrap();
		assert_eq!(txs.len(), 1);

		let tx = decode(&txs[0]);
		assert_eq!(tx.message.instructions.len(), 1);
		assert_eq!(program_of(&tx, 0), solana_sdk::system_program::id());
		let unsigned = solana_sdk::signature::Signature::default();
		assert!(tx.signatures.iter().all(|s| *s == unsigned));

		// SystemInstruction::Transfer is enum variant 2 followed by the
		// lamport count: 1.5 SOL = 1_500_000_000 lamports.
		let data = &tx.message.instructions[0].data;
		assert_eq!(&data[0..4], &2u32.to_le_bytes());
		assert_eq!(&data[4..12], &1_500_000_000u64.to_le_bytes());
	}

	#[tokio::test]
	async fn native_transfer_has_no_expiry() {
		let handler = handler(MockSvmChain::new("solana"));
		let payload = json!({
			"toWalletAddress": Pubkey::new_unique().to_string(),
			"amount": "1.5",
		});
		let prepared = handler.prepare(&payload).await.unwrap();
		assert!(prepared.ttl.is_none());
	}

	#[tokio::test]
	async fn assembly_is_deterministic_under_fixed_state() {
		let chain = MockSvmChain::new("solana");
		let handler = handler(chain);
		let signer = Pubkey::new_unique().to_string();
		let payload = json!({
			"toWalletAddress": Pubkey::new_unique().to_string(),
			"amount": "0.25",
		});

		let first = handler.assemble(&payload, &signer).await.unwrap();
		let second = handler.assemble(&payload, &signer).await.unwrap();
		assert_eq!(first, second);
	}

	#[tokio::test]
	async fn token_transfer_creates_missing_destination_account() {
		let mint = Pubkey::new_unique();
		let recipient = Pubkey::new_unique();
		let handler = handler(MockSvmChain::new("sonic").with_mint(mint, 6));
		let payload = json!({
			"toWalletAddress": recipient.to_string(),
			"amount": "2",
			"tokenAddress": mint.to_string(),
		});

		let txs = handler
			.assemble(&payload, &Pubkey::new_unique().to_string())
			.await
			.unwrap();
		let tx = decode(&txs[0]);

		assert_eq!(tx.message.instructions.len(), 2);
		assert_eq!(program_of(&tx, 0), spl_associated_token_account::id());
		assert_eq!(program_of(&tx, 1), spl_token::id());
	}

	#[tokio::test]
	async fn token_transfer_skips_creation_when_account_exists() {
		let mint = Pubkey::new_unique();
		let recipient = Pubkey::new_unique();
		let destination = get_associated_token_address(&recipient, &mint);
		let handler = handler(
			MockSvmChain::new("sonic")
				.with_mint(mint, 6)
				.with_account(destination),
		);
		let payload = json!({
			"toWalletAddress": recipient.to_string(),
			"amount": "2",
			"tokenAddress": mint.to_string(),
		});

		let txs = handler
			.assemble(&payload, &Pubkey::new_unique().to_string())
			.await
			.unwrap();
		let tx = decode(&txs[0]);

		assert_eq!(tx.message.instructions.len(), 1);
		assert_eq!(program_of(&tx, 0), spl_token::id());
	}

	#[tokio::test]
	async fn token_amount_uses_live_mint_decimals() {
		let mint = Pubkey::new_unique();
		let recipient = Pubkey::new_unique();
		let destination = get_associated_token_address(&recipient, &mint);
		let handler = handler(
			MockSvmChain::new("solana")
				.with_mint(mint, 6)
				.with_account(destination),
		);
		let payload = json!({
			"toWalletAddress": recipient.to_string(),
			"amount": "1.5",
			"tokenAddress": mint.to_string(),
		});

		let txs = handler
			.assemble(&payload, &Pubkey::new_unique().to_string())
			.await
			.unwrap();
		let tx = decode(&txs[0]);

		// TokenInstruction::Transfer is tag 3 followed by a u64 amount:
		// 1.5 tokens at 6 decimals = 1_500_000.
		let data = &tx.message.instructions[0].data;
		assert_eq!(data[0], 3);
		assert_eq!(&data[1..9], &1_500_000u64.to_le_bytes());
	}

	#[tokio::test]
	async fn unknown_mint_is_a_domain_error() {
		let handler = handler(MockSvmChain::new("solana"));
		let payload = json!({
			"toWalletAddress": Pubkey::new_unique().to_string(),
			"amount": "1",
			"tokenAddress": Pubkey::new_unique().to_string(),
		});

		let result = handler
			.assemble(&payload, &Pubkey::new_unique().to_string())
			.await;
		assert!(matches!(result, Err(IntentError::Domain(_))));
	}

	#[tokio::test]
	async fn bad_signer_is_a_validation_error() {
		let handler = handler(MockSvmChain::new("solana"));
		let payload = json!({
			"toWalletAddress": Pubkey::new_unique().to_string(),
			"amount": "1",
		});

		let result = handler.assemble(&payload, "not-a-pubkey").await;
		match result {
			Err(IntentError::Validation(errors)) => {
				assert_eq!(errors.fields(), vec!["signerAddress"]);
			}
			other => panic!("expected validation error, got {:?}", other.err()),
		}
	}

	#[test]
	fn schema_rejects_bad_addresses_and_amounts_together() {
		let handler = handler(MockSvmChain::new("solana"));
		let payload = json!({"toWalletAddress": "not-base58!", "amount": "0"});
		let errors = handler.schema().validate(&payload).unwrap_err();
		assert_eq!(errors.fields(), vec!["toWalletAddress", "amount"]);
	}
}
