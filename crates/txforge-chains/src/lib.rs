//! Chain RPC capability traits for the txforge pipeline.
//!
//! Handlers never talk to an RPC endpoint directly; they consume the
//! [`EvmChain`] and [`SvmChain`] traits, which expose exactly the reads
//! transaction assembly needs (fees, nonces, account state, token
//! metadata). Concrete clients live in `implementations`; tests substitute
//! mocks.

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;
use thiserror::Error;
use txforge_types::IntentError;

pub mod registry;
pub mod utils;

pub mod implementations {
	pub mod evm;
	pub mod svm;
}

pub use implementations::evm::HttpEvmChain;
pub use implementations::svm::RpcSvmChain;
pub use registry::ChainRegistry;

/// Errors surfaced by chain clients, before mapping into the pipeline
/// taxonomy.
#[derive(Debug, Error)]
pub enum ChainError {
	/// The call did not complete within the configured bound. Retryable.
	#[error("rpc call timed out after {0:?}")]
	Timeout(Duration),
	/// Transport-level failure (connection refused, 5xx, ...). Retryable.
	#[error("rpc transport failure: {0}")]
	Transport(String),
	/// The fee source could not supply current fee parameters.
	#[error("fee source returned no usable data: {0}")]
	FeeUnavailable(String),
	/// The endpoint answered, but with an unexpected shape.
	#[error("malformed rpc response: {0}")]
	BadResponse(String),
	/// No chain is configured under the requested name.
	#[error("chain {0} is not configured")]
	UnknownChain(String),
	/// A chain was registered twice under one name.
	#[error("chain {0} already registered")]
	AlreadyRegistered(String),
}

impl From<ChainError> for IntentError {
	fn from(error: ChainError) -> Self {
		match error {
			ChainError::Timeout(_) | ChainError::Transport(_) => IntentError::Io(error.to_string()),
			ChainError::FeeUnavailable(reason) => IntentError::FeeDataUnavailable(reason),
			ChainError::BadResponse(reason) => IntentError::UpstreamData(reason),
			ChainError::UnknownChain(chain) => {
				IntentError::Domain(format!("chain {} is not configured", chain))
			}
			ChainError::AlreadyRegistered(_) => IntentError::Internal(error.to_string()),
		}
	}
}

/// Current EIP-1559 fee parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeData {
	pub max_fee_per_gas: u128,
	pub max_priority_fee_per_gas: u128,
}

/// Read capabilities of an EVM-family chain needed to assemble an unsigned
/// transaction.
#[async_trait]
pub trait EvmChain: Send + Sync {
	fn name(&self) -> &str;
	fn chain_id(&self) -> u64;

	/// Current fee-market parameters. Fails with
	/// [`ChainError::FeeUnavailable`] rather than guessing.
	async fn fee_data(&self) -> Result<FeeData, ChainError>;

	/// Next nonce for the given address.
	async fn transaction_count(&self, address: Address) -> Result<u64, ChainError>;

	/// Gas estimate for the given call.
	async fn estimate_gas(
		&self,
		from: Address,
		to: Address,
		data: Bytes,
		value: U256,
	) -> Result<u64, ChainError>;

	/// `eth_call` against the latest block.
	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError>;
}

/// Read capabilities of an SVM-family (account model) chain.
#[async_trait]
pub trait SvmChain: Send + Sync {
	fn name(&self) -> &str;

	/// A recent blockhash for message construction.
	async fn latest_blockhash(&self) -> Result<Hash, ChainError>;

	/// Whether an account exists at the given address.
	async fn account_exists(&self, address: &Pubkey) -> Result<bool, ChainError>;

	/// Decimal count of a token mint.
	async fn mint_decimals(&self, mint: &Pubkey) -> Result<u8, ChainError>;
}
