//! Mock chain clients for handler tests.

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use std::collections::{HashMap, HashSet};
use txforge_chains::{ChainError, EvmChain, FeeData, SvmChain};

pub(crate) struct MockEvmChain {
	pub name: String,
	pub chain_id: u64,
	/// `None` simulates a fee source that cannot answer.
	pub fee_data: Option<FeeData>,
	pub nonce: u64,
	pub gas: u64,
	/// `eth_call` responses keyed by 4-byte selector.
	pub call_results: HashMap<[u8; 4], Bytes>,
}

impl MockEvmChain {
	pub fn new(name: &str, chain_id: u64) -> Self {
		Self {
			name: name.to_string(),
			chain_id,
			fee_data: Some(FeeData {
				max_fee_per_gas: 30_000_000_000,
				max_priority_fee_per_gas: 1_500_000_000,
			}),
			nonce: 7,
			gas: 120_000,
			call_results: HashMap::new(),
		}
	}

	pub fn without_fee_data(mut self) -> Self {
		self.fee_data = None;
		self
	}

	pub fn with_call_result(mut self, selector: [u8; 4], result: impl Into<Bytes>) -> Self {
		self.call_results.insert(selector, result.into());
		self
	}
}

#[async_trait]
impl EvmChain for MockEvmChain {
	fn name(&self) -> &str {
		&self.name
	}

	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	async fn fee_data(&self) -> Result<FeeData, ChainError> {
		self.fee_data
			.ok_or_else(|| ChainError::FeeUnavailable("missing fee data".to_string()))
	}

	async fn transaction_count(&self, _: Address) -> Result<u64, ChainError> {
		Ok(self.nonce)
	}

	async fn estimate_gas(
		&self,
		_: Address,
		_: Address,
		_: Bytes,
		_: U256,
	) -> Result<u64, ChainError> {
		Ok(self.gas)
	}

	async fn call(&self, _: Address, data: Bytes) -> Result<Bytes, ChainError> {
		let selector: [u8; 4] = data
			.get(..4)
			.and_then(|s| s.try_into().ok())
			.ok_or_else(|| ChainError::BadResponse("call data too short".to_string()))?;
		self.call_results
			.get(&selector)
			.cloned()
			.ok_or_else(|| ChainError::BadResponse("unexpected call".to_string()))
	}
}

pub(crate) struct MockSvmChain {
	pub name: String,
	pub blockhash: Hash,
	pub existing_accounts: HashSet<Pubkey>,
	pub mints: HashMap<Pubkey, u8>,
}

impl MockSvmChain {
	pub fn new(name: &str) -> Self {
		Self {
			name: name.to_string(),
			blockhash: Hash::new_from_array([7u8; 32]),
			existing_accounts: HashSet::new(),
			mints: HashMap::new(),
		}
	}

	pub fn with_mint(mut self, mint: Pubkey, decimals: u8) -> Self {
		self.existing_accounts.insert(mint);
		self.mints.insert(mint, decimals);
		self
	}

	pub fn with_account(mut self, account: Pubkey) -> Self {
		self.existing_accounts.insert(account);
		self
	}
}

#[async_trait]
impl SvmChain for MockSvmChain {
	fn name(&self) -> &str {
		&self.name
	}

	async fn latest_blockhash(&self) -> Result<Hash, ChainError> {
		Ok(self.blockhash)
	}

	async fn account_exists(&self, address: &Pubkey) -> Result<bool, ChainError> {
		Ok(self.existing_accounts.contains(address))
	}

	async fn mint_decimals(&self, mint: &Pubkey) -> Result<u8, ChainError> {
		self.mints
			.get(mint)
			.copied()
			.ok_or_else(|| ChainError::BadResponse(format!("no account at mint {}", mint)))
	}
}
