//! SVM chain client over the nonblocking Solana RPC client.

use crate::utils::with_timeout;
use crate::{ChainError, SvmChain};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;

/// RPC client for one SVM chain (Solana mainnet, Sonic, ...).
pub struct RpcSvmChain {
	name: String,
	timeout: Duration,
	client: RpcClient,
}

impl RpcSvmChain {
	pub fn new(name: impl Into<String>, rpc_url: &str, timeout: Duration) -> Self {
		Self {
			name: name.into(),
			timeout,
			client: RpcClient::new_with_commitment(
				rpc_url.to_string(),
				CommitmentConfig::confirmed(),
			),
		}
	}
}

#[async_trait]
impl SvmChain for RpcSvmChain {
	fn name(&self) -> &str {
		&self.name
	}

	async fn latest_blockhash(&self) -> Result<Hash, ChainError> {
		with_timeout(self.timeout, async {
			self.client
				.get_latest_blockhash()
				.await
				.map_err(|e| ChainError::Transport(e.to_string()))
		})
		.await
	}

	async fn account_exists(&self, address: &Pubkey) -> Result<bool, ChainError> {
		with_timeout(self.timeout, async {
			let response = self
				.client
				.get_account_with_commitment(address, CommitmentConfig::confirmed())
				.await
				.map_err(|e| ChainError::Transport(e.to_string()))?;
			Ok(response.value.is_some())
		})
		.await
	}

	async fn mint_decimals(&self, mint: &Pubkey) -> Result<u8, ChainError> {
		with_timeout(self.timeout, async {
			let response = self
				.client
				.get_account_with_commitment(mint, CommitmentConfig::confirmed())
				.await
				.map_err(|e| ChainError::Transport(e.to_string()))?;

			let account = response
				.value
				.ok_or_else(|| ChainError::BadResponse(format!("no account at mint {}", mint)))?;
			let mint_state = spl_token::state::Mint::unpack(&account.data).map_err(|e| {
				ChainError::BadResponse(format!("account {} is not a token mint: {}", mint, e))
			})?;

			Ok(mint_state.decimals)
		})
		.await
	}
}
