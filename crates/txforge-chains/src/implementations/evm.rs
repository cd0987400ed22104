//! Alloy-backed EVM chain client.

use crate::utils::with_timeout;
use crate::{ChainError, EvmChain, FeeData};
use alloy_primitives::{Address, Bytes, TxKind, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::{TransactionInput, TransactionRequest};
use alloy_transport_http::Http;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// JSON-RPC client for one EVM chain.
///
/// Holds no key material; every method is a read. All calls are bounded by
/// the configured timeout.
pub struct HttpEvmChain {
	name: String,
	chain_id: u64,
	timeout: Duration,
	provider: Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>,
}

impl HttpEvmChain {
	pub fn new(
		name: impl Into<String>,
		chain_id: u64,
		rpc_url: &str,
		timeout: Duration,
	) -> Result<Self, ChainError> {
		let url = rpc_url
			.parse()
			.map_err(|e| ChainError::Transport(format!("invalid RPC URL: {}", e)))?;
		let provider = ProviderBuilder::new().on_http(url);

		Ok(Self {
			name: name.into(),
			chain_id,
			timeout,
			provider: Arc::new(provider),
		})
	}

	fn request(from: Option<Address>, to: Address, data: Bytes, value: U256) -> TransactionRequest {
		TransactionRequest {
			from,
			to: Some(TxKind::Call(to)),
			input: TransactionInput::new(data),
			value: Some(value),
			..Default::default()
		}
	}
}

#[async_trait]
impl EvmChain for HttpEvmChain {
	fn name(&self) -> &str {
		&self.name
	}

	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	async fn fee_data(&self) -> Result<FeeData, ChainError> {
		with_timeout(self.timeout, async {
			let estimate = self
				.provider
				.estimate_eip1559_fees(None)
				.await
				.map_err(|e| ChainError::FeeUnavailable(e.to_string()))?;

			Ok(FeeData {
				max_fee_per_gas: estimate.max_fee_per_gas,
				max_priority_fee_per_gas: estimate.max_priority_fee_per_gas,
			})
		})
		.await
	}

	async fn transaction_count(&self, address: Address) -> Result<u64, ChainError> {
		with_timeout(self.timeout, async {
			self.provider
				.get_transaction_count(address)
				.await
				.map_err(|e| ChainError::Transport(e.to_string()))
		})
		.await
	}

	async fn estimate_gas(
		&self,
		from: Address,
		to: Address,
		data: Bytes,
		value: U256,
	) -> Result<u64, ChainError> {
		let request = Self::request(Some(from), to, data, value);
		with_timeout(self.timeout, async {
			self.provider
				.estimate_gas(&request)
				.await
				.map_err(|e| ChainError::Transport(e.to_string()))
		})
		.await
	}

	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
		let request = Self::request(None, to, data, U256::ZERO);
		with_timeout(self.timeout, async {
			self.provider
				.call(&request)
				.await
				.map_err(|e| ChainError::Transport(e.to_string()))
		})
		.await
	}
}
