//! Cross-chain bridge intents over a configured trade-route book.
//!
//! A route connects a source chain/token to a destination chain/token via a
//! bridge endpoint contract. Route resolution happens at prepare time so an
//! unsupported pair never reaches persistence; bounds, fees, and the actual
//! deposit transaction are resolved at build time. Resolved routes are
//! quotes against current liquidity, so bridge intents expire.

use crate::implementations::evm::common::{assemble_eip1559, encode_erc20_transfer};
use crate::util::{amount_to_units, parse_configured_evm, parse_evm_field, parse_payload};
use crate::TransactionHandler;
use alloy_primitives::U256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use txforge_chains::ChainRegistry;
use txforge_types::amount::{positive_validator, serde_decimal, to_base_units};
use txforge_types::config::{BridgeConfig, BridgeRouteConfig};
use txforge_types::{
	Field, FieldType, IntentError, PreparedIntent, Schema, UnsignedTransaction,
};

pub const KIND: &str = "evm-bridge";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BridgePayload {
	src_chain: String,
	dst_chain: String,
	src_token_symbol: String,
	dst_token_symbol: String,
	#[serde(with = "serde_decimal")]
	amount: String,
}

impl BridgePayload {
	fn normalized(mut self) -> Self {
		self.src_chain.make_ascii_lowercase();
		self.dst_chain.make_ascii_lowercase();
		self.src_token_symbol.make_ascii_uppercase();
		self.dst_token_symbol.make_ascii_uppercase();
		self
	}
}

pub struct BridgeHandler {
	routes: Vec<BridgeRouteConfig>,
	route_ttl: Duration,
	chains: Arc<ChainRegistry>,
	known_chains: Vec<String>,
}

impl BridgeHandler {
	pub fn new(config: BridgeConfig, chains: Arc<ChainRegistry>) -> Self {
		let known_chains = chains.evm_names();
		Self {
			routes: config.routes,
			route_ttl: Duration::from_secs(config.route_ttl_secs),
			chains,
			known_chains,
		}
	}

	fn chain_validator(&self) -> impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static {
		let known = self.known_chains.clone();
		move |value| match value.as_str() {
			Some(chain) if known.iter().any(|k| k.eq_ignore_ascii_case(chain)) => Ok(()),
			Some(chain) => Err(format!("'{}' is not a supported chain", chain)),
			None => Err("expected string".to_string()),
		}
	}

	fn resolve_route(&self, payload: &BridgePayload) -> Result<&BridgeRouteConfig, IntentError> {
		self.routes
			.iter()
			.find(|route| {
				route.src_chain.eq_ignore_ascii_case(&payload.src_chain)
					&& route.dst_chain.eq_ignore_ascii_case(&payload.dst_chain)
					&& route.src_token.eq_ignore_ascii_case(&payload.src_token_symbol)
					&& route.dst_token.eq_ignore_ascii_case(&payload.dst_token_symbol)
			})
			.ok_or_else(|| {
				IntentError::Domain(format!(
					"no route found for {} {} to {} {}",
					payload.src_chain,
					payload.src_token_symbol,
					payload.dst_chain,
					payload.dst_token_symbol
				))
			})
	}

	fn bound(&self, route: &BridgeRouteConfig, raw: &str) -> Result<U256, IntentError> {
		to_base_units(raw, route.decimals).map_err(|_| {
			IntentError::Internal(format!("configured route bound '{}' is invalid", raw))
		})
	}
}

#[async_trait]
impl TransactionHandler for BridgeHandler {
	fn kind(&self) -> &str {
		KIND
	}

	fn schema(&self) -> Schema {
		Schema::new(
			vec![
				Field::new("srcChain", FieldType::NonEmptyString)
					.with_validator(self.chain_validator()),
				Field::new("dstChain", FieldType::NonEmptyString),
				Field::new("srcTokenSymbol", FieldType::NonEmptyString),
				Field::new("dstTokenSymbol", FieldType::NonEmptyString),
				Field::new("amount", FieldType::Amount).with_validator(positive_validator),
			],
			vec![],
		)
	}

	async fn prepare(&self, payload: &Value) -> Result<PreparedIntent, IntentError> {
		let payload = parse_payload::<BridgePayload>(payload)?.normalized();
		let route = self.resolve_route(&payload)?;
		debug!(
			src = %payload.src_chain,
			dst = %payload.dst_chain,
			endpoint = %route.endpoint,
			"bridge route resolved"
		);

		let normalized = serde_json::to_value(&payload)
			.map_err(|e| IntentError::Internal(format!("payload serialization: {}", e)))?;
		Ok(PreparedIntent::new(normalized).with_ttl(self.route_ttl))
	}

	async fn assemble(
		&self,
		payload: &Value,
		signer: &str,
	) -> Result<Vec<UnsignedTransaction>, IntentError> {
		let payload = parse_payload::<BridgePayload>(payload)?.normalized();
		let signer = parse_evm_field("signerAddress", signer)?;
		let route = self.resolve_route(&payload)?;
		let chain = self.chains.evm(&payload.src_chain)?;

		let amount = amount_to_units("amount", &payload.amount, route.decimals)?;
		let min = self.bound(route, &route.min_amount)?;
		let max = self.bound(route, &route.max_amount)?;
		if amount < min || amount > max {
			return Err(IntentError::Domain(format!(
				"amount {} must be between {} and {}",
				payload.amount, route.min_amount, route.max_amount
			)));
		}

		let endpoint = parse_configured_evm("bridge endpoint", &route.endpoint)?;
		let transaction = match &route.token_address {
			Some(token) => {
				let token = parse_configured_evm("bridge token", token)?;
				let input = encode_erc20_transfer(endpoint, amount);
				assemble_eip1559(chain.as_ref(), signer, token, U256::ZERO, input).await?
			}
			None => assemble_eip1559(chain.as_ref(), signer, endpoint, amount, vec![]).await?,
		};

		Ok(vec![transaction])
	}
}
