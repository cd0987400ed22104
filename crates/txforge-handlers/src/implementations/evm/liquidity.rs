//! Liquidity provision against V2-style router/factory venues.
//!
//! Add and remove are separate kinds over a shared venue book (router,
//! factory, listed tokens per chain). Pair existence is live on-chain state
//! checked through the factory at build time, with resolved pair addresses
//! held in a TTL cache owned by this handler. Minimum amounts derive from a
//! configured slippage tolerance in basis points; the deadline is a
//! configured window from assembly time.

use crate::implementations::evm::common::assemble_eip1559;
use crate::util::{amount_to_units, parse_configured_evm, parse_evm_field, parse_payload};
use crate::TransactionHandler;
use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use txforge_chains::{ChainRegistry, EvmChain};
use txforge_types::amount::{positive_validator, serde_decimal, serde_decimal_opt};
use txforge_types::cache::TtlCache;
use txforge_types::config::{LiquidityConfig, TokenConfig, VenueConfig};
use txforge_types::{
	Field, FieldType, IntentError, PreparedIntent, Schema, UnsignedTransaction,
};

sol! {
	interface IRouter {
		function addLiquidity(address tokenA, address tokenB, uint256 amountADesired, uint256 amountBDesired, uint256 amountAMin, uint256 amountBMin, address to, uint256 deadline) external returns (uint256 amountA, uint256 amountB, uint256 liquidity);
		function removeLiquidity(address tokenA, address tokenB, uint256 liquidity, uint256 amountAMin, uint256 amountBMin, address to, uint256 deadline) external returns (uint256 amountA, uint256 amountB);
	}

	interface IFactory {
		function getPair(address tokenA, address tokenB) external view returns (address pair);
	}
}

/// V2 LP tokens are minted with 18 decimals.
const LP_DECIMALS: u8 = 18;
const BPS_DENOMINATOR: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiquidityOperation {
	Add,
	Remove,
}

impl LiquidityOperation {
	pub const ALL: [LiquidityOperation; 2] = [LiquidityOperation::Add, LiquidityOperation::Remove];

	pub fn kind(self) -> &'static str {
		match self {
			LiquidityOperation::Add => "evm-liquidity-add",
			LiquidityOperation::Remove => "evm-liquidity-remove",
		}
	}
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddPayload {
	chain: String,
	token_a: String,
	token_b: String,
	#[serde(with = "serde_decimal")]
	amount_a: String,
	#[serde(with = "serde_decimal")]
	amount_b: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemovePayload {
	chain: String,
	token_a: String,
	token_b: String,
	#[serde(with = "serde_decimal")]
	liquidity: String,
	#[serde(default, with = "serde_decimal_opt", skip_serializing_if = "Option::is_none")]
	amount_a_min: Option<String>,
	#[serde(default, with = "serde_decimal_opt", skip_serializing_if = "Option::is_none")]
	amount_b_min: Option<String>,
}

pub struct LiquidityHandler {
	op: LiquidityOperation,
	/// Venues keyed by lowercase chain name.
	venues: Arc<HashMap<String, VenueConfig>>,
	chains: Arc<ChainRegistry>,
	slippage_bps: u64,
	deadline: Duration,
	pair_cache: TtlCache<(String, Address, Address), Address>,
}

impl LiquidityHandler {
	pub fn new(op: LiquidityOperation, config: &LiquidityConfig, chains: Arc<ChainRegistry>) -> Self {
		let venues = config
			.venues
			.iter()
			.map(|(chain, venue)| (chain.to_ascii_lowercase(), venue.clone()))
			.collect();
		Self {
			op,
			venues: Arc::new(venues),
			chains,
			slippage_bps: config.slippage_bps,
			deadline: Duration::from_secs(config.deadline_secs),
			pair_cache: TtlCache::new(Duration::from_secs(config.pair_cache_ttl_secs)),
		}
	}

	pub fn all(config: &LiquidityConfig, chains: &Arc<ChainRegistry>) -> Vec<Self> {
		LiquidityOperation::ALL
			.into_iter()
			.map(|op| Self::new(op, config, chains.clone()))
			.collect()
	}

	fn chain_validator(&self) -> impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static {
		let known: Vec<String> = self.venues.keys().cloned().collect();
		move |value| match value.as_str() {
			Some(chain) if known.iter().any(|k| k.eq_ignore_ascii_case(chain)) => Ok(()),
			Some(chain) => Err(format!("'{}' is not a supported chain", chain)),
			None => Err("expected string".to_string()),
		}
	}

	fn venue(&self, chain: &str) -> Result<&VenueConfig, IntentError> {
		self.venues
			.get(chain)
			.ok_or_else(|| IntentError::Domain(format!("no liquidity venue configured on {}", chain)))
	}

	fn token<'a>(
		&self,
		venue: &'a VenueConfig,
		chain: &str,
		symbol: &str,
	) -> Result<&'a TokenConfig, IntentError> {
		venue
			.tokens
			.iter()
			.find(|token| token.symbol.eq_ignore_ascii_case(symbol))
			.ok_or_else(|| {
				IntentError::Domain(format!("token {} is not listed on {}", symbol, chain))
			})
	}

	fn min_after_slippage(&self, desired: U256) -> Result<U256, IntentError> {
		desired
			.checked_mul(U256::from(BPS_DENOMINATOR - self.slippage_bps))
			.map(|scaled| scaled / U256::from(BPS_DENOMINATOR))
			.ok_or_else(|| IntentError::Domain("amount too large for slippage math".to_string()))
	}

	fn deadline_from_now(&self) -> U256 {
		U256::from(Utc::now().timestamp() as u64 + self.deadline.as_secs())
	}

	/// Fails when the factory knows no pair for the two tokens. Resolved
	/// pairs are cached; a zero answer is never cached so a pair created
	/// later is picked up.
	async fn ensure_pair(
		&self,
		chain: &dyn EvmChain,
		chain_name: &str,
		venue: &VenueConfig,
		token_a: Address,
		token_b: Address,
	) -> Result<(), IntentError> {
		let (low, high) = if token_a <= token_b {
			(token_a, token_b)
		} else {
			(token_b, token_a)
		};
		let key = (chain_name.to_string(), low, high);
		if self.pair_cache.get(&key).is_some() {
			return Ok(());
		}

		let factory = parse_configured_evm("factory", &venue.factory)?;
		let data = IFactory::getPairCall {
			tokenA: token_a,
			tokenB: token_b,
		}
		.abi_encode();
		let response = chain.call(factory, data.into()).await?;
		let pair = IFactory::getPairCall::abi_decode_returns(&response, true)
			.map_err(|e| IntentError::UpstreamData(format!("malformed getPair response: {}", e)))?
			.pair;

		if pair == Address::ZERO {
			return Err(IntentError::Domain(format!(
				"no liquidity pair for the requested tokens on {}",
				chain_name
			)));
		}

		debug!(%pair, chain = %chain_name, "liquidity pair resolved");
		self.pair_cache.insert(key, pair);
		Ok(())
	}

	async fn calldata(
		&self,
		payload: &Value,
		signer: Address,
	) -> Result<(String, Vec<u8>), IntentError> {
		match self.op {
			LiquidityOperation::Add => {
				let payload = normalize_add(parse_payload::<AddPayload>(payload)?);
				let venue = self.venue(&payload.chain)?;
				let token_a = self.token(venue, &payload.chain, &payload.token_a)?;
				let token_b = self.token(venue, &payload.chain, &payload.token_b)?;
				let a = parse_configured_evm("token", &token_a.address)?;
				let b = parse_configured_evm("token", &token_b.address)?;

				let chain = self.chains.evm(&payload.chain)?;
				self.ensure_pair(chain.as_ref(), &payload.chain, venue, a, b)
					.await?;

				let desired_a = amount_to_units("amountA", &payload.amount_a, token_a.decimals)?;
				let desired_b = amount_to_units("amountB", &payload.amount_b, token_b.decimals)?;

				let data = IRouter::addLiquidityCall {
					tokenA: a,
					tokenB: b,
					amountADesired: desired_a,
					amountBDesired: desired_b,
					amountAMin: self.min_after_slippage(desired_a)?,
					amountBMin: self.min_after_slippage(desired_b)?,
					to: signer,
					deadline: self.deadline_from_now(),
				}
				.abi_encode();

				Ok((payload.chain, data))
			}
			LiquidityOperation::Remove => {
				let payload = normalize_remove(parse_payload::<RemovePayload>(payload)?);
				let venue = self.venue(&payload.chain)?;
				let token_a = self.token(venue, &payload.chain, &payload.token_a)?;
				let token_b = self.token(venue, &payload.chain, &payload.token_b)?;
				let a = parse_configured_evm("token", &token_a.address)?;
				let b = parse_configured_evm("token", &token_b.address)?;

				let chain = self.chains.evm(&payload.chain)?;
				self.ensure_pair(chain.as_ref(), &payload.chain, venue, a, b)
					.await?;

				let liquidity = amount_to_units("liquidity", &payload.liquidity, LP_DECIMALS)?;
				let min_a = match &payload.amount_a_min {
					Some(raw) => amount_to_units("amountAMin", raw, token_a.decimals)?,
					None => U256::ZERO,
				};
				let min_b = match &payload.amount_b_min {
					Some(raw) => amount_to_units("amountBMin", raw, token_b.decimals)?,
					None => U256::ZERO,
				};

				let data = IRouter::removeLiquidityCall {
					tokenA: a,
					tokenB: b,
					liquidity,
					amountAMin: min_a,
					amountBMin: min_b,
					to: signer,
					deadline: self.deadline_from_now(),
				}
				.abi_encode();

				Ok((payload.chain, data))
			}
		}
	}
}

fn normalize_add(mut payload: AddPayload) -> AddPayload {
	payload.chain.make_ascii_lowercase();
	payload.token_a.make_ascii_uppercase();
	payload.token_b.make_ascii_uppercase();
	payload
}

fn normalize_remove(mut payload: RemovePayload) -> RemovePayload {
	payload.chain.make_ascii_lowercase();
	payload.token_a.make_ascii_uppercase();
	payload.token_b.make_ascii_uppercase();
	payload
}

#[async_trait]
impl TransactionHandler for LiquidityHandler {
	fn kind(&self) -> &str {
		self.op.kind()
	}

	fn schema(&self) -> Schema {
		let chain =
			Field::new("chain", FieldType::NonEmptyString).with_validator(self.chain_validator());
		let token_a = Field::new("tokenA", FieldType::NonEmptyString);
		let token_b = Field::new("tokenB", FieldType::NonEmptyString);

		match self.op {
			LiquidityOperation::Add => Schema::new(
				vec![
					chain,
					token_a,
					token_b,
					Field::new("amountA", FieldType::Amount).with_validator(positive_validator),
					Field::new("amountB", FieldType::Amount).with_validator(positive_validator),
				],
				vec![],
			),
			LiquidityOperation::Remove => Schema::new(
				vec![
					chain,
					token_a,
					token_b,
					Field::new("liquidity", FieldType::Amount).with_validator(positive_validator),
				],
				vec![
					Field::new("amountAMin", FieldType::Amount),
					Field::new("amountBMin", FieldType::Amount),
				],
			),
		}
	}

	async fn prepare(&self, payload: &Value) -> Result<PreparedIntent, IntentError> {
		let normalized = match self.op {
			LiquidityOperation::Add => {
				let payload = normalize_add(parse_payload(payload)?);
				let venue = self.venue(&payload.chain)?;
				self.token(venue, &payload.chain, &payload.token_a)?;
				self.token(venue, &payload.chain, &payload.token_b)?;
				if payload.token_a == payload.token_b {
					return Err(IntentError::Domain(
						"tokenA and tokenB must differ".to_string(),
					));
				}
				serde_json::to_value(&payload)
			}
			LiquidityOperation::Remove => {
				let payload = normalize_remove(parse_payload(payload)?);
				let venue = self.venue(&payload.chain)?;
				self.token(venue, &payload.chain, &payload.token_a)?;
				self.token(venue, &payload.chain, &payload.token_b)?;
				if payload.token_a == payload.token_b {
					return Err(IntentError::Domain(
						"tokenA and tokenB must differ".to_string(),
					));
				}
				serde_json::to_value(&payload)
			}
		}
		.map_err(|e| IntentError::Internal(format!("payload serialization: {}", e)))?;

		Ok(PreparedIntent::new(normalized))
	}

	async fn assemble(
		&self,
		payload: &Value,
		signer: &str,
	) -> Result<Vec<UnsignedTransaction>, IntentError> {
		let signer = parse_evm_field("signerAddress", signer)?;
		let (chain_name, data) = self.calldata(payload, signer).await?;

		let venue = self.venue(&chain_name)?;
		let router = parse_configured_evm("router", &venue.router)?;
		let chain = self.chains.evm(&chain_name)?;

		let transaction =
			assemble_eip1559(chain.as_ref(), signer, router, U256::ZERO, data).await?;
		Ok(vec![transaction])
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::MockEvmChain;
	use alloy_sol_types::SolValue;
	use serde_json::json;
	use std::str::FromStr;

	const ROUTER: &str = "0x10ED43C718714eb63d5aA57B78B54704E256024E";
	const FACTORY: &str = "0xcA143Ce32Fe78f1f7019d7d551a6402fC5350c73";
	const CAKE: &str = "0x0E09FaBB73Bd3Ade0a17ECC321fD13a19e81cE82";
	const BUSD: &str = "0xe9e7CEA3DedcA5984780Bafc599bD69ADd087D56";
	const SIGNER: &str = "0x1111111111111111111111111111111111111111";

	fn config() -> LiquidityConfig {
		LiquidityConfig {
			slippage_bps: 50,
			deadline_secs: 1200,
			pair_cache_ttl_secs: 300,
			venues: HashMap::from([(
				"bsc".to_string(),
				VenueConfig {
					router: ROUTER.to_string(),
					factory: FACTORY.to_string(),
					tokens: vec![
						TokenConfig {
							symbol: "CAKE".to_string(),
							address: CAKE.to_string(),
							decimals: 18,
						},
						TokenConfig {
							symbol: "BUSD".to_string(),
							address: BUSD.to_string(),
							decimals: 18,
						},
					],
				},
			)]),
		}
	}

	fn chain_with_pair(pair: Address) -> MockEvmChain {
		MockEvmChain::new("bsc", 56)
			.with_call_result(IFactory::getPairCall::SELECTOR, pair.abi_encode())
	}

	fn handler(op: LiquidityOperation, chain: MockEvmChain) -> LiquidityHandler {
		let mut registry = ChainRegistry::new();
		registry.register_evm(Arc::new(chain)).unwrap();
		LiquidityHandler::new(op, &config(), Arc::new(registry))
	}

	fn add_payload() -> Value {
		json!({
			"chain": "BSC",
			"tokenA": "cake",
			"tokenB": "busd",
			"amountA": "10",
			"amountB": "25.5",
		})
	}

	#[tokio::test]
	async fn add_encodes_slippage_bounded_minimums() {
		let handler = handler(
			LiquidityOperation::Add,
			chain_with_pair(Address::repeat_byte(0x42)),
		);
		let signer = Address::from_str(SIGNER).unwrap();

		let (chain, data) = handler.calldata(&add_payload(), signer).await.unwrap();
		assert_eq!(chain, "bsc");

		let call = IRouter::addLiquidityCall::abi_decode(&data, true).unwrap();
		assert_eq!(call.tokenA, Address::from_str(CAKE).unwrap());
		assert_eq!(call.amountADesired, U256::from(10u64) * U256::from(10u64).pow(U256::from(18)));
		// 0.5% tolerance: 10 -> 9.95, 25.5 -> 25.3725.
		assert_eq!(
			call.amountAMin,
			U256::from_str_radix("9950000000000000000", 10).unwrap()
		);
		assert_eq!(
			call.amountBMin,
			U256::from_str_radix("25372500000000000000", 10).unwrap()
		);
		assert_eq!(call.to, signer);
		assert!(call.deadline > U256::ZERO);
	}

	#[tokio::test]
	async fn missing_pair_is_a_domain_error() {
		let handler = handler(LiquidityOperation::Add, chain_with_pair(Address::ZERO));
		let signer = Address::from_str(SIGNER).unwrap();

		let result = handler.calldata(&add_payload(), signer).await;
		match result {
			Err(IntentError::Domain(message)) => {
				assert!(message.contains("no liquidity pair"), "{}", message);
			}
			other => panic!("expected domain error, got {:?}", other.err()),
		}
	}

	#[tokio::test]
	async fn remove_defaults_minimums_to_zero() {
		let handler = handler(
			LiquidityOperation::Remove,
			chain_with_pair(Address::repeat_byte(0x42)),
		);
		let payload = json!({
			"chain": "bsc",
			"tokenA": "CAKE",
			"tokenB": "BUSD",
			"liquidity": "3.5",
		});

		let (_, data) = handler
			.calldata(&payload, Address::from_str(SIGNER).unwrap())
			.await
			.unwrap();
		let call = IRouter::removeLiquidityCall::abi_decode(&data, true).unwrap();
		assert_eq!(
			call.liquidity,
			U256::from_str_radix("3500000000000000000", 10).unwrap()
		);
		assert_eq!(call.amountAMin, U256::ZERO);
		assert_eq!(call.amountBMin, U256::ZERO);
	}

	#[tokio::test]
	async fn identical_tokens_are_rejected_at_prepare() {
		let handler = handler(
			LiquidityOperation::Add,
			chain_with_pair(Address::repeat_byte(0x42)),
		);
		let mut payload = add_payload();
		payload["tokenB"] = json!("CAKE");

		let result = handler.prepare(&payload).await;
		assert!(matches!(result, Err(IntentError::Domain(_))));
	}

	#[tokio::test]
	async fn unlisted_token_is_rejected_at_prepare() {
		let handler = handler(
			LiquidityOperation::Add,
			chain_with_pair(Address::repeat_byte(0x42)),
		);
		let mut payload = add_payload();
		payload["tokenA"] = json!("DOGE");

		let result = handler.prepare(&payload).await;
		match result {
			Err(IntentError::Domain(message)) => assert!(message.contains("DOGE")),
			other => panic!("expected domain error, got {:?}", other.err()),
		}
	}

	#[tokio::test]
	async fn assembles_one_router_transaction() {
		let handler = handler(
			LiquidityOperation::Add,
			chain_with_pair(Address::repeat_byte(0x42)),
		);
		let prepared = handler.prepare(&add_payload()).await.unwrap();

		let txs = handler.assemble(&prepared.payload, SIGNER).await.unwrap();
		assert_eq!(txs.len(), 1);
		assert!(txs[0].bytes.starts_with("0x02"));
	}

	#[test]
	fn schema_aggregates_add_violations() {
		let handler = handler(
			LiquidityOperation::Add,
			chain_with_pair(Address::repeat_byte(0x42)),
		);
		let payload = json!({"chain": "solana", "tokenA": "CAKE", "amountA": "0"});
		let errors = handler.schema().validate(&payload).unwrap_err();
		assert_eq!(
			errors.fields(),
			vec!["chain", "tokenB", "amountA", "amountB"]
		);
	}
}
