//! Lending-pool intents against V3-style pool contracts.
//!
//! One handler instance is registered per operation kind
//! (`evm-lending-supply`, `-withdraw`, `-borrow`, `-repay`, `-liquidate`,
//! `-flashloan`), all sharing the configured per-chain market book (pool
//! address plus listed tokens with their decimals). Optional transaction
//! parameters default to explicit constants resolved at assembly time,
//! never silently inlined.

use crate::implementations::evm::common::assemble_eip1559;
use crate::util::{amount_to_units, parse_configured_evm, parse_evm_field, parse_payload};
use crate::TransactionHandler;
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use txforge_chains::ChainRegistry;
use txforge_types::address::evm_address_validator;
use txforge_types::amount::{positive_validator, serde_decimal, serde_decimal_vec};
use txforge_types::config::{LendingConfig, MarketConfig, TokenConfig};
use txforge_types::{
	Field, FieldType, IntentError, PreparedIntent, Schema, UnsignedTransaction, ValidationErrors,
};

sol! {
	interface IPool {
		function supply(address asset, uint256 amount, address onBehalfOf, uint16 referralCode) external;
		function withdraw(address asset, uint256 amount, address to) external;
		function borrow(address asset, uint256 amount, uint256 interestRateMode, uint16 referralCode, address onBehalfOf) external;
		function repay(address asset, uint256 amount, uint256 interestRateMode, address onBehalfOf) external returns (uint256);
		function liquidationCall(address collateralAsset, address debtAsset, address user, uint256 debtToCover, bool receiveAToken) external;
		function flashLoan(address receiverAddress, address[] assets, uint256[] amounts, uint256[] interestRateModes, address onBehalfOf, bytes params, uint16 referralCode) external;
	}
}

/// The referral program is retired; pools expect 0.
const REFERRAL_CODE: u16 = 0;
/// Variable-rate borrowing unless the payload selects stable (1).
const DEFAULT_INTEREST_RATE_MODE: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LendingOperation {
	Supply,
	Withdraw,
	Borrow,
	Repay,
	Liquidate,
	FlashLoan,
}

impl LendingOperation {
	pub const ALL: [LendingOperation; 6] = [
		LendingOperation::Supply,
		LendingOperation::Withdraw,
		LendingOperation::Borrow,
		LendingOperation::Repay,
		LendingOperation::Liquidate,
		LendingOperation::FlashLoan,
	];

	pub fn kind(self) -> &'static str {
		match self {
			LendingOperation::Supply => "evm-lending-supply",
			LendingOperation::Withdraw => "evm-lending-withdraw",
			LendingOperation::Borrow => "evm-lending-borrow",
			LendingOperation::Repay => "evm-lending-repay",
			LendingOperation::Liquidate => "evm-lending-liquidate",
			LendingOperation::FlashLoan => "evm-lending-flashloan",
		}
	}
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionPayload {
	chain: String,
	asset: String,
	#[serde(with = "serde_decimal")]
	amount: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	on_behalf_of: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	to: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	interest_rate_mode: Option<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiquidatePayload {
	chain: String,
	collateral_asset: String,
	debt_asset: String,
	user: String,
	#[serde(with = "serde_decimal")]
	debt_to_cover: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	receive_a_token: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlashLoanPayload {
	chain: String,
	receiver_address: String,
	assets: Vec<String>,
	#[serde(with = "serde_decimal_vec")]
	amounts: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	interest_rate_modes: Option<Vec<u8>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	params: Option<String>,
}

pub struct LendingHandler {
	op: LendingOperation,
	/// Markets keyed by lowercase chain name.
	markets: Arc<HashMap<String, MarketConfig>>,
	chains: Arc<ChainRegistry>,
}

impl LendingHandler {
	pub fn new(op: LendingOperation, config: &LendingConfig, chains: Arc<ChainRegistry>) -> Self {
		let markets = config
			.markets
			.iter()
			.map(|(chain, market)| (chain.to_ascii_lowercase(), market.clone()))
			.collect();
		Self {
			op,
			markets: Arc::new(markets),
			chains,
		}
	}

	/// One handler per operation, all over the same market book.
	pub fn all(config: &LendingConfig, chains: &Arc<ChainRegistry>) -> Vec<Self> {
		LendingOperation::ALL
			.into_iter()
			.map(|op| Self::new(op, config, chains.clone()))
			.collect()
	}

	fn chain_validator(&self) -> impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static {
		let known: Vec<String> = self.markets.keys().cloned().collect();
		move |value| match value.as_str() {
			Some(chain) if known.iter().any(|k| k.eq_ignore_ascii_case(chain)) => Ok(()),
			Some(chain) => Err(format!("'{}' is not a supported chain", chain)),
			None => Err("expected string".to_string()),
		}
	}

	fn market(&self, chain: &str) -> Result<&MarketConfig, IntentError> {
		self.markets
			.get(chain)
			.ok_or_else(|| IntentError::Domain(format!("no lending market configured on {}", chain)))
	}

	fn token<'a>(
		&self,
		market: &'a MarketConfig,
		chain: &str,
		symbol: &str,
	) -> Result<&'a TokenConfig, IntentError> {
		market
			.tokens
			.iter()
			.find(|token| token.symbol.eq_ignore_ascii_case(symbol))
			.ok_or_else(|| {
				IntentError::Domain(format!("asset {} is not listed on {}", symbol, chain))
			})
	}

	fn rate_mode(requested: Option<u8>) -> U256 {
		U256::from(requested.unwrap_or(DEFAULT_INTEREST_RATE_MODE))
	}

	/// Encodes the pool call for this operation. Amount conversion uses the
	/// listed token's decimals; address-valued options default to the
	/// signer.
	fn calldata(&self, payload: &Value, signer: Address) -> Result<(String, Vec<u8>), IntentError> {
		match self.op {
			LendingOperation::Supply
			| LendingOperation::Withdraw
			| LendingOperation::Borrow
			| LendingOperation::Repay => {
				let payload = normalize_position(parse_payload::<PositionPayload>(payload)?);
				let market = self.market(&payload.chain)?;
				let token = self.token(market, &payload.chain, &payload.asset)?;
				let asset = parse_configured_evm("token", &token.address)?;
				let amount = amount_to_units("amount", &payload.amount, token.decimals)?;

				let data = match self.op {
					LendingOperation::Supply => {
						let on_behalf_of = match &payload.on_behalf_of {
							Some(address) => parse_evm_field("onBehalfOf", address)?,
							None => signer,
						};
						IPool::supplyCall {
							asset,
							amount,
							onBehalfOf: on_behalf_of,
							referralCode: REFERRAL_CODE,
						}
						.abi_encode()
					}
					LendingOperation::Withdraw => {
						let to = match &payload.to {
							Some(address) => parse_evm_field("to", address)?,
							None => signer,
						};
						IPool::withdrawCall { asset, amount, to }.abi_encode()
					}
					LendingOperation::Borrow => {
						let on_behalf_of = match &payload.on_behalf_of {
							Some(address) => parse_evm_field("onBehalfOf", address)?,
							None => signer,
						};
						IPool::borrowCall {
							asset,
							amount,
							interestRateMode: Self::rate_mode(payload.interest_rate_mode),
							referralCode: REFERRAL_CODE,
							onBehalfOf: on_behalf_of,
						}
						.abi_encode()
					}
					LendingOperation::Repay => {
						let on_behalf_of = match &payload.on_behalf_of {
							Some(address) => parse_evm_field("onBehalfOf", address)?,
							None => signer,
						};
						IPool::repayCall {
							asset,
							amount,
							interestRateMode: Self::rate_mode(payload.interest_rate_mode),
							onBehalfOf: on_behalf_of,
						}
						.abi_encode()
					}
					_ => unreachable!("outer match restricts the operation"),
				};

				Ok((payload.chain, data))
			}
			LendingOperation::Liquidate => {
				let payload = normalize_liquidate(parse_payload::<LiquidatePayload>(payload)?);
				let market = self.market(&payload.chain)?;
				let collateral =
					self.token(market, &payload.chain, &payload.collateral_asset)?;
				let debt = self.token(market, &payload.chain, &payload.debt_asset)?;

				let data = IPool::liquidationCallCall {
					collateralAsset: parse_configured_evm("token", &collateral.address)?,
					debtAsset: parse_configured_evm("token", &debt.address)?,
					user: parse_evm_field("user", &payload.user)?,
					debtToCover: amount_to_units(
						"debtToCover",
						&payload.debt_to_cover,
						debt.decimals,
					)?,
					receiveAToken: payload.receive_a_token.unwrap_or(false),
				}
				.abi_encode();

				Ok((payload.chain, data))
			}
			LendingOperation::FlashLoan => {
				let payload = normalize_flash_loan(parse_payload::<FlashLoanPayload>(payload)?);
				if payload.assets.is_empty() {
					return Err(ValidationErrors::single("assets", "must not be empty").into());
				}
				if payload.assets.len() != payload.amounts.len() {
					return Err(ValidationErrors::single(
						"amounts",
						"must have one entry per asset",
					)
					.into());
				}
				if let Some(modes) = &payload.interest_rate_modes {
					if modes.len() != payload.assets.len() {
						return Err(ValidationErrors::single(
							"interestRateModes",
							"must have one entry per asset",
						)
						.into());
					}
				}

				let market = self.market(&payload.chain)?;
				let mut assets = Vec::with_capacity(payload.assets.len());
				let mut amounts = Vec::with_capacity(payload.assets.len());
				for (symbol, amount) in payload.assets.iter().zip(&payload.amounts) {
					let token = self.token(market, &payload.chain, symbol)?;
					assets.push(parse_configured_evm("token", &token.address)?);
					amounts.push(amount_to_units("amounts", amount, token.decimals)?);
				}

				let modes: Vec<U256> = match &payload.interest_rate_modes {
					Some(modes) => modes.iter().map(|m| U256::from(*m)).collect(),
					// 0 = repay within the same transaction, no debt opened.
					None => vec![U256::ZERO; assets.len()],
				};

				let params: Bytes = match &payload.params {
					Some(hex_params) => {
						let stripped = hex_params.strip_prefix("0x").unwrap_or(hex_params);
						hex::decode(stripped)
							.map_err(|_| {
								IntentError::from(ValidationErrors::single(
									"params",
									"must be hex-encoded bytes",
								))
							})?
							.into()
					}
					None => Bytes::new(),
				};

				let data = IPool::flashLoanCall {
					receiverAddress: parse_evm_field("receiverAddress", &payload.receiver_address)?,
					assets,
					amounts,
					interestRateModes: modes,
					onBehalfOf: signer,
					params,
					referralCode: REFERRAL_CODE,
				}
				.abi_encode();

				Ok((payload.chain, data))
			}
		}
	}

	fn normalized_value(&self, payload: &Value) -> Result<Value, IntentError> {
		let serialize = |result: Result<Value, serde_json::Error>| {
			result.map_err(|e| IntentError::Internal(format!("payload serialization: {}", e)))
		};
		match self.op {
			LendingOperation::Liquidate => {
				let payload = normalize_liquidate(parse_payload(payload)?);
				serialize(serde_json::to_value(&payload))
			}
			LendingOperation::FlashLoan => {
				let payload = normalize_flash_loan(parse_payload(payload)?);
				serialize(serde_json::to_value(&payload))
			}
			_ => {
				let payload = normalize_position(parse_payload(payload)?);
				serialize(serde_json::to_value(&payload))
			}
		}
	}
}

fn normalize_position(mut payload: PositionPayload) -> PositionPayload {
	payload.chain.make_ascii_lowercase();
	payload.asset.make_ascii_uppercase();
	payload
}

fn normalize_liquidate(mut payload: LiquidatePayload) -> LiquidatePayload {
	payload.chain.make_ascii_lowercase();
	payload.collateral_asset.make_ascii_uppercase();
	payload.debt_asset.make_ascii_uppercase();
	payload
}

fn normalize_flash_loan(mut payload: FlashLoanPayload) -> FlashLoanPayload {
	payload.chain.make_ascii_lowercase();
	for symbol in &mut payload.assets {
		symbol.make_ascii_uppercase();
	}
	payload
}

#[async_trait]
impl TransactionHandler for LendingHandler {
	fn kind(&self) -> &str {
		self.op.kind()
	}

	fn schema(&self) -> Schema {
		let chain = Field::new("chain", FieldType::NonEmptyString)
			.with_validator(self.chain_validator());

		match self.op {
			LendingOperation::Liquidate => Schema::new(
				vec![
					chain,
					Field::new("collateralAsset", FieldType::NonEmptyString),
					Field::new("debtAsset", FieldType::NonEmptyString),
					Field::new("user", FieldType::NonEmptyString)
						.with_validator(evm_address_validator),
					Field::new("debtToCover", FieldType::Amount).with_validator(positive_validator),
				],
				vec![Field::new("receiveAToken", FieldType::Boolean)],
			),
			LendingOperation::FlashLoan => Schema::new(
				vec![
					chain,
					Field::new("receiverAddress", FieldType::NonEmptyString)
						.with_validator(evm_address_validator),
					Field::new("assets", FieldType::Array(Box::new(FieldType::NonEmptyString))),
					Field::new("amounts", FieldType::Array(Box::new(FieldType::Amount))),
				],
				vec![
					Field::new(
						"interestRateModes",
						FieldType::Array(Box::new(FieldType::Integer {
							min: Some(0),
							max: Some(2),
						})),
					),
					Field::new("params", FieldType::NonEmptyString),
				],
			),
			_ => {
				let mut optional = vec![Field::new("onBehalfOf", FieldType::NonEmptyString)
					.with_validator(evm_address_validator)];
				if self.op == LendingOperation::Withdraw {
					optional = vec![Field::new("to", FieldType::NonEmptyString)
						.with_validator(evm_address_validator)];
				}
				if matches!(self.op, LendingOperation::Borrow | LendingOperation::Repay) {
					optional.push(Field::new(
						"interestRateMode",
						FieldType::Integer {
							min: Some(1),
							max: Some(2),
						},
					));
				}

				Schema::new(
					vec![
						chain,
						Field::new("asset", FieldType::NonEmptyString),
						Field::new("amount", FieldType::Amount).with_validator(positive_validator),
					],
					optional,
				)
			}
		}
	}

	async fn prepare(&self, payload: &Value) -> Result<PreparedIntent, IntentError> {
		let normalized = self.normalized_value(payload)?;

		// Market membership is config-backed, not live state, so reject
		// unlisted assets before anything is persisted.
		let chain = normalized["chain"].as_str().unwrap_or_default().to_string();
		let market = self.market(&chain)?;
		match self.op {
			LendingOperation::Liquidate => {
				for field in ["collateralAsset", "debtAsset"] {
					let symbol = normalized[field].as_str().unwrap_or_default();
					self.token(market, &chain, symbol)?;
				}
			}
			LendingOperation::FlashLoan => {
				let parsed: FlashLoanPayload = parse_payload(&normalized)?;
				if parsed.assets.is_empty() {
					return Err(ValidationErrors::single("assets", "must not be empty").into());
				}
				if parsed.assets.len() != parsed.amounts.len() {
					return Err(ValidationErrors::single(
						"amounts",
						"must have one entry per asset",
					)
					.into());
				}
				for symbol in &parsed.assets {
					self.token(market, &chain, symbol)?;
				}
			}
			_ => {
				let symbol = normalized["asset"].as_str().unwrap_or_default();
				self.token(market, &chain, symbol)?;
			}
		}

		Ok(PreparedIntent::new(normalized))
	}

	async fn assemble(
		&self,
		payload: &Value,
		signer: &str,
	) -> Result<Vec<UnsignedTransaction>, IntentError> {
		let signer = parse_evm_field("signerAddress", signer)?;
		let (chain_name, data) = self.calldata(payload, signer)?;

		let market = self.market(&chain_name)?;
		let pool = parse_configured_evm("pool", &market.pool)?;
		let chain = self.chains.evm(&chain_name)?;

		let transaction =
			assemble_eip1559(chain.as_ref(), signer, pool, U256::ZERO, data).await?;
		Ok(vec![transaction])
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::MockEvmChain;
	use serde_json::json;
	use std::str::FromStr;

	const POOL: &str = "0x87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2";
	const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
	const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
	const SIGNER: &str = "0x1111111111111111111111111111111111111111";

	fn config() -> LendingConfig {
		LendingConfig {
			markets: HashMap::from([(
				"ethereum".to_string(),
				MarketConfig {
					pool: POOL.to_string(),
					tokens: vec![
						TokenConfig {
							symbol: "USDC".to_string(),
							address: USDC.to_string(),
							decimals: 6,
						},
						TokenConfig {
							symbol: "WETH".to_string(),
							address: WETH.to_string(),
							decimals: 18,
						},
					],
				},
			)]),
		}
	}

	fn handler(op: LendingOperation) -> LendingHandler {
		let mut registry = ChainRegistry::new();
		registry
			.register_evm(Arc::new(MockEvmChain::new("ethereum", 1)))
			.unwrap();
		LendingHandler::new(op, &config(), Arc::new(registry))
	}

	#[test]
	fn kinds_cover_every_operation() {
		let kinds: Vec<&str> = LendingOperation::ALL.iter().map(|op| op.kind()).collect();
		assert_eq!(
			kinds,
			vec![
				"evm-lending-supply",
				"evm-lending-withdraw",
				"evm-lending-borrow",
				"evm-lending-repay",
				"evm-lending-liquidate",
				"evm-lending-flashloan",
			]
		);
	}

	#[test]
	fn unsupported_chain_is_flagged_by_field_name() {
		let handler = handler(LendingOperation::Supply);
		let payload = json!({"asset": "USDC", "amount": "100", "chain": "NotAChain"});

		let errors = handler.schema().validate(&payload).unwrap_err();
		assert_eq!(errors.fields(), vec!["chain"]);
	}

	#[tokio::test]
	async fn supply_defaults_on_behalf_of_to_signer() {
		let handler = handler(LendingOperation::Supply);
		let payload = json!({"chain": "Ethereum", "asset": "usdc", "amount": "100"});
		let signer = Address::from_str(SIGNER).unwrap();

		let (chain, data) = handler.calldata(&payload, signer).unwrap();
		assert_eq!(chain, "ethereum");
		assert_eq!(&data[..4], IPool::supplyCall::SELECTOR.as_slice());

		let call = IPool::supplyCall::abi_decode(&data, true).unwrap();
		assert_eq!(call.asset, Address::from_str(USDC).unwrap());
		assert_eq!(call.amount, U256::from(100_000_000u64));
		assert_eq!(call.onBehalfOf, signer);
		assert_eq!(call.referralCode, REFERRAL_CODE);
	}

	#[tokio::test]
	async fn borrow_defaults_to_variable_rate() {
		let handler = handler(LendingOperation::Borrow);
		let payload = json!({"chain": "ethereum", "asset": "WETH", "amount": "0.5"});
		let signer = Address::from_str(SIGNER).unwrap();

		let (_, data) = handler.calldata(&payload, signer).unwrap();
		let call = IPool::borrowCall::abi_decode(&data, true).unwrap();
		assert_eq!(call.interestRateMode, U256::from(2));
		assert_eq!(call.amount, U256::from(500_000_000_000_000_000u64));
	}

	#[tokio::test]
	async fn withdraw_defaults_recipient_to_signer() {
		let handler = handler(LendingOperation::Withdraw);
		let payload = json!({"chain": "ethereum", "asset": "USDC", "amount": "25"});
		let signer = Address::from_str(SIGNER).unwrap();

		let (_, data) = handler.calldata(&payload, signer).unwrap();
		let call = IPool::withdrawCall::abi_decode(&data, true).unwrap();
		assert_eq!(call.to, signer);
	}

	#[tokio::test]
	async fn liquidation_converts_debt_in_debt_token_decimals() {
		let handler = handler(LendingOperation::Liquidate);
		let payload = json!({
			"chain": "ethereum",
			"collateralAsset": "WETH",
			"debtAsset": "USDC",
			"user": "0x2222222222222222222222222222222222222222",
			"debtToCover": "1500",
		});
		let signer = Address::from_str(SIGNER).unwrap();

		let (_, data) = handler.calldata(&payload, signer).unwrap();
		let call = IPool::liquidationCallCall::abi_decode(&data, true).unwrap();
		assert_eq!(call.debtToCover, U256::from(1_500_000_000u64));
		assert!(!call.receiveAToken);
	}

	#[tokio::test]
	async fn flash_loan_requires_matching_lengths() {
		let handler = handler(LendingOperation::FlashLoan);
		let payload = json!({
			"chain": "ethereum",
			"receiverAddress": SIGNER,
			"assets": ["USDC", "WETH"],
			"amounts": ["100"],
		});

		let result = handler.calldata(&payload, Address::from_str(SIGNER).unwrap());
		match result {
			Err(IntentError::Validation(errors)) => {
				assert_eq!(errors.fields(), vec!["amounts"]);
			}
			other => panic!("expected validation error, got {:?}", other.err()),
		}
	}

	#[tokio::test]
	async fn flash_loan_defaults_modes_to_zero() {
		let handler = handler(LendingOperation::FlashLoan);
		let payload = json!({
			"chain": "ethereum",
			"receiverAddress": SIGNER,
			"assets": ["USDC"],
			"amounts": [1000],
		});

		let (_, data) = handler
			.calldata(&payload, Address::from_str(SIGNER).unwrap())
			.unwrap();
		let call = IPool::flashLoanCall::abi_decode(&data, true).unwrap();
		assert_eq!(call.amounts, vec![U256::from(1_000_000_000u64)]);
		assert_eq!(call.interestRateModes, vec![U256::ZERO]);
		assert!(call.params.is_empty());
	}

	#[tokio::test]
	async fn unlisted_asset_never_reaches_persistence() {
		let handler = handler(LendingOperation::Supply);
		let payload = json!({"chain": "ethereum", "asset": "DOGE", "amount": "1"});

		let result = handler.prepare(&payload).await;
		match result {
			Err(IntentError::Domain(message)) => {
				assert!(message.contains("DOGE"), "{}", message);
			}
			other => panic!("expected domain error, got {:?}", other.err()),
		}
	}

	#[tokio::test]
	async fn assembles_one_pool_transaction() {
		let handler = handler(LendingOperation::Supply);
		let payload = json!({"chain": "ethereum", "asset": "USDC", "amount": "100"});

		let prepared = handler.prepare(&payload).await.unwrap();
		assert!(prepared.ttl.is_none());

		let txs = handler.assemble(&prepared.payload, SIGNER).await.unwrap();
		assert_eq!(txs.len(), 1);
		assert!(txs[0].bytes.starts_with("0x02"));
	}
}
