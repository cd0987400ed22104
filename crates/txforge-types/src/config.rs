//! Typed configuration consumed by the pipeline builder.
//!
//! Kept here (rather than in the loader crate) so every crate that wires
//! itself from configuration can depend on the types without pulling in the
//! loading machinery.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
	#[serde(default)]
	pub service: ServiceConfig,
	#[serde(default)]
	pub storage: StorageConfig,
	#[serde(default)]
	pub chains: ChainsConfig,
	#[serde(default)]
	pub bridge: BridgeConfig,
	#[serde(default)]
	pub lending: LendingConfig,
	#[serde(default)]
	pub liquidity: LiquidityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	#[serde(default = "default_service_name")]
	pub name: String,
	#[serde(default = "default_http_port")]
	pub http_port: u16,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

impl Default for ServiceConfig {
	fn default() -> Self {
		Self {
			name: default_service_name(),
			http_port: default_http_port(),
			log_level: default_log_level(),
		}
	}
}

fn default_service_name() -> String {
	"txforge".to_string()
}

fn default_http_port() -> u16 {
	8080
}

fn default_log_level() -> String {
	"info".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	#[serde(default)]
	pub backend: StorageBackend,
	/// Base directory for the file backend.
	#[serde(default = "default_storage_path")]
	pub path: String,
}

impl Default for StorageConfig {
	fn default() -> Self {
		Self {
			backend: StorageBackend::Memory,
			path: default_storage_path(),
		}
	}
}

fn default_storage_path() -> String {
	"./data/intents".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
	#[default]
	Memory,
	File,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChainsConfig {
	/// Upper bound for any single outbound RPC call.
	#[serde(default = "default_rpc_timeout_ms")]
	pub rpc_timeout_ms: u64,
	#[serde(default)]
	pub evm: HashMap<String, EvmChainConfig>,
	#[serde(default)]
	pub svm: HashMap<String, SvmChainConfig>,
}

fn default_rpc_timeout_ms() -> u64 {
	10_000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvmChainConfig {
	pub chain_id: u64,
	pub rpc_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SvmChainConfig {
	pub rpc_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
	/// How long a resolved route stays buildable; bridge intents expire
	/// after this window.
	#[serde(default = "default_route_ttl_secs")]
	pub route_ttl_secs: u64,
	#[serde(default)]
	pub routes: Vec<BridgeRouteConfig>,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			route_ttl_secs: default_route_ttl_secs(),
			routes: Vec::new(),
		}
	}
}

fn default_route_ttl_secs() -> u64 {
	300
}

/// One configured trade pair: source chain/token to destination
/// chain/token via a bridge endpoint contract.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeRouteConfig {
	pub src_chain: String,
	pub src_token: String,
	pub dst_chain: String,
	pub dst_token: String,
	/// Bridge endpoint receiving the deposit on the source chain.
	pub endpoint: String,
	/// ERC-20 contract of the source token; omitted for the native asset.
	#[serde(default)]
	pub token_address: Option<String>,
	pub decimals: u8,
	pub min_amount: String,
	pub max_amount: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LendingConfig {
	/// Lending market per EVM chain name.
	#[serde(default)]
	pub markets: HashMap<String, MarketConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarketConfig {
	/// Pool contract address.
	pub pool: String,
	#[serde(default)]
	pub tokens: Vec<TokenConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
	pub symbol: String,
	pub address: String,
	pub decimals: u8,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LiquidityConfig {
	/// Slippage tolerance applied to desired amounts, in basis points.
	#[serde(default = "default_slippage_bps")]
	pub slippage_bps: u64,
	/// Transaction deadline window in seconds.
	#[serde(default = "default_deadline_secs")]
	pub deadline_secs: u64,
	/// TTL for cached pair lookups.
	#[serde(default = "default_pair_cache_ttl_secs")]
	pub pair_cache_ttl_secs: u64,
	/// V2-style router/factory per EVM chain name.
	#[serde(default)]
	pub venues: HashMap<String, VenueConfig>,
}

impl Default for LiquidityConfig {
	fn default() -> Self {
		Self {
			slippage_bps: default_slippage_bps(),
			deadline_secs: default_deadline_secs(),
			pair_cache_ttl_secs: default_pair_cache_ttl_secs(),
			venues: HashMap::new(),
		}
	}
}

fn default_slippage_bps() -> u64 {
	50
}

fn default_deadline_secs() -> u64 {
	1200
}

fn default_pair_cache_ttl_secs() -> u64 {
	300
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VenueConfig {
	pub router: String,
	pub factory: String,
	#[serde(default)]
	pub tokens: Vec<TokenConfig>,
}
