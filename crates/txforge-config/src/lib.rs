//! Configuration loading for the txforge service.
//!
//! TOML files with `${VAR}` environment substitution, a small set of
//! environment overrides, and cross-field validation: every route, market,
//! and venue must reference a configured chain, and every configured
//! address must parse before the service starts taking requests.

use regex::Regex;
use std::env;
use std::path::Path;
use thiserror::Error;
use txforge_types::address::is_evm_address;
use txforge_types::amount::to_base_units;
use txforge_types::config::{AppConfig, StorageBackend};

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("file not found: {0}")]
	FileNotFound(String),

	#[error("parse error: {0}")]
	ParseError(String),

	#[error("validation error: {0}")]
	ValidationError(String),

	#[error("environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("io error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Configuration loader with environment variable substitution.
#[derive(Default)]
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "TXFORGE_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<AppConfig, ConfigError> {
		let mut config = if let Some(file_path) = &self.file_path {
			self.load_from_file(file_path).await?
		} else {
			return Err(ConfigError::FileNotFound(
				"no configuration file specified".to_string(),
			));
		};

		self.apply_env_overrides(&mut config)?;
		validate(&config)?;

		Ok(config)
	}

	async fn load_from_file(&self, file_path: &str) -> Result<AppConfig, ConfigError> {
		let content = tokio::fs::read_to_string(file_path).await.map_err(|e| {
			if e.kind() == std::io::ErrorKind::NotFound {
				ConfigError::FileNotFound(file_path.to_string())
			} else {
				ConfigError::IoError(e)
			}
		})?;

		let substituted = substitute_env_vars(&content)?;
		toml::from_str(&substituted).map_err(|e| ConfigError::ParseError(e.to_string()))
	}

	fn apply_env_overrides(&self, config: &mut AppConfig) -> Result<(), ConfigError> {
		if let Ok(log_level) = env::var(format!("{}LOG_LEVEL", self.env_prefix)) {
			config.service.log_level = log_level;
		}

		if let Ok(http_port) = env::var(format!("{}HTTP_PORT", self.env_prefix)) {
			config.service.http_port = http_port
				.parse()
				.map_err(|e| ConfigError::ValidationError(format!("invalid HTTP port: {}", e)))?;
		}

		Ok(())
	}
}

/// Replaces `${VAR_NAME}` patterns with values from the environment.
fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
	let mut result = content.to_string();
	let pattern = Regex::new(r"\$\{([^}]+)\}").expect("static pattern");

	for capture in pattern.captures_iter(content) {
		let full_match = &capture[0];
		let var_name = &capture[1];

		let value =
			env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
		result = result.replace(full_match, &value);
	}

	Ok(result)
}

fn validate(config: &AppConfig) -> Result<(), ConfigError> {
	// Chain names are the registry keys handlers resolve against after
	// lowercasing payload values, so they must be lowercase to begin with.
	for name in config.chains.evm.keys().chain(config.chains.svm.keys()) {
		if name.chars().any(|c| c.is_ascii_uppercase()) {
			return Err(ConfigError::ValidationError(format!(
				"chain name '{}' must be lowercase",
				name
			)));
		}
	}

	if config.storage.backend == StorageBackend::File && config.storage.path.is_empty() {
		return Err(ConfigError::ValidationError(
			"file storage requires a non-empty path".to_string(),
		));
	}

	for (index, route) in config.bridge.routes.iter().enumerate() {
		let context = format!("bridge route #{}", index);
		if !config.chains.evm.contains_key(&route.src_chain.to_ascii_lowercase()) {
			return Err(ConfigError::ValidationError(format!(
				"{} references unconfigured chain '{}'",
				context, route.src_chain
			)));
		}
		if !is_evm_address(&route.endpoint) {
			return Err(ConfigError::ValidationError(format!(
				"{} has an invalid endpoint address",
				context
			)));
		}
		if let Some(token) = &route.token_address {
			if !is_evm_address(token) {
				return Err(ConfigError::ValidationError(format!(
					"{} has an invalid token address",
					context
				)));
			}
		}
		let min = to_base_units(&route.min_amount, route.decimals).map_err(|_| {
			ConfigError::ValidationError(format!("{} has an invalid min_amount", context))
		})?;
		let max = to_base_units(&route.max_amount, route.decimals).map_err(|_| {
			ConfigError::ValidationError(format!("{} has an invalid max_amount", context))
		})?;
		if min > max {
			return Err(ConfigError::ValidationError(format!(
				"{} has min_amount greater than max_amount",
				context
			)));
		}
	}

	for (chain, market) in &config.lending.markets {
		if !config.chains.evm.contains_key(&chain.to_ascii_lowercase()) {
			return Err(ConfigError::ValidationError(format!(
				"lending market references unconfigured chain '{}'",
				chain
			)));
		}
		if !is_evm_address(&market.pool) {
			return Err(ConfigError::ValidationError(format!(
				"lending market on '{}' has an invalid pool address",
				chain
			)));
		}
		for token in &market.tokens {
			if !is_evm_address(&token.address) {
				return Err(ConfigError::ValidationError(format!(
					"token {} on '{}' has an invalid address",
					token.symbol, chain
				)));
			}
		}
	}

	if config.liquidity.slippage_bps >= 10_000 {
		return Err(ConfigError::ValidationError(
			"liquidity slippage_bps must be below 10000".to_string(),
		));
	}
	for (chain, venue) in &config.liquidity.venues {
		if !config.chains.evm.contains_key(&chain.to_ascii_lowercase()) {
			return Err(ConfigError::ValidationError(format!(
				"liquidity venue references unconfigured chain '{}'",
				chain
			)));
		}
		for (label, address) in [("router", &venue.router), ("factory", &venue.factory)] {
			if !is_evm_address(address) {
				return Err(ConfigError::ValidationError(format!(
					"liquidity venue on '{}' has an invalid {} address",
					chain, label
				)));
			}
		}
		for token in &venue.tokens {
			if !is_evm_address(&token.address) {
				return Err(ConfigError::ValidationError(format!(
					"token {} on '{}' has an invalid address",
					token.symbol, chain
				)));
			}
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	const VALID: &str = r#"
		[service]
		http_port = 9090

		[chains.evm.ethereum]
		chain_id = 1
		rpc_url = "https://rpc.example"

		[chains.svm.solana]
		rpc_url = "https://api.mainnet-beta.solana.com"

		[[bridge.routes]]
		src_chain = "ethereum"
		src_token = "ETH"
		dst_chain = "arbitrum"
		dst_token = "ETH"
		endpoint = "0x80C67432656d59144cEFf962E8fAF8926599bCF8"
		decimals = 18
		min_amount = "0.001"
		max_amount = "10"
	"#;

	fn write_config(content: &str) -> tempfile::NamedTempFile {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(content.as_bytes()).unwrap();
		file
	}

	#[tokio::test]
	async fn loads_a_valid_file() {
		let file = write_config(VALID);
		let config = ConfigLoader::new().with_file(file.path()).load().await.unwrap();

		assert_eq!(config.service.http_port, 9090);
		assert_eq!(config.bridge.routes.len(), 1);
		assert!(config.chains.svm.contains_key("solana"));
	}

	#[tokio::test]
	async fn missing_file_is_reported() {
		let result = ConfigLoader::new()
			.with_file("/definitely/not/here.toml")
			.load()
			.await;
		assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
	}

	#[tokio::test]
	async fn substitutes_environment_variables() {
		env::set_var("TXFORGE_TEST_RPC", "https://rpc.example");
		let file = write_config(
			r#"
			[chains.evm.ethereum]
			chain_id = 1
			rpc_url = "${TXFORGE_TEST_RPC}"
			"#,
		);

		let config = ConfigLoader::new().with_file(file.path()).load().await.unwrap();
		assert_eq!(config.chains.evm["ethereum"].rpc_url, "https://rpc.example");
		env::remove_var("TXFORGE_TEST_RPC");
	}

	#[tokio::test]
	async fn unknown_variables_are_an_error() {
		let file = write_config(
			r#"
			[chains.evm.ethereum]
			chain_id = 1
			rpc_url = "${TXFORGE_UNSET_VARIABLE_FOR_TEST}"
			"#,
		);

		let result = ConfigLoader::new().with_file(file.path()).load().await;
		assert!(matches!(result, Err(ConfigError::EnvVarNotFound(_))));
	}

	#[tokio::test]
	async fn routes_must_reference_configured_chains() {
		let file = write_config(
			r#"
			[[bridge.routes]]
			src_chain = "ethereum"
			src_token = "ETH"
			dst_chain = "arbitrum"
			dst_token = "ETH"
			endpoint = "0x80C67432656d59144cEFf962E8fAF8926599bCF8"
			decimals = 18
			min_amount = "0.001"
			max_amount = "10"
			"#,
		);

		let result = ConfigLoader::new().with_file(file.path()).load().await;
		match result {
			Err(ConfigError::ValidationError(message)) => {
				assert!(message.contains("unconfigured chain"), "{}", message);
			}
			other => panic!("expected validation error, got {:?}", other.err()),
		}
	}

	#[tokio::test]
	async fn route_bounds_must_be_ordered() {
		let file = write_config(&VALID.replace("min_amount = \"0.001\"", "min_amount = \"100\""));
		let result = ConfigLoader::new().with_file(file.path()).load().await;
		match result {
			Err(ConfigError::ValidationError(message)) => {
				assert!(message.contains("min_amount greater"), "{}", message);
			}
			other => panic!("expected validation error, got {:?}", other.err()),
		}
	}
}
