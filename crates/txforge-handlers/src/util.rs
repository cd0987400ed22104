//! Parsing helpers shared by handler implementations.

use alloy_primitives::{Address, U256};
use serde::de::DeserializeOwned;
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use txforge_types::amount::{to_base_units, to_base_units_u64, AmountError};
use txforge_types::{IntentError, ValidationErrors};

/// Deserializes a stored or schema-validated payload into the handler's
/// typed form. A mismatch here means a corrupt record or a schema drift,
/// so it fails closed rather than guessing.
pub(crate) fn parse_payload<T: DeserializeOwned>(payload: &Value) -> Result<T, IntentError> {
	serde_json::from_value(payload.clone())
		.map_err(|e| IntentError::Internal(format!("payload does not match handler schema: {}", e)))
}

/// Converts a decimal-string amount to base units, attributing failures to
/// the named payload field.
pub(crate) fn amount_to_units(
	field: &str,
	amount: &str,
	decimals: u8,
) -> Result<U256, IntentError> {
	to_base_units(amount, decimals).map_err(|e| amount_error(field, amount, e))
}

pub(crate) fn amount_to_units_u64(
	field: &str,
	amount: &str,
	decimals: u8,
) -> Result<u64, IntentError> {
	to_base_units_u64(amount, decimals).map_err(|e| amount_error(field, amount, e))
}

fn amount_error(field: &str, amount: &str, error: AmountError) -> IntentError {
	match error {
		AmountError::Malformed(_) => {
			ValidationErrors::single(field, format!("'{}' is not a valid decimal amount", amount))
				.into()
		}
		AmountError::Overflow => IntentError::Domain(format!(
			"amount {} exceeds the chain's representable range",
			amount
		)),
	}
}

/// Parses an EVM address supplied by the caller (signer, onBehalfOf, ...),
/// reporting failures as a validation error on the named field.
pub(crate) fn parse_evm_field(field: &str, value: &str) -> Result<Address, IntentError> {
	Address::from_str(value).map_err(|_| {
		ValidationErrors::single(field, format!("'{}' is not a valid EVM address", value)).into()
	})
}

/// Parses a configured EVM address (pool, router, endpoint). These are
/// checked at startup, so a failure here is an internal inconsistency.
pub(crate) fn parse_configured_evm(context: &str, value: &str) -> Result<Address, IntentError> {
	Address::from_str(value)
		.map_err(|_| IntentError::Internal(format!("configured {} address '{}' is invalid", context, value)))
}

/// Parses a base58 SVM address, reporting failures against the named field.
pub(crate) fn parse_pubkey_field(field: &str, value: &str) -> Result<Pubkey, IntentError> {
	Pubkey::from_str(value).map_err(|_| {
		ValidationErrors::single(field, format!("'{}' is not a valid base58 address", value))
			.into()
	})
}
