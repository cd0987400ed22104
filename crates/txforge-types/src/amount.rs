//! Exact conversion between human decimal amounts and on-chain base units.
//!
//! Amounts cross the pipeline as decimal strings and are scaled by
//! `10^decimals` using integer arithmetic only. Floating point is never
//! involved: `0.1` at 18 decimals is exactly `100000000000000000`.

use alloy_primitives::U256;
use serde::{Deserialize, Deserializer, Serializer};
use thiserror::Error;

use crate::schema::is_decimal;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
	#[error("malformed decimal amount: {0}")]
	Malformed(String),
	#[error("amount overflows the target integer width")]
	Overflow,
}

/// Scales a decimal-string amount to base units.
///
/// Fractional digits beyond `decimals` are rounded half-up, so the result is
/// `round(amount * 10^decimals)` under exact arithmetic.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<U256, AmountError> {
	if !is_decimal(amount) {
		return Err(AmountError::Malformed(amount.to_string()));
	}

	let (int_part, frac_part) = match amount.split_once('.') {
		Some((i, f)) => (i, f),
		None => (amount, ""),
	};

	let scale = decimals as usize;
	let mut digits = String::with_capacity(int_part.len() + scale);
	digits.push_str(int_part);

	let round_up = if frac_part.len() <= scale {
		digits.push_str(frac_part);
		for _ in 0..scale - frac_part.len() {
			digits.push('0');
		}
		false
	} else {
		digits.push_str(&frac_part[..scale]);
		frac_part.as_bytes()[scale] >= b'5'
	};

	let mut value =
		U256::from_str_radix(&digits, 10).map_err(|_| AmountError::Overflow)?;
	if round_up {
		value = value
			.checked_add(U256::from(1))
			.ok_or(AmountError::Overflow)?;
	}

	Ok(value)
}

/// Scales a decimal-string amount to base units that must fit in a `u64`
/// (SVM token amounts and lamports).
pub fn to_base_units_u64(amount: &str, decimals: u8) -> Result<u64, AmountError> {
	let value = to_base_units(amount, decimals)?;
	u64::try_from(value).map_err(|_| AmountError::Overflow)
}

/// Field validator requiring a strictly positive amount, for use with
/// [`Field::with_validator`](crate::schema::Field::with_validator) on
/// [`FieldType::Amount`](crate::schema::FieldType::Amount) fields.
pub fn positive_validator(value: &serde_json::Value) -> Result<(), String> {
	match crate::schema::decimal_string(value) {
		Some(s) if is_decimal(&s) => {
			if s.bytes().any(|b| (b'1'..=b'9').contains(&b)) {
				Ok(())
			} else {
				Err("amount must be positive".to_string())
			}
		}
		_ => Err("amount must be a decimal string or number".to_string()),
	}
}

/// Serde adapter for amount fields that arrive as either a JSON string or a
/// JSON number, normalized to a `String` on the way in.
pub mod serde_decimal {
	use super::*;
	use serde_json::Value;

	pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
	where
		D: Deserializer<'de>,
	{
		match Value::deserialize(deserializer)? {
			Value::String(s) => Ok(s),
			Value::Number(n) => Ok(n.to_string()),
			other => Err(serde::de::Error::custom(format!(
				"amount must be a decimal string or number, got {}",
				other
			))),
		}
	}

	pub fn serialize<S>(amount: &str, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(amount)
	}
}

/// Like [`serde_decimal`], for optional amount fields.
pub mod serde_decimal_opt {
	use serde::{Deserialize, Deserializer, Serializer};
	use serde_json::Value;

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
	where
		D: Deserializer<'de>,
	{
		match Option::<Value>::deserialize(deserializer)? {
			None | Some(Value::Null) => Ok(None),
			Some(Value::String(s)) => Ok(Some(s)),
			Some(Value::Number(n)) => Ok(Some(n.to_string())),
			Some(other) => Err(serde::de::Error::custom(format!(
				"amount must be a decimal string or number, got {}",
				other
			))),
		}
	}

	pub fn serialize<S>(amount: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match amount {
			Some(amount) => serializer.serialize_str(amount),
			None => serializer.serialize_none(),
		}
	}
}

/// Like [`serde_decimal`], for arrays of amounts.
pub mod serde_decimal_vec {
	use serde::{Deserialize, Deserializer, Serializer};
	use serde_json::Value;

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
	where
		D: Deserializer<'de>,
	{
		Vec::<Value>::deserialize(deserializer)?
			.into_iter()
			.map(|value| match value {
				Value::String(s) => Ok(s),
				Value::Number(n) => Ok(n.to_string()),
				other => Err(serde::de::Error::custom(format!(
					"amount must be a decimal string or number, got {}",
					other
				))),
			})
			.collect()
	}

	pub fn serialize<S>(amounts: &[String], serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.collect_seq(amounts)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn scales_across_common_decimal_widths() {
		for (amount, decimals, expected) in [
			("7", 0, "7"),
			("100", 6, "100000000"),
			("0.00000001", 8, "1"),
			("1.5", 9, "1500000000"),
			("0.1", 18, "100000000000000000"),
			("123.456789", 6, "123456789"),
		] {
			assert_eq!(
				to_base_units(amount, decimals).unwrap(),
				U256::from_str_radix(expected, 10).unwrap(),
				"{} @ {}",
				amount,
				decimals,
			);
		}
	}

	#[test]
	fn no_floating_point_drift() {
		// 0.0000000000000000001 * 10^18 would be 0.1 in f64 land.
		assert_eq!(
			to_base_units("0.000000000000000001", 18).unwrap(),
			U256::from(1)
		);
		// 29.0 + 0.1 style cases that break f64.
		assert_eq!(
			to_base_units("29.1", 18).unwrap(),
			U256::from_str_radix("29100000000000000000", 10).unwrap()
		);
	}

	#[test]
	fn rounds_half_up_beyond_precision() {
		assert_eq!(to_base_units("0.15", 1).unwrap(), U256::from(2));
		assert_eq!(to_base_units("0.14", 1).unwrap(), U256::from(1));
		assert_eq!(to_base_units("1.0000000015", 9).unwrap(), U256::from(1_000_000_002u64));
		assert_eq!(to_base_units("0.5", 0).unwrap(), U256::from(1));
		assert_eq!(to_base_units("0.4", 0).unwrap(), U256::from(0));
	}

	#[test]
	fn rejects_malformed_input() {
		for bad in ["", "1.", ".5", "-1", "1e18", "one", "1 000"] {
			assert_eq!(
				to_base_units(bad, 9),
				Err(AmountError::Malformed(bad.to_string()))
			);
		}
	}

	#[test]
	fn u64_width_is_enforced() {
		assert_eq!(to_base_units_u64("1.5", 9).unwrap(), 1_500_000_000);
		assert_eq!(
			to_base_units_u64("20000000000", 9),
			Err(AmountError::Overflow)
		);
	}

	#[test]
	fn u256_overflow_is_reported() {
		let huge = "9".repeat(78);
		assert_eq!(to_base_units(&huge, 18), Err(AmountError::Overflow));
	}
}
