//! Address syntax checks per chain family.
//!
//! These are purely syntactic: they belong to the validation layer and never
//! touch the network. Whether an account actually exists is a handler
//! concern resolved at build time.

/// `0x` followed by 40 hex characters.
pub fn is_evm_address(address: &str) -> bool {
	let Some(hex_part) = address.strip_prefix("0x") else {
		return false;
	};
	hex_part.len() == 40 && hex_part.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Base58 string decoding to exactly 32 bytes.
pub fn is_svm_address(address: &str) -> bool {
	bs58::decode(address)
		.into_vec()
		.map(|bytes| bytes.len() == 32)
		.unwrap_or(false)
}

/// Field validator for EVM addresses, for use with
/// [`Field::with_validator`](crate::schema::Field::with_validator).
pub fn evm_address_validator(value: &serde_json::Value) -> Result<(), String> {
	match value.as_str() {
		Some(s) if is_evm_address(s) => Ok(()),
		Some(s) => Err(format!("'{}' is not a valid EVM address", s)),
		None => Err("expected string".to_string()),
	}
}

/// Field validator for SVM (base58) addresses.
pub fn svm_address_validator(value: &serde_json::Value) -> Result<(), String> {
	match value.as_str() {
		Some(s) if is_svm_address(s) => Ok(()),
		Some(s) => Err(format!("'{}' is not a valid base58 address", s)),
		None => Err("expected string".to_string()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn evm_address_syntax() {
		assert!(is_evm_address("0x87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2"));
		assert!(!is_evm_address("87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2"));
		assert!(!is_evm_address("0x87870Bca3F3fD6335C3F4ce8392D69350B4fA4"));
		assert!(!is_evm_address("0xZZ870Bca3F3fD6335C3F4ce8392D69350B4fA4E2"));
	}

	#[test]
	fn svm_address_syntax() {
		// System program id, 32 bytes of zeros.
		assert!(is_svm_address("11111111111111111111111111111111"));
		assert!(is_svm_address(
			"TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA"
		));
		// 'l' is not in the base58 alphabet.
		assert!(!is_svm_address("l1111111111111111111111111111111"));
		assert!(!is_svm_address("abc"));
		assert!(!is_svm_address(""));
	}
}
