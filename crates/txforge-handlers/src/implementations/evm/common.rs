//! Shared EVM transaction assembly.
//!
//! Every EVM handler funnels its encoded call through [`assemble_eip1559`]:
//! fetch current fee parameters (failing distinctly when the source cannot
//! supply them), the signer's nonce, and a gas estimate, then serialize the
//! unsigned EIP-1559 transaction in its canonical EIP-2718 form.

use alloy_consensus::{SignableTransaction, TxEip1559};
use alloy_primitives::{Address, Bytes, TxKind, U256};
use alloy_sol_types::{sol, SolCall};
use txforge_chains::EvmChain;
use txforge_types::{IntentError, UnsignedTransaction};

sol! {
	interface IERC20 {
		function decimals() external view returns (uint8);
		function transfer(address to, uint256 value) external returns (bool);
	}
}

/// Reads a token's decimal count via `eth_call`.
pub(crate) async fn erc20_decimals(
	chain: &dyn EvmChain,
	token: Address,
) -> Result<u8, IntentError> {
	let data = IERC20::decimalsCall {}.abi_encode();
	let response = chain.call(token, data.into()).await?;
	IERC20::decimalsCall::abi_decode_returns(&response, true)
		.map(|decoded| decoded._0)
		.map_err(|e| IntentError::UpstreamData(format!("malformed decimals() response: {}", e)))
}

/// Calldata for a plain ERC-20 transfer.
pub(crate) fn encode_erc20_transfer(to: Address, value: U256) -> Vec<u8> {
	IERC20::transferCall { to, value }.abi_encode()
}

/// Builds the unsigned EIP-1559 transaction wrapping `input`, serialized
/// for signing (type byte + RLP payload, hex-encoded).
pub(crate) async fn assemble_eip1559(
	chain: &dyn EvmChain,
	from: Address,
	to: Address,
	value: U256,
	input: Vec<u8>,
) -> Result<UnsignedTransaction, IntentError> {
	let input: Bytes = input.into();

	let fees = chain.fee_data().await?;
	let nonce = chain.transaction_count(from).await?;
	let gas_limit = chain
		.estimate_gas(from, to, input.clone(), value)
		.await?;

	let transaction = TxEip1559 {
		chain_id: chain.chain_id(),
		nonce,
		gas_limit,
		max_fee_per_gas: fees.max_fee_per_gas,
		max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
		to: TxKind::Call(to),
		value,
		input,
		..Default::default()
	};

	Ok(UnsignedTransaction::hex(transaction.encoded_for_signing()))
}
