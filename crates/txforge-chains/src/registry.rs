//! Registry of configured chain clients, keyed by chain name.
//!
//! Built once at startup and read-only afterwards; handlers share it via
//! `Arc` and resolve the client for whichever chain a payload names.

use crate::{ChainError, EvmChain, SvmChain};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

#[derive(Default)]
pub struct ChainRegistry {
	evm: HashMap<String, Arc<dyn EvmChain>>,
	svm: HashMap<String, Arc<dyn SvmChain>>,
}

impl ChainRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register_evm(&mut self, chain: Arc<dyn EvmChain>) -> Result<(), ChainError> {
		let name = chain.name().to_string();
		info!(chain = %name, chain_id = chain.chain_id(), "registering EVM chain client");

		if self.evm.contains_key(&name) {
			return Err(ChainError::AlreadyRegistered(name));
		}
		self.evm.insert(name, chain);
		Ok(())
	}

	pub fn register_svm(&mut self, chain: Arc<dyn SvmChain>) -> Result<(), ChainError> {
		let name = chain.name().to_string();
		info!(chain = %name, "registering SVM chain client");

		if self.svm.contains_key(&name) {
			return Err(ChainError::AlreadyRegistered(name));
		}
		self.svm.insert(name, chain);
		Ok(())
	}

	pub fn evm(&self, name: &str) -> Result<Arc<dyn EvmChain>, ChainError> {
		self.evm
			.get(name)
			.cloned()
			.ok_or_else(|| ChainError::UnknownChain(name.to_string()))
	}

	pub fn svm(&self, name: &str) -> Result<Arc<dyn SvmChain>, ChainError> {
		self.svm
			.get(name)
			.cloned()
			.ok_or_else(|| ChainError::UnknownChain(name.to_string()))
	}

	/// Names of every configured EVM chain.
	pub fn evm_names(&self) -> Vec<String> {
		self.evm.keys().cloned().collect()
	}
}
