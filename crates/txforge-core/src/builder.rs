//! Wires a [`Pipeline`] from configuration.
//!
//! Chain clients, handlers, and the store are all constructed here, once,
//! at process start; everything the pipeline dispatches over afterwards is
//! immutable and shared.

use crate::Pipeline;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use txforge_chains::{ChainError, ChainRegistry, HttpEvmChain, RpcSvmChain};
use txforge_handlers::{
	BridgeHandler, HandlerRegistry, LendingHandler, LiquidityHandler, RegistryError,
	SvmTransferHandler,
};
use txforge_storage::{FileStore, IntentStore, MemoryStore};
use txforge_types::config::{AppConfig, StorageBackend};

#[derive(Debug, Error)]
pub enum BuildError {
	#[error("chain configuration error: {0}")]
	Chain(#[from] ChainError),
	#[error("handler registration error: {0}")]
	Registry(#[from] RegistryError),
}

pub struct PipelineBuilder {
	config: AppConfig,
}

impl PipelineBuilder {
	pub fn new(config: AppConfig) -> Self {
		Self { config }
	}

	pub fn build(self) -> Result<Pipeline, BuildError> {
		let config = self.config;
		let timeout = Duration::from_millis(config.chains.rpc_timeout_ms);

		let mut chains = ChainRegistry::new();
		for (name, evm) in &config.chains.evm {
			chains.register_evm(Arc::new(HttpEvmChain::new(
				name.clone(),
				evm.chain_id,
				&evm.rpc_url,
				timeout,
			)?))?;
		}
		for (name, svm) in &config.chains.svm {
			chains.register_svm(Arc::new(RpcSvmChain::new(name.clone(), &svm.rpc_url, timeout)))?;
		}
		let chains = Arc::new(chains);

		let mut handlers = HandlerRegistry::builder();
		for name in config.chains.svm.keys() {
			handlers = handlers.register(Arc::new(SvmTransferHandler::new(chains.svm(name)?)))?;
		}
		handlers = handlers.register(Arc::new(BridgeHandler::new(
			config.bridge.clone(),
			chains.clone(),
		)))?;
		for handler in LendingHandler::all(&config.lending, &chains) {
			handlers = handlers.register(Arc::new(handler))?;
		}
		for handler in LiquidityHandler::all(&config.liquidity, &chains) {
			handlers = handlers.register(Arc::new(handler))?;
		}
		let registry = Arc::new(handlers.build());

		let store: Arc<dyn IntentStore> = match config.storage.backend {
			StorageBackend::Memory => Arc::new(MemoryStore::new()),
			StorageBackend::File => Arc::new(FileStore::new(PathBuf::from(&config.storage.path))),
		};

		Ok(Pipeline::new(registry, store))
	}
}
