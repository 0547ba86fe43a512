//! Bridge adapter implementations.
//!
//! All supported destination chains are EVM chains reached through the same
//! alloy-based adapter; what differs per chain is its [`ChainProfile`]:
//!
//! - `arbitrum`: 20 confirmations
//! - `optimism`: 50 confirmations
//! - `polygon`: 128 confirmations

pub mod arbitrum;
pub mod evm;
pub mod optimism;
pub mod polygon;

pub use evm::alloy::EvmBridgeAdapter;

use crate::BridgeAdapter;
use relay_config::{ChainConfig, Config};
use relay_types::{ChainId, RelayError};
use std::sync::Arc;

/// Fixed per-chain relay parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainProfile {
	pub name: &'static str,
	/// Finality threshold; higher for chains with slower finality.
	pub required_confirmations: u64,
	/// Gas budget for the `relayReceipt` call.
	pub gas_limit: u64,
}

/// Profile of a supported chain, if any.
pub fn profile_for(chain: &ChainId) -> Option<ChainProfile> {
	[arbitrum::PROFILE, optimism::PROFILE, polygon::PROFILE]
		.into_iter()
		.find(|profile| profile.name == chain.as_str())
}

/// Builds the adapter for one configured chain.
pub fn create_adapter(
	chain: &ChainId,
	config: &ChainConfig,
	private_key: Option<String>,
) -> Result<Arc<dyn BridgeAdapter>, RelayError> {
	let profile = profile_for(chain).ok_or_else(|| RelayError::ChainNotSupported(chain.clone()))?;
	let adapter = EvmBridgeAdapter::new(
		profile,
		&config.rpc_url,
		&config.bridge_address,
		private_key,
	)?;
	Ok(Arc::new(adapter))
}

/// Builds one adapter per configured chain, sharing the signing key.
pub fn create_adapters(config: &Config) -> Result<Vec<Arc<dyn BridgeAdapter>>, RelayError> {
	config
		.chains
		.iter()
		.map(|(chain, chain_config)| {
			create_adapter(chain, chain_config, config.signer.private_key.clone())
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	const BRIDGE: &str = "0x742d35Cc6634C0532925a3b8D6Ac6c001afb7f9c";

	#[test]
	fn test_profiles() {
		assert_eq!(
			profile_for(&ChainId::arbitrum()).map(|p| p.required_confirmations),
			Some(20)
		);
		assert_eq!(
			profile_for(&ChainId::optimism()).map(|p| p.required_confirmations),
			Some(50)
		);
		assert!(profile_for(&ChainId::polygon()).is_some());
		assert!(profile_for(&ChainId::new("base")).is_none());
	}

	#[test]
	fn test_create_adapters_from_config() {
		let mut config = Config::default();
		for chain in [ChainId::arbitrum(), ChainId::optimism()] {
			config.chains.insert(
				chain,
				ChainConfig {
					rpc_url: "http://127.0.0.1:8545".into(),
					bridge_address: BRIDGE.into(),
				},
			);
		}

		let adapters = create_adapters(&config).unwrap();
		let mut chains: Vec<_> = adapters.iter().map(|a| a.chain().clone()).collect();
		chains.sort();
		assert_eq!(chains, vec![ChainId::arbitrum(), ChainId::optimism()]);
	}

	#[test]
	fn test_unknown_chain_is_rejected() {
		let config = ChainConfig {
			rpc_url: "http://127.0.0.1:8545".into(),
			bridge_address: BRIDGE.into(),
		};
		assert!(matches!(
			create_adapter(&ChainId::new("base"), &config, None),
			Err(RelayError::ChainNotSupported(_))
		));
	}
}
