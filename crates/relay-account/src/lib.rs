//! Signing credentials for relay transactions.
//!
//! Every destination chain signs with the same private key. Adapters hold a
//! [`LazyWallet`] so the key is only parsed when the first relay on that chain
//! is attempted; the parsed wallet is then cached for the adapter's lifetime.

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use std::fmt;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountError {
	#[error("Signing key not configured (set BRIDGE_PRIVATE_KEY)")]
	MissingKey,
	#[error("Invalid key: {0}")]
	InvalidKey(String),
}

/// Local wallet implementation using Alloy's signer.
#[derive(Clone)]
pub struct LocalWallet {
	signer: PrivateKeySigner,
}

impl LocalWallet {
	/// Creates a new LocalWallet from a hex-encoded private key.
	///
	/// The private key should be provided as a hex string (with or without 0x prefix).
	pub fn new(private_key_hex: &str) -> Result<Self, AccountError> {
		let signer = private_key_hex
			.trim()
			.parse::<PrivateKeySigner>()
			.map_err(|e| AccountError::InvalidKey(format!("Invalid private key: {}", e)))?;

		Ok(Self { signer })
	}

	pub fn address(&self) -> Address {
		self.signer.address()
	}

	/// Wallet for a provider's signing filler.
	pub fn ethereum_wallet(&self) -> EthereumWallet {
		EthereumWallet::from(self.signer.clone())
	}
}

impl fmt::Debug for LocalWallet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LocalWallet")
			.field("address", &self.address())
			.finish()
	}
}

/// A wallet that is constructed on first use and then reused.
pub struct LazyWallet {
	private_key: Option<String>,
	wallet: OnceCell<LocalWallet>,
}

impl LazyWallet {
	pub fn new(private_key: Option<String>) -> Self {
		Self {
			private_key,
			wallet: OnceCell::new(),
		}
	}

	/// Returns the cached wallet, building it on the first call.
	///
	/// Failures are not cached, so a later call re-reads the key.
	pub async fn wallet(&self) -> Result<&LocalWallet, AccountError> {
		self.wallet
			.get_or_try_init(|| async {
				let key = self.private_key.as_deref().ok_or(AccountError::MissingKey)?;
				let wallet = LocalWallet::new(key)?;
				debug!(address = %wallet.address(), "Initialized relay signer");
				Ok::<_, AccountError>(wallet)
			})
			.await
	}

	pub fn is_initialized(&self) -> bool {
		self.wallet.initialized()
	}

	pub fn has_key(&self) -> bool {
		self.private_key.is_some()
	}
}

impl fmt::Debug for LazyWallet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LazyWallet")
			.field("has_key", &self.has_key())
			.field("wallet", &self.wallet.get())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

	#[test]
	fn test_local_wallet_from_hex() {
		let with_prefix = LocalWallet::new(KEY).unwrap();
		let without_prefix = LocalWallet::new(&KEY[2..]).unwrap();
		assert_eq!(with_prefix.address(), without_prefix.address());
	}

	#[test]
	fn test_local_wallet_rejects_garbage() {
		assert!(matches!(
			LocalWallet::new("0x1234"),
			Err(AccountError::InvalidKey(_))
		));
	}

	#[tokio::test]
	async fn test_lazy_wallet_initializes_once() {
		let lazy = LazyWallet::new(Some(KEY.to_string()));
		assert!(!lazy.is_initialized());

		let first = lazy.wallet().await.unwrap().address();
		assert!(lazy.is_initialized());

		let second = lazy.wallet().await.unwrap().address();
		assert_eq!(first, second);
	}

	#[tokio::test]
	async fn test_lazy_wallet_without_key() {
		let lazy = LazyWallet::new(None);
		assert_eq!(lazy.wallet().await.unwrap_err(), AccountError::MissingKey);
		assert!(!lazy.is_initialized());
	}

	#[test]
	fn test_debug_does_not_leak_key() {
		let lazy = LazyWallet::new(Some(KEY.to_string()));
		assert!(!format!("{:?}", lazy).contains(&KEY[2..]));
	}
}
