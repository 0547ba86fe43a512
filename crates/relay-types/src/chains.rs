//! Destination chain identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const ARBITRUM: &str = "arbitrum";
pub const OPTIMISM: &str = "optimism";
pub const POLYGON: &str = "polygon";

/// Chains the relay ships adapters for.
pub const KNOWN_CHAINS: [&str; 3] = [ARBITRUM, OPTIMISM, POLYGON];

/// Identifier of a destination chain, e.g. `arbitrum`.
///
/// Names are normalised to trimmed lowercase so that `"Arbitrum"` from a job
/// row and `"arbitrum"` from configuration select the same adapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ChainId(String);

impl ChainId {
	pub fn new(name: impl AsRef<str>) -> Self {
		Self(name.as_ref().trim().to_ascii_lowercase())
	}

	pub fn arbitrum() -> Self {
		Self::new(ARBITRUM)
	}

	pub fn optimism() -> Self {
		Self::new(OPTIMISM)
	}

	pub fn polygon() -> Self {
		Self::new(POLYGON)
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Whether this crate ships an adapter profile for the chain.
	pub fn is_known(&self) -> bool {
		KNOWN_CHAINS.contains(&self.0.as_str())
	}

	/// Upper-case prefix used for per-chain environment variables
	/// (`ARBITRUM` in `ARBITRUM_RPC_URL`).
	pub fn env_prefix(&self) -> String {
		self.0.to_ascii_uppercase().replace('-', "_")
	}
}

impl fmt::Display for ChainId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<String> for ChainId {
	fn from(name: String) -> Self {
		Self::new(name)
	}
}

impl From<&str> for ChainId {
	fn from(name: &str) -> Self {
		Self::new(name)
	}
}

impl From<ChainId> for String {
	fn from(chain: ChainId) -> Self {
		chain.0
	}
}

impl FromStr for ChainId {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self::new(s))
	}
}
