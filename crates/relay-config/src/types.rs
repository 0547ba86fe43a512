//! Configuration types for the relay.

use relay_types::ChainId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Complete relay configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
	/// Retry and timeout policy for relay submission
	pub relay: RelaySettings,
	/// Confirmation polling
	pub monitor: MonitorSettings,
	/// Key shared by every chain's signer
	pub signer: SignerSettings,
	/// Destination chains by name
	pub chains: HashMap<ChainId, ChainConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelaySettings {
	/// Attempts per job before it is marked failed
	pub max_attempts: u32,
	/// Delay before each retry in milliseconds; the last entry repeats
	pub backoff_ms: Vec<u64>,
	/// Upper bound on one submission, including the first confirmation
	pub relay_timeout_secs: u64,
	/// Upper bound on one confirmation query
	pub rpc_timeout_secs: u64,
}

impl Default for RelaySettings {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			backoff_ms: vec![1_000, 5_000, 15_000],
			relay_timeout_secs: 180,
			rpc_timeout_secs: 15,
		}
	}
}

impl RelaySettings {
	pub fn backoff_schedule(&self) -> Vec<Duration> {
		self.backoff_ms
			.iter()
			.copied()
			.map(Duration::from_millis)
			.collect()
	}

	pub fn relay_timeout(&self) -> Duration {
		Duration::from_secs(self.relay_timeout_secs)
	}

	pub fn rpc_timeout(&self) -> Duration {
		Duration::from_secs(self.rpc_timeout_secs)
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorSettings {
	pub poll_interval_secs: u64,
}

impl Default for MonitorSettings {
	fn default() -> Self {
		Self {
			poll_interval_secs: 30,
		}
	}
}

impl MonitorSettings {
	pub fn poll_interval(&self) -> Duration {
		Duration::from_secs(self.poll_interval_secs)
	}
}

#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SignerSettings {
	/// Hex private key. May be absent at load time; relays then fail with a
	/// configuration error.
	pub private_key: Option<String>,
}

impl fmt::Debug for SignerSettings {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SignerSettings")
			.field(
				"private_key",
				&self.private_key.as_ref().map(|_| "<redacted>"),
			)
			.finish()
	}
}

/// Chain-specific configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChainConfig {
	/// HTTP RPC endpoint
	pub rpc_url: String,
	/// Receipt bridge contract
	pub bridge_address: String,
}
