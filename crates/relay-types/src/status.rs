//! Relay outcomes and status snapshots.

use crate::{ChainId, DocHash, RelayStatus, TxHash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one relay attempt or of a whole retry sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayResult {
	pub success: bool,
	pub tx_hash: Option<TxHash>,
	pub error: Option<String>,
	pub confirmations: Option<u64>,
}

impl RelayResult {
	pub fn succeeded(tx_hash: TxHash) -> Self {
		Self {
			success: true,
			tx_hash: Some(tx_hash),
			error: None,
			confirmations: None,
		}
	}

	pub fn failed(error: impl Into<String>) -> Self {
		Self {
			success: false,
			tx_hash: None,
			error: Some(error.into()),
			confirmations: None,
		}
	}
}

/// Confirmation depth of a relay transaction against its chain's threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfirmationCount {
	pub confirmations: u64,
	pub required: u64,
}

impl ConfirmationCount {
	pub fn new(confirmations: u64, required: u64) -> Self {
		Self {
			confirmations,
			required,
		}
	}

	/// A zero threshold means the chain is unknown, never final.
	pub fn is_final(&self) -> bool {
		self.required > 0 && self.confirmations >= self.required
	}
}

/// Point-in-time delivery status of one relay job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStatus {
	pub chain: ChainId,
	pub tx_hash: Option<TxHash>,
	pub confirmations: u64,
	pub required_confirmations: u64,
	pub status: RelayStatus,
	pub last_error: Option<String>,
	pub updated_at: DateTime<Utc>,
}

/// Aggregate delivery state of one document across every target chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
	Pending,
	Partial,
	Complete,
	Failed,
}

impl fmt::Display for OverallStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::Pending => "pending",
			Self::Partial => "partial",
			Self::Complete => "complete",
			Self::Failed => "failed",
		};
		f.write_str(s)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossChainStatus {
	pub doc_hash: DocHash,
	pub chains: Vec<ChainStatus>,
	pub overall_status: OverallStatus,
}
