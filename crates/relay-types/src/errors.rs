//! Error types for the relay system.

use crate::{ChainId, RelayStatus};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
	/// Missing signing key or unusable adapter settings.
	#[error("Configuration error: {0}")]
	Configuration(String),

	/// Submission failed: revert, insufficient funds, RPC rejection.
	#[error("{chain} relay transaction failed: {reason}")]
	Transaction { chain: ChainId, reason: String },

	/// Transient failure while reading a transaction, receipt or block height.
	#[error("{chain} confirmation query failed: {reason}")]
	ConfirmationQuery { chain: ChainId, reason: String },

	#[error("No adapter for chain {0}")]
	ChainNotSupported(ChainId),

	#[error("{chain} {operation} timed out after {timeout_secs}s")]
	Timeout {
		chain: ChainId,
		operation: &'static str,
		timeout_secs: u64,
	},

	#[error("Invalid status transition from {from} to {to}")]
	InvalidTransition { from: RelayStatus, to: RelayStatus },
}

impl RelayError {
	pub fn transaction(chain: &ChainId, reason: impl ToString) -> Self {
		Self::Transaction {
			chain: chain.clone(),
			reason: reason.to_string(),
		}
	}

	pub fn confirmation_query(chain: &ChainId, reason: impl ToString) -> Self {
		Self::ConfirmationQuery {
			chain: chain.clone(),
			reason: reason.to_string(),
		}
	}

	/// Whether another attempt could succeed without operator intervention.
	pub fn is_retryable(&self) -> bool {
		matches!(
			self,
			Self::Transaction { .. } | Self::ConfirmationQuery { .. } | Self::Timeout { .. }
		)
	}
}
