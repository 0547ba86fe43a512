//! Relay jobs and the updates the relay service reports for them.
//!
//! A [`RelayJob`] is owned and persisted by the orchestrator. The relay
//! service never mutates it directly; it emits [`JobUpdate`]s which the
//! orchestrator folds back in, typically through [`RelayJob::apply`].

use crate::{ChainId, DocHash, ReceiptPayload, RelayError, TxHash};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a relay job on one destination chain.
///
/// `pending -> relaying -> {confirmed | pending (retry) | failed}`. Both
/// `confirmed` and `failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayStatus {
	Pending,
	Relaying,
	Confirmed,
	Failed,
}

impl RelayStatus {
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Confirmed | Self::Failed)
	}

	/// Whether the job state machine allows moving from `self` to `next`.
	/// Re-reporting the current state is allowed.
	pub fn can_transition_to(&self, next: RelayStatus) -> bool {
		use RelayStatus::*;
		if *self == next {
			return true;
		}
		matches!(
			(self, next),
			(Pending, Relaying)
				| (Pending, Failed)
				| (Relaying, Confirmed)
				| (Relaying, Pending)
				| (Relaying, Failed)
		)
	}
}

impl fmt::Display for RelayStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::Pending => "pending",
			Self::Relaying => "relaying",
			Self::Confirmed => "confirmed",
			Self::Failed => "failed",
		};
		f.write_str(s)
	}
}

/// One unit of work: deliver this receipt to this target chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayJob {
	pub id: String,
	pub doc_hash: DocHash,
	pub target_chain: ChainId,
	pub receipt_data: ReceiptPayload,
	/// Attempts already made. Only ever increases.
	pub attempts: u32,
	pub max_attempts: u32,
	pub status: RelayStatus,
	/// Set once a relay transaction has been accepted.
	#[serde(default)]
	pub tx_hash: Option<TxHash>,
	#[serde(default)]
	pub last_error: Option<String>,
}

impl RelayJob {
	pub fn new(
		id: impl Into<String>,
		doc_hash: DocHash,
		target_chain: ChainId,
		receipt_data: ReceiptPayload,
		max_attempts: u32,
	) -> Self {
		Self {
			id: id.into(),
			doc_hash,
			target_chain,
			receipt_data,
			attempts: 0,
			max_attempts,
			status: RelayStatus::Pending,
			tx_hash: None,
			last_error: None,
		}
	}

	pub fn attempts_remaining(&self) -> u32 {
		self.max_attempts.saturating_sub(self.attempts)
	}

	/// Folds a status update into the job.
	///
	/// Rejects transitions the state machine forbids and never lets the
	/// attempt counter go backwards.
	pub fn apply(&mut self, update: &JobUpdate) -> Result<(), RelayError> {
		if !self.status.can_transition_to(update.status) {
			return Err(RelayError::InvalidTransition {
				from: self.status,
				to: update.status,
			});
		}

		self.status = update.status;
		self.attempts = self.attempts.max(update.attempts);
		if let Some(tx_hash) = update.tx_hash {
			self.tx_hash = Some(tx_hash);
		}
		if let Some(error) = &update.error {
			self.last_error = Some(error.clone());
		}
		Ok(())
	}
}

/// A state change reported by the relay service.
///
/// Mirrors the `(status, tx_hash?, error?)` callback contract, plus the
/// attempt count at the time of the update so it can be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobUpdate {
	pub status: RelayStatus,
	pub tx_hash: Option<TxHash>,
	pub error: Option<String>,
	pub attempts: u32,
}

impl JobUpdate {
	pub fn relaying(attempts: u32) -> Self {
		Self {
			status: RelayStatus::Relaying,
			tx_hash: None,
			error: None,
			attempts,
		}
	}

	pub fn confirmed(tx_hash: TxHash, attempts: u32) -> Self {
		Self {
			status: RelayStatus::Confirmed,
			tx_hash: Some(tx_hash),
			error: None,
			attempts,
		}
	}

	pub fn pending(error: impl Into<String>, attempts: u32) -> Self {
		Self {
			status: RelayStatus::Pending,
			tx_hash: None,
			error: Some(error.into()),
			attempts,
		}
	}

	pub fn failed(error: impl Into<String>, attempts: u32) -> Self {
		Self {
			status: RelayStatus::Failed,
			tx_hash: None,
			error: Some(error.into()),
			attempts,
		}
	}
}
