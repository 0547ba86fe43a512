//! Receipt delivery to destination chains.
//!
//! [`BridgeAdapter`] is the per-chain seam: submit a receipt, count
//! confirmations. [`BridgeRelayService`] owns one adapter per chain and adds
//! timeouts, retry with backoff and the status callbacks the orchestrator
//! persists.

pub mod implementations;
pub mod retry;

pub use implementations::{create_adapter, create_adapters, profile_for, ChainProfile};
pub use retry::RetryPolicy;

use async_trait::async_trait;
use relay_config::Config;
use relay_types::{
	ChainId, ConfirmationCount, DocHash, JobUpdate, ReceiptPayload, RelayError, RelayJob,
	RelayResult, RelayStatus, TxHash,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

const DEFAULT_RELAY_TIMEOUT: Duration = Duration::from_secs(180);
const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(15);

/// Chain-specific relay capability.
#[async_trait]
pub trait BridgeAdapter: Send + Sync {
	fn chain(&self) -> &ChainId;

	/// Confirmations after which a relay on this chain is final. Constant
	/// for the lifetime of the adapter.
	fn required_confirmations(&self) -> u64;

	/// Submits the receipt and returns the transaction hash once it has been
	/// accepted on chain.
	async fn relay_receipt(
		&self,
		doc_hash: &DocHash,
		receipt_data: &ReceiptPayload,
	) -> Result<TxHash, RelayError>;

	/// Current confirmation depth; 0 for unknown or unmined transactions.
	async fn get_confirmations(&self, tx_hash: &TxHash) -> Result<u64, RelayError>;
}

/// Relays receipts through the registered adapters.
///
/// The adapter registry is fixed at construction, so the service can be
/// shared freely behind an `Arc`.
pub struct BridgeRelayService {
	/// Registered adapters keyed by their chain.
	adapters: HashMap<ChainId, Arc<dyn BridgeAdapter>>,
	/// Backoff applied between relay attempts.
	retry_policy: RetryPolicy,
	/// Upper bound on one relay submission, including its first confirmation.
	relay_timeout: Duration,
	/// Upper bound on one confirmation query.
	rpc_timeout: Duration,
}

impl BridgeRelayService {
	pub fn new(adapters: impl IntoIterator<Item = Arc<dyn BridgeAdapter>>) -> Self {
		let adapters = adapters
			.into_iter()
			.map(|adapter| (adapter.chain().clone(), adapter))
			.collect();

		Self {
			adapters,
			retry_policy: RetryPolicy::default(),
			relay_timeout: DEFAULT_RELAY_TIMEOUT,
			rpc_timeout: DEFAULT_RPC_TIMEOUT,
		}
	}

	/// Builds adapters for every configured chain and applies the relay
	/// settings.
	pub fn from_config(config: &Config) -> Result<Self, RelayError> {
		let adapters = create_adapters(config)?;
		info!(chains = adapters.len(), "Registered bridge adapters");

		Ok(Self::new(adapters)
			.with_retry_policy(RetryPolicy::new(config.relay.backoff_schedule()))
			.with_timeouts(config.relay.relay_timeout(), config.relay.rpc_timeout()))
	}

	pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
		self.retry_policy = retry_policy;
		self
	}

	pub fn with_timeouts(mut self, relay_timeout: Duration, rpc_timeout: Duration) -> Self {
		self.relay_timeout = relay_timeout;
		self.rpc_timeout = rpc_timeout;
		self
	}

	pub fn get_adapter(&self, chain: &ChainId) -> Option<Arc<dyn BridgeAdapter>> {
		self.adapters.get(chain).cloned()
	}

	pub fn chains(&self) -> Vec<ChainId> {
		let mut chains: Vec<_> = self.adapters.keys().cloned().collect();
		chains.sort();
		chains
	}

	async fn submit(
		&self,
		adapter: &dyn BridgeAdapter,
		doc_hash: &DocHash,
		receipt_data: &ReceiptPayload,
	) -> Result<TxHash, RelayError> {
		match timeout(self.relay_timeout, adapter.relay_receipt(doc_hash, receipt_data)).await {
			Ok(result) => result,
			Err(_) => Err(RelayError::Timeout {
				chain: adapter.chain().clone(),
				operation: "relay",
				timeout_secs: self.relay_timeout.as_secs(),
			}),
		}
	}

	/// Makes a single relay attempt. Failures are reported in the result.
	#[instrument(skip_all, fields(doc_hash = %doc_hash, chain = %target_chain))]
	pub async fn relay_receipt(
		&self,
		doc_hash: &DocHash,
		target_chain: &ChainId,
		receipt_data: &ReceiptPayload,
		attempt_number: u32,
	) -> RelayResult {
		let Some(adapter) = self.adapters.get(target_chain) else {
			warn!(chain = %target_chain, "No adapter registered");
			return RelayResult::failed(RelayError::ChainNotSupported(target_chain.clone()).to_string());
		};

		debug!(chain = %target_chain, attempt = attempt_number, "Relaying receipt");
		match self.submit(adapter.as_ref(), doc_hash, receipt_data).await {
			Ok(tx_hash) => {
				info!(chain = %target_chain, attempt = attempt_number, tx_hash = %tx_hash, "Receipt relayed");
				RelayResult::succeeded(tx_hash)
			}
			Err(e) => {
				warn!(chain = %target_chain, attempt = attempt_number, error = %e, "Relay attempt failed");
				RelayResult::failed(e.to_string())
			}
		}
	}

	/// Drives a job to a terminal state, reporting every transition through
	/// `on_update`.
	///
	/// Attempts continue from `job.attempts` up to `job.max_attempts`, with a
	/// backoff sleep before every attempt except a fresh job's first.
	/// Non-retryable errors end the job immediately. Jobs that are already
	/// `confirmed` or `failed` are never resubmitted.
	#[instrument(skip_all, fields(job_id = %job.id, chain = %job.target_chain))]
	pub async fn retry_relay<F>(&self, job: &RelayJob, mut on_update: F) -> RelayResult
	where
		F: FnMut(JobUpdate) + Send,
	{
		if job.status == RelayStatus::Confirmed {
			debug!("Job already confirmed");
			return RelayResult {
				success: true,
				tx_hash: job.tx_hash,
				error: None,
				confirmations: None,
			};
		}

		if job.status == RelayStatus::Failed {
			debug!("Job already failed");
			let message = job
				.last_error
				.clone()
				.unwrap_or_else(|| format!("Job {} already failed", job.id));
			return RelayResult::failed(message);
		}

		if job.attempts >= job.max_attempts {
			let message = job
				.last_error
				.clone()
				.unwrap_or_else(|| format!("No attempts left ({} of {})", job.attempts, job.max_attempts));
			warn!(attempts = job.attempts, "Job has no attempts left");
			on_update(JobUpdate::failed(message.clone(), job.attempts));
			return RelayResult::failed(message);
		}

		let Some(adapter) = self.adapters.get(&job.target_chain) else {
			let message = RelayError::ChainNotSupported(job.target_chain.clone()).to_string();
			error!("{}", message);
			on_update(JobUpdate::failed(message.clone(), job.attempts));
			return RelayResult::failed(message);
		};

		let mut attempts = job.attempts;
		loop {
			if let Some(delay) = self.retry_policy.delay_before(attempts) {
				debug!(delay_ms = delay.as_millis() as u64, "Backing off before retry");
				tokio::time::sleep(delay).await;
			}

			attempts += 1;
			on_update(JobUpdate::relaying(attempts));

			let error = match self.submit(adapter.as_ref(), &job.doc_hash, &job.receipt_data).await {
				Ok(tx_hash) => {
					info!(attempt = attempts, tx_hash = %tx_hash, "Receipt relayed");
					on_update(JobUpdate::confirmed(tx_hash, attempts));
					return RelayResult::succeeded(tx_hash);
				}
				Err(e) => e,
			};

			let message = error.to_string();
			if error.is_retryable() && attempts < job.max_attempts {
				warn!(attempt = attempts, max_attempts = job.max_attempts, error = %message, "Relay attempt failed, will retry");
				on_update(JobUpdate::pending(message, attempts));
				continue;
			}

			error!(attempt = attempts, error = %message, "Relay failed");
			on_update(JobUpdate::failed(message.clone(), attempts));
			return RelayResult::failed(message);
		}
	}

	/// Confirmation depth and threshold of a relay transaction.
	pub async fn query_confirmations(
		&self,
		chain: &ChainId,
		tx_hash: &TxHash,
	) -> Result<ConfirmationCount, RelayError> {
		let adapter = self
			.adapters
			.get(chain)
			.ok_or_else(|| RelayError::ChainNotSupported(chain.clone()))?;
		let required = adapter.required_confirmations();

		let confirmations = match timeout(self.rpc_timeout, adapter.get_confirmations(tx_hash)).await {
			Ok(result) => result?,
			Err(_) => {
				return Err(RelayError::Timeout {
					chain: chain.clone(),
					operation: "confirmation query",
					timeout_secs: self.rpc_timeout.as_secs(),
				})
			}
		};

		Ok(ConfirmationCount::new(confirmations, required))
	}

	/// Like [`query_confirmations`](Self::query_confirmations), but never
	/// fails: an unknown chain reads as `(0, 0)` and a failed query as
	/// `(0, required)`.
	pub async fn check_confirmations(&self, chain: &ChainId, tx_hash: &TxHash) -> ConfirmationCount {
		match self.query_confirmations(chain, tx_hash).await {
			Ok(count) => count,
			Err(RelayError::ChainNotSupported(_)) => ConfirmationCount::default(),
			Err(e) => {
				warn!(chain = %chain, tx_hash = %tx_hash, error = %e, "Confirmation query failed");
				let required = self
					.adapters
					.get(chain)
					.map(|adapter| adapter.required_confirmations())
					.unwrap_or_default();
				ConfirmationCount::new(0, required)
			}
		}
	}
}
