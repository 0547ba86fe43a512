//! Delivery status tracking for relayed receipts.
//!
//! [`BridgeMonitor`] turns confirmation counts into per-chain status
//! snapshots, aggregates them per document and runs background pollers that
//! follow a relay transaction until it is final.

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use relay_delivery::BridgeRelayService;
use relay_types::{
	ChainId, ChainStatus, CrossChainStatus, DocHash, OverallStatus, RelayError, RelayJob,
	RelayStatus, TxHash,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

type PollerMap = DashMap<String, JoinHandle<()>>;

/// Registry key of the poller for one document on one chain.
pub fn polling_key(doc_hash: &DocHash, chain: &ChainId) -> String {
	format!("{:#x}-{}", doc_hash, chain)
}

/// Folds per-chain statuses into the document's overall status.
///
/// Depends only on the multiset of statuses, not their order.
pub fn aggregate_overall_status<'a>(
	statuses: impl IntoIterator<Item = &'a RelayStatus>,
) -> OverallStatus {
	let mut total = 0usize;
	let mut confirmed = 0usize;
	let mut failed = 0usize;
	for status in statuses {
		total += 1;
		match status {
			RelayStatus::Confirmed => confirmed += 1,
			RelayStatus::Failed => failed += 1,
			_ => {}
		}
	}

	if total == 0 {
		OverallStatus::Pending
	} else if failed == total {
		OverallStatus::Failed
	} else if confirmed == total {
		OverallStatus::Complete
	} else if confirmed > 0 {
		OverallStatus::Partial
	} else {
		OverallStatus::Pending
	}
}

pub struct BridgeMonitor {
	/// Relay service whose adapters answer confirmation queries.
	service: Arc<BridgeRelayService>,
	/// Delay between poller ticks.
	poll_interval: Duration,
	/// Running pollers keyed by [`polling_key`].
	pollers: Arc<PollerMap>,
}

impl BridgeMonitor {
	pub fn new(service: Arc<BridgeRelayService>) -> Self {
		Self {
			service,
			poll_interval: DEFAULT_POLL_INTERVAL,
			pollers: Arc::new(DashMap::new()),
		}
	}

	pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
		self.poll_interval = poll_interval;
		self
	}

	pub fn service(&self) -> &Arc<BridgeRelayService> {
		&self.service
	}

	/// Snapshot of one job's delivery on `chain`.
	///
	/// Jobs without a transaction, or still `pending` / already `failed`,
	/// are reported as-is without touching the chain.
	pub async fn get_chain_status(
		&self,
		chain: &ChainId,
		tx_hash: Option<TxHash>,
		current_status: RelayStatus,
	) -> ChainStatus {
		let required = self
			.service
			.get_adapter(chain)
			.map(|adapter| adapter.required_confirmations())
			.unwrap_or_default();
		let mut snapshot = ChainStatus {
			chain: chain.clone(),
			tx_hash,
			confirmations: 0,
			required_confirmations: required,
			status: current_status,
			last_error: None,
			updated_at: Utc::now(),
		};

		let Some(tx_hash) = tx_hash else {
			return snapshot;
		};
		if matches!(current_status, RelayStatus::Pending | RelayStatus::Failed) {
			return snapshot;
		}

		match self.service.query_confirmations(chain, &tx_hash).await {
			Ok(count) => {
				snapshot.confirmations = count.confirmations;
				snapshot.required_confirmations = count.required;
				snapshot.status = if count.is_final() {
					RelayStatus::Confirmed
				} else {
					RelayStatus::Relaying
				};
			}
			Err(e) => {
				debug!(chain = %chain, tx_hash = %tx_hash, error = %e, "Status query failed");
				snapshot.status = RelayStatus::Failed;
				snapshot.last_error = Some(e.to_string());
			}
		}
		snapshot.updated_at = Utc::now();
		snapshot
	}

	/// Status of every job relaying `doc_hash`, in job order. Chains are
	/// queried concurrently.
	pub async fn get_cross_chain_status(
		&self,
		doc_hash: &DocHash,
		jobs: &[RelayJob],
	) -> CrossChainStatus {
		let jobs: Vec<&RelayJob> = jobs.iter().filter(|job| job.doc_hash == *doc_hash).collect();

		let snapshots = join_all(
			jobs.iter()
				.map(|job| self.get_chain_status(&job.target_chain, job.tx_hash, job.status)),
		)
		.await;

		let chains: Vec<ChainStatus> = snapshots
			.into_iter()
			.zip(jobs)
			.map(|(mut snapshot, job)| {
				if snapshot.last_error.is_none() {
					snapshot.last_error = job.last_error.clone();
				}
				snapshot
			})
			.collect();

		let overall_status = aggregate_overall_status(chains.iter().map(|c| &c.status));
		CrossChainStatus {
			doc_hash: *doc_hash,
			chains,
			overall_status,
		}
	}

	/// Polls confirmations of `tx_hash` on `chain` until it is final.
	///
	/// The first check runs immediately, then once per poll interval; every
	/// check is reported through `on_update`. At most one poller runs per
	/// document and chain; starting an existing one is a no-op. Returns the
	/// poller key, or `None` when no adapter serves `chain`.
	pub fn start_polling<F>(
		&self,
		doc_hash: DocHash,
		chain: ChainId,
		tx_hash: TxHash,
		mut on_update: F,
	) -> Option<String>
	where
		F: FnMut(u64, RelayStatus) + Send + 'static,
	{
		let key = polling_key(&doc_hash, &chain);
		if self.service.get_adapter(&chain).is_none() {
			warn!(key = %key, "{}, not polling", RelayError::ChainNotSupported(chain));
			return None;
		}

		let entry = match self.pollers.entry(key.clone()) {
			Entry::Occupied(existing) if !existing.get().is_finished() => {
				debug!(key = %key, "Already polling");
				return Some(key);
			}
			entry => entry,
		};

		let service = self.service.clone();
		let pollers = self.pollers.clone();
		let poll_interval = self.poll_interval;
		let task_key = key.clone();

		let handle = tokio::spawn(async move {
			let mut ticker = interval(poll_interval);
			let mut highest_seen = 0u64;

			loop {
				ticker.tick().await;

				let count = service.check_confirmations(&chain, &tx_hash).await;
				if count.confirmations < highest_seen {
					warn!(
						key = %task_key,
						previous = highest_seen,
						current = count.confirmations,
						"Confirmation count went backwards, possible reorg"
					);
				}
				highest_seen = highest_seen.max(count.confirmations);

				let finished = count.is_final();
				let status = if finished {
					RelayStatus::Confirmed
				} else {
					RelayStatus::Relaying
				};
				on_update(count.confirmations, status);

				if finished {
					info!(
						key = %task_key,
						confirmations = count.confirmations,
						required = count.required,
						"Relay final, polling stopped"
					);
					break;
				}
			}

			let own_id = tokio::task::id();
			pollers.remove_if(&task_key, |_, handle| handle.id() == own_id);
		});

		debug!(key = %key, interval_secs = poll_interval.as_secs(), "Started polling");
		entry.insert(handle);
		Some(key)
	}

	pub fn stop_polling(&self, key: &str) -> bool {
		match self.pollers.remove(key) {
			Some((_, handle)) => {
				handle.abort();
				debug!(key = %key, "Stopped polling");
				true
			}
			None => false,
		}
	}

	pub fn stop_all_polling(&self) {
		let keys: Vec<String> = self.pollers.iter().map(|e| e.key().clone()).collect();
		for key in &keys {
			self.stop_polling(key);
		}
		if !keys.is_empty() {
			info!(count = keys.len(), "Stopped all pollers");
		}
	}

	/// Keys of pollers that are still running.
	pub fn active_pollers(&self) -> Vec<String> {
		let mut keys: Vec<String> = self
			.pollers
			.iter()
			.filter(|e| !e.value().is_finished())
			.map(|e| e.key().clone())
			.collect();
		keys.sort();
		keys
	}

	pub fn is_polling(&self, key: &str) -> bool {
		self.pollers
			.get(key)
			.map(|handle| !handle.is_finished())
			.unwrap_or(false)
	}
}

impl Drop for BridgeMonitor {
	fn drop(&mut self) {
		for entry in self.pollers.iter() {
			entry.value().abort();
		}
	}
}
