use anyhow::{bail, Context, Result};
use clap::Parser;
use relay_config::{Config, ConfigLoader};
use relay_delivery::{profile_for, BridgeRelayService};
use relay_monitor::BridgeMonitor;
use relay_types::{ChainId, DocHash, ReceiptPayload, RelayJob, RelayStatus, TxHash};
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	setup_tracing(&args.log_level, args.json_logs)?;

	let config = load_config(args.config.as_deref()).await?;

	match args.command {
		Command::Relay {
			chain,
			doc_hash,
			receipt,
			max_attempts,
			no_wait,
		} => {
			let max_attempts = max_attempts.unwrap_or(config.relay.max_attempts);
			relay(&config, chain, doc_hash, &receipt, max_attempts, no_wait).await
		}
		Command::Status { chain, tx_hash } => status(&config, chain, tx_hash).await,
		Command::Watch {
			doc_hash,
			chain,
			tx_hash,
		} => {
			let monitor = build_monitor(&config)?;
			watch_until_final(&monitor, doc_hash, chain, tx_hash).await
		}
		Command::Validate => validate(&config),
	}
}

async fn load_config(path: Option<&Path>) -> Result<Config> {
	let mut loader = ConfigLoader::new();
	if let Some(path) = path {
		loader = loader.with_file(path);
	}
	loader.load().await.context("Failed to load configuration")
}

fn build_service(config: &Config) -> Result<Arc<BridgeRelayService>> {
	let service = BridgeRelayService::from_config(config).context("Failed to create bridge adapters")?;
	if service.chains().is_empty() {
		warn!("No chains configured; set <CHAIN>_RPC_URL and <CHAIN>_BRIDGE_ADDRESS");
	}
	Ok(Arc::new(service))
}

fn build_monitor(config: &Config) -> Result<BridgeMonitor> {
	Ok(BridgeMonitor::new(build_service(config)?).with_poll_interval(config.monitor.poll_interval()))
}

async fn relay(
	config: &Config,
	chain: ChainId,
	doc_hash: DocHash,
	receipt: &Path,
	max_attempts: u32,
	no_wait: bool,
) -> Result<()> {
	let content = tokio::fs::read_to_string(receipt)
		.await
		.with_context(|| format!("Failed to read receipt file {:?}", receipt))?;
	let payload = ReceiptPayload::from_json_str(&content).context("Receipt file is not valid JSON")?;

	let monitor = build_monitor(config)?;
	let job = RelayJob::new(
		uuid::Uuid::new_v4().to_string(),
		doc_hash,
		chain.clone(),
		payload,
		max_attempts,
	);
	info!(job_id = %job.id, chain = %chain, doc_hash = %doc_hash, max_attempts, "Relaying receipt");

	let mut tracked = job.clone();
	let result = monitor
		.service()
		.retry_relay(&job, |update| {
			info!(
				job_id = %tracked.id,
				status = %update.status,
				attempts = update.attempts,
				error = update.error.as_deref().unwrap_or(""),
				"Job update"
			);
			if let Err(e) = tracked.apply(&update) {
				warn!(job_id = %tracked.id, error = %e, "Ignoring update");
			}
		})
		.await;

	let tx_hash = match (result.success, result.tx_hash) {
		(true, Some(tx_hash)) => tx_hash,
		_ => bail!(
			"Relay to {} failed after {} attempts: {}",
			chain,
			tracked.attempts,
			result.error.unwrap_or_default()
		),
	};
	println!("{}", serde_json::to_string_pretty(&tracked)?);

	if no_wait {
		return Ok(());
	}
	watch_until_final(&monitor, doc_hash, chain, tx_hash).await
}

async fn status(config: &Config, chain: ChainId, tx_hash: TxHash) -> Result<()> {
	let service = build_service(config)?;
	if service.get_adapter(&chain).is_none() {
		bail!("No adapter for chain {}", chain);
	}

	let count = service.check_confirmations(&chain, &tx_hash).await;
	println!("{}", serde_json::to_string_pretty(&count)?);
	Ok(())
}

/// Polls until the transaction is final or a shutdown signal arrives.
async fn watch_until_final(
	monitor: &BridgeMonitor,
	doc_hash: DocHash,
	chain: ChainId,
	tx_hash: TxHash,
) -> Result<()> {
	let (tx, mut rx) = mpsc::unbounded_channel();
	let Some(key) = monitor.start_polling(doc_hash, chain.clone(), tx_hash, move |confirmations, status| {
		let _ = tx.send((confirmations, status));
	}) else {
		bail!("No adapter for chain {}", chain);
	};
	info!(key = %key, "Waiting for finality");

	let shutdown = setup_shutdown_signal();
	tokio::pin!(shutdown);

	loop {
		tokio::select! {
			update = rx.recv() => match update {
				Some((confirmations, RelayStatus::Confirmed)) => {
					info!(chain = %chain, confirmations, "Relay transaction is final");
					break;
				}
				Some((confirmations, status)) => {
					info!(chain = %chain, confirmations, status = %status, "Confirmation update");
				}
				None => break,
			},
			_ = &mut shutdown => {
				info!("Shutdown signal received, stopping pollers");
				break;
			}
		}
	}

	monitor.stop_all_polling();
	Ok(())
}

fn validate(config: &Config) -> Result<()> {
	info!("Configuration is valid");
	info!(
		max_attempts = config.relay.max_attempts,
		backoff_ms = ?config.relay.backoff_ms,
		poll_interval_secs = config.monitor.poll_interval_secs,
		signing_key = config.signer.private_key.is_some(),
		"Relay settings"
	);

	let mut chains: Vec<_> = config.chains.iter().collect();
	chains.sort_by(|a, b| a.0.cmp(b.0));
	for (chain, chain_config) in chains {
		let required = profile_for(chain).map(|p| p.required_confirmations).unwrap_or_default();
		info!(
			chain = %chain,
			rpc_url = %chain_config.rpc_url,
			bridge = %chain_config.bridge_address,
			required_confirmations = required,
			"Configured chain"
		);
	}
	Ok(())
}

fn setup_tracing(log_level: &str, json: bool) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))
		.context("Invalid log level")?;

	let registry = tracing_subscriber::registry().with(env_filter);
	let initialized = if json {
		registry
			.with(tracing_subscriber::fmt::layer().json())
			.try_init()
	} else {
		registry.with(tracing_subscriber::fmt::layer()).try_init()
	};
	initialized.context("Failed to initialize tracing")?;

	Ok(())
}

async fn setup_shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			error!("Failed to listen for Ctrl+C: {}", e);
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			}
			Err(e) => {
				error!("Failed to install SIGTERM handler: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
