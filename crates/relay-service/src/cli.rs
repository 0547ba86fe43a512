//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use relay_types::{ChainId, DocHash, TxHash};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "receipt-relay")]
#[command(about = "Relays document receipts to destination chains", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
	/// Path to configuration file (TOML, JSON or YAML)
	#[arg(short, long, global = true, env = "RELAY_CONFIG")]
	pub config: Option<PathBuf>,

	/// Log level used when RUST_LOG is unset (trace, debug, info, warn, error)
	#[arg(short, long, global = true, env = "RELAY_LOG_LEVEL", default_value = "info")]
	pub log_level: String,

	/// Emit logs as JSON lines
	#[arg(long, global = true)]
	pub json_logs: bool,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Relay a receipt to one chain, retrying with backoff
	Relay {
		#[arg(long)]
		chain: ChainId,

		/// Document hash (0x-prefixed, 32 bytes)
		#[arg(long)]
		doc_hash: DocHash,

		/// JSON file holding the receipt payload
		#[arg(long)]
		receipt: PathBuf,

		/// Overrides relay.max_attempts from the configuration
		#[arg(long)]
		max_attempts: Option<u32>,

		/// Exit once the transaction is accepted instead of waiting for finality
		#[arg(long)]
		no_wait: bool,
	},

	/// Show the confirmation count of a relay transaction
	Status {
		#[arg(long)]
		chain: ChainId,

		#[arg(long)]
		tx_hash: TxHash,
	},

	/// Poll a relay transaction until it is final
	Watch {
		#[arg(long)]
		doc_hash: DocHash,

		#[arg(long)]
		chain: ChainId,

		#[arg(long)]
		tx_hash: TxHash,
	},

	/// Validate the configuration and list the configured chains
	Validate,
}
