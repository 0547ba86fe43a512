//! Shared types for the cross-chain receipt relay.
//!
//! This crate defines the data model exchanged between the relay service, the
//! bridge monitor and the external orchestrator that persists relay jobs:
//! chain identifiers, relay jobs and their status updates, per-chain and
//! cross-chain status snapshots, the receipt payload encoding and the error
//! taxonomy.

pub mod chains;
pub mod errors;
pub mod job;
pub mod payload;
pub mod status;

pub use chains::*;
pub use errors::*;
pub use job::*;
pub use payload::*;
pub use status::*;

pub use alloy::primitives::{Address, Bytes, B256};

/// Content hash identifying a receipt; the cross-chain correlation key.
pub type DocHash = B256;

/// Hash of a relay transaction on a destination chain.
pub type TxHash = B256;
