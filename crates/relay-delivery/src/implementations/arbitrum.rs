//! Arbitrum One.

use super::ChainProfile;
use relay_types::ARBITRUM;

/// Nitro execution costs more L2 gas per call than L1-style chains, hence
/// the larger budget.
pub const PROFILE: ChainProfile = ChainProfile {
	name: ARBITRUM,
	required_confirmations: 20,
	gas_limit: 1_000_000,
};
