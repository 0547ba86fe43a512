//! OP Mainnet.

use super::ChainProfile;
use relay_types::OPTIMISM;

/// 2s blocks; 50 confirmations is roughly 100 seconds.
pub const PROFILE: ChainProfile = ChainProfile {
	name: OPTIMISM,
	required_confirmations: 50,
	gas_limit: 500_000,
};
