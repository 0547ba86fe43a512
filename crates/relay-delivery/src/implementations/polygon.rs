//! Polygon PoS.

use super::ChainProfile;
use relay_types::POLYGON;

/// Polygon PoS has seen deep reorgs; wait 128 blocks.
pub const PROFILE: ChainProfile = ChainProfile {
	name: POLYGON,
	required_confirmations: 128,
	gas_limit: 500_000,
};
