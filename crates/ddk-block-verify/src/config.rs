//! Block verification configuration.

use shared_types::constants::MASTER_NODE_MIGRATED_BLOCK;
use shared_types::entities::BlockId;

/// Chain-history parameters for the verifier.
///
/// Defaults mirror mainnet; tests lower the migration height to zero so
/// every check is live from the first block.
#[derive(Clone, Debug)]
pub struct VerifyConfig {
    /// Height of the masternode migration. Blocks at or below it are
    /// accepted under the relaxed pre-migration rules.
    pub master_node_migrated_block: u64,
    /// Historical blocks whose reward deviates from the schedule and is
    /// accepted anyway.
    pub reward_exceptions: Vec<BlockId>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            master_node_migrated_block: MASTER_NODE_MIGRATED_BLOCK,
            reward_exceptions: Vec::new(),
        }
    }
}

impl VerifyConfig {
    /// Config for tests: no pre-migration relaxations, no exceptions.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            master_node_migrated_block: 0,
            reward_exceptions: Vec::new(),
        }
    }
}
