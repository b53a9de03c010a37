//! Mempool configuration.

use shared_types::constants::{MAX_SHARED_TXS, TRANSACTION_QUEUE_EXPIRE_SECS};
use shared_types::sequence::DEFAULT_WARNING_LIMIT;

/// Runtime knobs for the admission pipeline.
///
/// Consensus parameters stay in `shared_types::constants`; everything here
/// is node-local tuning.
#[derive(Clone, Debug)]
pub struct MempoolConfig {
    /// Cap for shared pool queries.
    pub max_shared_txs: usize,
    /// Seconds a conflicted transaction may wait before expiring.
    pub queue_expire_secs: u64,
    /// Sequence depth at which the overload warning fires.
    pub sequence_warning_limit: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_shared_txs: MAX_SHARED_TXS,
            queue_expire_secs: TRANSACTION_QUEUE_EXPIRE_SECS,
            sequence_warning_limit: DEFAULT_WARNING_LIMIT,
        }
    }
}

impl MempoolConfig {
    /// Creates a minimal config for testing.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            max_shared_txs: 10,
            queue_expire_secs: 60,
            sequence_warning_limit: 4,
        }
    }
}
