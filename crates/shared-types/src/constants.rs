//! # Consensus Constants
//!
//! Chain parameters shared by admission and block verification. Everything
//! in this module is consensus-visible: operators audit this one file, and
//! any change splits the network.

/// Maximum transactions packed into one block.
pub const MAX_TXS_PER_BLOCK: usize = 25;

/// Maximum transactions returned by a shared pool query.
pub const MAX_SHARED_TXS: usize = 100;

/// Maximum block payload size in bytes.
pub const MAX_PAYLOAD_LENGTH: u32 = 1024 * 1024;

/// Receipt window, in slots, inside which a relayed block is acceptable.
/// Also the capacity of the recent-block-id ring.
pub const BLOCK_SLOT_WINDOW: u64 = 5;

/// Seconds a conflicted transaction may wait before the reshuffle sweep
/// drops it.
pub const TRANSACTION_QUEUE_EXPIRE_SECS: u64 = 300;

/// Height of the masternode migration. Blocks at or below this height are
/// accepted under the pre-migration rules: signature failures are tolerated
/// and payload count/hash/sum mismatches are not errors.
pub const MASTER_NODE_MIGRATED_BLOCK: u64 = 14_250_000;

/// Number of forging delegates per round.
pub const ACTIVE_DELEGATES: u64 = 11;

/// Seconds per forging slot.
pub const SLOT_INTERVAL_SECS: u64 = 10;

/// Chain epoch: 2016-01-01T00:00:00Z, unix seconds. Transaction and block
/// timestamps count seconds from this instant.
pub const EPOCH_TIME_UNIX: u64 = 1_451_606_400;

/// Block format version produced by current nodes.
pub const CURRENT_BLOCK_VERSION: u32 = 1;

/// Height above which the forging reward is frozen to zero.
pub const REWARD_FREEZE_HEIGHT: u64 = 21_000_000;

/// Forging reward milestones in base units (1 DDK = 10^8).
pub const REWARD_MILESTONES: [u64; 5] = [
    5_0000_0000, // initial
    4_0000_0000,
    3_0000_0000,
    2_0000_0000,
    1_0000_0000, // final, until the freeze height
];

/// Height at which rewards start.
pub const REWARD_OFFSET: u64 = 100;

/// Blocks between reward milestones.
pub const REWARD_DISTANCE: u64 = 3_000_000;
