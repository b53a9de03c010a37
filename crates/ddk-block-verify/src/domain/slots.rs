//! # Forging Slot Arithmetic
//!
//! Time on this chain is bucketed into fixed-duration slots counted from
//! the chain epoch; each slot belongs to exactly one delegate of the
//! active round.

use shared_types::constants::{ACTIVE_DELEGATES, EPOCH_TIME_UNIX, SLOT_INTERVAL_SECS};

/// Seconds since the chain epoch for a unix time. Saturates at the epoch
/// for pre-epoch inputs.
pub fn epoch_timestamp(unix: u64) -> u32 {
    unix.saturating_sub(EPOCH_TIME_UNIX) as u32
}

/// The slot a chain timestamp falls into.
pub fn slot_number(epoch_ts: u32) -> u64 {
    u64::from(epoch_ts) / SLOT_INTERVAL_SECS
}

/// The slot in progress at a unix time.
pub fn current_slot(now_unix: u64) -> u64 {
    slot_number(epoch_timestamp(now_unix))
}

/// Which delegate of the round owns a slot.
pub fn delegate_index(slot: u64) -> u64 {
    slot % ACTIVE_DELEGATES
}

/// The chain timestamp at which a slot opens.
pub fn slot_start(slot: u64) -> u32 {
    (slot * SLOT_INTERVAL_SECS) as u32
}
