//! # Forging Reward Schedule
//!
//! The reward steps down through fixed milestones as the chain grows.
//! The separate freeze above `REWARD_FREEZE_HEIGHT` is enforced by the
//! verifier, not here; this module is the plain milestone table.

use shared_types::constants::{REWARD_DISTANCE, REWARD_MILESTONES, REWARD_OFFSET};

/// Milestone index for a height.
pub fn milestone(height: u64) -> usize {
    if height < REWARD_OFFSET {
        return 0;
    }
    (((height - REWARD_OFFSET) / REWARD_DISTANCE) as usize).min(REWARD_MILESTONES.len() - 1)
}

/// Expected forging reward at a height.
pub fn calc_reward(height: u64) -> u64 {
    if height < REWARD_OFFSET {
        return 0;
    }
    REWARD_MILESTONES[milestone(height)]
}
