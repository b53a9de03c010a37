//! Outbound (Driven) ports for block processing.
//!
//! Block processing touches three neighbors: the delegates module (slot
//! ownership and fork accounting), the block repository (persistence and
//! confirmed-transaction lookups), and the mempool (the feedback edge that
//! removes applied transactions).

use crate::domain::ForkCause;
use crate::error::ProcessBlockError;
use async_trait::async_trait;
use shared_types::entities::{Block, BlockId, TransactionId};

/// The delegates module: slot validation and fork signals.
#[async_trait]
pub trait DelegatesPort: Send + Sync {
    /// Whether the block's generator owns the slot its timestamp falls in.
    async fn validate_block_slot(&self, block: &Block) -> std::result::Result<bool, ProcessBlockError>;

    /// Record a fork signal. Fire-and-forget accounting, not recovery.
    async fn fork(&self, block: &Block, cause: ForkCause);
}

/// Persistence for blocks and confirmed transactions.
#[async_trait]
pub trait BlockRepository: Send + Sync {
    /// Whether a block id is already stored.
    async fn exists(&self, id: &BlockId) -> std::result::Result<bool, ProcessBlockError>;

    /// Whether a transaction id is confirmed on chain.
    async fn is_transaction_confirmed(
        &self,
        id: &TransactionId,
    ) -> std::result::Result<bool, ProcessBlockError>;

    /// Apply the block's state transitions; with `save`, persist it too.
    async fn apply_block(
        &self,
        block: &Block,
        save: bool,
    ) -> std::result::Result<(), ProcessBlockError>;
}

/// The mempool feedback edge.
#[async_trait]
pub trait MempoolPort: Send + Sync {
    /// Gate admission while a block is being applied.
    fn lock(&self);

    /// Re-open admission and restart the queue.
    fn unlock(&self);

    /// Undo unconfirmed effects and drop the transaction from the pool.
    /// Returns whether it was present.
    async fn remove_transaction(&self, id: TransactionId) -> bool;

    /// Drain the conflicted queue back into admission.
    fn reshuffle(&self);
}
