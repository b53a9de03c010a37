//! Error types for block processing.

use shared_types::entities::{BlockId, TransactionId};
use thiserror::Error;

/// Result type alias for block processing operations.
pub type Result<T> = std::result::Result<T, ProcessBlockError>;

/// Errors that reject a block before it mutates ledger state.
#[derive(Debug, Error)]
pub enum ProcessBlockError {
    /// The verification pipeline found problems.
    #[error("Block verification failed: {}", errors.join("; "))]
    Verification {
        /// Findings from the check pipeline.
        errors: Vec<String>,
    },

    /// The block id already exists in the repository.
    #[error("Block already processed: {0}")]
    AlreadyProcessed(BlockId),

    /// The forging delegate does not own the block's slot (fork type 3).
    #[error("Invalid slot delegate for block: {0}")]
    InvalidSlotDelegate(BlockId),

    /// The block carries a transaction already confirmed on chain
    /// (fork type 2).
    #[error("Transaction is already confirmed: {0}")]
    DuplicateConfirmedTransaction(TransactionId),

    /// The block repository failed.
    #[error("Repository error: {0}")]
    Repository(String),
}

impl ProcessBlockError {
    /// Whether the block itself is at fault, as opposed to node-local
    /// infrastructure.
    pub fn is_block_fault(&self) -> bool {
        !matches!(self, Self::Repository(_))
    }
}
