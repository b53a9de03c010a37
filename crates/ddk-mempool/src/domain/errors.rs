//! Mempool error types.

use shared_types::entities::TransactionId;
use thiserror::Error;

/// Errors from pool mutations and admission.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MempoolError {
    /// The pool is locked and the caller did not force.
    #[error("Transaction pool is locked")]
    PoolLocked,

    /// Transaction already present in the pool.
    #[error("Transaction already in pool: {0}")]
    Duplicate(TransactionId),

    /// A pending transaction from the same account orders after the
    /// candidate, or the candidate's type may not coexist with the
    /// account's pending set.
    #[error("Transaction conflicts with the account's pending set: {0}")]
    PotentialConflict(TransactionId),

    /// The ledger refused to apply the unconfirmed effects.
    #[error("Applying unconfirmed effects failed: {0}")]
    ApplyUnconfirmedFailed(String),

    /// The ledger store is unavailable.
    #[error("Store unavailable: {0}")]
    Store(String),

    /// The admission worker has shut down.
    #[error("Admission sequence closed")]
    SequenceClosed,
}

/// A reason one of the two verification phases rejected a transaction.
///
/// Rendered to strings only at the session boundary; everything inside the
/// pipeline matches on the variants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyFailure {
    /// Declared id does not match the canonical bytes.
    #[error("Invalid transaction id: {declared}")]
    IdMismatch {
        /// The id the transaction arrived with.
        declared: TransactionId,
    },

    /// Ed25519 signature does not verify against the sender key.
    #[error("Failed to verify transaction signature")]
    Signature,

    /// Second signature required but missing or invalid.
    #[error("Failed to verify second signature")]
    SecondSignature,

    /// Malformed content (bad field ranges, wrong asset shape).
    #[error("Invalid transaction body: {0}")]
    Schema(String),

    /// The transaction is already confirmed on chain.
    #[error("Transaction is already confirmed: {0}")]
    AlreadyConfirmed(TransactionId),

    /// Amount plus fee exceeds the sender's unconfirmed balance.
    #[error("Insufficient unconfirmed balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Amount plus fee being debited.
        required: u64,
        /// The sender's unconfirmed balance.
        available: u64,
    },

    /// Too many votes in one transaction.
    #[error("Vote limit exceeded: {count} > {max}")]
    VoteLimit {
        /// Votes carried by the transaction.
        count: usize,
        /// Maximum allowed per transaction.
        max: usize,
    },

    /// Stake amount would exceed what the sender can freeze.
    #[error("Frozen amount exceeds available balance: {requested} > {available}")]
    FrozenAmount {
        /// Requested stake amount.
        requested: u64,
        /// Freezable balance.
        available: u64,
    },

    /// The backing store failed mid-verification.
    #[error("Store unavailable: {0}")]
    Store(String),
}

/// Render failures for the `pool/verify` session payload.
pub fn render_failures(failures: &[VerifyFailure]) -> Vec<String> {
    failures.iter().map(ToString::to_string).collect()
}
