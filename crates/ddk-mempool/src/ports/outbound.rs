//! Outbound (Driven) ports for the mempool.
//!
//! These traits define what the admission pipeline needs from the rest of
//! the node: the ledger's transaction logic, the accounts store, and a time
//! source. Every `await` on them is a yield boundary of the admission
//! cycle.

use crate::domain::{MempoolError, VerifyFailure};
use async_trait::async_trait;
use shared_types::entities::{Account, Address, PublicKey, Transaction};

/// The ledger's transaction logic: verification phases and unconfirmed
/// state application.
#[async_trait]
pub trait TransactionLogic: Send + Sync {
    /// Phase 1: content verification. Covers id derivation, signature, shape,
    /// and (when `check_exists`) that the transaction is not already
    /// confirmed.
    async fn verify_new(
        &self,
        trs: &Transaction,
        sender: &Account,
        check_exists: bool,
    ) -> Result<(), Vec<VerifyFailure>>;

    /// Phase 2: state verification against the sender's unconfirmed
    /// balance, vote limits and frozen-amount rules.
    async fn verify_unconfirmed(
        &self,
        trs: &Transaction,
        sender: &Account,
    ) -> Result<(), Vec<VerifyFailure>>;

    /// Debit the transaction's effects from the sender's unconfirmed
    /// balance.
    async fn apply_unconfirmed(&self, trs: &Transaction) -> Result<(), MempoolError>;

    /// Credit the transaction's effects back. Must tolerate being called
    /// for effects that were never applied.
    async fn undo_unconfirmed(&self, trs: &Transaction) -> Result<(), MempoolError>;
}

/// The accounts store.
#[async_trait]
pub trait AccountsRepo: Send + Sync {
    /// Fetch the account for a public key, creating an empty one when the
    /// key has never been seen.
    async fn get_or_create(&self, public_key: &PublicKey) -> Result<Account, MempoolError>;

    /// Fetch an account by address.
    async fn by_address(&self, address: Address) -> Result<Option<Account>, MempoolError>;
}

/// Time source for conflicted-queue deadlines.
///
/// Abstracted so expiry behavior is testable with a clock that does not
/// move on its own.
pub trait TimeSource: Send + Sync {
    /// Current unix time in seconds.
    fn now_unix(&self) -> u64;
}

/// Default wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_unix(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}
