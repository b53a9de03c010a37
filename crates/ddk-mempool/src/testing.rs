//! In-memory port implementations for tests.
//!
//! Shared by this crate's unit tests and the workspace integration tests,
//! so it is a public module rather than `#[cfg(test)]`. Nothing here is
//! reachable from production wiring.

use crate::domain::{MempoolError, VerifyFailure};
use crate::ports::{AccountsRepo, TimeSource, TransactionLogic};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::entities::{
    Account, Address, PublicKey, Transaction, TransactionAsset, TransactionId, TransactionType,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Maximum votes one transaction may carry.
pub const MAX_VOTES_PER_TRANSACTION: usize = 33;

/// An in-memory ledger: accounts plus unconfirmed effects.
///
/// Implements both [`TransactionLogic`] and [`AccountsRepo`], which is what
/// the real node splits across the crypto layer and the accounts store.
#[derive(Default)]
pub struct InMemoryLedger {
    accounts: RwLock<HashMap<Address, Account>>,
    confirmed: RwLock<HashSet<TransactionId>>,
    fail_next_apply: AtomicBool,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or top up an account with a confirmed + unconfirmed balance.
    pub fn credit(&self, public_key: &PublicKey, amount: u64) {
        let address = Address::from_public_key(public_key);
        let mut accounts = self.accounts.write();
        let account = accounts.entry(address).or_insert_with(|| Account {
            address,
            public_key: Some(*public_key),
            ..Account::default()
        });
        account.balance += amount;
        account.unconfirmed_balance += amount;
    }

    /// Mark a transaction as confirmed on chain.
    pub fn mark_confirmed(&self, id: TransactionId) {
        self.confirmed.write().insert(id);
    }

    /// Whether a transaction id is confirmed.
    pub fn is_confirmed(&self, id: &TransactionId) -> bool {
        self.confirmed.read().contains(id)
    }

    /// Make the next `apply_unconfirmed` fail.
    pub fn fail_next_apply(&self) {
        self.fail_next_apply.store(true, Ordering::SeqCst);
    }

    /// Snapshot of an account, if it exists.
    pub fn account(&self, address: Address) -> Option<Account> {
        self.accounts.read().get(&address).cloned()
    }

    fn unconfirmed_balance(&self, address: Address) -> u64 {
        self.accounts
            .read()
            .get(&address)
            .map_or(0, |account| account.unconfirmed_balance)
    }
}

#[async_trait]
impl TransactionLogic for InMemoryLedger {
    async fn verify_new(
        &self,
        trs: &Transaction,
        _sender: &Account,
        check_exists: bool,
    ) -> Result<(), Vec<VerifyFailure>> {
        let mut failures = Vec::new();
        if trs.id != trs.compute_id() {
            failures.push(VerifyFailure::IdMismatch { declared: trs.id });
        }
        if !trs.verify_signature() {
            failures.push(VerifyFailure::Signature);
        }
        if trs.tx_type == TransactionType::Send && trs.recipient_address.is_none() {
            failures.push(VerifyFailure::Schema("Send without recipient".into()));
        }
        if check_exists && self.is_confirmed(&trs.id) {
            failures.push(VerifyFailure::AlreadyConfirmed(trs.id));
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }

    async fn verify_unconfirmed(
        &self,
        trs: &Transaction,
        sender: &Account,
    ) -> Result<(), Vec<VerifyFailure>> {
        // The account snapshot may be stale; check live unconfirmed state.
        let available = self.unconfirmed_balance(sender.address);
        let required = trs.total_debit();
        if required > available {
            return Err(vec![VerifyFailure::InsufficientBalance {
                required,
                available,
            }]);
        }
        if let TransactionAsset::Votes { votes } = &trs.asset {
            if votes.len() > MAX_VOTES_PER_TRANSACTION {
                return Err(vec![VerifyFailure::VoteLimit {
                    count: votes.len(),
                    max: MAX_VOTES_PER_TRANSACTION,
                }]);
            }
        }
        if let TransactionAsset::Stake { amount } = trs.asset {
            let freezable = available.saturating_sub(trs.fee);
            if amount > freezable {
                return Err(vec![VerifyFailure::FrozenAmount {
                    requested: amount,
                    available: freezable,
                }]);
            }
        }
        Ok(())
    }

    async fn apply_unconfirmed(&self, trs: &Transaction) -> Result<(), MempoolError> {
        if self.fail_next_apply.swap(false, Ordering::SeqCst) {
            return Err(MempoolError::ApplyUnconfirmedFailed(
                "scripted failure".into(),
            ));
        }
        let mut accounts = self.accounts.write();
        let account = accounts
            .get_mut(&trs.sender_address)
            .ok_or_else(|| MempoolError::ApplyUnconfirmedFailed("unknown sender".into()))?;
        let debit = trs.total_debit();
        if account.unconfirmed_balance < debit {
            return Err(MempoolError::ApplyUnconfirmedFailed(format!(
                "unconfirmed balance {} below {}",
                account.unconfirmed_balance, debit
            )));
        }
        account.unconfirmed_balance -= debit;
        if let TransactionAsset::Stake { amount } = trs.asset {
            account.unconfirmed_frozen_amount += amount;
        }
        Ok(())
    }

    async fn undo_unconfirmed(&self, trs: &Transaction) -> Result<(), MempoolError> {
        let mut accounts = self.accounts.write();
        let account = accounts
            .get_mut(&trs.sender_address)
            .ok_or_else(|| MempoolError::Store("unknown sender".into()))?;
        account.unconfirmed_balance += trs.total_debit();
        if let TransactionAsset::Stake { amount } = trs.asset {
            account.unconfirmed_frozen_amount =
                account.unconfirmed_frozen_amount.saturating_sub(amount);
        }
        Ok(())
    }
}

#[async_trait]
impl AccountsRepo for InMemoryLedger {
    async fn get_or_create(&self, public_key: &PublicKey) -> Result<Account, MempoolError> {
        let address = Address::from_public_key(public_key);
        let mut accounts = self.accounts.write();
        let account = accounts.entry(address).or_insert_with(|| Account {
            address,
            public_key: Some(*public_key),
            ..Account::default()
        });
        Ok(account.clone())
    }

    async fn by_address(&self, address: Address) -> Result<Option<Account>, MempoolError> {
        Ok(self.accounts.read().get(&address).cloned())
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Start the clock at `now` unix seconds.
    #[must_use]
    pub fn at(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    /// Advance by `secs`.
    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now_unix(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Build a signed transaction from a keypair, for tests.
#[must_use]
pub fn signed_tx(
    keypair: &shared_crypto::KeyPair,
    tx_type: TransactionType,
    recipient: Option<Address>,
    amount: u64,
    fee: u64,
    timestamp: u32,
    asset: TransactionAsset,
) -> Transaction {
    let mut trs = Transaction::unsigned(
        tx_type,
        keypair.public_key_bytes(),
        recipient,
        amount,
        fee,
        timestamp,
        asset,
    );
    trs.sign(keypair);
    trs
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::KeyPair;

    #[tokio::test]
    async fn test_credit_and_apply_roundtrip() {
        let ledger = InMemoryLedger::new();
        let keypair = KeyPair::generate();
        ledger.credit(&keypair.public_key_bytes(), 1_000);

        let trs = signed_tx(
            &keypair,
            TransactionType::Send,
            Some(Address(9)),
            100,
            10,
            50,
            TransactionAsset::None,
        );

        ledger.apply_unconfirmed(&trs).await.unwrap();
        assert_eq!(
            ledger.account(trs.sender_address).unwrap().unconfirmed_balance,
            890
        );

        ledger.undo_unconfirmed(&trs).await.unwrap();
        assert_eq!(
            ledger.account(trs.sender_address).unwrap().unconfirmed_balance,
            1_000
        );
    }

    #[tokio::test]
    async fn test_verify_new_flags_bad_signature() {
        let ledger = InMemoryLedger::new();
        let keypair = KeyPair::generate();
        let mut trs = signed_tx(
            &keypair,
            TransactionType::Send,
            Some(Address(9)),
            100,
            10,
            50,
            TransactionAsset::None,
        );
        trs.signature[0] ^= 1;
        trs.id = trs.compute_id();

        let sender = Account::default();
        let failures = ledger.verify_new(&trs, &sender, true).await.unwrap_err();
        assert!(failures.contains(&VerifyFailure::Signature));
    }

    #[tokio::test]
    async fn test_verify_unconfirmed_balance_check() {
        let ledger = InMemoryLedger::new();
        let keypair = KeyPair::generate();
        ledger.credit(&keypair.public_key_bytes(), 50);

        let trs = signed_tx(
            &keypair,
            TransactionType::Send,
            Some(Address(9)),
            100,
            10,
            50,
            TransactionAsset::None,
        );
        let sender = ledger.get_or_create(&keypair.public_key_bytes()).await.unwrap();

        let failures = ledger.verify_unconfirmed(&trs, &sender).await.unwrap_err();
        assert!(matches!(
            failures[0],
            VerifyFailure::InsufficientBalance {
                required: 110,
                available: 50
            }
        ));
    }

    #[tokio::test]
    async fn test_scripted_apply_failure_fires_once() {
        let ledger = InMemoryLedger::new();
        let keypair = KeyPair::generate();
        ledger.credit(&keypair.public_key_bytes(), 1_000);
        let trs = signed_tx(
            &keypair,
            TransactionType::Send,
            Some(Address(9)),
            100,
            10,
            50,
            TransactionAsset::None,
        );

        ledger.fail_next_apply();
        assert!(ledger.apply_unconfirmed(&trs).await.is_err());
        assert!(ledger.apply_unconfirmed(&trs).await.is_ok());
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::at(100);
        assert_eq!(clock.now_unix(), 100);
        clock.advance(50);
        assert_eq!(clock.now_unix(), 150);
    }
}
