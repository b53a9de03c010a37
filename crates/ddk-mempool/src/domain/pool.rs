//! # Transaction Pool - Multi-Index Mempool State
//!
//! ## Data Structures
//!
//! - `by_id`: primary index and source of truth
//! - `by_sender`: ids per sender account, insertion order
//! - `by_recipient`: ids per recipient account, `Send` transactions only
//!
//! Every transaction in `by_id` appears in its sender bucket, and in its
//! recipient bucket iff it is a `Send`. The secondary indexes hold ids only
//! and can be rebuilt from `by_id` after a fork recovery.
//!
//! This structure is plain data: serialization of mutations is the caller's
//! job (the admission service routes every write through the shared
//! `Sequence` and guards the struct with a lock).

use super::errors::MempoolError;
use shared_types::entities::{Address, Transaction, TransactionId, TransactionStatus, TransactionType};
use shared_types::ordering::{cmp_canonical, sort_canonical};
use std::collections::HashMap;

/// Mempool state: primary and secondary transaction indexes.
#[derive(Debug, Default)]
pub struct TransactionPool {
    /// All pool transactions by id.
    by_id: HashMap<TransactionId, Transaction>,

    /// Transaction ids per sender address.
    by_sender: HashMap<Address, Vec<TransactionId>>,

    /// Transaction ids per recipient address (`Send` only).
    by_recipient: HashMap<Address, Vec<TransactionId>>,

    /// Admission gate; set during fork recovery and rebuild.
    locked: bool,
}

impl TransactionPool {
    /// Creates a new empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pool transactions.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// True when the pool holds nothing.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Gets a transaction by id.
    pub fn get(&self, id: &TransactionId) -> Option<&Transaction> {
        self.by_id.get(id)
    }

    /// Checks membership by id.
    pub fn contains(&self, id: &TransactionId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Whether admission is gated.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Gate admission (fork recovery, rebuild).
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Re-open admission.
    pub fn unlock(&mut self) {
        self.locked = false;
    }

    /// Insert a transaction into all indexes.
    ///
    /// The transaction lands with status `PutInPool`; the caller advances
    /// it to `UnconfirmApplied` once the ledger accepted the unconfirmed
    /// effects.
    pub fn insert(&mut self, mut trs: Transaction) -> Result<(), MempoolError> {
        if self.by_id.contains_key(&trs.id) {
            return Err(MempoolError::Duplicate(trs.id));
        }

        trs.status = TransactionStatus::PutInPool;
        self.by_sender
            .entry(trs.sender_address)
            .or_default()
            .push(trs.id);
        if trs.tx_type == TransactionType::Send {
            if let Some(recipient) = trs.recipient_address {
                self.by_recipient.entry(recipient).or_default().push(trs.id);
            }
        }
        self.by_id.insert(trs.id, trs);
        Ok(())
    }

    /// Remove a transaction from all indexes, returning it.
    pub fn remove(&mut self, id: &TransactionId) -> Option<Transaction> {
        let trs = self.by_id.remove(id)?;

        if let Some(bucket) = self.by_sender.get_mut(&trs.sender_address) {
            bucket.retain(|entry| entry != id);
            if bucket.is_empty() {
                self.by_sender.remove(&trs.sender_address);
            }
        }
        if trs.tx_type == TransactionType::Send {
            if let Some(recipient) = trs.recipient_address {
                if let Some(bucket) = self.by_recipient.get_mut(&recipient) {
                    bucket.retain(|entry| entry != id);
                    if bucket.is_empty() {
                        self.by_recipient.remove(&recipient);
                    }
                }
            }
        }
        Some(trs)
    }

    /// Set the lifecycle tag of a pool transaction.
    pub fn set_status(&mut self, id: &TransactionId, status: TransactionStatus) {
        if let Some(trs) = self.by_id.get_mut(id) {
            trs.status = status;
        }
    }

    /// Transactions sent by `address`, bucket order.
    pub fn by_sender(&self, address: Address) -> Vec<&Transaction> {
        self.resolve(self.by_sender.get(&address))
    }

    /// `Send` transactions addressed to `address`, bucket order.
    pub fn by_recipient(&self, address: Address) -> Vec<&Transaction> {
        self.resolve(self.by_recipient.get(&address))
    }

    /// Ids sent by `address`; a snapshot safe to remove against.
    pub fn sender_ids(&self, address: Address) -> Vec<TransactionId> {
        self.by_sender.get(&address).cloned().unwrap_or_default()
    }

    /// Ids of `Send` transactions addressed to `address`; snapshot.
    pub fn recipient_ids(&self, address: Address) -> Vec<TransactionId> {
        self.by_recipient.get(&address).cloned().unwrap_or_default()
    }

    /// The account's dependent set: everything it sent plus every `Send`
    /// addressed to it, deduplicated (a self-send sits in both buckets).
    pub fn dependent_set(&self, address: Address) -> Vec<&Transaction> {
        let mut seen = Vec::new();
        let mut out: Vec<&Transaction> = Vec::new();
        let sender = self.by_sender.get(&address).into_iter().flatten();
        let recipient = self.by_recipient.get(&address).into_iter().flatten();
        for id in recipient.chain(sender) {
            if seen.contains(id) {
                continue;
            }
            seen.push(*id);
            if let Some(trs) = self.by_id.get(id) {
                out.push(trs);
            }
        }
        out
    }

    /// Clone of the whole pool, canonically sorted ascending.
    pub fn sorted_snapshot(&self) -> Vec<Transaction> {
        let mut all: Vec<Transaction> = self.by_id.values().cloned().collect();
        sort_canonical(&mut all);
        all
    }

    /// Ids of the first `limit` transactions under the canonical order.
    pub fn sorted_head_ids(&self, limit: usize) -> Vec<TransactionId> {
        let mut refs: Vec<&Transaction> = self.by_id.values().collect();
        refs.sort_by(|a, b| cmp_canonical(a, b));
        refs.into_iter().take(limit).map(|trs| trs.id).collect()
    }

    /// Consistency of the secondary indexes against `by_id`.
    ///
    /// Used by tests and the fork-recovery rebuild path.
    pub fn is_consistent(&self) -> bool {
        for (id, trs) in &self.by_id {
            let in_sender = self
                .by_sender
                .get(&trs.sender_address)
                .is_some_and(|bucket| bucket.contains(id));
            if !in_sender {
                return false;
            }
            let should_index_recipient =
                trs.tx_type == TransactionType::Send && trs.recipient_address.is_some();
            let in_recipient = trs.recipient_address.is_some_and(|recipient| {
                self.by_recipient
                    .get(&recipient)
                    .is_some_and(|bucket| bucket.contains(id))
            });
            if should_index_recipient != in_recipient {
                return false;
            }
        }
        let secondary: usize = self.by_sender.values().map(Vec::len).sum();
        secondary == self.by_id.len()
    }

    fn resolve(&self, ids: Option<&Vec<TransactionId>>) -> Vec<&Transaction> {
        ids.into_iter()
            .flatten()
            .filter_map(|id| self.by_id.get(id))
            .collect()
    }
}
