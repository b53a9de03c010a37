//! # Admission Queue State
//!
//! Holds transactions between submission and verification, plus the parking
//! area for conflicted transactions. The queue proper is kept canonically
//! sorted on every insert; the conflicted queue is unordered because the
//! reshuffle re-imposes the canonical order anyway.
//!
//! The async admission cycle that drains this state lives in the service;
//! everything here is synchronous bookkeeping.

use shared_types::entities::{Transaction, TransactionStatus};
use shared_types::ordering::sort_canonical;
use tracing::debug;

/// A conflicted transaction with its residency deadline.
#[derive(Debug, Clone)]
pub struct ConflictedEntry {
    /// The parked transaction.
    pub transaction: Transaction,
    /// Unix seconds after which the reshuffle sweep drops the entry.
    pub expires_at: u64,
}

/// Outcome of [`TransactionQueue::reshuffle`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReshuffleOutcome {
    /// Entries moved back onto the queue.
    pub requeued: usize,
    /// Expired entries dropped, now `Declined`.
    pub expired: usize,
}

/// Queue state: pending transactions and the conflicted parking area.
#[derive(Debug, Default)]
pub struct TransactionQueue {
    queue: Vec<Transaction>,
    conflicted: Vec<ConflictedEntry>,
    locked: bool,
}

impl TransactionQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued transactions.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of parked conflicted transactions.
    pub fn conflicted_len(&self) -> usize {
        self.conflicted.len()
    }

    /// Whether admission is gated.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Gate admission.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Re-open admission.
    pub fn unlock(&mut self) {
        self.locked = false;
    }

    /// Append a transaction and re-impose the canonical order.
    ///
    /// Returns `true` when the queue went from empty to non-empty, which
    /// is the caller's signal to kick a processing cycle.
    pub fn push(&mut self, mut trs: Transaction) -> bool {
        let was_empty = self.queue.is_empty();
        trs.status = TransactionStatus::Queued;
        self.queue.push(trs);
        if !was_empty {
            sort_canonical(&mut self.queue);
        }
        was_empty
    }

    /// Take the canonically-first queued transaction.
    pub fn shift(&mut self) -> Option<Transaction> {
        if self.queue.is_empty() {
            None
        } else {
            Some(self.queue.remove(0))
        }
    }

    /// Park a conflicted transaction until `expires_at`.
    pub fn push_conflicted(&mut self, mut trs: Transaction, expires_at: u64) {
        trs.status = TransactionStatus::QueuedAsConflicted;
        debug!(id = %trs.id, expires_at, "Transaction parked as conflicted");
        self.conflicted.push(ConflictedEntry {
            transaction: trs,
            expires_at,
        });
    }

    /// Drain the conflicted queue back onto the main queue.
    ///
    /// Entries whose deadline has passed are dropped as `Declined` instead
    /// of being requeued; the survivors are re-sorted with whatever else is
    /// queued.
    pub fn reshuffle(&mut self, now_unix: u64) -> ReshuffleOutcome {
        let mut outcome = ReshuffleOutcome::default();

        // LIFO drain; the sort below makes the drain order irrelevant.
        while let Some(mut entry) = self.conflicted.pop() {
            if entry.expires_at <= now_unix {
                entry.transaction.status = TransactionStatus::Declined;
                debug!(id = %entry.transaction.id, "Conflicted transaction expired");
                outcome.expired += 1;
                continue;
            }
            entry.transaction.status = TransactionStatus::Queued;
            self.queue.push(entry.transaction);
            outcome.requeued += 1;
        }
        sort_canonical(&mut self.queue);
        outcome
    }

    /// Whether `id` sits in either the queue or the conflicted area.
    pub fn holds(&self, id: &shared_types::entities::TransactionId) -> bool {
        self.queue.iter().any(|trs| &trs.id == id)
            || self
                .conflicted
                .iter()
                .any(|entry| &entry.transaction.id == id)
    }
}
