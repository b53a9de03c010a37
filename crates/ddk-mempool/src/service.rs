//! # Mempool Service - Staged Admission Pipeline
//!
//! Wires the queue, the pool, the conflict detector and the shared
//! `Sequence` into one service:
//!
//! ```text
//! submit ──► queue ──► verify ──► pool ──► pop_sorted (block producer)
//!               │         │         ▲
//!               └► conflicted ◄─────┘
//! ```
//!
//! One worker task drains the queue; it is kicked when the queue turns
//! non-empty and by [`MempoolService::trigger`] after an unlock. Every pool
//! mutation (insert plus apply-unconfirmed, remove plus undo-unconfirmed)
//! runs as a single job on the `Sequence`, which is what keeps ledger
//! mutations from interleaving.

use crate::config::MempoolConfig;
use crate::domain::{
    is_potential_conflict, render_failures, MempoolError, TransactionPool, TransactionQueue,
    VerifyFailure,
};
use crate::ports::{AccountsRepo, TimeSource, TransactionLogic};
use parking_lot::{Mutex, RwLock};
use shared_bus::{AccountSessions, EventPublisher, NodeEvent, VerifyNotification};
use shared_types::entities::{
    Account, Address, PublicKey, Transaction, TransactionId, TransactionStatus,
};
use shared_types::ordering::sort_canonical;
use shared_types::Sequence;
use std::sync::{Arc, Weak};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

/// Lock state of the admission pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockStatus {
    /// Whether the pool refuses non-forced pushes.
    pub pool: bool,
    /// Whether the queue worker is halted.
    pub queue: bool,
}

/// Observability snapshot of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStatus {
    /// Transactions in the pool.
    pub pooled: usize,
    /// Transactions waiting in the queue.
    pub queued: usize,
    /// Transactions parked as conflicted.
    pub conflicted: usize,
    /// Current lock state.
    pub locks: LockStatus,
}

/// The admission pipeline service.
pub struct MempoolService {
    config: MempoolConfig,
    pool: Arc<RwLock<TransactionPool>>,
    queue: Mutex<TransactionQueue>,
    sequence: Sequence,
    logic: Arc<dyn TransactionLogic>,
    accounts: Arc<dyn AccountsRepo>,
    bus: Arc<dyn EventPublisher>,
    sessions: Arc<AccountSessions>,
    time: Arc<dyn TimeSource>,
    kick: Arc<Notify>,
    worker: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl MempoolService {
    /// Create the service and spawn its queue worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: MempoolConfig,
        logic: Arc<dyn TransactionLogic>,
        accounts: Arc<dyn AccountsRepo>,
        bus: Arc<dyn EventPublisher>,
        sessions: Arc<AccountSessions>,
        time: Arc<dyn TimeSource>,
    ) -> Arc<Self> {
        info!(
            max_shared_txs = config.max_shared_txs,
            queue_expire_secs = config.queue_expire_secs,
            "Initializing mempool service"
        );

        let sequence =
            Sequence::with_warning_limit("pool", config.sequence_warning_limit, None);
        let service = Arc::new(Self {
            config,
            pool: Arc::new(RwLock::new(TransactionPool::new())),
            queue: Mutex::new(TransactionQueue::new()),
            sequence,
            logic,
            accounts,
            bus,
            sessions,
            time,
            kick: Arc::new(Notify::new()),
            worker: Mutex::new(None),
        });

        let weak: Weak<Self> = Arc::downgrade(&service);
        let kick = Arc::clone(&service.kick);
        let handle = tokio::spawn(async move {
            loop {
                kick.notified().await;
                let Some(service) = weak.upgrade() else {
                    break;
                };
                service.process().await;
            }
        });
        *service.worker.lock() = Some(handle);
        service
    }

    // =========================================================================
    // QUEUE SIDE
    // =========================================================================

    /// Submit a transaction for admission.
    ///
    /// The transaction is queued in canonical order; a processing cycle is
    /// kicked when the queue was empty.
    pub fn submit(&self, trs: Transaction) {
        debug!(id = %trs.id, "Transaction queued");
        let went_nonempty = self.queue.lock().push(trs);
        if went_nonempty {
            self.kick.notify_one();
        }
    }

    /// Restart the processing cycle, e.g. after an unlock.
    pub fn trigger(&self) {
        self.kick.notify_one();
    }

    /// Drain the conflicted queue back into the main queue.
    ///
    /// Entries past their deadline are dropped; survivors are re-sorted
    /// with the rest of the queue and processing resumes.
    pub fn reshuffle(&self) {
        let now = self.time.now_unix();
        let outcome = self.queue.lock().reshuffle(now);
        if outcome.expired > 0 {
            warn!(expired = outcome.expired, "Dropped expired conflicted transactions");
        }
        if outcome.requeued > 0 {
            self.kick.notify_one();
        }
    }

    /// The admission state machine. Runs on the worker task; one cycle in
    /// flight at a time.
    async fn process(&self) {
        loop {
            let next = {
                let mut queue = self.queue.lock();
                if queue.is_locked() {
                    return;
                }
                queue.shift()
            };
            let Some(mut trs) = next else {
                return;
            };

            if self.pool.read().contains(&trs.id) {
                debug!(id = %trs.id, "Already admitted; skipping duplicate");
                continue;
            }

            let conflicted = is_potential_conflict(&trs, &self.pool.read());
            if conflicted {
                let expires_at = self.time.now_unix() + self.config.queue_expire_secs;
                self.queue.lock().push_conflicted(trs, expires_at);
                continue;
            }

            let sender = match self.accounts.get_or_create(&trs.sender_public_key).await {
                Ok(sender) => sender,
                Err(err) => {
                    // The pipeline stays live for the rest of the queue.
                    error!(id = %trs.id, %err, "Accounts store unavailable; dropping transaction");
                    continue;
                }
            };

            match self.verify(&trs, &sender).await {
                Err(failures) => {
                    trs.status = TransactionStatus::Declined;
                    debug!(id = %trs.id, ?failures, "Transaction declined");
                    self.sessions.send_verify(
                        trs.sender_address,
                        VerifyNotification::failed(render_failures(&failures)),
                    );
                    continue;
                }
                Ok(()) => {
                    trs.status = TransactionStatus::Verified;
                    self.sessions
                        .send_verify(trs.sender_address, VerifyNotification::ok());
                }
            }

            if self.queue.lock().is_locked() {
                // Halt without dropping work; trigger() resumes.
                self.queue.lock().push(trs);
                return;
            }

            match self.push_to_pool(trs.clone(), true, false).await {
                Ok(()) => {}
                Err(MempoolError::Duplicate(_)) => {
                    debug!(id = %trs.id, "Raced into pool by another path");
                }
                Err(MempoolError::PoolLocked) => {
                    self.queue.lock().push(trs);
                    return;
                }
                Err(err) => {
                    debug!(id = %trs.id, %err, "Pool push failed; re-queueing");
                    self.queue.lock().push(trs);
                }
            }
        }
    }

    /// Two-phase verification against the ledger.
    async fn verify(
        &self,
        trs: &Transaction,
        sender: &Account,
    ) -> Result<(), Vec<VerifyFailure>> {
        self.logic.verify_new(trs, sender, true).await?;
        self.logic.verify_unconfirmed(trs, sender).await?;
        Ok(())
    }

    // =========================================================================
    // POOL SIDE (every mutation is one Sequence job)
    // =========================================================================

    /// Insert a transaction into the pool and apply its unconfirmed
    /// effects.
    ///
    /// On apply failure the insertion is rolled back and the error
    /// returned. With `broadcast`, success publishes
    /// [`NodeEvent::TransactionPutInPool`].
    pub async fn push_to_pool(
        &self,
        trs: Transaction,
        broadcast: bool,
        force: bool,
    ) -> Result<(), MempoolError> {
        let pool = Arc::clone(&self.pool);
        let logic = Arc::clone(&self.logic);
        let bus = Arc::clone(&self.bus);

        let job = async move {
            {
                let mut guard = pool.write();
                if guard.is_locked() && !force {
                    return Err(MempoolError::PoolLocked);
                }
                if guard.contains(&trs.id) {
                    return Err(MempoolError::Duplicate(trs.id));
                }
                if is_potential_conflict(&trs, &guard) {
                    return Err(MempoolError::PotentialConflict(trs.id));
                }
                guard.insert(trs.clone())?;
            }

            match logic.apply_unconfirmed(&trs).await {
                Ok(()) => {
                    pool.write()
                        .set_status(&trs.id, TransactionStatus::UnconfirmApplied);
                    debug!(id = %trs.id, "Transaction put in pool");
                    if broadcast {
                        let mut applied = trs;
                        applied.status = TransactionStatus::UnconfirmApplied;
                        bus.publish(NodeEvent::TransactionPutInPool(Box::new(applied)))
                            .await;
                    }
                    Ok(())
                }
                Err(err) => {
                    pool.write().remove(&trs.id);
                    warn!(id = %trs.id, %err, "Apply unconfirmed failed; insertion rolled back");
                    Err(err)
                }
            }
        };

        self.sequence
            .run(job)
            .await
            .map_err(|_| MempoolError::SequenceClosed)?
    }

    /// Remove a transaction, undoing its unconfirmed effects first.
    ///
    /// Undo failures are logged and swallowed; removal proceeds. Returns
    /// whether the transaction was present.
    pub async fn remove_transaction(&self, id: TransactionId) -> bool {
        self.pop_transaction(id).await.is_some()
    }

    /// Remove and return a transaction.
    pub async fn pop_transaction(&self, id: TransactionId) -> Option<Transaction> {
        let pool = Arc::clone(&self.pool);
        let logic = Arc::clone(&self.logic);

        let job = async move {
            let trs = pool.read().get(&id).cloned()?;
            if let Err(err) = logic.undo_unconfirmed(&trs).await {
                warn!(id = %id, %err, "Undo unconfirmed failed; removing anyway");
            }
            pool.write().remove(&id)
        };
        self.sequence.run(job).await.unwrap_or_default()
    }

    /// Pop the canonically-first `limit` transactions for block packaging.
    ///
    /// The returned batch is exactly the head of the sorted pool at the
    /// moment of the call, and the transactions leave the pool in the same
    /// job, so the snapshot is never torn.
    pub async fn pop_sorted(&self, limit: usize) -> Vec<Transaction> {
        let pool = Arc::clone(&self.pool);
        let logic = Arc::clone(&self.logic);

        let job = async move {
            let ids = pool.read().sorted_head_ids(limit);
            let mut out = Vec::with_capacity(ids.len());
            for id in ids {
                let Some(trs) = pool.read().get(&id).cloned() else {
                    continue;
                };
                if let Err(err) = logic.undo_unconfirmed(&trs).await {
                    warn!(id = %id, %err, "Undo unconfirmed failed; removing anyway");
                }
                if let Some(removed) = pool.write().remove(&id) {
                    out.push(removed);
                }
            }
            out
        };
        self.sequence.run(job).await.unwrap_or_default()
    }

    /// Purge every pool transaction sent by `address`.
    pub async fn remove_by_sender(&self, address: Address) -> Vec<Transaction> {
        let pool = Arc::clone(&self.pool);
        let logic = Arc::clone(&self.logic);
        let job = async move {
            let ids = pool.read().sender_ids(address);
            Self::remove_ids(&pool, logic.as_ref(), ids).await
        };
        self.sequence.run(job).await.unwrap_or_default()
    }

    /// Purge every pool `Send` addressed to `address`.
    pub async fn remove_by_recipient(&self, address: Address) -> Vec<Transaction> {
        let pool = Arc::clone(&self.pool);
        let logic = Arc::clone(&self.logic);
        let job = async move {
            let ids = pool.read().recipient_ids(address);
            Self::remove_ids(&pool, logic.as_ref(), ids).await
        };
        self.sequence.run(job).await.unwrap_or_default()
    }

    async fn remove_ids(
        pool: &RwLock<TransactionPool>,
        logic: &dyn TransactionLogic,
        ids: Vec<TransactionId>,
    ) -> Vec<Transaction> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(trs) = pool.read().get(&id).cloned() else {
                continue;
            };
            if let Err(err) = logic.undo_unconfirmed(&trs).await {
                warn!(id = %id, %err, "Undo unconfirmed failed; removing anyway");
            }
            if let Some(removed) = pool.write().remove(&id) {
                out.push(removed);
            }
        }
        out
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Get a pool transaction by id.
    pub fn get(&self, id: &TransactionId) -> Option<Transaction> {
        self.pool.read().get(id).cloned()
    }

    /// Whether the pool holds `id`.
    pub fn has(&self, id: &TransactionId) -> bool {
        self.pool.read().contains(id)
    }

    /// Number of pool transactions.
    pub fn size(&self) -> usize {
        self.pool.read().len()
    }

    /// Pool transactions sent by `address`.
    pub fn transactions_by_sender(&self, address: Address) -> Vec<Transaction> {
        self.pool
            .read()
            .by_sender(address)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Pool `Send` transactions addressed to `address`.
    pub fn transactions_by_recipient(&self, address: Address) -> Vec<Transaction> {
        self.pool
            .read()
            .by_recipient(address)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Shared pool query: up to `limit` transactions plus the total count
    /// of the projected set.
    ///
    /// With a sender key the projection is that account's dependent set,
    /// sorted ascending and then reversed; without, the whole pool sorted
    /// ascending. `limit` is clamped to the configured share cap.
    pub fn page(
        &self,
        limit: Option<usize>,
        sender_public_key: Option<PublicKey>,
    ) -> (Vec<Transaction>, usize) {
        let limit = limit
            .unwrap_or(self.config.max_shared_txs)
            .min(self.config.max_shared_txs);
        let pool = self.pool.read();

        let mut transactions: Vec<Transaction> = match sender_public_key {
            Some(pk) => {
                let address = Address::from_public_key(&pk);
                let mut dependent: Vec<Transaction> =
                    pool.dependent_set(address).into_iter().cloned().collect();
                sort_canonical(&mut dependent);
                dependent.reverse();
                dependent
            }
            None => pool.sorted_snapshot(),
        };
        let count = transactions.len();
        transactions.truncate(limit);
        (transactions, count)
    }

    /// Observability snapshot.
    pub fn status(&self) -> PoolStatus {
        let (queued, conflicted, queue_locked) = {
            let queue = self.queue.lock();
            (queue.len(), queue.conflicted_len(), queue.is_locked())
        };
        let (pooled, pool_locked) = {
            let pool = self.pool.read();
            (pool.len(), pool.is_locked())
        };
        PoolStatus {
            pooled,
            queued,
            conflicted,
            locks: LockStatus {
                pool: pool_locked,
                queue: queue_locked,
            },
        }
    }

    /// Current lock state.
    pub fn lock_status(&self) -> LockStatus {
        let pool = self.pool.read().is_locked();
        let queue = self.queue.lock().is_locked();
        LockStatus { pool, queue }
    }

    // =========================================================================
    // LOCKING
    // =========================================================================

    /// Gate both pool and queue, e.g. around fork recovery.
    pub fn lock_pool_and_queue(&self) {
        self.pool.write().lock();
        self.queue.lock().lock();
        info!("Transaction pool and queue locked");
    }

    /// Re-open both gates. Processing resumes on [`MempoolService::trigger`].
    pub fn unlock_pool_and_queue(&self) {
        self.pool.write().unlock();
        self.queue.lock().unlock();
        info!("Transaction pool and queue unlocked");
    }
}

impl Drop for MempoolService {
    fn drop(&mut self) {
        if let Some(handle) = self.worker.lock().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{signed_tx, InMemoryLedger, ManualClock};
    use shared_bus::{EventFilter, EventTopic, InMemoryEventBus};
    use shared_crypto::KeyPair;
    use shared_types::entities::{TransactionAsset, TransactionType};
    use std::time::Duration;

    struct Harness {
        service: Arc<MempoolService>,
        ledger: Arc<InMemoryLedger>,
        bus: Arc<InMemoryEventBus>,
        sessions: Arc<AccountSessions>,
        clock: Arc<ManualClock>,
    }

    fn harness() -> Harness {
        let ledger = Arc::new(InMemoryLedger::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let sessions = Arc::new(AccountSessions::new());
        let clock = Arc::new(ManualClock::at(1_000));
        let service = MempoolService::start(
            MempoolConfig::for_testing(),
            Arc::clone(&ledger) as Arc<dyn TransactionLogic>,
            Arc::clone(&ledger) as Arc<dyn AccountsRepo>,
            Arc::clone(&bus) as Arc<dyn EventPublisher>,
            Arc::clone(&sessions),
            Arc::clone(&clock) as Arc<dyn TimeSource>,
        );
        Harness {
            service,
            ledger,
            bus,
            sessions,
            clock,
        }
    }

    async fn settle<F: Fn() -> bool>(condition: F) {
        for _ in 0..500 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("condition not reached");
    }

    fn send_tx(keypair: &KeyPair, amount: u64, timestamp: u32) -> Transaction {
        signed_tx(
            keypair,
            TransactionType::Send,
            Some(Address(4242)),
            amount,
            10,
            timestamp,
            TransactionAsset::None,
        )
    }

    #[tokio::test]
    async fn test_simple_admission() {
        let h = harness();
        let keypair = KeyPair::generate();
        h.ledger.credit(&keypair.public_key_bytes(), 1_000);

        let mut bus_sub = h.bus.subscribe(EventFilter::topics(vec![EventTopic::Pool]));
        let trs = send_tx(&keypair, 100, 50);
        let id = trs.id;
        let sender = trs.sender_address;

        h.service.submit(trs);
        settle(|| h.service.has(&id)).await;

        let pooled = h.service.get(&id).unwrap();
        assert_eq!(pooled.status, TransactionStatus::UnconfirmApplied);
        assert_eq!(h.ledger.account(sender).unwrap().unconfirmed_balance, 890);

        let event = tokio::time::timeout(Duration::from_secs(1), bus_sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, NodeEvent::TransactionPutInPool(boxed) if boxed.id == id));
    }

    #[tokio::test]
    async fn test_conflict_parks_in_conflicted_queue() {
        let h = harness();
        let keypair = KeyPair::generate();
        h.ledger.credit(&keypair.public_key_bytes(), 1_000);

        let first = send_tx(&keypair, 100, 100);
        let first_id = first.id;
        h.service.submit(first);
        settle(|| h.service.has(&first_id)).await;

        // Earlier timestamp would have to order before the pooled sibling.
        let second = send_tx(&keypair, 50, 40);
        let second_id = second.id;
        h.service.submit(second);

        settle(|| h.service.status().conflicted == 1).await;
        assert!(!h.service.has(&second_id));
        assert_eq!(h.service.size(), 1);
    }

    #[tokio::test]
    async fn test_double_spend_declined_and_notified() {
        let h = harness();
        let keypair = KeyPair::generate();
        h.ledger.credit(&keypair.public_key_bytes(), 100);

        let address = Address::from_public_key(&keypair.public_key_bytes());
        let mut session = h.sessions.register(address);

        let overspend = send_tx(&keypair, 200, 50);
        let id = overspend.id;
        h.service.submit(overspend);

        let message = tokio::time::timeout(Duration::from_secs(1), session.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(!message.payload.verified);
        assert!(message.payload.errors[0].contains("Insufficient"));
        assert!(!h.service.has(&id));
        assert_eq!(h.service.size(), 0);
    }

    #[tokio::test]
    async fn test_verified_notification_on_success() {
        let h = harness();
        let keypair = KeyPair::generate();
        h.ledger.credit(&keypair.public_key_bytes(), 1_000);

        let address = Address::from_public_key(&keypair.public_key_bytes());
        let mut session = h.sessions.register(address);

        h.service.submit(send_tx(&keypair, 100, 50));

        let message = tokio::time::timeout(Duration::from_secs(1), session.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(message.payload.verified);
        assert!(message.payload.errors.is_empty());
    }

    #[tokio::test]
    async fn test_signature_rotation_conflicts_with_any_pending() {
        let h = harness();
        let keypair = KeyPair::generate();
        h.ledger.credit(&keypair.public_key_bytes(), 10_000);

        let pending = send_tx(&keypair, 100, 10);
        let pending_id = pending.id;
        h.service.submit(pending);
        settle(|| h.service.has(&pending_id)).await;

        let rotation = signed_tx(
            &keypair,
            TransactionType::Signature,
            None,
            0,
            100,
            999,
            TransactionAsset::SecondSignature {
                public_key: KeyPair::generate().public_key_bytes(),
            },
        );
        h.service.submit(rotation);

        settle(|| h.service.status().conflicted == 1).await;
        assert_eq!(h.service.size(), 1);
    }

    #[tokio::test]
    async fn test_reshuffle_admits_once_sibling_left() {
        let h = harness();
        let keypair = KeyPair::generate();
        h.ledger.credit(&keypair.public_key_bytes(), 1_000);

        let first = send_tx(&keypair, 100, 100);
        let first_id = first.id;
        h.service.submit(first);
        settle(|| h.service.has(&first_id)).await;

        let second = send_tx(&keypair, 50, 40);
        let second_id = second.id;
        h.service.submit(second);
        settle(|| h.service.status().conflicted == 1).await;

        // Block producer takes the pooled sibling; the conflicted one can
        // now be admitted.
        let popped = h.service.pop_sorted(10).await;
        assert_eq!(popped.len(), 1);
        h.service.reshuffle();

        settle(|| h.service.has(&second_id)).await;
        assert_eq!(h.service.status().conflicted, 0);
    }

    #[tokio::test]
    async fn test_reshuffle_drops_expired_conflicted() {
        let h = harness();
        let keypair = KeyPair::generate();
        h.ledger.credit(&keypair.public_key_bytes(), 1_000);

        let first = send_tx(&keypair, 100, 100);
        let first_id = first.id;
        h.service.submit(first);
        settle(|| h.service.has(&first_id)).await;

        let second = send_tx(&keypair, 50, 40);
        h.service.submit(second);
        settle(|| h.service.status().conflicted == 1).await;

        // for_testing expiry is 60s.
        h.clock.advance(120);
        h.service.reshuffle();

        settle(|| h.service.status().conflicted == 0).await;
        assert_eq!(h.service.size(), 1);
    }

    #[tokio::test]
    async fn test_apply_failure_rolls_back_insertion() {
        let h = harness();
        let keypair = KeyPair::generate();
        h.ledger.credit(&keypair.public_key_bytes(), 1_000);

        let trs = send_tx(&keypair, 100, 50);
        h.ledger.fail_next_apply();

        let err = h.service.push_to_pool(trs.clone(), false, false).await;
        assert!(matches!(err, Err(MempoolError::ApplyUnconfirmedFailed(_))));
        assert!(!h.service.has(&trs.id));
        assert_eq!(
            h.ledger
                .account(trs.sender_address)
                .unwrap()
                .unconfirmed_balance,
            1_000
        );
    }

    #[tokio::test]
    async fn test_duplicate_push_rejected() {
        let h = harness();
        let keypair = KeyPair::generate();
        h.ledger.credit(&keypair.public_key_bytes(), 1_000);

        let trs = send_tx(&keypair, 100, 50);
        h.service.push_to_pool(trs.clone(), false, false).await.unwrap();

        let err = h.service.push_to_pool(trs.clone(), false, false).await;
        assert_eq!(err, Err(MempoolError::Duplicate(trs.id)));
        assert_eq!(h.service.size(), 1);
    }

    #[tokio::test]
    async fn test_locked_pool_rejects_unforced_push() {
        let h = harness();
        let keypair = KeyPair::generate();
        h.ledger.credit(&keypair.public_key_bytes(), 1_000);

        h.service.lock_pool_and_queue();
        let trs = send_tx(&keypair, 100, 50);

        let err = h.service.push_to_pool(trs.clone(), false, false).await;
        assert_eq!(err, Err(MempoolError::PoolLocked));

        // Forced push bypasses the gate.
        h.service.push_to_pool(trs.clone(), false, true).await.unwrap();
        assert!(h.service.has(&trs.id));
    }

    #[tokio::test]
    async fn test_lock_halts_queue_until_trigger() {
        let h = harness();
        let keypair = KeyPair::generate();
        h.ledger.credit(&keypair.public_key_bytes(), 1_000);

        h.service.lock_pool_and_queue();
        let trs = send_tx(&keypair, 100, 50);
        let id = trs.id;
        h.service.submit(trs);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!h.service.has(&id));
        assert_eq!(h.service.status().queued, 1);

        h.service.unlock_pool_and_queue();
        h.service.trigger();
        settle(|| h.service.has(&id)).await;
    }

    #[tokio::test]
    async fn test_push_remove_roundtrip_restores_state() {
        let h = harness();
        let keypair = KeyPair::generate();
        h.ledger.credit(&keypair.public_key_bytes(), 1_000);

        let trs = send_tx(&keypair, 100, 50);
        h.service.push_to_pool(trs.clone(), false, false).await.unwrap();
        assert_eq!(
            h.ledger
                .account(trs.sender_address)
                .unwrap()
                .unconfirmed_balance,
            890
        );

        assert!(h.service.remove_transaction(trs.id).await);
        assert_eq!(h.service.size(), 0);
        assert_eq!(
            h.ledger
                .account(trs.sender_address)
                .unwrap()
                .unconfirmed_balance,
            1_000
        );

        // Removing again is a no-op.
        assert!(!h.service.remove_transaction(trs.id).await);
    }

    #[tokio::test]
    async fn test_pop_sorted_takes_canonical_head() {
        let h = harness();
        let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
        for keypair in &keys {
            h.ledger.credit(&keypair.public_key_bytes(), 1_000);
        }

        let t1 = send_tx(&keys[0], 100, 10);
        let t2 = send_tx(&keys[1], 100, 20);
        let t3 = send_tx(&keys[2], 100, 30);
        for trs in [&t1, &t2, &t3] {
            h.service.push_to_pool(trs.clone(), false, false).await.unwrap();
        }

        let popped = h.service.pop_sorted(2).await;
        let popped_ids: Vec<_> = popped.iter().map(|t| t.id).collect();
        assert_eq!(popped_ids, vec![t1.id, t2.id]);
        assert_eq!(h.service.size(), 1);
        assert!(!h.service.has(&t1.id));
        assert!(!h.service.has(&t2.id));
        assert!(h.service.has(&t3.id));
    }

    #[tokio::test]
    async fn test_remove_by_sender_purges_account() {
        let h = harness();
        let keypair = KeyPair::generate();
        let other = KeyPair::generate();
        h.ledger.credit(&keypair.public_key_bytes(), 10_000);
        h.ledger.credit(&other.public_key_bytes(), 10_000);

        h.service
            .push_to_pool(send_tx(&keypair, 100, 10), false, false)
            .await
            .unwrap();
        h.service
            .push_to_pool(send_tx(&keypair, 100, 20), false, false)
            .await
            .unwrap();
        h.service
            .push_to_pool(send_tx(&other, 100, 30), false, false)
            .await
            .unwrap();

        let address = Address::from_public_key(&keypair.public_key_bytes());
        let removed = h.service.remove_by_sender(address).await;
        assert_eq!(removed.len(), 2);
        assert_eq!(h.service.size(), 1);
        assert_eq!(
            h.ledger.account(address).unwrap().unconfirmed_balance,
            10_000
        );
    }

    #[tokio::test]
    async fn test_remove_by_recipient_purges_incoming_sends() {
        let h = harness();
        let keypair = KeyPair::generate();
        h.ledger.credit(&keypair.public_key_bytes(), 10_000);

        h.service
            .push_to_pool(send_tx(&keypair, 100, 10), false, false)
            .await
            .unwrap();

        let removed = h.service.remove_by_recipient(Address(4242)).await;
        assert_eq!(removed.len(), 1);
        assert_eq!(h.service.size(), 0);
    }

    #[tokio::test]
    async fn test_page_clamps_and_projects() {
        let h = harness();
        let keypair = KeyPair::generate();
        h.ledger.credit(&keypair.public_key_bytes(), 1_000_000);

        for timestamp in 0..20u32 {
            h.service
                .push_to_pool(send_tx(&keypair, 100, timestamp + 1), false, false)
                .await
                .unwrap();
        }

        // for_testing caps shared queries at 10.
        let (transactions, count) = h.service.page(Some(50), None);
        assert_eq!(count, 20);
        assert_eq!(transactions.len(), 10);
        // Ascending canonical order.
        assert!(transactions[0].timestamp < transactions[9].timestamp);

        let (projected, projected_count) =
            h.service.page(None, Some(keypair.public_key_bytes()));
        assert_eq!(projected_count, 20);
        // Per-sender projection is reversed: newest canonical position first.
        assert!(projected[0].timestamp > projected[1].timestamp);
    }

    #[tokio::test]
    async fn test_queue_and_pool_never_hold_same_id() {
        let h = harness();
        let keypair = KeyPair::generate();
        h.ledger.credit(&keypair.public_key_bytes(), 10_000);

        let trs = send_tx(&keypair, 100, 50);
        let id = trs.id;
        h.service.submit(trs.clone());
        h.service.submit(trs);

        settle(|| h.service.has(&id)).await;
        settle(|| h.service.status().queued == 0).await;
        assert_eq!(h.service.size(), 1);
        assert_eq!(h.service.status().conflicted, 0);
    }
}
