//! In-memory port implementations and block builders for tests.
//!
//! Shared by this crate's unit tests and the workspace integration tests,
//! so it is a public module rather than `#[cfg(test)]`.

use crate::domain::ForkCause;
use crate::error::ProcessBlockError;
use crate::ports::{BlockRepository, DelegatesPort, MempoolPort};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_crypto::{KeyPair, Sha256Hasher};
use shared_types::entities::{Block, BlockId, Transaction, TransactionId};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

pub use ddk_mempool::testing::ManualClock;

/// Assemble and sign a block on top of `previous`.
///
/// Fills the payload digest, totals and counts from `transactions`, the
/// way the forging path does.
#[must_use]
pub fn build_block(
    keypair: &KeyPair,
    previous: &Block,
    transactions: Vec<Transaction>,
    timestamp: u32,
    reward: u64,
) -> Block {
    let mut hasher = Sha256Hasher::new();
    let mut payload_length = 0u32;
    let mut total_amount = 0u64;
    let mut total_fee = 0u64;
    for trs in &transactions {
        let bytes = trs.bytes(true);
        payload_length += bytes.len() as u32;
        hasher.update(&bytes);
        total_amount += trs.amount;
        total_fee += trs.fee;
    }

    let mut block = Block {
        id: BlockId::default(),
        version: shared_types::constants::CURRENT_BLOCK_VERSION,
        timestamp,
        height: previous.height + 1,
        previous_block: Some(previous.id),
        number_of_transactions: transactions.len() as u32,
        total_amount,
        total_fee,
        reward,
        payload_length,
        payload_hash: hasher.finalize(),
        generator_public_key: keypair.public_key_bytes(),
        signature: [0u8; 64],
        transactions,
    };
    block.sign(keypair);
    block
}

/// A signed empty genesis block at height 1.
#[must_use]
pub fn genesis_block(keypair: &KeyPair) -> Block {
    let mut block = Block {
        id: BlockId::default(),
        version: shared_types::constants::CURRENT_BLOCK_VERSION,
        timestamp: 100,
        height: 1,
        previous_block: None,
        number_of_transactions: 0,
        total_amount: 0,
        total_fee: 0,
        reward: 0,
        payload_length: 0,
        payload_hash: Sha256Hasher::new().finalize(),
        generator_public_key: keypair.public_key_bytes(),
        signature: [0u8; 64],
        transactions: Vec::new(),
    };
    block.sign(keypair);
    block
}

/// An in-memory chain store doubling as the delegates module.
#[derive(Default)]
pub struct InMemoryChain {
    blocks: RwLock<Vec<Block>>,
    confirmed: RwLock<HashSet<TransactionId>>,
    forks: RwLock<Vec<(BlockId, ForkCause)>>,
    reject_slot: AtomicBool,
}

impl InMemoryChain {
    /// Creates an empty chain store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of applied blocks.
    pub fn height(&self) -> usize {
        self.blocks.read().len()
    }

    /// Applied block ids, oldest first.
    pub fn block_ids(&self) -> Vec<BlockId> {
        self.blocks.read().iter().map(|b| b.id).collect()
    }

    /// Recorded fork signals.
    pub fn forks(&self) -> Vec<(BlockId, ForkCause)> {
        self.forks.read().clone()
    }

    /// Pre-mark a transaction as confirmed.
    pub fn mark_confirmed(&self, id: TransactionId) {
        self.confirmed.write().insert(id);
    }

    /// Make `validate_block_slot` report the wrong delegate.
    pub fn reject_next_slot(&self) {
        self.reject_slot.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl DelegatesPort for InMemoryChain {
    async fn validate_block_slot(&self, _block: &Block) -> Result<bool, ProcessBlockError> {
        Ok(!self.reject_slot.swap(false, Ordering::SeqCst))
    }

    async fn fork(&self, block: &Block, cause: ForkCause) {
        self.forks.write().push((block.id, cause));
    }
}

#[async_trait]
impl BlockRepository for InMemoryChain {
    async fn exists(&self, id: &BlockId) -> Result<bool, ProcessBlockError> {
        Ok(self.blocks.read().iter().any(|b| &b.id == id))
    }

    async fn is_transaction_confirmed(
        &self,
        id: &TransactionId,
    ) -> Result<bool, ProcessBlockError> {
        Ok(self.confirmed.read().contains(id))
    }

    async fn apply_block(&self, block: &Block, _save: bool) -> Result<(), ProcessBlockError> {
        for trs in &block.transactions {
            self.confirmed.write().insert(trs.id);
        }
        self.blocks.write().push(block.clone());
        Ok(())
    }
}

/// A mempool port that records calls and holds nothing.
#[derive(Default)]
pub struct RecordingMempool {
    removed: RwLock<Vec<TransactionId>>,
    locked: AtomicBool,
    reshuffles: RwLock<usize>,
}

impl RecordingMempool {
    /// Creates an empty recording mempool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids passed to `remove_transaction`.
    pub fn removed(&self) -> Vec<TransactionId> {
        self.removed.read().clone()
    }

    /// Whether the port is currently locked.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    /// Number of reshuffle calls.
    pub fn reshuffles(&self) -> usize {
        *self.reshuffles.read()
    }
}

#[async_trait]
impl MempoolPort for RecordingMempool {
    fn lock(&self) {
        self.locked.store(true, Ordering::SeqCst);
    }

    fn unlock(&self) {
        self.locked.store(false, Ordering::SeqCst);
    }

    async fn remove_transaction(&self, id: TransactionId) -> bool {
        self.removed.write().push(id);
        true
    }

    fn reshuffle(&self) {
        *self.reshuffles.write() += 1;
    }
}
