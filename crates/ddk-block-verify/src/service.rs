//! # Block Processor - Orchestration Around the Verifier
//!
//! Drives a received block through normalization, verification, the
//! delegate slot check, the confirmed-transaction check, application, and
//! the mempool feedback edge. The mempool is locked for the duration of
//! application so pool mutations and block application never interleave.

use crate::config::VerifyConfig;
use crate::domain::{BlockVerifier, ForkCause, VerifySummary};
use crate::error::{ProcessBlockError, Result};
use crate::ports::{BlockRepository, DelegatesPort, MempoolPort};
use ddk_mempool::ports::TimeSource;
use parking_lot::RwLock;
use shared_bus::{EventPublisher, NodeEvent};
use shared_types::entities::{Address, Block, BlockId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Orchestrates pre-apply verification and block application.
pub struct BlockProcessor {
    verifier: Arc<BlockVerifier>,
    delegates: Arc<dyn DelegatesPort>,
    repository: Arc<dyn BlockRepository>,
    mempool: Arc<dyn MempoolPort>,
    bus: Arc<dyn EventPublisher>,
    last_block: RwLock<Block>,
}

impl BlockProcessor {
    /// Create a processor positioned on `last_block`.
    pub fn new(
        config: VerifyConfig,
        time: Arc<dyn TimeSource>,
        delegates: Arc<dyn DelegatesPort>,
        repository: Arc<dyn BlockRepository>,
        mempool: Arc<dyn MempoolPort>,
        bus: Arc<dyn EventPublisher>,
        last_block: Block,
    ) -> Self {
        info!(
            height = last_block.height,
            tip = %last_block.id,
            "Initializing block processor"
        );
        Self {
            verifier: Arc::new(BlockVerifier::new(config, time)),
            delegates,
            repository,
            mempool,
            bus,
            last_block: RwLock::new(last_block),
        }
    }

    /// The current chain tip as this processor sees it.
    pub fn last_block(&self) -> Block {
        self.last_block.read().clone()
    }

    /// Seed the recent-id window and announce the usable tip.
    pub async fn on_blockchain_ready<I: IntoIterator<Item = BlockId>>(&self, recent_ids: I) {
        self.verifier.on_blockchain_ready(recent_ids);
        let height = self.last_block.read().height;
        self.bus.publish(NodeEvent::BlockchainReady { height }).await;
    }

    /// Receipt-time check for a block relayed by a peer.
    pub fn verify_receipt(&self, block: &mut Block) -> VerifySummary {
        let last_block = self.last_block.read().clone();
        self.verifier.verify_receipt(block, &last_block)
    }

    /// Verify and apply a block on top of the current tip.
    ///
    /// `verify = false` skips the check pipeline (chain reload of blocks
    /// verified in a previous run); `save` persists besides applying;
    /// `broadcast` announces the applied block on the bus.
    pub async fn process_block(
        &self,
        mut block: Block,
        broadcast: bool,
        save: bool,
        verify: bool,
    ) -> Result<Block> {
        Self::normalize(&mut block);

        if verify {
            let last_block = self.last_block.read().clone();
            let summary = self.verifier.verify_block(&mut block, &last_block);
            if let Some(cause) = summary.fork {
                self.delegates.fork(&block, cause).await;
            }
            if !summary.verified() {
                return Err(ProcessBlockError::Verification {
                    errors: summary.errors,
                });
            }
        }

        if save && self.repository.exists(&block.id).await? {
            return Err(ProcessBlockError::AlreadyProcessed(block.id));
        }

        if !self.delegates.validate_block_slot(&block).await? {
            self.delegates
                .fork(&block, ForkCause::WrongSlotDelegate)
                .await;
            warn!(id = %block.id, "Block forged outside its delegate's slot");
            return Err(ProcessBlockError::InvalidSlotDelegate(block.id));
        }

        // Pool mutations and block application must not interleave.
        self.mempool.lock();
        let applied = self.apply_locked(&block, save).await;
        self.mempool.unlock();
        applied?;

        self.verifier.on_new_block(block.id);
        *self.last_block.write() = block.clone();
        self.mempool.reshuffle();

        if broadcast {
            self.bus
                .publish(NodeEvent::BlockApplied {
                    id: block.id,
                    height: block.height,
                })
                .await;
        }
        info!(
            id = %block.id,
            height = block.height,
            transactions = block.transactions.len(),
            "Block applied"
        );
        Ok(block)
    }

    /// Confirmed-transaction checks, application, and pool removal. Runs
    /// with the mempool gated.
    async fn apply_locked(&self, block: &Block, save: bool) -> Result<()> {
        for trs in &block.transactions {
            if self.repository.is_transaction_confirmed(&trs.id).await? {
                self.delegates
                    .fork(block, ForkCause::DuplicateConfirmed)
                    .await;
                self.mempool.remove_transaction(trs.id).await;
                warn!(id = %trs.id, "Block carries an already-confirmed transaction");
                return Err(ProcessBlockError::DuplicateConfirmedTransaction(trs.id));
            }
        }

        self.repository.apply_block(block, save).await?;

        for trs in &block.transactions {
            if self.mempool.remove_transaction(trs.id).await {
                debug!(id = %trs.id, "Removed applied transaction from pool");
            }
        }
        Ok(())
    }

    /// Schema-level normalization of a relayed block: derived fields are
    /// recomputed, never trusted.
    fn normalize(block: &mut Block) {
        for trs in &mut block.transactions {
            trs.sender_address = Address::from_public_key(&trs.sender_public_key);
        }
    }
}
