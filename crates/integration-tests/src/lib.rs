//! # Integration Tests Crate
//!
//! Cross-subsystem tests wiring the real admission service, the real block
//! processor and the shared bus together over in-memory ports.
//!
//! ## Structure
//!
//! ```text
//! integration-tests/
//! └── src/
//!     ├── lib.rs            # This file + the node harness
//!     ├── admission_flow.rs # submit → verify → pool scenarios
//!     └── block_flow.rs     # pool → block → apply → feedback scenarios
//! ```
//!
//! The harness runs a complete single node: `MempoolService` with its
//! queue worker, `BlockProcessor` with the `MempoolGateway` feedback
//! adapter, one event bus and one session registry.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

#[cfg(test)]
mod admission_flow;
#[cfg(test)]
mod block_flow;

pub mod harness {
    //! Single-node wiring over in-memory ports.

    use ddk_block_verify::testing::{genesis_block, InMemoryChain};
    use ddk_block_verify::{BlockProcessor, MempoolGateway, VerifyConfig};
    use ddk_mempool::ports::{AccountsRepo, TimeSource, TransactionLogic};
    use ddk_mempool::testing::{InMemoryLedger, ManualClock};
    use ddk_mempool::{MempoolConfig, MempoolService};
    use shared_bus::{AccountSessions, EventPublisher, InMemoryEventBus};
    use shared_crypto::KeyPair;
    use shared_types::constants::{EPOCH_TIME_UNIX, SLOT_INTERVAL_SECS};
    use shared_types::entities::Block;
    use std::sync::Arc;

    /// A fully wired single node.
    pub struct TestNode {
        /// The admission pipeline.
        pub mempool: Arc<MempoolService>,
        /// The block pipeline, feeding back into `mempool`.
        pub processor: Arc<BlockProcessor>,
        /// Accounts plus transaction logic.
        pub ledger: Arc<InMemoryLedger>,
        /// Block repository plus delegates module.
        pub chain: Arc<InMemoryChain>,
        /// The shared event bus.
        pub bus: Arc<InMemoryEventBus>,
        /// Per-account sessions.
        pub sessions: Arc<AccountSessions>,
        /// The node clock.
        pub clock: Arc<ManualClock>,
        /// The forging delegate's keypair.
        pub forger: KeyPair,
        /// The chain's genesis block.
        pub genesis: Block,
    }

    /// Start a node positioned one slot after its genesis block.
    pub fn start_node() -> TestNode {
        let forger = KeyPair::generate();
        let genesis = genesis_block(&forger);

        let ledger = Arc::new(InMemoryLedger::new());
        let chain = Arc::new(InMemoryChain::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let sessions = Arc::new(AccountSessions::new());
        let clock = Arc::new(ManualClock::at(
            EPOCH_TIME_UNIX + u64::from(genesis.timestamp) + SLOT_INTERVAL_SECS,
        ));

        let mempool = MempoolService::start(
            MempoolConfig::for_testing(),
            Arc::clone(&ledger) as Arc<dyn TransactionLogic>,
            Arc::clone(&ledger) as Arc<dyn AccountsRepo>,
            Arc::clone(&bus) as Arc<dyn EventPublisher>,
            Arc::clone(&sessions),
            Arc::clone(&clock) as Arc<dyn TimeSource>,
        );

        let processor = Arc::new(BlockProcessor::new(
            VerifyConfig::for_testing(),
            Arc::clone(&clock) as Arc<dyn TimeSource>,
            Arc::clone(&chain) as Arc<dyn ddk_block_verify::DelegatesPort>,
            Arc::clone(&chain) as Arc<dyn ddk_block_verify::BlockRepository>,
            Arc::new(MempoolGateway::new(Arc::clone(&mempool))),
            Arc::clone(&bus) as Arc<dyn EventPublisher>,
            genesis.clone(),
        ));

        TestNode {
            mempool,
            processor,
            ledger,
            chain,
            bus,
            sessions,
            clock,
            forger,
            genesis,
        }
    }

    /// Poll until `condition` holds or a test-sized deadline passes.
    pub async fn settle<F: Fn() -> bool>(condition: F) {
        for _ in 0..500 {
            if condition() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        panic!("condition not reached");
    }
}
