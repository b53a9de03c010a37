//! # Block Verification Subsystem
//!
//! Validates blocks before they touch ledger state and orchestrates the
//! apply path, including the feedback edge that evicts applied
//! transactions from the mempool.
//!
//! ## Pipeline
//!
//! ```text
//! peer ──► verify_receipt ──► process_block
//!                               │  verify_block
//!                               │  slot delegate check   (fork 3)
//!                               │  confirmed-tx check    (fork 2)
//!                               │  apply + save
//!                               └► mempool: remove applied, reshuffle
//! ```
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  adapters/mempool.rs - MempoolGateway over the running pool   │
//! └───────────────────────────────────────────────────────────────┘
//!                        ↑ implements ↑
//! ┌───────────────────────────────────────────────────────────────┐
//! │  ports/outbound.rs - DelegatesPort, BlockRepository,          │
//! │                      MempoolPort                              │
//! └───────────────────────────────────────────────────────────────┘
//!                        ↑ uses ↑
//! ┌───────────────────────────────────────────────────────────────┐
//! │  domain/verifier.rs - check pipeline, fork causes             │
//! │  domain/slots.rs    - forging slot arithmetic                 │
//! │  domain/reward.rs   - milestone reward schedule               │
//! │  domain/ring.rs     - recent block id window                  │
//! └───────────────────────────────────────────────────────────────┘
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;
pub mod testing;

pub use adapters::MempoolGateway;
pub use config::VerifyConfig;
pub use domain::{calc_reward, BlockIdRing, BlockVerifier, ForkCause, VerifySummary};
pub use error::{ProcessBlockError, Result};
pub use ports::{BlockRepository, DelegatesPort, MempoolPort};
pub use service::BlockProcessor;
