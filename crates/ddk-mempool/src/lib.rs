//! # Transaction Pool (Mempool) Subsystem
//!
//! Accepts transactions from users and peers, verifies them against the
//! current ledger state, holds them in a conflict-aware pool and hands
//! deterministically ordered batches to block production.
//!
//! ## Admission flow
//!
//! ```text
//! submit ──► Queue ──► verify ──► Pool ──► pop_sorted (block producer)
//!               │         │        ▲            │
//!               └► Conflicted ◄────┘            ▼
//!                       ▲            on block accept: remove applied
//!                       └─── reshuffle
//! ```
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  service.rs   - MempoolService: worker loop, Sequence jobs   │
//! └──────────────────────────────────────────────────────────────┘
//!                        ↑ uses ↑
//! ┌──────────────────────────────────────────────────────────────┐
//! │  ports/outbound.rs - TransactionLogic, AccountsRepo,         │
//! │                      TimeSource traits                       │
//! └──────────────────────────────────────────────────────────────┘
//!                        ↑ uses ↑
//! ┌──────────────────────────────────────────────────────────────┐
//! │  domain/pool.rs     - multi-index pool state                 │
//! │  domain/conflict.rs - account-scoped conflict rules          │
//! │  domain/queue.rs    - queue + conflicted parking state       │
//! │  domain/errors.rs   - MempoolError, VerifyFailure            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//!
//! - A transaction in the pool is indexed by id, by sender, and (for
//!   `Send`) by recipient; the secondary indexes never disagree with the
//!   primary.
//! - Everything in the pool carries status `UnconfirmApplied`: its balance
//!   effects are already deducted from the sender's unconfirmed balance.
//! - Within one account, pool order equals canonical order: the conflict
//!   detector refuses any candidate a pending sibling would overtake.
//! - A transaction never sits in the queue and the pool at once.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod config;
pub mod domain;
pub mod ports;
pub mod service;
pub mod testing;

pub use config::MempoolConfig;
pub use domain::{
    is_potential_conflict, MempoolError, TransactionPool, TransactionQueue, VerifyFailure,
};
pub use ports::{AccountsRepo, SystemTimeSource, TimeSource, TransactionLogic};
pub use service::{LockStatus, MempoolService, PoolStatus};
