//! # Shared Types Crate
//!
//! Domain entities and shared runtime primitives for the DDK node.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every cross-crate type (transactions,
//!   blocks, accounts, consensus constants) is defined here.
//! - **Consensus surfaces are explicit**: the canonical byte layouts live
//!   on the entities, the canonical ordering in [`ordering`], and the chain
//!   parameters in [`constants`]. Each is documented as such at the
//!   definition site.
//! - **Shared primitives over per-crate copies**: the [`sequence`] worker
//!   used to serialize pool mutations lives here so every subsystem shares
//!   one implementation.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod constants;
pub mod entities;
pub mod ordering;
pub mod sequence;

pub use entities::{
    Account, Address, Block, BlockId, Hash, PublicKey, Signature, Transaction, TransactionAsset,
    TransactionId, TransactionStatus, TransactionType,
};
pub use ordering::{cmp_canonical, orders_last, sort_canonical};
pub use sequence::{Sequence, SequenceClosed, DEFAULT_WARNING_LIMIT};
