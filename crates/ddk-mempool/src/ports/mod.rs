//! Ports: the mempool's dependencies on the rest of the node.

pub mod outbound;

pub use outbound::{AccountsRepo, SystemTimeSource, TimeSource, TransactionLogic};
