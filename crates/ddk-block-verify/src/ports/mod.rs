//! Ports: block processing's dependencies on the rest of the node.

pub mod outbound;

pub use outbound::{BlockRepository, DelegatesPort, MempoolPort};
