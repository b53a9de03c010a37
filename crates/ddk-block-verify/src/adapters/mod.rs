//! Adapters binding the outbound ports to concrete subsystems.

pub mod mempool;

pub use mempool::MempoolGateway;
