//! # Node Events
//!
//! Defines the events that flow through the shared bus. Publishing is
//! fire-and-forget; every consumer subscribes with a topic filter.

use serde::{Deserialize, Serialize};
use shared_types::entities::{BlockId, Transaction};

/// All events that can be published to the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeEvent {
    // =========================================================================
    // POOL
    // =========================================================================
    /// A transaction passed verification and now sits in the pool with its
    /// unconfirmed effects applied. Broadcast relays pick this up.
    TransactionPutInPool(Box<Transaction>),

    // =========================================================================
    // CHAIN
    // =========================================================================
    /// A block passed verification and was applied to the ledger.
    BlockApplied {
        /// The applied block's id.
        id: BlockId,
        /// The applied block's height.
        height: u64,
    },

    /// The node finished loading and the chain tip is usable.
    BlockchainReady {
        /// Height of the current tip.
        height: u64,
    },
}

/// Coarse routing key for subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTopic {
    /// Mempool lifecycle events.
    Pool,
    /// Block lifecycle events.
    Chain,
}

impl NodeEvent {
    /// The topic this event routes under.
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::TransactionPutInPool(_) => EventTopic::Pool,
            Self::BlockApplied { .. } | Self::BlockchainReady { .. } => EventTopic::Chain,
        }
    }
}

/// Subscription filter over topics.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to receive; empty means all.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Match every event.
    #[must_use]
    pub fn all() -> Self {
        Self { topics: Vec::new() }
    }

    /// Match only the given topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Whether an event passes this filter.
    #[must_use]
    pub fn matches(&self, event: &NodeEvent) -> bool {
        self.topics.is_empty() || self.topics.contains(&event.topic())
    }
}
