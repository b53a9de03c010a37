//! # Account Sessions
//!
//! Per-account delivery of admission outcomes. A wallet holding an open
//! session registers its address and receives a message on the
//! `pool/verify` channel for every transaction it submits, verified or
//! declined, with the reasons.
//!
//! Delivery is best-effort: an address without a registered session is a
//! silent no-op, and a session that stopped reading is dropped.

use serde::{Deserialize, Serialize};
use shared_types::entities::Address;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::mpsc;
use tracing::debug;

/// Channel name for admission outcome messages.
pub const VERIFY_CHANNEL: &str = "pool/verify";

/// Outcome of transaction verification, as delivered to the submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyNotification {
    /// Whether both verification phases passed.
    pub verified: bool,
    /// Failure reasons; empty when `verified`.
    pub errors: Vec<String>,
}

impl VerifyNotification {
    /// A passing outcome.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            verified: true,
            errors: Vec::new(),
        }
    }

    /// A failing outcome with reasons.
    #[must_use]
    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            verified: false,
            errors,
        }
    }
}

/// A message delivered to an account session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMessage {
    /// Logical channel, e.g. `pool/verify`.
    pub channel: String,
    /// The payload.
    pub payload: VerifyNotification,
}

/// Registry of open account sessions.
#[derive(Default)]
pub struct AccountSessions {
    channels: RwLock<HashMap<Address, mpsc::UnboundedSender<SessionMessage>>>,
}

impl AccountSessions {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for `address`, returning the receiving side.
    ///
    /// A second registration for the same address replaces the first; the
    /// old receiver sees its channel close.
    pub fn register(&self, address: Address) -> mpsc::UnboundedReceiver<SessionMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut channels) = self.channels.write() {
            channels.insert(address, tx);
        }
        debug!(%address, "Account session registered");
        rx
    }

    /// Send a `pool/verify` message to the session for `address`, if any.
    pub fn send_verify(&self, address: Address, payload: VerifyNotification) {
        let message = SessionMessage {
            channel: VERIFY_CHANNEL.to_string(),
            payload,
        };
        let stale = {
            let Ok(channels) = self.channels.read() else {
                return;
            };
            match channels.get(&address) {
                Some(tx) => tx.send(message).is_err(),
                None => false,
            }
        };
        if stale {
            // The receiver went away without deregistering.
            if let Ok(mut channels) = self.channels.write() {
                channels.remove(&address);
            }
            debug!(%address, "Dropped stale account session");
        }
    }

    /// Close the session for `address`.
    pub fn deregister(&self, address: Address) {
        if let Ok(mut channels) = self.channels.write() {
            channels.remove(&address);
        }
    }

    /// Number of open sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.read().map(|channels| channels.len()).unwrap_or(0)
    }

    /// Whether no sessions are open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
