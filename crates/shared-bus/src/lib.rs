//! # Shared Bus - Event Bus for Inter-Subsystem Communication
//!
//! The admission pipeline and the block pipeline never call each other's
//! observers directly: pool and chain lifecycle events go over this bus,
//! and per-user admission outcomes go through [`AccountSessions`].
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │   Mempool    │    publish()       │  Broadcast / │
//! │              │ ──────┐            │  API layers  │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! Publishing is fire-and-forget: an event with no subscribers is dropped
//! with a warning, never buffered.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod sessions;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventTopic, NodeEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use sessions::{AccountSessions, SessionMessage, VerifyNotification, VERIFY_CHANNEL};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events buffered per subscriber before older events are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
