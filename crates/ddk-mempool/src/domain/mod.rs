//! Domain layer: pool state, conflict rules, queue state, errors.

pub mod conflict;
pub mod errors;
pub mod pool;
pub mod queue;

pub use conflict::is_potential_conflict;
pub use errors::{render_failures, MempoolError, VerifyFailure};
pub use pool::TransactionPool;
pub use queue::{ConflictedEntry, ReshuffleOutcome, TransactionQueue};
