//! Domain layer: the check pipeline and its supporting arithmetic.

pub mod reward;
pub mod ring;
pub mod slots;
pub mod verifier;

pub use reward::calc_reward;
pub use ring::BlockIdRing;
pub use verifier::{BlockVerifier, ForkCause, VerifySummary};
