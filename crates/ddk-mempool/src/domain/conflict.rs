//! # Conflict Detector
//!
//! Decides whether a candidate transaction may coexist with an account's
//! pending set. Pure and read-only: it inspects pool indexes and produces a
//! verdict, never a mutation.
//!
//! The dependent set for a candidate is everything pending from or to its
//! sender address. Against that set:
//!
//! 1. Empty set: no conflict.
//! 2. `Signature`: always a conflict. An account must not rotate keys
//!    while anything of its is pending.
//! 3. `Vote` against a pending `Vote`: conflict.
//! 4. `Referral` against a pending `Referral`: conflict.
//! 5. Otherwise the candidate must order after every dependent under the
//!    canonical order; a pending sibling that would overtake it makes it a
//!    conflict.
//!
//! Rule 5 is what keeps per-account pool order equal to canonical order:
//! once admitted, a transaction is never overtaken by a later arrival.

use super::pool::TransactionPool;
use shared_types::entities::{Transaction, TransactionType};
use shared_types::ordering::orders_last;

/// Whether admitting `candidate` now could contradict the account's
/// pending transactions.
pub fn is_potential_conflict(candidate: &Transaction, pool: &TransactionPool) -> bool {
    let dependent = pool.dependent_set(candidate.sender_address);
    if dependent.is_empty() {
        return false;
    }

    match candidate.tx_type {
        TransactionType::Signature => true,
        TransactionType::Vote
            if dependent
                .iter()
                .any(|trs| trs.tx_type == TransactionType::Vote) =>
        {
            true
        }
        TransactionType::Referral
            if dependent
                .iter()
                .any(|trs| trs.tx_type == TransactionType::Referral) =>
        {
            true
        }
        _ => !orders_last(candidate, dependent.iter().copied()),
    }
}
