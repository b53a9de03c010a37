//! # Canonical Transaction Ordering
//!
//! The single comparator behind queue ordering, conflict resolution, block
//! packaging and pool queries. Two nodes sorting the same transaction set
//! MUST produce identical sequences, so the key is derived from transaction
//! content alone, never from arrival time.
//!
//! Key, ascending: `(type discriminant, timestamp, amount descending, id)`.
//! The id tie-break makes the order strict and total. Changing this key is a
//! hard fork.

use crate::entities::Transaction;
use std::cmp::Ordering;

/// Compare two transactions under the canonical order.
pub fn cmp_canonical(a: &Transaction, b: &Transaction) -> Ordering {
    a.tx_type
        .discriminant()
        .cmp(&b.tx_type.discriminant())
        .then_with(|| a.timestamp.cmp(&b.timestamp))
        .then_with(|| b.amount.cmp(&a.amount))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort a slice of transactions in place, canonically ascending.
pub fn sort_canonical(transactions: &mut [Transaction]) {
    transactions.sort_by(cmp_canonical);
}

/// True iff `candidate` orders after every element of `pending`.
///
/// This is the conflict-resolution question: an account's candidate is
/// admissible only when nothing already pending would overtake it.
pub fn orders_last<'a, I>(candidate: &Transaction, pending: I) -> bool
where
    I: IntoIterator<Item = &'a Transaction>,
{
    pending
        .into_iter()
        .all(|other| cmp_canonical(candidate, other) == Ordering::Greater)
}
