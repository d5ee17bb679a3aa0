//! The ordering policy.
//!
//! Transactions are ordered by the pool, with ties broken by ID. Everything here reads pool state, so must
//! only be called while holding the pool's lock.
use std::cmp::Ordering;

use itertools::{EitherOrBoth, Itertools};

use crate::{traits::PoolView, SendingDescriptor};

/// Compares two descriptors under the pool's order.
pub(crate) fn compare<TxId: Ord, Tx>(
    view: &impl PoolView<TxId>,
    a: &SendingDescriptor<TxId, Tx>,
    b: &SendingDescriptor<TxId, Tx>,
) -> Ordering {
    view.compare(a.tx_id(), b.tx_id())
        .then_with(|| a.tx_id().cmp(b.tx_id()))
}

/// Sorts the descriptors under the pool's order and removes any duplicates.
pub(crate) fn sort_dedup<TxId: Ord, Tx>(
    txns: &mut Vec<SendingDescriptor<TxId, Tx>>,
    view: &impl PoolView<TxId>,
) {
    txns.sort_by(|a, b| compare(view, a, b));
    txns.dedup_by(|a, b| compare(view, a, b).is_eq());
}

/// Returns the descriptors in `pending` that are not in `removal`.
///
/// Both inputs must have gone through [`sort_dedup`] with the same view.
pub(crate) fn sorted_difference<TxId: Ord, Tx>(
    pending: Vec<SendingDescriptor<TxId, Tx>>,
    removal: &[SendingDescriptor<TxId, Tx>],
    view: &impl PoolView<TxId>,
) -> Vec<SendingDescriptor<TxId, Tx>> {
    pending
        .into_iter()
        .merge_join_by(removal, |p, r| compare(view, p, *r))
        .filter_map(|merged| match merged {
            EitherOrBoth::Left(p) => Some(p),
            EitherOrBoth::Both(_, _) | EitherOrBoth::Right(_) => None,
        })
        .collect()
}
