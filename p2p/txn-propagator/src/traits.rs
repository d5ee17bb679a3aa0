//! The traits the [`TxnPropagator`](crate::TxnPropagator) needs its collaborators to implement.
use std::{cmp::Ordering, fmt, sync::Arc};

pub use tower::BoxError;

use crate::SendingDescriptor;

/// The shared transaction pool.
///
/// The pool is also locked by the rest of the node, the [`TxnPropagator`](crate::TxnPropagator) only holds
/// the lock for the duration of a single sort or fan-out.
pub trait TxPool: Send + Sync + 'static {
    /// The transaction ID type.
    type TxId: Ord + Clone + fmt::Debug + Send + Sync + 'static;
    /// The transaction type.
    type Tx: Send + Sync + 'static;
    /// The guard returned from [`TxPool::lock`], the pool's lock is held until this is dropped.
    type Guard<'a>: PoolView<Self::TxId>
    where
        Self: 'a;

    /// Lock the pool.
    ///
    /// This may block until other users of the pool release the lock.
    fn lock(&self) -> Self::Guard<'_>;
}

/// A view of the pool, only available while the pool is locked.
pub trait PoolView<TxId> {
    /// Order two transactions by their position in the pool, for example their topological order.
    ///
    /// This must be a total order and must be consistent for IDs the pool no longer holds, returning
    /// [`Ordering::Equal`] for different IDs is fine, they will be ordered by ID.
    fn compare(&self, a: &TxId, b: &TxId) -> Ordering;
}

/// A connected peer's record of which transactions it should be told about.
pub trait PeerInventory<TxId, Tx>: fmt::Debug + Send + Sync {
    /// Record these transactions as announceable to this peer.
    ///
    /// The transactions are sorted by the pool's order and free of duplicates.
    fn add_pending(&self, txns: &[SendingDescriptor<TxId, Tx>]) -> Result<(), BoxError>;

    /// Remove these transactions from the set waiting to be announced to this peer.
    ///
    /// Transactions that were never added must be ignored.
    fn remove_pending(&self, txns: &[SendingDescriptor<TxId, Tx>]) -> Result<(), BoxError>;
}

impl<TxId, Tx, T: PeerInventory<TxId, Tx> + ?Sized> PeerInventory<TxId, Tx> for Arc<T> {
    fn add_pending(&self, txns: &[SendingDescriptor<TxId, Tx>]) -> Result<(), BoxError> {
        T::add_pending(self, txns)
    }

    fn remove_pending(&self, txns: &[SendingDescriptor<TxId, Tx>]) -> Result<(), BoxError> {
        T::remove_pending(self, txns)
    }
}

/// The connection manager, the owner of the set of connected peers.
pub trait ConnectionManager<TxId, Tx>: Send + Sync + 'static {
    /// A handle to a connected peer.
    type Peer: PeerInventory<TxId, Tx>;

    /// Returns a snapshot of the currently connected peers.
    ///
    /// The snapshot is only kept for a single fan-out.
    fn connected_peers(&self) -> Vec<Self::Peer>;
}
