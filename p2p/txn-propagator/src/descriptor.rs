use std::{fmt, sync::Arc};

use crate::traits::TxPool;

/// The [`SendingDescriptor`] for a given [`TxPool`].
pub type PoolDescriptor<P> = SendingDescriptor<<P as TxPool>::TxId, <P as TxPool>::Tx>;

/// A transaction waiting to be announced to peers.
///
/// Two descriptors are equal if they have the same transaction ID, there is no intrinsic ordering,
/// descriptors are only ever ordered by the tx-pool, see [`PoolView`](crate::traits::PoolView).
pub struct SendingDescriptor<TxId, Tx> {
    /// The transaction's ID.
    tx_id: TxId,
    /// The transaction.
    tx: Arc<Tx>,
}

impl<TxId, Tx> SendingDescriptor<TxId, Tx> {
    /// Creates a new [`SendingDescriptor`].
    pub const fn new(tx_id: TxId, tx: Arc<Tx>) -> Self {
        Self { tx_id, tx }
    }

    /// The transaction's ID.
    pub const fn tx_id(&self) -> &TxId {
        &self.tx_id
    }

    /// The transaction.
    pub const fn tx(&self) -> &Arc<Tx> {
        &self.tx
    }
}

// Manual impls so `Tx` does not need to be `Clone`/`Debug`.
impl<TxId: Clone, Tx> Clone for SendingDescriptor<TxId, Tx> {
    fn clone(&self) -> Self {
        Self {
            tx_id: self.tx_id.clone(),
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<TxId: fmt::Debug, Tx> fmt::Debug for SendingDescriptor<TxId, Tx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendingDescriptor")
            .field("tx_id", &self.tx_id)
            .finish_non_exhaustive()
    }
}

impl<TxId: PartialEq, Tx> PartialEq for SendingDescriptor<TxId, Tx> {
    fn eq(&self, other: &Self) -> bool {
        self.tx_id == other.tx_id
    }
}

impl<TxId: Eq, Tx> Eq for SendingDescriptor<TxId, Tx> {}
