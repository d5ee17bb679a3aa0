//! The queue lock and the pool lock.
//!
//! The queue lock must always be taken before the pool lock. The only way to hold both here is
//! [`LockedQueue::and_pool`], which takes the pool lock from an already held queue lock.
use std::{
    ops::{Deref, DerefMut},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use crate::{traits::TxPool, PoolDescriptor};

/// The state behind the queue lock.
pub(crate) struct PendingTxns<P: TxPool> {
    /// Transactions waiting for the next propagation run, in submission order until sorted.
    pub(crate) txns: Vec<PoolDescriptor<P>>,
    /// The [`Duration`] between propagation runs.
    pub(crate) run_frequency: Duration,
    /// Set once the propagation thread has exited, after which nothing can drain [`PendingTxns::txns`].
    pub(crate) thread_exited: bool,
    /// Whether we have already warned about a submission being dropped.
    pub(crate) warned_dropped: bool,
}

/// Owns the queue lock and a handle to the pool.
pub(crate) struct LockHierarchy<P: TxPool> {
    queue: Mutex<PendingTxns<P>>,
    pool: Arc<P>,
}

impl<P: TxPool> LockHierarchy<P> {
    pub(crate) const fn new(pool: Arc<P>, run_frequency: Duration) -> Self {
        Self {
            queue: Mutex::new(PendingTxns {
                txns: Vec::new(),
                run_frequency,
                thread_exited: false,
                warned_dropped: false,
            }),
            pool,
        }
    }

    /// Lock the queue.
    ///
    /// A poisoned lock is recovered, the queue is always left in a valid state.
    pub(crate) fn queue(&self) -> LockedQueue<'_, P> {
        LockedQueue {
            guard: self.queue.lock().unwrap_or_else(PoisonError::into_inner),
            pool: &self.pool,
        }
    }

    /// Lock only the pool.
    ///
    /// Do not lock the queue while holding the returned guard.
    pub(crate) fn pool(&self) -> P::Guard<'_> {
        self.pool.lock()
    }
}

/// The held queue lock.
pub(crate) struct LockedQueue<'a, P: TxPool> {
    guard: MutexGuard<'a, PendingTxns<P>>,
    pool: &'a P,
}

impl<'a, P: TxPool> LockedQueue<'a, P> {
    /// Take the pool lock as well.
    pub(crate) fn and_pool(self) -> QueueAndPool<'a, P> {
        let pool = self.pool.lock();

        QueueAndPool {
            pool,
            queue: self.guard,
        }
    }
}

impl<P: TxPool> Deref for LockedQueue<'_, P> {
    type Target = PendingTxns<P>;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<P: TxPool> DerefMut for LockedQueue<'_, P> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

/// Both locks, held together.
pub(crate) struct QueueAndPool<'a, P: TxPool> {
    // Fields drop in order, so the pool lock is released before the queue lock.
    pub(crate) pool: P::Guard<'a>,
    pub(crate) queue: MutexGuard<'a, PendingTxns<P>>,
}
