//! # Transaction Propagator
//!
//! This module contains [`TxnPropagator`], which owns the pending queue and the propagation thread.
//!
//! The propagation thread waits for the run frequency to pass (or to be woken up early), then hands
//! every queued transaction to every connected peer while holding the pool's lock.
use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc, Mutex, PoisonError,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam::channel::{self, Receiver, Sender};
use futures::channel::oneshot;

use crate::{
    constants::{MIN_RUN_FREQUENCY, PROPAGATOR_THREAD_NAME},
    error::panic_message,
    exit::{ExitReason, PropagatorExit},
    fan_out::FanOut,
    locks::{LockHierarchy, QueueAndPool},
    ordering,
    service::TxnPropagatorSvc,
    traits::{ConnectionManager, PeerInventory, TxPool},
    PoolDescriptor, TxnPropagatorConfig, TxnPropagatorError,
};

/// The lifecycle of the propagation thread.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    /// The propagation thread is running, or has exited after a failure.
    Running = 0,
    /// [`TxnPropagator::shutdown`] has been called and the thread is being joined.
    Stopping = 1,
    /// The propagation thread has exited and been joined.
    Stopped = 2,
}

impl LifecycleState {
    const fn from_u8(state: u8) -> Self {
        match state {
            0 => Self::Running,
            1 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// A reason to wake the propagation thread early.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Wake {
    /// The run frequency changed, re-check the queue and start waiting with the new frequency.
    RunFrequencyChanged,
    /// We are shutting down.
    Shutdown,
}

/// State shared between the [`TxnPropagator`], its service handles and the propagation thread.
pub(crate) struct Shared<P: TxPool, C> {
    locks: LockHierarchy<P>,
    connections: Arc<C>,
    fan_out: FanOut,
    /// A [`LifecycleState`].
    state: AtomicU8,
    wake: Sender<Wake>,
}

impl<P, C> Shared<P, C>
where
    P: TxPool,
    C: ConnectionManager<P::TxId, P::Tx>,
{
    pub(crate) fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    pub(crate) fn submit(&self, txn: PoolDescriptor<P>) {
        let mut queue = self.locks.queue();

        if queue.thread_exited {
            if !queue.warned_dropped {
                queue.warned_dropped = true;
                tracing::warn!("Propagation thread has exited, dropping submitted transactions.");
            }
            return;
        }

        queue.txns.push(txn);
    }

    pub(crate) fn len(&self) -> usize {
        self.locks.queue().txns.len()
    }

    pub(crate) fn run_frequency(&self) -> Duration {
        self.locks.queue().run_frequency
    }

    pub(crate) fn set_run_frequency(&self, run_frequency: Duration) {
        let run_frequency = run_frequency.max(MIN_RUN_FREQUENCY);

        let mut queue = self.locks.queue();
        queue.run_frequency = run_frequency;

        // Wake the propagation thread so the new frequency is used straight away.
        if self.wake.send(Wake::RunFrequencyChanged).is_err() {
            tracing::debug!("Propagation thread has exited, run frequency change will have no effect.");
        }
        drop(queue);

        tracing::debug!("Transaction propagation run frequency set to {run_frequency:?}.");
    }

    pub(crate) fn retract(&self, mut txns: Vec<PoolDescriptor<P>>) {
        if txns.is_empty() {
            return;
        }

        tracing::debug!("Purging {} transactions.", txns.len());

        // Both sides of the difference must be sorted under the same view of the pool.
        {
            let QueueAndPool { pool, mut queue } = self.locks.queue().and_pool();

            ordering::sort_dedup(&mut txns, &pool);

            let mut pending = std::mem::take(&mut queue.txns);
            ordering::sort_dedup(&mut pending, &pool);
            queue.txns = ordering::sorted_difference(pending, &txns, &pool);

            drop(pool);
        }

        // Remove from every peer's pending set, holding the pool lock until all peers are done.
        let pool = self.locks.pool();
        let peers = self.connections.connected_peers();
        self.fan_out
            .scatter_gather(&peers, "remove pending transactions", |peer| {
                peer.remove_pending(&txns)
            });
        drop(pool);
    }

    /// Hands every queued transaction to every connected peer, then clears the queue.
    fn propagate_pending(&self) {
        let queue = self.locks.queue();
        if !self.is_running() || queue.txns.is_empty() {
            return;
        }

        tracing::debug!("Got {} new transactions.", queue.txns.len());

        let QueueAndPool { pool, mut queue } = queue.and_pool();

        ordering::sort_dedup(&mut queue.txns, &pool);

        let batch = queue.txns.as_slice();
        let peers = self.connections.connected_peers();
        self.fan_out
            .scatter_gather(&peers, "add pending transactions", |peer| {
                peer.add_pending(batch)
            });

        // Every peer is done, the pool can change again.
        drop(pool);

        queue.txns.clear();
    }
}

/// The transaction propagator.
///
/// Queues transactions given to [`TxnPropagator::submit`] and hands them to every connected peer each
/// run, see the [crate docs](crate).
///
/// Dropping this will shut down the propagation thread, discarding any queued transactions.
pub struct TxnPropagator<P: TxPool, C> {
    shared: Arc<Shared<P, C>>,
    /// The propagation thread, [`None`] once joined.
    thread: Mutex<Option<JoinHandle<()>>>,
    /// The exit signal, [`None`] once taken.
    exit: Mutex<Option<PropagatorExit>>,
}

impl<P, C> TxnPropagator<P, C>
where
    P: TxPool,
    C: ConnectionManager<P::TxId, P::Tx>,
{
    /// Creates a new [`TxnPropagator`], spawning the propagation thread.
    pub fn new(
        config: TxnPropagatorConfig,
        pool: Arc<P>,
        connections: Arc<C>,
    ) -> Result<Self, TxnPropagatorError> {
        let (wake_tx, wake_rx) = channel::unbounded();
        let (exit_tx, exit) = PropagatorExit::new();

        let shared = Arc::new(Shared {
            locks: LockHierarchy::new(pool, config.initial_run_frequency()),
            connections,
            fan_out: FanOut::new(config.fan_out_threads),
            state: AtomicU8::new(LifecycleState::Running as u8),
            wake: wake_tx,
        });

        let thread_shared = Arc::clone(&shared);
        let span = tracing::debug_span!("txn_propagator");

        let thread = thread::Builder::new()
            .name(PROPAGATOR_THREAD_NAME.into())
            .spawn(move || {
                let _guard = span.enter();
                propagation_thread(&thread_shared, &wake_rx, exit_tx);
            })?;

        Ok(Self {
            shared,
            thread: Mutex::new(Some(thread)),
            exit: Mutex::new(Some(exit)),
        })
    }

    /// Queue a transaction to be propagated on the next run.
    ///
    /// This does not wake the propagation thread. Once the propagation thread has exited, after
    /// [`TxnPropagator::shutdown`] or a failure reported through [`PropagatorExit`], the transaction is dropped.
    pub fn submit(&self, txn: PoolDescriptor<P>) {
        self.shared.submit(txn);
    }

    /// Stop propagating these transactions.
    ///
    /// They are removed from the queue and from every connected peer's set of transactions waiting to be announced.
    pub fn retract(&self, txns: Vec<PoolDescriptor<P>>) {
        self.shared.retract(txns);
    }

    /// The number of transactions waiting for the next run.
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Returns `true` if no transactions are waiting for the next run.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The [`Duration`] between propagation runs.
    pub fn run_frequency(&self) -> Duration {
        self.shared.run_frequency()
    }

    /// Set the [`Duration`] between propagation runs, values below [`MIN_RUN_FREQUENCY`] are raised to it.
    ///
    /// This wakes the propagation thread, so the new frequency takes effect immediately.
    pub fn set_run_frequency(&self, run_frequency: Duration) {
        self.shared.set_run_frequency(run_frequency);
    }

    /// The current [`LifecycleState`].
    pub fn state(&self) -> LifecycleState {
        self.shared.state()
    }

    /// Returns `true` until [`TxnPropagator::shutdown`] is called.
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Returns a [`PropagatorExit`] future, resolving once the propagation thread exits.
    ///
    /// This only returns [`Some`] the first time it is called.
    pub fn take_exit_signal(&self) -> Option<PropagatorExit> {
        self.exit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Returns a [`TxnPropagatorSvc`] handle to this propagator.
    pub fn service(&self) -> TxnPropagatorSvc<P, C> {
        TxnPropagatorSvc::new(Arc::clone(&self.shared))
    }
}

impl<P: TxPool, C> TxnPropagator<P, C> {
    /// Stop the propagation thread, blocking until it has exited.
    ///
    /// When called from the propagation thread itself, for example by a [`ConnectionManager`], this
    /// returns straight away and the state stays [`LifecycleState::Stopping`] until another caller joins the thread.
    ///
    /// Queued transactions are discarded. Calling this more than once, from any number of threads,
    /// is fine: the thread is only stopped once and every call returns after it has exited.
    pub fn shutdown(&self) {
        if self
            .shared
            .state
            .compare_exchange(
                LifecycleState::Running as u8,
                LifecycleState::Stopping as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            tracing::debug!("Shutting down the transaction propagator.");

            if self.shared.wake.send(Wake::Shutdown).is_err() {
                tracing::debug!("Propagation thread had already exited.");
            }
        }

        // Whoever holds this lock joins the thread, any other caller waits here until it has.
        let mut thread = self.thread.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = thread.take() {
            if handle.thread().id() == thread::current().id() {
                // Called from the propagation thread itself, it will exit once this returns.
                // The next caller from another thread joins it.
                *thread = Some(handle);
                return;
            }

            if handle.join().is_err() {
                tracing::error!("Propagation thread panicked while exiting.");
            }
        }

        self.shared
            .state
            .store(LifecycleState::Stopped as u8, Ordering::Release);
    }
}

impl<P: TxPool, C> Drop for TxnPropagator<P, C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The propagation thread's entry point.
fn propagation_thread<P, C>(
    shared: &Shared<P, C>,
    wake_rx: &Receiver<Wake>,
    exit_tx: oneshot::Sender<ExitReason>,
) where
    P: TxPool,
    C: ConnectionManager<P::TxId, P::Tx>,
{
    tracing::debug!("Transaction propagation thread starting.");

    let reason = match panic::catch_unwind(AssertUnwindSafe(|| propagation_loop(shared, wake_rx)))
    {
        Ok(()) => {
            tracing::debug!("Transaction propagation thread stopping.");
            ExitReason::Shutdown
        }
        Err(payload) => {
            let msg = panic_message(&*payload);
            tracing::error!("Unexpected failure in transaction propagation thread: {msg}");
            ExitReason::Failed(msg)
        }
    };

    {
        let mut queue = shared.locks.queue();
        queue.thread_exited = true;
        queue.txns = Vec::new();
    }

    if exit_tx.send(reason).is_err() {
        tracing::trace!("Nobody is waiting on the propagation exit signal.");
    }
}

fn propagation_loop<P, C>(shared: &Shared<P, C>, wake_rx: &Receiver<Wake>)
where
    P: TxPool,
    C: ConnectionManager<P::TxId, P::Tx>,
{
    while shared.is_running() {
        let run_frequency = shared.run_frequency();

        let wake = crossbeam::channel::select! {
            recv(wake_rx) -> wake => Some(wake.unwrap_or(Wake::Shutdown)),
            default(run_frequency) => None,
        };

        match wake {
            Some(Wake::Shutdown) => {
                tracing::trace!("Woken up to shut down.");
                return;
            }
            Some(Wake::RunFrequencyChanged) => tracing::trace!("Woken up by a run frequency change."),
            None => (),
        }

        shared.propagate_pending();
    }
}
