use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use futures::{channel::oneshot, FutureExt};

/// Why the propagation thread exited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// [`TxnPropagator::shutdown`](crate::TxnPropagator::shutdown) was called, or the propagator was dropped.
    Shutdown,
    /// A propagation run failed unexpectedly, the propagation thread stopped.
    ///
    /// Transactions are no longer propagated by this propagator, the rest of the node is unaffected.
    Failed(String),
}

/// A future that resolves once the propagation thread has exited.
///
/// Returned from [`TxnPropagator::take_exit_signal`](crate::TxnPropagator::take_exit_signal).
#[derive(Debug)]
pub struct PropagatorExit(oneshot::Receiver<ExitReason>);

impl PropagatorExit {
    /// Creates the sender/receiver pair, the sender is given to the propagation thread.
    pub(crate) fn new() -> (oneshot::Sender<ExitReason>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self(rx))
    }
}

impl Future for PropagatorExit {
    type Output = ExitReason;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.0.poll_unpin(cx).map(|res| {
            res.unwrap_or_else(|_| {
                ExitReason::Failed("propagation thread exited without reporting why".to_string())
            })
        })
    }
}
