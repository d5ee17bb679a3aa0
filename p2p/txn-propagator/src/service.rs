//! # Propagator Service
//!
//! A [`tower::Service`] handle to a [`TxnPropagator`](crate::TxnPropagator), for code that would rather talk to
//! the propagator through a service than hold a reference to it.
use std::{
    convert::Infallible,
    future::{ready, Ready},
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use tower::Service;

use crate::{
    propagator::Shared,
    traits::{ConnectionManager, TxPool},
    SendingDescriptor,
};

/// A request to the [`TxnPropagatorSvc`].
pub enum PropagatorRequest<TxId, Tx> {
    /// Queue a transaction for the next propagation run, see [`TxnPropagator::submit`](crate::TxnPropagator::submit).
    Submit(SendingDescriptor<TxId, Tx>),
    /// Stop propagating these transactions, see [`TxnPropagator::retract`](crate::TxnPropagator::retract).
    Retract(Vec<SendingDescriptor<TxId, Tx>>),
    /// Get the number of queued transactions.
    ///
    /// Returns [`PropagatorResponse::Length`].
    Length,
    /// Get the current run frequency.
    ///
    /// Returns [`PropagatorResponse::RunFrequency`].
    RunFrequency,
    /// Set the run frequency, waking the propagation thread.
    SetRunFrequency(Duration),
}

/// A response from the [`TxnPropagatorSvc`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PropagatorResponse {
    /// A generic ok response.
    Ok,
    /// The number of queued transactions.
    Length(usize),
    /// The current run frequency.
    RunFrequency(Duration),
}

/// A cloneable [`Service`] handle to a [`TxnPropagator`](crate::TxnPropagator).
///
/// Requests are handled inline, [`PropagatorRequest::Retract`] will block on the pool's lock.
///
/// This handle does not keep the propagation thread alive, once the [`TxnPropagator`](crate::TxnPropagator)
/// is dropped submitted transactions are never propagated.
pub struct TxnPropagatorSvc<P: TxPool, C> {
    shared: Arc<Shared<P, C>>,
}

impl<P: TxPool, C> TxnPropagatorSvc<P, C> {
    pub(crate) const fn new(shared: Arc<Shared<P, C>>) -> Self {
        Self { shared }
    }
}

impl<P: TxPool, C> Clone for TxnPropagatorSvc<P, C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P, C> Service<PropagatorRequest<P::TxId, P::Tx>> for TxnPropagatorSvc<P, C>
where
    P: TxPool,
    C: ConnectionManager<P::TxId, P::Tx>,
{
    type Response = PropagatorResponse;
    type Error = Infallible;
    type Future = Ready<Result<PropagatorResponse, Infallible>>;

    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: PropagatorRequest<P::TxId, P::Tx>) -> Self::Future {
        let res = match req {
            PropagatorRequest::Submit(txn) => {
                self.shared.submit(txn);
                PropagatorResponse::Ok
            }
            PropagatorRequest::Retract(txns) => {
                self.shared.retract(txns);
                PropagatorResponse::Ok
            }
            PropagatorRequest::Length => PropagatorResponse::Length(self.shared.len()),
            PropagatorRequest::RunFrequency => {
                PropagatorResponse::RunFrequency(self.shared.run_frequency())
            }
            PropagatorRequest::SetRunFrequency(run_frequency) => {
                self.shared.set_run_frequency(run_frequency);
                PropagatorResponse::Ok
            }
        };

        ready(Ok(res))
    }
}
