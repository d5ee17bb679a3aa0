//! Scatter/gather over a snapshot of the connected peers.
use std::{
    fmt,
    num::NonZeroUsize,
    panic::{self, AssertUnwindSafe},
};

use rayon::prelude::*;

use crate::{error::panic_message, traits::BoxError};

/// Runs an operation on every peer in parallel, returning once all peers are done.
pub(crate) struct FanOut {
    /// A dedicated thread-pool, if [`None`] the global rayon pool is used.
    thread_pool: Option<rayon::ThreadPool>,
}

impl FanOut {
    pub(crate) fn new(threads: Option<NonZeroUsize>) -> Self {
        let thread_pool = threads.and_then(|threads| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads.get())
                .thread_name(|i| format!("txn-fan-out-{i}"))
                .build()
                .inspect_err(|e| {
                    tracing::warn!("Failed to build fan-out thread-pool, using the global pool: {e}");
                })
                .ok()
        });

        Self { thread_pool }
    }

    /// Calls `op` on every peer, blocking until every call has returned.
    ///
    /// A peer returning an error or panicking only affects that peer.
    pub(crate) fn scatter_gather<Peer, F>(&self, peers: &[Peer], op_name: &str, op: F)
    where
        Peer: fmt::Debug + Sync,
        F: Fn(&Peer) -> Result<(), BoxError> + Sync,
    {
        if peers.is_empty() {
            tracing::trace!("No connected peers, skipping {op_name}.");
            return;
        }

        tracing::trace!("Running {op_name} on {} peers.", peers.len());

        let scatter = || {
            peers
                .par_iter()
                .for_each(|peer| run_on_peer(peer, op_name, &op));
        };

        match &self.thread_pool {
            Some(thread_pool) => thread_pool.install(scatter),
            None => scatter(),
        }
    }
}

/// Runs `op` on a single peer, containing any failure.
fn run_on_peer<Peer, F>(peer: &Peer, op_name: &str, op: &F)
where
    Peer: fmt::Debug,
    F: Fn(&Peer) -> Result<(), BoxError>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| op(peer))) {
        Ok(Ok(())) => (),
        Ok(Err(e)) => tracing::warn!(?peer, "Peer failed to {op_name}: {e}"),
        Err(payload) => tracing::warn!(
            ?peer,
            "Peer panicked during {op_name}: {}",
            panic_message(&*payload)
        ),
    }
}
