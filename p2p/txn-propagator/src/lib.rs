//! # Transaction Propagator
//!
//! This crate batches newly accepted transactions and announces them to every connected peer.
//!
//! Transactions are handed to the [`TxnPropagator`] as [`SendingDescriptor`]s, they are queued and every
//! [`run frequency`](TxnPropagatorConfig::run_frequency) a dedicated thread drains the queue and gives the whole
//! batch to every connected peer in parallel. The batch is handed out while holding the tx-pool's lock, so every
//! peer sees the transactions in the same, pool-derived, order.
//!
//! Transactions that are no longer eligible for propagation (mined, evicted, etc.) can be removed with
//! [`TxnPropagator::retract`], which drops them from the queue and asks every peer to forget about them.
//!
//! # Needed Types
//!
//! This crate does not own the tx-pool or the peer connections, it is generic over a few traits
//! found in [`traits`].
//!
//! ## Tx-Pool
//!
//! A type implementing [`TxPool`](traits::TxPool), which gives out a lock guard able to order transactions,
//! see [`PoolView`](traits::PoolView).
//!
//! ## Connection Manager
//!
//! A type implementing [`ConnectionManager`](traits::ConnectionManager), which returns a snapshot of the currently
//! connected peers. Each peer must implement [`PeerInventory`](traits::PeerInventory).
//!
//! # Lock Ordering
//!
//! The queue's own lock is always taken _before_ the tx-pool's lock. Code holding the tx-pool's lock must not call
//! back into the [`TxnPropagator`] from the same thread, this includes [`PeerInventory`](traits::PeerInventory)
//! implementations.
mod config;
mod constants;
mod descriptor;
mod error;
mod exit;
mod fan_out;
mod locks;
mod ordering;
mod propagator;
mod service;
#[cfg(test)]
mod tests;
pub mod traits;

pub use config::{RunFrequencyError, TxnPropagatorConfig};
pub use constants::{DEFAULT_RUN_FREQUENCY, MIN_RUN_FREQUENCY};
pub use descriptor::{PoolDescriptor, SendingDescriptor};
pub use error::TxnPropagatorError;
pub use exit::{ExitReason, PropagatorExit};
pub use propagator::{LifecycleState, TxnPropagator};
pub use service::{PropagatorRequest, PropagatorResponse, TxnPropagatorSvc};
