use std::time::Duration;

/// The default [`Duration`] between propagation runs.
pub const DEFAULT_RUN_FREQUENCY: Duration = Duration::from_secs(1);

/// The smallest run frequency allowed, anything lower has the propagation thread spinning.
pub const MIN_RUN_FREQUENCY: Duration = Duration::from_millis(1);

/// The name of the propagation thread.
pub(crate) const PROPAGATOR_THREAD_NAME: &str = "cuprate-txn-propagator";
