use std::any::Any;

/// An error starting the [`TxnPropagator`](crate::TxnPropagator).
#[derive(thiserror::Error, Debug)]
pub enum TxnPropagatorError {
    /// The OS refused to spawn the propagation thread.
    #[error("Failed to spawn the propagation thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

/// Turns a panic payload into something we can log.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
