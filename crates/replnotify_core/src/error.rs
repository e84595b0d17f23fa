//! Error types for the event notifier.

use crate::types::ReplicatorHandle;
use thiserror::Error;

/// Result type for notifier operations.
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Errors that can occur while registering observers or dispatching events.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The handle already has an active observer.
    #[error("replicator {handle} already has a registered observer")]
    AlreadyRegistered {
        /// Handle that was being registered.
        handle: ReplicatorHandle,
    },

    /// An event arrived for a handle with no active registration.
    #[error("no observer registered for replicator {handle}")]
    UnknownHandle {
        /// Handle the event was raised for.
        handle: ReplicatorHandle,
    },

    /// The observer panicked while handling an event.
    #[error("observer for replicator {handle} panicked: {message}")]
    ObserverPanicked {
        /// Handle the event was raised for.
        handle: ReplicatorHandle,
        /// Panic payload, if it was a string.
        message: String,
    },

    /// The queued dispatcher could not be started.
    #[error("dispatcher error: {0}")]
    Dispatcher(String),
}

impl NotifyError {
    /// Returns the replicator handle the error relates to, if any.
    pub fn handle(&self) -> Option<ReplicatorHandle> {
        match self {
            NotifyError::AlreadyRegistered { handle }
            | NotifyError::UnknownHandle { handle }
            | NotifyError::ObserverPanicked { handle, .. } => Some(*handle),
            NotifyError::Dispatcher(_) => None,
        }
    }
}
