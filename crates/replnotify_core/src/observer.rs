//! The observer capability.

use crate::types::{DocumentEnded, ReplicatorHandle, ReplicatorStatus};

/// Receives replication events for one registered replicator.
///
/// Callbacks are invoked from whichever thread raised the event (or from the
/// dispatcher thread in queued mode), never concurrently for the same
/// registration. A slow handler delays later events for its own replicator;
/// in queued mode it delays every replicator.
///
/// Handlers may call back into the notifier, including unregistering their
/// own or another registration. An `unregister` made from inside a handler
/// does not wait for a callback running on another thread; that callback may
/// still finish, but no later one starts.
pub trait ReplicatorObserver<C>: Send + Sync {
    /// Called whenever the aggregate status of `replicator` changes.
    fn on_status_changed(&self, replicator: ReplicatorHandle, status: &ReplicatorStatus, context: &C);

    /// Called once per document whose push or pull attempt finished.
    ///
    /// When `event.transient` is set, the core retries the failure itself.
    fn on_document_ended(&self, replicator: ReplicatorHandle, event: &DocumentEnded, context: &C);
}

impl<C, T> ReplicatorObserver<C> for std::sync::Arc<T>
where
    T: ReplicatorObserver<C> + ?Sized,
{
    fn on_status_changed(&self, replicator: ReplicatorHandle, status: &ReplicatorStatus, context: &C) {
        (**self).on_status_changed(replicator, status, context);
    }

    fn on_document_ended(&self, replicator: ReplicatorHandle, event: &DocumentEnded, context: &C) {
        (**self).on_document_ended(replicator, event, context);
    }
}
