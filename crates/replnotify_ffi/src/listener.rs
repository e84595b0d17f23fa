//! Adapts a C callback table to the observer trait.

use crate::types::{OwnedCDocument, OwnedCStatus, ReplNotifyListener};
use replnotify_core::{DocumentEnded, ReplicatorHandle, ReplicatorObserver, ReplicatorStatus};
use std::ffi::c_void;

/// The caller's `void*` context, passed back untouched.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FfiContext(pub(crate) *mut c_void);

// The pointer is never dereferenced on the Rust side; thread-safety of the
// pointee is the caller's contract.
unsafe impl Send for FfiContext {}
unsafe impl Sync for FfiContext {}

/// Observer that forwards to C function pointers.
pub(crate) struct CListener {
    listener: ReplNotifyListener,
}

impl CListener {
    pub(crate) fn new(listener: ReplNotifyListener) -> Self {
        Self { listener }
    }
}

impl ReplicatorObserver<FfiContext> for CListener {
    fn on_status_changed(&self, replicator: ReplicatorHandle, status: &ReplicatorStatus, context: &FfiContext) {
        let Some(callback) = self.listener.status_changed else {
            return;
        };
        let status = OwnedCStatus::new(status);
        unsafe { callback(replicator.as_u64(), status.raw(), context.0) };
    }

    fn on_document_ended(&self, replicator: ReplicatorHandle, event: &DocumentEnded, context: &FfiContext) {
        let Some(callback) = self.listener.document_ended else {
            return;
        };
        let doc = OwnedCDocument::new(event);
        unsafe {
            callback(
                replicator.as_u64(),
                event.pushing,
                doc.doc_id.as_ptr(),
                doc.rev_id.as_ptr(),
                event.flags.bits(),
                doc.error_ptr(),
                event.transient,
                context.0,
            );
        }
    }
}
