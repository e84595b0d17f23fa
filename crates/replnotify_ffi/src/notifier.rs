//! Notifier FFI functions.

use crate::error::{clear_last_error, ffi_catch, set_last_error, ReplNotifyResult};
use crate::listener::{CListener, FfiContext};
use crate::types::{req_str, ReplNotifyError, ReplNotifyListener, ReplNotifyNotifier, ReplNotifyStatus};
use replnotify_core::{
    EventNotifier, NotifierConfig, RegistrationId, ReplicatorHandle, RevisionFlags,
};
use std::ffi::{c_char, c_void};
use std::panic::AssertUnwindSafe;
use tracing::debug;

type Notifier = EventNotifier<FfiContext>;

/// Borrows the notifier behind an opaque handle.
///
/// # Safety
///
/// `handle` must be null or a pointer returned by `replnotify_notifier_new`.
unsafe fn notifier_ref<'a>(handle: *mut ReplNotifyNotifier) -> Option<&'a Notifier> {
    (handle as *const Notifier).as_ref()
}

/// Creates a notifier.
///
/// # Arguments
///
/// * `queued` - Deliver events from a dedicated dispatcher thread instead of
///   the calling thread
/// * `out_notifier` - Output pointer for the notifier handle
///
/// # Safety
///
/// `out_notifier` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn replnotify_notifier_new(
    queued: bool,
    out_notifier: *mut *mut ReplNotifyNotifier,
) -> ReplNotifyResult {
    clear_last_error();

    if out_notifier.is_null() {
        set_last_error("null pointer argument");
        return ReplNotifyResult::NullPointer;
    }

    ffi_catch(AssertUnwindSafe(|| {
        let config = if queued {
            NotifierConfig::queued()
        } else {
            NotifierConfig::new()
        };
        match Notifier::with_config(config) {
            Ok(notifier) => {
                debug!(queued, "notifier created over C ABI");
                *out_notifier = Box::into_raw(Box::new(notifier)) as *mut ReplNotifyNotifier;
                ReplNotifyResult::Ok
            }
            Err(e) => e.into(),
        }
    }))
}

/// Frees a notifier.
///
/// In queued mode, events still queued are delivered before this returns.
///
/// # Safety
///
/// `notifier` must be null or a handle returned by `replnotify_notifier_new`
/// that has not been freed. It must not be freed from inside a callback.
#[no_mangle]
pub unsafe extern "C" fn replnotify_notifier_free(notifier: *mut ReplNotifyNotifier) {
    if notifier.is_null() {
        return;
    }
    let notifier = Box::from_raw(notifier as *mut Notifier);
    let _ = ffi_catch(AssertUnwindSafe(move || {
        drop(notifier);
        ReplNotifyResult::Ok
    }));
}

/// Registers a listener for a replicator.
///
/// # Arguments
///
/// * `notifier` - Notifier handle
/// * `replicator` - Replicator handle value
/// * `listener` - Callback table; copied, so it need not outlive the call
/// * `context` - Opaque pointer passed back on every callback
/// * `out_id` - Output pointer for the registration id
///
/// # Returns
///
/// `AlreadyRegistered` if the replicator already has a listener.
///
/// # Safety
///
/// `notifier`, `listener` and `out_id` must be valid pointers. `context` must
/// stay valid until the registration is removed.
#[no_mangle]
pub unsafe extern "C" fn replnotify_register(
    notifier: *mut ReplNotifyNotifier,
    replicator: u64,
    listener: *const ReplNotifyListener,
    context: *mut c_void,
    out_id: *mut u64,
) -> ReplNotifyResult {
    clear_last_error();

    let Some(notifier) = notifier_ref(notifier) else {
        set_last_error("null pointer argument");
        return ReplNotifyResult::NullPointer;
    };
    if listener.is_null() || out_id.is_null() {
        set_last_error("null pointer argument");
        return ReplNotifyResult::NullPointer;
    }
    let listener = *listener;

    ffi_catch(AssertUnwindSafe(|| {
        match notifier.register(
            ReplicatorHandle::new(replicator),
            CListener::new(listener),
            FfiContext(context),
        ) {
            Ok(id) => {
                *out_id = id.as_u64();
                ReplNotifyResult::Ok
            }
            Err(e) => e.into(),
        }
    }))
}

/// Removes a registration.
///
/// No callback runs for the registration after this returns. Unknown ids
/// are ignored.
///
/// # Safety
///
/// `notifier` must be a valid handle.
#[no_mangle]
pub unsafe extern "C" fn replnotify_unregister(
    notifier: *mut ReplNotifyNotifier,
    registration: u64,
) -> ReplNotifyResult {
    clear_last_error();

    let Some(notifier) = notifier_ref(notifier) else {
        set_last_error("null pointer argument");
        return ReplNotifyResult::NullPointer;
    };

    ffi_catch(AssertUnwindSafe(|| {
        notifier.unregister(RegistrationId::from_raw(registration));
        ReplNotifyResult::Ok
    }))
}

/// Reports a status change for a replicator.
///
/// # Safety
///
/// `notifier` and `status` must be valid pointers; `status.error.message`
/// must be null or a valid null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn replnotify_notify_status(
    notifier: *mut ReplNotifyNotifier,
    replicator: u64,
    status: *const ReplNotifyStatus,
) -> ReplNotifyResult {
    clear_last_error();

    let Some(notifier) = notifier_ref(notifier) else {
        set_last_error("null pointer argument");
        return ReplNotifyResult::NullPointer;
    };
    if status.is_null() {
        set_last_error("null pointer argument");
        return ReplNotifyResult::NullPointer;
    }

    ffi_catch(AssertUnwindSafe(|| match (*status).to_status() {
        Ok(status) => {
            notifier.notify_status(ReplicatorHandle::new(replicator), status);
            ReplNotifyResult::Ok
        }
        Err(e) => e.into(),
    }))
}

/// Reports that a document's push or pull attempt finished.
///
/// # Arguments
///
/// * `doc_id`, `rev_id` - Null-terminated UTF-8 strings
/// * `flags` - Revision flag bits; unknown bits are ignored
/// * `error` - Null on success
/// * `transient` - The failure will be retried by the core
///
/// # Safety
///
/// All pointers must be valid or, where documented, null.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn replnotify_notify_document_ended(
    notifier: *mut ReplNotifyNotifier,
    replicator: u64,
    pushing: bool,
    doc_id: *const c_char,
    rev_id: *const c_char,
    flags: u32,
    error: *const ReplNotifyError,
    transient: bool,
) -> ReplNotifyResult {
    clear_last_error();

    let Some(notifier) = notifier_ref(notifier) else {
        set_last_error("null pointer argument");
        return ReplNotifyResult::NullPointer;
    };

    ffi_catch(AssertUnwindSafe(|| {
        let doc_id = match req_str(doc_id, "doc_id") {
            Ok(s) => s,
            Err(e) => return e.into(),
        };
        let rev_id = match req_str(rev_id, "rev_id") {
            Ok(s) => s,
            Err(e) => return e.into(),
        };
        let error = match error.as_ref().map(|e| e.to_error_info()).transpose() {
            Ok(error) => error.flatten(),
            Err(e) => return e.into(),
        };

        notifier.notify_document_ended(
            ReplicatorHandle::new(replicator),
            pushing,
            doc_id,
            rev_id,
            RevisionFlags::from_bits_truncate(flags),
            error,
            transient,
        );
        ReplNotifyResult::Ok
    }))
}

/// Waits until every queued event has been delivered. No-op in synchronous
/// mode.
///
/// # Safety
///
/// `notifier` must be a valid handle.
#[no_mangle]
pub unsafe extern "C" fn replnotify_flush(notifier: *mut ReplNotifyNotifier) -> ReplNotifyResult {
    clear_last_error();

    let Some(notifier) = notifier_ref(notifier) else {
        set_last_error("null pointer argument");
        return ReplNotifyResult::NullPointer;
    };

    ffi_catch(AssertUnwindSafe(|| {
        notifier.flush();
        ReplNotifyResult::Ok
    }))
}

/// Returns true if `error` may go away when retried.
///
/// # Safety
///
/// `error` must be null or a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn replnotify_error_is_transient(error: *const ReplNotifyError) -> bool {
    match error.as_ref().map(|e| e.to_error_info()) {
        Some(Ok(Some(info))) => info.may_be_transient(),
        _ => false,
    }
}

/// Returns true if `error` may depend on the current network.
///
/// # Safety
///
/// `error` must be null or a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn replnotify_error_is_network_dependent(error: *const ReplNotifyError) -> bool {
    match error.as_ref().map(|e| e.to_error_info()) {
        Some(Ok(Some(info))) => info.may_be_network_dependent(),
        _ => false,
    }
}
