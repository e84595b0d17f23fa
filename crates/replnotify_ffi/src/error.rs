//! Error codes and result types.

use replnotify_core::NotifyError;
use std::cell::RefCell;
use std::ffi::CString;
use thiserror::Error;

/// Result code for FFI functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplNotifyResult {
    /// Operation succeeded.
    Ok = 0,
    /// Generic error.
    Error = 1,
    /// Invalid argument.
    InvalidArgument = 2,
    /// Null pointer.
    NullPointer = 3,
    /// The replicator already has a registered listener.
    AlreadyRegistered = 4,
    /// A Rust panic was caught at the boundary.
    Panic = 5,
}

impl ReplNotifyResult {
    /// Returns true if the result indicates success.
    pub fn is_ok(self) -> bool {
        self == ReplNotifyResult::Ok
    }

    /// Returns true if the result indicates an error.
    pub fn is_err(self) -> bool {
        self != ReplNotifyResult::Ok
    }
}

/// Argument validation failures.
#[derive(Debug, Error)]
pub(crate) enum ArgError {
    #[error("null pointer argument: {0}")]
    Null(&'static str),
    #[error("invalid UTF-8 in {0}")]
    Utf8(&'static str),
    #[error("unknown activity level: {0}")]
    ActivityLevel(i32),
    #[error("unknown error domain: {0}")]
    ErrorDomain(i32),
}

impl From<ArgError> for ReplNotifyResult {
    fn from(err: ArgError) -> Self {
        set_last_error(err.to_string());
        match err {
            ArgError::Null(_) => ReplNotifyResult::NullPointer,
            _ => ReplNotifyResult::InvalidArgument,
        }
    }
}

impl From<NotifyError> for ReplNotifyResult {
    fn from(err: NotifyError) -> Self {
        set_last_error(err.to_string());
        match err {
            NotifyError::AlreadyRegistered { .. } => ReplNotifyResult::AlreadyRegistered,
            _ => ReplNotifyResult::Error,
        }
    }
}

// Thread-local storage for last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Sets the last error message.
pub fn set_last_error(message: impl Into<String>) {
    let msg = message.into();
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clears the last error.
pub fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Runs `f`, converting a panic into [`ReplNotifyResult::Panic`].
pub(crate) fn ffi_catch<F>(f: F) -> ReplNotifyResult
where
    F: FnOnce() -> ReplNotifyResult + std::panic::UnwindSafe,
{
    match std::panic::catch_unwind(f) {
        Ok(code) => code,
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            set_last_error(format!("internal panic: {msg}"));
            ReplNotifyResult::Panic
        }
    }
}

/// Gets the last error message as a C string.
///
/// Returns null if no error is set.
///
/// # Safety
///
/// The returned pointer is valid until the next FFI call on this thread.
#[no_mangle]
pub extern "C" fn replnotify_get_last_error() -> *const std::ffi::c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(cstr) => cstr.as_ptr(),
        None => std::ptr::null(),
    })
}

/// Clears the last error message.
#[no_mangle]
pub extern "C" fn replnotify_clear_error() {
    clear_last_error();
}
