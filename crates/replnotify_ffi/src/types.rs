//! Type definitions for FFI.

use crate::error::ArgError;
use replnotify_core::{
    ActivityLevel, DocumentEnded, ErrorDomain, ErrorInfo, Progress, ReplicatorStatus,
};
use std::ffi::{c_char, c_void, CStr, CString};

/// An opaque notifier handle.
///
/// Never dereference or modify directly.
#[repr(C)]
pub struct ReplNotifyNotifier {
    _private: [u8; 0],
}

/// An error value as seen from C.
///
/// A `code` of 0 means "no error". `message` may be null.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ReplNotifyError {
    /// Error domain (1 = LiteCore ... 6 = WebSocket).
    pub domain: i32,
    /// Domain-specific code.
    pub code: i32,
    /// Optional null-terminated UTF-8 message.
    pub message: *const c_char,
}

impl ReplNotifyError {
    /// The "no error" value.
    pub fn none() -> Self {
        Self {
            domain: 0,
            code: 0,
            message: std::ptr::null(),
        }
    }

    /// Reads the error into its Rust form. A zero code yields `None`.
    ///
    /// # Safety
    ///
    /// `message` must be null or a valid null-terminated string.
    pub(crate) unsafe fn to_error_info(&self) -> Result<Option<ErrorInfo>, ArgError> {
        if self.code == 0 {
            return Ok(None);
        }
        let domain = ErrorDomain::from_code(self.domain).ok_or(ArgError::ErrorDomain(self.domain))?;
        let message = opt_str(self.message, "error message")?;
        Ok(Some(ErrorInfo {
            domain,
            code: self.code,
            message: message.map(str::to_string),
        }))
    }
}

impl Default for ReplNotifyError {
    fn default() -> Self {
        Self::none()
    }
}

/// Aggregate replicator status as seen from C.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ReplNotifyStatus {
    /// Activity level (0 = stopped, 1 = offline, 2 = connecting, 3 = idle, 4 = busy).
    pub level: i32,
    /// Units of work completed.
    pub units_completed: u64,
    /// Total units of work.
    pub units_total: u64,
    /// Documents transferred.
    pub document_count: u64,
    /// Error that caused the transition, if `error.code != 0`.
    pub error: ReplNotifyError,
}

impl ReplNotifyStatus {
    /// Reads the status into its Rust form.
    ///
    /// # Safety
    ///
    /// `error.message` must be null or a valid null-terminated string.
    pub(crate) unsafe fn to_status(&self) -> Result<ReplicatorStatus, ArgError> {
        let level = ActivityLevel::from_code(self.level).ok_or(ArgError::ActivityLevel(self.level))?;
        Ok(ReplicatorStatus {
            level,
            progress: Progress {
                units_completed: self.units_completed,
                units_total: self.units_total,
                document_count: self.document_count,
            },
            error: self.error.to_error_info()?,
        })
    }
}

/// Called when a replicator's status changes.
pub type ReplNotifyStatusCallback = Option<
    unsafe extern "C" fn(replicator: u64, status: *const ReplNotifyStatus, context: *mut c_void),
>;

/// Called when a document's push or pull attempt finished.
///
/// `error` is null when the document was transferred successfully.
pub type ReplNotifyDocumentEndedCallback = Option<
    unsafe extern "C" fn(
        replicator: u64,
        pushing: bool,
        doc_id: *const c_char,
        rev_id: *const c_char,
        flags: u32,
        error: *const ReplNotifyError,
        transient: bool,
        context: *mut c_void,
    ),
>;

/// Callback table registered for one replicator.
///
/// Either callback may be null, in which case that kind of event is ignored.
/// Pointers passed to callbacks are only valid for the duration of the call.
#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct ReplNotifyListener {
    /// Status callback.
    pub status_changed: ReplNotifyStatusCallback,
    /// Document callback.
    pub document_ended: ReplNotifyDocumentEndedCallback,
}

/// Owns the strings behind a [`ReplNotifyError`] while it is lent to C.
pub(crate) struct OwnedCError {
    _message: Option<CString>,
    raw: ReplNotifyError,
}

impl OwnedCError {
    pub(crate) fn new(error: &ErrorInfo) -> Self {
        let message = error.message.as_deref().map(to_cstring);
        let raw = ReplNotifyError {
            domain: error.domain as i32,
            code: error.code,
            message: message.as_ref().map_or(std::ptr::null(), |m| m.as_ptr()),
        };
        Self {
            _message: message,
            raw,
        }
    }

    pub(crate) fn raw(&self) -> &ReplNotifyError {
        &self.raw
    }
}

/// Owns the strings behind a [`ReplNotifyStatus`] while it is lent to C.
pub(crate) struct OwnedCStatus {
    _error: Option<OwnedCError>,
    raw: ReplNotifyStatus,
}

impl OwnedCStatus {
    pub(crate) fn new(status: &ReplicatorStatus) -> Self {
        let error = status.error.as_ref().map(OwnedCError::new);
        let raw = ReplNotifyStatus {
            level: status.level.code(),
            units_completed: status.progress.units_completed,
            units_total: status.progress.units_total,
            document_count: status.progress.document_count,
            error: error.as_ref().map_or_else(ReplNotifyError::none, |e| *e.raw()),
        };
        Self { _error: error, raw }
    }

    pub(crate) fn raw(&self) -> &ReplNotifyStatus {
        &self.raw
    }
}

/// Owns the strings of a [`DocumentEnded`] while they are lent to C.
pub(crate) struct OwnedCDocument {
    pub(crate) doc_id: CString,
    pub(crate) rev_id: CString,
    pub(crate) error: Option<OwnedCError>,
}

impl OwnedCDocument {
    pub(crate) fn new(event: &DocumentEnded) -> Self {
        Self {
            doc_id: to_cstring(&event.doc_id),
            rev_id: to_cstring(&event.rev_id),
            error: event.error.as_ref().map(OwnedCError::new),
        }
    }

    pub(crate) fn error_ptr(&self) -> *const ReplNotifyError {
        self.error
            .as_ref()
            .map_or(std::ptr::null(), |e| e.raw() as *const ReplNotifyError)
    }
}

/// Converts to a C string, dropping interior NUL bytes.
fn to_cstring(s: &str) -> CString {
    CString::new(s.replace('\0', "")).unwrap_or_default()
}

/// Reads a required string argument.
///
/// # Safety
///
/// `ptr` must be null or a valid null-terminated string.
pub(crate) unsafe fn req_str<'a>(ptr: *const c_char, what: &'static str) -> Result<&'a str, ArgError> {
    opt_str(ptr, what)?.ok_or(ArgError::Null(what))
}

/// Reads an optional string argument.
///
/// # Safety
///
/// `ptr` must be null or a valid null-terminated string.
pub(crate) unsafe fn opt_str<'a>(ptr: *const c_char, what: &'static str) -> Result<Option<&'a str>, ArgError> {
    if ptr.is_null() {
        return Ok(None);
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map(Some)
        .map_err(|_| ArgError::Utf8(what))
}
