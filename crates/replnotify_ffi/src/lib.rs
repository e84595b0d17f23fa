//! # replnotify FFI
//!
//! Stable C ABI for the replnotify event notifier.
//!
//! This crate provides:
//! - C-compatible function exports for the core-facing and registration APIs
//! - A C callback table adapted to the observer trait
//! - Error code mapping and a thread-local last-error message
//! - Panic containment at the boundary
//!
//! ## Ownership
//!
//! - Notifier handles are created by `replnotify_notifier_new` and released
//!   with `replnotify_notifier_free`
//! - Strings passed into callbacks are owned by Rust and valid only for the
//!   duration of the call
//! - The `void*` context is never dereferenced by Rust

#![warn(missing_docs)]

mod error;
mod listener;
mod notifier;
mod types;

pub use error::{
    clear_last_error, replnotify_clear_error, replnotify_get_last_error, set_last_error,
    ReplNotifyResult,
};
pub use notifier::*;
pub use types::{
    ReplNotifyDocumentEndedCallback, ReplNotifyError, ReplNotifyListener, ReplNotifyNotifier,
    ReplNotifyStatus, ReplNotifyStatusCallback,
};
