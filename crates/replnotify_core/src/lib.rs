//! # replnotify core
//!
//! In-process bridge between a replication core and the application that
//! observes it.
//!
//! This crate provides:
//! - Replication value types (status, progress, revision flags, errors)
//! - The [`ReplicatorObserver`] capability trait
//! - [`EventNotifier`], which routes status and document events to at most
//!   one observer per replicator handle
//! - Synchronous and queued dispatch
//! - Error classification (transient, network dependent)
//!
//! ## Key Invariants
//!
//! - Events for one replicator are delivered in the order they were raised
//! - Every event carries the handle and context token of its registration
//! - Nothing is delivered after `unregister` returns
//! - Observer panics never reach the thread that raised the event

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dispatch;
mod error;
mod error_info;
mod notifier;
mod observer;
mod stats;
mod types;

pub use config::{DispatchMode, NotifierConfig};
pub use error::{NotifyError, NotifyResult};
pub use error_info::{network, websocket, ErrorDomain, ErrorInfo};
pub use notifier::EventNotifier;
pub use observer::ReplicatorObserver;
pub use stats::{NotifierStats, NotifierStatsSnapshot};
pub use types::{
    ActivityLevel, Direction, DocumentEnded, Progress, RegistrationId, ReplicatorHandle,
    ReplicatorStatus, RevisionFlags,
};
