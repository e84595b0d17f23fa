//! Value types exchanged between the replication core and observers.

use crate::error_info::ErrorInfo;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a running replication session.
///
/// The session itself is owned by the replication core; the notifier only
/// uses the handle as a routing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReplicatorHandle(u64);

impl ReplicatorHandle {
    /// Creates a handle from its raw value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ReplicatorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "repl#{}", self.0)
    }
}

/// Identifier returned by `EventNotifier::register`.
///
/// Ids are never reused within a notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(u64);

impl RegistrationId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Rebuilds an id from a value previously obtained with [`as_u64`](Self::as_u64).
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reg#{}", self.0)
    }
}

/// Coarse-grained state of a replication session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ActivityLevel {
    /// Finished, or stopped by a fatal error.
    Stopped = 0,
    /// Waiting for the network to become reachable.
    Offline = 1,
    /// Connecting to the peer.
    Connecting = 2,
    /// Connected, nothing to transfer.
    Idle = 3,
    /// Transferring documents.
    Busy = 4,
}

impl ActivityLevel {
    /// Converts a raw level code. Returns `None` for unknown codes.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ActivityLevel::Stopped),
            1 => Some(ActivityLevel::Offline),
            2 => Some(ActivityLevel::Connecting),
            3 => Some(ActivityLevel::Idle),
            4 => Some(ActivityLevel::Busy),
            _ => None,
        }
    }

    /// Returns the raw level code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Returns true while the session is doing network work.
    pub fn is_active(self) -> bool {
        matches!(self, ActivityLevel::Connecting | ActivityLevel::Busy)
    }
}

/// Progress counters of a replication session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Units of work completed so far.
    pub units_completed: u64,
    /// Total units of work known so far. May grow over time.
    pub units_total: u64,
    /// Number of documents transferred.
    pub document_count: u64,
}

impl Progress {
    /// Creates a progress value without a document count.
    pub fn new(units_completed: u64, units_total: u64) -> Self {
        Self {
            units_completed,
            units_total,
            document_count: 0,
        }
    }

    /// Sets the document count.
    pub fn with_document_count(mut self, count: u64) -> Self {
        self.document_count = count;
        self
    }

    /// Completed fraction in `[0, 1]`, or `None` when the total is unknown.
    pub fn fraction(&self) -> Option<f64> {
        if self.units_total == 0 {
            return None;
        }
        let fraction = self.units_completed as f64 / self.units_total as f64;
        Some(fraction.min(1.0))
    }
}

/// Aggregate status of a replication session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicatorStatus {
    /// Current activity level.
    pub level: ActivityLevel,
    /// Progress counters.
    pub progress: Progress,
    /// Error that caused the last transition, if any.
    pub error: Option<ErrorInfo>,
}

impl ReplicatorStatus {
    /// Creates a status with zero progress and no error.
    pub fn new(level: ActivityLevel) -> Self {
        Self {
            level,
            progress: Progress::default(),
            error: None,
        }
    }

    /// Sets the progress counters.
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Sets the error.
    pub fn with_error(mut self, error: ErrorInfo) -> Self {
        self.error = Some(error);
        self
    }

    /// Returns true once the session has stopped.
    pub fn is_terminal(&self) -> bool {
        self.level == ActivityLevel::Stopped
    }
}

bitflags! {
    /// Describes the nature of a document revision.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RevisionFlags: u32 {
        /// The revision is a deletion (tombstone).
        const DELETED = 0x01;
        /// The revision is a leaf of the revision tree.
        const LEAF = 0x02;
        /// The revision has not been saved yet.
        const NEW = 0x04;
        /// The revision body references attachments.
        const HAS_ATTACHMENTS = 0x08;
        /// The body is kept after the revision is superseded.
        const KEEP_BODY = 0x10;
        /// The revision is part of an unresolved conflict.
        const IS_CONFLICT = 0x20;
        /// The revision closes a conflicting branch.
        const CLOSED = 0x40;
        /// The revision was purged.
        const PURGED = 0x80;
    }
}

/// Direction of a document transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Local change uploaded to the peer.
    Push,
    /// Remote change downloaded from the peer.
    Pull,
}

/// Outcome of one document's push or pull attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEnded {
    /// True when the document was being pushed.
    pub pushing: bool,
    /// Document ID.
    pub doc_id: String,
    /// Revision ID that was transferred.
    pub rev_id: String,
    /// Flags of the transferred revision.
    pub flags: RevisionFlags,
    /// Failure, if the attempt failed.
    pub error: Option<ErrorInfo>,
    /// The core will retry the failure itself; informational only.
    pub transient: bool,
}

impl DocumentEnded {
    /// Returns the transfer direction.
    pub fn direction(&self) -> Direction {
        if self.pushing {
            Direction::Push
        } else {
            Direction::Pull
        }
    }

    /// Returns true if the document was transferred without error.
    pub fn succeeded(&self) -> bool {
        self.error.as_ref().map_or(true, |e| !e.is_error())
    }
}
