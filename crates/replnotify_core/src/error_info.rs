//! Error values reported by the replication core.
//!
//! An [`ErrorInfo`] is a plain value: a domain, a numeric code and an
//! optional message. The notifier forwards it unchanged; the classification
//! helpers exist so observers can decide whether a failure is worth
//! surfacing to the user.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace that gives meaning to an error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ErrorDomain {
    /// Errors raised by the replication core itself.
    LiteCore = 1,
    /// Operating system `errno` values.
    Posix = 2,
    /// Errors from the SQLite storage layer.
    Sqlite = 3,
    /// Errors from the document encoding layer.
    Fleece = 4,
    /// Network resolution and connection errors (see [`network`]).
    Network = 5,
    /// WebSocket close codes and HTTP statuses.
    WebSocket = 6,
}

impl ErrorDomain {
    /// All domains in numeric order.
    pub const ALL: [ErrorDomain; 6] = [
        ErrorDomain::LiteCore,
        ErrorDomain::Posix,
        ErrorDomain::Sqlite,
        ErrorDomain::Fleece,
        ErrorDomain::Network,
        ErrorDomain::WebSocket,
    ];

    /// Human-readable domain name.
    pub fn name(self) -> &'static str {
        match self {
            ErrorDomain::LiteCore => "LiteCore",
            ErrorDomain::Posix => "POSIX",
            ErrorDomain::Sqlite => "SQLite",
            ErrorDomain::Fleece => "Fleece",
            ErrorDomain::Network => "Network",
            ErrorDomain::WebSocket => "WebSocket",
        }
    }

    /// Converts a raw domain code. Returns `None` for unknown domains.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|d| *d as i32 == code)
    }
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Codes in the [`ErrorDomain::Network`] domain.
pub mod network {
    /// DNS lookup failed.
    pub const DNS_FAILURE: i32 = 1;
    /// The host name could not be resolved.
    pub const UNKNOWN_HOST: i32 = 2;
    /// The connection timed out.
    pub const TIMEOUT: i32 = 3;
}

/// Codes in the [`ErrorDomain::WebSocket`] domain that are not HTTP statuses.
pub mod websocket {
    /// The peer is going away.
    pub const GOING_AWAY: i32 = 1001;
    /// The connection closed without a close frame.
    pub const ABNORMAL: i32 = 1006;
    /// The peer hit an unexpected condition.
    pub const UNEXPECTED_CONDITION: i32 = 1011;
}

#[cfg(unix)]
const TRANSIENT_POSIX: &[i32] = &[
    libc::ENETRESET,
    libc::ECONNABORTED,
    libc::ECONNRESET,
    libc::ETIMEDOUT,
    libc::ECONNREFUSED,
];
#[cfg(not(unix))]
const TRANSIENT_POSIX: &[i32] = &[];

const TRANSIENT_NETWORK: &[i32] = &[network::DNS_FAILURE, network::TIMEOUT];

const TRANSIENT_WEBSOCKET: &[i32] = &[
    408, // Request Timeout
    429, // Too Many Requests
    500,
    502,
    503,
    504,
    websocket::GOING_AWAY,
    websocket::ABNORMAL,
    websocket::UNEXPECTED_CONDITION,
];

#[cfg(unix)]
const UNREACHABLE_POSIX: &[i32] = &[
    libc::ENETDOWN,
    libc::ENETUNREACH,
    libc::ENOTCONN,
    libc::ETIMEDOUT,
    libc::EHOSTDOWN,
    libc::EHOSTUNREACH,
    libc::EADDRNOTAVAIL,
    libc::EPIPE,
];
#[cfg(not(unix))]
const UNREACHABLE_POSIX: &[i32] = &[];

const UNREACHABLE_NETWORK: &[i32] = &[network::DNS_FAILURE, network::UNKNOWN_HOST];

/// An error reported by the replication core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Domain of `code`.
    pub domain: ErrorDomain,
    /// Domain-specific code. Zero means "no error".
    pub code: i32,
    /// Optional message overriding the default text for the code.
    pub message: Option<String>,
}

impl ErrorInfo {
    /// Creates an error without a message.
    pub fn new(domain: ErrorDomain, code: i32) -> Self {
        Self {
            domain,
            code,
            message: None,
        }
    }

    /// Creates an error with a message.
    pub fn with_message(domain: ErrorDomain, code: i32, message: impl Into<String>) -> Self {
        Self {
            domain,
            code,
            message: Some(message.into()),
        }
    }

    /// Returns true if this value represents an actual error.
    pub fn is_error(&self) -> bool {
        self.code != 0
    }

    /// Full description, e.g. `POSIX error 104 "connection reset"`.
    pub fn description(&self) -> String {
        if !self.is_error() {
            return "No error".to_string();
        }
        match &self.message {
            Some(message) => format!("{} error {} \"{}\"", self.domain, self.code, message),
            None => format!("{} error {}", self.domain, self.code),
        }
    }

    /// Returns true if the failure may go away if the operation is retried.
    pub fn may_be_transient(&self) -> bool {
        let codes = match self.domain {
            ErrorDomain::Posix => TRANSIENT_POSIX,
            ErrorDomain::Network => TRANSIENT_NETWORK,
            ErrorDomain::WebSocket => TRANSIENT_WEBSOCKET,
            _ => return false,
        };
        self.is_error() && codes.contains(&self.code)
    }

    /// Returns true if the failure may be caused by the current network
    /// being unable to reach the peer, so it may succeed on another network.
    pub fn may_be_network_dependent(&self) -> bool {
        let codes = match self.domain {
            ErrorDomain::Posix => UNREACHABLE_POSIX,
            ErrorDomain::Network => UNREACHABLE_NETWORK,
            _ => return false,
        };
        self.is_error() && codes.contains(&self.code)
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}
