//! Error types surfaced by the session handler.

use std::{error::Error as StdError, fmt, time::Duration};

use thiserror::Error;

use crate::session::SessionId;

/// Error returned by a [`crate::PacketDispatcher`].
pub type DispatchError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors returned when validating handler configuration.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The low watermark was not strictly below the high watermark.
    #[error("invalid watermarks; low={low}, high={high}; low must be < high")]
    InvalidWatermarks {
        /// Configured low watermark in bytes.
        low: u64,
        /// Configured high watermark in bytes.
        high: u64,
    },
    /// The backpressure wait timeout was zero.
    #[error("block timeout must be greater than zero")]
    ZeroBlockTimeout,
    /// No Tokio runtime was supplied and none was running.
    #[error("no Tokio runtime available to run ordered dispatch")]
    NoRuntime,
}

/// Errors raised on the reply path.
///
/// The reply is still written when either error occurs; the error reports
/// that the write backlog was not brought under control first.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReturnError {
    /// The write backlog stayed at or above the high watermark for the whole
    /// configured block timeout.
    #[error("timed out after {waited:?} waiting for {session} write queue to drain")]
    BackpressureTimeout {
        /// Session whose backlog did not drain.
        session: SessionId,
        /// Time spent waiting.
        waited: Duration,
    },
    /// The session closed while the reply was waiting.
    #[error("{0} closed while waiting for its write queue to drain")]
    SessionClosed(SessionId),
}

/// Category of a [`MessagingError`].
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    /// Unexpected failure inside the broker or its transport.
    InternalError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InternalError => f.write_str("internal error"),
        }
    }
}

/// Error delivered to a [`crate::CleanUpNotifier`].
///
/// The transport fault that triggered the notification is preserved as the
/// [`source`](StdError::source).
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct MessagingError {
    code: ErrorCode,
    message: String,
    #[source]
    cause: Option<DispatchError>,
}

impl MessagingError {
    /// Create an error without an underlying cause.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    /// Wrap an unexpected transport fault.
    #[must_use]
    pub fn internal(message: impl Into<String>, cause: DispatchError) -> Self {
        Self {
            code: ErrorCode::InternalError,
            message: message.into(),
            cause: Some(cause),
        }
    }

    /// Category of this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode { self.code }

    /// Human-readable description.
    #[must_use]
    pub fn message(&self) -> &str { &self.message }
}
