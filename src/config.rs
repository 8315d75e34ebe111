//! Handler configuration.
//!
//! [`HandlerConfig`] is fixed at construction. It can be deserialized from a
//! host application's configuration file or assembled with
//! [`HandlerConfig::builder`]; either way it is validated before a handler is
//! built.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{backpressure::Watermarks, error::ConfigError};

const DEFAULT_BLOCK_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_WRITE_BYTES_LOW: u64 = 64 * 1024;
const DEFAULT_WRITE_BYTES_HIGH: u64 = 1024 * 1024;

/// Immutable settings for a [`crate::SessionHandler`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Dispatch packets on per-channel ordered queues instead of inline on
    /// the I/O path.
    pub ordered_dispatch: bool,
    /// Close a session after reporting a transport fault.
    pub close_session_on_fault: bool,
    /// Longest time a worker reply waits for the write backlog to drain.
    pub block_timeout: Duration,
    /// Backlog size at or below which a blocked session flows again.
    pub write_bytes_low: u64,
    /// Backlog size at or above which a session is blocked.
    pub write_bytes_high: u64,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            ordered_dispatch: true,
            close_session_on_fault: true,
            block_timeout: DEFAULT_BLOCK_TIMEOUT,
            write_bytes_low: DEFAULT_WRITE_BYTES_LOW,
            write_bytes_high: DEFAULT_WRITE_BYTES_HIGH,
        }
    }
}

impl HandlerConfig {
    /// Start building a configuration from the defaults.
    #[must_use]
    pub fn builder() -> HandlerConfigBuilder { HandlerConfigBuilder::default() }

    /// Check the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidWatermarks`] unless
    /// `write_bytes_low < write_bytes_high`, and
    /// [`ConfigError::ZeroBlockTimeout`] if `block_timeout` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.watermarks()?;
        if self.block_timeout.is_zero() {
            return Err(ConfigError::ZeroBlockTimeout);
        }
        Ok(())
    }

    /// Watermarks described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidWatermarks`] when the low watermark is not
    /// below the high watermark.
    pub fn watermarks(&self) -> Result<Watermarks, ConfigError> {
        Watermarks::new(self.write_bytes_low, self.write_bytes_high)
    }
}

/// Builder for [`HandlerConfig`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use wiregate::HandlerConfig;
///
/// let config = HandlerConfig::builder()
///     .watermarks(100, 1000)
///     .block_timeout(Duration::from_secs(5))
///     .build()
///     .expect("valid configuration");
/// assert_eq!(config.write_bytes_high, 1000);
/// ```
#[derive(Debug, Default)]
pub struct HandlerConfigBuilder {
    config: HandlerConfig,
}

impl HandlerConfigBuilder {
    /// Enable or disable ordered per-channel dispatch.
    #[must_use]
    pub fn ordered_dispatch(mut self, enabled: bool) -> Self {
        self.config.ordered_dispatch = enabled;
        self
    }

    /// Close sessions after reporting a transport fault.
    #[must_use]
    pub fn close_session_on_fault(mut self, close: bool) -> Self {
        self.config.close_session_on_fault = close;
        self
    }

    /// Set the longest time a worker reply waits for the backlog to drain.
    #[must_use]
    pub fn block_timeout(mut self, timeout: Duration) -> Self {
        self.config.block_timeout = timeout;
        self
    }

    /// Set the low and high write backlog watermarks in bytes.
    #[must_use]
    pub fn watermarks(mut self, low: u64, high: u64) -> Self {
        self.config.write_bytes_low = low;
        self.config.write_bytes_high = high;
        self
    }

    /// Validate and return the configuration.
    ///
    /// # Errors
    ///
    /// See [`HandlerConfig::validate`].
    pub fn build(self) -> Result<HandlerConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
