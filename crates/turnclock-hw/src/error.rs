//! Error types for the turnclock hardware library.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when interacting with the hardware.
#[derive(Error, Debug)]
pub enum Error {
    /// I2C bus transport fault. Recoverable through the display
    /// driver's reopen-and-retry path; fatal only after the retry
    /// also fails.
    #[error("bus transport fault: {0}")]
    Transport(#[source] std::io::Error),

    /// GPIO pin acquisition or input failure.
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    /// Indicator thresholds out of order.
    #[error("invalid thresholds: warning ({warning}s) must be greater than critical ({critical}s)")]
    InvalidThresholds { warning: u64, critical: u64 },

    /// Bus address outside the 7-bit range.
    #[error("invalid I2C address {0:#04x} (must be 7-bit)")]
    InvalidAddress(u8),
}

impl Error {
    /// Wraps any transport-layer error into a `Transport` fault.
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Transport(std::io::Error::other(err))
    }

    /// Whether this fault is recoverable by reopening the bus.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}
