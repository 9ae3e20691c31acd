//! Device error types.

use thiserror::Error;

use crate::property::Property;

/// Device error type.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("No default output device")]
    DeviceUnavailable,

    #[error("Device has no {0} property")]
    PropertyUnsupported(Property),

    #[error("The {0} property is not settable on this device")]
    NotSettable(Property),

    #[error("System error (status {status}): {message}")]
    SystemError { status: i32, message: String },
}

impl DeviceError {
    /// Create a system error from a status code and message.
    #[must_use]
    pub fn system(status: i32, message: impl Into<String>) -> Self {
        Self::SystemError { status, message: message.into() }
    }
}

/// Result type for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;
