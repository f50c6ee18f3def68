//! Error types for the Sonar broadcaster

use thiserror::Error;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors reported by the peripheral platform through its callbacks
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeripheralError {
    #[error("Failed to register GATT service: {reason}")]
    ServiceRegistration { reason: String },
}

/// Errors raised while setting up or running the broadcaster
///
/// Caller operations (`send_keepalive`, `update_identity`, `is_healthy`) never
/// return these; they only surface from configuration and the event pump.
#[derive(Error, Debug)]
pub enum BroadcasterError {
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Peripheral event channel closed")]
    ChannelClosed,
}

impl From<toml::de::Error> for BroadcasterError {
    fn from(err: toml::de::Error) -> Self {
        BroadcasterError::Config {
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BroadcasterError>;
