//! Error types for the packet dispatcher.
//!
//! None of these ever escape [`PacketDispatcher::handle`](crate::PacketDispatcher::handle);
//! they exist so handlers, registration and configuration loading can report
//! failures in a structured way before the dispatcher logs and swallows them.

use crate::opcode::Opcode;

/// Errors a packet handler may return, or that the dispatcher synthesises
/// when a handler panics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    /// The payload could not be decoded into the message the handler expects
    #[error("Decode error: {0}")]
    Decode(String),

    /// The handler refused the request (e.g. failed a game rule check)
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Any other failure inside the handler
    #[error("Internal error: {0}")]
    Internal(String),

    /// The handler or its factory panicked
    #[error("Handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    /// Converts a payload captured by `catch_unwind` into a `Panicked` error.
    pub(crate) fn from_panic(panic_info: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = panic_info.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = panic_info.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };

        HandlerError::Panicked(message)
    }
}

/// Reasons a handler registration was not accepted.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// The handler type declares no opcode metadata
    #[error("Handler {0} declares no opcode")]
    MissingMetadata(&'static str),

    /// The handler type is marked disabled
    #[error("Handler {type_name} for opcode {opcode} is disabled")]
    Disabled {
        type_name: &'static str,
        opcode: Opcode,
    },

    /// The declared opcode is the reserved invalid value
    #[error("Handler {0} declares the reserved opcode 0")]
    InvalidOpcode(&'static str),

    /// The handler factory failed or panicked
    #[error("Unable to construct handler {type_name}: {source}")]
    Construction {
        type_name: &'static str,
        #[source]
        source: HandlerError,
    },
}

/// Errors raised while loading or validating a [`DispatchConfig`](crate::DispatchConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
