//! Handler error types

use thiserror::Error;

/// Handler-specific errors
#[derive(Debug, Error)]
pub enum HandlerError {
    /// No constructor registered for the requested type
    #[error("cannot create handler '{name}': no handler type '{handler_type}' registered")]
    UnknownHandler { name: String, handler_type: String },

    /// Handler specific configuration is unusable
    #[error("invalid configuration for handler '{name}': {message}")]
    Config { name: String, message: String },

    /// Error from a contract type (settings, transport)
    #[error("contract error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl HandlerError {
    /// Create an unknown handler error
    pub fn unknown_handler(name: impl Into<String>, handler_type: impl Into<String>) -> Self {
        Self::UnknownHandler {
            name: name.into(),
            handler_type: handler_type.into(),
        }
    }

    /// Create a configuration error
    pub fn config(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, HandlerError>;
