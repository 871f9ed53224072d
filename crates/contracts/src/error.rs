//! Layered error definitions
//!
//! Categorized by source: config / emit

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Emission Errors =====
    /// Transport failed to deliver a batch
    #[error("handler '{handler}' emit error: {message}")]
    Emit { handler: String, message: String },

    /// Transport could not reach its destination
    #[error("handler '{handler}' connection error: {message}")]
    Connection { handler: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create emit error
    pub fn emit(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Emit {
            handler: handler.into(),
            message: message.into(),
        }
    }

    /// Create connection error
    pub fn connection(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            handler: handler.into(),
            message: message.into(),
        }
    }
}
