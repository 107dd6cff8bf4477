//! Lifecycle-specific error types

use thiserror::Error;

/// Errors raised by lifecycle hooks or the application state machine
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Startup could not complete
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// Shutdown operation failed
    #[error("Shutdown failed: {0}")]
    ShutdownFailed(String),

    /// A single hook returned an error
    #[error("Hook execution failed for {service}: {message}")]
    HookFailed {
        /// Name of the provider whose hook failed
        service: String,
        message: String,
    },
}

impl LifecycleError {
    pub fn init_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    pub fn shutdown_failed(msg: impl Into<String>) -> Self {
        Self::ShutdownFailed(msg.into())
    }

    pub fn hook_failed(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HookFailed {
            service: service.into(),
            message: message.into(),
        }
    }
}

impl From<crate::error::KeystoneError> for LifecycleError {
    fn from(err: crate::error::KeystoneError) -> Self {
        Self::InitializationFailed(err.to_string())
    }
}

/// A specialized Result type for lifecycle operations
pub type Result<T> = std::result::Result<T, LifecycleError>;
