use thiserror::Error;

pub type Result<T> = std::result::Result<T, KeystoneError>;

/// Errors raised while composing an application: module traversal, dependency
/// resolution and pipeline compilation. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum KeystoneError {
    #[error("Cannot resolve {type_name}: not registered as provider or controller")]
    DependencyNotFound { type_name: String },

    #[error("Failed to downcast type: {type_name}")]
    DowncastFailed { type_name: String },

    #[error("Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    #[error("Module registration failed: {message}")]
    ModuleRegistrationFailed { message: String },

    #[error("Failed to construct {type_name}: {message}")]
    ConstructionFailed { type_name: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KeystoneError {
    pub fn not_found(type_name: impl Into<String>) -> Self {
        Self::DependencyNotFound {
            type_name: type_name.into(),
        }
    }

    pub fn construction_failed(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConstructionFailed {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}
