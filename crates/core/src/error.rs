//! Common error handling utilities and conventions

/// Extension trait for adding context to errors consistently across crates
pub trait ErrorContext<T> {
    /// Add operation context to an error result
    fn with_context<F>(self, f: F) -> Result<T, String>
    where
        F: FnOnce() -> String;

    /// Add operation context with a static string
    fn with_context_str(self, context: &'static str) -> Result<T, String>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn with_context<F>(self, f: F) -> Result<T, String>
    where
        F: FnOnce() -> String,
    {
        match self {
            Ok(val) => Ok(val),
            Err(err) => Err(format!("{}: {}", f(), err)),
        }
    }

    fn with_context_str(self, context: &'static str) -> Result<T, String> {
        self.with_context(|| context.to_string())
    }
}

/// Standard result type for core operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Errors raised at the boundaries of the session core.
///
/// Identity and fetch variants render as the bare message reported by the
/// collaborator, because that message is what ends up in front of the user
/// (session error screen, notification body).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("{message}")]
    Identity { message: String },

    #[error("{message}")]
    Fetch { message: String },

    #[error("Push transport error: {message}")]
    Transport { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("No identity manager available")]
    NoManager,
}

impl CoreError {
    /// Create an identity-provider error
    pub fn identity(message: impl Into<String>) -> Self {
        Self::Identity {
            message: message.into(),
        }
    }

    /// Create a configuration-service fetch error
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch {
            message: message.into(),
        }
    }

    /// Create a push transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization_error(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Human-readable message, without the variant prefix for identity and
    /// fetch errors
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Identity { message } | Self::Fetch { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization_error(err.to_string())
    }
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        Self::invalid_config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_error_renders_bare_message() {
        let err = CoreError::identity("network down");
        assert_eq!(err.to_string(), "network down");
        assert_eq!(err.message(), "network down");
    }

    #[test]
    fn test_transport_error_keeps_prefix() {
        let err = CoreError::transport("socket reset");
        assert_eq!(err.message(), "Push transport error: socket reset");
    }

    #[test]
    fn test_with_context() {
        let result: Result<(), &str> = Err("boom");
        assert_eq!(
            result.with_context_str("Failed to load settings"),
            Err("Failed to load settings: boom".to_string())
        );
    }
}
