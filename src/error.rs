//! Error types and handling for the chime library

use thiserror::Error;

/// Result type alias for chime operations
pub type Result<T> = std::result::Result<T, ChimeError>;

/// Main error type for the chime library
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChimeError {
    /// Invalid configuration parameter
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message describing the configuration issue
        message: String,
    },

    /// A blocking wait was cancelled by an interrupt request.
    ///
    /// The interrupted operation made no progress: no slot was claimed
    /// and no element was transferred. The pending interrupt flag of the
    /// calling thread has been cleared.
    #[error("Blocking wait was interrupted")]
    Interrupted,
}

impl ChimeError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable.
    ///
    /// An interrupted operation may simply be retried; a configuration
    /// error never succeeds on retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

/// Convenience macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::error::ChimeError::config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ChimeError::config("test message");
        assert!(matches!(err, ChimeError::InvalidConfig { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_error_classification() {
        assert!(ChimeError::Interrupted.is_recoverable());
        assert!(!ChimeError::config("zero capacity").is_recoverable());
    }

    #[test]
    fn test_error_macros() {
        let err = config_error!("Invalid capacity: {}", 0);
        assert!(matches!(err, ChimeError::InvalidConfig { .. }));
    }
}
