//! Error types for InDesign editing operations.

use thiserror::Error;

/// Result type for InDesign editing operations.
pub type EditResult<T> = Result<T, EditError>;

/// Errors that can occur while editing an InDesign document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// A required parameter was missing, empty, or malformed.
    ///
    /// Raised before any script is generated.
    #[error("Invalid argument '{name}': {message}")]
    InvalidArgument {
        /// Parameter name.
        name: String,
        /// Description of what's wrong.
        message: String,
    },

    /// The automation facility or the host application reported an error.
    ///
    /// The message is the raw text reported by `osascript` or InDesign.
    #[error("{message}")]
    AutomationFailure {
        /// Raw failure message.
        message: String,
    },
}

impl EditError {
    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates an automation failure carrying the raw message.
    #[must_use]
    pub fn automation(message: impl Into<String>) -> Self {
        Self::AutomationFailure {
            message: message.into(),
        }
    }

    /// Returns `true` if this is an [`EditError::InvalidArgument`].
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    /// Returns `true` if this is an [`EditError::AutomationFailure`].
    #[must_use]
    pub const fn is_automation_failure(&self) -> bool {
        matches!(self, Self::AutomationFailure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_argument_display() {
        let err = EditError::invalid_argument("text", "must not be empty");
        assert_eq!(err.to_string(), "Invalid argument 'text': must not be empty");
        assert!(err.is_invalid_argument());
        assert!(!err.is_automation_failure());
    }

    #[test]
    fn automation_failure_is_verbatim() {
        let err = EditError::automation("execution error: No documents are open. (-2700)");
        assert_eq!(
            err.to_string(),
            "execution error: No documents are open. (-2700)"
        );
        assert!(err.is_automation_failure());
    }
}
