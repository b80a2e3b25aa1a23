//! Error types for the circle engine boundary

use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by a circle engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Circle does not exist
    #[error("Circle not found: {0}")]
    CircleNotFound(String),

    /// Membership does not exist
    #[error("Member not found: {0}")]
    MemberNotFound(String),

    /// User could not be resolved into an identity
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// User is already a member of the circle
    #[error("{user} is already a member of circle {circle}")]
    AlreadyMember { circle: String, user: String },

    /// Input rejected by the engine
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The session does not grant the requested action
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Session could not be entered or released
    #[error("Session error: {0}")]
    Session(String),

    /// Unexpected backend failure
    #[error("Engine failure: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::CircleNotFound("abc".to_string());
        assert_eq!(err.to_string(), "Circle not found: abc");

        let err = EngineError::AlreadyMember {
            circle: "c1".to_string(),
            user: "alice".to_string(),
        };
        assert_eq!(err.to_string(), "alice is already a member of circle c1");
    }
}
