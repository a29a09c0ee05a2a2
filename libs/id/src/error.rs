//! Error types for request identity and UUID translation.

use thiserror::Error;

/// Errors that can occur when parsing request IDs or hardware UUIDs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The request ID string is empty.
    #[error("request ID cannot be empty")]
    Empty,

    /// The UUID does not hold the expected number of hex digits once hyphens are stripped.
    #[error("invalid UUID length for '{input}': expected {expected} hex digits, got {actual}")]
    InvalidLength {
        input: String,
        expected: usize,
        actual: usize,
    },

    /// The UUID contains characters that are not hex digits.
    #[error("invalid UUID encoding for '{input}': {reason}")]
    InvalidEncoding { input: String, reason: String },
}

impl IdError {
    /// Returns true if this error indicates the input was empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, IdError::Empty)
    }

    /// Returns true if this error was raised while decoding a hardware UUID.
    pub fn is_uuid_error(&self) -> bool {
        matches!(
            self,
            IdError::InvalidLength { .. } | IdError::InvalidEncoding { .. }
        )
    }

    /// The offending input, when the error carries one.
    pub fn input(&self) -> Option<&str> {
        match self {
            IdError::Empty => None,
            IdError::InvalidLength { input, .. } | IdError::InvalidEncoding { input, .. } => {
                Some(input)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_error_classification() {
        let length = IdError::InvalidLength {
            input: "422413c3-57c8".to_string(),
            expected: 32,
            actual: 12,
        };
        assert!(length.is_uuid_error());
        assert_eq!(length.input(), Some("422413c3-57c8"));

        let encoding = IdError::InvalidEncoding {
            input: "zz".to_string(),
            reason: "bad".to_string(),
        };
        assert!(encoding.is_uuid_error());

        assert!(!IdError::Empty.is_uuid_error());
        assert_eq!(IdError::Empty.input(), None);
    }
}
