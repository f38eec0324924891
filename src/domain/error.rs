//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

/// Business rule violations surfaced to callers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Balance below the requested debit
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },

    /// Malformed or missing amount, price or field
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Email lookup matched zero or several users
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Caller is not allowed to perform the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Referenced record does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
}

impl DomainError {
    pub fn insufficient_funds(required: i64, available: i64) -> Self {
        Self::InsufficientFunds {
            required,
            available,
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_error() {
        let err = DomainError::insufficient_funds(1000, 200);

        assert!(err.to_string().contains("1000"));
        assert!(err.to_string().contains("200"));
    }

    #[test]
    fn test_not_found_message() {
        let err = DomainError::not_found("Purchase", "abc");
        assert_eq!(err.to_string(), "Purchase not found: abc");
    }
}
