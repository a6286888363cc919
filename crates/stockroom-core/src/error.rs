//! # Error Types
//!
//! Domain-specific error types for stockroom-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockroom-core errors (this file)                                     │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stockroom-db errors (separate crate)                                  │
//! │  └── DbError          - Store failures, wraps CoreError                │
//! │                                                                         │
//! │  stockroom-api errors (app)                                            │
//! │  └── ApiError         - What HTTP clients see                          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Domain errors raised by inventory and history logic.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No item matches the given id or name.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// No history entry has the given id.
    #[error("History entry not found: {0}")]
    HistoryNotFound(i64),

    /// A sale asks for more units than are in stock.
    ///
    /// ## User Workflow
    /// ```text
    /// Sell: [{Widget, 3}, {Gadget, 9}]
    ///      │
    ///      ▼
    /// Validate every line: Gadget has 4
    ///      │
    ///      ▼
    /// InsufficientStock { name: "Gadget", available: 4, requested: 9 }
    ///      │
    ///      ▼
    /// Nothing is decremented, no history row is written
    /// ```
    #[error("Not enough '{name}' in stock: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Username unknown or password mismatch.
    #[error("Incorrect username or password")]
    BadCredentials,

    /// Stored or submitted JSON could not be parsed.
    #[error("Malformed JSON: {0}")]
    MalformedJson(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an ItemNotFound error for any displayable key (id or name).
    pub fn item_not_found(key: impl ToString) -> Self {
        CoreError::ItemNotFound(key.to_string())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any store access so a bad request never opens a transaction.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            name: "Widget".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Not enough 'Widget' in stock: available 3, requested 5"
        );

        assert_eq!(CoreError::item_not_found(42).to_string(), "Item not found: 42");
        assert_eq!(
            CoreError::HistoryNotFound(7).to_string(),
            "History entry not found: 7"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::MustNotBeNegative {
            field: "price".to_string(),
        };
        assert_eq!(err.to_string(), "price must not be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "buyer".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
