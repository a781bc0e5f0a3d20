//! # Error Types
//!
//! Domain-specific error types for strand-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  strand-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ErrorKind        - Coarse taxonomy shared by every layer          │
//! │                                                                         │
//! │  strand-db errors (separate crate)                                     │
//! │  └── DbError          - Store failures, wraps CoreError                │
//! │                                                                         │
//! │  strand-server errors (app)                                            │
//! │  └── ApiError         - What HTTP clients see ({code, message})        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU code, ID, shortfall)
//! 3. Errors are enum variants, never String
//! 4. Every variant maps to exactly one [`ErrorKind`]

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::types::{Category, ShadeBand, StockTakeStatus, Tier};

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification of failures, stable across layers.
///
/// The HTTP layer maps kinds to status codes; callers decide whether to retry
/// from the kind alone (only `Persistence` is worth retrying).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Input is malformed or violates a business rule.
    Validation,
    /// A referenced entity does not exist.
    NotFound,
    /// Not enough stock to satisfy the request.
    InsufficientStock,
    /// Uniqueness retries exhausted, invalid state transition, locked session.
    Conflict,
    /// The store failed; nothing was written, safe to retry.
    Persistence,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Shade outside the 1-10 scale.
    #[error("Invalid shade {0}: must be between 1 and 10")]
    InvalidShade(i64),

    /// SKU cannot be found.
    ///
    /// ## When This Occurs
    /// - Checkout references an id that was never created or was deleted
    /// - Manual movement or stock-take item for an unknown id
    #[error("SKU not found: {0}")]
    SkuNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Stock-take not found: {0}")]
    StockTakeNotFound(String),

    /// No price matrix entry for the key and no manual override supplied.
    #[error("No price for {category:?} {tier:?} shade band {shade_band} at {length_cm} cm")]
    PriceNotFound {
        category: Category,
        tier: Tier,
        shade_band: ShadeBand,
        length_cm: i64,
    },

    /// Not enough stock to complete a movement or an order line.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (300 g of X-NB-STD-O03-SR-...)
    ///      │
    ///      ▼
    /// Re-read balance under write lock: available=200
    ///      │
    ///      ▼
    /// InsufficientStock { sku: "X-NB-...", available: 200, requested: 300 }
    ///      │
    ///      ▼
    /// Storefront shows: "Only 200 g left"
    /// ```
    #[error("Insufficient stock for {sku}: available {available} g, requested {requested} g")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Movement violates the SKU's sale-mode rules (wrong piece weight,
    /// adjustment to the current balance, etc.).
    #[error("Invalid movement for {sku}: {reason}")]
    InvalidMovement { sku: String, reason: String },

    #[error("Stock-take cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        from: StockTakeStatus,
        to: StockTakeStatus,
    },

    /// Stock-take no longer accepts the requested change.
    #[error("Stock-take {id} is {status:?}")]
    StockTakeLocked { id: String, status: StockTakeStatus },

    /// Every unique-code suffix up to the configured limit was taken.
    #[error("Could not find a free code for {base} after {attempts} attempts")]
    CodeSpaceExhausted { base: String, attempts: u32 },

    /// SKU has ledger or order history and cannot be deleted.
    #[error("SKU {0} has stock history and cannot be deleted")]
    SkuInUse(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidShade(_)
            | CoreError::InvalidMovement { .. }
            | CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::SkuNotFound(_)
            | CoreError::OrderNotFound(_)
            | CoreError::StockTakeNotFound(_)
            | CoreError::PriceNotFound { .. } => ErrorKind::NotFound,
            CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CoreError::InvalidTransition { .. }
            | CoreError::StockTakeLocked { .. }
            | CoreError::CodeSpaceExhausted { .. }
            | CoreError::SkuInUse(_) => ErrorKind::Conflict,
        }
    }

    /// Grams missing to satisfy an `InsufficientStock` request.
    pub fn shortfall(&self) -> Option<i64> {
        match self {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => Some(requested - available),
            _ => None,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any store access.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed email, unparsable shade band).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Amount or quantity whose arithmetic leaves the representable range.
    #[error("{field} is too large")]
    TooLarge { field: String },

    /// Field is set but not applicable in this context.
    #[error("{field} is not allowed: {reason}")]
    NotAllowed { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message_and_shortfall() {
        let err = CoreError::InsufficientStock {
            sku: "X-NB-STD-O03-SR-20-20250101-01".to_string(),
            available: 200,
            requested: 300,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for X-NB-STD-O03-SR-20-20250101-01: available 200 g, requested 300 g"
        );
        assert_eq!(err.shortfall(), Some(100));
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "email".to_string(),
        };
        assert_eq!(err.to_string(), "email is required");

        let err = ValidationError::OutOfRange {
            field: "lengthCm".to_string(),
            min: 1,
            max: 200,
        };
        assert_eq!(err.to_string(), "lengthCm must be between 1 and 200");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::Required {
            field: "items".to_string(),
        }
        .into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(CoreError::InvalidShade(11).kind(), ErrorKind::Validation);
        assert_eq!(CoreError::SkuNotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            CoreError::InvalidTransition {
                from: StockTakeStatus::Completed,
                to: StockTakeStatus::InProgress,
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            CoreError::CodeSpaceExhausted {
                base: "X".into(),
                attempts: 50
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(CoreError::SkuNotFound("x".into()).shortfall(), None);
    }

    #[test]
    fn test_error_kind_serializes_as_code() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::InsufficientStock).unwrap(),
            "\"INSUFFICIENT_STOCK\""
        );
    }
}
