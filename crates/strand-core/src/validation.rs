//! # Validation Module
//!
//! Input validation utilities shared by catalog, ledger and checkout inputs.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP (serde)                                                 │
//! │  └── Type validation (deserialization into typed input structs)        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: strand-core                                                  │
//! │  └── THIS MODULE: field rules, run once at the boundary                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── CHECK constraints (grams > 0, sale-mode columns)                  │
//! │  ├── UNIQUE constraints (code, short_code, price key)                  │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest hair length offered, in centimeters.
pub const MAX_LENGTH_CM: i64 = 200;

/// Heaviest single piece, in grams.
pub const MAX_PIECE_WEIGHT_GRAMS: i64 = 5_000;

/// Upper bound for any single movement or order line.
pub const MAX_MOVEMENT_GRAMS: i64 = 1_000_000;

const MAX_TEXT_LEN: usize = 500;

// =============================================================================
// String Validators
// =============================================================================

/// Validates that a required text field is present.
///
/// ## Returns
/// The trimmed value.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > MAX_TEXT_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_LEN,
        });
    }

    Ok(value.to_string())
}

/// Validates an optional free-text field (notes, reason, location).
///
/// Blank strings collapse to `None`.
pub fn validate_optional_text(field: &str, value: Option<&str>) -> ValidationResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.len() > MAX_TEXT_LEN => Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_LEN,
        }),
        Some(v) => Ok(Some(v.to_string())),
    }
}

/// Validates a customer email address.
///
/// Only the shape is checked (`local@domain.tld`); deliverability is the
/// mailer's problem.
///
/// ## Example
/// ```rust
/// use strand_core::validation::validate_email;
///
/// assert!(validate_email("jana@example.cz").is_ok());
/// assert!(validate_email("jana").is_err());
/// assert!(validate_email("").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = validate_required("email", email)?;

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "expected an address like name@example.com".to_string(),
        });
    }

    Ok(email)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a hair length in centimeters.
pub fn validate_length_cm(length_cm: i64) -> ValidationResult<()> {
    if !(1..=MAX_LENGTH_CM).contains(&length_cm) {
        return Err(ValidationError::OutOfRange {
            field: "lengthCm".to_string(),
            min: 1,
            max: MAX_LENGTH_CM,
        });
    }
    Ok(())
}

/// Validates a piece weight.
pub fn validate_piece_weight(grams: i64) -> ValidationResult<()> {
    if !(1..=MAX_PIECE_WEIGHT_GRAMS).contains(&grams) {
        return Err(ValidationError::OutOfRange {
            field: "weightTotalGrams".to_string(),
            min: 1,
            max: MAX_PIECE_WEIGHT_GRAMS,
        });
    }
    Ok(())
}

/// Validates a gram amount that must be strictly positive.
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Inventory: Record IN                                                   │
/// │                                                                         │
/// │  Operator enters grams: 250                                            │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_positive_grams("grams", 250) ← THIS FUNCTION                 │
/// │       │                                                                 │
/// │       ├── grams <= 0? → Error: "grams must be positive"                │
/// │       │                                                                 │
/// │       ├── grams > 1 000 000? → Error: out of range                     │
/// │       │                                                                 │
/// │       └── OK → movement is recorded                                    │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_positive_grams(field: &str, grams: i64) -> ValidationResult<()> {
    if grams <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if grams > MAX_MOVEMENT_GRAMS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_MOVEMENT_GRAMS,
        });
    }

    Ok(())
}

/// Validates a gram amount that may be zero (stock-take counts, adjust targets).
pub fn validate_non_negative_grams(field: &str, grams: i64) -> ValidationResult<()> {
    if !(0..=MAX_MOVEMENT_GRAMS).contains(&grams) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_MOVEMENT_GRAMS,
        });
    }
    Ok(())
}

/// Validates a per-gram price or fee.
///
/// ## Example
/// ```rust
/// use strand_core::money::Money;
/// use strand_core::validation::validate_price;
///
/// assert!(validate_price("czk", Money::from_minor(500)).is_ok());
/// assert!(validate_price("czk", Money::zero()).is_err());
/// ```
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if !price.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates an amount that may be zero (discounts, assembly fees).
pub fn validate_non_negative_money(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required() {
        assert_eq!(validate_required("firstName", "  Jana ").unwrap(), "Jana");
        assert!(validate_required("firstName", "").is_err());
        assert!(validate_required("firstName", "   ").is_err());
        assert!(validate_required("firstName", &"a".repeat(501)).is_err());
    }

    #[test]
    fn test_validate_optional_text() {
        assert_eq!(validate_optional_text("notes", None).unwrap(), None);
        assert_eq!(validate_optional_text("notes", Some("  ")).unwrap(), None);
        assert_eq!(
            validate_optional_text("notes", Some(" shelf A ")).unwrap(),
            Some("shelf A".to_string())
        );
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("jana@example.cz").is_ok());
        assert!(validate_email("jana@localhost").is_err());
        assert!(validate_email("@example.cz").is_err());
        assert!(validate_email("jana @example.cz").is_err());
        assert!(validate_email("jana@.cz").is_err());
    }

    #[test]
    fn test_validate_length() {
        assert!(validate_length_cm(50).is_ok());
        assert!(validate_length_cm(0).is_err());
        assert!(validate_length_cm(201).is_err());
    }

    #[test]
    fn test_validate_grams() {
        assert!(validate_positive_grams("grams", 1).is_ok());
        assert!(validate_positive_grams("grams", 0).is_err());
        assert!(validate_positive_grams("grams", -5).is_err());
        assert!(validate_positive_grams("grams", MAX_MOVEMENT_GRAMS + 1).is_err());

        assert!(validate_non_negative_grams("countedGrams", 0).is_ok());
        assert!(validate_non_negative_grams("countedGrams", -1).is_err());
    }

    #[test]
    fn test_validate_money() {
        assert!(validate_price("eur", Money::from_minor(1)).is_ok());
        assert!(validate_price("eur", Money::from_minor(-1)).is_err());
        assert!(validate_non_negative_money("discount", Money::zero()).is_ok());
        assert!(validate_non_negative_money("discount", Money::from_minor(-1)).is_err());
    }
}
