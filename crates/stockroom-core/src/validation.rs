//! # Validation Module
//!
//! Input validation for Stockroom requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractor (axum Json)                                   │
//! │  └── Shape and type checks (deserialization)                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Field rules: names, quantities, prices, list sizes                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Store (inside the transaction)                               │
//! │  └── Existence and stock checks against current rows                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here runs before a transaction is opened.

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{ItemDraft, ItemUpdate, SaleLine};
use crate::{MAX_PAGE_SIZE, MAX_PRICE_CENTS, MAX_REQUEST_LINES, MAX_STOCK_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_EXTRA_INFO_LEN: usize = 2000;
const MAX_QUERY_LEN: usize = 200;
const MAX_USERNAME_LEN: usize = 64;
const MAX_PASSWORD_LEN: usize = 128;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an item name.
///
/// ```rust
/// use stockroom_core::validation::validate_item_name;
///
/// assert!(validate_item_name("Widget").is_ok());
/// assert!(validate_item_name("Шуруп 4x40").is_ok());
/// assert!(validate_item_name("   ").is_err());
/// ```
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    validate_required_text("name", name, MAX_NAME_LEN)
}

/// Validates the buyer of a wholesale sale.
pub fn validate_buyer(buyer: &str) -> ValidationResult<()> {
    validate_required_text("buyer", buyer, MAX_NAME_LEN)
}

/// Validates optional free text attached to an operation.
pub fn validate_extra_info(extra_info: Option<&str>) -> ValidationResult<()> {
    match extra_info {
        Some(text) if text.chars().count() > MAX_EXTRA_INFO_LEN => Err(ValidationError::TooLong {
            field: "extra_info".to_string(),
            max: MAX_EXTRA_INFO_LEN,
        }),
        _ => Ok(()),
    }
}

/// Validates a search query and returns it trimmed.
///
/// An empty query is allowed.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > MAX_QUERY_LEN {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: MAX_QUERY_LEN,
        });
    }

    Ok(query.to_string())
}

/// Validates a username for registration and login.
pub fn validate_username(username: &str) -> ValidationResult<()> {
    validate_required_text("username", username, MAX_USERNAME_LEN)?;

    if username.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }

    Ok(())
}

/// Validates a password. Only presence and length are enforced.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }

    if password.len() > MAX_PASSWORD_LEN {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: MAX_PASSWORD_LEN,
        });
    }

    Ok(())
}

fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a stock quantity (restock delta or absolute level).
///
/// ## Rules
/// - Must not be negative
/// - Must not exceed MAX_STOCK_QUANTITY
pub fn validate_stock_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_STOCK_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: MAX_STOCK_QUANTITY,
        });
    }

    Ok(())
}

/// Validates the quantity of a sale line. Selling zero units is rejected.
pub fn validate_sale_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_STOCK_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_STOCK_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price. Zero is allowed, anything above
/// [`MAX_PRICE_CENTS`] is not.
///
/// ```rust
/// use stockroom_core::money::Money;
/// use stockroom_core::validation::validate_price;
///
/// assert!(validate_price(Money::from_cents(0)).is_ok());
/// assert!(validate_price(Money::from_cents(-1)).is_err());
/// assert!(validate_price(Money::from_decimal(1e15).unwrap()).is_err());
/// ```
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "price".to_string(),
        });
    }

    if price.cents() > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates pagination parameters.
pub fn validate_page(skip: i64, limit: i64) -> ValidationResult<()> {
    if skip < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "skip".to_string(),
        });
    }

    if limit < 1 || limit > MAX_PAGE_SIZE {
        return Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1,
            max: MAX_PAGE_SIZE,
        });
    }

    Ok(())
}

// =============================================================================
// Request Validators
// =============================================================================

fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if count > MAX_REQUEST_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_REQUEST_LINES as i64,
        });
    }

    Ok(())
}

/// Validates a restock request.
pub fn validate_drafts(drafts: &[ItemDraft]) -> ValidationResult<()> {
    validate_line_count(drafts.len())?;

    for draft in drafts {
        validate_item_name(&draft.name)?;
        validate_stock_quantity(draft.quantity)?;
        validate_price(draft.price)?;
    }

    Ok(())
}

/// Validates an item update.
pub fn validate_item_update(update: &ItemUpdate) -> ValidationResult<()> {
    validate_item_name(&update.name)?;
    validate_stock_quantity(update.quantity)?;
    validate_price(update.price)?;
    validate_extra_info(update.extra_info.as_deref())
}

/// Validates the lines of a sale request.
pub fn validate_sale_lines(lines: &[SaleLine]) -> ValidationResult<()> {
    validate_line_count(lines.len())?;

    for line in lines {
        validate_item_name(&line.name)?;
        validate_sale_quantity(line.quantity)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
