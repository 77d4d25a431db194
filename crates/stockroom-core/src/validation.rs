//! # Validation Module
//!
//! Input validation utilities for Stockroom.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Screen controllers (stockroom-screens)                        │
//! │  ├── THIS MODULE: field rules, run before any I/O                       │
//! │  └── Failures become one-shot error effects, never error screens        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Database (SQLite)                                             │
//! │  ├── NOT NULL / CHECK constraints (stock >= 0, quantity > 0)            │
//! │  └── Foreign key constraints                                            │
//! │                                                                         │
//! │  Defense in depth: the schema backs every rule validated here           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_NAME_LEN, MAX_NOTES_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an entity name (product or supplier).
///
/// ## Rules
/// - Must not be blank
/// - Must be at most `MAX_NAME_LEN` characters
///
/// ## Example
/// ```rust
/// use stockroom_core::validation::validate_name;
///
/// assert!(validate_name("Coca-Cola 330ml").is_ok());
/// assert!(validate_name("   ").is_err());
/// ```
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates transaction notes.
///
/// ## Rules
/// - Optional; empty input means "no notes"
/// - At most `MAX_NOTES_LEN` characters
pub fn validate_notes(notes: &str) -> ValidationResult<()> {
    if notes.len() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LEN,
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a transaction quantity.
///
/// ## Rules
/// - Must be strictly positive; direction comes from the transaction kind,
///   never from the sign of the quantity
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

/// Validates a price.
///
/// ## Rules
/// - Must be strictly positive once a product is saved; there are no free
///   items in this inventory
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if !price.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "price".to_string(),
        });
    }
    Ok(())
}

/// Validates a stock level (current or minimum).
///
/// ## Rules
/// - Zero is fine (out of stock / no threshold), negative never is
pub fn validate_stock_level(level: i64, field: &str) -> ValidationResult<()> {
    if level < 0 {
        return Err(ValidationError::MustBeNonNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Contact Validation Policy
// =============================================================================

/// Configurable phone/email validation rules for the supplier form.
///
/// ## Why a policy and not constants?
/// Phone and email strictness is a deployment decision (a store that only
/// ever texts local suppliers has different needs than one importing via
/// e-mail). Keeping the rules as data lets the wiring layer tune them
/// without touching validation code.
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    /// Minimum number of digits in a phone number (ignoring a leading `+`).
    pub phone_min_digits: usize,
    /// Maximum number of digits in a phone number.
    pub phone_max_digits: usize,
    /// When true, the email domain must contain a `.` (reject `user@host`).
    pub require_email_tld: bool,
}

impl Default for ValidationPolicy {
    /// Lenient defaults matching common retail data entry: 10-15 digit
    /// phone numbers with an optional `+`, and emails without a TLD
    /// requirement.
    fn default() -> Self {
        ValidationPolicy {
            phone_min_digits: 10,
            phone_max_digits: 15,
            require_email_tld: false,
        }
    }
}

impl ValidationPolicy {
    /// Validates a phone number against this policy.
    ///
    /// Accepted shape: optional leading `+`, then only ASCII digits, with a
    /// digit count inside the configured range.
    pub fn validate_phone(&self, phone: &str) -> ValidationResult<()> {
        let phone = phone.trim();

        if phone.is_empty() {
            return Err(ValidationError::Required {
                field: "phone".to_string(),
            });
        }

        let digits = phone.strip_prefix('+').unwrap_or(phone);

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidFormat {
                field: "phone".to_string(),
                reason: "must contain only digits after an optional +".to_string(),
            });
        }

        if digits.len() < self.phone_min_digits || digits.len() > self.phone_max_digits {
            return Err(ValidationError::InvalidFormat {
                field: "phone".to_string(),
                reason: format!(
                    "must have between {} and {} digits",
                    self.phone_min_digits, self.phone_max_digits
                ),
            });
        }

        Ok(())
    }

    /// Validates an email address against this policy.
    ///
    /// Accepted shape: `local@domain`, where local is drawn from
    /// `[A-Za-z0-9+_.-]` and domain from `[A-Za-z0-9.-]`.
    pub fn validate_email(&self, email: &str) -> ValidationResult<()> {
        let email = email.trim();

        if email.is_empty() {
            return Err(ValidationError::Required {
                field: "email".to_string(),
            });
        }

        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: reason.to_string(),
        };

        let (local, domain) = match email.split_once('@') {
            Some(parts) => parts,
            None => return Err(invalid("must contain @")),
        };

        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(invalid("must look like name@domain"));
        }

        let local_ok = local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '_' | '.' | '-'));
        let domain_ok = domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'));

        if !local_ok || !domain_ok {
            return Err(invalid("contains invalid characters"));
        }

        if self.require_email_tld && !domain.contains('.') {
            return Err(invalid("domain must contain a dot"));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
