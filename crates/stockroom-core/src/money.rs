//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Prices are stored, compared and summed as i64 cents.                │
//! │    Only the UI converts to a decimal string for display and entry.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: room for arithmetic without overflow in practice
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - Serializes as a bare integer of cents
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Zero value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Whether this amount is strictly positive.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Parses a user-entered decimal string like `"12.99"`, `"5"` or `"0.5"`
    /// into cents, without ever going through floating point.
    ///
    /// ## Rules
    /// - At most one `.` separator
    /// - At most two fractional digits (prices are entered in cents precision)
    /// - No sign, no grouping separators
    ///
    /// ## Example
    /// ```rust
    /// use stockroom_core::money::Money;
    ///
    /// assert_eq!(Money::parse_decimal("12.99").unwrap().cents(), 1299);
    /// assert_eq!(Money::parse_decimal("5").unwrap().cents(), 500);
    /// assert_eq!(Money::parse_decimal("0.5").unwrap().cents(), 50);
    /// assert!(Money::parse_decimal("12.995").is_err());
    /// assert!(Money::parse_decimal("abc").is_err());
    /// ```
    pub fn parse_decimal(input: &str) -> Result<Self, ValidationError> {
        let input = input.trim();

        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "price".to_string(),
            reason: reason.to_string(),
        };

        if input.is_empty() {
            return Err(ValidationError::Required {
                field: "price".to_string(),
            });
        }

        let (whole, frac) = match input.split_once('.') {
            Some((w, f)) => (w, f),
            None => (input, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("must be a number"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("must be a number"));
        }
        if !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("must be a number"));
        }
        if frac.len() > 2 {
            return Err(invalid("at most two decimal places"));
        }

        let whole_cents: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse::<i64>().map_err(|_| invalid("too large"))? * 100
        };

        // "5" -> 0, "5.9" -> 90, "5.99" -> 99
        let frac_cents: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().unwrap_or(0) * 10,
            _ => frac.parse::<i64>().unwrap_or(0),
        };

        Ok(Money(whole_cents + frac_cents))
    }
}

impl fmt::Display for Money {
    /// Formats as a plain decimal string ("12.99"); currency symbols are a
    /// rendering concern.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal() {
        assert_eq!(Money::parse_decimal("12.99").unwrap().cents(), 1299);
        assert_eq!(Money::parse_decimal("5").unwrap().cents(), 500);
        assert_eq!(Money::parse_decimal("0.5").unwrap().cents(), 50);
        assert_eq!(Money::parse_decimal(" 3.00 ").unwrap().cents(), 300);
        assert_eq!(Money::parse_decimal(".99").unwrap().cents(), 99);
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        assert!(Money::parse_decimal("").is_err());
        assert!(Money::parse_decimal("abc").is_err());
        assert!(Money::parse_decimal("12.995").is_err());
        assert!(Money::parse_decimal("-5").is_err());
        assert!(Money::parse_decimal("1,000").is_err());
        assert!(Money::parse_decimal(".").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1299).to_string(), "12.99");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-250).to_string(), "-2.50");
    }

    #[test]
    fn test_is_positive() {
        assert!(Money::from_cents(1).is_positive());
        assert!(!Money::zero().is_positive());
        assert!(!Money::from_cents(-1).is_positive());
    }
}
