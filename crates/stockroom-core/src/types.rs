//! # Domain Types
//!
//! Core domain types used throughout Stockroom.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Supplier     │   │StockTransaction │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (i64)       │   │  id (i64)       │   │  id (i64)       │       │
//! │  │  name           │   │  name           │   │  occurred_at    │       │
//! │  │  price_cents    │   │  contact_person │   │  kind           │       │
//! │  │  supplier_id ───┼──►│  phone / email  │   │  product_id     │       │
//! │  │  current_stock  │◄──┼─────────────────┼───┤  quantity       │       │
//! │  │  minimum_stock  │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  Referential rules (enforced by the storage schema):                    │
//! │  • delete Supplier  → dependent Product.supplier_id set to NULL         │
//! │  • delete Product   → its StockTransactions are deleted (cascade)       │
//! │  • StockTransaction rows are insert-only, never updated                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product tracked in inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier. 0 means the product has not been saved yet.
    pub id: i64,

    /// Display name shown in lists and on the stock-entry screen.
    pub name: String,

    /// Free-text description.
    pub description: String,

    /// Price in cents (smallest currency unit). Positive once saved.
    pub price_cents: i64,

    /// Free-text category used as a discrete list filter.
    pub category: String,

    /// Barcode (EAN-13, UPC-A, etc.). May be empty when never scanned.
    pub barcode: String,

    /// Supplier reference. `None` means "no supplier", which is a valid
    /// state both for new products and after a supplier is deleted.
    pub supplier_id: Option<i64>,

    /// Current stock level. Never negative.
    pub current_stock: i64,

    /// Threshold below-or-at which the product counts as low stock.
    pub minimum_stock: i64,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Whether this product is at or below its minimum stock level.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.minimum_stock
    }

    /// Computes the stock level after applying a transaction of the given
    /// kind and quantity.
    ///
    /// ## Business Rule
    /// A sale may never take stock below zero. Restocks always succeed.
    ///
    /// ## Returns
    /// * `Ok(new_level)` - the level to persist
    /// * `Err(CoreError::InsufficientStock)` - sale larger than available stock
    pub fn stock_after(&self, kind: TransactionKind, quantity: i64) -> CoreResult<i64> {
        match kind {
            TransactionKind::Restock => Ok(self.current_stock + quantity),
            TransactionKind::Sale => {
                if self.current_stock < quantity {
                    Err(CoreError::InsufficientStock {
                        name: self.name.clone(),
                        available: self.current_stock,
                        requested: quantity,
                    })
                } else {
                    Ok(self.current_stock - quantity)
                }
            }
        }
    }
}

// =============================================================================
// Supplier
// =============================================================================

/// A supplier that products can reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Supplier {
    /// Unique identifier. 0 means the supplier has not been saved yet.
    pub id: i64,
    pub name: String,
    pub contact_person: String,
    pub phone: String,
    pub email: String,
    pub address: String,
}

// =============================================================================
// Transaction Kind
// =============================================================================

/// The two kinds of stock-affecting transaction.
///
/// Closed set: every dispatch over this type is an exhaustive `match`,
/// so adding a kind is a compile-time event across the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Goods received; increases stock.
    Restock,
    /// Goods sold; decreases stock, subject to the sufficiency rule.
    Sale,
}

impl TransactionKind {
    /// The signed effect one unit of this kind has on stock.
    #[inline]
    pub const fn unit_delta(&self) -> i64 {
        match self {
            TransactionKind::Restock => 1,
            TransactionKind::Sale => -1,
        }
    }

    /// Stable storage/display label ("restock" / "sale").
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Restock => "restock",
            TransactionKind::Sale => "sale",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "restock" => Ok(TransactionKind::Restock),
            "sale" => Ok(TransactionKind::Sale),
            _ => Err(ValidationError::NotAllowed {
                field: "transaction kind".to_string(),
                allowed: vec!["restock".to_string(), "sale".to_string()],
            }),
        }
    }
}

// =============================================================================
// Stock Transaction
// =============================================================================

/// A recorded stock movement.
///
/// ## Immutability
/// Transactions are the audit trail of the inventory. They are inserted
/// once and never updated; corrections are made with a compensating
/// transaction, not an edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockTransaction {
    /// Unique identifier. 0 means not yet persisted.
    pub id: i64,

    /// When the transaction happened, as epoch milliseconds.
    pub occurred_at: i64,

    /// Restock or sale.
    pub kind: TransactionKind,

    /// The affected product. Non-null; rows are removed when the product is
    /// deleted (cascade).
    pub product_id: i64,

    /// Units moved. Always positive; direction comes from `kind`.
    pub quantity: i64,

    /// Optional free-text annotation.
    pub notes: Option<String>,
}

impl StockTransaction {
    /// The signed change this transaction applies to the product's stock.
    #[inline]
    pub fn stock_delta(&self) -> i64 {
        self.kind.unit_delta() * self.quantity
    }
}

// =============================================================================
// Joined Rows
// =============================================================================

/// A transaction joined with its product's display name.
///
/// Used by the transaction list (search matches on the product name) and
/// the dashboard's recent-activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TransactionWithProduct {
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub transaction: StockTransaction,
    pub product_name: String,
}

// =============================================================================
// Unit Tests
// =============================================================================
