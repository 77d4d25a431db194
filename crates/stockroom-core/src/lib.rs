//! # stockroom-core: Pure Business Logic for Stockroom
//!
//! This crate is the heart of Stockroom, a local-first retail inventory
//! tracker. It contains all business logic as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Stockroom Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 stockroom-screens (reactive layer)              │   │
//! │  │   Product list ── Supplier list ── Transactions ── Stock entry  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stockroom-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────────────────────┐  │   │
//! │  │   │   types   │  │   money   │  │        validation         │  │   │
//! │  │   │  Product  │  │   Money   │  │  field rules + policy     │  │   │
//! │  │   │  Supplier │  │  (cents)  │  │  stock arithmetic checks  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CHANNELS • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 stockroom-db (Database Layer)                   │   │
//! │  │        SQLite queries, migrations, live subscriptions           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Supplier, StockTransaction)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use stockroom_core::Product` instead of
// `use stockroom_core::types::Product`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;
pub use validation::ValidationPolicy;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Identity value for entities that have not been persisted yet.
///
/// ## Why 0?
/// SQLite AUTOINCREMENT primary keys start at 1, so 0 can never collide
/// with a stored row. Forms build entities with id 0 and the database
/// layer fills in the real id on insert.
pub const UNSAVED_ID: i64 = 0;

/// Maximum length for entity names (products and suppliers).
pub const MAX_NAME_LEN: usize = 200;

/// Maximum length for free-text notes on a stock transaction.
///
/// ## Business Reason
/// Notes are a short annotation ("damaged pallet", "weekly delivery"),
/// not a document store.
pub const MAX_NOTES_LEN: usize = 500;
