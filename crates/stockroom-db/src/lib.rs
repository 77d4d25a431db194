//! # stockroom-db: Database Layer for Stockroom
//!
//! This crate provides database access for the Stockroom inventory tracker.
//! It uses SQLite for local storage with sqlx for async operations, and is
//! the single live data source every screen subscribes to.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Data Flow                              │
//! │                                                                         │
//! │  Screen controller (product list, stock entry, ...)                    │
//! │       │ CRUD + subscribe                                                │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    stockroom-db (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌───────────────┐   ┌──────────────────┐ │   │
//! │  │   │   Database    │   │  Repositories │   │  ChangeNotifier  │ │   │
//! │  │   │   (pool.rs)   │◄──│ product.rs    │──►│  (notifier.rs)   │ │   │
//! │  │   │               │   │ supplier.rs   │   │                  │ │   │
//! │  │   │ SqlitePool    │   │ transaction.rs│   │ broadcast of     │ │   │
//! │  │   │ + migrations  │   │               │   │ changed tables   │ │   │
//! │  │   └───────────────┘   └───────────────┘   └────────┬─────────┘ │   │
//! │  │                                                    │           │   │
//! │  │   live.rs: each subscription re-queries on notify ◄┘           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (WAL mode, foreign keys ON)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`notifier`] - Change notifier backing live queries
//! - [`live`] - Snapshot stream plumbing
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockroom_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/stockroom.db")).await?;
//!
//! // Point reads/writes
//! let product = db.products().get_by_id(1).await?;
//!
//! // Live snapshots: emits now and again after every relevant write
//! let mut snapshots = db.products().subscribe_all();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod live;
pub mod migrations;
pub mod notifier;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use notifier::{ChangeNotifier, StoreChange};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::product::ProductRepository;
pub use repository::supplier::SupplierRepository;
pub use repository::transaction::TransactionRepository;
