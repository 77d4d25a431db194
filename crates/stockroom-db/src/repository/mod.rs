//! # Repository Module
//!
//! Repository implementations for database access.
//!
//! ## Pattern
//! Each entity gets a repository struct that:
//! - Holds a clone of the connection pool and the change notifier
//! - Provides typed async CRUD methods
//! - Fires the notifier after every committed write (including the tables a
//!   referential action touched)
//! - Exposes live `subscribe_*` snapshot streams
//! - Returns `DbResult<T>` for all operations

pub mod product;
pub mod supplier;
pub mod transaction;

pub use product::ProductRepository;
pub use supplier::SupplierRepository;
pub use transaction::TransactionRepository;
