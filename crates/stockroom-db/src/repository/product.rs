//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - CRUD with change notification
//! - Low-stock lookup for the dashboard
//! - Live snapshot subscriptions
//!
//! ## Deletion Side Effects
//! Deleting a product cascades to its stock transactions (schema rule), so
//! a delete fires the notifier for BOTH `Products` and `Transactions`;
//! transaction-list screens re-emit without ever knowing why.

use sqlx::SqlitePool;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::live::snapshot_stream;
use crate::notifier::{ChangeNotifier, StoreChange};
use stockroom_core::Product;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let all = repo.get_all().await?;
/// let one = repo.get_by_id(7).await?;
/// let mut live = repo.subscribe_all();
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    notifier: ChangeNotifier,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool, notifier: ChangeNotifier) -> Self {
        ProductRepository { pool, notifier }
    }

    /// Lists all products, name-sorted (the default list order).
    pub async fn get_all(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price_cents, category, barcode,
                   supplier_id, current_stock, minimum_stock
            FROM products
            ORDER BY name COLLATE NOCASE ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price_cents, category, barcode,
                   supplier_id, current_stock, minimum_stock
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists products at or below their minimum stock level, name-sorted.
    pub async fn get_low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price_cents, category, barcode,
                   supplier_id, current_stock, minimum_stock
            FROM products
            WHERE current_stock <= minimum_stock
            ORDER BY name COLLATE NOCASE ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Inserts a new product and returns its generated id.
    ///
    /// The `id` field of the argument is ignored (0 for unsaved entities).
    pub async fn insert(&self, product: &Product) -> DbResult<i64> {
        debug!(name = %product.name, "Inserting product");

        let result = sqlx::query(
            r#"
            INSERT INTO products (
                name, description, price_cents, category, barcode,
                supplier_id, current_stock, minimum_stock
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(&product.category)
        .bind(&product.barcode)
        .bind(product.supplier_id)
        .bind(product.current_stock)
        .bind(product.minimum_stock)
        .execute(&self.pool)
        .await?;

        self.notifier.notify(StoreChange::Products);

        Ok(result.last_insert_rowid())
    }

    /// Updates an existing product.
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                description = ?3,
                price_cents = ?4,
                category = ?5,
                barcode = ?6,
                supplier_id = ?7,
                current_stock = ?8,
                minimum_stock = ?9
            WHERE id = ?1
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(&product.category)
        .bind(&product.barcode)
        .bind(product.supplier_id)
        .bind(product.current_stock)
        .bind(product.minimum_stock)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product.id));
        }

        self.notifier.notify(StoreChange::Products);

        Ok(())
    }

    /// Deletes a product. Its stock transactions go with it (cascade).
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        // The cascade removed transaction rows too.
        self.notifier.notify(StoreChange::Products);
        self.notifier.notify(StoreChange::Transactions);

        Ok(())
    }

    /// Counts products (for diagnostics and seed idempotence).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Live snapshots of all products, name-sorted.
    ///
    /// Emits the current snapshot immediately, then again after every
    /// committed product write.
    pub fn subscribe_all(&self) -> ReceiverStream<DbResult<Vec<Product>>> {
        let repo = self.clone();
        snapshot_stream(&self.notifier, &[StoreChange::Products], move || {
            let repo = repo.clone();
            async move { repo.get_all().await }
        })
    }

    /// Live snapshots of products at or below minimum stock.
    pub fn subscribe_low_stock(&self) -> ReceiverStream<DbResult<Vec<Product>>> {
        let repo = self.clone();
        snapshot_stream(&self.notifier, &[StoreChange::Products], move || {
            let repo = repo.clone();
            async move { repo.get_low_stock().await }
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
