//! # Stock Transaction Repository
//!
//! Database operations for the stock movement audit trail.
//!
//! ## Immutability
//! There is deliberately no `update` here. Transactions are inserted once
//! and only ever removed by a product-delete cascade.
//!
//! ## Atomic Apply
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              apply_transaction (one SQL transaction)                    │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    1. SELECT current_stock FROM products WHERE id = ?   ← re-read       │
//! │    2. sale and current_stock < quantity?  → ROLLBACK, error             │
//! │    3. INSERT INTO stock_transactions ...                                │
//! │    4. UPDATE products SET current_stock = current_stock + delta         │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  The check rides inside the same transaction as both writes, so two     │
//! │  racing sales cannot both spend the same units, and a failed stock      │
//! │  update can never leave an orphaned transaction row behind.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::live::snapshot_stream;
use crate::notifier::{ChangeNotifier, StoreChange};
use stockroom_core::{StockTransaction, TransactionKind, TransactionWithProduct};

/// Repository for stock transaction database operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
    notifier: ChangeNotifier,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool, notifier: ChangeNotifier) -> Self {
        TransactionRepository { pool, notifier }
    }

    /// Lists all transactions, newest first.
    pub async fn get_all(&self) -> DbResult<Vec<StockTransaction>> {
        let transactions = sqlx::query_as::<_, StockTransaction>(
            r#"
            SELECT id, occurred_at, kind, product_id, quantity, notes
            FROM stock_transactions
            ORDER BY occurred_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    /// Lists transactions for one product, newest first.
    pub async fn get_by_product(&self, product_id: i64) -> DbResult<Vec<StockTransaction>> {
        let transactions = sqlx::query_as::<_, StockTransaction>(
            r#"
            SELECT id, occurred_at, kind, product_id, quantity, notes
            FROM stock_transactions
            WHERE product_id = ?1
            ORDER BY occurred_at DESC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    /// Lists all transactions joined with their product's name, newest first.
    pub async fn get_with_product(&self) -> DbResult<Vec<TransactionWithProduct>> {
        let rows = sqlx::query_as::<_, TransactionWithProduct>(
            r#"
            SELECT t.id, t.occurred_at, t.kind, t.product_id, t.quantity, t.notes,
                   p.name AS product_name
            FROM stock_transactions t
            INNER JOIN products p ON p.id = t.product_id
            ORDER BY t.occurred_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Lists the most recent transactions with product names.
    pub async fn get_recent_with_product(
        &self,
        limit: u32,
    ) -> DbResult<Vec<TransactionWithProduct>> {
        let rows = sqlx::query_as::<_, TransactionWithProduct>(
            r#"
            SELECT t.id, t.occurred_at, t.kind, t.product_id, t.quantity, t.notes,
                   p.name AS product_name
            FROM stock_transactions t
            INNER JOIN products p ON p.id = t.product_id
            ORDER BY t.occurred_at DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Inserts a bare transaction row without touching stock.
    ///
    /// ## When To Use
    /// Seeding and migration tooling only. Interactive stock movements go
    /// through [`apply_transaction`](Self::apply_transaction) so the stock
    /// level and the audit trail can never disagree.
    pub async fn insert(&self, transaction: &StockTransaction) -> DbResult<i64> {
        debug!(
            product_id = transaction.product_id,
            kind = %transaction.kind,
            "Inserting transaction"
        );

        let result = sqlx::query(
            r#"
            INSERT INTO stock_transactions (occurred_at, kind, product_id, quantity, notes)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(transaction.occurred_at)
        .bind(transaction.kind)
        .bind(transaction.product_id)
        .bind(transaction.quantity)
        .bind(&transaction.notes)
        .execute(&self.pool)
        .await?;

        self.notifier.notify(StoreChange::Transactions);

        Ok(result.last_insert_rowid())
    }

    /// Records a stock movement and adjusts the product's stock level as
    /// one atomic step.
    ///
    /// ## Arguments
    /// * `kind` - restock or sale
    /// * `product_id` - the affected product
    /// * `quantity` - units moved, must be positive (schema-enforced)
    /// * `notes` - optional annotation
    ///
    /// ## Returns
    /// The persisted transaction with its generated id and timestamp.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - product vanished before the apply
    /// * `DbError::InsufficientStock` - sale larger than the stock level
    ///   found inside the transaction
    pub async fn apply_transaction(
        &self,
        kind: TransactionKind,
        product_id: i64,
        quantity: i64,
        notes: Option<String>,
    ) -> DbResult<StockTransaction> {
        debug!(product_id, kind = %kind, quantity, "Applying stock transaction");

        let mut txn = self.pool.begin().await?;

        // Re-read the stock level inside the transaction; the caller's
        // earlier read may already be stale.
        let current: Option<i64> =
            sqlx::query_scalar("SELECT current_stock FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_optional(&mut *txn)
                .await?;

        let current = current.ok_or_else(|| DbError::not_found("Product", product_id))?;

        if kind == TransactionKind::Sale && current < quantity {
            // Dropping txn rolls back; nothing was written.
            return Err(DbError::InsufficientStock {
                available: current,
                requested: quantity,
            });
        }

        let occurred_at = Utc::now().timestamp_millis();

        let insert = sqlx::query(
            r#"
            INSERT INTO stock_transactions (occurred_at, kind, product_id, quantity, notes)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(occurred_at)
        .bind(kind)
        .bind(product_id)
        .bind(quantity)
        .bind(&notes)
        .execute(&mut *txn)
        .await?;

        let delta = kind.unit_delta() * quantity;

        sqlx::query(
            r#"
            UPDATE products
            SET current_stock = current_stock + ?2
            WHERE id = ?1
            "#,
        )
        .bind(product_id)
        .bind(delta)
        .execute(&mut *txn)
        .await?;

        txn.commit().await?;

        self.notifier.notify(StoreChange::Transactions);
        self.notifier.notify(StoreChange::Products);

        Ok(StockTransaction {
            id: insert.last_insert_rowid(),
            occurred_at,
            kind,
            product_id,
            quantity,
            notes,
        })
    }

    /// Live snapshots of all transactions joined with product names.
    ///
    /// Listens to BOTH tables: a product rename must re-emit even though no
    /// transaction row changed.
    pub fn subscribe_with_product(&self) -> ReceiverStream<DbResult<Vec<TransactionWithProduct>>> {
        let repo = self.clone();
        snapshot_stream(
            &self.notifier,
            &[StoreChange::Transactions, StoreChange::Products],
            move || {
                let repo = repo.clone();
                async move { repo.get_with_product().await }
            },
        )
    }

    /// Live snapshots of the most recent transactions with product names.
    pub fn subscribe_recent_with_product(
        &self,
        limit: u32,
    ) -> ReceiverStream<DbResult<Vec<TransactionWithProduct>>> {
        let repo = self.clone();
        snapshot_stream(
            &self.notifier,
            &[StoreChange::Transactions, StoreChange::Products],
            move || {
                let repo = repo.clone();
                async move { repo.get_recent_with_product(limit).await }
            },
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use stockroom_core::Product;

    async fn db_with_product(stock: i64) -> (Database, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let id = db
            .products()
            .insert(&Product {
                id: 0,
                name: "Coca-Cola".to_string(),
                description: String::new(),
                price_cents: 199,
                category: "Beverages".to_string(),
                barcode: String::new(),
                supplier_id: None,
                current_stock: stock,
                minimum_stock: 5,
            })
            .await
            .unwrap();
        (db, id)
    }

    #[tokio::test]
    async fn test_apply_sale_decrements_stock_and_records_row() {
        let (db, product_id) = db_with_product(10).await;

        let tx = db
            .transactions()
            .apply_transaction(TransactionKind::Sale, product_id, 3, None)
            .await
            .unwrap();

        assert!(tx.id > 0);
        assert_eq!(tx.quantity, 3);

        let product = db.products().get_by_id(product_id).await.unwrap().unwrap();
        assert_eq!(product.current_stock, 7);

        let rows = db.transactions().get_by_product(product_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, TransactionKind::Sale);
    }

    #[tokio::test]
    async fn test_apply_restock_increments_stock() {
        let (db, product_id) = db_with_product(2).await;

        db.transactions()
            .apply_transaction(TransactionKind::Restock, product_id, 8, None)
            .await
            .unwrap();

        let product = db.products().get_by_id(product_id).await.unwrap().unwrap();
        assert_eq!(product.current_stock, 10);
    }

    #[tokio::test]
    async fn test_oversell_rolls_back_everything() {
        let (db, product_id) = db_with_product(2).await;

        let err = db
            .transactions()
            .apply_transaction(TransactionKind::Sale, product_id, 5, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::InsufficientStock {
                available: 2,
                requested: 5
            }
        ));

        // No row recorded, stock untouched.
        let product = db.products().get_by_id(product_id).await.unwrap().unwrap();
        assert_eq!(product.current_stock, 2);
        assert!(db.transactions().get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_against_missing_product_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let err = db
            .transactions()
            .apply_transaction(TransactionKind::Sale, 404, 1, None)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_sales_cannot_oversell() {
        let (db, product_id) = db_with_product(10).await;

        // 4 racing sales of 3 units each against 10 in stock: exactly one
        // of them has to lose.
        let mut handles = Vec::new();
        for _ in 0..4 {
            let repo = db.transactions();
            handles.push(tokio::spawn(async move {
                repo.apply_transaction(TransactionKind::Sale, product_id, 3, None)
                    .await
            }));
        }

        let mut ok = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(DbError::InsufficientStock { .. }) => rejected += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(ok, 3);
        assert_eq!(rejected, 1);

        let product = db.products().get_by_id(product_id).await.unwrap().unwrap();
        assert_eq!(product.current_stock, 1);
    }

    #[tokio::test]
    async fn test_product_delete_cascades_transactions() {
        let (db, product_id) = db_with_product(10).await;

        db.transactions()
            .apply_transaction(TransactionKind::Sale, product_id, 1, None)
            .await
            .unwrap();

        db.products().delete(product_id).await.unwrap();

        assert!(db.transactions().get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_joined_rows_carry_product_name() {
        let (db, product_id) = db_with_product(10).await;

        db.transactions()
            .apply_transaction(TransactionKind::Restock, product_id, 5, Some("weekly".into()))
            .await
            .unwrap();

        let rows = db.transactions().get_with_product().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].product_name, "Coca-Cola");
        assert_eq!(rows[0].transaction.notes.as_deref(), Some("weekly"));
    }
}
