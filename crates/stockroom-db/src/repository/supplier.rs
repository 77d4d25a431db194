//! # Supplier Repository
//!
//! Database operations for suppliers.
//!
//! ## Deletion Side Effects
//! Deleting a supplier does NOT delete its products; the schema nulls their
//! `supplier_id` instead. A delete therefore fires the notifier for both
//! `Suppliers` and `Products` so product lists pick up the nulled link.

use sqlx::SqlitePool;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::live::snapshot_stream;
use crate::notifier::{ChangeNotifier, StoreChange};
use stockroom_core::Supplier;

/// Repository for supplier database operations.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
    notifier: ChangeNotifier,
}

impl SupplierRepository {
    /// Creates a new SupplierRepository.
    pub fn new(pool: SqlitePool, notifier: ChangeNotifier) -> Self {
        SupplierRepository { pool, notifier }
    }

    /// Lists all suppliers, name-sorted.
    pub async fn get_all(&self) -> DbResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT id, name, contact_person, phone, email, address
            FROM suppliers
            ORDER BY name COLLATE NOCASE ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(suppliers)
    }

    /// Gets a supplier by its ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT id, name, contact_person, phone, email, address
            FROM suppliers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(supplier)
    }

    /// Inserts a new supplier and returns its generated id.
    pub async fn insert(&self, supplier: &Supplier) -> DbResult<i64> {
        debug!(name = %supplier.name, "Inserting supplier");

        let result = sqlx::query(
            r#"
            INSERT INTO suppliers (name, contact_person, phone, email, address)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&supplier.name)
        .bind(&supplier.contact_person)
        .bind(&supplier.phone)
        .bind(&supplier.email)
        .bind(&supplier.address)
        .execute(&self.pool)
        .await?;

        self.notifier.notify(StoreChange::Suppliers);

        Ok(result.last_insert_rowid())
    }

    /// Updates an existing supplier.
    pub async fn update(&self, supplier: &Supplier) -> DbResult<()> {
        debug!(id = supplier.id, "Updating supplier");

        let result = sqlx::query(
            r#"
            UPDATE suppliers SET
                name = ?2,
                contact_person = ?3,
                phone = ?4,
                email = ?5,
                address = ?6
            WHERE id = ?1
            "#,
        )
        .bind(supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.contact_person)
        .bind(&supplier.phone)
        .bind(&supplier.email)
        .bind(&supplier.address)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", supplier.id));
        }

        self.notifier.notify(StoreChange::Suppliers);

        Ok(())
    }

    /// Deletes a supplier. Dependent products survive with `supplier_id`
    /// set to NULL.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting supplier");

        let result = sqlx::query("DELETE FROM suppliers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }

        // SET NULL touched product rows as well.
        self.notifier.notify(StoreChange::Suppliers);
        self.notifier.notify(StoreChange::Products);

        Ok(())
    }

    /// Live snapshots of all suppliers, name-sorted.
    pub fn subscribe_all(&self) -> ReceiverStream<DbResult<Vec<Supplier>>> {
        let repo = self.clone();
        snapshot_stream(&self.notifier, &[StoreChange::Suppliers], move || {
            let repo = repo.clone();
            async move { repo.get_all().await }
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use stockroom_core::{Product, Supplier};

    fn supplier(name: &str) -> Supplier {
        Supplier {
            id: 0,
            name: name.to_string(),
            contact_person: "Sam Vendor".to_string(),
            phone: "+4915123456789".to_string(),
            email: "orders@example.com".to_string(),
            address: "1 Warehouse Way".to_string(),
        }
    }

    #[tokio::test]
    async fn test_delete_supplier_nulls_product_reference() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let supplier_id = db.suppliers().insert(&supplier("Acme")).await.unwrap();
        let product_id = db
            .products()
            .insert(&Product {
                id: 0,
                name: "Coca-Cola".to_string(),
                description: String::new(),
                price_cents: 199,
                category: "Beverages".to_string(),
                barcode: String::new(),
                supplier_id: Some(supplier_id),
                current_stock: 10,
                minimum_stock: 2,
            })
            .await
            .unwrap();

        db.suppliers().delete(supplier_id).await.unwrap();

        // The product survives, just without the link.
        let product = db.products().get_by_id(product_id).await.unwrap().unwrap();
        assert_eq!(product.supplier_id, None);
    }

    #[tokio::test]
    async fn test_round_trip_and_sorting() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.suppliers();

        repo.insert(&supplier("Zenith Goods")).await.unwrap();
        repo.insert(&supplier("Acme")).await.unwrap();

        let all = repo.get_all().await.unwrap();
        let names: Vec<_> = all.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Acme", "Zenith Goods"]);
    }

    #[tokio::test]
    async fn test_delete_missing_supplier_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.suppliers().delete(404).await.is_err());
    }
}
