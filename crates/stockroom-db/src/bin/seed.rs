//! # Seed Data Generator
//!
//! Populates the database with demo suppliers, products and stock history
//! for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database file (./stockroom.db)
//! cargo run -p stockroom-db --bin seed
//!
//! # Specify database path
//! cargo run -p stockroom-db --bin seed -- --db ./data/stockroom.db
//! ```
//!
//! Seeding is idempotent: a database that already has products is left
//! untouched.

use std::env;

use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use stockroom_core::{Product, StockTransaction, Supplier, TransactionKind};
use stockroom_db::{Database, DbConfig, DbResult};

/// Demo suppliers.
const SUPPLIERS: &[(&str, &str, &str, &str, &str)] = &[
    (
        "Acme Beverages",
        "Rita Alvarez",
        "+14155550101",
        "orders@acmebev.com",
        "12 Dockside Ave",
    ),
    (
        "Fresh Field Dairy",
        "Jonas Keller",
        "+498955501012",
        "sales@freshfield.de",
        "Milchstrasse 4",
    ),
    (
        "Snackline Wholesale",
        "Priya Nair",
        "+442055501234",
        "contact@snackline.co.uk",
        "9 Market Row",
    ),
];

/// Demo products: (name, category, price cents, stock, minimum, supplier index).
const PRODUCTS: &[(&str, &str, i64, i64, i64, usize)] = &[
    ("Coca-Cola 330ml", "Beverages", 199, 48, 12, 0),
    ("Pepsi 330ml", "Beverages", 189, 36, 12, 0),
    ("Sparkling Water 1l", "Beverages", 99, 60, 24, 0),
    ("Nescafe Gold 200g", "Beverages", 899, 14, 6, 2),
    ("Whole Milk 1l", "Dairy", 129, 30, 10, 1),
    ("Cheddar 400g", "Dairy", 449, 12, 4, 1),
    ("Greek Yogurt 500g", "Dairy", 219, 8, 6, 1),
    ("Salted Crisps 150g", "Snacks", 249, 40, 10, 2),
    ("Dark Chocolate 85%", "Snacks", 329, 22, 8, 2),
    ("Trail Mix 250g", "Snacks", 389, 5, 8, 2),
];

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let db_path = parse_db_path().unwrap_or_else(|| "./stockroom.db".to_string());

    info!(db_path, "Seeding database");

    if let Err(err) = seed(&db_path).await {
        warn!(%err, "Seeding failed");
        std::process::exit(1);
    }
}

/// Reads `--db <path>` from the command line.
fn parse_db_path() -> Option<String> {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--db" {
            return args.next();
        }
    }
    None
}

async fn seed(db_path: &str) -> DbResult<()> {
    let db = Database::new(DbConfig::new(db_path)).await?;

    if db.products().count().await? > 0 {
        info!("Database already seeded, nothing to do");
        return Ok(());
    }

    let mut supplier_ids = Vec::new();
    for (name, contact, phone, email, address) in SUPPLIERS {
        let id = db
            .suppliers()
            .insert(&Supplier {
                id: 0,
                name: name.to_string(),
                contact_person: contact.to_string(),
                phone: phone.to_string(),
                email: email.to_string(),
                address: address.to_string(),
            })
            .await?;
        supplier_ids.push(id);
    }

    let mut product_ids = Vec::new();
    for (name, category, price_cents, stock, minimum, supplier_idx) in PRODUCTS {
        let id = db
            .products()
            .insert(&Product {
                id: 0,
                name: name.to_string(),
                description: format!("{name} ({category})"),
                price_cents: *price_cents,
                category: category.to_string(),
                barcode: String::new(),
                supplier_id: Some(supplier_ids[*supplier_idx]),
                current_stock: *stock,
                minimum_stock: *minimum,
            })
            .await?;
        product_ids.push(id);
    }

    // A little history so the transaction list and dashboard have content.
    // Bare inserts are fine here: the seeded stock levels above are the
    // levels after this history.
    let now = Utc::now().timestamp_millis();
    let history: &[(usize, TransactionKind, i64, i64)] = &[
        (0, TransactionKind::Restock, 48, 72),
        (4, TransactionKind::Restock, 30, 48),
        (0, TransactionKind::Sale, 6, 30),
        (7, TransactionKind::Sale, 4, 20),
        (9, TransactionKind::Sale, 3, 8),
    ];
    for (product_idx, kind, quantity, hours_ago) in history {
        db.transactions()
            .insert(&StockTransaction {
                id: 0,
                occurred_at: now - hours_ago * 60 * 60 * 1000,
                kind: *kind,
                product_id: product_ids[*product_idx],
                quantity: *quantity,
                notes: None,
            })
            .await?;
    }

    info!(
        suppliers = supplier_ids.len(),
        products = product_ids.len(),
        "Seed complete"
    );

    Ok(())
}
