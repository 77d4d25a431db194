//! # Product Form Screen
//!
//! Add/edit form for products. Field values live in the state as raw text
//! exactly as typed; parsing and validation happen on save, before any I/O.
//!
//! Two live inputs feed the form besides the user: the supplier list (so a
//! supplier added in parallel shows up in the dropdown without reopening
//! the screen) and the barcode result stream (a completed scan fills the
//! barcode field, whatever else the user is doing).

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use stockroom_core::validation::{validate_name, validate_price, validate_stock_level};
use stockroom_core::{CoreError, Money, Product, Supplier, ValidationError, UNSAVED_ID};
use stockroom_db::Database;

use crate::barcode::BarcodeScanner;
use crate::ui_state::{EffectSender, StateCell, UiState};

// =============================================================================
// State / Intents / Effects
// =============================================================================

/// Form state for one product add/edit session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductFormState {
    pub screen_title: String,
    pub name: String,
    pub description: String,
    /// Raw price text; parsed to cents on save.
    pub price: String,
    pub category: String,
    pub barcode: String,
    pub supplier_id: Option<i64>,
    /// Raw stock-level texts; parsed on save.
    pub current_stock: String,
    pub minimum_stock: String,

    /// Supplier options, kept live.
    pub suppliers: Vec<Supplier>,

    pub is_saving: bool,
}

impl Default for ProductFormState {
    fn default() -> Self {
        ProductFormState {
            screen_title: "Add product".to_string(),
            name: String::new(),
            description: String::new(),
            price: String::new(),
            category: String::new(),
            barcode: String::new(),
            supplier_id: None,
            current_stock: String::new(),
            minimum_stock: String::new(),
            suppliers: Vec::new(),
            is_saving: false,
        }
    }
}

/// User actions on the product form.
#[derive(Debug, Clone)]
pub enum ProductFormIntent {
    NameChanged(String),
    DescriptionChanged(String),
    PriceChanged(String),
    CategoryChanged(String),
    BarcodeChanged(String),
    SupplierSelected(Option<i64>),
    CurrentStockChanged(String),
    MinimumStockChanged(String),
    ScanBarcode,
    AddSupplierClicked,
    Save,
}

/// One-shot outcomes delivered to the active observer.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductFormEffect {
    ProductSaved,
    NavigateToAddSupplier,
    ShowError(String),
}

// =============================================================================
// Screen Controller
// =============================================================================

/// Owns one product form session.
pub struct ProductFormScreen {
    db: Database,
    scanner: BarcodeScanner,
    state: StateCell<ProductFormState>,
    state_rx: watch::Receiver<UiState<ProductFormState>>,
    effects: EffectSender<ProductFormEffect>,
    effects_rx: Option<mpsc::Receiver<ProductFormEffect>>,
    /// Set when editing an existing product; save updates instead of inserts.
    edit_id: Option<i64>,
    tasks: Vec<JoinHandle<()>>,
}

impl ProductFormScreen {
    /// Creates an empty add-product form.
    pub fn new(db: &Database, scanner: &BarcodeScanner) -> Self {
        Self::build(db, scanner, None)
    }

    /// Creates an edit form pre-filled from the stored product.
    pub fn for_product(db: &Database, scanner: &BarcodeScanner, product_id: i64) -> Self {
        Self::build(db, scanner, Some(product_id))
    }

    fn build(db: &Database, scanner: &BarcodeScanner, edit_id: Option<i64>) -> Self {
        let (state, state_rx) = StateCell::new();
        let (effects, effects_rx) = EffectSender::channel();
        let mut tasks = Vec::new();

        // Live supplier options.
        tasks.push({
            let state = state.clone();
            let mut snapshots = db.suppliers().subscribe_all();
            tokio::spawn(async move {
                while let Some(snapshot) = snapshots.next().await {
                    match snapshot {
                        Ok(suppliers) => state.update_or_default(|s: &ProductFormState| ProductFormState {
                            suppliers: suppliers.clone(),
                            ..s.clone()
                        }),
                        Err(_) => {
                            state.set_error("Failed to load suppliers");
                            return;
                        }
                    }
                }
            })
        });

        // Completed scans fill the barcode field.
        tasks.push({
            let state = state.clone();
            let mut scans = BroadcastStream::new(scanner.results());
            tokio::spawn(async move {
                while let Some(scan) = scans.next().await {
                    // Lagged receivers just miss old scans.
                    if let Ok(code) = scan {
                        state.update_or_default(|s| ProductFormState {
                            barcode: code.clone(),
                            ..s.clone()
                        });
                    }
                }
            })
        });

        // Edit mode: pre-fill from storage.
        if let Some(product_id) = edit_id {
            tasks.push({
                let db = db.clone();
                let state = state.clone();
                tokio::spawn(async move {
                    match db.products().get_by_id(product_id).await {
                        Ok(Some(product)) => state.update_or_default(|s| ProductFormState {
                            screen_title: "Edit product".to_string(),
                            name: product.name.clone(),
                            description: product.description.clone(),
                            price: product.price().to_string(),
                            category: product.category.clone(),
                            barcode: product.barcode.clone(),
                            supplier_id: product.supplier_id,
                            current_stock: product.current_stock.to_string(),
                            minimum_stock: product.minimum_stock.to_string(),
                            ..s.clone()
                        }),
                        Ok(None) => {
                            state.set_error(CoreError::ProductNotFound(product_id).to_string())
                        }
                        Err(err) => state.set_error(format!("Failed to load product: {err}")),
                    }
                })
            });
        }

        ProductFormScreen {
            db: db.clone(),
            scanner: scanner.clone(),
            state,
            state_rx,
            effects,
            effects_rx: Some(effects_rx),
            edit_id,
            tasks,
        }
    }

    /// The state channel handed to the rendering layer.
    pub fn state(&self) -> watch::Receiver<UiState<ProductFormState>> {
        self.state_rx.clone()
    }

    /// Takes the effect receiver; exactly one active observer at a time.
    pub fn take_effects(&mut self) -> Option<mpsc::Receiver<ProductFormEffect>> {
        self.effects_rx.take()
    }

    /// Handles one user action.
    pub async fn on_intent(&self, intent: ProductFormIntent) {
        match intent {
            ProductFormIntent::NameChanged(name) => self.update(|s| ProductFormState {
                name,
                ..s.clone()
            }),
            ProductFormIntent::DescriptionChanged(description) => {
                self.update(|s| ProductFormState {
                    description,
                    ..s.clone()
                })
            }
            ProductFormIntent::PriceChanged(price) => self.update(|s| ProductFormState {
                price,
                ..s.clone()
            }),
            ProductFormIntent::CategoryChanged(category) => self.update(|s| ProductFormState {
                category,
                ..s.clone()
            }),
            ProductFormIntent::BarcodeChanged(barcode) => self.update(|s| ProductFormState {
                barcode,
                ..s.clone()
            }),
            ProductFormIntent::SupplierSelected(supplier_id) => {
                self.update(|s| ProductFormState {
                    supplier_id,
                    ..s.clone()
                })
            }
            ProductFormIntent::CurrentStockChanged(current_stock) => {
                self.update(|s| ProductFormState {
                    current_stock,
                    ..s.clone()
                })
            }
            ProductFormIntent::MinimumStockChanged(minimum_stock) => {
                self.update(|s| ProductFormState {
                    minimum_stock,
                    ..s.clone()
                })
            }
            ProductFormIntent::ScanBarcode => self.scan_barcode(),
            ProductFormIntent::AddSupplierClicked => {
                self.effects
                    .emit(ProductFormEffect::NavigateToAddSupplier)
                    .await;
            }
            ProductFormIntent::Save => self.save().await,
        }
    }

    fn update(&self, f: impl FnOnce(&ProductFormState) -> ProductFormState) {
        self.state.update_or_default(f);
    }

    /// Kicks off one scan; the result arrives through the result stream.
    /// A failed scan is an error effect and nothing else changes.
    fn scan_barcode(&self) {
        let scanner = self.scanner.clone();
        let effects = self.effects.clone();
        tokio::spawn(async move {
            if scanner.start_scan().await.is_err() {
                effects
                    .emit(ProductFormEffect::ShowError(
                        "There was an error scanning the barcode".to_string(),
                    ))
                    .await;
            }
        });
    }

    /// Validates and persists the form.
    async fn save(&self) {
        let form = self.state.current_or_default();

        let product = match build_product(&form, self.edit_id) {
            Ok(product) => product,
            Err(err) => {
                self.effects
                    .emit(ProductFormEffect::ShowError(err.to_string()))
                    .await;
                return;
            }
        };

        self.update(|s| ProductFormState {
            is_saving: true,
            ..s.clone()
        });

        // Detached: teardown must not cancel a save mid-write.
        let db = self.db.clone();
        let state = self.state.clone();
        let effects = self.effects.clone();
        let is_update = self.edit_id.is_some();

        tokio::spawn(async move {
            let result = if is_update {
                db.products().update(&product).await.map(|_| product.id)
            } else {
                db.products().insert(&product).await
            };

            state.update_or_default(|s| ProductFormState {
                is_saving: false,
                ..s.clone()
            });

            match result {
                Ok(id) => {
                    info!(product_id = id, updated = is_update, "Product saved");
                    effects.emit(ProductFormEffect::ProductSaved).await;
                }
                Err(err) => {
                    effects
                        .emit(ProductFormEffect::ShowError(format!(
                            "Failed to save product: {err}"
                        )))
                        .await;
                }
            }
        });
    }
}

impl Drop for ProductFormScreen {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Parses and validates the raw form into a persistable Product.
fn build_product(
    form: &ProductFormState,
    edit_id: Option<i64>,
) -> Result<Product, ValidationError> {
    validate_name(&form.name)?;

    let price: Money = Money::parse_decimal(&form.price)?;
    validate_price(price)?;

    let supplier_id = form.supplier_id.ok_or(ValidationError::NotSelected {
        field: "supplier".to_string(),
    })?;

    let current_stock = parse_stock(&form.current_stock, "current stock")?;
    validate_stock_level(current_stock, "current stock")?;

    let minimum_stock = parse_stock(&form.minimum_stock, "minimum stock")?;
    validate_stock_level(minimum_stock, "minimum stock")?;

    Ok(Product {
        id: edit_id.unwrap_or(UNSAVED_ID),
        name: form.name.trim().to_string(),
        description: form.description.trim().to_string(),
        price_cents: price.cents(),
        category: form.category.trim().to_string(),
        barcode: form.barcode.trim().to_string(),
        supplier_id: Some(supplier_id),
        current_stock,
        minimum_stock,
    })
}

/// Empty means zero; anything else must be a whole number.
fn parse_stock(input: &str, field: &str) -> Result<i64, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(0);
    }
    input
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a whole number".to_string(),
        })
}

// =============================================================================
// Unit Tests
// =============================================================================
