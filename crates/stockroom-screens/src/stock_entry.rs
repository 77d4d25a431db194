//! # Stock Entry Screen - the Stock Transaction Engine
//!
//! Records a sale or restock and adjusts the product's stock, atomically
//! from the caller's point of view.
//!
//! ## Submission State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      One Submission                                     │
//! │                                                                         │
//! │  Idle ──► Validating (no I/O) ──fail──► Idle + ShowErrorToUi            │
//! │              │                                                          │
//! │              ▼                                                          │
//! │           Looking-up (re-fetch product) ──missing──► Idle + error       │
//! │              │                                                          │
//! │              ▼                                                          │
//! │           Checking-stock ──insufficient──► Idle + error                 │
//! │              │                                                          │
//! │              ▼                                                          │
//! │           Persisting (one SQL transaction: insert + stock update,       │
//! │              │        sufficiency re-verified inside)                   │
//! │              ▼                                                          │
//! │           Idle + TransactionSaved                                       │
//! │                                                                         │
//! │  No retry state: the user edits the form and resubmits explicitly.      │
//! │  is_submitting is reset on every exit path.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stock level is never trusted from cached screen state: the product
//! is re-fetched at submission time and the sufficiency check is repeated
//! inside the storage transaction.

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::info;

use stockroom_core::validation::validate_notes;
use stockroom_core::{CoreError, StockTransaction, TransactionKind};
use stockroom_db::{Database, DbError};

use crate::ui_state::{EffectSender, StateCell, UiState};

// =============================================================================
// State / Intents / Effects
// =============================================================================

/// Form state for one stock entry session.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct StockEntryState {
    /// Selected product, if any.
    pub product_id: Option<i64>,
    /// Selected transaction kind, if any.
    pub kind: Option<TransactionKind>,
    /// Raw quantity text as typed; parsed only on submit.
    pub quantity: String,
    /// Raw notes text; empty means no notes.
    pub notes: String,

    /// (id, name) options for the product dropdown.
    pub product_options: Vec<(i64, String)>,

    /// True from the moment a submission passes field validation until its
    /// outcome lands.
    pub is_submitting: bool,
}

/// User actions on the stock entry form.
#[derive(Debug, Clone)]
pub enum StockEntryIntent {
    ProductSelected(i64),
    KindSelected(TransactionKind),
    QuantityChanged(String),
    NotesChanged(String),
    Submit,
}

/// One-shot outcomes delivered to the active observer.
#[derive(Debug, Clone, PartialEq)]
pub enum StockEntryEffect {
    TransactionSaved,
    ShowErrorToUi(String),
}

// =============================================================================
// Submission Failures
// =============================================================================

/// Why a submission did not go through. Every variant maps to a
/// human-readable message; nothing rawer reaches the rendering layer.
#[derive(Debug, Error)]
enum SubmitFailure {
    /// Missing/malformed field, or the product vanished before lookup.
    /// Matches the form-level wording for all of them.
    #[error("Invalid product selected")]
    InvalidInput,

    /// Business rule: a sale may not exceed available stock.
    #[error("{0}")]
    InsufficientStock(String),

    /// The store failed mid-operation.
    #[error("Failed to save: {0}")]
    Persistence(String),
}

// =============================================================================
// Screen Controller
// =============================================================================

/// Owns one stock entry session.
pub struct StockEntryScreen {
    db: Database,
    state: StateCell<StockEntryState>,
    state_rx: watch::Receiver<UiState<StockEntryState>>,
    effects: EffectSender<StockEntryEffect>,
    effects_rx: Option<mpsc::Receiver<StockEntryEffect>>,
    tasks: Vec<JoinHandle<()>>,
}

impl StockEntryScreen {
    /// Creates the screen and loads the product options.
    pub fn new(db: &Database) -> Self {
        let (state, state_rx) = StateCell::new();
        let (effects, effects_rx) = EffectSender::channel();

        // Options are a point-in-time pull; the form doesn't live-track the
        // catalog, submission re-validates against the store anyway.
        let load_task = {
            let db = db.clone();
            let state = state.clone();
            tokio::spawn(async move {
                match db.products().get_all().await {
                    Ok(products) => state.update_or_default(|current: &StockEntryState| StockEntryState {
                        product_options: products.iter().map(|p| (p.id, p.name.clone())).collect(),
                        ..current.clone()
                    }),
                    Err(err) => state.set_error(format!("Failed to load products: {err}")),
                }
            })
        };

        StockEntryScreen {
            db: db.clone(),
            state,
            state_rx,
            effects,
            effects_rx: Some(effects_rx),
            tasks: vec![load_task],
        }
    }

    /// The state channel handed to the rendering layer.
    pub fn state(&self) -> watch::Receiver<UiState<StockEntryState>> {
        self.state_rx.clone()
    }

    /// Takes the effect receiver; exactly one active observer at a time.
    pub fn take_effects(&mut self) -> Option<mpsc::Receiver<StockEntryEffect>> {
        self.effects_rx.take()
    }

    /// Handles one user action.
    pub async fn on_intent(&self, intent: StockEntryIntent) {
        match intent {
            StockEntryIntent::ProductSelected(id) => {
                self.state.update_or_default(|s| StockEntryState {
                    product_id: Some(id),
                    ..s.clone()
                });
            }
            StockEntryIntent::KindSelected(kind) => {
                self.state.update_or_default(|s| StockEntryState {
                    kind: Some(kind),
                    ..s.clone()
                });
            }
            StockEntryIntent::QuantityChanged(quantity) => {
                self.state.update_or_default(|s| StockEntryState {
                    quantity,
                    ..s.clone()
                });
            }
            StockEntryIntent::NotesChanged(notes) => {
                self.state
                    .update_or_default(|s| StockEntryState { notes, ..s.clone() });
            }
            StockEntryIntent::Submit => self.submit().await,
        }
    }

    /// Runs one submission.
    ///
    /// Field validation happens here with no I/O; everything after it runs
    /// detached, so tearing the screen down mid-write cannot cancel a
    /// half-applied operation. A detached outcome with no observer left is
    /// simply dropped by the effect queue.
    async fn submit(&self) {
        let form = self.state.current_or_default();

        // Validating: all three must hold before any I/O.
        let parsed_quantity = form.quantity.trim().parse::<i64>().ok();
        let (product_id, kind, quantity) = match (form.product_id, form.kind, parsed_quantity) {
            (Some(product_id), Some(kind), Some(quantity)) if quantity > 0 => {
                (product_id, kind, quantity)
            }
            _ => {
                self.effects
                    .emit(StockEntryEffect::ShowErrorToUi(
                        SubmitFailure::InvalidInput.to_string(),
                    ))
                    .await;
                return;
            }
        };

        if let Err(err) = validate_notes(&form.notes) {
            self.effects
                .emit(StockEntryEffect::ShowErrorToUi(err.to_string()))
                .await;
            return;
        }

        let notes = {
            let trimmed = form.notes.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };

        self.state.update_or_default(|s| StockEntryState {
            is_submitting: true,
            ..s.clone()
        });

        let db = self.db.clone();
        let state = self.state.clone();
        let effects = self.effects.clone();

        tokio::spawn(async move {
            let outcome = submit_transaction(&db, kind, product_id, quantity, notes).await;

            match outcome {
                Ok(saved) => {
                    info!(
                        transaction_id = saved.id,
                        product_id,
                        kind = %kind,
                        quantity,
                        "Stock transaction saved"
                    );
                    effects.emit(StockEntryEffect::TransactionSaved).await;
                }
                Err(failure) => {
                    effects
                        .emit(StockEntryEffect::ShowErrorToUi(failure.to_string()))
                        .await;
                }
            }

            state.update_or_default(|s| StockEntryState {
                is_submitting: false,
                ..s.clone()
            });
        });
    }
}

impl Drop for StockEntryScreen {
    fn drop(&mut self) {
        // Only the option loader is abortable; submissions run detached on
        // purpose (a half-applied write is worse than a late one).
        for task in &self.tasks {
            task.abort();
        }
    }
}

// =============================================================================
// The Engine
// =============================================================================

/// Looking-up, checking-stock and persisting, in order.
///
/// The pre-check against the freshly-fetched product gives the user a
/// message with real numbers in it; the storage layer then re-verifies the
/// same rule inside the SQL transaction, which is what actually makes
/// racing submissions safe.
async fn submit_transaction(
    db: &Database,
    kind: TransactionKind,
    product_id: i64,
    quantity: i64,
    notes: Option<String>,
) -> Result<StockTransaction, SubmitFailure> {
    // Looking-up: never act on cached stock figures.
    let product = db
        .products()
        .get_by_id(product_id)
        .await
        .map_err(|err| SubmitFailure::Persistence(err.to_string()))?
        .ok_or(SubmitFailure::InvalidInput)?;

    // Checking-stock.
    if let Err(err @ CoreError::InsufficientStock { .. }) = product.stock_after(kind, quantity) {
        return Err(SubmitFailure::InsufficientStock(err.to_string()));
    }

    // Persisting: both writes in one storage transaction.
    db.transactions()
        .apply_transaction(kind, product_id, quantity, notes)
        .await
        .map_err(|err| match err {
            // Lost the race since the pre-check; same user story.
            DbError::InsufficientStock {
                available,
                requested,
            } => SubmitFailure::InsufficientStock(
                CoreError::InsufficientStock {
                    name: product.name.clone(),
                    available,
                    requested,
                }
                .to_string(),
            ),
            DbError::NotFound { .. } => SubmitFailure::InvalidInput,
            other => SubmitFailure::Persistence(other.to_string()),
        })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use stockroom_core::Product;
    use stockroom_db::DbConfig;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

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

    async fn fill_and_submit(
        screen: &StockEntryScreen,
        product_id: Option<i64>,
        kind: Option<TransactionKind>,
        quantity: &str,
    ) {
        if let Some(id) = product_id {
            screen.on_intent(StockEntryIntent::ProductSelected(id)).await;
        }
        if let Some(kind) = kind {
            screen.on_intent(StockEntryIntent::KindSelected(kind)).await;
        }
        screen
            .on_intent(StockEntryIntent::QuantityChanged(quantity.to_string()))
            .await;
        screen.on_intent(StockEntryIntent::Submit).await;
    }

    #[tokio::test]
    async fn test_sale_adjusts_stock_and_signals_saved() {
        // Scenario: stock=10, sale of 3 leaves 7 and one recorded sale.
        let (db, product_id) = db_with_product(10).await;
        let mut screen = StockEntryScreen::new(&db);
        let mut effects = screen.take_effects().unwrap();

        fill_and_submit(&screen, Some(product_id), Some(TransactionKind::Sale), "3").await;

        assert_eq!(
            timeout(WAIT, effects.recv()).await.unwrap(),
            Some(StockEntryEffect::TransactionSaved)
        );

        let product = db.products().get_by_id(product_id).await.unwrap().unwrap();
        assert_eq!(product.current_stock, 7);

        let history = db.transactions().get_by_product(product_id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, TransactionKind::Sale);
        assert_eq!(history[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_oversell_is_rejected_and_stock_unchanged() {
        // Scenario: stock=2, sale of 5 records nothing.
        let (db, product_id) = db_with_product(2).await;
        let mut screen = StockEntryScreen::new(&db);
        let mut effects = screen.take_effects().unwrap();

        fill_and_submit(&screen, Some(product_id), Some(TransactionKind::Sale), "5").await;

        match timeout(WAIT, effects.recv()).await.unwrap() {
            Some(StockEntryEffect::ShowErrorToUi(message)) => {
                assert!(message.contains("Insufficient stock"), "got: {message}");
            }
            other => panic!("expected insufficient-stock error, got {other:?}"),
        }

        let product = db.products().get_by_id(product_id).await.unwrap().unwrap();
        assert_eq!(product.current_stock, 2);
        assert!(db.transactions().get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_product_selection_fails_without_io() {
        // Scenario: nothing selected -> invalid input, nothing recorded.
        let (db, _product_id) = db_with_product(10).await;
        let mut screen = StockEntryScreen::new(&db);
        let mut effects = screen.take_effects().unwrap();

        fill_and_submit(&screen, None, Some(TransactionKind::Sale), "3").await;

        assert_eq!(
            timeout(WAIT, effects.recv()).await.unwrap(),
            Some(StockEntryEffect::ShowErrorToUi(
                "Invalid product selected".to_string()
            ))
        );
        assert!(db.transactions().get_all().await.unwrap().is_empty());

        // Field validation never flips is_submitting.
        let state = screen.state().borrow().success().cloned();
        if let Some(state) = state {
            assert!(!state.is_submitting);
        }
    }

    #[tokio::test]
    async fn test_non_numeric_and_non_positive_quantities_are_invalid() {
        let (db, product_id) = db_with_product(10).await;
        let mut screen = StockEntryScreen::new(&db);
        let mut effects = screen.take_effects().unwrap();

        for bad_quantity in ["", "abc", "0", "-4"] {
            fill_and_submit(
                &screen,
                Some(product_id),
                Some(TransactionKind::Restock),
                bad_quantity,
            )
            .await;
            assert_eq!(
                timeout(WAIT, effects.recv()).await.unwrap(),
                Some(StockEntryEffect::ShowErrorToUi(
                    "Invalid product selected".to_string()
                )),
                "quantity {bad_quantity:?} should be invalid"
            );
        }

        assert!(db.transactions().get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restock_increases_stock() {
        let (db, product_id) = db_with_product(4).await;
        let mut screen = StockEntryScreen::new(&db);
        let mut effects = screen.take_effects().unwrap();

        fill_and_submit(&screen, Some(product_id), Some(TransactionKind::Restock), "6").await;

        assert_eq!(
            timeout(WAIT, effects.recv()).await.unwrap(),
            Some(StockEntryEffect::TransactionSaved)
        );
        let product = db.products().get_by_id(product_id).await.unwrap().unwrap();
        assert_eq!(product.current_stock, 10);
    }

    #[tokio::test]
    async fn test_stale_selection_of_deleted_product_is_invalid_input() {
        let (db, product_id) = db_with_product(10).await;
        let mut screen = StockEntryScreen::new(&db);
        let mut effects = screen.take_effects().unwrap();

        // Select, then the product disappears before submit.
        screen
            .on_intent(StockEntryIntent::ProductSelected(product_id))
            .await;
        db.products().delete(product_id).await.unwrap();

        fill_and_submit(&screen, None, Some(TransactionKind::Sale), "1").await;

        assert_eq!(
            timeout(WAIT, effects.recv()).await.unwrap(),
            Some(StockEntryEffect::ShowErrorToUi(
                "Invalid product selected".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_notes_are_trimmed_and_optional() {
        let (db, product_id) = db_with_product(10).await;
        let mut screen = StockEntryScreen::new(&db);
        let mut effects = screen.take_effects().unwrap();

        screen
            .on_intent(StockEntryIntent::NotesChanged("  damaged pallet  ".to_string()))
            .await;
        fill_and_submit(&screen, Some(product_id), Some(TransactionKind::Sale), "1").await;

        assert_eq!(
            timeout(WAIT, effects.recv()).await.unwrap(),
            Some(StockEntryEffect::TransactionSaved)
        );

        let history = db.transactions().get_by_product(product_id).await.unwrap();
        assert_eq!(history[0].notes.as_deref(), Some("damaged pallet"));
    }

    #[tokio::test]
    async fn test_product_options_load_for_the_dropdown() {
        let (db, product_id) = db_with_product(10).await;
        let screen = StockEntryScreen::new(&db);
        let mut state = screen.state();

        timeout(WAIT, async {
            loop {
                if let UiState::Success(s) = &*state.borrow_and_update() {
                    if s.product_options == vec![(product_id, "Coca-Cola".to_string())] {
                        return;
                    }
                }
                state.changed().await.expect("state channel closed");
            }
        })
        .await
        .expect("options never loaded");
    }
}
