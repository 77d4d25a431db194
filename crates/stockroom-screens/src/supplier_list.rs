//! # Supplier List Screen
//!
//! Live supplier list with a debounced name search. The combination here is
//! pure (no auxiliary lookups), so each recompute runs to completion without
//! suspension and latest-wins holds trivially.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;

use stockroom_core::Supplier;
use stockroom_db::Database;

use crate::debounce::debounce;
use crate::ui_state::{EffectSender, StateCell, UiState};
use crate::SEARCH_DEBOUNCE;

// =============================================================================
// State / Intents / Effects
// =============================================================================

/// Immutable view-state snapshot for the supplier list.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct SupplierListState {
    /// Filtered, name-sorted suppliers.
    pub suppliers: Vec<Supplier>,
    /// The query that produced them.
    pub search_query: String,
}

/// User actions on the supplier list.
#[derive(Debug, Clone)]
pub enum SupplierListIntent {
    SearchChanged(String),
    ClearSearch,
    SupplierClicked(i64),
    DeleteSupplier(i64),
    AddSupplierClicked,
}

/// One-shot outcomes delivered to the active observer.
#[derive(Debug, Clone, PartialEq)]
pub enum SupplierListEffect {
    NavigateToAddSupplier,
    NavigateToSupplierDetail(i64),
    ShowErrorToUi(String),
    ShowMessageToUi(String),
}

// =============================================================================
// Screen Controller
// =============================================================================

/// Owns the supplier list pipeline for one screen session.
pub struct SupplierListScreen {
    db: Database,
    state_rx: watch::Receiver<UiState<SupplierListState>>,
    effects: EffectSender<SupplierListEffect>,
    effects_rx: Option<mpsc::Receiver<SupplierListEffect>>,
    query_tx: watch::Sender<String>,
    tasks: Vec<JoinHandle<()>>,
}

impl SupplierListScreen {
    /// Creates the screen and starts its pipeline.
    pub fn new(db: &Database) -> Self {
        Self::with_debounce_window(db, SEARCH_DEBOUNCE)
    }

    fn with_debounce_window(db: &Database, window: Duration) -> Self {
        let (state, state_rx) = StateCell::new();
        let (effects, effects_rx) = EffectSender::channel();
        let (query_tx, query_rx) = watch::channel(String::new());

        let (debounced_query, debounce_task) = debounce(query_rx, window);
        let pipeline_task = tokio::spawn(run_pipeline(db.clone(), debounced_query, state));

        SupplierListScreen {
            db: db.clone(),
            state_rx,
            effects,
            effects_rx: Some(effects_rx),
            query_tx,
            tasks: vec![debounce_task, pipeline_task],
        }
    }

    /// The state channel handed to the rendering layer.
    pub fn state(&self) -> watch::Receiver<UiState<SupplierListState>> {
        self.state_rx.clone()
    }

    /// Takes the effect receiver; exactly one active observer at a time.
    pub fn take_effects(&mut self) -> Option<mpsc::Receiver<SupplierListEffect>> {
        self.effects_rx.take()
    }

    /// Handles one user action.
    pub async fn on_intent(&self, intent: SupplierListIntent) {
        match intent {
            SupplierListIntent::SearchChanged(query) => {
                let _ = self.query_tx.send(query);
            }
            SupplierListIntent::ClearSearch => {
                let _ = self.query_tx.send(String::new());
            }
            SupplierListIntent::SupplierClicked(id) => {
                self.effects
                    .emit(SupplierListEffect::NavigateToSupplierDetail(id))
                    .await;
            }
            SupplierListIntent::AddSupplierClicked => {
                self.effects
                    .emit(SupplierListEffect::NavigateToAddSupplier)
                    .await;
            }
            SupplierListIntent::DeleteSupplier(id) => self.delete_supplier(id).await,
        }
    }

    /// Deletes a supplier.
    ///
    /// A foreign-key refusal (or any other storage error) becomes a one-shot
    /// error effect; the list itself stays on screen. Dependent products are
    /// not deleted, the schema just nulls their supplier link.
    async fn delete_supplier(&self, id: i64) {
        match self.db.suppliers().delete(id).await {
            Ok(()) => {
                self.effects
                    .emit(SupplierListEffect::ShowMessageToUi(
                        "Supplier deleted".to_string(),
                    ))
                    .await;
            }
            Err(err) => {
                self.effects
                    .emit(SupplierListEffect::ShowErrorToUi(format!(
                        "Failed to delete supplier: {err}"
                    )))
                    .await;
            }
        }
    }
}

impl Drop for SupplierListScreen {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

// =============================================================================
// Pipeline Driver
// =============================================================================

async fn run_pipeline(
    db: Database,
    mut query: watch::Receiver<String>,
    state: StateCell<SupplierListState>,
) {
    let mut snapshots = db.suppliers().subscribe_all();
    let mut latest: Option<Vec<Supplier>> = None;

    loop {
        tokio::select! {
            changed = query.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            snapshot = snapshots.next() => {
                match snapshot {
                    Some(Ok(suppliers)) => latest = Some(suppliers),
                    Some(Err(err)) => {
                        state.set_error(format!("Failed to load suppliers: {err}"));
                        return;
                    }
                    None => return,
                }
            }
        }

        if let Some(suppliers) = &latest {
            let current_query = query.borrow().clone();
            state.set_success(recompute(suppliers, current_query));
        }
    }
}

/// One combination: blank query matches everything, otherwise
/// case-insensitive substring on the name.
fn recompute(suppliers: &[Supplier], query: String) -> SupplierListState {
    let needle = query.trim().to_lowercase();

    let filtered = suppliers
        .iter()
        .filter(|supplier| needle.is_empty() || supplier.name.to_lowercase().contains(&needle))
        .cloned()
        .collect();

    SupplierListState {
        suppliers: filtered,
        search_query: query,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_db::DbConfig;
    use tokio::time::timeout;

    const TEST_WINDOW: Duration = Duration::from_millis(20);
    const WAIT: Duration = Duration::from_secs(5);

    fn supplier(name: &str) -> Supplier {
        Supplier {
            id: 0,
            name: name.to_string(),
            contact_person: "Contact".to_string(),
            phone: "+14155550101".to_string(),
            email: "hello@example.com".to_string(),
            address: "Somewhere 1".to_string(),
        }
    }

    async fn seeded_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for name in ["Acme Beverages", "Fresh Field Dairy", "Snackline"] {
            db.suppliers().insert(&supplier(name)).await.unwrap();
        }
        db
    }

    async fn wait_for(
        rx: &mut watch::Receiver<UiState<SupplierListState>>,
        pred: impl Fn(&SupplierListState) -> bool,
    ) -> SupplierListState {
        timeout(WAIT, async {
            loop {
                if let UiState::Success(state) = &*rx.borrow_and_update() {
                    if pred(state) {
                        return state.clone();
                    }
                }
                rx.changed().await.expect("state channel closed");
            }
        })
        .await
        .expect("state never matched")
    }

    #[tokio::test]
    async fn test_search_filters_and_clear_restores() {
        let db = seeded_db().await;
        let screen = SupplierListScreen::with_debounce_window(&db, TEST_WINDOW);
        let mut state = screen.state();

        let initial = wait_for(&mut state, |s| s.suppliers.len() == 3).await;
        assert_eq!(initial.suppliers[0].name, "Acme Beverages");

        screen
            .on_intent(SupplierListIntent::SearchChanged("fresh".to_string()))
            .await;
        let filtered = wait_for(&mut state, |s| s.suppliers.len() == 1).await;
        assert_eq!(filtered.suppliers[0].name, "Fresh Field Dairy");

        screen.on_intent(SupplierListIntent::ClearSearch).await;
        wait_for(&mut state, |s| s.suppliers.len() == 3).await;
    }

    #[tokio::test]
    async fn test_delete_updates_list_and_emits_message() {
        let db = seeded_db().await;
        let mut screen = SupplierListScreen::with_debounce_window(&db, TEST_WINDOW);
        let mut state = screen.state();
        let mut effects = screen.take_effects().unwrap();

        let initial = wait_for(&mut state, |s| s.suppliers.len() == 3).await;
        let doomed = initial.suppliers[0].id;

        screen
            .on_intent(SupplierListIntent::DeleteSupplier(doomed))
            .await;

        assert_eq!(
            timeout(WAIT, effects.recv()).await.unwrap(),
            Some(SupplierListEffect::ShowMessageToUi(
                "Supplier deleted".to_string()
            ))
        );
        wait_for(&mut state, |s| s.suppliers.len() == 2).await;
    }

    #[tokio::test]
    async fn test_delete_missing_supplier_is_an_error_effect() {
        let db = seeded_db().await;
        let mut screen = SupplierListScreen::with_debounce_window(&db, TEST_WINDOW);
        let mut effects = screen.take_effects().unwrap();

        screen
            .on_intent(SupplierListIntent::DeleteSupplier(404))
            .await;

        match timeout(WAIT, effects.recv()).await.unwrap() {
            Some(SupplierListEffect::ShowErrorToUi(message)) => {
                assert!(message.contains("Failed to delete supplier"));
            }
            other => panic!("expected error effect, got {other:?}"),
        }
    }
}
