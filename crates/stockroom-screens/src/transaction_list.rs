//! # Transaction List Screen
//!
//! Live stock-movement history with a debounced text search, a kind filter
//! and a date sort toggle.
//!
//! ## Matching & Sorting
//! - The query matches case-insensitively against the notes OR the joined
//!   product name (the snapshot already carries the join).
//! - The kind filter is exact when set, no constraint when unset.
//! - Sorting by date runs AFTER filtering, ascending or descending per the
//!   toggle; the sort is stable, so same-timestamp rows keep their snapshot
//!   order.

use std::cmp::Reverse;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;

use stockroom_core::{TransactionKind, TransactionWithProduct};
use stockroom_db::Database;

use crate::debounce::debounce;
use crate::ui_state::{EffectSender, StateCell, UiState};
use crate::SEARCH_DEBOUNCE;

// =============================================================================
// State / Intents / Effects
// =============================================================================

/// Immutable view-state snapshot for the transaction list.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct TransactionListState {
    /// Filtered, date-sorted transactions with product names.
    pub transactions: Vec<TransactionWithProduct>,

    /// Distinct kinds present in the FULL snapshot (facet, never shrinks
    /// because of filtering).
    pub kind_options: Vec<TransactionKind>,

    /// The criteria that produced `transactions`.
    pub search_query: String,
    pub selected_kind: Option<TransactionKind>,
    /// false = newest first (the default).
    pub sort_ascending: bool,
}

/// User actions on the transaction list.
#[derive(Debug, Clone)]
pub enum TransactionListIntent {
    SearchChanged(String),
    KindFilterChanged(Option<TransactionKind>),
    SortOrderChanged(bool),
    ClearFilters,
    AddTransactionClicked,
}

/// One-shot outcomes delivered to the active observer.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionListEffect {
    NavigateToAddTransaction,
    ShowErrorToUi(String),
    ShowMessageToUi(String),
}

// =============================================================================
// Screen Controller
// =============================================================================

/// Owns the transaction list pipeline for one screen session.
pub struct TransactionListScreen {
    state_rx: watch::Receiver<UiState<TransactionListState>>,
    effects: EffectSender<TransactionListEffect>,
    effects_rx: Option<mpsc::Receiver<TransactionListEffect>>,
    query_tx: watch::Sender<String>,
    kind_tx: watch::Sender<Option<TransactionKind>>,
    ascending_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl TransactionListScreen {
    /// Creates the screen and starts its pipeline.
    pub fn new(db: &Database) -> Self {
        Self::with_debounce_window(db, SEARCH_DEBOUNCE)
    }

    fn with_debounce_window(db: &Database, window: Duration) -> Self {
        let (state, state_rx) = StateCell::new();
        let (effects, effects_rx) = EffectSender::channel();

        let (query_tx, query_rx) = watch::channel(String::new());
        let (kind_tx, kind_rx) = watch::channel(None);
        let (ascending_tx, ascending_rx) = watch::channel(false);

        let (debounced_query, debounce_task) = debounce(query_rx, window);
        let pipeline_task = tokio::spawn(run_pipeline(
            db.clone(),
            debounced_query,
            kind_rx,
            ascending_rx,
            state,
        ));

        TransactionListScreen {
            state_rx,
            effects,
            effects_rx: Some(effects_rx),
            query_tx,
            kind_tx,
            ascending_tx,
            tasks: vec![debounce_task, pipeline_task],
        }
    }

    /// The state channel handed to the rendering layer.
    pub fn state(&self) -> watch::Receiver<UiState<TransactionListState>> {
        self.state_rx.clone()
    }

    /// Takes the effect receiver; exactly one active observer at a time.
    pub fn take_effects(&mut self) -> Option<mpsc::Receiver<TransactionListEffect>> {
        self.effects_rx.take()
    }

    /// Handles one user action.
    pub async fn on_intent(&self, intent: TransactionListIntent) {
        match intent {
            TransactionListIntent::SearchChanged(query) => {
                let _ = self.query_tx.send(query);
            }
            TransactionListIntent::KindFilterChanged(kind) => {
                let _ = self.kind_tx.send(kind);
            }
            TransactionListIntent::SortOrderChanged(ascending) => {
                let _ = self.ascending_tx.send(ascending);
            }
            TransactionListIntent::ClearFilters => {
                let _ = self.query_tx.send(String::new());
                let _ = self.kind_tx.send(None);
            }
            TransactionListIntent::AddTransactionClicked => {
                self.effects
                    .emit(TransactionListEffect::NavigateToAddTransaction)
                    .await;
            }
        }
    }
}

impl Drop for TransactionListScreen {
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
    mut kind: watch::Receiver<Option<TransactionKind>>,
    mut ascending: watch::Receiver<bool>,
    state: StateCell<TransactionListState>,
) {
    let mut snapshots = db.transactions().subscribe_with_product();
    let mut latest: Option<Vec<TransactionWithProduct>> = None;

    loop {
        tokio::select! {
            changed = query.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            changed = kind.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            changed = ascending.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            snapshot = snapshots.next() => {
                match snapshot {
                    Some(Ok(transactions)) => latest = Some(transactions),
                    Some(Err(err)) => {
                        state.set_error(format!("Failed to load transactions: {err}"));
                        return;
                    }
                    None => return,
                }
            }
        }

        if let Some(transactions) = &latest {
            state.set_success(recompute(
                transactions,
                query.borrow().clone(),
                *kind.borrow(),
                *ascending.borrow(),
            ));
        }
    }
}

/// One combination: conjunctive filter, then stable date sort.
fn recompute(
    transactions: &[TransactionWithProduct],
    query: String,
    kind: Option<TransactionKind>,
    ascending: bool,
) -> TransactionListState {
    let needle = query.trim().to_lowercase();

    let mut filtered: Vec<TransactionWithProduct> = transactions
        .iter()
        .filter(|row| {
            let matches_query = needle.is_empty()
                || row
                    .transaction
                    .notes
                    .as_deref()
                    .is_some_and(|notes| notes.to_lowercase().contains(&needle))
                || row.product_name.to_lowercase().contains(&needle);

            let matches_kind = kind.map_or(true, |k| row.transaction.kind == k);

            matches_query && matches_kind
        })
        .cloned()
        .collect();

    // Stable sort: equal timestamps keep their snapshot order.
    if ascending {
        filtered.sort_by_key(|row| row.transaction.occurred_at);
    } else {
        filtered.sort_by_key(|row| Reverse(row.transaction.occurred_at));
    }

    // Facet from the full snapshot.
    let mut kind_options: Vec<TransactionKind> = Vec::new();
    for row in transactions {
        if !kind_options.contains(&row.transaction.kind) {
            kind_options.push(row.transaction.kind);
        }
    }

    TransactionListState {
        transactions: filtered,
        kind_options,
        search_query: query,
        selected_kind: kind,
        sort_ascending: ascending,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::{Product, StockTransaction};
    use stockroom_db::DbConfig;
    use tokio::time::timeout;

    const TEST_WINDOW: Duration = Duration::from_millis(20);
    const WAIT: Duration = Duration::from_secs(5);

    /// Seeds two products with interleaved history:
    /// t=100 restock Coca-Cola "pallet", t=200 sale Pepsi,
    /// t=300 sale Coca-Cola "promo day".
    async fn seeded_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut ids = Vec::new();
        for name in ["Coca-Cola", "Pepsi"] {
            ids.push(
                db.products()
                    .insert(&Product {
                        id: 0,
                        name: name.to_string(),
                        description: String::new(),
                        price_cents: 199,
                        category: "Beverages".to_string(),
                        barcode: String::new(),
                        supplier_id: None,
                        current_stock: 50,
                        minimum_stock: 5,
                    })
                    .await
                    .unwrap(),
            );
        }

        let rows = [
            (100, TransactionKind::Restock, ids[0], Some("pallet")),
            (200, TransactionKind::Sale, ids[1], None),
            (300, TransactionKind::Sale, ids[0], Some("promo day")),
        ];
        for (at, kind, product_id, notes) in rows {
            db.transactions()
                .insert(&StockTransaction {
                    id: 0,
                    occurred_at: at,
                    kind,
                    product_id,
                    quantity: 1,
                    notes: notes.map(str::to_string),
                })
                .await
                .unwrap();
        }

        db
    }

    async fn wait_for(
        rx: &mut watch::Receiver<UiState<TransactionListState>>,
        pred: impl Fn(&TransactionListState) -> bool,
    ) -> TransactionListState {
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

    fn timestamps(state: &TransactionListState) -> Vec<i64> {
        state
            .transactions
            .iter()
            .map(|row| row.transaction.occurred_at)
            .collect()
    }

    #[tokio::test]
    async fn test_default_order_is_newest_first() {
        let db = seeded_db().await;
        let screen = TransactionListScreen::with_debounce_window(&db, TEST_WINDOW);
        let mut state = screen.state();

        let initial = wait_for(&mut state, |s| s.transactions.len() == 3).await;
        assert_eq!(timestamps(&initial), vec![300, 200, 100]);
        assert!(!initial.sort_ascending);
    }

    #[tokio::test]
    async fn test_sort_toggle_flips_order() {
        let db = seeded_db().await;
        let screen = TransactionListScreen::with_debounce_window(&db, TEST_WINDOW);
        let mut state = screen.state();

        wait_for(&mut state, |s| s.transactions.len() == 3).await;

        screen
            .on_intent(TransactionListIntent::SortOrderChanged(true))
            .await;
        let ascending = wait_for(&mut state, |s| s.sort_ascending).await;
        assert_eq!(timestamps(&ascending), vec![100, 200, 300]);
    }

    #[tokio::test]
    async fn test_query_matches_notes_or_product_name() {
        let db = seeded_db().await;
        let screen = TransactionListScreen::with_debounce_window(&db, TEST_WINDOW);
        let mut state = screen.state();

        // Notes match.
        screen
            .on_intent(TransactionListIntent::SearchChanged("promo".to_string()))
            .await;
        let by_notes = wait_for(&mut state, |s| s.transactions.len() == 1).await;
        assert_eq!(by_notes.transactions[0].transaction.occurred_at, 300);

        // Product-name match (both Coca-Cola rows).
        screen
            .on_intent(TransactionListIntent::SearchChanged("coca".to_string()))
            .await;
        let by_name = wait_for(&mut state, |s| s.transactions.len() == 2).await;
        assert!(by_name
            .transactions
            .iter()
            .all(|row| row.product_name == "Coca-Cola"));
    }

    #[tokio::test]
    async fn test_kind_filter_and_facets() {
        let db = seeded_db().await;
        let screen = TransactionListScreen::with_debounce_window(&db, TEST_WINDOW);
        let mut state = screen.state();

        screen
            .on_intent(TransactionListIntent::KindFilterChanged(Some(
                TransactionKind::Sale,
            )))
            .await;
        let sales = wait_for(&mut state, |s| s.selected_kind.is_some()).await;

        assert_eq!(sales.transactions.len(), 2);
        assert!(sales
            .transactions
            .iter()
            .all(|row| row.transaction.kind == TransactionKind::Sale));

        // The facet still offers both kinds.
        assert!(sales.kind_options.contains(&TransactionKind::Restock));
        assert!(sales.kind_options.contains(&TransactionKind::Sale));
    }

    #[tokio::test]
    async fn test_clear_filters_restores_default_view() {
        let db = seeded_db().await;
        let screen = TransactionListScreen::with_debounce_window(&db, TEST_WINDOW);
        let mut state = screen.state();

        screen
            .on_intent(TransactionListIntent::SearchChanged("promo".to_string()))
            .await;
        wait_for(&mut state, |s| s.transactions.len() == 1).await;

        screen.on_intent(TransactionListIntent::ClearFilters).await;
        let restored = wait_for(&mut state, |s| s.transactions.len() == 3).await;
        assert_eq!(timestamps(&restored), vec![300, 200, 100]);
        assert_eq!(restored.selected_kind, None);
    }
}
