//! # Dashboard Screen
//!
//! Combines two live sources into one overview: products at or below their
//! minimum stock level, and the most recent stock movements (with product
//! names). Each source is independently "latest value"; the dashboard
//! publishes once both have arrived and again on every change to either.

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;

use stockroom_core::{Product, TransactionWithProduct};
use stockroom_db::Database;

use crate::ui_state::{EffectSender, StateCell, UiState};
use crate::DASHBOARD_RECENT_LIMIT;

// =============================================================================
// State / Intents / Effects
// =============================================================================

/// Immutable view-state snapshot for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct DashboardState {
    /// Products needing a restock (stock <= minimum), name-sorted.
    pub low_stock_items: Vec<Product>,
    /// Latest stock movements, newest first.
    pub recent_transactions: Vec<TransactionWithProduct>,
}

/// User actions on the dashboard (navigation only).
#[derive(Debug, Clone)]
pub enum DashboardIntent {
    NavigateToProducts,
    NavigateToSuppliers,
    NavigateToStockManagement,
    NavigateToTransactions,
}

/// One-shot navigation effects.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEffect {
    NavigateToProducts,
    NavigateToSuppliers,
    NavigateToStockManagement,
    NavigateToTransactions,
}

// =============================================================================
// Screen Controller
// =============================================================================

/// Owns the dashboard subscriptions for one screen session.
pub struct DashboardScreen {
    state_rx: watch::Receiver<UiState<DashboardState>>,
    effects: EffectSender<DashboardEffect>,
    effects_rx: Option<mpsc::Receiver<DashboardEffect>>,
    tasks: Vec<JoinHandle<()>>,
}

impl DashboardScreen {
    /// Creates the screen and starts both subscriptions.
    pub fn new(db: &Database) -> Self {
        let (state, state_rx) = StateCell::new();
        let (effects, effects_rx) = EffectSender::channel();

        let pipeline_task = tokio::spawn(run_pipeline(db.clone(), state));

        DashboardScreen {
            state_rx,
            effects,
            effects_rx: Some(effects_rx),
            tasks: vec![pipeline_task],
        }
    }

    /// The state channel handed to the rendering layer.
    pub fn state(&self) -> watch::Receiver<UiState<DashboardState>> {
        self.state_rx.clone()
    }

    /// Takes the effect receiver; exactly one active observer at a time.
    pub fn take_effects(&mut self) -> Option<mpsc::Receiver<DashboardEffect>> {
        self.effects_rx.take()
    }

    /// Handles one user action.
    pub async fn on_intent(&self, intent: DashboardIntent) {
        let effect = match intent {
            DashboardIntent::NavigateToProducts => DashboardEffect::NavigateToProducts,
            DashboardIntent::NavigateToSuppliers => DashboardEffect::NavigateToSuppliers,
            DashboardIntent::NavigateToStockManagement => DashboardEffect::NavigateToStockManagement,
            DashboardIntent::NavigateToTransactions => DashboardEffect::NavigateToTransactions,
        };
        self.effects.emit(effect).await;
    }
}

impl Drop for DashboardScreen {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

// =============================================================================
// Pipeline Driver
// =============================================================================

async fn run_pipeline(db: Database, state: StateCell<DashboardState>) {
    let mut low_stock = db.products().subscribe_low_stock();
    let mut recent = db
        .transactions()
        .subscribe_recent_with_product(DASHBOARD_RECENT_LIMIT);

    let mut latest_low: Option<Vec<Product>> = None;
    let mut latest_recent: Option<Vec<TransactionWithProduct>> = None;

    loop {
        tokio::select! {
            snapshot = low_stock.next() => {
                match snapshot {
                    Some(Ok(items)) => latest_low = Some(items),
                    Some(Err(err)) => {
                        state.set_error(format!("Failed to load dashboard: {err}"));
                        return;
                    }
                    None => return,
                }
            }
            snapshot = recent.next() => {
                match snapshot {
                    Some(Ok(rows)) => latest_recent = Some(rows),
                    Some(Err(err)) => {
                        state.set_error(format!("Failed to load dashboard: {err}"));
                        return;
                    }
                    None => return,
                }
            }
        }

        // Publish once both sides have arrived, then on every change.
        if let (Some(low), Some(recent)) = (&latest_low, &latest_recent) {
            state.set_success(DashboardState {
                low_stock_items: low.clone(),
                recent_transactions: recent.clone(),
            });
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use stockroom_core::TransactionKind;
    use stockroom_db::DbConfig;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    async fn wait_for(
        rx: &mut watch::Receiver<UiState<DashboardState>>,
        pred: impl Fn(&DashboardState) -> bool,
    ) -> DashboardState {
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

    fn product(name: &str, stock: i64, min: i64) -> Product {
        Product {
            id: 0,
            name: name.to_string(),
            description: String::new(),
            price_cents: 199,
            category: "Beverages".to_string(),
            barcode: String::new(),
            supplier_id: None,
            current_stock: stock,
            minimum_stock: min,
        }
    }

    #[tokio::test]
    async fn test_dashboard_tracks_low_stock_live() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let healthy = db.products().insert(&product("Pepsi", 20, 5)).await.unwrap();
        db.products().insert(&product("Nescafe", 2, 6)).await.unwrap();

        let screen = DashboardScreen::new(&db);
        let mut state = screen.state();

        let initial = wait_for(&mut state, |s| s.low_stock_items.len() == 1).await;
        assert_eq!(initial.low_stock_items[0].name, "Nescafe");

        // Sell Pepsi down to its threshold; the dashboard must pick it up.
        db.transactions()
            .apply_transaction(TransactionKind::Sale, healthy, 15, None)
            .await
            .unwrap();

        let updated = wait_for(&mut state, |s| s.low_stock_items.len() == 2).await;
        assert!(updated
            .low_stock_items
            .iter()
            .any(|p| p.name == "Pepsi" && p.current_stock == 5));
        // And the sale shows up as recent activity, newest first.
        assert_eq!(updated.recent_transactions[0].product_name, "Pepsi");
    }

    #[tokio::test]
    async fn test_navigation_intents_map_to_effects() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut screen = DashboardScreen::new(&db);
        let mut effects = screen.take_effects().unwrap();

        screen.on_intent(DashboardIntent::NavigateToProducts).await;
        screen
            .on_intent(DashboardIntent::NavigateToStockManagement)
            .await;

        assert_eq!(
            effects.recv().await,
            Some(DashboardEffect::NavigateToProducts)
        );
        assert_eq!(
            effects.recv().await,
            Some(DashboardEffect::NavigateToStockManagement)
        );
    }
}
