//! # Product List Screen
//!
//! Live, debounced, multi-criteria product filtering.
//!
//! ## Pipeline Inputs
//! Four independently-updated "latest value" inputs feed one combine step:
//! the debounced search query, the category filter, the supplier filter,
//! and the live product snapshot. Whenever ANY of them changes, the
//! combination re-runs against the most recent value of all four; there is
//! no requirement that they tick together.
//!
//! ## Latest Wins
//! The combine step does async work (it resolves supplier names), so a new
//! snapshot can arrive while a previous combination is still computing.
//! The driver keeps at most ONE in-flight recompute and replaces it -
//! dropping the superseded future - whenever a fresh input event arrives.
//! Only the most recent combination ever publishes, which keeps published
//! state monotonic in recency.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::debug;

use stockroom_core::Product;
use stockroom_db::{Database, DbResult};

use crate::debounce::debounce;
use crate::ui_state::{EffectSender, StateCell, UiState};
use crate::SEARCH_DEBOUNCE;

// =============================================================================
// State / Intents / Effects
// =============================================================================

/// Immutable view-state snapshot for the product list.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ProductListState {
    /// Filtered, name-sorted products.
    pub products: Vec<Product>,

    /// Distinct categories from the FULL snapshot, in snapshot order.
    /// Computed unfiltered so filter options never shrink while filtering.
    pub categories: Vec<String>,

    /// (id, name) options for the supplier filter, from the full catalog.
    pub suppliers: Vec<(i64, String)>,

    /// The criteria that produced `products`.
    pub search_query: String,
    pub selected_category: Option<String>,
    pub selected_supplier_id: Option<i64>,
}

/// User actions on the product list.
#[derive(Debug, Clone)]
pub enum ProductListIntent {
    SearchChanged(String),
    CategorySelected(Option<String>),
    SupplierSelected(Option<i64>),
    ClearFilters,
    ProductClicked(i64),
    DeleteProduct(i64),
    AddProductClicked,
}

/// One-shot outcomes delivered to the active observer.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductListEffect {
    NavigateToAddProduct,
    NavigateToProductDetail(i64),
    ShowErrorToUi(String),
    ShowMessageToUi(String),
}

// =============================================================================
// Screen Controller
// =============================================================================

/// Owns the product list pipeline for one screen session.
///
/// Dropping the controller aborts the debounce timer and the pipeline
/// driver; nothing of this screen outlives it.
pub struct ProductListScreen {
    db: Database,
    state_rx: watch::Receiver<UiState<ProductListState>>,
    effects: EffectSender<ProductListEffect>,
    effects_rx: Option<mpsc::Receiver<ProductListEffect>>,
    query_tx: watch::Sender<String>,
    category_tx: watch::Sender<Option<String>>,
    supplier_tx: watch::Sender<Option<i64>>,
    tasks: Vec<JoinHandle<()>>,
}

impl ProductListScreen {
    /// Creates the screen and starts its pipeline.
    pub fn new(db: &Database) -> Self {
        Self::with_debounce_window(db, SEARCH_DEBOUNCE)
    }

    /// As [`new`](Self::new) with a custom quiescence window (tests).
    fn with_debounce_window(db: &Database, window: Duration) -> Self {
        let (state, state_rx) = StateCell::new();
        let (effects, effects_rx) = EffectSender::channel();

        let (query_tx, query_rx) = watch::channel(String::new());
        let (category_tx, category_rx) = watch::channel(None);
        let (supplier_tx, supplier_rx) = watch::channel(None);

        let (debounced_query, debounce_task) = debounce(query_rx, window);

        let pipeline_task = tokio::spawn(run_pipeline(
            db.clone(),
            debounced_query,
            category_rx,
            supplier_rx,
            state,
        ));

        ProductListScreen {
            db: db.clone(),
            state_rx,
            effects,
            effects_rx: Some(effects_rx),
            query_tx,
            category_tx,
            supplier_tx,
            tasks: vec![debounce_task, pipeline_task],
        }
    }

    /// The state channel handed to the rendering layer.
    pub fn state(&self) -> watch::Receiver<UiState<ProductListState>> {
        self.state_rx.clone()
    }

    /// Takes the effect receiver; exactly one active observer at a time.
    pub fn take_effects(&mut self) -> Option<mpsc::Receiver<ProductListEffect>> {
        self.effects_rx.take()
    }

    /// Handles one user action.
    pub async fn on_intent(&self, intent: ProductListIntent) {
        match intent {
            ProductListIntent::SearchChanged(query) => {
                let _ = self.query_tx.send(query);
            }
            ProductListIntent::CategorySelected(category) => {
                let _ = self.category_tx.send(category);
            }
            ProductListIntent::SupplierSelected(supplier_id) => {
                let _ = self.supplier_tx.send(supplier_id);
            }
            ProductListIntent::ClearFilters => {
                let _ = self.query_tx.send(String::new());
                let _ = self.category_tx.send(None);
                let _ = self.supplier_tx.send(None);
            }
            ProductListIntent::ProductClicked(id) => {
                self.effects
                    .emit(ProductListEffect::NavigateToProductDetail(id))
                    .await;
            }
            ProductListIntent::AddProductClicked => {
                self.effects
                    .emit(ProductListEffect::NavigateToAddProduct)
                    .await;
            }
            ProductListIntent::DeleteProduct(id) => self.delete_product(id).await,
        }
    }

    /// Deletes a product; the outcome is an effect, the list itself updates
    /// through the live snapshot.
    async fn delete_product(&self, id: i64) {
        match self.db.products().delete(id).await {
            Ok(()) => {
                self.effects
                    .emit(ProductListEffect::ShowMessageToUi(
                        "Product deleted".to_string(),
                    ))
                    .await;
            }
            Err(err) => {
                self.effects
                    .emit(ProductListEffect::ShowErrorToUi(format!(
                        "Failed to delete product: {err}"
                    )))
                    .await;
            }
        }
    }
}

impl Drop for ProductListScreen {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

// =============================================================================
// Pipeline Driver
// =============================================================================

type Recompute = Pin<Box<dyn Future<Output = DbResult<ProductListState>> + Send>>;

/// Fan-in merge of all inputs with a single-slot in-flight recompute.
///
/// Two phases per cycle: idle until ANY input changes, then run one
/// combination while continuing to watch the inputs. A further event during
/// the combination replaces the in-flight future (dropping it cancels it),
/// so only the most recent combination can ever publish.
async fn run_pipeline(
    db: Database,
    mut query: watch::Receiver<String>,
    mut category: watch::Receiver<Option<String>>,
    mut supplier: watch::Receiver<Option<i64>>,
    state: StateCell<ProductListState>,
) {
    let mut snapshots = db.products().subscribe_all();

    // Latest full snapshot; None until the source emits for the first time.
    let mut latest: Option<Arc<Vec<Product>>> = None;

    // Builds a combination future from the latest value of every input.
    macro_rules! combine_latest {
        () => {{
            let fut: Recompute = Box::pin(recompute(
                db.clone(),
                Arc::clone(latest.as_ref().expect("snapshot present")),
                query.borrow().clone(),
                category.borrow().clone(),
                *supplier.borrow(),
            ));
            fut
        }};
    }

    loop {
        // Phase 1: idle until something changes.
        tokio::select! {
            changed = query.changed() => {
                if changed.is_err() {
                    return;
                }
                debug!(query = %*query.borrow(), "search input settled");
            }
            changed = category.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            changed = supplier.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            snapshot = snapshots.next() => {
                match snapshot {
                    Some(Ok(products)) => latest = Some(Arc::new(products)),
                    Some(Err(err)) => {
                        state.set_error(format!("Failed to load products: {err}"));
                        return;
                    }
                    // Source ended; the screen is shutting down.
                    None => return,
                }
            }
        }

        // Filter inputs alone can't combine before the first snapshot.
        if latest.is_none() {
            continue;
        }

        // Phase 2: one combination in flight, superseded by newer events.
        let mut fut = combine_latest!();
        loop {
            tokio::select! {
                // Input arms first: an event that lands together with a
                // completion supersedes it rather than publishing stale.
                biased;

                changed = query.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    fut = combine_latest!();
                }
                changed = category.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    fut = combine_latest!();
                }
                changed = supplier.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    fut = combine_latest!();
                }
                snapshot = snapshots.next() => {
                    match snapshot {
                        Some(Ok(products)) => {
                            latest = Some(Arc::new(products));
                            fut = combine_latest!();
                        }
                        Some(Err(err)) => {
                            state.set_error(format!("Failed to load products: {err}"));
                            return;
                        }
                        None => return,
                    }
                }

                result = &mut fut => {
                    match result {
                        Ok(next) => state.set_success(next),
                        Err(err) => {
                            state.set_error(format!("Filtering failed: {err}"));
                            return;
                        }
                    }
                    break;
                }
            }
        }
    }
}

/// One combination: conjunctive filtering plus facet extraction.
async fn recompute(
    db: Database,
    products: Arc<Vec<Product>>,
    query: String,
    category: Option<String>,
    supplier_id: Option<i64>,
) -> DbResult<ProductListState> {
    let needle = query.trim().to_lowercase();

    let filtered: Vec<Product> = products
        .iter()
        .filter(|product| {
            let matches_query =
                needle.is_empty() || product.name.to_lowercase().contains(&needle);
            let matches_category = category
                .as_deref()
                .map_or(true, |c| product.category == c);
            let matches_supplier =
                supplier_id.map_or(true, |id| product.supplier_id == Some(id));
            matches_query && matches_category && matches_supplier
        })
        .cloned()
        .collect();

    // Facets from the FULL snapshot: filtering must never shrink the
    // available filter options.
    let mut categories: Vec<String> = Vec::new();
    for product in products.iter() {
        if !categories.contains(&product.category) {
            categories.push(product.category.clone());
        }
    }

    let suppliers = db
        .suppliers()
        .get_all()
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();

    Ok(ProductListState {
        products: filtered,
        categories,
        suppliers,
        search_query: query,
        selected_category: category,
        selected_supplier_id: supplier_id,
    })
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

    async fn seeded_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let acme = db
            .suppliers()
            .insert(&stockroom_core::Supplier {
                id: 0,
                name: "Acme Beverages".to_string(),
                contact_person: "Rita".to_string(),
                phone: "+14155550101".to_string(),
                email: "orders@acmebev.com".to_string(),
                address: "12 Dockside Ave".to_string(),
            })
            .await
            .unwrap();

        for (name, category, supplier) in [
            ("Coca-Cola", "Beverages", Some(acme)),
            ("Pepsi", "Beverages", Some(acme)),
            ("Nescafe", "Coffee", None),
        ] {
            db.products()
                .insert(&Product {
                    id: 0,
                    name: name.to_string(),
                    description: String::new(),
                    price_cents: 199,
                    category: category.to_string(),
                    barcode: String::new(),
                    supplier_id: supplier,
                    current_stock: 10,
                    minimum_stock: 2,
                })
                .await
                .unwrap();
        }

        db
    }

    /// Awaits the first Success state satisfying `pred`.
    async fn wait_for(
        rx: &mut watch::Receiver<UiState<ProductListState>>,
        pred: impl Fn(&ProductListState) -> bool,
    ) -> ProductListState {
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

    fn names(state: &ProductListState) -> Vec<&str> {
        state.products.iter().map(|p| p.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_search_filters_then_clear_restores() {
        let db = seeded_db().await;
        let screen = ProductListScreen::with_debounce_window(&db, TEST_WINDOW);
        let mut state = screen.state();

        // Unfiltered default: all three, name-sorted.
        let initial = wait_for(&mut state, |s| s.products.len() == 3).await;
        assert_eq!(names(&initial), vec!["Coca-Cola", "Nescafe", "Pepsi"]);

        screen
            .on_intent(ProductListIntent::SearchChanged("Coca".to_string()))
            .await;
        let filtered = wait_for(&mut state, |s| s.products.len() == 1).await;
        assert_eq!(names(&filtered), vec!["Coca-Cola"]);

        screen.on_intent(ProductListIntent::ClearFilters).await;
        let restored = wait_for(&mut state, |s| s.products.len() == 3).await;
        assert_eq!(names(&restored), vec!["Coca-Cola", "Nescafe", "Pepsi"]);
        assert_eq!(restored.search_query, "");
        assert_eq!(restored.selected_category, None);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let db = seeded_db().await;
        let screen = ProductListScreen::with_debounce_window(&db, TEST_WINDOW);
        let mut state = screen.state();

        screen
            .on_intent(ProductListIntent::SearchChanged("pepsi".to_string()))
            .await;
        let filtered = wait_for(&mut state, |s| s.products.len() == 1).await;
        assert_eq!(names(&filtered), vec!["Pepsi"]);
    }

    #[tokio::test]
    async fn test_filters_are_conjunctive() {
        let db = seeded_db().await;
        let screen = ProductListScreen::with_debounce_window(&db, TEST_WINDOW);
        let mut state = screen.state();

        let initial = wait_for(&mut state, |s| s.products.len() == 3).await;
        let acme = initial.suppliers[0].0;

        // Category alone: both sodas.
        screen
            .on_intent(ProductListIntent::CategorySelected(Some(
                "Beverages".to_string(),
            )))
            .await;
        let by_category = wait_for(&mut state, |s| s.products.len() == 2).await;
        assert_eq!(names(&by_category), vec!["Coca-Cola", "Pepsi"]);

        // AND the query: just one.
        screen
            .on_intent(ProductListIntent::SearchChanged("Pep".to_string()))
            .await;
        let both = wait_for(&mut state, |s| s.products.len() == 1).await;
        assert_eq!(names(&both), vec!["Pepsi"]);
        assert_eq!(both.selected_category.as_deref(), Some("Beverages"));

        // AND the supplier (Pepsi is an Acme product, so unchanged).
        screen
            .on_intent(ProductListIntent::SupplierSelected(Some(acme)))
            .await;
        let narrowed = wait_for(&mut state, |s| s.selected_supplier_id == Some(acme)).await;
        assert_eq!(names(&narrowed), vec!["Pepsi"]);
    }

    #[tokio::test]
    async fn test_zero_matches_is_success_not_error() {
        let db = seeded_db().await;
        let screen = ProductListScreen::with_debounce_window(&db, TEST_WINDOW);
        let mut state = screen.state();

        screen
            .on_intent(ProductListIntent::SearchChanged("Fanta".to_string()))
            .await;
        let empty = wait_for(&mut state, |s| {
            s.products.is_empty() && s.search_query == "Fanta"
        })
        .await;
        assert!(empty.products.is_empty());
    }

    #[tokio::test]
    async fn test_facets_come_from_full_snapshot() {
        let db = seeded_db().await;
        let screen = ProductListScreen::with_debounce_window(&db, TEST_WINDOW);
        let mut state = screen.state();

        screen
            .on_intent(ProductListIntent::CategorySelected(Some(
                "Coffee".to_string(),
            )))
            .await;
        let filtered = wait_for(&mut state, |s| s.products.len() == 1).await;

        // One product visible, but every category still offered.
        assert!(filtered.categories.contains(&"Beverages".to_string()));
        assert!(filtered.categories.contains(&"Coffee".to_string()));
        assert_eq!(filtered.suppliers.len(), 1);
    }

    #[tokio::test]
    async fn test_live_snapshot_updates_list() {
        let db = seeded_db().await;
        let screen = ProductListScreen::with_debounce_window(&db, TEST_WINDOW);
        let mut state = screen.state();

        wait_for(&mut state, |s| s.products.len() == 3).await;

        db.products()
            .insert(&Product {
                id: 0,
                name: "Fanta".to_string(),
                description: String::new(),
                price_cents: 179,
                category: "Beverages".to_string(),
                barcode: String::new(),
                supplier_id: None,
                current_stock: 5,
                minimum_stock: 1,
            })
            .await
            .unwrap();

        let grown = wait_for(&mut state, |s| s.products.len() == 4).await;
        assert_eq!(names(&grown), vec!["Coca-Cola", "Fanta", "Nescafe", "Pepsi"]);
    }

    #[tokio::test]
    async fn test_delete_emits_message_and_list_shrinks() {
        let db = seeded_db().await;
        let mut screen = ProductListScreen::with_debounce_window(&db, TEST_WINDOW);
        let mut state = screen.state();
        let mut effects = screen.take_effects().unwrap();

        let initial = wait_for(&mut state, |s| s.products.len() == 3).await;
        let doomed = initial.products[0].id;

        screen
            .on_intent(ProductListIntent::DeleteProduct(doomed))
            .await;

        assert_eq!(
            timeout(WAIT, effects.recv()).await.unwrap(),
            Some(ProductListEffect::ShowMessageToUi(
                "Product deleted".to_string()
            ))
        );
        wait_for(&mut state, |s| s.products.len() == 2).await;
    }

    #[tokio::test]
    async fn test_snapshot_failure_moves_to_error_state() {
        let db = seeded_db().await;
        let screen = ProductListScreen::with_debounce_window(&db, TEST_WINDOW);
        let mut state = screen.state();

        wait_for(&mut state, |s| s.products.len() == 3).await;

        // Kill the pool, then poke the notifier: the re-query fails and the
        // pipeline must land in Error, not panic or publish stale data.
        db.close().await;
        db.notifier().notify(stockroom_db::StoreChange::Products);

        timeout(WAIT, async {
            loop {
                if state.borrow_and_update().is_error() {
                    return;
                }
                state.changed().await.expect("state channel closed");
            }
        })
        .await
        .expect("pipeline never reported the failure");
    }

    #[tokio::test]
    async fn test_navigation_intents_become_effects() {
        let db = seeded_db().await;
        let mut screen = ProductListScreen::with_debounce_window(&db, TEST_WINDOW);
        let mut effects = screen.take_effects().unwrap();

        screen.on_intent(ProductListIntent::AddProductClicked).await;
        screen.on_intent(ProductListIntent::ProductClicked(7)).await;

        assert_eq!(
            effects.recv().await,
            Some(ProductListEffect::NavigateToAddProduct)
        );
        assert_eq!(
            effects.recv().await,
            Some(ProductListEffect::NavigateToProductDetail(7))
        );
    }
}
