//! # stockroom-screens: Reactive Screen Controllers
//!
//! Every screen of the inventory tracker is driven by one controller object
//! from this crate. A controller owns three things and nothing else owns
//! them:
//!
//! - a **state channel**: `watch::Receiver<UiState<S>>` publishing immutable
//!   view-state snapshots (Loading / Success / Error),
//! - an **effect channel**: a bounded, single-consumer queue of one-shot
//!   events (navigation, toasts), never replayed to late subscribers,
//! - its **background tasks**: debounce timers and pipeline drivers, aborted
//!   when the controller is dropped.
//!
//! ## The Filter Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       List Screen Pipeline                              │
//! │                                                                         │
//! │  SearchChanged ──► query cell ──► debounce (300 ms) ──┐                │
//! │  CategorySelected ──► filter cell ────────────────────┤                │
//! │  SupplierSelected ──► filter cell ────────────────────┼──► combine     │
//! │  live snapshots (stockroom-db) ───────────────────────┘      │         │
//! │                                                               ▼         │
//! │                     any change → recompute with the LATEST value        │
//! │                     of every input; an in-flight recompute that is      │
//! │                     superseded is dropped, never published              │
//! │                                                               │         │
//! │                                                               ▼         │
//! │                     UiState::Success(new immutable snapshot)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`ui_state`] - `UiState` container + effect conduit
//! - [`debounce`] - timer-reset-on-event primitive
//! - [`barcode`] - barcode capability boundary
//! - [`product_list`], [`supplier_list`], [`transaction_list`] - list pipelines
//! - [`stock_entry`] - the stock transaction engine
//! - [`product_form`], [`supplier_form`] - edit forms
//! - [`dashboard`] - low stock + recent activity

// =============================================================================
// Module Declarations
// =============================================================================

pub mod barcode;
pub mod dashboard;
pub mod debounce;
pub mod product_form;
pub mod product_list;
pub mod stock_entry;
pub mod supplier_form;
pub mod supplier_list;
pub mod transaction_list;
pub mod ui_state;

// =============================================================================
// Re-exports
// =============================================================================

pub use ui_state::{EffectSender, StateCell, UiState};

use std::time::Duration;

/// Quiescence window for search-query debouncing.
///
/// A burst of keystrokes inside this window collapses to its last value;
/// only a query that has been stable this long reaches the pipeline.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// How many recent transactions the dashboard shows.
pub const DASHBOARD_RECENT_LIMIT: u32 = 10;
