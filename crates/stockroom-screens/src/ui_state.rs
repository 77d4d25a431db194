//! # View State Container & Effect Conduit
//!
//! The two channels every screen publishes through.
//!
//! ## UiState
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      UiState Transitions                                │
//! │                                                                         │
//! │        ┌──────────┐  first snapshot   ┌───────────┐                     │
//! │        │ Loading  │ ─────────────────►│ Success   │◄──┐ every           │
//! │        └────┬─────┘                   └─────┬─────┘───┘ recompute       │
//! │             │ subscription failed           │ subscription failed       │
//! │             ▼                               ▼                           │
//! │        ┌─────────────────────────────────────────┐                      │
//! │        │                 Error                   │  (terminal: a fresh  │
//! │        └─────────────────────────────────────────┘   screen reloads)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Effects
//! Action outcomes (saved! / toast an error / navigate) are NOT state: they
//! happen once, for whoever is currently listening. They ride a bounded
//! single-consumer queue. Buffering policy, pinned down explicitly:
//! - with a live consumer the sender awaits capacity, so nothing is dropped
//!   (at-least-once to the active observer),
//! - once the consumer is gone the event is dropped with a warning,
//! - late subscribers never see old events (no replay).

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::warn;

/// Capacity of every effect queue.
pub const EFFECT_BUFFER: usize = 16;

// =============================================================================
// UiState
// =============================================================================

/// Generic three-state container published by every screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "data")]
pub enum UiState<T> {
    /// Initial state, before the first snapshot arrived.
    Loading,
    /// Current view-state snapshot. Replaced wholesale on every recompute.
    Success(T),
    /// A live subscription failed. Terminal until the screen is rebuilt.
    Error(String),
}

impl<T> UiState<T> {
    /// Returns the success data, if any.
    pub fn success(&self) -> Option<&T> {
        match self {
            UiState::Success(data) => Some(data),
            _ => None,
        }
    }

    /// Whether the state is still Loading.
    pub fn is_loading(&self) -> bool {
        matches!(self, UiState::Loading)
    }

    /// Whether the state is an Error.
    pub fn is_error(&self) -> bool {
        matches!(self, UiState::Error(_))
    }
}

// =============================================================================
// State Cell
// =============================================================================

/// The writing half of a screen's state channel.
///
/// Owned by the controller and its pipeline task; the rendering layer only
/// ever holds the `watch::Receiver`. Publishing is always a full-snapshot
/// replace, so consumers can never observe a half-applied update, and the
/// watch channel guarantees they never observe an older snapshot after a
/// newer one.
#[derive(Debug, Clone)]
pub struct StateCell<S> {
    tx: watch::Sender<UiState<S>>,
}

impl<S: Clone> StateCell<S> {
    /// Creates a cell starting in `Loading`, plus the receiver handed to
    /// the rendering layer.
    pub fn new() -> (Self, watch::Receiver<UiState<S>>) {
        let (tx, rx) = watch::channel(UiState::Loading);
        (StateCell { tx }, rx)
    }

    /// Publishes a Success snapshot.
    pub fn set_success(&self, data: S) {
        let _ = self.tx.send(UiState::Success(data));
    }

    /// Publishes an Error state.
    pub fn set_error(&self, message: impl Into<String>) {
        let _ = self.tx.send(UiState::Error(message.into()));
    }
}

impl<S: Clone + Default> StateCell<S> {
    /// Rewrites the Success snapshot, starting from `S::default()` while the
    /// screen is still Loading. Form screens use this: field edits may
    /// arrive before the initial option load lands.
    ///
    /// The read-modify-write runs under the channel lock, so two tasks
    /// updating different fields cannot lose each other's writes.
    ///
    /// No-op in Error: a failed screen is never resurrected by a stray
    /// update, only a fresh screen recovers.
    pub fn update_or_default(&self, f: impl FnOnce(&S) -> S) {
        self.tx.send_if_modified(|current| {
            let next = match current {
                UiState::Success(data) => f(data),
                UiState::Loading => f(&S::default()),
                UiState::Error(_) => return false,
            };
            *current = UiState::Success(next);
            true
        });
    }

    /// Reads the current Success snapshot, or the default form state.
    pub fn current_or_default(&self) -> S {
        self.tx.borrow().success().cloned().unwrap_or_default()
    }
}

// =============================================================================
// Effect Sender
// =============================================================================

/// The writing half of a screen's one-shot effect queue.
#[derive(Debug)]
pub struct EffectSender<E> {
    tx: mpsc::Sender<E>,
}

// Manual impl: E itself doesn't need to be Clone.
impl<E> Clone for EffectSender<E> {
    fn clone(&self) -> Self {
        EffectSender {
            tx: self.tx.clone(),
        }
    }
}

impl<E: std::fmt::Debug> EffectSender<E> {
    /// Creates the queue; the receiver goes to the single active observer.
    pub fn channel() -> (Self, mpsc::Receiver<E>) {
        let (tx, rx) = mpsc::channel(EFFECT_BUFFER);
        (EffectSender { tx }, rx)
    }

    /// Delivers one effect.
    ///
    /// Awaits capacity while a consumer is attached; drops (with a warning)
    /// once the consumer is gone, which is exactly the torn-down-screen
    /// case where delivery no longer matters.
    pub async fn emit(&self, effect: E) {
        if let Err(err) = self.tx.send(effect).await {
            warn!(effect = ?err.0, "effect dropped: no active observer");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
