//! # Change Notifier
//!
//! In-process invalidation tracking for live queries.
//!
//! ## How Live Queries Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Change Notification Flow                           │
//! │                                                                         │
//! │  repo.insert(product) ──► SQL INSERT commits                            │
//! │                                │                                        │
//! │                                ▼                                        │
//! │                  notifier.notify(StoreChange::Products)                 │
//! │                                │ broadcast                              │
//! │              ┌─────────────────┼──────────────────┐                     │
//! │              ▼                 ▼                  ▼                     │
//! │     subscribe_all()    subscribe_low_stock()  (joined subscriptions     │
//! │     re-queries and     re-queries and          listen to BOTH tables)   │
//! │     emits snapshot     emits snapshot                                   │
//! │                                                                         │
//! │  Writers never talk to subscribers directly; the notifier is the only   │
//! │  coupling point, like a relational store's invalidation tracker.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tokio::sync::broadcast;
use tracing::debug;

/// Buffered notifications per subscriber before lag kicks in.
///
/// A lagged subscriber does not lose data: it re-queries once and is
/// current again (snapshots are full-collection, not deltas).
const NOTIFY_BUFFER: usize = 64;

// =============================================================================
// Store Change
// =============================================================================

/// Which logical table a committed write touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreChange {
    Products,
    Suppliers,
    Transactions,
}

// =============================================================================
// Change Notifier
// =============================================================================

/// Broadcasts committed writes to live-query subscriptions.
///
/// Cloning is cheap; every repository holds a clone and fires it after each
/// successful write, including the side effects of referential actions
/// (deleting a product also notifies `Transactions` because the cascade
/// removed rows there).
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<StoreChange>,
}

impl ChangeNotifier {
    /// Creates a notifier with no subscribers yet.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTIFY_BUFFER);
        ChangeNotifier { tx }
    }

    /// Subscribes to future change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.tx.subscribe()
    }

    /// Announces a committed write.
    ///
    /// Send errors are ignored: no subscribers simply means nobody is
    /// watching right now.
    pub fn notify(&self, change: StoreChange) {
        debug!(?change, "store change");
        let _ = self.tx.send(change);
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notify_reaches_subscriber() {
        let notifier = ChangeNotifier::new();
        let mut rx = notifier.subscribe();

        notifier.notify(StoreChange::Products);

        assert_eq!(rx.recv().await.unwrap(), StoreChange::Products);
    }

    #[tokio::test]
    async fn test_notify_without_subscribers_is_fine() {
        let notifier = ChangeNotifier::new();
        notifier.notify(StoreChange::Transactions);
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_only_new_changes() {
        let notifier = ChangeNotifier::new();
        notifier.notify(StoreChange::Products);

        let mut rx = notifier.subscribe();
        notifier.notify(StoreChange::Suppliers);

        assert_eq!(rx.recv().await.unwrap(), StoreChange::Suppliers);
    }
}
