//! # Live Snapshot Streams
//!
//! Plumbing that turns "query + change notifier" into an infinite stream of
//! full-collection snapshots: one emission immediately on subscribe, then
//! one per relevant committed write.
//!
//! ## Semantics
//! - Snapshots, not deltas: each item is the complete current result set.
//! - A failed re-query emits the error as the final item and ends the
//!   stream. Consumers surface it as an error state; there is no automatic
//!   retry, a fresh subscription starts a fresh stream.
//! - Dropping the receiver tears the producer task down on its next send.
//! - A lagged subscriber (writes faster than it consumes notifications)
//!   just re-queries once; nothing is lost because snapshots are absolute.

use std::future::Future;

use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::error::DbResult;
use crate::notifier::{ChangeNotifier, StoreChange};

/// In-flight snapshots buffered per subscription before the producer awaits.
const SNAPSHOT_BUFFER: usize = 8;

/// Builds a live snapshot stream over `fetch`, re-running it whenever the
/// notifier announces a change to one of `tables`.
///
/// `fetch` is the pull query; joined queries pass every table they read so
/// a write to either side re-emits.
pub fn snapshot_stream<T, F, Fut>(
    notifier: &ChangeNotifier,
    tables: &'static [StoreChange],
    fetch: F,
) -> ReceiverStream<DbResult<Vec<T>>>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = DbResult<Vec<T>>> + Send + 'static,
{
    let mut changes = notifier.subscribe();
    let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);

    tokio::spawn(async move {
        // Initial snapshot, before any change arrives.
        if !emit(&tx, fetch().await).await {
            return;
        }

        loop {
            match changes.recv().await {
                Ok(change) if tables.contains(&change) => {
                    if !emit(&tx, fetch().await).await {
                        return;
                    }
                }
                // Change to a table this stream doesn't read.
                Ok(_) => continue,
                // Missed some notifications; one refresh makes us current.
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    debug!(missed, "snapshot stream lagged, refreshing");
                    if !emit(&tx, fetch().await).await {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    });

    ReceiverStream::new(rx)
}

/// Sends one snapshot; returns false when the stream should end (receiver
/// gone, or the query failed and the error was the final emission).
async fn emit<T>(tx: &mpsc::Sender<DbResult<Vec<T>>>, snapshot: DbResult<Vec<T>>) -> bool {
    let failed = snapshot.is_err();
    tx.send(snapshot).await.is_ok() && !failed
}
