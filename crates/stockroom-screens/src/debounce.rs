//! # Debounce Primitive
//!
//! A timer-reset-on-event cell: a single slot holding the latest value plus
//! a deadline that every new value pushes back.
//!
//! ## Behavior
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  input:   "a"···"ap"···"app"························ (quiet) ·········  │
//! │            │     │      │                              │                │
//! │            └──reset──reset                             │                │
//! │                          └──── window (300 ms) ───────►│                │
//! │  output:  ─────────────────────────────────────────── "app" ─────────   │
//! │                                                                         │
//! │  Three keystrokes inside the window, ONE downstream emission, carrying  │
//! │  the last value. Intermediate values are never forwarded.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

/// Spawns a debounce task between a raw input cell and a quiet output cell.
///
/// The returned receiver starts at the input's current value and is updated
/// only once the input has been stable for `window`. The task ends when the
/// input sender or every output receiver is dropped; the caller owns the
/// handle and aborts it on screen teardown.
pub fn debounce<T>(
    mut input: watch::Receiver<T>,
    window: Duration,
) -> (watch::Receiver<T>, JoinHandle<()>)
where
    T: Clone + Send + Sync + 'static,
{
    let initial = input.borrow().clone();
    let (tx, rx) = watch::channel(initial);

    let handle = tokio::spawn(async move {
        loop {
            // Idle until something changes at all.
            if input.changed().await.is_err() {
                return;
            }

            // Something is in the slot; arm the deadline and keep pushing
            // it back while more values arrive.
            let mut deadline = Instant::now() + window;
            loop {
                tokio::select! {
                    _ = sleep_until(deadline) => {
                        let latest = input.borrow_and_update().clone();
                        if tx.send(latest).is_err() {
                            return;
                        }
                        break;
                    }
                    changed = input.changed() => {
                        if changed.is_err() {
                            // Input gone mid-burst: forward the final value
                            // so nothing typed is lost, then stop.
                            let latest = input.borrow_and_update().clone();
                            let _ = tx.send(latest);
                            return;
                        }
                        deadline = Instant::now() + window;
                    }
                }
            }
        }
    });

    (rx, handle)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, timeout};

    const WINDOW: Duration = Duration::from_millis(300);

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_last_value() {
        let (tx, rx) = watch::channel(String::new());
        let (mut out, _task) = debounce(rx, WINDOW);

        for value in ["a", "ap", "app"] {
            tx.send(value.to_string()).unwrap();
            // Well inside the quiescence window.
            advance(Duration::from_millis(50)).await;
        }

        out.changed().await.unwrap();
        assert_eq!(*out.borrow_and_update(), "app");

        // Exactly one emission: nothing further without new input.
        advance(WINDOW * 4).await;
        assert!(!out.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_values_outside_window_each_come_through() {
        let (tx, rx) = watch::channel(0u32);
        let (mut out, _task) = debounce(rx, WINDOW);

        tx.send(1).unwrap();
        out.changed().await.unwrap();
        assert_eq!(*out.borrow_and_update(), 1);

        tx.send(2).unwrap();
        out.changed().await.unwrap();
        assert_eq!(*out.borrow_and_update(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_emitted_before_window_elapses() {
        let (tx, rx) = watch::channel(0u32);
        let (mut out, _task) = debounce(rx, WINDOW);

        tx.send(7).unwrap();
        // Let the task arm its deadline, then stop one tick short of it.
        advance(WINDOW - Duration::from_millis(1)).await;
        let early = timeout(Duration::ZERO, out.changed()).await;
        assert!(early.is_err(), "value leaked before the window elapsed");

        // The remaining tick releases it.
        advance(Duration::from_millis(1)).await;
        out.changed().await.unwrap();
        assert_eq!(*out.borrow_and_update(), 7);
    }
}
