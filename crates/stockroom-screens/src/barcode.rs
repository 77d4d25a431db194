//! # Barcode Capability
//!
//! Boundary to whatever scanning hardware the host platform provides.
//! The product form never talks to a camera; it watches the result stream
//! and fills its barcode field when a scan lands.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

/// Scan results buffered per subscriber.
const RESULT_BUFFER: usize = 8;

/// A barcode scan that could not complete.
#[derive(Debug, Clone, Error)]
#[error("barcode scan failed: {0}")]
pub struct ScanError(pub String);

/// Platform seam: something that can run one scan to completion.
///
/// `Ok(None)` means the user dismissed the scan UI without scanning;
/// that is not an error and produces no barcode.
pub trait ScanBackend: Send + Sync {
    fn scan(&self) -> Pin<Box<dyn Future<Output = Result<Option<String>, ScanError>> + Send + '_>>;
}

/// Shared scanner handle: one backend, one broadcast stream of results.
///
/// Results go to every currently-subscribed screen; a screen that isn't
/// open when a scan completes simply never sees it.
#[derive(Clone)]
pub struct BarcodeScanner {
    backend: Arc<dyn ScanBackend>,
    results_tx: broadcast::Sender<String>,
}

impl BarcodeScanner {
    /// Creates a scanner over the given platform backend.
    pub fn new(backend: Arc<dyn ScanBackend>) -> Self {
        let (results_tx, _) = broadcast::channel(RESULT_BUFFER);
        BarcodeScanner {
            backend,
            results_tx,
        }
    }

    /// Subscribes to future scan results.
    pub fn results(&self) -> broadcast::Receiver<String> {
        self.results_tx.subscribe()
    }

    /// Runs one scan and pushes a successful read onto the result stream.
    ///
    /// Dismissed scans push nothing; failures surface to the caller, which
    /// turns them into a one-shot error effect and leaves state untouched.
    pub async fn start_scan(&self) -> Result<(), ScanError> {
        let result = self.backend.scan().await?;
        match result {
            Some(code) => {
                debug!(%code, "barcode scanned");
                let _ = self.results_tx.send(code);
            }
            None => debug!("barcode scan dismissed"),
        }
        Ok(())
    }
}

// =============================================================================
// Test Backend
// =============================================================================

/// Scripted backend for tests: pops pre-queued outcomes in order.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    pub struct ScriptedBackend {
        outcomes: Mutex<VecDeque<Result<Option<String>, ScanError>>>,
    }

    impl ScriptedBackend {
        pub fn new(outcomes: Vec<Result<Option<String>, ScanError>>) -> Self {
            ScriptedBackend {
                outcomes: Mutex::new(outcomes.into()),
            }
        }
    }

    impl ScanBackend for ScriptedBackend {
        fn scan(
            &self,
        ) -> Pin<Box<dyn Future<Output = Result<Option<String>, ScanError>> + Send + '_>> {
            let next = self
                .outcomes
                .lock()
                .expect("scripted backend poisoned")
                .pop_front()
                .unwrap_or(Ok(None));
            Box::pin(async move { next })
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::testing::ScriptedBackend;
    use super::*;

    #[tokio::test]
    async fn test_successful_scan_reaches_subscribers() {
        let scanner = BarcodeScanner::new(Arc::new(ScriptedBackend::new(vec![Ok(Some(
            "5449000000996".to_string(),
        ))])));
        let mut results = scanner.results();

        scanner.start_scan().await.unwrap();

        assert_eq!(results.recv().await.unwrap(), "5449000000996");
    }

    #[tokio::test]
    async fn test_dismissed_scan_pushes_nothing() {
        let scanner = BarcodeScanner::new(Arc::new(ScriptedBackend::new(vec![Ok(None)])));
        let mut results = scanner.results();

        scanner.start_scan().await.unwrap();

        assert!(matches!(
            results.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_failed_scan_surfaces_error() {
        let scanner = BarcodeScanner::new(Arc::new(ScriptedBackend::new(vec![Err(ScanError(
            "camera unavailable".to_string(),
        ))])));

        assert!(scanner.start_scan().await.is_err());
    }
}
