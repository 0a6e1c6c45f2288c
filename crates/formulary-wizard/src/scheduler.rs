//! Debounced, generation-tagged compatibility rechecks.
//!
//! Every scheduled request spawns a task that sleeps for the debounce
//! window and then checks whether a newer request arrived in the meantime.
//! Only the newest request reaches the collaborator. Results travel back
//! over a channel tagged with their generation; the store drops any that
//! are older than the latest dispatched request.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use formulary_api::FormulaApi;
use formulary_core::formula::CompatibilityIssue;
use formulary_store::{CompatibilityRequest, RecheckSink};

/// Debounce window used when none is configured.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// A finished compatibility check.
#[derive(Debug, Clone, PartialEq)]
pub struct CompatibilityOutcome {
    pub generation: u64,
    pub result: Result<Vec<CompatibilityIssue>, String>,
}

/// [`RecheckSink`] that runs checks on the ambient tokio runtime.
pub struct CompatibilityScheduler {
    api: Arc<dyn FormulaApi>,
    debounce: Duration,
    latest: Arc<AtomicU64>,
    results: mpsc::UnboundedSender<CompatibilityOutcome>,
}

impl CompatibilityScheduler {
    /// Creates a scheduler and the receiver its outcomes arrive on.
    pub fn new(
        api: Arc<dyn FormulaApi>,
        debounce: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<CompatibilityOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            api,
            debounce,
            latest: Arc::new(AtomicU64::new(0)),
            results: tx,
        };
        (scheduler, rx)
    }
}

impl RecheckSink for CompatibilityScheduler {
    fn schedule(&self, request: CompatibilityRequest) {
        self.latest.fetch_max(request.generation, Ordering::SeqCst);

        let Ok(handle) = Handle::try_current() else {
            warn!(
                generation = request.generation,
                "no async runtime, compatibility check skipped"
            );
            // Settle the generation so the store does not stay in loading.
            let _ = self.results.send(CompatibilityOutcome {
                generation: request.generation,
                result: Err("no async runtime".into()),
            });
            return;
        };

        let api = Arc::clone(&self.api);
        let latest = Arc::clone(&self.latest);
        let results = self.results.clone();
        let debounce = self.debounce;

        handle.spawn(async move {
            if !debounce.is_zero() {
                tokio::time::sleep(debounce).await;
            }
            if latest.load(Ordering::SeqCst) != request.generation {
                debug!(generation = request.generation, "compatibility check superseded");
                return;
            }

            let result = if request.ingredient_ids.is_empty() {
                Ok(Vec::new())
            } else {
                api.check_compatibility(&request.ingredient_ids)
                    .await
                    .map_err(|e| e.to_string())
            };

            // The controller may already be gone.
            let _ = results.send(CompatibilityOutcome {
                generation: request.generation,
                result,
            });
        });
    }
}
