use std::sync::Arc;

use tracing::{debug, error};

use super::window::{Window, WindowPlan, WINDOW_SPAN};
use crate::api::{Monitor, ResultsApi};
use crate::archive::ArchiveRow;
use crate::error::ApiError;

/// The window request that stopped a monitor's fetch.
#[derive(Debug)]
pub struct WindowFailure {
    pub window: Window,
    pub error: ApiError,
}

/// Everything gathered for one monitor.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Augmented records, in fetch order.
    pub rows: Vec<ArchiveRow>,
    /// Number of windows that were fetched successfully.
    pub windows_fetched: usize,
    /// Set when a window failed and the remaining windows were skipped.
    pub failure: Option<WindowFailure>,
}

impl FetchOutcome {
    /// True when the history was cut short by a failed window.
    pub fn is_partial(&self) -> bool {
        self.failure.is_some()
    }
}

/// Walks one monitor's history window by window.
///
/// Windows are requested strictly in order; a later window is never
/// requested before the earlier one has completed. The first failed request
/// ends the walk without retry, keeping whatever was gathered so far.
#[derive(Debug, Clone)]
pub struct WindowFetcher {
    api: Arc<dyn ResultsApi>,
    span: i64,
}

impl WindowFetcher {
    pub fn new(api: Arc<dyn ResultsApi>) -> Self {
        Self {
            api,
            span: WINDOW_SPAN,
        }
    }

    /// Override the window span. Mostly useful for tests.
    pub fn with_span(mut self, span: i64) -> Self {
        self.span = span;
        self
    }

    /// Fetch the history of `monitor` from its creation time up to `now`.
    pub async fn fetch(&self, monitor: &Monitor, now: i64) -> FetchOutcome {
        let mut outcome = FetchOutcome::default();

        for window in WindowPlan::new(monitor.created, now, self.span) {
            match self.api.results(monitor.id, window).await {
                Ok(records) => {
                    debug!(
                        monitor = %monitor.name,
                        from = window.from,
                        to = window.to,
                        count = records.len(),
                        "Fetched window"
                    );
                    outcome.rows.extend(
                        records
                            .into_iter()
                            .map(|record| ArchiveRow::new(&monitor.name, record)),
                    );
                    outcome.windows_fetched += 1;
                }
                Err(e) => {
                    error!(
                        monitor = %monitor.name,
                        id = monitor.id,
                        from = window.from,
                        to = window.to,
                        status = ?e.status(),
                        error = %e,
                        "Failed to fetch results window, keeping earlier windows"
                    );
                    outcome.failure = Some(WindowFailure { window, error: e });
                    break;
                }
            }
        }

        outcome
    }
}
