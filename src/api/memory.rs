//! In-memory API.
//!
//! Serves a fixed set of checks, probes and results without touching the
//! network. Windows are half-open here (`from <= time < to`) so adjacent
//! windows never return the same record twice. Individual windows, or the
//! list calls, can be made to fail with a given status.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Monitor, Probe, ResultRecord, ResultsApi};
use crate::error::ApiError;
use crate::fetch::Window;

/// A [`ResultsApi`] backed by in-memory data.
///
/// # Example
///
/// ```
/// use uptime_archive::{MemoryApi, Monitor};
///
/// let api = MemoryApi::new().with_monitor(Monitor {
///     id: 1,
///     name: "Homepage".to_string(),
///     created: 0,
/// });
/// ```
#[derive(Debug, Default)]
pub struct MemoryApi {
    monitors: Vec<Monitor>,
    probes: Vec<Probe>,
    results: HashMap<u64, Vec<ResultRecord>>,
    window_failures: HashMap<(u64, i64), (u16, String)>,
    checks_failure: Option<u16>,
    probes_failure: Option<u16>,
    checks_calls: AtomicUsize,
    probes_calls: AtomicUsize,
    requested: Mutex<BTreeMap<u64, Vec<Window>>>,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_monitor(mut self, monitor: Monitor) -> Self {
        self.monitors.push(monitor);
        self
    }

    pub fn with_probe(mut self, probe: Probe) -> Self {
        self.probes.push(probe);
        self
    }

    /// Register the full result history of a monitor.
    pub fn with_results(mut self, monitor_id: u64, records: Vec<ResultRecord>) -> Self {
        self.results.entry(monitor_id).or_default().extend(records);
        self
    }

    /// Make the window starting at `from` fail for `monitor_id`.
    pub fn with_window_failure(
        mut self,
        monitor_id: u64,
        from: i64,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        self.window_failures
            .insert((monitor_id, from), (status, message.into()));
        self
    }

    /// Make the check listing fail with `status`.
    pub fn with_checks_failure(mut self, status: u16) -> Self {
        self.checks_failure = Some(status);
        self
    }

    /// Make the probe listing fail with `status`.
    pub fn with_probes_failure(mut self, status: u16) -> Self {
        self.probes_failure = Some(status);
        self
    }

    /// How many times the check listing was requested.
    pub fn checks_calls(&self) -> usize {
        self.checks_calls.load(Ordering::SeqCst)
    }

    /// How many times the probe listing was requested.
    pub fn probes_calls(&self) -> usize {
        self.probes_calls.load(Ordering::SeqCst)
    }

    /// Windows requested for `monitor_id`, in request order.
    pub fn requested_windows(&self, monitor_id: u64) -> Vec<Window> {
        self.requested
            .lock()
            .get(&monitor_id)
            .cloned()
            .unwrap_or_default()
    }

    fn fail(status: u16, message: &str) -> ApiError {
        ApiError::Status {
            status,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl ResultsApi for MemoryApi {
    async fn checks(&self) -> Result<Vec<Monitor>, ApiError> {
        self.checks_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        match self.checks_failure {
            Some(status) => Err(Self::fail(status, "checks unavailable")),
            None => Ok(self.monitors.clone()),
        }
    }

    async fn probes(&self) -> Result<Vec<Probe>, ApiError> {
        self.probes_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        match self.probes_failure {
            Some(status) => Err(Self::fail(status, "probes unavailable")),
            None => Ok(self.probes.clone()),
        }
    }

    async fn results(
        &self,
        monitor_id: u64,
        window: Window,
    ) -> Result<Vec<ResultRecord>, ApiError> {
        self.requested
            .lock()
            .entry(monitor_id)
            .or_default()
            .push(window);
        tokio::task::yield_now().await;

        if let Some((status, message)) = self.window_failures.get(&(monitor_id, window.from)) {
            return Err(Self::fail(*status, message));
        }

        Ok(self
            .results
            .get(&monitor_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.time >= window.from && r.time < window.to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
