//! Shared snapshot of the service's monitors and probes.
//!
//! Both listings are fetched lazily, at most once per [`Catalog`], and then
//! shared read-only by every worker. Concurrent first callers wait on the
//! same in-flight request. A failed listing is recovered as an empty
//! collection: the run keeps going, but the failure is logged and
//! remembered so callers can tell an empty account from an outage.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::api::{Monitor, Probe, ResultsApi};
use crate::error::ArchiveError;

/// Entities keyed by id.
pub type MonitorMap = BTreeMap<u64, Monitor>;
pub type ProbeMap = BTreeMap<u64, Probe>;

#[derive(Debug)]
struct Listing<T> {
    entries: Arc<BTreeMap<u64, T>>,
    degraded: bool,
}

impl<T> Listing<T> {
    fn ready(entries: BTreeMap<u64, T>) -> Self {
        Self {
            entries: Arc::new(entries),
            degraded: false,
        }
    }

    fn degraded() -> Self {
        Self {
            entries: Arc::new(BTreeMap::new()),
            degraded: true,
        }
    }
}

/// Compute-once catalog of monitors and probes.
#[derive(Debug)]
pub struct Catalog {
    api: Arc<dyn ResultsApi>,
    monitors: OnceCell<Listing<Monitor>>,
    probes: OnceCell<Listing<Probe>>,
}

impl Catalog {
    /// Create an empty catalog that fetches from `api` on first access.
    pub fn new(api: Arc<dyn ResultsApi>) -> Self {
        Self {
            api,
            monitors: OnceCell::new(),
            probes: OnceCell::new(),
        }
    }

    /// Create a catalog that is already populated. `api` is never asked for
    /// listings.
    pub fn from_parts(
        api: Arc<dyn ResultsApi>,
        monitors: impl IntoIterator<Item = Monitor>,
        probes: impl IntoIterator<Item = Probe>,
    ) -> Self {
        let monitors = monitors.into_iter().map(|m| (m.id, m)).collect();
        let probes = probes.into_iter().map(|p| (p.id, p)).collect();
        Self {
            api,
            monitors: OnceCell::new_with(Some(Listing::ready(monitors))),
            probes: OnceCell::new_with(Some(Listing::ready(probes))),
        }
    }

    /// All monitors, keyed by id.
    pub async fn monitors(&self) -> Arc<MonitorMap> {
        self.monitor_listing().await.entries.clone()
    }

    /// All probes (deleted ones included), keyed by id.
    pub async fn probes(&self) -> Arc<ProbeMap> {
        self.probe_listing().await.entries.clone()
    }

    /// Look up a monitor by id.
    pub async fn monitor(&self, id: u64) -> Result<Monitor, ArchiveError> {
        self.monitor_listing()
            .await
            .entries
            .get(&id)
            .cloned()
            .ok_or(ArchiveError::MonitorNotFound(id))
    }

    /// Look up a probe by id.
    pub async fn probe(&self, id: u64) -> Result<Probe, ArchiveError> {
        self.probe_listing()
            .await
            .entries
            .get(&id)
            .cloned()
            .ok_or(ArchiveError::ProbeNotFound(id))
    }

    /// True if the monitor listing failed and was replaced by an empty one.
    /// `false` until the listing has been fetched.
    pub fn monitors_degraded(&self) -> bool {
        self.monitors.get().is_some_and(|l| l.degraded)
    }

    /// True if the probe listing failed and was replaced by an empty one.
    pub fn probes_degraded(&self) -> bool {
        self.probes.get().is_some_and(|l| l.degraded)
    }

    async fn monitor_listing(&self) -> &Listing<Monitor> {
        self.monitors
            .get_or_init(|| async {
                match self.api.checks().await {
                    Ok(checks) => {
                        debug!(count = checks.len(), "Loaded monitors");
                        Listing::ready(checks.into_iter().map(|m| (m.id, m)).collect())
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to list monitors, continuing with none");
                        Listing::degraded()
                    }
                }
            })
            .await
    }

    async fn probe_listing(&self) -> &Listing<Probe> {
        self.probes
            .get_or_init(|| async {
                match self.api.probes().await {
                    Ok(probes) => {
                        debug!(count = probes.len(), "Loaded probes");
                        Listing::ready(probes.into_iter().map(|p| (p.id, p)).collect())
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to list probes, continuing with none");
                        Listing::degraded()
                    }
                }
            })
            .await
    }
}
