//! Ties the pieces together for one archive run.
//!
//! ```text
//!  settings ──▶ resolve_ids ──▶ TaskQueue ──▶ WorkerPool (N workers)
//!                   │                              │
//!                   ▼                              ▼
//!                Catalog ◀── lookup ── WindowFetcher ──▶ ArchiveWriter
//! ```
//!
//! Every per-monitor failure stays inside its task: a missing monitor is
//! skipped, a failed window yields a partial archive, and neither stops the
//! other workers.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::api::ResultsApi;
use crate::archive::ArchiveWriter;
use crate::catalog::Catalog;
use crate::error::ArchiveError;
use crate::fetch::{Window, WindowFetcher};
use crate::pool::{Task, TaskQueue, WorkerPool, DEFAULT_WORKERS};
use crate::selector::{resolve_ids, IdSelection};

/// Source of "now", in unix seconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// The wall clock.
pub fn system_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().timestamp())
}

/// What to archive and where.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub selection: IdSelection,
    pub from_id: u64,
    pub workers: usize,
    pub output_dir: PathBuf,
    /// Also write `probes.csv`.
    pub export_probes: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            selection: IdSelection::All,
            from_id: 0,
            workers: DEFAULT_WORKERS,
            output_dir: PathBuf::from("."),
            export_probes: false,
        }
    }
}

/// Result of one task.
#[derive(Debug)]
pub enum TaskOutcome {
    /// Full history written.
    Written {
        monitor_id: u64,
        path: PathBuf,
        rows: usize,
    },
    /// A window failed; the records gathered before it were written.
    Partial {
        monitor_id: u64,
        path: PathBuf,
        rows: usize,
        failed_window: Window,
    },
    /// The id is not in the catalog. No file is written.
    NotFound { monitor_id: u64 },
    /// The archive could not be written.
    Failed { monitor_id: u64, error: String },
}

impl TaskOutcome {
    pub fn monitor_id(&self) -> u64 {
        match self {
            TaskOutcome::Written { monitor_id, .. }
            | TaskOutcome::Partial { monitor_id, .. }
            | TaskOutcome::NotFound { monitor_id }
            | TaskOutcome::Failed { monitor_id, .. } => *monitor_id,
        }
    }
}

/// Summary of a run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Number of tasks enqueued.
    pub selected: usize,
    pub outcomes: Vec<TaskOutcome>,
    /// Tasks whose handler panicked.
    pub panicked: usize,
    /// Path of `probes.csv`, when requested and written.
    pub probes_file: Option<PathBuf>,
    /// The monitor listing failed and was treated as empty.
    pub catalog_degraded: bool,
}

impl RunReport {
    pub fn written(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Written { .. }))
    }

    pub fn partial(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Partial { .. }))
    }

    pub fn not_found(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::NotFound { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&TaskOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}

struct Worker {
    catalog: Arc<Catalog>,
    fetcher: WindowFetcher,
    writer: ArchiveWriter,
    clock: Clock,
}

impl Worker {
    async fn archive(&self, task: Task) -> TaskOutcome {
        let monitor = match self.catalog.monitor(task.monitor_id).await {
            Ok(monitor) => monitor,
            Err(e) => {
                warn!("{} skipping id={}: {}", task, task.monitor_id, e);
                return TaskOutcome::NotFound {
                    monitor_id: task.monitor_id,
                };
            }
        };

        info!("{} fetching '{}' (id={})", task, monitor.name, monitor.id);

        let outcome = self.fetcher.fetch(&monitor, (self.clock)()).await;
        let rows = outcome.rows.len();

        let writer = self.writer.clone();
        let target = monitor.clone();
        let written = tokio::task::spawn_blocking(move || {
            let path = writer.write(&target, &outcome.rows)?;
            Ok::<_, ArchiveError>((path, outcome.failure))
        })
        .await;

        match written {
            Ok(Ok((path, None))) => TaskOutcome::Written {
                monitor_id: monitor.id,
                path,
                rows,
            },
            Ok(Ok((path, Some(failure)))) => {
                warn!(
                    monitor = %monitor.name,
                    id = monitor.id,
                    path = %path.display(),
                    rows,
                    "Wrote partial archive"
                );
                TaskOutcome::Partial {
                    monitor_id: monitor.id,
                    path,
                    rows,
                    failed_window: failure.window,
                }
            }
            Ok(Err(e)) => self.failed(&monitor.name, monitor.id, e),
            Err(e) => self.failed(&monitor.name, monitor.id, e),
        }
    }

    fn failed(&self, name: &str, monitor_id: u64, e: impl std::fmt::Display) -> TaskOutcome {
        error!(monitor = %name, id = monitor_id, error = %e, "Failed to write archive");
        TaskOutcome::Failed {
            monitor_id,
            error: e.to_string(),
        }
    }
}

/// Runs a full archive pass.
pub struct Orchestrator {
    catalog: Arc<Catalog>,
    options: RunOptions,
    fetcher: WindowFetcher,
    clock: Clock,
}

impl Orchestrator {
    /// Create an orchestrator that lazily fetches the catalog from `api`.
    pub fn new(api: Arc<dyn ResultsApi>, options: RunOptions) -> Self {
        let catalog = Arc::new(Catalog::new(api.clone()));
        Self::with_catalog(api, catalog, options)
    }

    /// Create an orchestrator around an existing catalog.
    pub fn with_catalog(
        api: Arc<dyn ResultsApi>,
        catalog: Arc<Catalog>,
        options: RunOptions,
    ) -> Self {
        Self {
            catalog,
            options,
            fetcher: WindowFetcher::new(api),
            clock: system_clock(),
        }
    }

    /// Replace the wall clock.
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the window span (default [`crate::fetch::WINDOW_SPAN`]).
    pub fn window_span(mut self, span: i64) -> Self {
        self.fetcher = self.fetcher.with_span(span);
        self
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Archive every selected monitor and wait for all of them.
    pub async fn run(&self) -> RunReport {
        let mut report = RunReport::default();
        let writer = ArchiveWriter::new(&self.options.output_dir);

        let ids = resolve_ids(
            &self.options.selection,
            self.options.from_id,
            &self.catalog,
        )
        .await;
        report.catalog_degraded = self.catalog.monitors_degraded();

        if self.options.export_probes {
            report.probes_file = self.export_probes(&writer).await;
        }

        let queue = Arc::new(TaskQueue::new());
        for task in Task::for_ids(&ids) {
            queue.push(task);
        }
        queue.close();
        report.selected = queue.pushed();

        info!(
            monitors = report.selected,
            workers = self.options.workers,
            output = %writer.dir().display(),
            "Starting archive run"
        );

        let worker = Arc::new(Worker {
            catalog: self.catalog.clone(),
            fetcher: self.fetcher.clone(),
            writer,
            clock: self.clock.clone(),
        });
        let pool = WorkerPool::new(self.options.workers);
        let pool_report = pool
            .run(queue, move |task| {
                let worker = worker.clone();
                async move { worker.archive(task).await }
            })
            .await;

        report.outcomes = pool_report.outcomes;
        report.panicked = pool_report.panicked;

        info!(
            written = report.written(),
            partial = report.partial(),
            not_found = report.not_found(),
            failed = report.failed() + report.panicked,
            "Archive run complete"
        );

        report
    }

    async fn export_probes(&self, writer: &ArchiveWriter) -> Option<PathBuf> {
        let probes = self.catalog.probes().await;
        let writer = writer.clone();
        match tokio::task::spawn_blocking(move || writer.write_probes(&probes)).await {
            Ok(Ok(path)) => {
                info!(path = %path.display(), "Wrote probes");
                Some(path)
            }
            Ok(Err(e)) => {
                error!(error = %e, "Failed to write probes");
                None
            }
            Err(e) => {
                error!(error = %e, "Failed to write probes");
                None
            }
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MemoryApi, Monitor, ResultRecord};
    use crate::fetch::WINDOW_SPAN;
    use tempfile::TempDir;

    fn fixed(now: i64) -> Clock {
        Arc::new(move || now)
    }

    fn record(time: i64) -> ResultRecord {
        ResultRecord {
            time,
            status: "up".to_string(),
            responsetime: 120,
            statusdesc: "OK".to_string(),
            statusdesclong: "OK".to_string(),
            probeid: 4,
        }
    }

    fn api() -> MemoryApi {
        MemoryApi::new()
            .with_monitor(Monitor {
                id: 1,
                name: "Alpha".to_string(),
                created: 0,
            })
            .with_monitor(Monitor {
                id: 2,
                name: "Beta".to_string(),
                created: 0,
            })
            .with_results(1, vec![record(5), record(WINDOW_SPAN + 5)])
            .with_results(2, vec![record(7), record(WINDOW_SPAN + 7)])
    }

    #[tokio::test]
    async fn test_run_archives_all_monitors() {
        let dir = TempDir::new().unwrap();
        let options = RunOptions {
            output_dir: dir.path().to_path_buf(),
            ..RunOptions::default()
        };

        let report = Orchestrator::new(Arc::new(api()), options)
            .clock(fixed(2 * WINDOW_SPAN))
            .run()
            .await;

        assert_eq!(report.selected, 2);
        assert_eq!(report.written(), 2);
        assert!(!report.catalog_degraded);
        assert!(dir.path().join("archive-1-alpha.csv").exists());
        assert!(dir.path().join("archive-2-beta.csv").exists());
        assert!(!dir.path().join("probes.csv").exists());
    }

    #[tokio::test]
    async fn test_missing_monitor_is_skipped() {
        let dir = TempDir::new().unwrap();
        let options = RunOptions {
            selection: IdSelection::Explicit(vec![2, 99]),
            output_dir: dir.path().to_path_buf(),
            ..RunOptions::default()
        };

        let report = Orchestrator::new(Arc::new(api()), options)
            .clock(fixed(2 * WINDOW_SPAN))
            .run()
            .await;

        assert_eq!(report.selected, 2);
        assert_eq!(report.written(), 1);
        assert_eq!(report.not_found(), 1);
        let missing = report
            .outcomes
            .iter()
            .find(|o| matches!(o, TaskOutcome::NotFound { .. }))
            .unwrap();
        assert_eq!(missing.monitor_id(), 99);

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn test_partial_archive_reported() {
        let dir = TempDir::new().unwrap();
        let options = RunOptions {
            selection: IdSelection::Explicit(vec![1]),
            output_dir: dir.path().to_path_buf(),
            ..RunOptions::default()
        };
        let api = api().with_window_failure(1, WINDOW_SPAN, 500, "Internal error");

        let report = Orchestrator::new(Arc::new(api), options)
            .clock(fixed(2 * WINDOW_SPAN))
            .run()
            .await;

        assert_eq!(report.partial(), 1);
        match &report.outcomes[0] {
            TaskOutcome::Partial {
                rows,
                failed_window,
                ..
            } => {
                assert_eq!(*rows, 1);
                assert_eq!(failed_window.from, WINDOW_SPAN);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_degraded_catalog_reported() {
        let dir = TempDir::new().unwrap();
        let options = RunOptions {
            output_dir: dir.path().to_path_buf(),
            export_probes: true,
            ..RunOptions::default()
        };

        let report = Orchestrator::new(Arc::new(api().with_checks_failure(502)), options)
            .run()
            .await;

        assert!(report.catalog_degraded);
        assert_eq!(report.selected, 0);
        // Probe listing still works
        assert_eq!(report.probes_file, Some(dir.path().join("probes.csv")));
    }
}
