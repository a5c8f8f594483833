//! # uptime-archive
//!
//! Bulk export of an uptime-monitoring service's result history into one CSV
//! archive per monitor.
//!
//! The service caps every results query at a 32-day span, so each monitor's
//! history is walked window by window from its creation time to now. A
//! fixed pool of workers runs those walks for many monitors at once.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Orchestrator                            │
//! │  ┌──────────┐   ┌───────────┐   ┌────────────────────────────┐  │
//! │  │ selector │──▶│ TaskQueue │──▶│ WorkerPool                 │  │
//! │  └────┬─────┘   └───────────┘   │  WindowFetcher ─▶ Archive  │  │
//! │       │                         └──────┬─────────────────────┘  │
//! │       ▼                                ▼                        │
//! │  ┌─────────┐                    ┌────────────┐                  │
//! │  │ Catalog │───────────────────▶│ ResultsApi │◀─ HttpApi |      │
//! │  └─────────┘                    └────────────┘   MemoryApi      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`api`]**: the [`ResultsApi`] trait, the authenticated [`HttpApi`]
//!   client and an in-memory [`MemoryApi`]
//! - **[`catalog`]**: compute-once snapshot of monitors and probes
//! - **[`selector`]**: which monitor ids to archive
//! - **[`fetch`]**: window planning and the sequential per-monitor fetch
//! - **[`archive`]**: CSV output
//! - **[`pool`]**: closable task queue and fixed-size worker pool
//! - **[`orchestrator`]**: one full run
//!
//! ## Usage
//!
//! ```bash
//! uptime-archive --user ops@example.com --password secret --key APPKEY --all
//! uptime-archive --user ... --password ... --key ... --check-id 1234 5678 --from-id 1000
//! ```
//!
//! ### As a library
//!
//! ```
//! use std::sync::Arc;
//! use uptime_archive::{IdSelection, MemoryApi, Monitor, Orchestrator, RunOptions};
//!
//! # tokio_test::block_on(async {
//! let dir = tempfile::tempdir().unwrap();
//! let api = Arc::new(MemoryApi::new().with_monitor(Monitor {
//!     id: 1,
//!     name: "Homepage".to_string(),
//!     created: 0,
//! }));
//!
//! let options = RunOptions {
//!     selection: IdSelection::All,
//!     output_dir: dir.path().to_path_buf(),
//!     ..RunOptions::default()
//! };
//! let report = Orchestrator::new(api, options)
//!     .clock(Arc::new(|| 60))
//!     .run()
//!     .await;
//!
//! assert_eq!(report.written(), 1);
//! # });
//! ```

pub mod api;
pub mod archive;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod orchestrator;
pub mod pool;
pub mod selector;

// Re-export main types for convenience
pub use api::{HttpApi, MemoryApi, Monitor, Probe, ResultRecord, ResultsApi};
pub use archive::{ArchiveRow, ArchiveWriter};
pub use catalog::Catalog;
pub use crate::config::{PartialSettings, Settings};
pub use error::{ApiError, ArchiveError, ConfigError};
pub use fetch::{FetchOutcome, Window, WindowFetcher, WindowPlan, WINDOW_SPAN};
pub use orchestrator::{Orchestrator, RunOptions, RunReport, TaskOutcome};
pub use pool::{Task, TaskQueue, WorkerPool, DEFAULT_WORKERS};
pub use selector::{resolve_ids, IdSelection};
