//! Remote monitoring API abstraction.
//!
//! The archiver only ever reads from the service: the list of checks, the
//! list of probes, and bounded windows of a check's result history. The
//! [`ResultsApi`] trait captures exactly those three calls so the pipeline
//! can run against the real HTTP client or an in-memory fake.

mod client;
mod memory;
mod types;

pub use client::{HttpApi, HttpApiBuilder, DEFAULT_ENDPOINT};
pub use memory::MemoryApi;
pub use types::{Monitor, Probe, ResultRecord};

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::fetch::Window;

/// Read-only access to the remote monitoring service.
///
/// Implementations must be shareable across workers: one instance is held
/// behind an `Arc` and called concurrently.
///
/// # Example
///
/// ```no_run
/// use uptime_archive::{HttpApi, ResultsApi};
///
/// # tokio_test::block_on(async {
/// let api = HttpApi::builder()
///     .credentials("user@example.com", "secret")
///     .app_key("app-key")
///     .build()
///     .unwrap();
///
/// let checks = api.checks().await.unwrap();
/// println!("{} checks", checks.len());
/// # });
/// ```
#[async_trait]
pub trait ResultsApi: Send + Sync + Debug {
    /// List every configured check.
    async fn checks(&self) -> Result<Vec<Monitor>, ApiError>;

    /// List every probe, including deleted ones.
    async fn probes(&self) -> Result<Vec<Probe>, ApiError>;

    /// Fetch the results of one check inside `window`.
    async fn results(&self, monitor_id: u64, window: Window)
        -> Result<Vec<ResultRecord>, ApiError>;
}
