use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use uptime_archive::config::{PartialSettings, Settings};
use uptime_archive::logging::init_tracing;
use uptime_archive::{HttpApi, Orchestrator};

#[derive(Parser, Debug)]
#[command(name = "uptime-archive")]
#[command(about = "Export the full result history of uptime monitors to CSV archives")]
struct Args {
    /// Account user (email)
    #[arg(short, long)]
    user: Option<String>,

    /// Account password
    #[arg(short, long)]
    password: Option<String>,

    /// Application key
    #[arg(short, long)]
    key: Option<String>,

    /// Archive every monitor in the account
    #[arg(short, long, conflicts_with = "check_id")]
    all: bool,

    /// Archive only these monitor ids
    #[arg(short = 'c', long = "check-id", num_args = 1..)]
    check_id: Vec<String>,

    /// Skip monitors with an id lower than this
    #[arg(long)]
    from_id: Option<u64>,

    /// Verbose logging
    #[arg(short, long)]
    debug: bool,

    /// Settings file (TOML, YAML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory the archives are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Also write probes.csv
    #[arg(long)]
    probes: bool,

    /// API endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl Args {
    fn into_partial(self) -> (Option<PathBuf>, PartialSettings) {
        let partial = PartialSettings {
            user: self.user,
            password: self.password,
            key: self.key,
            all: self.all.then_some(true),
            check_id: (!self.check_id.is_empty()).then_some(self.check_id),
            from_id: self.from_id,
            debug: self.debug.then_some(true),
            output_dir: self.output_dir,
            workers: self.workers,
            probes: self.probes.then_some(true),
            endpoint: self.endpoint,
            timeout_secs: self.timeout_secs,
        };
        (self.config, partial)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let (config_path, cli) = Args::parse().into_partial();

    let settings =
        Settings::load(config_path.as_deref(), cli).context("Invalid configuration")?;

    init_tracing(settings.debug);
    tracing::debug!(?settings, "Loaded settings");

    let api = HttpApi::builder()
        .endpoint(&settings.endpoint)
        .credentials(&settings.credentials.user, &settings.credentials.password)
        .app_key(&settings.credentials.key)
        .timeout(settings.timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let started = Instant::now();
    let report = Orchestrator::new(Arc::new(api), settings.run_options())
        .run()
        .await;

    tracing::info!(
        selected = report.selected,
        written = report.written(),
        partial = report.partial(),
        skipped = report.not_found(),
        failed = report.failed() + report.panicked,
        elapsed = ?started.elapsed(),
        "Done"
    );
    if report.catalog_degraded {
        tracing::warn!("Monitor listing was unavailable; nothing may have been archived");
    }

    Ok(())
}
