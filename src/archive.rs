//! CSV archive output.
//!
//! Each monitor gets one file, `archive-<id>-<slug>.csv`, rewritten from
//! scratch on every run. Rows keep the order in which they were fetched.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::api::{Monitor, Probe, ResultRecord};
use crate::catalog::ProbeMap;
use crate::error::ArchiveError;

/// Column header of every archive file.
pub const ARCHIVE_HEADER: [&str; 8] = [
    "name",
    "human_time",
    "time",
    "status",
    "responsetime",
    "statusdesc",
    "statusdesclong",
    "probeid",
];

/// Column header of the probe listing.
pub const PROBES_HEADER: [&str; 11] = [
    "id",
    "hostname",
    "ip",
    "ipv6",
    "name",
    "city",
    "countryiso",
    "country",
    "region",
    "active",
    "deleted",
];

/// File name of the probe listing.
pub const PROBES_FILE: &str = "probes.csv";

/// Format used for the `human_time` column (UTC).
const HUMAN_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One archive line: a result record plus the monitor's name and a readable
/// timestamp. Field order matches [`ARCHIVE_HEADER`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveRow {
    pub name: String,
    pub human_time: String,
    pub time: i64,
    pub status: String,
    pub responsetime: i64,
    pub statusdesc: String,
    pub statusdesclong: String,
    pub probeid: u64,
}

impl ArchiveRow {
    pub fn new(monitor_name: &str, record: ResultRecord) -> Self {
        Self {
            name: monitor_name.to_string(),
            human_time: human_time(record.time),
            time: record.time,
            status: record.status,
            responsetime: record.responsetime,
            statusdesc: record.statusdesc,
            statusdesclong: record.statusdesclong,
            probeid: record.probeid,
        }
    }
}

/// Render unix seconds as `YYYY-MM-DD HH:MM:SS` in UTC. Out-of-range values
/// render as an empty string.
pub fn human_time(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.format(HUMAN_TIME_FORMAT).to_string())
        .unwrap_or_default()
}

/// Filesystem-safe slug: lowercase ASCII alphanumerics, every other run of
/// characters collapsed into a single `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Deterministic archive file name for a monitor.
pub fn archive_file_name(monitor: &Monitor) -> String {
    format!("archive-{}-{}.csv", monitor.id, slugify(&monitor.name))
}

#[derive(Serialize)]
struct ProbeRow<'a> {
    id: u64,
    hostname: &'a str,
    ip: &'a str,
    ipv6: &'a str,
    name: &'a str,
    city: &'a str,
    countryiso: &'a str,
    country: &'a str,
    region: &'a str,
    active: bool,
    deleted: bool,
}

impl<'a> From<&'a Probe> for ProbeRow<'a> {
    fn from(p: &'a Probe) -> Self {
        Self {
            id: p.id,
            hostname: &p.hostname,
            ip: &p.ip,
            ipv6: &p.ipv6,
            name: &p.name,
            city: &p.city,
            countryiso: &p.countryiso,
            country: &p.country,
            region: &p.region,
            active: p.active,
            deleted: p.deleted,
        }
    }
}

/// Writes archives into one output directory.
#[derive(Debug, Clone)]
pub struct ArchiveWriter {
    dir: PathBuf,
}

impl ArchiveWriter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Returns the output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the archive of `monitor` is written to.
    pub fn archive_path(&self, monitor: &Monitor) -> PathBuf {
        self.dir.join(archive_file_name(monitor))
    }

    /// Write `rows` for `monitor`, replacing any previous archive.
    ///
    /// The header is always written, even when there are no rows.
    pub fn write(&self, monitor: &Monitor, rows: &[ArchiveRow]) -> Result<PathBuf, ArchiveError> {
        let path = self.archive_path(monitor);
        let mut writer = self.open(&path)?;

        writer.write_record(ARCHIVE_HEADER)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        debug!(path = %path.display(), rows = rows.len(), "Wrote archive");
        Ok(path)
    }

    /// Write the probe listing to `probes.csv`, in ascending id order.
    pub fn write_probes(&self, probes: &ProbeMap) -> Result<PathBuf, ArchiveError> {
        let path = self.dir.join(PROBES_FILE);
        let mut writer = self.open(&path)?;

        writer.write_record(PROBES_HEADER)?;
        for probe in probes.values() {
            writer.serialize(ProbeRow::from(probe))?;
        }
        writer.flush()?;

        debug!(path = %path.display(), rows = probes.len(), "Wrote probes");
        Ok(path)
    }

    fn open(&self, path: &Path) -> Result<csv::Writer<File>, ArchiveError> {
        fs::create_dir_all(&self.dir)?;
        let file = File::create(path)?;
        Ok(csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file))
    }
}
