//! Wire types for the remote monitoring API.
//!
//! Field names follow the JSON the service produces, which is why most of
//! them are lowercase run-together words.

use serde::{Deserialize, Serialize};

/// A configured uptime check tracked by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monitor {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    /// Creation time, unix seconds. History starts here.
    pub created: i64,
}

/// A geographically distributed agent that executes checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    pub id: u64,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub ipv6: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub countryiso: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub deleted: bool,
}

/// One monitoring sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub time: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub responsetime: i64,
    #[serde(default)]
    pub statusdesc: String,
    #[serde(default)]
    pub statusdesclong: String,
    #[serde(default)]
    pub probeid: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChecksResponse {
    #[serde(default)]
    pub checks: Vec<Monitor>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProbesResponse {
    #[serde(default)]
    pub probes: Vec<Probe>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResultsResponse {
    #[serde(default)]
    pub results: Vec<ResultRecord>,
}

/// Body the service returns alongside a non-success status.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub errormessage: String,
}
