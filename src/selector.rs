//! Resolution of the monitor ids a run should archive.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::ConfigError;

/// Which monitors to archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdSelection {
    /// Every monitor in the catalog.
    All,
    /// An explicit list of monitor ids.
    Explicit(Vec<u64>),
}

impl IdSelection {
    /// Parse explicit ids given as strings.
    ///
    /// Entries may themselves be comma-separated. A malformed entry is a
    /// configuration error.
    pub fn parse_explicit<S: AsRef<str>>(raw: &[S]) -> Result<Self, ConfigError> {
        let mut ids = Vec::new();
        for entry in raw {
            for part in entry.as_ref().split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                let id = part
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidMonitorId(part.to_string()))?;
                ids.push(id);
            }
        }
        Ok(IdSelection::Explicit(ids))
    }
}

/// Resolve the sorted, distinct ids `>= from_id` for `selection`.
///
/// The catalog is only consulted for [`IdSelection::All`]; explicit ids are
/// taken as given, and ids unknown to the catalog surface later as
/// not-found tasks.
pub async fn resolve_ids(selection: &IdSelection, from_id: u64, catalog: &Catalog) -> Vec<u64> {
    let candidates: BTreeSet<u64> = match selection {
        IdSelection::All => catalog.monitors().await.keys().copied().collect(),
        IdSelection::Explicit(ids) => ids.iter().copied().collect(),
    };
    filter_ids(candidates, from_id)
}

fn filter_ids(candidates: BTreeSet<u64>, from_id: u64) -> Vec<u64> {
    candidates.into_iter().filter(|id| *id >= from_id).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::api::{MemoryApi, Monitor};

    fn catalog_with(ids: &[u64]) -> (Arc<MemoryApi>, Catalog) {
        let mut api = MemoryApi::new();
        for id in ids {
            api = api.with_monitor(Monitor {
                id: *id,
                name: format!("m{}", id),
                created: 0,
            });
        }
        let api = Arc::new(api);
        (api.clone(), Catalog::new(api))
    }

    #[tokio::test]
    async fn test_explicit_ids_filtered_and_sorted() {
        let (api, catalog) = catalog_with(&[]);
        let selection = IdSelection::Explicit(vec![50, 100, 150, 99]);

        let ids = resolve_ids(&selection, 100, &catalog).await;

        assert_eq!(ids, vec![100, 150]);
        assert_eq!(api.checks_calls(), 0);
    }

    #[tokio::test]
    async fn test_all_uses_catalog() {
        let (_, catalog) = catalog_with(&[150, 50, 100, 99]);

        let ids = resolve_ids(&IdSelection::All, 100, &catalog).await;
        assert_eq!(ids, vec![100, 150]);

        let ids = resolve_ids(&IdSelection::All, 0, &catalog).await;
        assert_eq!(ids, vec![50, 99, 100, 150]);
    }

    #[tokio::test]
    async fn test_duplicates_removed() {
        let (_, catalog) = catalog_with(&[]);
        let selection = IdSelection::Explicit(vec![3, 1, 3, 2, 1]);

        assert_eq!(resolve_ids(&selection, 0, &catalog).await, vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_explicit() {
        let selection = IdSelection::parse_explicit(&["12", " 7 ", "3,4"]).unwrap();
        assert_eq!(selection, IdSelection::Explicit(vec![12, 7, 3, 4]));
    }

    #[test]
    fn test_parse_explicit_rejects_malformed() {
        let err = IdSelection::parse_explicit(&["12", "abc"]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMonitorId(ref s) if s == "abc"));

        assert!(IdSelection::parse_explicit(&["-1"]).is_err());
    }
}
