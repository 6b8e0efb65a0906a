use std::collections::HashSet;

use tracing::debug;

use crate::error::StoreError;
use crate::feed::RawEntry;
use crate::store::LifecycleStore;
use crate::urls::normalize_url;

/// Drops candidates the persisted store already knows about.
#[derive(Debug, Clone, Copy)]
pub struct DedupFilter<'a> {
    store: &'a LifecycleStore,
}

impl<'a> DedupFilter<'a> {
    pub fn new(store: &'a LifecycleStore) -> Self {
        Self { store }
    }

    /// True iff the URL is in the ACTIVE or the EXPIRED partition.
    pub async fn is_known(&self, url: &str) -> Result<bool, StoreError> {
        self.store.is_known(url).await
    }

    /// Keeps entries that are neither stored nor repeated earlier in `entries`.
    pub async fn filter_new(&self, entries: Vec<RawEntry>) -> Result<Vec<RawEntry>, StoreError> {
        let mut batch_keys = HashSet::new();
        let mut fresh = Vec::new();
        for entry in entries {
            if !batch_keys.insert(normalize_url(&entry.link)) {
                debug!(url = %entry.link, "duplicate within batch");
                continue;
            }
            if self.store.is_known(&entry.link).await? {
                continue;
            }
            fresh.push(entry);
        }
        Ok(fresh)
    }
}
