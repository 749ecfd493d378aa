// Short-lived cache of sheet ranges. The roster store reads the whole
// roster table for almost every command; without this every profile
// lookup costs an API call against a tight per-minute quota.

use dashmap::DashMap;
use std::time::{Duration, Instant};

pub struct RangeCache {
    entries: DashMap<String, (Instant, Vec<Vec<String>>)>,
    ttl: Duration,
}

impl RangeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, range: &str) -> Option<Vec<Vec<String>>> {
        let entry = self.entries.get(range)?;
        let (stored_at, values) = entry.value();
        if stored_at.elapsed() < self.ttl {
            Some(values.clone())
        } else {
            drop(entry);
            self.entries.remove(range);
            None
        }
    }

    pub fn put(&self, range: &str, values: Vec<Vec<String>>) {
        self.entries
            .insert(range.to_string(), (Instant::now(), values));
    }

    /// Drops every cached range belonging to a worksheet. Called after
    /// any write so reads never see stale rows.
    pub fn invalidate_sheet(&self, sheet: &str) {
        let prefix = format!("{}!", sheet);
        self.entries
            .retain(|range, _| !range.starts_with(&prefix) && range != sheet);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Vec<String>> {
        vec![vec!["IGN".to_string()], vec!["Aran".to_string()]]
    }

    #[test]
    fn cached_ranges_are_returned_until_expiry() {
        let cache = RangeCache::new(Duration::from_secs(60));
        assert!(cache.get("GPQ!A1:C2").is_none());

        cache.put("GPQ!A1:C2", rows());
        assert_eq!(cache.get("GPQ!A1:C2"), Some(rows()));
    }

    #[test]
    fn a_zero_ttl_disables_caching() {
        let cache = RangeCache::new(Duration::ZERO);
        cache.put("GPQ!A1:C2", rows());
        assert!(cache.get("GPQ!A1:C2").is_none());
    }

    #[test]
    fn invalidation_only_hits_the_named_sheet() {
        let cache = RangeCache::new(Duration::from_secs(60));
        cache.put("GPQ!A1:C2", rows());
        cache.put("Settings!A1:E10", rows());

        cache.invalidate_sheet("GPQ");
        assert!(cache.get("GPQ!A1:C2").is_none());
        assert_eq!(cache.get("Settings!A1:E10"), Some(rows()));
    }
}
