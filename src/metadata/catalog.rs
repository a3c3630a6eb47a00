use std::{collections::HashMap, sync::{Arc, RwLock}};

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::metadata::{EntityMetadata, MetadataError};

/// Where entity metadata comes from (a remote service in production).
pub trait MetadataSource: Send + Sync {
    fn fetch(&self, entity_name: &str) -> Result<EntityMetadata, MetadataError>;
}

type Slot = Arc<OnceCell<Arc<EntityMetadata>>>;

/// Lazily populated, shared view of the metadata catalog.
///
/// Each entity is fetched at most once: concurrent callers asking for the same
/// name wait on the same slot. A failed fetch leaves the slot empty so the next
/// lookup retries. Entries are never evicted.
pub struct MetadataCache {
    source: Box<dyn MetadataSource>,
    entries: RwLock<HashMap<String, Slot>>,
}

impl MetadataCache {
    pub fn new(source: impl MetadataSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, entity_name: &str) -> Result<Arc<EntityMetadata>, MetadataError> {
        let key = entity_name.to_ascii_lowercase();
        let slot = self.slot(&key)?;
        let metadata = slot.get_or_try_init(|| {
            debug!(entity = %key, "fetching entity metadata");
            self.source.fetch(&key).map(Arc::new)
        })?;
        Ok(Arc::clone(metadata))
    }

    /// Names whose metadata is already loaded.
    pub fn loaded(&self) -> Vec<String> {
        let Ok(entries) = self.entries.read() else {
            return vec![];
        };
        let mut names: Vec<String> = entries.iter()
            .filter(|(_, slot)| slot.get().is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    fn slot(&self, key: &str) -> Result<Slot, MetadataError> {
        {
            let entries = self.entries.read()
                .map_err(|e| MetadataError::Source(e.to_string()))?;
            if let Some(slot) = entries.get(key) {
                return Ok(Arc::clone(slot));
            }
        }
        let mut entries = self.entries.write()
            .map_err(|e| MetadataError::Source(e.to_string()))?;
        Ok(Arc::clone(entries.entry(key.to_string()).or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: Arc<AtomicUsize>,
    }

    impl MetadataSource for CountingSource {
        fn fetch(&self, entity_name: &str) -> Result<EntityMetadata, MetadataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match entity_name {
                "account" => Ok(EntityMetadata::new("account", "Account", "accountid")),
                other => Err(MetadataError::NotFound(other.to_string())),
            }
        }
    }

    #[test]
    fn populates_each_entity_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = MetadataCache::new(CountingSource { calls: Arc::clone(&calls) });

        let a = cache.get("account").unwrap();
        let b = cache.get("ACCOUNT").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.loaded(), vec!["account".to_string()]);
    }

    #[test]
    fn failed_fetch_is_retried_on_next_miss() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = MetadataCache::new(CountingSource { calls: Arc::clone(&calls) });

        assert_eq!(cache.get("nope"), Err(MetadataError::NotFound("nope".into())));
        assert!(cache.get("nope").is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.loaded().is_empty());
    }

    #[test]
    fn concurrent_readers_share_one_fetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = Arc::new(MetadataCache::new(CountingSource { calls: Arc::clone(&calls) }));

        let handles: Vec<_> = (0..8).map(|_| {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || cache.get("account").map(|m| m.primary_id_attribute.clone()))
        }).collect();

        for h in handles {
            assert_eq!(h.join().unwrap().unwrap(), "accountid");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
