//! Compiled-query cache: processor instance -> resolved URI -> executable.
//!
//! Both levels are `DashMap`s. Each URI slot is an `Arc<OnceCell<..>>`
//! inserted under the shard lock and initialised outside it, so a
//! concurrent miss compiles exactly once and every caller for that key
//! receives the same executable. A failed compile leaves the slot empty.

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use url::Url;
use xqweb_core::{Error, Executable, QueryProcessor};

type Slot = Arc<OnceCell<Arc<dyn Executable>>>;

/// Identity of a processor instance. The cache keeps the processor alive, so
/// the address cannot be reused while its entries exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ProcessorKey(usize);

impl ProcessorKey {
    fn of(processor: &Arc<dyn QueryProcessor>) -> Self {
        Self(Arc::as_ptr(processor).cast::<()>() as usize)
    }
}

struct ProcessorCache {
    _processor: Arc<dyn QueryProcessor>,
    entries: DashMap<Url, Slot>,
}

#[derive(Default)]
pub struct QueryCache {
    by_processor: DashMap<ProcessorKey, Arc<ProcessorCache>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached executable for (`processor`, `uri`), running `compile`
    /// only if no executable exists yet. Concurrent callers for the same key
    /// wait for the first one instead of compiling again.
    pub fn get_or_compile<F>(&self, processor: &Arc<dyn QueryProcessor>, uri: &Url, compile: F) -> Result<Arc<dyn Executable>, Error>
    where
        F: FnOnce() -> Result<Arc<dyn Executable>, Error>,
    {
        let slot = self.slot(processor, uri);
        if let Some(exec) = slot.get() {
            tracing::trace!(uri = %uri, "query cache hit");
            return Ok(Arc::clone(exec));
        }
        let exec = slot.get_or_try_init(|| {
            tracing::debug!(uri = %uri, "query cache miss");
            compile()
        })?;
        Ok(Arc::clone(exec))
    }

    /// Cached executable, if one has been compiled.
    pub fn get(&self, processor: &Arc<dyn QueryProcessor>, uri: &Url) -> Option<Arc<dyn Executable>> {
        let per_proc = self.by_processor.get(&ProcessorKey::of(processor))?.clone();
        let slot = per_proc.entries.get(uri)?.clone();
        slot.get().cloned()
    }

    /// Number of compiled executables across all processors.
    pub fn len(&self) -> usize {
        self.by_processor
            .iter()
            .map(|p| p.entries.iter().filter(|slot| slot.value().get().is_some()).count())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, processor: &Arc<dyn QueryProcessor>, uri: &Url) -> Slot {
        // Clone out of each map before touching the next one; dashmap refs hold shard locks.
        // Hits only take read locks; `entry` is reserved for the first request of a key.
        let key = ProcessorKey::of(processor);
        let per_proc = match self.by_processor.get(&key) {
            Some(existing) => Arc::clone(existing.value()),
            None => Arc::clone(
                self.by_processor
                    .entry(key)
                    .or_insert_with(|| {
                        Arc::new(ProcessorCache { _processor: Arc::clone(processor), entries: DashMap::new() })
                    })
                    .value(),
            ),
        };
        if let Some(slot) = per_proc.entries.get(uri) {
            return Arc::clone(slot.value());
        }
        Arc::clone(per_proc.entries.entry(uri.clone()).or_default().value())
    }
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("processors", &self.by_processor.len())
            .field("executables", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xqweb_processor_mock::MockProcessor;

    #[test]
    fn repeated_lookups_share_one_slot() {
        let cache = QueryCache::new();
        let processor: Arc<dyn QueryProcessor> = Arc::new(MockProcessor::new());
        let uri = Url::parse("file:///app/q.xq").unwrap();

        let first = cache.slot(&processor, &uri);
        let again = cache.slot(&processor, &uri);
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(cache.by_processor.len(), 1);
        assert_eq!(cache.by_processor.get(&ProcessorKey::of(&processor)).unwrap().entries.len(), 1);
    }

    #[test]
    fn reads_do_not_create_entries() {
        let cache = QueryCache::new();
        let processor: Arc<dyn QueryProcessor> = Arc::new(MockProcessor::new());
        let uri = Url::parse("file:///app/q.xq").unwrap();

        assert!(cache.get(&processor, &uri).is_none());
        assert_eq!(cache.by_processor.len(), 0);
        cache.slot(&processor, &uri);
        assert!(cache.get(&processor, &uri).is_none());
        assert!(cache.is_empty());
    }
}
