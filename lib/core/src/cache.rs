// Read-through cache for query responses
use std::collections::VecDeque;
use ahash::AHashMap;
use parking_lot::Mutex;
use tracing::{debug, warn};
use crate::Result;

/// Canonical cache key: operation name and arguments joined by `|`
pub fn cache_key<A: AsRef<str>>(op: &str, args: &[A]) -> String {
    let mut key = String::from(op);
    for arg in args {
        key.push('|');
        key.push_str(arg.as_ref());
    }
    key
}

/// Storage for serialized responses.
///
/// Errors mean the cache is unusable for this call; callers compute directly instead.
pub trait QueryCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&self, key: &str, value: String) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// A cache that never stores anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl QueryCache for NoCache {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn put(&self, _key: &str, _value: String) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }
}

struct Entries {
    values: AHashMap<String, String>,
    order: VecDeque<String>,
}

/// Bounded in-process cache, oldest insertion evicted first
pub struct MemoryCache {
    capacity: usize,
    entries: Mutex<Entries>,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(Entries {
                values: AHashMap::with_capacity(capacity.min(4096)),
                order: VecDeque::new(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl QueryCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().values.get(key).cloned())
    }

    fn put(&self, key: &str, value: String) -> Result<()> {
        if self.capacity == 0 {
            return Ok(());
        }
        let mut entries = self.entries.lock();
        if entries.values.insert(key.to_string(), value).is_none() {
            entries.order.push_back(key.to_string());
        }
        while entries.values.len() > self.capacity {
            match entries.order.pop_front() {
                Some(oldest) => {
                    entries.values.remove(&oldest);
                }
                None => break,
            }
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self.entries.lock();
        entries.values.clear();
        entries.order.clear();
        Ok(())
    }
}

/// Return the cached value for `key`, or compute, store and return it.
///
/// Cache failures are logged and never reach the caller.
pub fn read_through<F>(cache: &dyn QueryCache, key: &str, compute: F) -> Result<String>
where
    F: FnOnce() -> Result<String>,
{
    match cache.get(key) {
        Ok(Some(hit)) => {
            debug!("Cache hit: {}", key);
            return Ok(hit);
        }
        Ok(None) => {}
        Err(e) => warn!("Cache read failed for {}: {}", key, e),
    }

    let value = compute()?;
    if let Err(e) = cache.put(key, value.clone()) {
        warn!("Cache write failed for {}: {}", key, e);
    }
    Ok(value)
}
