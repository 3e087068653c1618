//! Process-wide adapter cache with idle-timeout eviction
//! (`spec.md` §4.6).
//!
//! Adapters are expensive to construct (they represent a loaded model)
//! so callers share one instance per `(engine, model_id, device,
//! compute_type)` key until it goes idle. Eviction is swept lazily on
//! each access rather than via a background task — cheap, and the
//! worst case is one extra idle entry living until the next lookup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

struct Entry<T: ?Sized> {
    value: Arc<T>,
    last_access: Instant,
}

/// Caches `Arc<T>` by key, evicting entries unused for longer than
/// `idle_timeout`. `T` may be a trait object (`AdapterCache<dyn
/// SttAdapter>`) as well as a concrete type.
pub struct AdapterCache<T: ?Sized> {
    entries: Mutex<HashMap<String, Entry<T>>>,
    idle_timeout: Duration,
}

impl<T: ?Sized> AdapterCache<T> {
    #[must_use]
    pub fn new(idle_timeout: Duration) -> Self {
        Self { entries: Mutex::new(HashMap::new()), idle_timeout }
    }

    /// Default idle timeout per `spec.md` §4.6: 600 seconds.
    #[must_use]
    pub fn with_default_timeout() -> Self {
        Self::new(Duration::from_secs(600))
    }

    /// Return the cached adapter for `key`, constructing it via `make`
    /// if absent or expired. Resets the key's idle timer on every call.
    pub async fn get_or_insert_with<F>(&self, key: &str, make: F) -> Arc<T>
    where
        F: FnOnce() -> Arc<T>,
    {
        let mut entries = self.entries.lock().await;
        self.sweep(&mut entries);

        if let Some(entry) = entries.get_mut(key) {
            entry.last_access = Instant::now();
            return entry.value.clone();
        }

        let value = make();
        entries.insert(
            key.to_string(),
            Entry { value: value.clone(), last_access: Instant::now() },
        );
        value
    }

    fn sweep(&self, entries: &mut HashMap<String, Entry<T>>) {
        let timeout = self.idle_timeout;
        entries.retain(|_, entry| entry.last_access.elapsed() < timeout);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn reuses_cached_value_for_same_key() {
        let cache: AdapterCache<AtomicU32> = AdapterCache::new(Duration::from_secs(60));
        let builds = Arc::new(AtomicU32::new(0));

        for _ in 0..3 {
            let builds = builds.clone();
            cache
                .get_or_insert_with("stt:whisper-base:cpu:fp32", move || {
                    builds.fetch_add(1, Ordering::SeqCst);
                    Arc::new(AtomicU32::new(0))
                })
                .await;
        }

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn expired_entry_is_rebuilt() {
        let cache: AdapterCache<AtomicU32> = AdapterCache::new(Duration::from_millis(1));
        cache.get_or_insert_with("k", || Arc::new(AtomicU32::new(1))).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let builds = Arc::new(AtomicU32::new(0));
        let builds2 = builds.clone();
        cache
            .get_or_insert_with("k", move || {
                builds2.fetch_add(1, Ordering::SeqCst);
                Arc::new(AtomicU32::new(2))
            })
            .await;
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }
}
