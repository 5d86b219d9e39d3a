//! Memoization primitives - compute once, cache forever
//!
//! - `AsyncLazy<T>`: a single value initialised by the first caller
//! - `KeyedCache<K, V>`: one lazily initialised value per key
//!
//! Concurrent callers of an uninitialised cell wait on the same initialiser.
//! A failed initialisation leaves the cell empty, so the next caller retries.

use crate::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// One-shot asynchronously initialised value.
#[derive(Debug)]
pub struct AsyncLazy<T> {
    cell: OnceCell<T>,
}

impl<T> AsyncLazy<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Get the value, running `init` if nobody has successfully done so yet
    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<&T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.cell.get_or_try_init(init).await
    }

    /// The value, if already initialised
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

impl<T> Default for AsyncLazy<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-key memoization of asynchronously computed values.
#[derive(Debug)]
pub struct KeyedCache<K, V> {
    entries: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> KeyedCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Get the value for `key`, running `init` at most once per key on success
    pub async fn get_or_try_init<F, Fut>(&self, key: K, init: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        // The lock only guards the map; initialisation runs outside it.
        let cell = self.entries.lock().entry(key).or_default().clone();
        cell.get_or_try_init(init).await.cloned()
    }

    /// Number of keys with a successfully computed value
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every cached value
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl<K, V> Default for KeyedCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_async_lazy_runs_once() {
        let lazy = AsyncLazy::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = lazy
                .get_or_try_init(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                })
                .await
                .unwrap();
            assert_eq!(*value, 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(lazy.is_initialized());
    }

    #[tokio::test]
    async fn test_async_lazy_retries_after_failure() {
        let lazy: AsyncLazy<u32> = AsyncLazy::new();

        let failed = lazy
            .get_or_try_init(|| async { Err(Error::Catalog("boom".to_string())) })
            .await;
        assert!(failed.is_err());
        assert!(lazy.get().is_none());

        let value = lazy.get_or_try_init(|| async { Ok(7) }).await.unwrap();
        assert_eq!(*value, 7);
    }

    #[tokio::test]
    async fn test_keyed_cache_memoizes_per_key() {
        let cache: KeyedCache<String, Option<u32>> = KeyedCache::new();
        let calls = AtomicUsize::new(0);

        for key in ["a", "b", "a", "b", "a"] {
            let value = cache
                .get_or_try_init(key.to_string(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(if key == "a" { Some(1) } else { None })
                })
                .await
                .unwrap();
            assert_eq!(value, if key == "a" { Some(1) } else { None });
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_keyed_cache_concurrent_callers_share_init() {
        let cache: Arc<KeyedCache<u32, u32>> = Arc::new(KeyedCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_try_init(1, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        Ok(99)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 99);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
