//! Cache manager implementation
//!
//! This module provides the main CacheManager struct: it fingerprints calls,
//! serves hits from the store, records misses, and keeps the recency queue
//! within capacity.
//!
//! Every step is a separate store round-trip and nothing is transactional.
//! Concurrent clients of the same store may both compute and write the same
//! key (last write wins), may briefly leave a key queued twice, or may evict
//! an entry another client is rewriting. Each of these costs a later miss,
//! never a wrong result.

use crate::args::CallArgs;
use crate::codec;
use crate::errors::{CacheError, CallError};
use crate::fingerprint::Fingerprinter;
use crate::recency::{RECENCY_QUEUE_KEY, RecencyQueue};
use crate::store::CacheStore;
use crate::wrapper::Cached;
use config::CacheConfig;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::{TypeId, type_name};
use std::collections::hash_map::DefaultHasher;
use std::fmt::Debug;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Store-backed memoizing cache with LRU eviction
pub struct CacheManager<S: CacheStore> {
    store: Arc<S>,
    config: Arc<CacheConfig>,
    fingerprinter: Fingerprinter,
    queue: RecencyQueue<S>,
}

impl<S: CacheStore> Clone for CacheManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
            fingerprinter: self.fingerprinter.clone(),
            queue: self.queue.clone(),
        }
    }
}

impl<S: CacheStore> Debug for CacheManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("config", &self.config)
            .field("queue", &RECENCY_QUEUE_KEY)
            .finish()
    }
}

impl<S: CacheStore> CacheManager<S> {
    /// Create a new cache manager over `store`
    ///
    /// With `clear_on_start` the whole store namespace is flushed. Otherwise a
    /// queue left by an earlier run is trimmed to `max_size` before any call
    /// is served.
    pub async fn new(store: Arc<S>, config: CacheConfig) -> Result<Self, CacheError> {
        config.validate()?;

        let queue = RecencyQueue::new(Arc::clone(&store), config.max_size);

        if config.clear_on_start {
            store.flush_namespace().await?;
            tracing::info!(prefix = %config.key_prefix, "flushed cache store on start");
        } else if store.exists(RECENCY_QUEUE_KEY).await? {
            let evicted = queue.evict_if_over_capacity().await?;
            if !evicted.is_empty() {
                tracing::info!(
                    evicted = evicted.len(),
                    max_size = config.max_size,
                    "trimmed recency queue left by a previous run"
                );
            }
        }

        Ok(Self {
            fingerprinter: Fingerprinter::new(config.key_prefix.clone()),
            store,
            config: Arc::new(config),
            queue,
        })
    }

    /// Wrap a function, identified by its Rust type name
    ///
    /// For function items the type name is the full path (`my_crate::fib`).
    /// Closures in one function share a type name, so theirs gets a suffix
    /// derived from the closure's own type. That suffix is only stable for a
    /// given build; use [`CacheManager::wrap_named`] when entries must stay
    /// valid across rebuilds.
    pub fn wrap<F: 'static>(&self, computation: F) -> Cached<S, F> {
        self.wrap_named(type_identity::<F>(), computation)
    }

    /// Wrap a computation under an explicit identity
    pub fn wrap_named<F>(&self, identity: impl Into<String>, computation: F) -> Cached<S, F> {
        Cached::new(self.clone(), identity.into(), computation)
    }

    /// Store key a call of `identity` with `args` maps to
    pub fn fingerprint<A: CallArgs + ?Sized>(
        &self,
        identity: &str,
        args: &A,
    ) -> Result<String, CacheError> {
        self.fingerprinter.fingerprint(identity, &args.to_args())
    }

    /// Serve a call from the cache, computing and recording it on a miss
    ///
    /// Errors from `computation` come back untouched as
    /// [`CallError::Computation`] and are never cached.
    pub async fn call_cached<A, T, E, F, Fut>(
        &self,
        identity: &str,
        args: A,
        computation: F,
    ) -> Result<T, CallError<E>>
    where
        A: CallArgs,
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize + DeserializeOwned,
    {
        let key = self.fingerprint(identity, &args)?;

        match self.lookup::<T>(&key).await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(err) if self.degrades_on(&err) => {
                tracing::warn!(key = %key, error = %err, "cache lookup failed, computing uncached");
                return computation(args).await.map_err(CallError::Computation);
            }
            Err(err) => return Err(err.into()),
        }

        let value = computation(args).await.map_err(CallError::Computation)?;

        match self.record(&key, &value).await {
            Ok(()) => {}
            Err(err) if self.degrades_on(&err) => {
                tracing::warn!(key = %key, error = %err, "failed to record result, returning it uncached");
            }
            Err(err) => return Err(err.into()),
        }

        Ok(value)
    }

    /// Read and promote an entry; `None` means the call must be computed
    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        if !self.store.exists(key).await? {
            crate::debug_log!("cache miss for {}", key);
            return Ok(None);
        }

        let Some(blob) = self.store.get(key).await? else {
            tracing::warn!(key = %key, "entry vanished between existence check and read, treating as miss");
            return Ok(None);
        };

        let value = codec::decode(key, &blob)?;

        if !self.queue.promote(key).await? {
            self.queue.evict_if_over_capacity().await?;
        }
        crate::debug_log!("cache hit for {}", key);

        Ok(Some(value))
    }

    /// Store a freshly computed result and settle capacity
    async fn record<T: Serialize + DeserializeOwned>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), CacheError> {
        let blob = match codec::encode_exact(value) {
            Ok(blob) => blob,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "result cannot be stored faithfully, returning it uncached");
                return Ok(());
            }
        };

        self.store.set(key, &blob).await?;
        self.queue.insert(key).await?;
        self.queue.evict_if_over_capacity().await?;
        Ok(())
    }

    fn degrades_on(&self, err: &CacheError) -> bool {
        self.config.degrade_on_store_error && err.is_store_failure()
    }

    /// Remove the cached result of one call; returns whether it was present
    pub async fn invalidate<A: CallArgs + ?Sized>(
        &self,
        identity: &str,
        args: &A,
    ) -> Result<bool, CacheError> {
        let key = self.fingerprint(identity, args)?;
        self.queue.remove(&key).await?;
        let deleted = self.store.delete(&key).await?;
        Ok(deleted > 0)
    }

    /// Drop every tracked entry; returns how many keys were drained
    pub async fn clear(&self) -> Result<usize, CacheError> {
        self.queue.drain().await
    }

    /// Number of keys in the recency queue
    pub async fn len(&self) -> Result<usize, CacheError> {
        self.queue.len().await
    }

    pub async fn is_empty(&self) -> Result<bool, CacheError> {
        self.queue.is_empty().await
    }

    /// Recency queue contents, most recently used first
    pub async fn recency_snapshot(&self) -> Result<Vec<String>, CacheError> {
        self.queue.snapshot().await
    }

    /// Get current configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

/// Identity of a wrapped computation derived from its type
fn type_identity<F: 'static>() -> String {
    let name = type_name::<F>();
    if !name.contains("{{closure}}") {
        return name.to_string();
    }

    let mut hasher = DefaultHasher::new();
    TypeId::of::<F>().hash(&mut hasher);
    format!("{}#{:016x}", name, hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Args;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use serde::{Deserialize, Serializer};
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn manager(max_size: usize) -> (Arc<MemoryStore>, CacheManager<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let config = CacheConfig::new(max_size, "test".to_string(), false);
        let manager = CacheManager::new(Arc::clone(&store), config).await.unwrap();
        (store, manager)
    }

    async fn square(manager: &CacheManager<MemoryStore>, calls: &AtomicUsize, n: i64) -> i64 {
        manager
            .call_cached("A", (n,), |(n,): (i64,)| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(n * n)
            })
            .await
            .unwrap()
    }

    fn key(manager: &CacheManager<MemoryStore>, n: i64) -> String {
        manager.fingerprint("A", &(n,)).unwrap()
    }

    #[tokio::test]
    async fn test_second_call_served_from_store() {
        let (_, manager) = manager(8).await;
        let calls = AtomicUsize::new(0);

        assert_eq!(square(&manager, &calls, 12).await, 144);
        assert_eq!(square(&manager, &calls, 12).await, 144);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(manager.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_eviction_drops_least_recently_used() {
        let (store, manager) = manager(2).await;
        let calls = AtomicUsize::new(0);

        for n in 1..=3 {
            square(&manager, &calls, n).await;
        }

        assert_eq!(
            manager.recency_snapshot().await.unwrap(),
            vec![key(&manager, 3), key(&manager, 2)]
        );
        assert!(!store.exists(&key(&manager, 1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_hit_promotes_key_past_eviction() {
        let (store, manager) = manager(2).await;
        let calls = AtomicUsize::new(0);

        square(&manager, &calls, 1).await;
        square(&manager, &calls, 2).await;
        square(&manager, &calls, 1).await;
        square(&manager, &calls, 3).await;

        assert_eq!(
            manager.recency_snapshot().await.unwrap(),
            vec![key(&manager, 3), key(&manager, 1)]
        );
        assert!(!store.exists(&key(&manager, 2)).await.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_capacity_holds_under_pressure() {
        let (_, manager) = manager(5).await;
        let calls = AtomicUsize::new(0);

        for n in 0..50 {
            square(&manager, &calls, n % 17).await;
            assert!(manager.len().await.unwrap() <= 5);
        }
    }

    #[tokio::test]
    async fn test_unhashable_arguments_write_nothing() {
        let (store, manager) = manager(4).await;
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        let result = manager
            .call_cached("sum", (vec![1, 2, 3],), |(items,): (Vec<i32>,)| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(items.iter().sum::<i32>())
            })
            .await;

        assert!(result.unwrap_err().is_unhashable());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.key_count().await, 0);
    }

    #[tokio::test]
    async fn test_computation_error_passes_through_uncached() {
        let (store, manager) = manager(4).await;

        let result = manager
            .call_cached("parse", ("x1",), |(text,): (&str,)| async move {
                text.parse::<i32>()
            })
            .await;

        match result {
            Err(CallError::Computation(err)) => {
                assert_eq!(err.to_string(), "invalid digit found in string")
            }
            other => panic!("Expected computation error, got {:?}", other),
        }
        assert_eq!(store.key_count().await, 0);
    }

    /// Result type whose serializer always refuses
    #[derive(Debug, PartialEq)]
    struct Opaque(i32);

    impl Serialize for Opaque {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("opaque handle"))
        }
    }

    impl<'de> Deserialize<'de> for Opaque {
        fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            i32::deserialize(deserializer).map(Opaque)
        }
    }

    #[tokio::test]
    async fn test_unserializable_result_returned_uncached() {
        let (store, manager) = manager(4).await;

        let result = manager
            .call_cached("handle", (2,), |(n,): (i32,)| async move {
                Ok::<_, Infallible>(Opaque(n))
            })
            .await
            .unwrap();

        assert_eq!(result, Opaque(2));
        assert_eq!(store.key_count().await, 0);
    }

    #[tokio::test]
    async fn test_floats_and_nested_values_survive_a_hit() {
        let (_, manager) = manager(8).await;
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        let stats = |(n,): (i32,)| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            let table = HashMap::from([((n, n), vec![Some(n), None])]);
            Ok::<_, Infallible>((f64::NAN, f64::INFINITY, f64::NEG_INFINITY, table))
        };

        manager.call_cached("stats", (3,), stats).await.unwrap();
        let (nan, inf, neg_inf, table) = manager.call_cached("stats", (3,), stats).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(nan.is_nan());
        assert_eq!(inf, f64::INFINITY);
        assert_eq!(neg_inf, f64::NEG_INFINITY);
        assert_eq!(table, HashMap::from([((3, 3), vec![Some(3), None])]));
    }

    #[tokio::test]
    async fn test_collapsing_result_returned_uncached() {
        let (store, manager) = manager(8).await;
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        let lookup = |(_,): (i32,)| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(Some(None::<i32>))
        };

        assert_eq!(manager.call_cached("lookup", (1,), lookup).await.unwrap(), Some(None));
        assert_eq!(manager.call_cached("lookup", (1,), lookup).await.unwrap(), Some(None));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.key_count().await, 0);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_an_error() {
        let (store, manager) = manager(4).await;
        let key = key(&manager, 5);
        // 0xc1 is never used in MessagePack
        store.set(&key, &[0xc1]).await.unwrap();

        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let result = manager
            .call_cached("A", (5i64,), |(n,): (i64,)| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(n)
            })
            .await;

        assert!(matches!(
            result,
            Err(CallError::Cache(CacheError::CorruptEntry { .. }))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_entry_lost_out_of_band_is_recomputed() {
        let (store, manager) = manager(4).await;
        let calls = AtomicUsize::new(0);

        square(&manager, &calls, 7).await;
        square(&manager, &calls, 8).await;
        store.delete(&key(&manager, 7)).await.unwrap();

        assert_eq!(square(&manager, &calls, 7).await, 49);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            manager.recency_snapshot().await.unwrap(),
            vec![key(&manager, 7), key(&manager, 8)]
        );
    }

    #[tokio::test]
    async fn test_hit_on_unqueued_entry_settles_capacity() {
        let (store, manager) = manager(2).await;
        let calls = AtomicUsize::new(0);

        square(&manager, &calls, 1).await;
        square(&manager, &calls, 2).await;
        // Entry written by a client whose queue update has not landed yet
        let blob = codec::encode(&81i64).unwrap();
        store.set(&key(&manager, 9), &blob).await.unwrap();

        assert_eq!(square(&manager, &calls, 9).await, 81);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            manager.recency_snapshot().await.unwrap(),
            vec![key(&manager, 9), key(&manager, 2)]
        );
    }

    #[tokio::test]
    async fn test_keyword_arguments_share_entry_regardless_of_order() {
        let (_, manager) = manager(4).await;
        let calls = AtomicUsize::new(0);
        let compute = |args: Args| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                let base = args.get_kwarg("base").and_then(|v| v.as_i64()).unwrap_or(0);
                let exp = args.get_kwarg("exp").and_then(|v| v.as_u64()).unwrap_or(1);
                Ok::<_, Infallible>(base.pow(exp as u32))
            }
        };

        let a = manager
            .call_cached("pow", Args::new().kwarg("base", &2).kwarg("exp", &10u32), compute)
            .await
            .unwrap();
        let b = manager
            .call_cached("pow", Args::new().kwarg("exp", &10u32).kwarg("base", &2), compute)
            .await
            .unwrap();

        assert_eq!(a, 1024);
        assert_eq!(b, 1024);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_closures_in_one_function_get_distinct_identities() {
        let (_, manager) = manager(8).await;

        let double = manager.wrap(|(n,): (i64,)| async move { Ok::<_, Infallible>(n * 2) });
        let square = manager.wrap(|(n,): (i64,)| async move { Ok::<_, Infallible>(n * n) });

        assert_ne!(double.identity(), square.identity());
        assert_eq!(double.call((5i64,)).await.unwrap(), 10);
        assert_eq!(square.call((5i64,)).await.unwrap(), 25);
        assert_eq!(double.call((5i64,)).await.unwrap(), 10);
        assert_eq!(manager.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_startup_trims_existing_queue() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..5 {
            let key = format!("old:{}", i);
            store.set(&key, b"1").await.unwrap();
            store.list_push_front(RECENCY_QUEUE_KEY, &key).await.unwrap();
        }

        let config = CacheConfig::new(3, "test".to_string(), false);
        let manager = CacheManager::new(Arc::clone(&store), config).await.unwrap();

        assert_eq!(
            manager.recency_snapshot().await.unwrap(),
            vec!["old:4", "old:3", "old:2"]
        );
        assert!(!store.exists("old:0").await.unwrap());
        assert!(!store.exists("old:1").await.unwrap());
        assert!(store.exists("old:2").await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_on_start_flushes_namespace() {
        let store = Arc::new(MemoryStore::new());
        let config = CacheConfig::new(10, "test".to_string(), false);
        let first = CacheManager::new(Arc::clone(&store), config.clone()).await.unwrap();
        let calls = AtomicUsize::new(0);
        for n in 0..5 {
            square(&first, &calls, n).await;
        }
        assert_eq!(first.len().await.unwrap(), 5);

        let config = CacheConfig::new(10, "test".to_string(), true);
        let second = CacheManager::new(Arc::clone(&store), config).await.unwrap();

        assert_eq!(second.len().await.unwrap(), 0);
        assert_eq!(store.key_count().await, 0);
        square(&second, &calls, 0).await;
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let (store, manager) = manager(8).await;
        let calls = AtomicUsize::new(0);
        for n in 0..3 {
            square(&manager, &calls, n).await;
        }

        assert!(manager.invalidate("A", &(1i64,)).await.unwrap());
        assert!(!manager.invalidate("A", &(1i64,)).await.unwrap());
        assert_eq!(manager.len().await.unwrap(), 2);

        assert_eq!(manager.clear().await.unwrap(), 2);
        assert!(manager.is_empty().await.unwrap());
        assert_eq!(store.key_count().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let store = Arc::new(MemoryStore::new());
        let result = CacheManager::new(store, CacheConfig::new(0, "test".to_string(), false)).await;
        assert!(matches!(result, Err(CacheError::Config(_))));
    }

    /// Store whose every operation fails, standing in for an unreachable server
    struct UnreachableStore;

    #[async_trait]
    impl CacheStore for UnreachableStore {
        async fn exists(&self, _key: &str) -> Result<bool, CacheError> {
            Err(CacheError::Store("connection refused".to_string()))
        }
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Err(CacheError::Store("connection refused".to_string()))
        }
        async fn set(&self, _key: &str, _value: &[u8]) -> Result<(), CacheError> {
            Err(CacheError::Store("connection refused".to_string()))
        }
        async fn delete(&self, _key: &str) -> Result<u64, CacheError> {
            Err(CacheError::Store("connection refused".to_string()))
        }
        async fn list_length(&self, _list: &str) -> Result<u64, CacheError> {
            Err(CacheError::Store("connection refused".to_string()))
        }
        async fn list_push_front(&self, _list: &str, _value: &str) -> Result<u64, CacheError> {
            Err(CacheError::Store("connection refused".to_string()))
        }
        async fn list_remove(&self, _list: &str, _value: &str, _count: usize) -> Result<u64, CacheError> {
            Err(CacheError::Store("connection refused".to_string()))
        }
        async fn list_pop_back(&self, _list: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Store("connection refused".to_string()))
        }
        async fn list_range(&self, _list: &str, _start: isize, _stop: isize) -> Result<Vec<String>, CacheError> {
            Err(CacheError::Store("connection refused".to_string()))
        }
        async fn flush_namespace(&self) -> Result<(), CacheError> {
            Err(CacheError::Store("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let result = CacheManager::new(
            Arc::new(UnreachableStore),
            CacheConfig::new(4, "test".to_string(), false),
        )
        .await;

        assert!(result.unwrap_err().is_store_failure());
    }

    #[tokio::test]
    async fn test_graceful_degradation_computes_directly() {
        // Build against a healthy store, then swap in the unreachable one
        let (_, healthy) = manager(4).await;
        let manager = CacheManager {
            store: Arc::new(UnreachableStore),
            config: Arc::new(healthy.config().clone().with_graceful_degradation()),
            fingerprinter: healthy.fingerprinter.clone(),
            queue: RecencyQueue::new(Arc::new(UnreachableStore), 4),
        };

        let value = manager
            .call_cached("A", (6i64,), |(n,): (i64,)| async move { Ok::<_, Infallible>(n * n) })
            .await
            .unwrap();
        assert_eq!(value, 36);

        let strict = CacheManager {
            config: Arc::new(healthy.config().clone()),
            ..manager
        };
        let result = strict
            .call_cached("A", (6i64,), |(n,): (i64,)| async move { Ok::<_, Infallible>(n * n) })
            .await;
        assert!(matches!(result, Err(CallError::Cache(CacheError::Store(_)))));
    }
}
