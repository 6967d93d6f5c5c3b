//! Computation wrapper
//!
//! [`Cached`] pairs a computation with a [`CacheManager`] and an identity,
//! turning every call into a cache-aware call with the same arguments and
//! result type.

use crate::args::CallArgs;
use crate::errors::{CacheError, CallError};
use crate::manager::CacheManager;
use crate::store::CacheStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::future::Future;

/// A computation whose results are memoized in the store
pub struct Cached<S: CacheStore, F> {
    manager: CacheManager<S>,
    identity: String,
    computation: F,
}

impl<S: CacheStore, F: Clone> Clone for Cached<S, F> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            identity: self.identity.clone(),
            computation: self.computation.clone(),
        }
    }
}

impl<S: CacheStore, F> Debug for Cached<S, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cached")
            .field("identity", &self.identity)
            .finish()
    }
}

impl<S: CacheStore, F> Cached<S, F> {
    pub(crate) fn new(manager: CacheManager<S>, identity: String, computation: F) -> Self {
        Self {
            manager,
            identity,
            computation,
        }
    }

    /// Call the computation through the cache
    pub async fn call<A, T, E, Fut>(&self, args: A) -> Result<T, CallError<E>>
    where
        A: CallArgs,
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize + DeserializeOwned,
    {
        self.manager
            .call_cached(&self.identity, args, &self.computation)
            .await
    }

    /// Drop the cached result for `args`
    pub async fn invalidate<A: CallArgs + ?Sized>(&self, args: &A) -> Result<bool, CacheError> {
        self.manager.invalidate(&self.identity, args).await
    }

    /// Store key a call with `args` maps to
    pub fn fingerprint<A: CallArgs + ?Sized>(&self, args: &A) -> Result<String, CacheError> {
        self.manager.fingerprint(&self.identity, args)
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn manager(&self) -> &CacheManager<S> {
        &self.manager
    }
}
