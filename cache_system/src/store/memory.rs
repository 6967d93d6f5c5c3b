//! In-process store with Redis list semantics

use super::CacheStore;
use crate::errors::CacheError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct MemoryState {
    values: HashMap<String, Vec<u8>>,
    lists: HashMap<String, VecDeque<String>>,
}

/// Store kept entirely in process memory
///
/// Shares nothing across processes, so the recency queue does not survive a
/// restart. Useful for tests and single-process callers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys, entries and lists together
    pub async fn key_count(&self) -> usize {
        let state = self.state.lock().await;
        state.values.len() + state.lists.len()
    }
}

/// Resolve a Redis-style inclusive range against a list of `len` elements
fn resolve_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

    if len == 0 || start > stop || start >= len {
        None
    } else {
        Some((start as usize, stop as usize))
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let state = self.state.lock().await;
        Ok(state.values.contains_key(key) || state.lists.contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let state = self.state.lock().await;
        if state.lists.contains_key(key) {
            return Err(CacheError::Store(format!(
                "WRONGTYPE key {} holds a list",
                key
            )));
        }
        Ok(state.values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        let mut state = self.state.lock().await;
        state.lists.remove(key);
        state.values.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<u64, CacheError> {
        let mut state = self.state.lock().await;
        let removed = state.values.remove(key).is_some() || state.lists.remove(key).is_some();
        Ok(u64::from(removed))
    }

    async fn list_length(&self, list: &str) -> Result<u64, CacheError> {
        let state = self.state.lock().await;
        Ok(state.lists.get(list).map_or(0, |l| l.len() as u64))
    }

    async fn list_push_front(&self, list: &str, value: &str) -> Result<u64, CacheError> {
        let mut state = self.state.lock().await;
        if state.values.contains_key(list) {
            return Err(CacheError::Store(format!(
                "WRONGTYPE key {} holds a value",
                list
            )));
        }
        let entries = state.lists.entry(list.to_string()).or_default();
        entries.push_front(value.to_string());
        Ok(entries.len() as u64)
    }

    async fn list_remove(&self, list: &str, value: &str, count: usize) -> Result<u64, CacheError> {
        let mut state = self.state.lock().await;
        let Some(entries) = state.lists.get_mut(list) else {
            return Ok(0);
        };

        let limit = if count == 0 { usize::MAX } else { count };
        let mut removed = 0usize;
        entries.retain(|entry| {
            if removed < limit && entry == value {
                removed += 1;
                false
            } else {
                true
            }
        });

        if entries.is_empty() {
            state.lists.remove(list);
        }
        Ok(removed as u64)
    }

    async fn list_pop_back(&self, list: &str) -> Result<Option<String>, CacheError> {
        let mut state = self.state.lock().await;
        let Some(entries) = state.lists.get_mut(list) else {
            return Ok(None);
        };

        let popped = entries.pop_back();
        if entries.is_empty() {
            state.lists.remove(list);
        }
        Ok(popped)
    }

    async fn list_range(
        &self,
        list: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, CacheError> {
        let state = self.state.lock().await;
        let Some(entries) = state.lists.get(list) else {
            return Ok(Vec::new());
        };

        Ok(match resolve_range(entries.len(), start, stop) {
            Some((start, stop)) => entries.range(start..=stop).cloned().collect(),
            None => Vec::new(),
        })
    }

    async fn flush_namespace(&self) -> Result<(), CacheError> {
        let mut state = self.state.lock().await;
        state.values.clear();
        state.lists.clear();
        Ok(())
    }
}
