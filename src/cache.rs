//! In-process cache for public read queries.
//!
//! Entries are keyed by the resource kind and the normalized filter of
//! the query that produced them. There is no expiry: every mutation
//! names the resource kinds it touched and those entries are dropped.
//! The cache holds at most [`MAX_ENTRIES`] results; the oldest go first.
//!
//! Each resource carries a generation that invalidation bumps. A reader
//! takes the generation before querying the database and hands it back to
//! [`store`], so a result computed before a mutation is never kept after it.

use std::collections::{HashMap, VecDeque};
use std::sync::{RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheResource {
    Posts,
    Tags,
    Comments,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub resource: CacheResource,
    pub filter: String,
}

impl CacheKey {
    /// Builds a key from `(name, value)` filter pairs; `None` values are
    /// skipped and the remaining pairs are sorted so argument order
    /// does not matter.
    pub fn new(resource: CacheResource, params: &[(&str, Option<String>)]) -> Self {
        let mut parts: Vec<String> = params
            .iter()
            .filter_map(|(name, value)| value.as_ref().map(|v| format!("{}={}", name, v)))
            .collect();
        parts.sort();
        CacheKey { resource, filter: parts.join("&") }
    }
}

pub const MAX_ENTRIES: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

#[derive(Debug)]
pub struct QueryCache {
    entries: HashMap<CacheKey, Value>,
    // Insertion order, oldest first.
    order: VecDeque<CacheKey>,
    generations: HashMap<CacheResource, u64>,
    capacity: usize,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::with_capacity(MAX_ENTRIES)
    }
}

impl QueryCache {
    pub fn with_capacity(capacity: usize) -> Self {
        QueryCache {
            entries: HashMap::new(),
            order: VecDeque::new(),
            generations: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn generation(&self, resource: CacheResource) -> Generation {
        Generation(self.generations.get(&resource).copied().unwrap_or(0))
    }

    /// Stores `value` unless `resource` was invalidated since `generation`
    /// was taken. Returns whether the value was kept.
    pub fn insert(&mut self, key: CacheKey, value: Value, generation: Generation) -> bool {
        if self.generation(key.resource) != generation {
            return false;
        }
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = value;
            return true;
        }
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
        true
    }

    /// Drops every entry for `resource`, whatever its filter, and moves the
    /// resource to a new generation.
    pub fn invalidate(&mut self, resource: CacheResource) -> usize {
        *self.generations.entry(resource).or_insert(0) += 1;
        let before = self.entries.len();
        self.entries.retain(|key, _| key.resource != resource);
        self.order.retain(|key| key.resource != resource);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read_cache(state: &AppState) -> RwLockReadGuard<'_, QueryCache> {
    state.query_cache.read().unwrap_or_else(|poisoned| {
        log::error!("RwLock for query_cache was poisoned! Using stale data.");
        poisoned.into_inner()
    })
}

fn write_cache(state: &AppState) -> RwLockWriteGuard<'_, QueryCache> {
    state.query_cache.write().unwrap_or_else(|poisoned| {
        log::error!("RwLock for query_cache was poisoned during write! Recovering lock.");
        poisoned.into_inner()
    })
}

pub fn cached(state: &AppState, key: &CacheKey) -> Option<Value> {
    read_cache(state).get(key).cloned()
}

/// Take this before reading the database for a value that will be stored.
pub fn generation(state: &AppState, resource: CacheResource) -> Generation {
    read_cache(state).generation(resource)
}

pub fn store(state: &AppState, key: CacheKey, value: Value, generation: Generation) {
    let resource = key.resource;
    if !write_cache(state).insert(key, value, generation) {
        log::debug!("Discarded a {:?} result computed before the last invalidation.", resource);
    }
}

/// Called after every successful mutation with the resources it changed.
pub fn invalidate(state: &AppState, resources: &[CacheResource]) {
    let mut cache = write_cache(state);
    for resource in resources {
        let dropped = cache.invalidate(*resource);
        if dropped > 0 {
            log::debug!("Invalidated {} cached {:?} queries.", dropped, resource);
        }
    }
}
