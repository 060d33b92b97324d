//! Memory Cache Module
//!
//! In-process cache backend combining HashMap storage with LRU eviction and
//! TTL expiration. Used for development and as the test double for Redis.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::backend::{CacheBackend, CacheCommand, Pipeline};
use crate::cache::entry::{CacheEntry, CacheValue};
use crate::cache::{MAX_KEY_LENGTH, MAX_VALUE_SIZE};
use crate::error::CacheError;

/// Default capacity when none is configured
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

// == Memory Cache ==
/// Thread-safe in-memory cache backend.
#[derive(Debug)]
pub struct MemoryCache {
    state: RwLock<MemoryState>,
}

#[derive(Debug)]
struct MemoryState {
    entries: HashMap<String, CacheEntry>,
    max_entries: usize,
    /// Monotonic access counter; lowest `last_access` is evicted first
    clock: u64,
    evictions: u64,
}

impl MemoryState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Returns the live entry for `key`, dropping it if expired and marking it used.
    fn live_mut(&mut self, key: &str) -> Option<&mut CacheEntry> {
        if self.entries.get(key).is_some_and(CacheEntry::is_expired) {
            self.entries.remove(key);
            return None;
        }
        let tick = self.tick();
        let entry = self.entries.get_mut(key)?;
        entry.last_access = tick;
        Some(entry)
    }

    fn purge_expired(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before - self.entries.len()
    }

    fn evict_to_capacity(&mut self) {
        if self.entries.len() <= self.max_entries {
            return;
        }
        self.purge_expired();

        while self.entries.len() > self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(key, _)| key.clone());

            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                    self.evictions += 1;
                }
                None => break,
            }
        }
    }
}

impl MemoryCache {
    // == Constructor ==
    /// Creates a new MemoryCache holding at most `max_entries` keys.
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: RwLock::new(MemoryState {
                entries: HashMap::new(),
                max_entries: max_entries.max(1),
                clock: 0,
                evictions: 0,
            }),
        }
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were dropped.
    pub async fn cleanup_expired(&self) -> usize {
        self.state.write().await.purge_expired()
    }

    /// Number of keys evicted to respect the capacity limit.
    pub async fn evictions(&self) -> u64 {
        self.state.read().await.evictions
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

fn wrong_type(key: &str, value: &CacheValue) -> CacheError {
    CacheError::WrongType(format!("'{}' holds a {}", key, value.type_name()))
}

fn validate_command(command: &CacheCommand) -> Result<(), CacheError> {
    let key = command.key();
    if key.is_empty() || key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key must be between 1 and {} bytes",
            MAX_KEY_LENGTH
        )));
    }

    let oversized = match command {
        CacheCommand::Set { value, .. }
        | CacheCommand::ListPush { value, .. }
        | CacheCommand::ListRemove { value, .. } => value.len() > MAX_VALUE_SIZE,
        CacheCommand::HashSet { fields, .. } => fields.iter().any(|(_, v)| v.len() > MAX_VALUE_SIZE),
        _ => false,
    };
    if oversized {
        return Err(CacheError::InvalidRequest(format!(
            "Value exceeds maximum size of {} bytes",
            MAX_VALUE_SIZE
        )));
    }

    Ok(())
}

/// Resolves a Redis-style inclusive range against a list length.
fn resolve_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

    if start >= len || start > stop {
        None
    } else {
        Some((start as usize, stop as usize))
    }
}

/// Applies one command to a staged slot (`None` = key absent).
fn apply(slot: &mut Option<CacheEntry>, command: CacheCommand) -> Result<(), CacheError> {
    match command {
        CacheCommand::Set { value, ttl, .. } => {
            *slot = Some(CacheEntry::new(CacheValue::Str(value), Some(ttl)));
        }
        CacheCommand::Delete { .. } => {
            *slot = None;
        }
        CacheCommand::HashSet { key, fields } => {
            let entry =
                slot.get_or_insert_with(|| CacheEntry::new(CacheValue::Hash(HashMap::new()), None));
            match &mut entry.value {
                CacheValue::Hash(hash) => hash.extend(fields),
                other => return Err(wrong_type(&key, other)),
            }
        }
        CacheCommand::ListPush { key, value } => {
            let entry =
                slot.get_or_insert_with(|| CacheEntry::new(CacheValue::List(VecDeque::new()), None));
            match &mut entry.value {
                CacheValue::List(list) => list.push_front(value),
                other => return Err(wrong_type(&key, other)),
            }
        }
        CacheCommand::ListTrim { key, start, stop } => {
            let now_empty = match slot {
                Some(entry) => match &mut entry.value {
                    CacheValue::List(list) => {
                        match resolve_range(list.len(), start, stop) {
                            Some((from, to)) => {
                                list.truncate(to + 1);
                                list.drain(..from);
                            }
                            None => list.clear(),
                        }
                        list.is_empty()
                    }
                    other => return Err(wrong_type(&key, other)),
                },
                None => false,
            };
            if now_empty {
                *slot = None;
            }
        }
        CacheCommand::ListRemove { key, value } => {
            let now_empty = match slot {
                Some(entry) => match &mut entry.value {
                    CacheValue::List(list) => {
                        list.retain(|item| *item != value);
                        list.is_empty()
                    }
                    other => return Err(wrong_type(&key, other)),
                },
                None => false,
            };
            if now_empty {
                *slot = None;
            }
        }
        CacheCommand::Expire { ttl, .. } => {
            if let Some(entry) = slot {
                entry.expire_in(ttl);
            }
        }
    }

    Ok(())
}

/// Matches `text` against a glob pattern supporting `*` and `?`.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut star: Option<usize> = None;
    let mut mark = 0;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            mark = t;
            p += 1;
        } else if let Some(star_pos) = star {
            p = star_pos + 1;
            mark += 1;
            t = mark;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut state = self.state.write().await;
        match state.live_mut(key) {
            Some(entry) => match &entry.value {
                CacheValue::Str(value) => Ok(Some(value.clone())),
                other => Err(wrong_type(key, other)),
            },
            None => Ok(None),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let state = self.state.read().await;
        Ok(state.entries.get(key).is_some_and(|entry| !entry.is_expired()))
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, CacheError> {
        let mut state = self.state.write().await;
        match state.live_mut(key) {
            Some(entry) => match &entry.value {
                CacheValue::Hash(hash) => Ok(hash.clone()),
                other => Err(wrong_type(key, other)),
            },
            None => Ok(HashMap::new()),
        }
    }

    async fn list_range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, CacheError> {
        let mut state = self.state.write().await;
        match state.live_mut(key) {
            Some(entry) => match &entry.value {
                CacheValue::List(list) => Ok(resolve_range(list.len(), start, stop)
                    .map(|(from, to)| list.range(from..=to).cloned().collect())
                    .unwrap_or_default()),
                other => Err(wrong_type(key, other)),
            },
            None => Ok(Vec::new()),
        }
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired() && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn delete(&self, keys: &[String]) -> Result<usize, CacheError> {
        let mut state = self.state.write().await;
        let removed = keys
            .iter()
            .filter_map(|key| state.entries.remove(key))
            .filter(|entry| !entry.is_expired())
            .count();
        Ok(removed)
    }

    async fn execute(&self, pipeline: Pipeline) -> Result<(), CacheError> {
        for command in pipeline.commands() {
            validate_command(command)?;
        }

        let mut state = self.state.write().await;

        // Stage every touched key so a failing command leaves the store untouched.
        let mut staged: HashMap<String, Option<CacheEntry>> = HashMap::new();
        for command in pipeline.into_commands() {
            let slot = staged.entry(command.key().to_string()).or_insert_with(|| {
                state
                    .entries
                    .get(command.key())
                    .filter(|entry| !entry.is_expired())
                    .cloned()
            });
            apply(slot, command)?;
        }

        for (key, slot) in staged {
            match slot {
                Some(mut entry) => {
                    entry.last_access = state.tick();
                    state.entries.insert(key, entry);
                }
                None => {
                    state.entries.remove(&key);
                }
            }
        }
        state.evict_to_capacity();

        Ok(())
    }

    async fn size(&self) -> Result<usize, CacheError> {
        let state = self.state.read().await;
        Ok(state.entries.values().filter(|entry| !entry.is_expired()).count())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
