use bytes::Bytes;
use std::collections::hash_map::{Entry as MapEntry, RandomState};
use std::collections::{BTreeSet, HashMap};
use std::hash::BuildHasher;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use strum_macros::IntoStaticStr;
use thiserror::Error as ThisError;
use tokio::sync::Notify;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::debug;

use crate::config::DEFAULT_SHARDS;
use crate::sorted_set::SortedSet;

/// The Store owns the whole keyspace. Keys are spread over independently locked shards, and every
/// operation on a single key runs under that key's shard lock, which makes it atomic with respect
/// to any other operation on the same key.
///
/// Keys may carry a time-to-live; expired keys are invisible to readers and removed in the
/// background. The store is cheap to clone, and the background task stops once the last clone is
/// dropped.
#[derive(Clone)]
pub struct Store {
    inner: Arc<InnerStore>,
}

impl Store {
    pub fn new() -> Store {
        Self::with_shards(DEFAULT_SHARDS)
    }

    pub fn with_shards(shards: usize) -> Store {
        let shards = (0..shards.max(1))
            .map(|_| Mutex::new(State::default()))
            .collect();

        let waker = Arc::new(Notify::new());
        let inner = Arc::new(InnerStore {
            shards,
            hasher: RandomState::new(),
            waker: waker.clone(),
        });

        tokio::spawn({
            let inner = Arc::downgrade(&inner);
            async move { remove_expired_keys(inner, waker).await }
        });

        Self { inner }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

pub struct InnerStore {
    shards: Box<[Mutex<State>]>,
    hasher: RandomState,
    waker: Arc<Notify>,
}

pub struct InnerStoreLocked<'a> {
    state: MutexGuard<'a, State>,
    waker: &'a Notify,
}

#[derive(Debug, ThisError, PartialEq)]
pub enum StoreError {
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
}

/// Existence condition attached to a string write.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SetCondition {
    #[default]
    Always,
    /// NX
    IfAbsent,
    /// XX
    IfPresent,
}

impl<'a> InnerStoreLocked<'a> {
    /// Writes a string value if `condition` holds, replacing any value and expiration the key had.
    /// Returns whether the write happened.
    pub fn set(
        &mut self,
        key: Bytes,
        data: Vec<u8>,
        condition: SetCondition,
        ttl: Option<Duration>,
    ) -> bool {
        self.expire_if_needed(&key);

        let allowed = match condition {
            SetCondition::Always => true,
            SetCondition::IfAbsent => !self.state.keys.contains_key(&key),
            SetCondition::IfPresent => matches!(
                self.state.keys.get(&key),
                Some(Entry {
                    value: Value::String(_),
                    ..
                })
            ),
        };
        if !allowed {
            return false;
        }

        self.remove(&key);

        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.state.keys.insert(
            key.clone(),
            Entry {
                value: Value::String(data),
                expires_at,
            },
        );

        if let Some(expires_at) = expires_at {
            self.track_expiration(expires_at, key);
        }

        true
    }

    /// The string at `key`, if any.
    pub fn string(&mut self, key: &[u8]) -> Result<Option<&[u8]>, StoreError> {
        match self.get(key) {
            Some(Value::String(data)) => Ok(Some(data.as_slice())),
            Some(_) => Err(StoreError::WrongType),
            None => Ok(None),
        }
    }

    /// Mutable access to the string at `key`, created empty if the key is absent.
    pub fn string_or_default(&mut self, key: Bytes) -> Result<&mut Vec<u8>, StoreError> {
        match &mut self.entry_or_insert_with(key, || Value::String(Vec::new())).value {
            Value::String(data) => Ok(data),
            _ => Err(StoreError::WrongType),
        }
    }

    /// The sorted set at `key`, if any.
    pub fn sorted_set(&mut self, key: &[u8]) -> Result<Option<&SortedSet>, StoreError> {
        match self.get(key) {
            Some(Value::SortedSet(set)) => Ok(Some(set)),
            Some(_) => Err(StoreError::WrongType),
            None => Ok(None),
        }
    }

    /// Mutable access to the sorted set at `key`, if any.
    pub fn sorted_set_mut(&mut self, key: &[u8]) -> Result<Option<&mut SortedSet>, StoreError> {
        self.expire_if_needed(key);
        match self.state.keys.get_mut(key).map(|entry| &mut entry.value) {
            Some(Value::SortedSet(set)) => Ok(Some(set)),
            Some(_) => Err(StoreError::WrongType),
            None => Ok(None),
        }
    }

    /// Mutable access to the sorted set at `key`, created empty if the key is absent.
    pub fn sorted_set_or_default(&mut self, key: Bytes) -> Result<&mut SortedSet, StoreError> {
        match &mut self
            .entry_or_insert_with(key, || Value::SortedSet(SortedSet::new()))
            .value
        {
            Value::SortedSet(set) => Ok(set),
            _ => Err(StoreError::WrongType),
        }
    }

    pub fn get(&mut self, key: &[u8]) -> Option<&Value> {
        self.expire_if_needed(key);
        self.state.keys.get(key).map(|entry| &entry.value)
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<Value> {
        let (key, entry) = self.state.keys.remove_entry(key)?;
        if let Some(expires_at) = entry.expires_at {
            self.state.ttls.remove(&(expires_at, key));
        }
        Some(entry.value)
    }

    pub fn exists(&mut self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Remaining time to live of `key`: `None` if the key is absent, `Some(None)` if it never
    /// expires.
    pub fn ttl(&mut self, key: &[u8]) -> Option<Option<Duration>> {
        self.expire_if_needed(key);
        let entry = self.state.keys.get(key)?;
        Some(
            entry
                .expires_at
                .map(|expires_at| expires_at.saturating_duration_since(Instant::now())),
        )
    }

    fn entry_or_insert_with(&mut self, key: Bytes, value: impl FnOnce() -> Value) -> &mut Entry {
        self.expire_if_needed(&key);
        self.state.keys.entry(key).or_insert_with(|| Entry {
            value: value(),
            expires_at: None,
        })
    }

    fn track_expiration(&mut self, expires_at: Instant, key: Bytes) {
        self.state.ttls.insert((expires_at, key.clone()));

        let next_to_expire = self.state.ttls.iter().next().map(|(_, key)| key);
        let expires_next = next_to_expire == Some(&key);
        if expires_next {
            self.waker.notify_one();
        }
    }

    fn expire_if_needed(&mut self, key: &[u8]) {
        let expired = match self.state.keys.get(key) {
            Some(Entry {
                expires_at: Some(expires_at),
                ..
            }) => *expires_at <= Instant::now(),
            _ => false,
        };

        if expired {
            self.remove(key);
        }
    }

    pub fn remove_expired_keys(&mut self) -> Option<Instant> {
        let now = Instant::now();

        let expired_keys: Vec<(Instant, Bytes)> = self
            .state
            .ttls
            .iter()
            .take_while(|(expires_at, _)| expires_at <= &now)
            .cloned()
            .collect();

        for (when, key) in expired_keys {
            self.state.ttls.remove(&(when, key.clone()));
            if let MapEntry::Occupied(entry) = self.state.keys.entry(key) {
                if entry.get().expires_at == Some(when) {
                    entry.remove();
                }
            }
        }

        self.state
            .ttls
            .iter()
            .next()
            .map(|&(expires_at, _)| expires_at)
    }
}

impl Deref for Store {
    type Target = InnerStore;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl InnerStore {
    /// Locks the shard owning `key`.
    pub fn lock<'a>(&'a self, key: &[u8]) -> InnerStoreLocked<'a> {
        let index = (self.hasher.hash_one(key) % self.shards.len() as u64) as usize;
        self.lock_shard(&self.shards[index])
    }

    fn lock_shard<'a>(&'a self, shard: &'a Mutex<State>) -> InnerStoreLocked<'a> {
        let state = shard.lock().unwrap_or_else(PoisonError::into_inner);
        InnerStoreLocked {
            state,
            waker: &self.waker,
        }
    }

    /// Removes expired keys from every shard and returns the next pending expiration.
    fn remove_expired_keys(&self) -> Option<Instant> {
        self.shards
            .iter()
            .filter_map(|shard| self.lock_shard(shard).remove_expired_keys())
            .min()
    }
}

impl Drop for InnerStore {
    fn drop(&mut self) {
        // Wake the expiration task so it observes the store is gone.
        self.waker.notify_one();
    }
}

type Key = Bytes;

/// A value with exactly one type for its whole lifetime.
#[derive(Debug, IntoStaticStr)]
pub enum Value {
    #[strum(serialize = "string")]
    String(Vec<u8>),
    #[strum(serialize = "zset")]
    SortedSet(SortedSet),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        self.into()
    }
}

pub struct Entry {
    pub value: Value,
    pub expires_at: Option<Instant>,
}

#[derive(Default)]
pub struct State {
    keys: HashMap<Key, Entry>,
    ttls: BTreeSet<(Instant, Key)>,
}

async fn remove_expired_keys(store: Weak<InnerStore>, waker: Arc<Notify>) {
    loop {
        let next_expiration = match store.upgrade() {
            Some(store) => store.remove_expired_keys(),
            None => break,
        };

        if let Some(next_expiration) = next_expiration {
            tokio::select! {
                _ = sleep_until(next_expiration) => {}
                _ = waker.notified() => {}
            }
        } else {
            waker.notified().await;
        }
    }

    debug!("Store dropped, expiration task stopped");
}
