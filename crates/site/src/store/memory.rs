//! In-process store used when no Upstash database is configured.
//!
//! Data lives only as long as the process. Used for local development and by
//! the integration tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::StoreError;

#[derive(Debug, Clone)]
enum Entry {
    Text(String),
    Set(BTreeSet<String>),
    Hash(BTreeMap<String, String>),
}

impl Entry {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "string",
            Self::Set(_) => "set",
            Self::Hash(_) => "hash",
        }
    }
}

fn wrong_type(key: &str, entry: &Entry) -> StoreError {
    StoreError::WrongType {
        key: key.to_string(),
        actual: entry.kind(),
    }
}

/// Map-backed store with the same value types as the remote one.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.entries.read().await.get(key) {
            None => Ok(None),
            Some(Entry::Text(value)) => Ok(Some(value.clone())),
            Some(other) => Err(wrong_type(key, other)),
        }
    }

    pub(super) async fn set(&self, key: &str, value: &str) {
        self.entries
            .write()
            .await
            .insert(key.to_string(), Entry::Text(value.to_string()));
    }

    pub(super) async fn del(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    pub(super) async fn sadd(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().await;
        match entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Set(BTreeSet::new()))
        {
            Entry::Set(set) => Ok(set.insert(member.to_string())),
            other => Err(wrong_type(key, other)),
        }
    }

    pub(super) async fn srem(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().await;
        let removed = match entries.get_mut(key) {
            None => return Ok(false),
            Some(Entry::Set(set)) => set.remove(member),
            Some(other) => return Err(wrong_type(key, other)),
        };
        if matches!(entries.get(key), Some(Entry::Set(set)) if set.is_empty()) {
            entries.remove(key);
        }
        Ok(removed)
    }

    pub(super) async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        match self.entries.read().await.get(key) {
            None => Ok(Vec::new()),
            Some(Entry::Set(set)) => Ok(set.iter().cloned().collect()),
            Some(other) => Err(wrong_type(key, other)),
        }
    }

    pub(super) async fn hset(&self, key: &str, fields: &[(&str, String)]) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        match entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::Hash(BTreeMap::new()))
        {
            Entry::Hash(hash) => {
                for (field, value) in fields {
                    hash.insert((*field).to_string(), value.clone());
                }
                Ok(())
            }
            other => Err(wrong_type(key, other)),
        }
    }

    pub(super) async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        match self.entries.read().await.get(key) {
            None => Ok(HashMap::new()),
            Some(Entry::Hash(hash)) => Ok(hash.clone().into_iter().collect()),
            Some(other) => Err(wrong_type(key, other)),
        }
    }
}
