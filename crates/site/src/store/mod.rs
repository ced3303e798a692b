//! Key-value content store.
//!
//! Every piece of site content lives in a Redis-compatible store reached over
//! the Upstash REST API. Collections are single JSON documents under one key;
//! newsletter subscribers and quote requests are hashes indexed by a set.
//!
//! [`KvStore`] hides which backend is in use and also hands out per-key async
//! locks, so read-modify-write cycles on one collection are serialized within
//! the process.

mod memory;
mod upstash;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub use memory::MemoryStore;
pub use upstash::UpstashClient;

use crate::config::StoreConfig;

/// Errors raised by the store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Store replied with an error.
    #[error("Store error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Reply did not have the shape the command implies.
    #[error("Unexpected reply to {command}: {reply}")]
    UnexpectedReply { command: String, reply: String },

    /// Key holds a different value type than the command expects.
    #[error("Key {key} holds a {actual}")]
    WrongType { key: String, actual: &'static str },

    /// Value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Client could not be built from configuration.
    #[error("Invalid store configuration: {0}")]
    Config(String),
}

#[derive(Debug, Clone)]
enum Backend {
    Upstash(UpstashClient),
    Memory(MemoryStore),
}

/// Handle to the content store. Cheap to clone.
#[derive(Debug, Clone)]
pub struct KvStore {
    backend: Backend,
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl KvStore {
    /// Connect to Upstash when configured, otherwise use process memory.
    ///
    /// # Errors
    ///
    /// Returns error if the Upstash client cannot be built.
    pub fn from_config(config: Option<&StoreConfig>) -> Result<Self, StoreError> {
        match config {
            Some(config) => Ok(Self::upstash(UpstashClient::new(config)?)),
            None => {
                tracing::warn!("No KV store configured, content will not survive a restart");
                Ok(Self::memory())
            }
        }
    }

    #[must_use]
    pub fn upstash(client: UpstashClient) -> Self {
        Self::with_backend(Backend::Upstash(client))
    }

    #[must_use]
    pub fn memory() -> Self {
        Self::with_backend(Backend::Memory(MemoryStore::new()))
    }

    fn with_backend(backend: Backend) -> Self {
        Self {
            backend,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Short backend name for logs.
    #[must_use]
    pub const fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Upstash(_) => "upstash",
            Backend::Memory(_) => "memory",
        }
    }

    /// Serialize writers of `key` within this process.
    ///
    /// Hold the guard across the whole read-modify-write cycle.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(
                locks
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    /// Round-trip used by `/health/ready`.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached.
    pub async fn ping(&self) -> Result<(), StoreError> {
        match &self.backend {
            Backend::Upstash(client) => client.command(&["PING"]).await.map(|_| ()),
            Backend::Memory(_) => Ok(()),
        }
    }

    /// # Errors
    ///
    /// Returns error if the store cannot be reached or the key is not a string.
    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match &self.backend {
            Backend::Upstash(client) => {
                let args = ["GET", key];
                match client.command(&args).await? {
                    Value::Null => Ok(None),
                    Value::String(s) => Ok(Some(s)),
                    // REST replies may already be decoded JSON
                    other => Ok(Some(other.to_string())),
                }
            }
            Backend::Memory(store) => store.get(key).await,
        }
    }

    /// # Errors
    ///
    /// Returns error if the store cannot be reached.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        match &self.backend {
            Backend::Upstash(client) => client.command(&["SET", key, value]).await.map(|_| ()),
            Backend::Memory(store) => {
                store.set(key, value).await;
                Ok(())
            }
        }
    }

    /// Remove a key of any type. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached.
    pub async fn del(&self, key: &str) -> Result<bool, StoreError> {
        match &self.backend {
            Backend::Upstash(client) => {
                let args = ["DEL", key];
                Ok(expect_integer(&args, client.command(&args).await?)? > 0)
            }
            Backend::Memory(store) => Ok(store.del(key).await),
        }
    }

    /// # Errors
    ///
    /// Returns error if the store cannot be reached or the key is not a set.
    pub async fn sadd(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        match &self.backend {
            Backend::Upstash(client) => {
                let args = ["SADD", key, member];
                Ok(expect_integer(&args, client.command(&args).await?)? > 0)
            }
            Backend::Memory(store) => store.sadd(key, member).await,
        }
    }

    /// # Errors
    ///
    /// Returns error if the store cannot be reached or the key is not a set.
    pub async fn srem(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        match &self.backend {
            Backend::Upstash(client) => {
                let args = ["SREM", key, member];
                Ok(expect_integer(&args, client.command(&args).await?)? > 0)
            }
            Backend::Memory(store) => store.srem(key, member).await,
        }
    }

    /// Members of a set; empty when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached or the key is not a set.
    pub async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        match &self.backend {
            Backend::Upstash(client) => {
                let args = ["SMEMBERS", key];
                expect_strings(&args, client.command(&args).await?)
            }
            Backend::Memory(store) => store.smembers(key).await,
        }
    }

    /// Set several hash fields at once.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached or the key is not a hash.
    pub async fn hset(&self, key: &str, fields: &[(&str, String)]) -> Result<(), StoreError> {
        if fields.is_empty() {
            return Ok(());
        }
        match &self.backend {
            Backend::Upstash(client) => {
                let mut args = vec!["HSET", key];
                for (field, value) in fields {
                    args.push(*field);
                    args.push(value.as_str());
                }
                client.command(&args).await.map(|_| ())
            }
            Backend::Memory(store) => store.hset(key, fields).await,
        }
    }

    /// All fields of a hash; empty when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached or the key is not a hash.
    pub async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        match &self.backend {
            Backend::Upstash(client) => {
                let args = ["HGETALL", key];
                let reply = client.command(&args).await?;
                pairs_to_map(&args, reply)
            }
            Backend::Memory(store) => store.hgetall(key).await,
        }
    }

    /// Read a JSON document, tolerating double-encoded values.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached or the value does not
    /// decode as `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        self.get(key)
            .await?
            .map(|raw| decode_json(&raw))
            .transpose()
            .map_err(StoreError::from)
    }

    /// Write a JSON document.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached.
    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw).await
    }
}

/// Decode a stored document.
///
/// Older writers stored collections through a client that JSON-encoded them a
/// second time, so a string holding JSON is unwrapped before decoding.
///
/// # Errors
///
/// Returns error if the value is not valid JSON for `T`.
pub fn decode_json<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    match serde_json::from_str::<Value>(raw)? {
        Value::String(inner) => serde_json::from_str(&inner),
        value => serde_json::from_value(value),
    }
}

fn unexpected(args: &[&str], reply: &Value) -> StoreError {
    StoreError::UnexpectedReply {
        command: upstash::command_name(args),
        reply: reply.to_string(),
    }
}

fn expect_integer(args: &[&str], reply: Value) -> Result<i64, StoreError> {
    reply.as_i64().ok_or_else(|| unexpected(args, &reply))
}

fn expect_strings(args: &[&str], reply: Value) -> Result<Vec<String>, StoreError> {
    match reply {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(unexpected(args, &other)),
            })
            .collect(),
        other => Err(unexpected(args, &other)),
    }
}

/// HGETALL replies are a flat `[field, value, field, value, ...]` array.
fn pairs_to_map(args: &[&str], reply: Value) -> Result<HashMap<String, String>, StoreError> {
    let flat = expect_strings(args, reply)?;
    let mut chunks = flat.chunks_exact(2);
    let map = chunks
        .by_ref()
        .filter_map(|pair| match pair {
            [field, value] => Some((field.clone(), value.clone())),
            _ => None,
        })
        .collect();
    if chunks.remainder().is_empty() {
        Ok(map)
    } else {
        Err(StoreError::UnexpectedReply {
            command: upstash::command_name(args),
            reply: format!("{} items", flat.len()),
        })
    }
}
