//! Repositories over the key-value content store.
//!
//! # Keys
//!
//! - `av:admin:users` - back-office accounts (JSON array)
//! - `artists`, `team:members`, `av_services_v1`, `categories`, `projects`,
//!   `blog_posts` - site content (one JSON array each)
//! - `newsletter:{email}` + `newsletter_emails` - subscriber hashes and index
//! - `devis:{id}` + `devis_submissions` - quote requests and index
//!
//! Collections are rewritten whole on every mutation. [`CollectionRepository::modify`]
//! holds the per-key lock for the whole read-modify-write cycle.

pub mod content;
pub mod newsletter;
pub mod quotes;
pub mod users;

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub use newsletter::NewsletterRepository;
pub use quotes::QuoteRepository;
pub use users::UserRepository;

use crate::store::{KvStore, StoreError};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Store could not be reached or refused the command.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Stored data does not decode.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The change is refused by a collection rule.
    #[error("invalid change: {0}")]
    Invalid(String),
}

/// A record type persisted as one JSON array under a fixed key.
pub trait StoredCollection: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Store key of the collection.
    const KEY: &'static str;

    /// Content served before anything has been saved.
    fn defaults() -> Vec<Self>;
}

/// Typed access to one stored collection.
pub struct CollectionRepository<'a, T> {
    store: &'a KvStore,
    _record: PhantomData<T>,
}

impl<'a, T: StoredCollection> CollectionRepository<'a, T> {
    #[must_use]
    pub const fn new(store: &'a KvStore) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    /// Collection for public pages. Never fails.
    ///
    /// Falls back to the defaults when the store is unreachable or holds
    /// something unreadable. An absent key is seeded with the defaults,
    /// best effort.
    pub async fn list_or_defaults(&self) -> Vec<T> {
        match self.store.get_json::<Vec<T>>(T::KEY).await {
            Ok(Some(items)) => items,
            Ok(None) => self.seed_defaults().await,
            Err(e) => {
                tracing::warn!(key = T::KEY, error = %e, "Serving default content");
                T::defaults()
            }
        }
    }

    async fn seed_defaults(&self) -> Vec<T> {
        let _guard = self.store.lock(T::KEY).await;
        // Another request may have written while we waited
        if let Ok(Some(items)) = self.store.get_json::<Vec<T>>(T::KEY).await {
            return items;
        }
        let defaults = T::defaults();
        match self.store.set_json(T::KEY, &defaults).await {
            Ok(()) => tracing::info!(key = T::KEY, count = defaults.len(), "Seeded default content"),
            Err(e) => tracing::warn!(key = T::KEY, error = %e, "Failed to seed default content"),
        }
        defaults
    }

    /// Collection for mutations. An absent key yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the store cannot be reached.
    /// Returns `RepositoryError::DataCorruption` if the stored value does not decode,
    /// so a broken document is never silently replaced.
    pub async fn load(&self) -> Result<Vec<T>, RepositoryError> {
        match self.store.get_json::<Vec<T>>(T::KEY).await {
            Ok(items) => Ok(items.unwrap_or_else(T::defaults)),
            Err(StoreError::Serialization(e)) => {
                Err(RepositoryError::DataCorruption(format!("{}: {e}", T::KEY)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the whole collection.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the write fails.
    pub async fn save(&self, items: &[T]) -> Result<(), RepositoryError> {
        self.store.set_json(T::KEY, items).await?;
        Ok(())
    }

    /// Read, change and write back the collection under the key's lock.
    ///
    /// Nothing is written when `change` returns an error.
    ///
    /// # Errors
    ///
    /// Returns the error from `change`, or any load/save error.
    pub async fn modify<R, F>(&self, change: F) -> Result<R, RepositoryError>
    where
        F: FnOnce(&mut Vec<T>) -> Result<R, RepositoryError> + Send,
        R: Send,
    {
        let _guard = self.store.lock(T::KEY).await;
        let mut items = self.load().await?;
        let result = change(&mut items)?;
        self.save(&items).await?;
        Ok(result)
    }
}
