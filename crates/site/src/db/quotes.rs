//! Quote requests: one hash per request plus an index set of ids.

use super::RepositoryError;
use crate::models::QuoteRequest;
use crate::models::quote::{quote_key, sort_newest_first};
use crate::store::KvStore;

/// Index of stored request ids.
pub const INDEX_KEY: &str = "devis_submissions";

pub struct QuoteRepository<'a> {
    store: &'a KvStore,
}

impl<'a> QuoteRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a KvStore) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the store cannot be reached.
    pub async fn create(&self, request: &QuoteRequest) -> Result<(), RepositoryError> {
        self.store.hset(&quote_key(&request.id), &request.to_fields()).await?;
        self.store.sadd(INDEX_KEY, &request.id).await?;
        Ok(())
    }

    /// All requests, newest first. Ids whose hash has vanished are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the store cannot be reached.
    pub async fn list(&self) -> Result<Vec<QuoteRequest>, RepositoryError> {
        let mut requests = Vec::new();
        for id in self.store.smembers(INDEX_KEY).await? {
            let fields = self.store.hgetall(&quote_key(&id)).await?;
            if let Some(request) = QuoteRequest::from_fields(&fields) {
                requests.push(request);
            }
        }
        sort_newest_first(&mut requests);
        Ok(requests)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the store cannot be reached.
    pub async fn remove(&self, id: &str) -> Result<(), RepositoryError> {
        self.store.del(&quote_key(id)).await?;
        self.store.srem(INDEX_KEY, id).await?;
        Ok(())
    }
}
