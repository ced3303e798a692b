//! Newsletter subscribers: one hash per address plus an index set.

use std::collections::BTreeSet;

use super::RepositoryError;
use crate::models::Subscriber;
use crate::models::newsletter::subscriber_key;
use crate::store::KvStore;

/// Index of subscribed addresses.
pub const INDEX_KEY: &str = "newsletter_emails";

/// Email-only set written by the first version of the sign-up form.
pub const LEGACY_INDEX_KEY: &str = "newsletter_subscribers";

/// Repository for newsletter subscribers.
pub struct NewsletterRepository<'a> {
    store: &'a KvStore,
}

impl<'a> NewsletterRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a KvStore) -> Self {
        Self { store }
    }

    /// Store a subscription, replacing any earlier one for the address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the store cannot be reached.
    pub async fn subscribe(&self, subscriber: &Subscriber) -> Result<(), RepositoryError> {
        let key = subscriber_key(&subscriber.email);
        self.store.del(&key).await?;
        self.store.hset(&key, &subscriber.to_fields()).await?;
        self.store.sadd(INDEX_KEY, &subscriber.email).await?;
        Ok(())
    }

    /// Addresses from both indexes, sorted and deduplicated.
    async fn all_emails(&self) -> Result<BTreeSet<String>, RepositoryError> {
        let mut emails: BTreeSet<String> = self.store.smembers(INDEX_KEY).await?.into_iter().collect();
        emails.extend(self.store.smembers(LEGACY_INDEX_KEY).await?);
        Ok(emails)
    }

    /// Every subscriber. Legacy addresses without a hash get a minimal record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the store cannot be reached.
    pub async fn list(&self) -> Result<Vec<Subscriber>, RepositoryError> {
        let mut subscribers = Vec::new();
        for email in self.all_emails().await? {
            let fields = self.store.hgetall(&subscriber_key(&email)).await?;
            subscribers.push(Subscriber::from_fields(&fields).unwrap_or_else(|| Subscriber::legacy(email)));
        }
        Ok(subscribers)
    }

    /// Find the subscriber owning a preferences token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the store cannot be reached.
    pub async fn find_by_token(&self, token: &str) -> Result<Option<Subscriber>, RepositoryError> {
        if token.is_empty() {
            return Ok(None);
        }
        for email in self.all_emails().await? {
            let fields = self.store.hgetall(&subscriber_key(&email)).await?;
            if let Some(subscriber) = Subscriber::from_fields(&fields)
                && subscriber.token.as_deref() == Some(token)
            {
                return Ok(Some(subscriber));
            }
        }
        Ok(None)
    }

    /// Change the display name of a subscriber.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the store cannot be reached.
    pub async fn rename(&self, email: &str, name: &str) -> Result<(), RepositoryError> {
        self.store
            .hset(&subscriber_key(email), &[("name", name.to_string())])
            .await?;
        Ok(())
    }

    /// Remove an address from the hash and both indexes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the store cannot be reached.
    pub async fn unsubscribe(&self, email: &str) -> Result<(), RepositoryError> {
        let email = email.trim().to_lowercase();
        self.store.del(&subscriber_key(&email)).await?;
        self.store.srem(INDEX_KEY, &email).await?;
        self.store.srem(LEGACY_INDEX_KEY, &email).await?;
        Ok(())
    }

    /// Move a subscription to a new address, keeping its other fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the store cannot be reached.
    pub async fn change_email(&self, old_email: &str, new_email: &str) -> Result<(), RepositoryError> {
        let old_email = old_email.trim().to_lowercase();
        let new_email = new_email.trim().to_lowercase();
        let existing = self.store.hgetall(&subscriber_key(&old_email)).await?;
        let mut subscriber =
            Subscriber::from_fields(&existing).unwrap_or_else(|| Subscriber::legacy(old_email.clone()));
        subscriber.email.clone_from(&new_email);

        self.unsubscribe(&old_email).await?;
        self.store.hset(&subscriber_key(&new_email), &subscriber.to_fields()).await?;
        self.store.sadd(INDEX_KEY, &new_email).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use angeli_core::Locale;
    use chrono::Utc;

    use super::*;

    fn subscriber(email: &str) -> Subscriber {
        Subscriber::new("Ada".to_string(), email.to_string(), true, Locale::Fr, Utc::now())
    }

    #[tokio::test]
    async fn test_subscribe_list_and_legacy() {
        let store = KvStore::memory();
        store.sadd(LEGACY_INDEX_KEY, "old@b.com").await.unwrap();
        let repo = NewsletterRepository::new(&store);
        repo.subscribe(&subscriber("a@b.com")).await.unwrap();

        let list = repo.list().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].email, "a@b.com");
        assert_eq!(list[0].name, "Ada");
        assert_eq!(list[1], Subscriber::legacy("old@b.com".to_string()));
    }

    #[tokio::test]
    async fn test_token_lookup_and_unsubscribe() {
        let store = KvStore::memory();
        let repo = NewsletterRepository::new(&store);
        let sub = subscriber("a@b.com");
        repo.subscribe(&sub).await.unwrap();

        let token = sub.token.clone().unwrap();
        let found = repo.find_by_token(&token).await.unwrap().unwrap();
        assert_eq!(found.email, "a@b.com");
        assert!(repo.find_by_token("nope").await.unwrap().is_none());
        assert!(repo.find_by_token("").await.unwrap().is_none());

        repo.unsubscribe("A@b.com").await.unwrap();
        assert!(repo.list().await.unwrap().is_empty());
        assert!(repo.find_by_token(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_change_email_keeps_fields() {
        let store = KvStore::memory();
        let repo = NewsletterRepository::new(&store);
        let sub = subscriber("a@b.com");
        repo.subscribe(&sub).await.unwrap();
        repo.rename("a@b.com", "Ada L.").await.unwrap();

        repo.change_email("a@b.com", "Ada@New.com").await.unwrap();
        let list = repo.list().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].email, "ada@new.com");
        assert_eq!(list[0].name, "Ada L.");
        assert_eq!(list[0].token, sub.token);
    }
}
