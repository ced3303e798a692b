//! Content seeding.
//!
//! Public pages seed an empty collection on first read; this does it ahead
//! of time so editors start from the default content.

use angeli_site::db::{CollectionRepository, StoredCollection};
use angeli_site::models::{Artist, BlogPost, Category, Project, ServiceItem, TeamMember};
use angeli_site::store::KvStore;

async fn seed_collection<T: StoredCollection>(store: &KvStore) {
    let items = CollectionRepository::<T>::new(store).list_or_defaults().await;
    tracing::info!(key = T::KEY, count = items.len(), "Collection ready");
}

/// Write the defaults into every collection that has never been saved.
/// Collections that already hold data are left untouched.
pub async fn seed(store: &KvStore) {
    seed_collection::<Artist>(store).await;
    seed_collection::<TeamMember>(store).await;
    seed_collection::<ServiceItem>(store).await;
    seed_collection::<Category>(store).await;
    seed_collection::<Project>(store).await;
    seed_collection::<BlogPost>(store).await;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seed_keeps_existing_content() {
        let store = KvStore::memory();
        CollectionRepository::<Project>::new(&store).save(&[]).await.unwrap();

        seed(&store).await;

        let projects = CollectionRepository::<Project>::new(&store).load().await.unwrap();
        assert!(projects.is_empty());
        let raw = store.get(Artist::KEY).await.unwrap();
        assert!(raw.is_some());
    }
}
