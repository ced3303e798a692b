//! Site content collections and their store keys.

use super::StoredCollection;
use crate::models::{
    Artist, BlogPost, Category, Project, ServiceItem, TeamMember, artist, blog, category, project,
    service, team,
};

impl StoredCollection for Artist {
    const KEY: &'static str = "artists";

    fn defaults() -> Vec<Self> {
        artist::default_artists()
    }
}

impl StoredCollection for TeamMember {
    const KEY: &'static str = "team:members";

    fn defaults() -> Vec<Self> {
        team::default_team()
    }
}

impl StoredCollection for ServiceItem {
    const KEY: &'static str = "av_services_v1";

    fn defaults() -> Vec<Self> {
        service::default_services()
    }
}

impl StoredCollection for Category {
    const KEY: &'static str = "categories";

    fn defaults() -> Vec<Self> {
        category::default_categories()
    }
}

impl StoredCollection for Project {
    const KEY: &'static str = "projects";

    fn defaults() -> Vec<Self> {
        project::default_projects()
    }
}

impl StoredCollection for BlogPost {
    const KEY: &'static str = "blog_posts";

    fn defaults() -> Vec<Self> {
        blog::default_posts()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::CollectionRepository;
    use crate::store::KvStore;

    #[tokio::test]
    async fn test_reads_double_encoded_team() {
        let store = KvStore::memory();
        let members = serde_json::to_string(&team::default_team()).unwrap();
        store
            .set("team:members", &serde_json::to_string(&members).unwrap())
            .await
            .unwrap();

        let team = CollectionRepository::<TeamMember>::new(&store).load().await.unwrap();
        assert_eq!(team.len(), 3);
        assert_eq!(team[0].id, "t-1");
    }

    #[tokio::test]
    async fn test_reads_legacy_artist_shape() {
        let store = KvStore::memory();
        store
            .set(
                "artists",
                r#"[{"id":"a","name":"A","type":{"fr":"DJ","en":"DJ","es":"DJ"},"musicalGenre":{"fr":"Pop","en":"Pop","es":"Pop"}}]"#,
            )
            .await
            .unwrap();
        let artists = CollectionRepository::<Artist>::new(&store).list_or_defaults().await;
        assert_eq!(artists.len(), 1);
        assert_eq!(artists[0].kind.len(), 1);
        assert_eq!(artists[0].musical_genre[0].fr, "Pop");
    }

    #[tokio::test]
    async fn test_each_collection_seeds_its_own_key() {
        let store = KvStore::memory();
        CollectionRepository::<ServiceItem>::new(&store).list_or_defaults().await;
        CollectionRepository::<Project>::new(&store).list_or_defaults().await;
        assert!(store.get("av_services_v1").await.unwrap().is_some());
        assert!(store.get("projects").await.unwrap().is_some());
        assert!(store.get("categories").await.unwrap().is_none());
    }
}
