//! Artist roster handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::db::{CollectionRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireSession;
use crate::models::{Artist, ArtistPatch};
use crate::state::AppState;

use super::ApiJson;

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

fn repo(state: &AppState) -> CollectionRepository<'_, Artist> {
    CollectionRepository::new(state.store())
}

/// All artists, by display order.
///
/// GET /api/artists
#[instrument(skip_all)]
pub async fn list(State(state): State<AppState>) -> Json<serde_json::Value> {
    let mut artists = repo(&state).list_or_defaults().await;
    artists.sort_by_key(|a| a.order);
    Json(json!({ "artists": artists }))
}

/// Add an artist. Missing id and order are filled in.
///
/// POST /api/artists
#[instrument(skip_all, fields(user = %session.email))]
pub async fn create(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    ApiJson(mut artist): ApiJson<Artist>,
) -> Result<Json<serde_json::Value>> {
    if artist.id.trim().is_empty() {
        artist.id = format!("artist-{}", chrono::Utc::now().timestamp_millis());
    }

    let artist = repo(&state)
        .modify(move |artists| {
            if artist.order == 0 {
                artist.order = artists.iter().map(|a| a.order).max().map_or(1, |max| max + 1);
            }
            artists.push(artist.clone());
            Ok(artist)
        })
        .await?;

    tracing::info!(artist_id = %artist.id, "Artist created");
    Ok(Json(json!({ "artist": artist })))
}

/// Update the artist named by the body's `id`.
///
/// PUT /api/artists
#[instrument(skip_all, fields(user = %session.email, artist_id = %patch.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    ApiJson(patch): ApiJson<ArtistPatch>,
) -> Result<Json<serde_json::Value>> {
    let artist = repo(&state)
        .modify(move |artists| {
            let artist = artists
                .iter_mut()
                .find(|a| a.id == patch.id)
                .ok_or(RepositoryError::NotFound)?;
            patch.apply(artist);
            Ok(artist.clone())
        })
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("Artiste non trouvé".to_string()),
            other => other.into(),
        })?;

    Ok(Json(json!({ "artist": artist })))
}

/// Remove an artist. Unknown ids are not an error.
///
/// DELETE /api/artists?id=
#[instrument(skip_all, fields(user = %session.email))]
pub async fn remove(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Query(query): Query<IdQuery>,
) -> Result<Json<serde_json::Value>> {
    let Some(id) = query.id.filter(|id| !id.trim().is_empty()) else {
        return Err(AppError::BadRequest("ID manquant".to_string()));
    };

    let removed = repo(&state)
        .modify(move |artists| {
            let before = artists.len();
            artists.retain(|a| a.id != id);
            Ok(before - artists.len())
        })
        .await?;

    tracing::info!(removed, "Artist deleted");
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{Method, StatusCode};

    use secrecy::SecretString;

    use super::super::testing::{TestApp, config};
    use crate::config::StoreConfig;
    use crate::store::KvStore;

    #[tokio::test]
    async fn test_list_serves_defaults_sorted() {
        let app = TestApp::new();
        let res = app.get("/api/artists").await;
        assert_eq!(res.status, StatusCode::OK);
        let orders: Vec<i64> = res.body["artists"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["order"].as_i64().unwrap())
            .collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_mutations_require_session() {
        let app = TestApp::new();
        let res = app.post("/api/artists", Some(r#"{"name":"X"}"#)).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.body["error"], "Non autorisé");

        let res = app
            .request(Method::DELETE, "/api/artists?id=dj-phoenix", None, None)
            .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_update_delete() {
        let app = TestApp::new();
        let session = app.session_for("editor@angelivisions.com");

        let res = app
            .request(Method::POST, "/api/artists", Some(r#"{"name":"Luna","type":"DJ"}"#), Some(&session))
            .await;
        assert_eq!(res.status, StatusCode::OK);
        let id = res.body["artist"]["id"].as_str().unwrap().to_string();
        assert!(id.starts_with("artist-"));
        assert_eq!(res.body["artist"]["order"], 4);

        let body = format!(r#"{{"id":"{id}","featured":true}}"#);
        let res = app
            .request(Method::PUT, "/api/artists", Some(&body), Some(&session))
            .await;
        assert_eq!(res.body["artist"]["featured"], true);
        assert_eq!(res.body["artist"]["name"], "Luna");

        let res = app
            .request(Method::PUT, "/api/artists", Some(r#"{"id":"ghost"}"#), Some(&session))
            .await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(res.body["error"], "Artiste non trouvé");

        let res = app
            .request(Method::DELETE, &format!("/api/artists?id={id}"), None, Some(&session))
            .await;
        assert_eq!(res.body["success"], true);
        let res = app.get("/api/artists").await;
        assert_eq!(res.body["artists"].as_array().unwrap().len(), 3);

        let res = app
            .request(Method::DELETE, "/api/artists", None, Some(&session))
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unreachable_store_reads_defaults_and_refuses_writes() {
        let mut config = config();
        config.store = Some(StoreConfig {
            rest_url: "http://127.0.0.1:1".to_string(),
            token: SecretString::from("token"),
        });
        let store = KvStore::from_config(config.store.as_ref()).unwrap();
        let app = TestApp::with_store(config, store);

        let res = app.get("/api/artists").await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["artists"].as_array().unwrap().len(), 3);

        let session = app.session_for("editor@angelivisions.com");
        let res = app
            .request(
                Method::POST,
                "/api/artists",
                Some(r#"{"name":"DJ Nova","role":"DJ"}"#),
                Some(&session),
            )
            .await;
        assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(res.body["error"], "Service indisponible");

        let res = app.get("/health/ready").await;
        assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
