//! Blog post handlers. Drafts are only visible with a session.

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::json;
use tracing::instrument;

use crate::db::{CollectionRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::{OptionalSession, RequireSession};
use crate::models::{BlogPost, BlogPostPatch, slugify};
use crate::state::AppState;

use super::ApiJson;

const NOT_FOUND: &str = "Article introuvable";
const SLUG_TAKEN: &str = "Ce slug est déjà utilisé";

fn repo(state: &AppState) -> CollectionRepository<'_, BlogPost> {
    CollectionRepository::new(state.store())
}

fn not_found(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound(NOT_FOUND.to_string()),
        other => other.into(),
    }
}

/// Posts, newest first.
///
/// GET /api/blog
#[instrument(skip_all)]
pub async fn list(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
) -> Json<serde_json::Value> {
    let mut posts = repo(&state).list_or_defaults().await;
    if session.is_none() {
        posts.retain(|p| p.published);
    }
    posts.sort_by(|a, b| b.date.cmp(&a.date));
    Json(json!({ "posts": posts }))
}

/// GET /api/blog/{slug}
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Path(slug): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let post = repo(&state)
        .list_or_defaults()
        .await
        .into_iter()
        .find(|p| p.slug == slug && (p.published || session.is_some()))
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    Ok(Json(json!({ "post": post })))
}

/// Create a post. The slug defaults to the slugified title and must be unique.
///
/// POST /api/blog
#[instrument(skip_all, fields(user = %session.email))]
pub async fn create(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    ApiJson(mut post): ApiJson<BlogPost>,
) -> Result<Json<serde_json::Value>> {
    if post.title.trim().is_empty() {
        return Err(AppError::BadRequest("Titre requis".to_string()));
    }
    if post.slug.trim().is_empty() {
        post.slug = slugify(&post.title);
    }
    if post.id.trim().is_empty() {
        post.id = post.slug.clone();
    }
    if post.date.is_empty() {
        post.date = chrono::Utc::now().format("%Y-%m-%d").to_string();
    }

    let post = repo(&state)
        .modify(move |posts| {
            if posts.iter().any(|p| p.slug == post.slug || p.id == post.id) {
                return Err(RepositoryError::Conflict(SLUG_TAKEN.to_string()));
            }
            posts.push(post.clone());
            Ok(post)
        })
        .await?;

    tracing::info!(post_id = %post.id, published = post.published, "Blog post created");
    Ok(Json(json!({ "post": post })))
}

/// PUT /api/blog/{id}
#[instrument(skip(state, session, patch), fields(user = %session.email))]
pub async fn update(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<BlogPostPatch>,
) -> Result<Json<serde_json::Value>> {
    let post = repo(&state)
        .modify(move |posts| {
            if let Some(slug) = &patch.slug
                && posts.iter().any(|p| &p.slug == slug && p.id != id)
            {
                return Err(RepositoryError::Conflict(SLUG_TAKEN.to_string()));
            }
            let post = posts
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or(RepositoryError::NotFound)?;
            patch.apply(post);
            Ok(post.clone())
        })
        .await
        .map_err(not_found)?;

    Ok(Json(json!({ "post": post })))
}

/// DELETE /api/blog/{id}
#[instrument(skip(state, session), fields(user = %session.email))]
pub async fn remove(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    repo(&state)
        .modify(move |posts| {
            let pos = posts
                .iter()
                .position(|p| p.id == id)
                .ok_or(RepositoryError::NotFound)?;
            posts.remove(pos);
            Ok(())
        })
        .await
        .map_err(not_found)?;

    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{Method, StatusCode};

    use super::super::testing::TestApp;

    #[tokio::test]
    async fn test_drafts_hidden_without_session() {
        let app = TestApp::new();
        let session = app.session_for("editor@angelivisions.com");

        let res = app
            .request(
                Method::POST,
                "/api/blog",
                Some(r#"{"title":"Coulisses du festival","published":false,"date":"2030-01-01"}"#),
                Some(&session),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["post"]["slug"], "coulisses-du-festival");
        assert_eq!(res.body["post"]["id"], "coulisses-du-festival");

        let public = app.get("/api/blog").await;
        assert!(
            public.body["posts"]
                .as_array()
                .unwrap()
                .iter()
                .all(|p| p["published"] == true)
        );
        let res = app.get("/api/blog/coulisses-du-festival").await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);

        let res = app
            .request(Method::GET, "/api/blog", None, Some(&session))
            .await;
        assert_eq!(res.body["posts"][0]["slug"], "coulisses-du-festival");
        let res = app
            .request(Method::GET, "/api/blog/coulisses-du-festival", None, Some(&session))
            .await;
        assert_eq!(res.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_duplicate_slug_conflicts() {
        let app = TestApp::new();
        let session = app.session_for("editor@angelivisions.com");
        let body = r#"{"title":"Nouvelle saison"}"#;
        let first = app.request(Method::POST, "/api/blog", Some(body), Some(&session)).await;
        assert_eq!(first.status, StatusCode::OK);
        let second = app.request(Method::POST, "/api/blog", Some(body), Some(&session)).await;
        assert_eq!(second.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let app = TestApp::new();
        let session = app.session_for("editor@angelivisions.com");
        app.request(Method::POST, "/api/blog", Some(r#"{"title":"Brouillon"}"#), Some(&session))
            .await;

        let res = app
            .request(
                Method::PUT,
                "/api/blog/brouillon",
                Some(r#"{"excerpt":"Résumé","published":false}"#),
                Some(&session),
            )
            .await;
        assert_eq!(res.body["post"]["excerpt"], "Résumé");
        assert_eq!(res.body["post"]["published"], false);

        let res = app
            .request(Method::DELETE, "/api/blog/brouillon", None, Some(&session))
            .await;
        assert_eq!(res.body["success"], true);
        let res = app
            .request(Method::DELETE, "/api/blog/brouillon", None, Some(&session))
            .await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }
}
