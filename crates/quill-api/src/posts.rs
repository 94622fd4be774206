use std::collections::HashMap;

use anyhow::anyhow;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::json;

use quill_db::models::PostRow;
use quill_types::api::{PostDetailResponse, PostRequest, ValidationResult};
use quill_types::models::Post;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::Session;
use crate::{comments, parse_timestamp};

/// The front page shows at most this many posts, newest first.
const FRONT_PAGE_LIMIT: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    FRONT_PAGE_LIMIT
}

/// GET /: recent posts with their like counts.
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.min(FRONT_PAGE_LIMIT);

    // Run blocking DB reads off the async runtime
    let db = state.clone();
    let (rows, counts) = tokio::task::spawn_blocking(move || {
        let rows = db.db.list_posts(limit)?;
        let post_ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let counts = db.db.count_likes_for_posts(&post_ids)?;
        Ok::<_, anyhow::Error>((rows, counts))
    })
    .await
    .map_err(|e| anyhow!("spawn_blocking join error: {}", e))??;

    let like_counts: HashMap<i64, i64> = counts.into_iter().collect();
    let posts: Vec<Post> = rows
        .into_iter()
        .map(|row| {
            let likes = like_counts.get(&row.id).copied().unwrap_or(0);
            to_wire(row, likes)
        })
        .collect();

    Ok(Json(posts))
}

/// GET /{id}: one post with its like count and comment thread.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let (row, comment_rows, likes) = tokio::task::spawn_blocking(move || {
        let row = db.db.get_post(id)?;
        let comment_rows = db.db.list_comments_for_post(id)?;
        let likes = db.db.count_likes_for_post(id)?;
        Ok::<_, anyhow::Error>((row, comment_rows, likes))
    })
    .await
    .map_err(|e| anyhow!("spawn_blocking join error: {}", e))??;

    let row = row.ok_or(ApiError::AccessDenied)?;

    Ok(Json(PostDetailResponse {
        post: to_wire(row, likes),
        comments: comment_rows.into_iter().map(comments::to_wire).collect(),
    }))
}

/// GET /new_post: nothing to prefill, but the form is login-only.
pub async fn new_form(Extension(session): Extension<Session>) -> Result<StatusCode, ApiError> {
    session.require()?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /new_post
pub async fn create(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<PostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = session.require()?;
    validate_post_form(&req)?;

    let id = state.db.create_post(&req.subject, &req.content, user.id)?;
    let row = state
        .db
        .get_post(id)?
        .ok_or_else(|| anyhow!("post {} missing right after insert", id))?;

    Ok((StatusCode::CREATED, Json(to_wire(row, 0))))
}

/// GET /{id}/update: the post for the edit form, owner only.
pub async fn edit_form(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let user = session.require()?;

    let row = state.db.get_post(id)?.ok_or(ApiError::AccessDenied)?;
    if !row.is_owned_by(user.id) {
        return Err(ApiError::AccessDenied);
    }

    let likes = state.db.count_likes_for_post(id)?;
    Ok(Json(to_wire(row, likes)))
}

/// POST /{id}/update: owner only.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(session): Extension<Session>,
    Json(req): Json<PostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = session.require()?;
    validate_post_form(&req)?;

    let row = state.db.get_post(id)?.ok_or(ApiError::AccessDenied)?;
    if !row.is_owned_by(user.id) {
        return Err(ApiError::AccessDenied);
    }

    state
        .db
        .update_post(id, &req.subject, &req.content)?
        .ok_or(ApiError::AccessDenied)?;

    let row = state.db.get_post(id)?.ok_or(ApiError::AccessDenied)?;
    let likes = state.db.count_likes_for_post(id)?;
    Ok(Json(to_wire(row, likes)))
}

/// POST /{id}/delete: owner only. Comments and likes go with the post.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let user = session.require()?;

    let row = state.db.get_post(id)?.ok_or(ApiError::AccessDenied)?;
    if !row.is_owned_by(user.id) {
        return Err(ApiError::AccessDenied);
    }

    if !state.db.delete_post(id)? {
        return Err(ApiError::AccessDenied);
    }

    Ok(Json(json!({ "deleted": true })))
}

fn validate_post_form(req: &PostRequest) -> Result<(), ApiError> {
    let mut errors = ValidationResult::new();
    if req.subject.is_empty() {
        errors.add("subject", "We need a title for the post.");
    }
    if req.content.is_empty() {
        errors.add("content", "We need some content.");
    }

    if errors.is_ok() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

fn to_wire(row: PostRow, like_count: i64) -> Post {
    let context = format!("post {}", row.id);
    Post {
        id: row.id,
        subject: row.subject,
        content: row.content,
        author_id: row.author_id,
        author_username: row.author_username,
        like_count,
        created: parse_timestamp(&row.created, &context),
        last_modified: parse_timestamp(&row.last_modified, &context),
    }
}
