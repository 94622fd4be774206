use anyhow::anyhow;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde_json::json;

use quill_db::models::CommentRow;
use quill_types::api::{CommentRequest, ValidationResult};
use quill_types::models::Comment;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::Session;
use crate::parse_timestamp;

/// POST /{id}/comment: any logged-in user may comment on any post.
pub async fn create(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Extension(session): Extension<Session>,
    Json(req): Json<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = session.require()?;
    validate_comment_form(&req)?;

    // Pre-check for a clean 404; the foreign key backstops the race.
    let post = state.db.get_post(post_id)?.ok_or(ApiError::AccessDenied)?;

    let id = state.db.create_comment(post.id, &req.content, user.id)?;
    let row = state
        .db
        .get_comment(id)?
        .ok_or_else(|| anyhow!("comment {} missing right after insert", id))?;

    Ok((StatusCode::CREATED, Json(to_wire(row))))
}

/// GET /comment/{id}/update: the comment for the edit form, owner only.
pub async fn edit_form(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let user = session.require()?;

    let row = state.db.get_comment(id)?.ok_or(ApiError::AccessDenied)?;
    if !row.is_owned_by(user.id) {
        return Err(ApiError::AccessDenied);
    }

    Ok(Json(to_wire(row)))
}

/// POST /comment/{id}/update: owner only.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(session): Extension<Session>,
    Json(req): Json<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = session.require()?;
    validate_comment_form(&req)?;

    let row = state.db.get_comment(id)?.ok_or(ApiError::AccessDenied)?;
    if !row.is_owned_by(user.id) {
        return Err(ApiError::AccessDenied);
    }

    state
        .db
        .update_comment(id, &req.content)?
        .ok_or(ApiError::AccessDenied)?;

    let row = state.db.get_comment(id)?.ok_or(ApiError::AccessDenied)?;
    Ok(Json(to_wire(row)))
}

/// POST /comment/{id}/delete: owner only.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let user = session.require()?;

    let row = state.db.get_comment(id)?.ok_or(ApiError::AccessDenied)?;
    if !row.is_owned_by(user.id) {
        return Err(ApiError::AccessDenied);
    }

    if !state.db.delete_comment(id)? {
        return Err(ApiError::AccessDenied);
    }

    Ok(Json(json!({ "deleted": true })))
}

fn validate_comment_form(req: &CommentRequest) -> Result<(), ApiError> {
    if req.content.is_empty() {
        let mut errors = ValidationResult::new();
        errors.add("content", "We need some content.");
        return Err(ApiError::Validation(errors));
    }
    Ok(())
}

pub(crate) fn to_wire(row: CommentRow) -> Comment {
    let context = format!("comment {}", row.id);
    Comment {
        id: row.id,
        post_id: row.post_id,
        author_id: row.author_id,
        author_username: row.author_username,
        content: row.content,
        created: parse_timestamp(&row.created, &context),
        last_modified: parse_timestamp(&row.last_modified, &context),
    }
}
