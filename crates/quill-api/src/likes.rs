use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde_json::json;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::Session;

/// POST /{id}/like: records a like and returns the new count.
// TODO: decide whether repeat likes from the same user should collapse
// into a single row; today every call counts.
pub async fn create(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let user = session.require()?;

    let post = state.db.get_post(post_id)?.ok_or(ApiError::AccessDenied)?;

    state.db.create_like(post.id, user.id)?;
    let like_count = state.db.count_likes_for_post(post.id)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "post_id": post.id, "like_count": like_count })),
    ))
}
