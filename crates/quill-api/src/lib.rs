pub mod auth;
pub mod comments;
pub mod error;
pub mod likes;
pub mod middleware;
pub mod posts;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::auth::AppState;

/// The full HTTP surface. Every route runs behind `load_session`, which
/// resolves the signed `uid` cookie into a request-scoped identity.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(posts::index))
        .route("/new_post", get(posts::new_form).post(posts::create))
        .route("/{id}", get(posts::show))
        .route("/{id}/update", get(posts::edit_form).post(posts::update))
        .route("/{id}/delete", post(posts::delete))
        .route("/{id}/comment", post(comments::create))
        .route("/{id}/like", post(likes::create))
        .route(
            "/comment/{id}/update",
            get(comments::edit_form).post(comments::update),
        )
        .route("/comment/{id}/delete", post(comments::delete))
        .route("/account/signup", get(auth::signup_form).post(auth::signup))
        .route("/account", get(auth::account))
        .route("/account/login", get(auth::login_form).post(auth::login))
        .route("/account/logout", get(auth::logout))
        .layer(from_fn_with_state(state.clone(), middleware::load_session))
        .with_state(state)
}

/// Stored timestamps are RFC 3339 strings written by quill-db; anything
/// else in the column is corruption, logged and replaced with the epoch.
pub(crate) fn parse_timestamp(raw: &str, context: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>().unwrap_or_else(|e| {
        warn!("Corrupt timestamp '{}' on {}: {}", raw, context, e);
        DateTime::default()
    })
}
