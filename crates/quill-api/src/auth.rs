use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use quill_auth::SecurityContext;
use quill_auth::password;
use quill_db::Database;
use quill_types::api::{AccountResponse, AuthResponse, LoginRequest, SignupRequest, ValidationResult};
use quill_types::models::User;

use crate::error::ApiError;
use crate::middleware::{SESSION_COOKIE, Session};
use crate::parse_timestamp;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub security: SecurityContext,
}

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = ValidationResult::new();

    if !password::valid_username(&req.username) {
        errors.add("username", "That is not a valid username.");
    }
    if !password::valid_password(&req.password) {
        errors.add("password", "That wasn't a valid password.");
    } else if req.password != req.verify {
        errors.add("verify", "Your passwords did not match.");
    }
    if !password::valid_email(&req.email) {
        errors.add("email", "That's not a valid email.");
    }
    if state.db.user_exists(&req.username)? {
        errors.add("username", "Username has been taken.");
    }

    if !errors.is_ok() {
        return Err(ApiError::Validation(errors));
    }

    // Check-then-insert: a losing racer hits the UNIQUE constraint instead.
    let hashed = password::hash_password(&req.username, &req.password, None);
    let user_id = state.db.create_user(&req.username, &hashed)?;

    let jar = jar.add(session_cookie(&state.security, user_id));
    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            user_id,
            username: req.username,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_username(&req.username)?
        .filter(|user| password::verify_password(&req.username, &req.password, &user.password))
        .ok_or(ApiError::BadCredentials)?;

    let jar = jar.add(session_cookie(&state.security, user.id));
    Ok((
        jar,
        Json(AuthResponse {
            user_id: user.id,
            username: user.username,
        }),
    ))
}

/// Clears the session cookie. Safe to call without one.
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, StatusCode::NO_CONTENT)
}

/// The profile/welcome payload; `user` is absent for anonymous visitors.
pub async fn account(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<AccountResponse>, ApiError> {
    let user = match &session.user {
        Some(current) => state.db.get_user_by_id(current.id)?.map(|row| User {
            id: row.id,
            username: row.username,
            created: parse_timestamp(&row.created, &format!("user {}", row.id)),
        }),
        None => None,
    };

    Ok(Json(AccountResponse { user }))
}

pub async fn signup_form() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn login_form() -> StatusCode {
    StatusCode::NO_CONTENT
}

fn session_cookie(security: &SecurityContext, user_id: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, security.sign(&user_id.to_string())))
        .path("/")
        .http_only(true)
        .build()
}
