use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use crate::auth::AppState;
use crate::error::ApiError;

pub const SESSION_COOKIE: &str = "uid";

#[derive(Debug, Clone)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
}

/// Request-scoped identity, inserted on every request by `load_session`.
/// `user` is `None` for anonymous visitors and for cookies that fail
/// signature verification or no longer resolve to a stored user.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user: Option<SessionUser>,
}

impl Session {
    /// The logged-in user, or the same opaque 404 any missing resource gets.
    pub fn require(&self) -> Result<&SessionUser, ApiError> {
        self.user.as_ref().ok_or(ApiError::AccessDenied)
    }
}

/// Resolve the signed `uid` cookie into a `Session` extension.
pub async fn load_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let user = resolve_session(&state, &jar);
    req.extensions_mut().insert(Session { user });
    next.run(req).await
}

fn resolve_session(state: &AppState, jar: &CookieJar) -> Option<SessionUser> {
    let token = jar.get(SESSION_COOKIE)?.value();
    let uid = state.security.verify(token)?;
    let id: i64 = uid.parse().ok()?;

    let row = match state.db.get_user_by_id(id) {
        Ok(row) => row?,
        Err(e) => {
            warn!("Session lookup failed for user {}: {}", id, e);
            return None;
        }
    };

    Some(SessionUser {
        id: row.id,
        username: row.username,
    })
}
