use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Comment, Post, User};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    pub verify: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user_id: i64,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub user: Option<User>,
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostRequest {
    pub subject: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct PostDetailResponse {
    pub post: Post,
    pub comments: Vec<Comment>,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommentRequest {
    pub content: String,
}

// -- Validation --

/// Field-scoped validation errors, keyed by form field name. A failed
/// validation pass reports every offending field at once so the client can
/// annotate the whole form in a single round-trip.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ValidationResult {
    pub errors_by_field: BTreeMap<String, String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors_by_field.insert(field.to_string(), message.into());
    }

    pub fn is_ok(&self) -> bool {
        self.errors_by_field.is_empty()
    }
}
