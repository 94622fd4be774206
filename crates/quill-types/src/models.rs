use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created: DateTime<Utc>,
}

/// A blog post as it appears on the wire. `like_count` is denormalized at
/// read time; likes themselves never leave the store as rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub subject: String,
    pub content: String,
    pub author_id: i64,
    pub author_username: String,
    pub like_count: i64,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub content: String,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}
