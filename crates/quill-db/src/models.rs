//! Row types mapped one-to-one onto SQLite rows, kept separate from the
//! quill-types wire models so the store layer stands alone. Timestamps
//! stay as stored RFC 3339 strings here; the API layer parses them.

pub struct UserRow {
    pub id: i64,
    pub username: String,
    /// Stored in `"<hexdigest>,<salt>"` format.
    pub password: String,
    pub created: String,
    pub last_modified: String,
}

pub struct PostRow {
    pub id: i64,
    pub subject: String,
    pub content: String,
    pub author_id: i64,
    pub author_username: String,
    pub created: String,
    pub last_modified: String,
}

impl PostRow {
    /// Only the author may update or delete a post.
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.author_id == user_id
    }
}

pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub content: String,
    pub created: String,
    pub last_modified: String,
}

impl CommentRow {
    /// Only the author may update or delete a comment.
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.author_id == user_id
    }
}
