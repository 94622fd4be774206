use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};

use crate::Database;
use crate::models::{CommentRow, PostRow, UserRow};

/// Write-side timestamp. RFC 3339 UTC with microseconds so lexicographic
/// order in the store matches chronological order.
fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl Database {
    // -- Users --

    /// Insert a new user, returning the store-assigned id. The username
    /// UNIQUE constraint rejects duplicates; callers are expected to have
    /// checked `user_exists` first (check-then-insert race is accepted).
    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let now = now();
            conn.execute(
                "INSERT INTO users (username, password, created, last_modified) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![username, password_hash, now, now],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn user_exists(&self, username: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM users WHERE username = ?1",
                    [username],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", &[&id]))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", &[&username]))
    }

    // -- Posts --

    pub fn create_post(&self, subject: &str, content: &str, author_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let now = now();
            conn.execute(
                "INSERT INTO posts (subject, content, author_id, created, last_modified) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![subject, content, author_id, now, now],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_post(&self, id: i64) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT p.id, p.subject, p.content, p.author_id, u.username, p.created, p.last_modified
                     FROM posts p
                     LEFT JOIN users u ON p.author_id = u.id
                     WHERE p.id = ?1",
                    [id],
                    post_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Overwrite subject/content and touch `last_modified`. Returns the id
    /// back, or `None` if no such post exists.
    pub fn update_post(&self, id: i64, subject: &str, content: &str) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE posts SET subject = ?1, content = ?2, last_modified = ?3 WHERE id = ?4",
                rusqlite::params![subject, content, now(), id],
            )?;
            Ok((changed > 0).then_some(id))
        })
    }

    /// Remove a post. Comments and likes referencing it go with it
    /// (ON DELETE CASCADE). True iff the post existed.
    pub fn delete_post(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    /// Most recent posts first; id breaks ties within a timestamp.
    pub fn list_posts(&self, limit: u32) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.subject, p.content, p.author_id, u.username, p.created, p.last_modified
                 FROM posts p
                 LEFT JOIN users u ON p.author_id = u.id
                 ORDER BY p.created DESC, p.id DESC
                 LIMIT ?1",
            )?;

            let rows = stmt
                .query_map([limit], post_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Comments --

    /// Insert a comment. The post_id foreign key rejects comments on posts
    /// that do not exist.
    pub fn create_comment(&self, post_id: i64, content: &str, author_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let now = now();
            conn.execute(
                "INSERT INTO comments (post_id, author_id, content, created, last_modified) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![post_id, author_id, content, now, now],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_comment(&self, id: i64) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT c.id, c.post_id, c.author_id, u.username, c.content, c.created, c.last_modified
                     FROM comments c
                     LEFT JOIN users u ON c.author_id = u.id
                     WHERE c.id = ?1",
                    [id],
                    comment_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Comment thread for a post, oldest first.
    pub fn list_comments_for_post(&self, post_id: i64) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.post_id, c.author_id, u.username, c.content, c.created, c.last_modified
                 FROM comments c
                 LEFT JOIN users u ON c.author_id = u.id
                 WHERE c.post_id = ?1
                 ORDER BY c.created ASC, c.id ASC",
            )?;

            let rows = stmt
                .query_map([post_id], comment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn update_comment(&self, id: i64, content: &str) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE comments SET content = ?1, last_modified = ?2 WHERE id = ?3",
                rusqlite::params![content, now(), id],
            )?;
            Ok((changed > 0).then_some(id))
        })
    }

    pub fn delete_comment(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    // -- Likes --

    /// Record a like. Nothing stops the same user liking the same post
    /// again; every call inserts a fresh row.
    pub fn create_like(&self, post_id: i64, user_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let now = now();
            conn.execute(
                "INSERT INTO likes (post_id, user_id, created, last_modified) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![post_id, user_id, now, now],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn count_likes_for_post(&self, post_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM likes WHERE post_id = ?1",
                [post_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Batch-count likes for a page of posts in one query.
    pub fn count_likes_for_posts(&self, post_ids: &[i64]) -> Result<Vec<(i64, i64)>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=post_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT post_id, COUNT(*) FROM likes WHERE post_id IN ({}) GROUP BY post_id",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = post_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn query_user(
    conn: &Connection,
    predicate: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, username, password, created, last_modified FROM users WHERE {}",
        predicate
    );

    let row = conn
        .query_row(&sql, params, |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                created: row.get(3)?,
                last_modified: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn post_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        subject: row.get(1)?,
        content: row.get(2)?,
        author_id: row.get(3)?,
        author_username: row
            .get::<_, Option<String>>(4)?
            .unwrap_or_else(|| "unknown".to_string()),
        created: row.get(5)?,
        last_modified: row.get(6)?,
    })
}

fn comment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        author_username: row
            .get::<_, Option<String>>(3)?
            .unwrap_or_else(|| "unknown".to_string()),
        content: row.get(4)?,
        created: row.get(5)?,
        last_modified: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::Database;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn seed_user(db: &Database, username: &str) -> i64 {
        db.create_user(username, "digest,salty").unwrap()
    }

    #[test]
    fn user_create_and_lookup() {
        let db = db();
        assert!(!db.user_exists("alice").unwrap());

        let id = seed_user(&db, "alice");
        assert!(db.user_exists("alice").unwrap());

        let by_id = db.get_user_by_id(id).unwrap().unwrap();
        assert_eq!(by_id.username, "alice");
        assert_eq!(by_id.password, "digest,salty");

        let by_name = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(by_name.id, id);

        assert!(db.get_user_by_id(id + 1).unwrap().is_none());
    }

    #[test]
    fn duplicate_username_rejected() {
        let db = db();
        seed_user(&db, "alice");
        assert!(db.create_user("alice", "other,salt").is_err());
    }

    #[test]
    fn post_roundtrip() {
        let db = db();
        let alice = seed_user(&db, "alice");

        let id = db.create_post("Hi", "Body", alice).unwrap();
        let post = db.get_post(id).unwrap().unwrap();

        assert_eq!(post.subject, "Hi");
        assert_eq!(post.content, "Body");
        assert_eq!(post.author_id, alice);
        assert_eq!(post.author_username, "alice");
    }

    #[test]
    fn post_requires_existing_author() {
        let db = db();
        assert!(db.create_post("Hi", "Body", 999).is_err());
    }

    #[test]
    fn update_post_overwrites_and_touches() {
        let db = db();
        let alice = seed_user(&db, "alice");
        let id = db.create_post("Hi", "Body", alice).unwrap();
        let before = db.get_post(id).unwrap().unwrap();

        assert_eq!(db.update_post(id, "Hi!", "Edited").unwrap(), Some(id));

        let after = db.get_post(id).unwrap().unwrap();
        assert_eq!(after.subject, "Hi!");
        assert_eq!(after.content, "Edited");
        assert_eq!(after.created, before.created);
        assert!(after.last_modified >= before.last_modified);

        assert_eq!(db.update_post(id + 1, "x", "y").unwrap(), None);
    }

    #[test]
    fn delete_post_and_refetch() {
        let db = db();
        let alice = seed_user(&db, "alice");
        let id = db.create_post("Hi", "Body", alice).unwrap();

        assert!(db.delete_post(id).unwrap());
        assert!(db.get_post(id).unwrap().is_none());
        assert!(!db.delete_post(id).unwrap());
    }

    #[test]
    fn delete_post_cascades_to_comments_and_likes() {
        let db = db();
        let alice = seed_user(&db, "alice");
        let post = db.create_post("Hi", "Body", alice).unwrap();
        let comment = db.create_comment(post, "Nice", alice).unwrap();
        db.create_like(post, alice).unwrap();

        assert!(db.delete_post(post).unwrap());
        assert!(db.get_comment(comment).unwrap().is_none());
        assert_eq!(db.count_likes_for_post(post).unwrap(), 0);
    }

    #[test]
    fn list_posts_newest_first_with_limit() {
        let db = db();
        let alice = seed_user(&db, "alice");
        for i in 0..12 {
            db.create_post(&format!("post-{}", i), "Body", alice).unwrap();
        }

        let page = db.list_posts(10).unwrap();
        assert_eq!(page.len(), 10);
        assert_eq!(page[0].subject, "post-11");
        assert_eq!(page[9].subject, "post-2");

        let all = db.list_posts(100).unwrap();
        assert_eq!(all.len(), 12);
    }

    #[test]
    fn comment_requires_existing_post() {
        let db = db();
        let alice = seed_user(&db, "alice");
        assert!(db.create_comment(999, "orphan", alice).is_err());
    }

    #[test]
    fn comment_lifecycle() {
        let db = db();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let post = db.create_post("Hi", "Body", alice).unwrap();

        let first = db.create_comment(post, "First", bob).unwrap();
        let second = db.create_comment(post, "Second", alice).unwrap();

        let thread = db.list_comments_for_post(post).unwrap();
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].id, first);
        assert_eq!(thread[0].author_username, "bob");
        assert_eq!(thread[1].id, second);

        assert_eq!(db.update_comment(first, "Edited").unwrap(), Some(first));
        assert_eq!(
            db.get_comment(first).unwrap().unwrap().content,
            "Edited"
        );
        assert_eq!(db.update_comment(9999, "x").unwrap(), None);

        assert!(db.delete_comment(first).unwrap());
        assert!(db.get_comment(first).unwrap().is_none());
        assert!(!db.delete_comment(first).unwrap());
    }

    #[test]
    fn likes_count_without_dedup() {
        let db = db();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let post = db.create_post("Hi", "Body", alice).unwrap();

        assert_eq!(db.count_likes_for_post(post).unwrap(), 0);

        db.create_like(post, bob).unwrap();
        db.create_like(post, bob).unwrap();
        db.create_like(post, alice).unwrap();

        // Repeat likes all count; deduplication is intentionally absent.
        assert_eq!(db.count_likes_for_post(post).unwrap(), 3);
    }

    #[test]
    fn batch_like_counts() {
        let db = db();
        let alice = seed_user(&db, "alice");
        let a = db.create_post("A", "Body", alice).unwrap();
        let b = db.create_post("B", "Body", alice).unwrap();
        let c = db.create_post("C", "Body", alice).unwrap();

        db.create_like(a, alice).unwrap();
        db.create_like(a, alice).unwrap();
        db.create_like(c, alice).unwrap();

        let mut counts = db.count_likes_for_posts(&[a, b, c]).unwrap();
        counts.sort();
        assert_eq!(counts, vec![(a, 2), (c, 1)]);

        assert!(db.count_likes_for_posts(&[]).unwrap().is_empty());
    }
}
