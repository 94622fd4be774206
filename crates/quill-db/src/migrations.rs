use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            username      TEXT NOT NULL UNIQUE,
            password      TEXT NOT NULL,
            created       TEXT NOT NULL,
            last_modified TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS posts (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            subject       TEXT NOT NULL,
            content       TEXT NOT NULL,
            author_id     INTEGER NOT NULL REFERENCES users(id),
            created       TEXT NOT NULL,
            last_modified TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_posts_created
            ON posts(created);

        CREATE TABLE IF NOT EXISTS comments (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id       INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            author_id     INTEGER NOT NULL REFERENCES users(id),
            content       TEXT NOT NULL,
            created       TEXT NOT NULL,
            last_modified TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_comments_post
            ON comments(post_id, created);

        -- No UNIQUE(post_id, user_id): a user may like a post repeatedly.
        CREATE TABLE IF NOT EXISTS likes (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id       INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            user_id       INTEGER NOT NULL REFERENCES users(id),
            created       TEXT NOT NULL,
            last_modified TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_likes_post
            ON likes(post_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
