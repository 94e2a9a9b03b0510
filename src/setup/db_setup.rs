use rusqlite::Connection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Password hashing error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("{0}")]
    Invalid(String),
}

const TABLES: &[(&str, &str)] = &[
    (
        "users",
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE COLLATE NOCASE,
            name TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'READER' CHECK(role IN ('READER', 'AUTHOR', 'ADMIN')),
            email_verified INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            last_login_at TEXT
        )",
    ),
    (
        "posts",
        "CREATE TABLE IF NOT EXISTS posts (
            id TEXT PRIMARY KEY,
            slug TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            excerpt TEXT,
            cover_image TEXT,
            status TEXT NOT NULL DEFAULT 'DRAFT'
                CHECK(status IN ('DRAFT', 'PENDING_APPROVAL', 'PUBLISHED', 'REJECTED')),
            views INTEGER NOT NULL DEFAULT 0,
            author_id INTEGER NOT NULL,
            published_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            edit_log TEXT,
            FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE
        )",
    ),
    (
        "tags",
        "CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE,
            slug TEXT NOT NULL UNIQUE,
            description TEXT
        )",
    ),
    (
        "post_tags",
        "CREATE TABLE IF NOT EXISTS post_tags (
            post_id TEXT NOT NULL,
            tag_id INTEGER NOT NULL,
            PRIMARY KEY (post_id, tag_id),
            FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
        )",
    ),
    (
        "comments",
        "CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT NOT NULL,
            author_id INTEGER NOT NULL,
            post_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
        )",
    ),
    (
        "publish_requests",
        "CREATE TABLE IF NOT EXISTS publish_requests (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id TEXT NOT NULL,
            author_id INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'PENDING' CHECK(status IN ('PENDING', 'APPROVED', 'REJECTED')),
            message TEXT,
            reviewer_message TEXT,
            reviewer_id INTEGER,
            created_at TEXT NOT NULL,
            reviewed_at TEXT,
            FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE,
            FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (reviewer_id) REFERENCES users(id) ON DELETE SET NULL
        )",
    ),
    (
        "media_uploads",
        "CREATE TABLE IF NOT EXISTS media_uploads (
            id TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL,
            file_path TEXT NOT NULL,
            mime_type TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            uploaded_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
    ),
];

const INDEXES: &[&str] = &[
    // At most one open request per post.
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_publish_requests_one_pending
        ON publish_requests(post_id) WHERE status = 'PENDING'",
    "CREATE INDEX IF NOT EXISTS idx_posts_status_published ON posts(status, published_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id)",
    "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, created_at)",
];

/// Creates every table and index. Safe to run against an existing database.
pub fn setup_database(conn: &mut Connection) -> Result<(), SetupError> {
    let tx = conn.transaction()?;
    for (name, ddl) in TABLES {
        log::info!("Creating '{}' table...", name);
        tx.execute(ddl, [])?;
    }
    for ddl in INDEXES {
        tx.execute(ddl, [])?;
    }
    tx.commit()?;
    Ok(())
}
