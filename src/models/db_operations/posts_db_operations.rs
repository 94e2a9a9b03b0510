use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension, Row};
use uuid::Uuid;

use crate::models::db_operations::tags_db_operations;
use crate::models::slug::{dedupe_slug, slugify};
use crate::models::{EditLogEntry, Post, PostStatus, PostSummary};

/// Fields an author supplies when creating or editing a post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub tag_ids: Vec<i64>,
}

/// Just enough of a post to run permission and workflow checks.
#[derive(Debug, Clone)]
pub struct PostRef {
    pub id: String,
    pub author_id: i64,
    pub status: PostStatus,
}

#[derive(Debug, Default, Clone)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub author_id: Option<i64>,
    pub tag_slug: Option<String>,
    pub title_query: Option<String>,
}

const SUMMARY_COLUMNS: &str = "p.id, p.slug, p.title, p.excerpt, p.cover_image, p.status, p.author_id, \
     u.name, p.published_at, p.created_at, p.updated_at";

fn map_summary(row: &Row) -> rusqlite::Result<PostSummary> {
    Ok(PostSummary {
        id: row.get(0)?,
        slug: row.get(1)?,
        title: row.get(2)?,
        excerpt: row.get(3)?,
        cover_image: row.get(4)?,
        status: row.get(5)?,
        author_id: row.get(6)?,
        author_name: row.get(7)?,
        published_at: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn slug_taken(conn: &Connection, slug: &str) -> rusqlite::Result<bool> {
    conn.query_row("SELECT EXISTS(SELECT 1 FROM posts WHERE slug = ?1)", [slug], |row| row.get(0))
}

fn link_tags(conn: &Connection, post_id: &str, tag_ids: &[i64]) -> Result<(), RusqliteError> {
    conn.execute("DELETE FROM post_tags WHERE post_id = ?1", [post_id])?;
    let mut stmt = conn.prepare("INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?1, ?2)")?;
    for tag_id in tag_ids {
        stmt.execute(params![post_id, tag_id])?;
    }
    Ok(())
}

// ====================================================================
// ========================= WRITE OPERATIONS =========================
// ====================================================================

/// Creates a DRAFT post and returns its id. The slug is derived from the
/// title once and never changes afterwards.
pub fn create_post(conn: &Connection, author_id: i64, post: &NewPost) -> Result<String, RusqliteError> {
    let post_id = Uuid::new_v4().to_string();
    let now = Utc::now();

    let tx = conn.unchecked_transaction()?;
    let slug = dedupe_slug(&slugify(&post.title), |s| slug_taken(&tx, s))?;
    tx.execute(
        "INSERT INTO posts (id, slug, title, content, excerpt, cover_image, status, author_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            post_id,
            slug,
            post.title,
            post.content,
            post.excerpt,
            post.cover_image,
            PostStatus::Draft,
            author_id,
            now
        ],
    )?;
    link_tags(&tx, &post_id, &post.tag_ids)?;
    tx.commit()?;

    Ok(post_id)
}

/// Replaces a post's editable fields and tags, recording the edit.
/// Runs inside the caller's transaction, which also holds the permission
/// check, so the status seen by the check is the one being edited.
pub fn update_post(
    conn: &Connection,
    post_id: &str,
    post: &NewPost,
    editor_id: i64,
    admin_override: bool,
) -> Result<usize, RusqliteError> {
    let changed = conn.execute(
        "UPDATE posts SET title = ?1, content = ?2, excerpt = ?3, cover_image = ?4, updated_at = ?5 WHERE id = ?6",
        params![post.title, post.content, post.excerpt, post.cover_image, Utc::now(), post_id],
    )?;
    if changed > 0 {
        link_tags(conn, post_id, &post.tag_ids)?;
        append_to_edit_log(conn, post_id, editor_id, admin_override)?;
    }
    Ok(changed)
}

pub fn set_post_status(
    conn: &Connection,
    post_id: &str,
    status: PostStatus,
    published_at: Option<DateTime<Utc>>,
) -> Result<usize, RusqliteError> {
    match published_at {
        Some(ts) => conn.execute(
            "UPDATE posts SET status = ?1, published_at = ?2, updated_at = ?2 WHERE id = ?3",
            params![status, ts, post_id],
        ),
        None => conn.execute(
            "UPDATE posts SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status, Utc::now(), post_id],
        ),
    }
}

/// Deleting a post cascades to its tag links, comments and publish requests.
pub fn delete_post(conn: &Connection, post_id: &str) -> Result<usize, RusqliteError> {
    conn.execute("DELETE FROM posts WHERE id = ?1", [post_id])
}

/// Deletes every id with one prepared statement. Runs inside the caller's
/// transaction so the permission checks and the deletes commit together.
pub fn delete_posts(conn: &Connection, post_ids: &[String]) -> Result<usize, RusqliteError> {
    let mut stmt = conn.prepare("DELETE FROM posts WHERE id = ?1")?;
    let mut deleted = 0;
    for post_id in post_ids {
        deleted += stmt.execute([post_id])?;
    }
    Ok(deleted)
}

pub fn increment_views(conn: &Connection, post_id: &str) -> Result<(), RusqliteError> {
    conn.execute("UPDATE posts SET views = views + 1 WHERE id = ?1", [post_id])?;
    Ok(())
}

pub fn append_to_edit_log(
    conn: &Connection,
    post_id: &str,
    editor_id: i64,
    admin_override: bool,
) -> Result<(), RusqliteError> {
    let mut log = read_edit_log(conn, post_id)?;

    log.push(EditLogEntry {
        edit_number: (log.len() as u32) + 1,
        editor_id,
        edited_at: Utc::now(),
        admin_override,
    });

    let new_log_json =
        serde_json::to_string(&log).map_err(|e| RusqliteError::ToSqlConversionFailure(Box::new(e)))?;
    conn.execute(
        "UPDATE posts SET edit_log = ?1 WHERE id = ?2",
        params![new_log_json, post_id],
    )?;
    Ok(())
}

// ====================================================================
// ========================== READ OPERATIONS =========================
// ====================================================================

pub fn read_edit_log(conn: &Connection, post_id: &str) -> Result<Vec<EditLogEntry>, RusqliteError> {
    let current_log_json: Option<Option<String>> = conn
        .query_row("SELECT edit_log FROM posts WHERE id = ?1", [post_id], |row| row.get(0))
        .optional()?;

    Ok(match current_log_json.flatten() {
        Some(json_str) if !json_str.is_empty() => serde_json::from_str(&json_str).unwrap_or_else(|e| {
            log::warn!("Discarding unreadable edit log for post {}: {}", post_id, e);
            Vec::new()
        }),
        _ => Vec::new(),
    })
}

pub fn read_post_ref(conn: &Connection, post_id: &str) -> Result<Option<PostRef>, RusqliteError> {
    conn.query_row(
        "SELECT id, author_id, status FROM posts WHERE id = ?1",
        [post_id],
        |row| {
            Ok(PostRef {
                id: row.get(0)?,
                author_id: row.get(1)?,
                status: row.get(2)?,
            })
        },
    )
    .optional()
}

fn read_post_where(conn: &Connection, column: &str, value: &str) -> Result<Option<Post>, RusqliteError> {
    let post = conn
        .query_row(
            &format!(
                "SELECT p.id, p.slug, p.title, p.content, p.excerpt, p.cover_image, p.status, p.views,
                        p.author_id, u.name, p.published_at, p.created_at, p.updated_at
                 FROM posts p JOIN users u ON u.id = p.author_id
                 WHERE p.{} = ?1",
                column
            ),
            [value],
            |row| {
                Ok(Post {
                    id: row.get(0)?,
                    slug: row.get(1)?,
                    title: row.get(2)?,
                    content: row.get(3)?,
                    excerpt: row.get(4)?,
                    cover_image: row.get(5)?,
                    status: row.get(6)?,
                    views: row.get(7)?,
                    author_id: row.get(8)?,
                    author_name: row.get(9)?,
                    published_at: row.get(10)?,
                    created_at: row.get(11)?,
                    updated_at: row.get(12)?,
                    tags: Vec::new(),
                })
            },
        )
        .optional()?;

    match post {
        Some(mut post) => {
            post.tags = tags_db_operations::read_tags_for_post(conn, &post.id)?;
            Ok(Some(post))
        }
        None => Ok(None),
    }
}

pub fn read_post(conn: &Connection, post_id: &str) -> Result<Option<Post>, RusqliteError> {
    read_post_where(conn, "id", post_id)
}

pub fn read_post_by_slug(conn: &Connection, slug: &str) -> Result<Option<Post>, RusqliteError> {
    read_post_where(conn, "slug", slug)
}

/// Escapes `LIKE` wildcards so a title search matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Lists posts matching `filter`, newest first (published date, then last edit).
pub fn read_post_summaries(
    conn: &Connection,
    filter: &PostFilter,
    limit: u32,
    offset: i64,
) -> Result<Vec<PostSummary>, RusqliteError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id
         WHERE (?1 IS NULL OR p.status = ?1)
           AND (?2 IS NULL OR p.author_id = ?2)
           AND (?3 IS NULL OR EXISTS (
                SELECT 1 FROM post_tags pt JOIN tags t ON t.id = pt.tag_id
                WHERE pt.post_id = p.id AND t.slug = ?3))
           AND (?4 IS NULL OR p.title LIKE '%' || ?4 || '%' ESCAPE '\\')
         ORDER BY COALESCE(p.published_at, p.updated_at) DESC, p.id
         LIMIT ?5 OFFSET ?6",
        SUMMARY_COLUMNS
    ))?;
    let posts = stmt
        .query_map(
            params![
                filter.status,
                filter.author_id,
                filter.tag_slug,
                filter.title_query.as_deref().map(escape_like),
                limit,
                offset
            ],
            map_summary,
        )?
        .collect();
    posts
}

pub fn count_posts_by_status(conn: &Connection) -> Result<Vec<(PostStatus, i64)>, RusqliteError> {
    let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM posts GROUP BY status ORDER BY status")?;
    let counts = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?.collect();
    counts
}

pub fn total_views(conn: &Connection) -> Result<i64, RusqliteError> {
    conn.query_row("SELECT COALESCE(SUM(views), 0) FROM posts", [], |row| row.get(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::db_operations::test_support::{seed_post, seed_user, test_conn};
    use crate::models::Role;

    #[test]
    fn create_post_starts_as_draft_with_unique_slug() {
        let conn = test_conn();
        let author = seed_user(&conn, "author@example.com", Role::Author);

        let first = seed_post(&conn, &author, "Hello World");
        let second = seed_post(&conn, &author, "Hello, world!");

        assert_eq!(first.status, PostStatus::Draft);
        assert_eq!(first.slug, "hello-world");
        assert_eq!(second.slug, "hello-world-2");
        assert!(first.published_at.is_none());
        assert_eq!(first.views, 0);
    }

    #[test]
    fn update_keeps_slug_and_records_edit() {
        let conn = test_conn();
        let author = seed_user(&conn, "author@example.com", Role::Author);
        let post = seed_post(&conn, &author, "Original");

        let edit = NewPost {
            title: "Renamed".to_string(),
            content: "New body".to_string(),
            excerpt: Some("short".to_string()),
            cover_image: None,
            tag_ids: vec![],
        };
        assert_eq!(update_post(&conn, &post.id, &edit, author.id, false).unwrap(), 1);

        let updated = read_post(&conn, &post.id).unwrap().unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.slug, "original");

        let log = read_edit_log(&conn, &post.id).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].edit_number, 1);
        assert!(!log[0].admin_override);
    }

    #[test]
    fn summaries_filter_by_status_author_and_title() {
        let conn = test_conn();
        let a = seed_user(&conn, "a@example.com", Role::Author);
        let b = seed_user(&conn, "b@example.com", Role::Author);
        let p1 = seed_post(&conn, &a, "Rust ownership");
        seed_post(&conn, &a, "Gardening");
        seed_post(&conn, &b, "Rust lifetimes");
        set_post_status(&conn, &p1.id, PostStatus::Published, Some(Utc::now())).unwrap();

        let published = PostFilter { status: Some(PostStatus::Published), ..Default::default() };
        assert_eq!(read_post_summaries(&conn, &published, 10, 0).unwrap().len(), 1);

        let by_a = PostFilter { author_id: Some(a.id), ..Default::default() };
        assert_eq!(read_post_summaries(&conn, &by_a, 10, 0).unwrap().len(), 2);

        let rust = PostFilter { title_query: Some("Rust".to_string()), ..Default::default() };
        assert_eq!(read_post_summaries(&conn, &rust, 10, 0).unwrap().len(), 2);
        assert_eq!(read_post_summaries(&conn, &rust, 1, 1).unwrap().len(), 1);
    }

    #[test]
    fn views_only_go_up() {
        let conn = test_conn();
        let author = seed_user(&conn, "author@example.com", Role::Author);
        let post = seed_post(&conn, &author, "Counted");
        increment_views(&conn, &post.id).unwrap();
        increment_views(&conn, &post.id).unwrap();
        assert_eq!(read_post(&conn, &post.id).unwrap().unwrap().views, 2);
        assert_eq!(total_views(&conn).unwrap(), 2);
    }

    #[test]
    fn delete_posts_skips_unknown_ids() {
        let conn = test_conn();
        let author = seed_user(&conn, "author@example.com", Role::Author);
        let p1 = seed_post(&conn, &author, "One");
        let p2 = seed_post(&conn, &author, "Two");
        let deleted = delete_posts(&conn, &[p1.id.clone(), p2.id.clone(), "missing".to_string()]).unwrap();
        assert_eq!(deleted, 2);
        assert!(read_post_ref(&conn, &p1.id).unwrap().is_none());
    }

    #[test]
    fn title_search_treats_wildcards_literally() {
        let conn = test_conn();
        let author = seed_user(&conn, "a@example.com", Role::Author);
        seed_post(&conn, &author, "100% Rust");
        seed_post(&conn, &author, "snake_case names");
        seed_post(&conn, &author, "Plain title");

        let search = |q: &str| PostFilter { title_query: Some(q.to_string()), ..PostFilter::default() };
        let titles = |q: &str| -> Vec<String> {
            read_post_summaries(&conn, &search(q), 10, 0)
                .unwrap()
                .into_iter()
                .map(|p| p.title)
                .collect()
        };
        assert_eq!(titles("%"), vec!["100% Rust".to_string()]);
        assert_eq!(titles("_"), vec!["snake_case names".to_string()]);
        assert_eq!(titles("plain").len(), 1);
    }
}
