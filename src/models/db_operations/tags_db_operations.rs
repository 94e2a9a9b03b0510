use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension, Row};

use crate::models::{Tag, TagWithCount};

fn map_tag(row: &Row) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
    })
}

pub fn create_tag(
    conn: &Connection,
    name: &str,
    slug: &str,
    description: Option<&str>,
) -> Result<i64, RusqliteError> {
    conn.execute(
        "INSERT INTO tags (name, slug, description) VALUES (?1, ?2, ?3)",
        params![name, slug, description],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_tag(
    conn: &Connection,
    tag_id: i64,
    name: &str,
    slug: &str,
    description: Option<&str>,
) -> Result<usize, RusqliteError> {
    conn.execute(
        "UPDATE tags SET name = ?1, slug = ?2, description = ?3 WHERE id = ?4",
        params![name, slug, description, tag_id],
    )
}

pub fn delete_tag(conn: &Connection, tag_id: i64) -> Result<usize, RusqliteError> {
    conn.execute("DELETE FROM tags WHERE id = ?1", [tag_id])
}

pub fn read_tag(conn: &Connection, tag_id: i64) -> Result<Option<Tag>, RusqliteError> {
    conn.query_row(
        "SELECT id, name, slug, description FROM tags WHERE id = ?1",
        [tag_id],
        map_tag,
    )
    .optional()
}

/// All tags with the number of PUBLISHED posts carrying each one.
pub fn read_all_tags(conn: &Connection) -> Result<Vec<TagWithCount>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name, t.slug, t.description,
                (SELECT COUNT(*) FROM post_tags pt JOIN posts p ON p.id = pt.post_id
                 WHERE pt.tag_id = t.id AND p.status = 'PUBLISHED')
         FROM tags t ORDER BY t.name COLLATE NOCASE",
    )?;
    let tags = stmt
        .query_map([], |row| {
            Ok(TagWithCount {
                tag: map_tag(row)?,
                post_count: row.get(4)?,
            })
        })?
        .collect();
    tags
}

pub fn read_tags_for_post(conn: &Connection, post_id: &str) -> Result<Vec<Tag>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name, t.slug, t.description FROM tags t
         JOIN post_tags pt ON pt.tag_id = t.id
         WHERE pt.post_id = ?1 ORDER BY t.name COLLATE NOCASE",
    )?;
    let tags = stmt.query_map([post_id], map_tag)?.collect();
    tags
}

/// Returns the ids from `tag_ids` that do not exist.
pub fn missing_tag_ids(conn: &Connection, tag_ids: &[i64]) -> Result<Vec<i64>, RusqliteError> {
    let mut stmt = conn.prepare("SELECT EXISTS(SELECT 1 FROM tags WHERE id = ?1)")?;
    let mut missing = Vec::new();
    for id in tag_ids {
        let exists: bool = stmt.query_row([id], |row| row.get(0))?;
        if !exists {
            missing.push(*id);
        }
    }
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::db_operations::posts_db_operations::{self, NewPost};
    use crate::models::db_operations::test_support::{seed_user, test_conn};
    use crate::models::{PostStatus, Role};

    #[test]
    fn duplicate_names_are_rejected_case_insensitively() {
        let conn = test_conn();
        create_tag(&conn, "Rust", "rust", None).unwrap();
        assert!(create_tag(&conn, "rust", "rust-2", None).is_err());
    }

    #[test]
    fn counts_only_published_posts_and_cascades_on_delete() {
        let conn = test_conn();
        let author = seed_user(&conn, "a@example.com", Role::Author);
        let rust = create_tag(&conn, "Rust", "rust", Some("Systems language")).unwrap();

        let post = NewPost {
            title: "Tagged".to_string(),
            content: "x".to_string(),
            excerpt: None,
            cover_image: None,
            tag_ids: vec![rust],
        };
        let draft = posts_db_operations::create_post(&conn, author.id, &post).unwrap();
        let live = posts_db_operations::create_post(&conn, author.id, &post).unwrap();
        posts_db_operations::set_post_status(&conn, &live, PostStatus::Published, Some(chrono::Utc::now()))
            .unwrap();

        let all = read_all_tags(&conn).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].post_count, 1);
        assert_eq!(read_tags_for_post(&conn, &draft).unwrap().len(), 1);

        assert_eq!(delete_tag(&conn, rust).unwrap(), 1);
        assert!(read_tags_for_post(&conn, &draft).unwrap().is_empty());
    }

    #[test]
    fn reports_missing_ids() {
        let conn = test_conn();
        let id = create_tag(&conn, "Go", "go", None).unwrap();
        assert_eq!(missing_tag_ids(&conn, &[id, id + 100]).unwrap(), vec![id + 100]);
    }
}
