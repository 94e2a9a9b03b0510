use chrono::Utc;
use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension, Row};

use crate::models::Comment;

const COMMENT_SELECT: &str = "SELECT c.id, c.content, c.author_id, u.name, c.post_id, c.created_at, c.updated_at
     FROM comments c JOIN users u ON u.id = c.author_id";

fn map_comment(row: &Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        content: row.get(1)?,
        author_id: row.get(2)?,
        author_name: row.get(3)?,
        post_id: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub fn create_comment(
    conn: &Connection,
    post_id: &str,
    author_id: i64,
    content: &str,
) -> Result<i64, RusqliteError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO comments (content, author_id, post_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
        params![content, author_id, post_id, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn read_comment(conn: &Connection, comment_id: i64) -> Result<Option<Comment>, RusqliteError> {
    conn.query_row(
        &format!("{} WHERE c.id = ?1", COMMENT_SELECT),
        [comment_id],
        map_comment,
    )
    .optional()
}

/// Oldest first, the order a thread is read in.
pub fn read_comments_for_post(conn: &Connection, post_id: &str) -> Result<Vec<Comment>, RusqliteError> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE c.post_id = ?1 ORDER BY c.created_at, c.id",
        COMMENT_SELECT
    ))?;
    let comments = stmt.query_map([post_id], map_comment)?.collect();
    comments
}

pub fn update_comment(conn: &Connection, comment_id: i64, content: &str) -> Result<usize, RusqliteError> {
    conn.execute(
        "UPDATE comments SET content = ?1, updated_at = ?2 WHERE id = ?3",
        params![content, Utc::now(), comment_id],
    )
}

pub fn delete_comment(conn: &Connection, comment_id: i64) -> Result<usize, RusqliteError> {
    conn.execute("DELETE FROM comments WHERE id = ?1", [comment_id])
}

pub fn count_comments(conn: &Connection) -> Result<i64, RusqliteError> {
    conn.query_row("SELECT COUNT(*) FROM comments", [], |row| row.get(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::db_operations::posts_db_operations;
    use crate::models::db_operations::test_support::{seed_post, seed_user, test_conn};
    use crate::models::Role;

    #[test]
    fn comments_round_through_their_post() {
        let conn = test_conn();
        let author = seed_user(&conn, "a@example.com", Role::Author);
        let reader = seed_user(&conn, "r@example.com", Role::Reader);
        let post = seed_post(&conn, &author, "Discussed");

        let first = create_comment(&conn, &post.id, reader.id, "First!").unwrap();
        create_comment(&conn, &post.id, author.id, "Thanks").unwrap();

        let thread = read_comments_for_post(&conn, &post.id).unwrap();
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].id, first);
        assert_eq!(thread[0].author_name, "r");

        assert_eq!(update_comment(&conn, first, "Edited").unwrap(), 1);
        assert_eq!(read_comment(&conn, first).unwrap().unwrap().content, "Edited");

        posts_db_operations::delete_post(&conn, &post.id).unwrap();
        assert_eq!(count_comments(&conn).unwrap(), 0);
    }
}
