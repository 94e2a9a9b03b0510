use chrono::Utc;
use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension, Row};

use crate::models::{PublishRequest, RequestStatus};

const REQUEST_SELECT: &str = "SELECT r.id, r.post_id, p.title, r.author_id, u.name, r.status, r.message,
            r.reviewer_message, r.reviewer_id, r.created_at, r.reviewed_at
     FROM publish_requests r
     JOIN posts p ON p.id = r.post_id
     JOIN users u ON u.id = r.author_id";

fn map_request(row: &Row) -> rusqlite::Result<PublishRequest> {
    Ok(PublishRequest {
        id: row.get(0)?,
        post_id: row.get(1)?,
        post_title: row.get(2)?,
        author_id: row.get(3)?,
        author_name: row.get(4)?,
        status: row.get(5)?,
        message: row.get(6)?,
        reviewer_message: row.get(7)?,
        reviewer_id: row.get(8)?,
        created_at: row.get(9)?,
        reviewed_at: row.get(10)?,
    })
}

// None of these open their own transaction; the publish helpers wrap
// each workflow step together with the post status change.

pub fn insert_request(
    conn: &Connection,
    post_id: &str,
    author_id: i64,
    message: Option<&str>,
) -> Result<i64, RusqliteError> {
    conn.execute(
        "INSERT INTO publish_requests (post_id, author_id, status, message, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![post_id, author_id, RequestStatus::Pending, message, Utc::now()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Moves a PENDING request to its final status. Returns 0 when the
/// request was no longer pending.
pub fn resolve_request(
    conn: &Connection,
    request_id: i64,
    status: RequestStatus,
    reviewer_id: i64,
    reviewer_message: Option<&str>,
) -> Result<usize, RusqliteError> {
    conn.execute(
        "UPDATE publish_requests
         SET status = ?1, reviewer_id = ?2, reviewer_message = ?3, reviewed_at = ?4
         WHERE id = ?5 AND status = 'PENDING'",
        params![status, reviewer_id, reviewer_message, Utc::now(), request_id],
    )
}

pub fn delete_request(conn: &Connection, request_id: i64) -> Result<usize, RusqliteError> {
    conn.execute("DELETE FROM publish_requests WHERE id = ?1", [request_id])
}

pub fn read_request(conn: &Connection, request_id: i64) -> Result<Option<PublishRequest>, RusqliteError> {
    conn.query_row(
        &format!("{} WHERE r.id = ?1", REQUEST_SELECT),
        [request_id],
        map_request,
    )
    .optional()
}

pub fn read_pending_request_for_post(
    conn: &Connection,
    post_id: &str,
) -> Result<Option<PublishRequest>, RusqliteError> {
    conn.query_row(
        &format!("{} WHERE r.post_id = ?1 AND r.status = 'PENDING'", REQUEST_SELECT),
        [post_id],
        map_request,
    )
    .optional()
}

/// Newest first. `author_id` narrows to one author's requests.
pub fn read_requests(
    conn: &Connection,
    author_id: Option<i64>,
    status: Option<RequestStatus>,
    limit: u32,
    offset: i64,
) -> Result<Vec<PublishRequest>, RusqliteError> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE (?1 IS NULL OR r.author_id = ?1) AND (?2 IS NULL OR r.status = ?2)
         ORDER BY r.created_at DESC, r.id DESC LIMIT ?3 OFFSET ?4",
        REQUEST_SELECT
    ))?;
    let requests = stmt
        .query_map(params![author_id, status, limit, offset], map_request)?
        .collect();
    requests
}

pub fn count_pending_requests(conn: &Connection) -> Result<i64, RusqliteError> {
    conn.query_row(
        "SELECT COUNT(*) FROM publish_requests WHERE status = 'PENDING'",
        [],
        |row| row.get(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::db_operations::test_support::{seed_post, seed_user, test_conn};
    use crate::models::Role;

    #[test]
    fn resolve_only_touches_pending_requests() {
        let conn = test_conn();
        let author = seed_user(&conn, "a@example.com", Role::Author);
        let admin = seed_user(&conn, "admin@example.com", Role::Admin);
        let post = seed_post(&conn, &author, "Review me");

        let id = insert_request(&conn, &post.id, author.id, Some("please")).unwrap();
        let pending = read_pending_request_for_post(&conn, &post.id).unwrap().unwrap();
        assert_eq!(pending.id, id);
        assert_eq!(pending.post_title, "Review me");

        assert_eq!(
            resolve_request(&conn, id, RequestStatus::Rejected, admin.id, Some("needs sources")).unwrap(),
            1
        );
        assert_eq!(
            resolve_request(&conn, id, RequestStatus::Approved, admin.id, None).unwrap(),
            0
        );

        let resolved = read_request(&conn, id).unwrap().unwrap();
        assert_eq!(resolved.status, RequestStatus::Rejected);
        assert_eq!(resolved.reviewer_message.as_deref(), Some("needs sources"));
        assert!(resolved.reviewed_at.is_some());
        assert!(read_pending_request_for_post(&conn, &post.id).unwrap().is_none());
    }

    #[test]
    fn listing_filters_by_author_and_status() {
        let conn = test_conn();
        let a = seed_user(&conn, "a@example.com", Role::Author);
        let b = seed_user(&conn, "b@example.com", Role::Author);
        let pa = seed_post(&conn, &a, "A");
        let pb = seed_post(&conn, &b, "B");
        insert_request(&conn, &pa.id, a.id, None).unwrap();
        insert_request(&conn, &pb.id, b.id, None).unwrap();

        assert_eq!(read_requests(&conn, None, None, 10, 0).unwrap().len(), 2);
        assert_eq!(read_requests(&conn, Some(a.id), None, 10, 0).unwrap().len(), 1);
        assert_eq!(
            read_requests(&conn, None, Some(RequestStatus::Approved), 10, 0).unwrap().len(),
            0
        );
        assert_eq!(count_pending_requests(&conn).unwrap(), 2);
    }
}
