use rusqlite::{params, Connection, Error as RusqliteError};

use crate::models::MediaUpload;

pub fn add_media_upload(conn: &Connection, media: &MediaUpload) -> Result<(), RusqliteError> {
    conn.execute(
        "INSERT INTO media_uploads (id, user_id, file_path, mime_type, file_size, uploaded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            media.id,
            media.user_id,
            media.file_path,
            media.mime_type,
            media.file_size,
            media.uploaded_at
        ],
    )?;
    Ok(())
}

pub fn list_media_for_user(conn: &Connection, user_id: i64) -> Result<Vec<MediaUpload>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, file_path, mime_type, file_size, uploaded_at
         FROM media_uploads WHERE user_id = ?1 ORDER BY uploaded_at DESC",
    )?;
    let uploads = stmt
        .query_map([user_id], |row| {
            Ok(MediaUpload {
                id: row.get(0)?,
                user_id: row.get(1)?,
                file_path: row.get(2)?,
                mime_type: row.get(3)?,
                file_size: row.get(4)?,
                uploaded_at: row.get(5)?,
            })
        })?
        .collect();
    uploads
}
