use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;

use crate::cache::{self, CacheKey, CacheResource};
use crate::error::{AppError, AppResult};
use crate::helper::sanitization_helpers::clean_plain_text;
use crate::models::db_operations::{comments_db_operations, posts_db_operations};
use crate::models::permissions::can_modify_comment;
use crate::models::{Comment, PostStatus, User};
use crate::{AppState, DbPool};

pub const MAX_COMMENT_LEN: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub content: String,
}

fn validate_content(content: &str) -> AppResult<String> {
    let clean = clean_plain_text(content);
    if clean.is_empty() {
        return Err(AppError::validation("Comment cannot be empty."));
    }
    if clean.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::Validation(format!(
            "Comment cannot exceed {} characters.",
            MAX_COMMENT_LEN
        )));
    }
    Ok(clean)
}

fn ensure_published(conn: &Connection, post_id: &str) -> AppResult<()> {
    match posts_db_operations::read_post_ref(conn, post_id)? {
        Some(post) if post.status == PostStatus::Published => Ok(()),
        _ => Err(AppError::NotFound("Post")),
    }
}

fn load_comment(conn: &Connection, comment_id: i64) -> AppResult<Comment> {
    comments_db_operations::read_comment(conn, comment_id)?.ok_or(AppError::NotFound("Comment"))
}

fn load_modifiable(conn: &Connection, user: &User, comment_id: i64) -> AppResult<Comment> {
    let comment = load_comment(conn, comment_id)?;
    if !can_modify_comment(user, &comment) {
        log::info!("User {} denied access to comment {}", user.id, comment_id);
        return Err(AppError::forbidden(
            "You can only change your own comments.",
        ));
    }
    Ok(comment)
}

/// Comment thread of a published post, served from the query cache.
pub fn list_comments(pool: &DbPool, state: &AppState, post_id: &str) -> AppResult<Value> {
    let key = CacheKey::new(CacheResource::Comments, &[("post", Some(post_id.to_string()))]);
    let generation = cache::generation(state, CacheResource::Comments);
    if let Some(hit) = cache::cached(state, &key) {
        return Ok(hit);
    }

    let conn = pool.get()?;
    ensure_published(&conn, post_id)?;
    let comments = serde_json::to_value(comments_db_operations::read_comments_for_post(&conn, post_id)?)?;
    cache::store(state, key, comments.clone(), generation);
    Ok(comments)
}

pub fn add_comment(
    pool: &DbPool,
    state: &AppState,
    user: &User,
    post_id: &str,
    form: &CommentForm,
) -> AppResult<Comment> {
    let content = validate_content(&form.content)?;
    let conn = pool.get()?;
    ensure_published(&conn, post_id)?;

    let comment_id = comments_db_operations::create_comment(&conn, post_id, user.id, &content)?;
    cache::invalidate(state, &[CacheResource::Comments]);
    load_comment(&conn, comment_id)
}

pub fn edit_comment(
    pool: &DbPool,
    state: &AppState,
    user: &User,
    comment_id: i64,
    form: &CommentForm,
) -> AppResult<Comment> {
    let content = validate_content(&form.content)?;
    let conn = pool.get()?;
    load_modifiable(&conn, user, comment_id)?;

    comments_db_operations::update_comment(&conn, comment_id, &content)?;
    cache::invalidate(state, &[CacheResource::Comments]);
    load_comment(&conn, comment_id)
}

pub fn delete_comment(pool: &DbPool, state: &AppState, user: &User, comment_id: i64) -> AppResult<()> {
    let conn = pool.get()?;
    let comment = load_modifiable(&conn, user, comment_id)?;

    comments_db_operations::delete_comment(&conn, comment_id)?;
    if comment.author_id != user.id {
        log::warn!("Admin {} removed comment {} by user {}", user.id, comment_id, comment.author_id);
    }
    cache::invalidate(state, &[CacheResource::Comments]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_content_is_validated() {
        assert!(validate_content("   ").is_err());
        assert!(validate_content(&"c".repeat(MAX_COMMENT_LEN + 1)).is_err());
        assert_eq!(validate_content(" nice <b>post</b> ").unwrap(), "nice post");
    }
}
