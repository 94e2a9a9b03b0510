use rusqlite::{Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::cache::{self, CacheResource};
use crate::error::{AppError, AppResult};
use crate::helper::sanitization_helpers::{clean_plain_text, sanitize_markdown_content};
use crate::models::db_operations::posts_db_operations::{self, NewPost, PostFilter, PostRef};
use crate::models::db_operations::tags_db_operations;
use crate::models::permissions::{can_act_on_post, can_view_post, Permission, PostAction};
use crate::models::workflow::is_author_editable;
use crate::models::{Pagination, Post, PostStatus, PostSummary, Role, User};
use crate::{AppState, DbPool};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_EXCERPT_LEN: usize = 500;
pub const MAX_COVER_URL_LEN: usize = 2048;
pub const MAX_BULK_DELETE: usize = 100;

#[derive(Debug, Deserialize)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct PostUpdateOutcome {
    pub post: Post,
    /// Set when an admin changed a post that is already live.
    pub admin_override: bool,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct BulkDeleteFailure {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Serialize, Default)]
pub struct BulkDeleteReport {
    pub deleted: Vec<String>,
    pub failed: Vec<BulkDeleteFailure>,
}

// --- Validation ---

fn validate_cover_image(url: &str) -> AppResult<()> {
    if url.len() > MAX_COVER_URL_LEN {
        return Err(AppError::validation("Cover image URL is too long."));
    }
    if url.starts_with("/media/") {
        return Ok(());
    }
    match url::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(AppError::validation(
            "Cover image must be an uploaded image or an http(s) URL.",
        )),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(clean_plain_text).filter(|v| !v.is_empty())
}

/// Cleans and checks a post form, producing what the db layer stores.
pub fn validate_post_form(form: &PostForm) -> AppResult<NewPost> {
    let title = clean_plain_text(&form.title);
    if title.is_empty() {
        return Err(AppError::validation("Title is required."));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "Title cannot exceed {} characters.",
            MAX_TITLE_LEN
        )));
    }
    if form.content.trim().is_empty() {
        return Err(AppError::validation("Content is required."));
    }

    let excerpt = non_empty(form.excerpt.as_deref());
    if excerpt.as_ref().map_or(false, |e| e.chars().count() > MAX_EXCERPT_LEN) {
        return Err(AppError::Validation(format!(
            "Excerpt cannot exceed {} characters.",
            MAX_EXCERPT_LEN
        )));
    }

    let cover_image = form
        .cover_image
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    if let Some(url) = &cover_image {
        validate_cover_image(url)?;
    }

    let mut seen = HashSet::new();
    let tag_ids = form.tag_ids.iter().copied().filter(|id| seen.insert(*id)).collect();

    Ok(NewPost {
        title,
        content: sanitize_markdown_content(&form.content),
        excerpt,
        cover_image,
        tag_ids,
    })
}

fn ensure_tags_exist(conn: &rusqlite::Connection, tag_ids: &[i64]) -> AppResult<()> {
    let missing = tags_db_operations::missing_tag_ids(conn, tag_ids)?;
    if !missing.is_empty() {
        let ids: Vec<String> = missing.iter().map(|id| id.to_string()).collect();
        return Err(AppError::Validation(format!("Unknown tag id(s): {}.", ids.join(", "))));
    }
    Ok(())
}

fn load_post_ref(conn: &rusqlite::Connection, post_id: &str) -> AppResult<PostRef> {
    posts_db_operations::read_post_ref(conn, post_id)?.ok_or(AppError::NotFound("Post"))
}

/// Explains why `user` may not perform `action`, or `None` when allowed.
fn denial_reason(user: &User, post: &PostRef, action: PostAction) -> Option<String> {
    if can_act_on_post(user, post.author_id, post.status, action) {
        return None;
    }
    let is_owner = post.author_id == user.id && user.role.allows(Permission::WriteOwnPost);
    Some(match (action, is_owner) {
        (PostAction::Edit, true) => format!(
            "This post is {} and cannot be edited right now.",
            post.status
        ),
        (PostAction::Delete, true) => {
            "Published posts can only be deleted by an administrator.".to_string()
        }
        (PostAction::Edit, false) => "You do not have permission to edit this post.".to_string(),
        (PostAction::Delete, false) => {
            "You do not have permission to delete this post.".to_string()
        }
    })
}

// --- Reads ---

/// Returns a post if `viewer` is allowed to see it. Hidden posts look missing.
pub fn get_post(pool: &DbPool, viewer: Option<&User>, post_id: &str) -> AppResult<Post> {
    let conn = pool.get()?;
    let post = posts_db_operations::read_post(&conn, post_id)?.ok_or(AppError::NotFound("Post"))?;
    if !can_view_post(viewer, post.author_id, post.status) {
        return Err(AppError::NotFound("Post"));
    }
    Ok(post)
}

/// Public read by slug; counts as a view.
pub fn get_published_post_by_slug(pool: &DbPool, slug: &str) -> AppResult<Post> {
    let conn = pool.get()?;
    let mut post = posts_db_operations::read_post_by_slug(&conn, slug)?
        .filter(|p| p.status == PostStatus::Published)
        .ok_or(AppError::NotFound("Post"))?;
    posts_db_operations::increment_views(&conn, &post.id)?;
    post.views += 1;
    Ok(post)
}

pub fn list_own_posts(
    pool: &DbPool,
    user: &User,
    status: Option<PostStatus>,
    pagination: Pagination,
) -> AppResult<Vec<PostSummary>> {
    let (limit, offset) = pagination.limit_offset();
    let filter = PostFilter {
        status,
        author_id: Some(user.id),
        ..PostFilter::default()
    };
    let conn = pool.get()?;
    Ok(posts_db_operations::read_post_summaries(&conn, &filter, limit, offset)?)
}

// --- Writes ---

pub fn create_post(pool: &DbPool, state: &AppState, author: &User, form: &PostForm) -> AppResult<Post> {
    let new_post = validate_post_form(form)?;
    let conn = pool.get()?;
    ensure_tags_exist(&conn, &new_post.tag_ids)?;

    let post_id = posts_db_operations::create_post(&conn, author.id, &new_post)?;
    log::info!("User {} created post {}", author.id, post_id);
    cache::invalidate(state, &[CacheResource::Posts]);

    posts_db_operations::read_post(&conn, &post_id)?.ok_or(AppError::NotFound("Post"))
}

/// Applies an edit. Authors may only touch their own DRAFT or REJECTED
/// posts; an admin may edit anything, and editing a PUBLISHED post is
/// reported back as an override. The check and the write share one
/// immediate transaction, so a concurrent review cannot slip between them.
pub fn update_post(
    pool: &DbPool,
    state: &AppState,
    editor: &User,
    post_id: &str,
    form: &PostForm,
) -> AppResult<PostUpdateOutcome> {
    let new_post = validate_post_form(form)?;
    let conn = pool.get()?;
    let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
    let existing = load_post_ref(&tx, post_id)?;

    if let Some(reason) = denial_reason(editor, &existing, PostAction::Edit) {
        // The owner is only locked out by the post's status.
        let owner_locked = existing.author_id == editor.id && !is_author_editable(existing.status);
        return Err(if owner_locked {
            AppError::Conflict(reason)
        } else {
            AppError::Forbidden(reason)
        });
    }
    ensure_tags_exist(&tx, &new_post.tag_ids)?;

    let admin_override = editor.role == Role::Admin && existing.status == PostStatus::Published;
    posts_db_operations::update_post(&tx, post_id, &new_post, editor.id, admin_override)?;
    tx.commit()?;

    if admin_override {
        log::warn!(
            "Admin {} edited published post {} without re-review",
            editor.id,
            post_id
        );
    }
    cache::invalidate(state, &[CacheResource::Posts, CacheResource::Tags]);

    let post = posts_db_operations::read_post(&conn, post_id)?.ok_or(AppError::NotFound("Post"))?;
    Ok(PostUpdateOutcome { post, admin_override })
}

/// Deletes one post. Any pending publish request goes with it.
pub fn delete_post(pool: &DbPool, state: &AppState, user: &User, post_id: &str) -> AppResult<()> {
    let conn = pool.get()?;
    let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
    let existing = load_post_ref(&tx, post_id)?;
    if let Some(reason) = denial_reason(user, &existing, PostAction::Delete) {
        return Err(AppError::Forbidden(reason));
    }

    posts_db_operations::delete_post(&tx, post_id)?;
    tx.commit()?;

    log::info!("User {} deleted post {} ({})", user.id, post_id, existing.status);
    cache::invalidate(
        state,
        &[CacheResource::Posts, CacheResource::Tags, CacheResource::Comments],
    );
    Ok(())
}

/// Checks every id on its own, then deletes all permitted ones in a single
/// transaction. Ids that fail are reported with a reason, never dropped.
pub fn bulk_delete_posts(
    pool: &DbPool,
    state: &AppState,
    user: &User,
    post_ids: &[String],
) -> AppResult<BulkDeleteReport> {
    if post_ids.is_empty() {
        return Err(AppError::validation("No post ids were given."));
    }
    if post_ids.len() > MAX_BULK_DELETE {
        return Err(AppError::Validation(format!(
            "At most {} posts can be deleted at once.",
            MAX_BULK_DELETE
        )));
    }

    let mut seen = HashSet::new();
    let mut report = BulkDeleteReport::default();
    let mut permitted = Vec::new();

    let conn = pool.get()?;
    let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;

    for post_id in post_ids.iter().filter(|id| seen.insert(id.as_str())) {
        match posts_db_operations::read_post_ref(&tx, post_id)? {
            None => report.failed.push(BulkDeleteFailure {
                id: post_id.clone(),
                reason: "Post not found.".to_string(),
            }),
            Some(existing) => match denial_reason(user, &existing, PostAction::Delete) {
                Some(reason) => report.failed.push(BulkDeleteFailure {
                    id: post_id.clone(),
                    reason,
                }),
                None => permitted.push(post_id.clone()),
            },
        }
    }

    posts_db_operations::delete_posts(&tx, &permitted)?;
    tx.commit()?;

    log::info!(
        "User {} bulk-deleted {} post(s); {} refused",
        user.id,
        permitted.len(),
        report.failed.len()
    );
    if !permitted.is_empty() {
        cache::invalidate(
            state,
            &[CacheResource::Posts, CacheResource::Tags, CacheResource::Comments],
        );
    }
    report.deleted = permitted;
    Ok(report)
}
