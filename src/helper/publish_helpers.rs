//! Publish request workflow.
//!
//! Every step runs in one IMMEDIATE transaction that reads the request
//! and post, consults [`workflow::transition`], and writes both rows, so
//! the request status and the post status cannot drift apart.

use chrono::Utc;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Deserialize;

use crate::cache::{self, CacheResource};
use crate::error::{AppError, AppResult};
use crate::helper::sanitization_helpers::clean_plain_text;
use crate::models::db_operations::posts_db_operations::{self, PostRef};
use crate::models::db_operations::publish_db_operations;
use crate::models::workflow::{self, WorkflowAction, WorkflowError};
use crate::models::{Pagination, PostStatus, PublishRequest, RequestStatus, User};
use crate::{AppState, DbPool};

pub const MAX_MESSAGE_LEN: usize = 1000;

#[derive(Debug, Deserialize, Default)]
pub struct RequestMessage {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl From<ReviewDecision> for WorkflowAction {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approve => WorkflowAction::Approve,
            ReviewDecision::Reject => WorkflowAction::Reject,
        }
    }
}

pub fn clean_message(message: Option<&str>) -> AppResult<Option<String>> {
    let Some(raw) = message else {
        return Ok(None);
    };
    let clean = clean_plain_text(raw);
    if clean.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::Validation(format!(
            "Message cannot exceed {} characters.",
            MAX_MESSAGE_LEN
        )));
    }
    Ok(Some(clean).filter(|m| !m.is_empty()))
}

fn begin(conn: &Connection) -> AppResult<Transaction<'_>> {
    Ok(Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?)
}

fn load_request(conn: &Connection, request_id: i64) -> AppResult<PublishRequest> {
    publish_db_operations::read_request(conn, request_id)?.ok_or(AppError::NotFound("Publish request"))
}

fn load_post(conn: &Connection, post_id: &str) -> AppResult<PostRef> {
    posts_db_operations::read_post_ref(conn, post_id)?.ok_or(AppError::NotFound("Post"))
}

// The partial unique index is the backstop for two requests racing past
// the pending check.
fn pending_conflict(err: rusqlite::Error) -> AppError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            WorkflowError::AlreadyPending.into()
        }
        _ => AppError::Database(err),
    }
}

/// Moves a pending request to its outcome and the post to its next status.
/// A cancelled request has no outcome and is removed.
fn settle_request(
    tx: &Transaction<'_>,
    request: &PublishRequest,
    action: WorkflowAction,
    reviewer_id: i64,
    reviewer_message: Option<&str>,
) -> AppResult<PostStatus> {
    workflow::ensure_request_pending(request.status)?;
    let post = load_post(tx, &request.post_id)?;
    let next = workflow::transition(post.status, action)?;

    let touched = match action.resulting_request_status() {
        Some(outcome) => publish_db_operations::resolve_request(
            tx,
            request.id,
            outcome,
            reviewer_id,
            reviewer_message,
        )?,
        None => publish_db_operations::delete_request(tx, request.id)?,
    };
    if touched == 0 {
        return Err(WorkflowError::RequestNotPending(request.status).into());
    }

    let published_at = (next == PostStatus::Published).then(Utc::now);
    posts_db_operations::set_post_status(tx, &post.id, next, published_at)?;
    Ok(next)
}

/// Opens a PENDING request for one of the caller's own posts.
pub fn request_publish(
    pool: &DbPool,
    state: &AppState,
    author: &User,
    post_id: &str,
    message: Option<&str>,
) -> AppResult<PublishRequest> {
    let message = clean_message(message)?;
    let conn = pool.get()?;
    let tx = begin(&conn)?;

    let post = load_post(&tx, post_id)?;
    if post.author_id != author.id {
        return Err(AppError::forbidden(
            "You can only request publication of your own posts.",
        ));
    }
    if publish_db_operations::read_pending_request_for_post(&tx, post_id)?.is_some() {
        return Err(WorkflowError::AlreadyPending.into());
    }
    let next = workflow::transition(post.status, WorkflowAction::RequestPublish)?;

    let request_id = publish_db_operations::insert_request(&tx, post_id, author.id, message.as_deref())
        .map_err(pending_conflict)?;
    posts_db_operations::set_post_status(&tx, post_id, next, None)?;
    tx.commit()?;

    log::info!("User {} requested publication of post {} (request {})", author.id, post_id, request_id);
    cache::invalidate(state, &[CacheResource::Posts]);
    load_request(&conn, request_id)
}

/// Withdraws a pending request; the post goes back to DRAFT.
pub fn cancel_request(pool: &DbPool, state: &AppState, user: &User, request_id: i64) -> AppResult<()> {
    let conn = pool.get()?;
    let tx = begin(&conn)?;

    let request = load_request(&tx, request_id)?;
    if request.author_id != user.id {
        return Err(AppError::forbidden("Only the author of a request can cancel it."));
    }
    settle_request(&tx, &request, WorkflowAction::Cancel, user.id, None)?;
    tx.commit()?;

    log::info!("User {} cancelled publish request {}", user.id, request_id);
    cache::invalidate(state, &[CacheResource::Posts]);
    Ok(())
}

/// Approves or rejects a pending request. Approval publishes the post and
/// stamps `published_at`; rejection makes it editable again.
pub fn review_request(
    pool: &DbPool,
    state: &AppState,
    reviewer: &User,
    request_id: i64,
    decision: ReviewDecision,
    message: Option<&str>,
) -> AppResult<PublishRequest> {
    let message = clean_message(message)?;
    let conn = pool.get()?;
    let tx = begin(&conn)?;

    let request = load_request(&tx, request_id)?;
    let next = settle_request(&tx, &request, decision.into(), reviewer.id, message.as_deref())?;
    tx.commit()?;

    log::info!(
        "Admin {} reviewed request {} ({:?}); post {} is now {}",
        reviewer.id,
        request_id,
        decision,
        request.post_id,
        next
    );
    cache::invalidate(state, &[CacheResource::Posts, CacheResource::Tags]);
    load_request(&conn, request_id)
}

pub fn list_requests(
    pool: &DbPool,
    author_id: Option<i64>,
    status: Option<RequestStatus>,
    pagination: Pagination,
) -> AppResult<Vec<PublishRequest>> {
    let (limit, offset) = pagination.limit_offset();
    let conn = pool.get()?;
    Ok(publish_db_operations::read_requests(&conn, author_id, status, limit, offset)?)
}
