//! Post status transitions driven by publish requests.
//!
//! The table here is storage-agnostic; the publish helpers consult it
//! before touching the database and then write the resulting status.

use crate::models::{PostStatus, RequestStatus};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowAction {
    RequestPublish,
    Approve,
    Reject,
    Cancel,
}

impl WorkflowAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowAction::RequestPublish => "request publish",
            WorkflowAction::Approve => "approve",
            WorkflowAction::Reject => "reject",
            WorkflowAction::Cancel => "cancel",
        }
    }

    /// Status the publish request ends in after this action, if it survives.
    pub fn resulting_request_status(&self) -> Option<RequestStatus> {
        match self {
            WorkflowAction::RequestPublish => Some(RequestStatus::Pending),
            WorkflowAction::Approve => Some(RequestStatus::Approved),
            WorkflowAction::Reject => Some(RequestStatus::Rejected),
            WorkflowAction::Cancel => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Cannot {verb} a post that is {from}.", verb = .action.as_str())]
    IllegalTransition { from: PostStatus, action: WorkflowAction },
    #[error("This post already has a pending publish request.")]
    AlreadyPending,
    #[error("This publish request has already been {state}.", state = .0.as_str().to_lowercase())]
    RequestNotPending(RequestStatus),
}

/// Returns the post status reached by applying `action` to a post in `from`.
pub fn transition(from: PostStatus, action: WorkflowAction) -> Result<PostStatus, WorkflowError> {
    use PostStatus::*;
    use WorkflowAction::*;

    match (from, action) {
        (Draft | Rejected, RequestPublish) => Ok(PendingApproval),
        (PendingApproval, RequestPublish) => Err(WorkflowError::AlreadyPending),
        (PendingApproval, Approve) => Ok(Published),
        (PendingApproval, Reject) => Ok(Rejected),
        (PendingApproval, Cancel) => Ok(Draft),
        (from, action) => Err(WorkflowError::IllegalTransition { from, action }),
    }
}

/// Review actions are only legal while the request itself is still pending.
pub fn ensure_request_pending(status: RequestStatus) -> Result<(), WorkflowError> {
    match status {
        RequestStatus::Pending => Ok(()),
        other => Err(WorkflowError::RequestNotPending(other)),
    }
}

/// Authors may only change the content of posts that are not in review or live.
pub fn is_author_editable(status: PostStatus) -> bool {
    matches!(status, PostStatus::Draft | PostStatus::Rejected)
}
