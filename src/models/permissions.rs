use crate::models::workflow::is_author_editable;
use crate::models::{Comment, PostStatus, Role, User};

/// Role-level capabilities. Ownership checks layer on top of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ReadPublished,
    CreateComment,
    ModifyOwnComment,
    ModifyAnyComment,
    WriteOwnPost,
    ModifyAnyPost,
    RequestPublish,
    ReviewPublishRequest,
    ManageTags,
    ChangeUserRole,
    ViewAdminDashboard,
}

// Same enum the db layer uses to ask "may this user touch this post".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostAction {
    Edit,
    Delete,
}

impl Role {
    fn rank(&self) -> u8 {
        match self {
            Role::Reader => 0,
            Role::Author => 1,
            Role::Admin => 2,
        }
    }

    /// True when this role sits at or above `other` in the hierarchy.
    pub fn includes(&self, other: Role) -> bool {
        self.rank() >= other.rank()
    }

    /// Lowest role granted `permission`.
    pub fn minimum_for(permission: Permission) -> Role {
        match permission {
            Permission::ReadPublished
            | Permission::CreateComment
            | Permission::ModifyOwnComment => Role::Reader,
            Permission::WriteOwnPost | Permission::RequestPublish => Role::Author,
            Permission::ModifyAnyComment
            | Permission::ModifyAnyPost
            | Permission::ReviewPublishRequest
            | Permission::ManageTags
            | Permission::ChangeUserRole
            | Permission::ViewAdminDashboard => Role::Admin,
        }
    }

    pub fn allows(&self, permission: Permission) -> bool {
        self.includes(Role::minimum_for(permission))
    }
}

pub fn can_modify_comment(user: &User, comment: &Comment) -> bool {
    (comment.author_id == user.id && user.role.allows(Permission::ModifyOwnComment))
        || user.role.allows(Permission::ModifyAnyComment)
}

/// Decides whether `user` may perform `action` on a post owned by
/// `author_id` that currently sits in `status`.
pub fn can_act_on_post(user: &User, author_id: i64, status: PostStatus, action: PostAction) -> bool {
    if user.role.allows(Permission::ModifyAnyPost) {
        return true;
    }
    let is_owner = author_id == user.id && user.role.allows(Permission::WriteOwnPost);

    match action {
        PostAction::Edit => is_owner && is_author_editable(status),
        PostAction::Delete => is_owner && status != PostStatus::Published,
    }
}

/// Unpublished posts are visible only to their author and to admins.
pub fn can_view_post(user: Option<&User>, author_id: i64, status: PostStatus) -> bool {
    if status == PostStatus::Published {
        return true;
    }
    match user {
        Some(u) => u.id == author_id || u.role.allows(Permission::ModifyAnyPost),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: i64, role: Role) -> User {
        User {
            id,
            email: format!("user{id}@example.com"),
            name: format!("User {id}"),
            role,
            email_verified: true,
            created_at: Utc::now(),
            last_login_at: None,
        }
    }

    fn comment_by(author_id: i64) -> Comment {
        Comment {
            id: 1,
            content: "hello".to_string(),
            author_id,
            author_name: "someone".to_string(),
            post_id: "p".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn matrix_matches_role_table() {
        use Permission::*;
        let expected = [
            (ReadPublished, [true, true, true]),
            (CreateComment, [true, true, true]),
            (ModifyOwnComment, [true, true, true]),
            (ModifyAnyComment, [false, false, true]),
            (WriteOwnPost, [false, true, true]),
            (ModifyAnyPost, [false, false, true]),
            (RequestPublish, [false, true, true]),
            (ReviewPublishRequest, [false, false, true]),
            (ManageTags, [false, false, true]),
            (ChangeUserRole, [false, false, true]),
            (ViewAdminDashboard, [false, false, true]),
        ];
        for (permission, allowed) in expected {
            for (role, want) in [Role::Reader, Role::Author, Role::Admin].into_iter().zip(allowed) {
                assert_eq!(role.allows(permission), want, "{role} / {permission:?}");
            }
        }
    }

    #[test]
    fn comment_delete_only_by_owner_or_admin() {
        let comment = comment_by(7);
        assert!(can_modify_comment(&user(7, Role::Reader), &comment));
        assert!(!can_modify_comment(&user(8, Role::Reader), &comment));
        assert!(!can_modify_comment(&user(8, Role::Author), &comment));
        assert!(can_modify_comment(&user(9, Role::Admin), &comment));
    }

    #[test]
    fn reader_never_edits_posts_even_if_listed_as_author() {
        let reader = user(3, Role::Reader);
        for status in [PostStatus::Draft, PostStatus::Rejected] {
            assert!(!can_act_on_post(&reader, 3, status, PostAction::Edit));
            assert!(!can_act_on_post(&reader, 3, status, PostAction::Delete));
        }
    }

    #[test]
    fn author_edits_only_own_editable_posts() {
        let author = user(4, Role::Author);
        assert!(can_act_on_post(&author, 4, PostStatus::Draft, PostAction::Edit));
        assert!(can_act_on_post(&author, 4, PostStatus::Rejected, PostAction::Edit));
        assert!(!can_act_on_post(&author, 4, PostStatus::PendingApproval, PostAction::Edit));
        assert!(!can_act_on_post(&author, 4, PostStatus::Published, PostAction::Edit));
        assert!(!can_act_on_post(&author, 5, PostStatus::Draft, PostAction::Edit));
    }

    #[test]
    fn author_cannot_delete_published_but_admin_can() {
        let author = user(4, Role::Author);
        assert!(can_act_on_post(&author, 4, PostStatus::PendingApproval, PostAction::Delete));
        assert!(!can_act_on_post(&author, 4, PostStatus::Published, PostAction::Delete));
        let admin = user(1, Role::Admin);
        assert!(can_act_on_post(&admin, 4, PostStatus::Published, PostAction::Delete));
        assert!(can_act_on_post(&admin, 4, PostStatus::Published, PostAction::Edit));
    }

    #[test]
    fn drafts_hidden_from_strangers() {
        assert!(can_view_post(None, 4, PostStatus::Published));
        assert!(!can_view_post(None, 4, PostStatus::Draft));
        assert!(!can_view_post(Some(&user(5, Role::Author)), 4, PostStatus::Draft));
        assert!(can_view_post(Some(&user(4, Role::Author)), 4, PostStatus::Draft));
        assert!(can_view_post(Some(&user(1, Role::Admin)), 4, PostStatus::Rejected));
    }
}
