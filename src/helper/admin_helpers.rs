use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{AppError, AppResult};
use crate::models::db_operations::{
    comments_db_operations, posts_db_operations, publish_db_operations, users_db_operations,
};
use crate::models::{PostStatus, Role, User};
use crate::DbPool;

#[derive(Debug, Deserialize)]
pub struct RoleChange {
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub users_by_role: BTreeMap<String, i64>,
    pub posts_by_status: BTreeMap<String, i64>,
    pub pending_requests: i64,
    pub total_comments: i64,
    pub total_views: i64,
}

pub fn parse_role(raw: &str) -> AppResult<Role> {
    raw.parse::<Role>().map_err(AppError::Validation)
}

pub fn fetch_all_users(pool: &DbPool, role: Option<Role>) -> AppResult<Vec<User>> {
    let conn = pool.get()?;
    Ok(users_db_operations::read_all_users(&conn, role)?)
}

/// Changes another user's role. Admins cannot demote themselves, which
/// keeps at least the acting admin in place.
pub fn change_user_role(pool: &DbPool, admin: &User, user_id: i64, role: Role) -> AppResult<User> {
    if admin.id == user_id {
        return Err(AppError::forbidden("You cannot change your own role."));
    }
    let conn = pool.get()?;
    let target = users_db_operations::read_user_by_id(&conn, user_id)?.ok_or(AppError::NotFound("User"))?;
    if target.role == role {
        return Ok(target);
    }

    users_db_operations::update_user_role(&conn, user_id, role)?;
    log::warn!(
        "Admin {} changed role of user {} from {} to {}",
        admin.id,
        user_id,
        target.role,
        role
    );
    users_db_operations::read_user_by_id(&conn, user_id)?.ok_or(AppError::NotFound("User"))
}

pub fn dashboard_stats(pool: &DbPool) -> AppResult<DashboardStats> {
    let conn = pool.get()?;

    // Every known bucket is present, even at zero.
    let mut users_by_role: BTreeMap<String, i64> = [Role::Reader, Role::Author, Role::Admin]
        .iter()
        .map(|r| (r.to_string(), 0))
        .collect();
    for (role, count) in users_db_operations::count_users_by_role(&conn)? {
        users_by_role.insert(role.to_string(), count);
    }

    let mut posts_by_status: BTreeMap<String, i64> = [
        PostStatus::Draft,
        PostStatus::PendingApproval,
        PostStatus::Published,
        PostStatus::Rejected,
    ]
    .iter()
    .map(|s| (s.to_string(), 0))
    .collect();
    for (status, count) in posts_db_operations::count_posts_by_status(&conn)? {
        posts_by_status.insert(status.to_string(), count);
    }

    Ok(DashboardStats {
        users_by_role,
        posts_by_status,
        pending_requests: publish_db_operations::count_pending_requests(&conn)?,
        total_comments: comments_db_operations::count_comments(&conn)?,
        total_views: posts_db_operations::total_views(&conn)?,
    })
}
