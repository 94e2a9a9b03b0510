use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::AppResult;
use crate::helper::admin_helpers::{self, RoleChange};
use crate::middleware::CurrentUser;
use crate::models::permissions::Permission;
use crate::models::{ApiResponse, Role};
use crate::routes::parse_filter;
use crate::DbPool;

#[derive(Deserialize)]
struct UserListQuery {
    role: Option<String>,
}

pub fn config_users(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("", web::get().to(list_users))
            .route("/me", web::get().to(current_user))
            .route("/{id}/role", web::put().to(change_role)),
    );
}

async fn current_user(user: CurrentUser) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ok(user.0))
}

async fn list_users(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    query: web::Query<UserListQuery>,
) -> AppResult<HttpResponse> {
    user.require(Permission::ViewAdminDashboard)?;
    let role = parse_filter::<Role>(query.role.as_deref())?;
    let users = admin_helpers::fetch_all_users(&pool, role)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(users)))
}

async fn change_role(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    body: web::Json<RoleChange>,
) -> AppResult<HttpResponse> {
    let admin = user.require(Permission::ChangeUserRole)?;
    let role = admin_helpers::parse_role(&body.role)?;
    let updated = admin_helpers::change_user_role(&pool, admin, path.into_inner(), role)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(updated)))
}
