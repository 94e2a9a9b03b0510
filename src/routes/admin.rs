use actix_web::{web, HttpResponse};

use crate::error::AppResult;
use crate::helper::admin_helpers;
use crate::middleware::CurrentUser;
use crate::models::permissions::Permission;
use crate::models::ApiResponse;
use crate::DbPool;

pub fn config_admin(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/admin").route("/stats", web::get().to(dashboard_stats)));
}

async fn dashboard_stats(user: CurrentUser, pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    user.require(Permission::ViewAdminDashboard)?;
    let stats = admin_helpers::dashboard_stats(&pool)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(stats)))
}
