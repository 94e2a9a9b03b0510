use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::error::AppResult;
use crate::helper::tag_helpers::{self, TagForm};
use crate::middleware::CurrentUser;
use crate::models::permissions::Permission;
use crate::models::ApiResponse;
use crate::{AppState, DbPool};

pub fn config_tags(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tags")
            .service(
                web::resource("")
                    .route(web::get().to(list_tags))
                    .route(web::post().to(create_tag)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(get_tag))
                    .route(web::put().to(update_tag))
                    .route(web::delete().to(delete_tag)),
            ),
    );
}

async fn list_tags(pool: web::Data<DbPool>, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let tags = tag_helpers::list_tags(&pool, &state)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(tags)))
}

async fn get_tag(pool: web::Data<DbPool>, path: web::Path<i64>) -> AppResult<HttpResponse> {
    let tag = tag_helpers::get_tag(&pool, path.into_inner())?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(tag)))
}

async fn create_tag(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
    form: web::Json<TagForm>,
) -> AppResult<HttpResponse> {
    user.require(Permission::ManageTags)?;
    let tag = tag_helpers::create_tag(&pool, &state, &form)?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(tag)))
}

async fn update_tag(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    form: web::Json<TagForm>,
) -> AppResult<HttpResponse> {
    user.require(Permission::ManageTags)?;
    let tag = tag_helpers::update_tag(&pool, &state, path.into_inner(), &form)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(tag)))
}

async fn delete_tag(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    user.require(Permission::ManageTags)?;
    let tag_id = path.into_inner();
    tag_helpers::delete_tag(&pool, &state, tag_id)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "id": tag_id }))))
}
