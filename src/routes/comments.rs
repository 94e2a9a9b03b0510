use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::error::AppResult;
use crate::helper::comment_helpers::{self, CommentForm};
use crate::middleware::CurrentUser;
use crate::models::permissions::Permission;
use crate::models::ApiResponse;
use crate::{AppState, DbPool};

pub fn config_comments(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/comments")
            .service(
                web::resource("/posts/{post_id}")
                    .route(web::get().to(list_comments))
                    .route(web::post().to(add_comment)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::put().to(edit_comment))
                    .route(web::delete().to(delete_comment)),
            ),
    );
}

async fn list_comments(
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let comments = comment_helpers::list_comments(&pool, &state, &path)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(comments)))
}

async fn add_comment(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Json<CommentForm>,
) -> AppResult<HttpResponse> {
    let commenter = user.require(Permission::CreateComment)?;
    let comment = comment_helpers::add_comment(&pool, &state, commenter, &path, &form)?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(comment)))
}

async fn edit_comment(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    form: web::Json<CommentForm>,
) -> AppResult<HttpResponse> {
    let comment = comment_helpers::edit_comment(&pool, &state, &user, path.into_inner(), &form)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(comment)))
}

async fn delete_comment(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let comment_id = path.into_inner();
    comment_helpers::delete_comment(&pool, &state, &user, comment_id)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "id": comment_id }))))
}
