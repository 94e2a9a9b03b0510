use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::helper::post_helpers::{self, PostForm};
use crate::helper::public_helpers;
use crate::middleware::CurrentUser;
use crate::models::permissions::Permission;
use crate::models::{ApiResponse, Pagination, PostStatus};
use crate::routes::parse_filter;
use crate::{AppState, DbPool};

#[derive(Deserialize)]
struct PostListQuery {
    page: Option<u32>,
    limit: Option<u32>,
    tag: Option<String>,
    q: Option<String>,
    status: Option<String>,
}

#[derive(Deserialize)]
struct MyPostsQuery {
    page: Option<u32>,
    limit: Option<u32>,
    status: Option<String>,
}

#[derive(Deserialize)]
struct BulkDeleteRequest {
    ids: Vec<String>,
}

pub fn config_posts(cfg: &mut web::ServiceConfig) {
    // Literal segments are registered ahead of `/{id}`.
    cfg.service(
        web::scope("/posts")
            .service(
                web::resource("")
                    .route(web::get().to(list_posts))
                    .route(web::post().to(create_post)),
            )
            .route("/mine", web::get().to(my_posts))
            .route("/bulk-delete", web::post().to(bulk_delete))
            .route("/slug/{slug}", web::get().to(get_post_by_slug))
            .service(
                web::resource("/{id}")
                    .route(web::get().to(get_post))
                    .route(web::put().to(update_post))
                    .route(web::delete().to(delete_post)),
            ),
    );
}

async fn list_posts(
    user: Option<CurrentUser>,
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
    query: web::Query<PostListQuery>,
) -> AppResult<HttpResponse> {
    let pagination = Pagination { page: query.page, limit: query.limit };
    let status = parse_filter::<PostStatus>(query.status.as_deref())?;

    match status {
        None | Some(PostStatus::Published) => {
            let posts = public_helpers::fetch_published_posts(
                &pool,
                &state,
                query.tag.as_deref(),
                query.q.as_deref(),
                pagination,
            )?;
            Ok(HttpResponse::Ok().json(ApiResponse::ok(posts)))
        }
        Some(other) => {
            let viewer = user.as_ref().ok_or(AppError::Unauthorized)?;
            viewer.require(Permission::ModifyAnyPost)?;
            let posts = public_helpers::fetch_posts_with_status(
                &pool,
                Some(other),
                query.tag.as_deref(),
                query.q.as_deref(),
                pagination,
            )?;
            Ok(HttpResponse::Ok().json(ApiResponse::ok(posts)))
        }
    }
}

async fn my_posts(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    query: web::Query<MyPostsQuery>,
) -> AppResult<HttpResponse> {
    let author = user.require(Permission::WriteOwnPost)?;
    let status = parse_filter::<PostStatus>(query.status.as_deref())?;
    let pagination = Pagination { page: query.page, limit: query.limit };
    let posts = post_helpers::list_own_posts(&pool, author, status, pagination)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(posts)))
}

async fn get_post(
    user: Option<CurrentUser>,
    pool: web::Data<DbPool>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let viewer = user.as_ref().map(|u| &u.0);
    let post = post_helpers::get_post(&pool, viewer, &path)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post)))
}

async fn get_post_by_slug(pool: web::Data<DbPool>, path: web::Path<String>) -> AppResult<HttpResponse> {
    let post = post_helpers::get_published_post_by_slug(&pool, &path)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(post)))
}

async fn create_post(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
    form: web::Json<PostForm>,
) -> AppResult<HttpResponse> {
    let author = user.require(Permission::WriteOwnPost)?;
    let post = post_helpers::create_post(&pool, &state, author, &form)?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(post)))
}

async fn update_post(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Json<PostForm>,
) -> AppResult<HttpResponse> {
    let editor = user.require(Permission::WriteOwnPost)?;
    let outcome = post_helpers::update_post(&pool, &state, editor, &path, &form)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(outcome)))
}

async fn delete_post(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let author = user.require(Permission::WriteOwnPost)?;
    post_helpers::delete_post(&pool, &state, author, &path)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(serde_json::json!({ "id": path.into_inner() }))))
}

async fn bulk_delete(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
    body: web::Json<BulkDeleteRequest>,
) -> AppResult<HttpResponse> {
    let author = user.require(Permission::WriteOwnPost)?;
    let report = post_helpers::bulk_delete_posts(&pool, &state, author, &body.ids)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(report)))
}
