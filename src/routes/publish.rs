use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppResult;
use crate::helper::publish_helpers::{self, RequestMessage, ReviewDecision};
use crate::middleware::CurrentUser;
use crate::models::permissions::Permission;
use crate::models::{ApiResponse, Pagination, RequestStatus};
use crate::routes::parse_filter;
use crate::{AppState, DbPool};

#[derive(Deserialize)]
struct RequestListQuery {
    page: Option<u32>,
    limit: Option<u32>,
    status: Option<String>,
}

impl RequestListQuery {
    fn pagination(&self) -> Pagination {
        Pagination { page: self.page, limit: self.limit }
    }
}

pub fn config_publish(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/publish")
            .route("/posts/{post_id}/request", web::post().to(request_publish))
            .route("/requests", web::get().to(all_requests))
            .route("/requests/{id}/cancel", web::post().to(cancel_request))
            .route("/requests/{id}/approve", web::post().to(approve_request))
            .route("/requests/{id}/reject", web::post().to(reject_request))
            .route("/my-requests", web::get().to(my_requests)),
    );
}

// The message body is optional on every workflow call.
fn message_of(body: &Option<web::Json<RequestMessage>>) -> Option<&str> {
    body.as_ref().and_then(|b| b.message.as_deref())
}

async fn request_publish(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: Option<web::Json<RequestMessage>>,
) -> AppResult<HttpResponse> {
    let author = user.require(Permission::RequestPublish)?;
    let request = publish_helpers::request_publish(&pool, &state, author, &path, message_of(&body))?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(request)))
}

async fn cancel_request(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let request_id = path.into_inner();
    publish_helpers::cancel_request(&pool, &state, &user, request_id)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "id": request_id }))))
}

async fn review(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
    request_id: i64,
    decision: ReviewDecision,
    body: Option<web::Json<RequestMessage>>,
) -> AppResult<HttpResponse> {
    let reviewer = user.require(Permission::ReviewPublishRequest)?;
    let request =
        publish_helpers::review_request(&pool, &state, reviewer, request_id, decision, message_of(&body))?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(request)))
}

async fn approve_request(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: Option<web::Json<RequestMessage>>,
) -> AppResult<HttpResponse> {
    review(user, pool, state, path.into_inner(), ReviewDecision::Approve, body).await
}

async fn reject_request(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: Option<web::Json<RequestMessage>>,
) -> AppResult<HttpResponse> {
    review(user, pool, state, path.into_inner(), ReviewDecision::Reject, body).await
}

async fn my_requests(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    query: web::Query<RequestListQuery>,
) -> AppResult<HttpResponse> {
    let author = user.require(Permission::RequestPublish)?;
    let status = parse_filter::<RequestStatus>(query.status.as_deref())?;
    let requests = publish_helpers::list_requests(&pool, Some(author.id), status, query.pagination())?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(requests)))
}

async fn all_requests(
    user: CurrentUser,
    pool: web::Data<DbPool>,
    query: web::Query<RequestListQuery>,
) -> AppResult<HttpResponse> {
    user.require(Permission::ReviewPublishRequest)?;
    let status = parse_filter::<RequestStatus>(query.status.as_deref())?;
    let requests = publish_helpers::list_requests(&pool, None, status, query.pagination())?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(requests)))
}
