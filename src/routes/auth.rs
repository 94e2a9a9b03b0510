use actix_session::Session;
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::error::AppResult;
use crate::helper::auth_helpers::{self, LoginForm, SignupForm};
use crate::middleware::{clear_login, persist_login};
use crate::models::ApiResponse;
use crate::DbPool;

pub fn config_auth(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/signup", web::post().to(signup))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout)),
    );
}

async fn signup(
    session: Session,
    pool: web::Data<DbPool>,
    form: web::Json<SignupForm>,
) -> AppResult<HttpResponse> {
    let user = auth_helpers::signup(&pool, &form)?;
    persist_login(&session, user.id)?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(user)))
}

async fn login(
    session: Session,
    pool: web::Data<DbPool>,
    form: web::Json<LoginForm>,
) -> AppResult<HttpResponse> {
    let user = auth_helpers::login(&pool, &form)?;
    persist_login(&session, user.id)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(user)))
}

async fn logout(session: Session) -> HttpResponse {
    clear_login(&session);
    HttpResponse::Ok().json(ApiResponse::ok(json!({ "message": "Logged out." })))
}
