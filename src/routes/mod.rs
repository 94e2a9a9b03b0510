use actix_web::{error, web, HttpRequest, HttpResponse, Responder};
use std::str::FromStr;

use crate::config::Config;
use crate::error::{AppError, AppResult};

pub mod admin;
pub mod auth;
pub mod comments;
pub mod pages;
pub mod posts;
pub mod publish;
pub mod tags;
pub mod upload;
pub mod users;

/// Registers the JSON API, the media files and, when a frontend directory
/// is configured, the guarded single-page app.
pub fn configure_app(cfg: &mut web::ServiceConfig, config: &Config) {
    cfg.configure(config_api)
        .service(actix_files::Files::new("/media", &config.media_path));
    if !config.frontend_path.is_empty() {
        pages::config_pages(cfg, &config.frontend_path);
    }
}

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .app_data(web::QueryConfig::default().error_handler(query_error))
            .app_data(web::PathConfig::default().error_handler(path_error))
            .route("/is_server_active", web::get().to(is_server_active))
            .configure(auth::config_auth)
            .configure(users::config_users)
            .configure(posts::config_posts)
            .configure(comments::config_comments)
            .configure(tags::config_tags)
            .configure(publish::config_publish)
            .configure(upload::config_upload)
            .configure(admin::config_admin)
            .default_service(web::to(api_not_found)),
    );
}

async fn is_server_active() -> impl Responder {
    HttpResponse::Ok().body("active")
}

async fn api_not_found() -> AppResult<HttpResponse> {
    Err(AppError::NotFound("Resource"))
}

// --- Extractor error mapping ---

fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    match err {
        error::JsonPayloadError::OverflowKnownLength { .. } | error::JsonPayloadError::Overflow { .. } => {
            AppError::PayloadTooLarge("Request body is too large.".to_string()).into()
        }
        other => AppError::Validation(format!("Invalid JSON body: {}", other)).into(),
    }
}

fn query_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(format!("Invalid query string: {}", err)).into()
}

fn path_error(err: error::PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(format!("Invalid path: {}", err)).into()
}

/// Parses an optional enum filter from a query parameter.
pub(crate) fn parse_filter<T>(raw: Option<&str>) -> AppResult<Option<T>>
where
    T: FromStr<Err = String>,
{
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => value.parse().map(Some).map_err(AppError::Validation),
        None => Ok(None),
    }
}
