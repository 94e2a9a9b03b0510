use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};

use crate::config::Config;
use crate::error::AppResult;
use crate::helper::media_helpers;
use crate::middleware::CurrentUser;
use crate::models::permissions::Permission;
use crate::models::ApiResponse;
use crate::DbPool;

pub fn config_upload(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/upload")
            .route("/image", web::post().to(upload_image))
            .route("/images", web::get().to(my_images)),
    );
}

async fn upload_image(
    user: CurrentUser,
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let uploader = user.require(Permission::WriteOwnPost)?;
    let upload = media_helpers::save_image_upload(&config, &pool, uploader, payload).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(upload)))
}

async fn my_images(user: CurrentUser, pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    let uploader = user.require(Permission::WriteOwnPost)?;
    let uploads = media_helpers::list_user_uploads(&pool, uploader)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(uploads)))
}
