use actix_multipart::Multipart;
use actix_web::web;
use chrono::Utc;
use futures_util::StreamExt;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::db_operations::media_db_operations;
use crate::models::{MediaUpload, User};
use crate::DbPool;

/// Maps an accepted image MIME type to the extension files are stored
/// under. Anything not listed is refused.
pub fn image_extension(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        "image/gif" => Some("gif"),
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Public URL of a stored image, sharded by the first four id characters.
pub fn image_url(file_id: &str, ext: &str) -> String {
    format!("/media/images/{}/{}/{}.{}", &file_id[0..2], &file_id[2..4], file_id, ext)
}

fn upload_error(e: actix_multipart::MultipartError) -> AppError {
    AppError::Upload(e.to_string())
}

async fn remove_partial(path: PathBuf) {
    match web::block(move || fs::remove_file(&path)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::error!("Failed to remove partial upload: {}", e),
        Err(e) => log::error!("Blocking error on partial upload delete: {}", e),
    }
}

/// Records a written file; the file is removed again if the row cannot be
/// stored.
async fn record_upload(pool: &DbPool, upload: MediaUpload, path: PathBuf) -> AppResult<MediaUpload> {
    let recorded = pool
        .get()
        .map_err(AppError::from)
        .and_then(|conn| Ok(media_db_operations::add_media_upload(&conn, &upload)?));
    match recorded {
        Ok(()) => Ok(upload),
        Err(e) => {
            remove_partial(path).await;
            Err(e)
        }
    }
}

/// Streams the `image` (or `file`) field of a multipart body to disk and
/// records it against `user`.
pub async fn save_image_upload(
    config: &Config,
    pool: &DbPool,
    user: &User,
    mut payload: Multipart,
) -> AppResult<MediaUpload> {
    let max_bytes = config.max_upload_bytes();
    let file_id = Uuid::new_v4().to_string();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(upload_error)?;
        let field_name = field.content_disposition().get_name().unwrap_or_default().to_string();
        if field_name != "image" && field_name != "file" {
            continue;
        }

        let mime_type = field
            .content_type()
            .map(|m| m.essence_str().to_string())
            .ok_or_else(|| AppError::Upload("Content-Type not available.".to_string()))?;
        let ext = image_extension(&mime_type).ok_or_else(|| {
            AppError::Upload(format!(
                "Unsupported file type: '{}'. Upload a GIF, JPEG, PNG or WebP image.",
                mime_type
            ))
        })?;

        let dir = config.images_path().join(&file_id[0..2]).join(&file_id[2..4]);
        let final_path = dir.join(format!("{}.{}", file_id, ext));

        web::block({
            let dir = dir.clone();
            move || fs::create_dir_all(&dir)
        })
        .await??;

        let mut f = web::block({
            let final_path = final_path.clone();
            move || fs::File::create(final_path)
        })
        .await??;

        let mut file_size: u64 = 0;
        while let Some(chunk) = field.next().await {
            let data = match chunk {
                Ok(data) => data,
                Err(e) => {
                    drop(f);
                    remove_partial(final_path).await;
                    return Err(upload_error(e));
                }
            };
            file_size += data.len() as u64;
            if file_size > max_bytes {
                drop(f);
                remove_partial(final_path).await;
                return Err(AppError::PayloadTooLarge(format!(
                    "Image is too large. Maximum size is {}MB.",
                    config.max_upload_size_mb
                )));
            }
            f = match web::block(move || f.write_all(&data).map(|_| f)).await {
                Ok(Ok(f)) => f,
                Ok(Err(e)) => {
                    remove_partial(final_path).await;
                    return Err(e.into());
                }
                Err(e) => {
                    remove_partial(final_path).await;
                    return Err(e.into());
                }
            };
        }

        if file_size == 0 {
            drop(f);
            remove_partial(final_path).await;
            return Err(AppError::Upload("The uploaded image is empty.".to_string()));
        }

        let upload = MediaUpload {
            id: file_id.clone(),
            user_id: user.id,
            file_path: image_url(&file_id, ext),
            mime_type,
            file_size: file_size as i64,
            uploaded_at: Utc::now(),
        };
        drop(f);
        let upload = record_upload(pool, upload, final_path).await?;
        log::info!("User {} uploaded image {} ({} bytes)", user.id, upload.id, file_size);
        return Ok(upload);
    }

    Err(AppError::Upload("No image was uploaded.".to_string()))
}

pub fn list_user_uploads(pool: &DbPool, user: &User) -> AppResult<Vec<MediaUpload>> {
    let conn = pool.get()?;
    Ok(media_db_operations::list_media_for_user(&conn, user.id)?)
}
