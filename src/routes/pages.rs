use actix_files::{Files, NamedFile};
use actix_web::dev::{fn_service, ServiceRequest, ServiceResponse};
use actix_web::web;
use std::path::PathBuf;

use crate::middleware::RouteGuard;

/// Serves the frontend build behind the route guard. Paths that are not
/// files fall back to `index.html` so client-side routes resolve.
pub fn config_pages(cfg: &mut web::ServiceConfig, frontend_path: &str) {
    let index = PathBuf::from(frontend_path).join("index.html");

    cfg.service(
        web::scope("").wrap(RouteGuard).service(
            Files::new("/", frontend_path)
                .index_file("index.html")
                .default_handler(fn_service(move |req: ServiceRequest| {
                    let index = index.clone();
                    async move {
                        let (req, _) = req.into_parts();
                        let file = NamedFile::open_async(&index).await?;
                        let res = file.into_response(&req);
                        Ok::<_, actix_web::Error>(ServiceResponse::new(req, res))
                    }
                })),
        ),
    );
}
