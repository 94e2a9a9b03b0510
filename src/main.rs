use actix_cors::Cors;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{
    cookie::{Key, SameSite},
    http::header,
    middleware::{DefaultHeaders, Logger},
    web, App, HttpServer,
};
use blogbase_backend::{build_pool, config::Config, routes, AppState};
use clap::Parser;
use r2d2_sqlite::SqliteConnectionManager;
use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "blogbase_server", author, version, about = "Starts the BlogBase API server.")]
struct Cli {
    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

fn fatal(message: String) -> io::Error {
    eprintln!("FATAL: {}", message);
    io::Error::new(io::ErrorKind::Other, message)
}

fn build_cors(allowed_origins: &str) -> Cors {
    let cors = if allowed_origins.trim() == "*" {
        Cors::default().allow_any_origin()
    } else {
        allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };
    cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .supports_credentials()
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file)
        .map_err(|e| fatal(format!("Failed to load or parse configuration: {}", e)))?;

    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    fs::create_dir_all(config.images_path())
        .map_err(|e| fatal(format!("Failed to create media directory: {}", e)))?;

    let db_path = config.db_path();
    if !db_path.exists() {
        return Err(fatal(format!(
            "Database not found at '{}'. Run 'setup_cli --env-file <path> db setup' first.",
            db_path.display()
        )));
    }

    let pool = build_pool(SqliteConnectionManager::file(&db_path))
        .map_err(|e| fatal(format!("Failed to create SQLite connection pool: {}", e)))?;

    let session_key_bytes = hex::decode(&config.session_secret_key)
        .map_err(|e| fatal(format!("SESSION_SECRET_KEY is not valid hex: {}", e)))?;
    let session_key = Key::try_from(session_key_bytes.as_slice())
        .map_err(|e| fatal(format!("SESSION_SECRET_KEY is too short: {}", e)))?;

    let app_state = web::Data::new(AppState::new());
    let pool_data = web::Data::new(pool);
    let config_data = web::Data::new(config.clone());

    let server_address = format!("{}:{}", config.web.host, config.web.port);
    log::info!("Server starting at http://{}", server_address);

    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(CookieSessionStore::default(), session_key.clone())
            .cookie_name("session".to_string())
            .cookie_secure(config.use_secure_cookies)
            .cookie_http_only(true)
            .cookie_same_site(SameSite::Lax)
            .build();

        App::new()
            .wrap(session_mw)
            .wrap(build_cors(&config.allowed_origins))
            .wrap(Logger::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("X-XSS-Protection", "1; mode=block")),
            )
            .app_data(config_data.clone())
            .app_data(pool_data.clone())
            .app_data(app_state.clone())
            .configure(|cfg| routes::configure_app(cfg, &config))
    })
    .bind(server_address)?
    .run()
    .await
}
