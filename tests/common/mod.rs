//! Shared fixtures for the HTTP integration tests.
#![allow(dead_code)]

use actix_http::Request;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::body::MessageBody;
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::test;
use blogbase_backend::config::{Config, WebConfig};
use blogbase_backend::models::db_operations::users_db_operations;
use blogbase_backend::models::Role;
use blogbase_backend::setup::db_setup;
use blogbase_backend::{build_pool, DbPool};
use r2d2_sqlite::SqliteConnectionManager;
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

pub const PASSWORD: &str = "correct horse battery";

pub struct TestEnv {
    _dir: TempDir,
    pub pool: DbPool,
    pub config: Config,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = dir.path();
        let frontend = root.join("frontend");
        fs::create_dir_all(&frontend).expect("frontend dir");
        fs::write(frontend.join("index.html"), "<!doctype html><div id=\"app\"></div>").expect("index.html");

        let config = Config {
            web: WebConfig { host: "127.0.0.1".to_string(), port: 0 },
            database_path: root.to_string_lossy().into_owned(),
            media_path: root.join("media").to_string_lossy().into_owned(),
            frontend_path: frontend.to_string_lossy().into_owned(),
            allowed_origins: String::new(),
            log_level: "warn".to_string(),
            session_secret_key: "ab".repeat(64),
            use_secure_cookies: false,
            max_upload_size_mb: 1,
        };

        let pool = build_pool(SqliteConnectionManager::file(config.db_path())).expect("pool");
        {
            let mut conn = pool.get().expect("connection");
            db_setup::setup_database(&mut conn).expect("schema");
        }

        TestEnv { _dir: dir, pool, config }
    }

    /// Inserts a user with [`PASSWORD`] and returns its id.
    pub fn seed_user(&self, email: &str, role: Role) -> i64 {
        let conn = self.pool.get().expect("connection");
        let hash = bcrypt::hash(PASSWORD, 4).expect("hash");
        let name = email.split('@').next().unwrap_or(email);
        users_db_operations::insert_user(&conn, email, name, &hash, role).expect("insert user")
    }
}

pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_string())
        .cookie_secure(false)
        .build()
}

/// Builds the full application around a [`TestEnv`].
#[macro_export]
macro_rules! test_app {
    ($env:expr) => {{
        let env = &$env;
        let config = env.config.clone();
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(common::test_session_middleware())
                .app_data(actix_web::web::Data::new(env.pool.clone()))
                .app_data(actix_web::web::Data::new(blogbase_backend::AppState::new()))
                .app_data(actix_web::web::Data::new(env.config.clone()))
                .configure(move |cfg| blogbase_backend::routes::configure_app(cfg, &config)),
        )
        .await
    }};
}

pub async fn call_json<S, B>(app: &S, req: Request) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let res = test::call_service(app, req).await;
    let status = res.status();
    let body = test::read_body(res).await;
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

pub async fn login<S, B>(app: &S, email: &str) -> Cookie<'static>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": email, "password": PASSWORD }))
        .to_request();
    let res = test::call_service(app, req).await;
    assert_eq!(res.status(), StatusCode::OK, "login failed for {email}");
    res.response()
        .cookies()
        .find(|c| c.name() == "session")
        .expect("session cookie")
        .into_owned()
}

/// Sends a JSON request as the holder of `cookie`.
pub async fn send<S, B>(
    app: &S,
    method: &str,
    uri: &str,
    cookie: Option<&Cookie<'static>>,
    body: Option<Value>,
) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let mut req = match method {
        "GET" => test::TestRequest::get(),
        "POST" => test::TestRequest::post(),
        "PUT" => test::TestRequest::put(),
        "DELETE" => test::TestRequest::delete(),
        other => panic!("unsupported method {other}"),
    }
    .uri(uri);
    if let Some(c) = cookie {
        req = req.cookie(c.clone());
    }
    if let Some(b) = body {
        req = req.set_json(b);
    }
    call_json(app, req.to_request()).await
}

pub fn post_body(title: &str) -> Value {
    json!({ "title": title, "content": format!("Body of {title}") })
}
