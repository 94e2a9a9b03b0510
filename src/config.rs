use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub web: WebConfig,
    // Populated from the .env file
    pub database_path: String,
    pub media_path: String,
    pub frontend_path: String,
    pub allowed_origins: String,
    pub log_level: String,
    pub session_secret_key: String,
    pub use_secure_cookies: bool,
    pub max_upload_size_mb: u64,
}

fn missing(var: &str) -> config::ConfigError {
    config::ConfigError::Message(format!(
        "FATAL: Environment variable '{}' is not set in your .env file.",
        var
    ))
}

/// The session key must be 128 hexadecimal characters (64 bytes).
pub fn validate_session_key(key: &str) -> Result<(), config::ConfigError> {
    if key.len() != 128 || !key.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(config::ConfigError::Message(
            "FATAL: 'SESSION_SECRET_KEY' must be 128 hexadecimal characters long (64 bytes).".to_string(),
        ));
    }
    Ok(())
}

pub fn require_absolute(var: &str, value: &str) -> Result<(), config::ConfigError> {
    if Path::new(value).is_relative() {
        return Err(config::ConfigError::Message(format!(
            "FATAL: The '{}' in your .env file is a relative path ('{}'). It MUST be an absolute path.",
            var, value
        )));
    }
    Ok(())
}

impl Config {
    pub fn from_env(env_path: &Path) -> Result<Self, config::ConfigError> {
        dotenvy::from_path(env_path).map_err(|e| {
            config::ConfigError::Message(format!(
                "FATAL: Failed to load .env file from '{}'. Error: {}",
                env_path.display(),
                e
            ))
        })?;

        let database_path = env::var("DATABASE_PATH").map_err(|_| missing("DATABASE_PATH"))?;
        let media_path = env::var("MEDIA_PATH").map_err(|_| missing("MEDIA_PATH"))?;
        let session_secret_key =
            env::var("SESSION_SECRET_KEY").map_err(|_| missing("SESSION_SECRET_KEY"))?;
        validate_session_key(&session_secret_key)?;

        require_absolute("DATABASE_PATH", &database_path)?;
        require_absolute("MEDIA_PATH", &media_path)?;

        // An empty frontend path disables the guarded page routes.
        let frontend_path = env::var("FRONTEND_PATH").unwrap_or_default();
        if !frontend_path.is_empty() {
            require_absolute("FRONTEND_PATH", &frontend_path)?;
        }

        let allowed_origins = env::var("ALLOWED_ORIGINS").unwrap_or_default();
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let use_secure_cookies = env::var("USE_SECURE_COOKIES")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);
        let max_upload_size_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5);

        let builder = config::Config::builder()
            .set_default("web.host", "127.0.0.1")?
            .set_default("web.port", 8080)?
            // Host/port come from the TOML file when present.
            .add_source(config::File::new("config/default.toml", config::FileFormat::Toml).required(false))
            .set_override("database_path", database_path)?
            .set_override("media_path", media_path)?
            .set_override("frontend_path", frontend_path)?
            .set_override("session_secret_key", session_secret_key)?
            .set_override("allowed_origins", allowed_origins)?
            .set_override("log_level", log_level)?
            .set_override("use_secure_cookies", use_secure_cookies)?
            .set_override("max_upload_size_mb", max_upload_size_mb)?
            .build()?;

        builder.try_deserialize()
    }

    /// Returns the full path to the SQLite database file.
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.database_path).join("blogbase.db")
    }

    pub fn images_path(&self) -> PathBuf {
        PathBuf::from(&self.media_path).join("images")
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }
}
