use bcrypt::{hash, DEFAULT_COST};
use blogbase_backend::config::Config;
use blogbase_backend::helper::auth_helpers;
use blogbase_backend::models::db_operations::users_db_operations;
use blogbase_backend::models::Role;
use blogbase_backend::setup::db_setup::{self, SetupError};
use clap::{Parser, Subcommand};
use rand::RngCore;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "setup_cli", author, version, about = "A CLI for initial application setup.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file. Required by every command
    /// that touches the database.
    #[arg(long, global = true, value_name = "FILE")]
    env_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    /// Creates the database file, tables and indexes.
    Setup,
}

#[derive(Subcommand, Debug)]
enum AdminAction {
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
    },
    List,
}

#[derive(Subcommand, Debug)]
enum UserAction {
    SetRole {
        #[arg(long)]
        email: String,
        #[arg(long)]
        role: String,
    },
}

#[derive(Subcommand, Debug)]
enum KeyAction {
    /// Prints a fresh SESSION_SECRET_KEY value.
    Generate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Key { action: KeyAction::Generate } => {
            println!("{}", generate_session_key());
            Ok(())
        }
        command => load_config(cli.env_file.as_ref()).and_then(|config| match command {
            Commands::Db { action: DbAction::Setup } => setup_database(&config),
            Commands::Admin { action: AdminAction::Create { email, name, password } } => {
                create_admin_user(&config, email, name, password)
            }
            Commands::Admin { action: AdminAction::List } => list_admin_users(&config),
            Commands::User { action: UserAction::SetRole { email, role } } => {
                set_user_role(&config, email, role)
            }
            Commands::Key { .. } => Ok(()),
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(env_file: Option<&PathBuf>) -> Result<Config, SetupError> {
    let path = env_file.ok_or_else(|| {
        SetupError::Invalid("This command needs --env-file <FILE>.".to_string())
    })?;
    Ok(Config::from_env(path)?)
}

fn generate_session_key() -> String {
    let mut bytes = [0u8; 64];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn open_existing(config: &Config) -> Result<Connection, SetupError> {
    let db_path = config.db_path();
    if !db_path.exists() {
        return Err(SetupError::Invalid(format!(
            "Database not found at '{}'. Please run `setup_cli db setup` first.",
            db_path.display()
        )));
    }
    let conn = Connection::open(&db_path)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

fn setup_database(config: &Config) -> Result<(), SetupError> {
    let db_path = config.db_path();
    println!("Setting up database at '{}'...", db_path.display());

    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir)?;
    }
    fs::create_dir_all(config.images_path())?;

    let mut conn = Connection::open(&db_path)?;
    db_setup::setup_database(&mut conn)?;
    println!("✅ Database setup completed successfully.");
    Ok(())
}

fn create_admin_user(config: &Config, email: &str, name: &str, password: &str) -> Result<(), SetupError> {
    let invalid = |e: blogbase_backend::error::AppError| SetupError::Invalid(e.to_string());
    let email = auth_helpers::normalize_email(email);
    auth_helpers::validate_email(&email).map_err(invalid)?;
    let name = auth_helpers::validate_name(name).map_err(invalid)?;
    auth_helpers::validate_password(password).map_err(invalid)?;

    let conn = open_existing(config)?;
    let hashed_password = hash(password, DEFAULT_COST)?;
    match users_db_operations::insert_user(&conn, &email, &name, &hashed_password, Role::Admin) {
        Ok(id) => {
            println!("✅ Admin user '{}' created with id {}.", email, id);
            Ok(())
        }
        Err(e) => Err(SetupError::Invalid(format!(
            "Could not create admin user: {}. The email might already be registered.",
            e
        ))),
    }
}

fn list_admin_users(config: &Config) -> Result<(), SetupError> {
    let conn = open_existing(config)?;
    let admins = users_db_operations::read_all_users(&conn, Some(Role::Admin))?;

    println!("Listing Admin Users:");
    if admins.is_empty() {
        println!("(none)");
    }
    for admin in admins {
        println!("- {} <{}> (id {})", admin.name, admin.email, admin.id);
    }
    Ok(())
}

fn set_user_role(config: &Config, email: &str, role: &str) -> Result<(), SetupError> {
    let role: Role = role.parse().map_err(SetupError::Invalid)?;
    let email = auth_helpers::normalize_email(email);
    let conn = open_existing(config)?;

    match users_db_operations::update_user_role_by_email(&conn, &email, role)? {
        0 => Err(SetupError::Invalid(format!("No user with email '{}' found.", email))),
        _ => {
            println!("✅ '{}' is now {}.", email, role);
            Ok(())
        }
    }
}
