use crate::models::{Role, User};
use bcrypt::{hash, verify, BcryptError};
use chrono::Utc;
use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension, Row};

const USER_COLUMNS: &str = "id, email, name, role, email_verified, created_at, last_login_at";

fn bcrypt_to_rusqlite_error(e: BcryptError) -> RusqliteError {
    RusqliteError::ToSqlConversionFailure(Box::new(e))
}

fn map_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        role: row.get(3)?,
        email_verified: row.get(4)?,
        created_at: row.get(5)?,
        last_login_at: row.get(6)?,
    })
}

/// Inserts a user with an already computed bcrypt hash.
pub fn insert_user(
    conn: &Connection,
    email: &str,
    name: &str,
    password_hash: &str,
    role: Role,
) -> Result<i64, RusqliteError> {
    conn.execute(
        "INSERT INTO users (email, name, password_hash, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![email, name, password_hash, role, Utc::now()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn create_user(
    conn: &Connection,
    email: &str,
    name: &str,
    password: &str,
    role: Role,
) -> Result<i64, RusqliteError> {
    let hashed_password = hash(password, bcrypt::DEFAULT_COST).map_err(bcrypt_to_rusqlite_error)?;
    insert_user(conn, email, name, &hashed_password, role)
}

pub fn read_user_by_id(conn: &Connection, user_id: i64) -> Result<Option<User>, RusqliteError> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        [user_id],
        map_user,
    )
    .optional()
}

pub fn read_all_users(conn: &Connection, role: Option<Role>) -> Result<Vec<User>, RusqliteError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM users WHERE (?1 IS NULL OR role = ?1) ORDER BY id",
        USER_COLUMNS
    ))?;
    let users = stmt.query_map(params![role], map_user)?.collect();
    users
}

pub fn update_user_role(conn: &Connection, user_id: i64, role: Role) -> Result<usize, RusqliteError> {
    conn.execute("UPDATE users SET role = ?1 WHERE id = ?2", params![role, user_id])
}

pub fn update_user_role_by_email(conn: &Connection, email: &str, role: Role) -> Result<usize, RusqliteError> {
    conn.execute("UPDATE users SET role = ?1 WHERE email = ?2", params![role, email])
}

/// Returns the user when the email exists and the password matches its hash.
pub fn verify_credentials(
    conn: &Connection,
    email: &str,
    password: &str,
) -> Result<Option<User>, RusqliteError> {
    let stored: Option<(i64, String)> = conn
        .query_row(
            "SELECT id, password_hash FROM users WHERE email = ?1",
            [email],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match stored {
        Some((id, hash)) if verify(password, &hash).unwrap_or(false) => read_user_by_id(conn, id),
        _ => Ok(None),
    }
}

pub fn update_last_login_time(conn: &Connection, user_id: i64) -> Result<(), RusqliteError> {
    conn.execute(
        "UPDATE users SET last_login_at = ?1 WHERE id = ?2",
        params![Utc::now(), user_id],
    )?;
    Ok(())
}

pub fn count_users_by_role(conn: &Connection) -> Result<Vec<(Role, i64)>, RusqliteError> {
    let mut stmt = conn.prepare("SELECT role, COUNT(*) FROM users GROUP BY role ORDER BY role")?;
    let counts = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?.collect();
    counts
}
