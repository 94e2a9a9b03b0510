use serde::Deserialize;

use crate::error::{conflict_on_unique, AppError, AppResult};
use crate::helper::sanitization_helpers::clean_plain_text;
use crate::models::db_operations::users_db_operations;
use crate::models::{Role, User};
use crate::DbPool;

pub const MIN_PASSWORD_LEN: usize = 8;
// bcrypt only looks at the first 72 bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;
pub const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> AppResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
        }
        None => false,
    };
    if !valid || email.chars().any(char::is_whitespace) || email.len() > 254 {
        return Err(AppError::validation("Please enter a valid email address."));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters long.",
            MIN_PASSWORD_LEN
        )));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::Validation(format!(
            "Password cannot exceed {} bytes.",
            MAX_PASSWORD_BYTES
        )));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> AppResult<String> {
    let clean = clean_plain_text(name);
    if clean.is_empty() {
        return Err(AppError::validation("Name is required."));
    }
    if clean.chars().count() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Name cannot exceed {} characters.",
            MAX_NAME_LEN
        )));
    }
    Ok(clean)
}

/// Registers a new READER account. Role upgrades happen only through an admin.
pub fn signup(pool: &DbPool, form: &SignupForm) -> AppResult<User> {
    let email = normalize_email(&form.email);
    validate_email(&email)?;
    let name = validate_name(&form.name)?;
    validate_password(&form.password)?;

    let conn = pool.get()?;
    let user_id = users_db_operations::create_user(&conn, &email, &name, &form.password, Role::Reader)
        .map_err(|e| conflict_on_unique(e, "An account with this email already exists."))?;
    log::info!("New account registered: user {}", user_id);

    users_db_operations::read_user_by_id(&conn, user_id)?.ok_or(AppError::NotFound("User"))
}

pub fn login(pool: &DbPool, form: &LoginForm) -> AppResult<User> {
    let email = normalize_email(&form.email);
    if email.is_empty() || form.password.is_empty() {
        return Err(AppError::validation("Email and password are required."));
    }

    let conn = pool.get()?;
    match users_db_operations::verify_credentials(&conn, &email, &form.password)? {
        Some(user) => {
            users_db_operations::update_last_login_time(&conn, user.id)?;
            log::info!("User {} logged in", user.id);
            Ok(user)
        }
        None => {
            log::warn!("Failed login attempt for {}", email);
            Err(AppError::InvalidCredentials)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_is_checked() {
        assert!(validate_email("ada@example.com").is_ok());
        for bad in ["", "ada", "ada@", "@example.com", "ada@example", "a da@example.com", "ada@.com"] {
            assert!(validate_email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn password_length_bounds() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
        assert!(validate_password(&"x".repeat(73)).is_err());
    }

    #[test]
    fn names_are_cleaned_and_required() {
        assert_eq!(validate_name("  <i>Ada</i> ").unwrap(), "Ada");
        assert!(validate_name("   ").is_err());
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
