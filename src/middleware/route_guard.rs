//! Redirect rules for the single-page app's routes.
//!
//! Protected sections send anonymous visitors to the login page with a
//! `redirect` parameter pointing back at where they were headed; the
//! login and signup pages send already signed-in users to their dashboard.

use url::form_urlencoded;

use crate::models::{Role, User};

pub const LOGIN_PATH: &str = "/login";
pub const SIGNUP_PATH: &str = "/signup";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const ADMIN_PATH: &str = "/admin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

fn in_section(path: &str, section: &str) -> bool {
    path == section
        || path
            .strip_prefix(section)
            .map_or(false, |rest| rest.starts_with('/'))
}

fn login_redirect(path: &str, query: &str) -> String {
    let target = if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query)
    };
    let encoded: String = form_urlencoded::Serializer::new(String::new())
        .append_pair("redirect", &target)
        .finish();
    format!("{}?{}", LOGIN_PATH, encoded)
}

pub fn guard_decision(path: &str, query: &str, user: Option<&User>) -> GuardDecision {
    let protected = in_section(path, DASHBOARD_PATH) || in_section(path, ADMIN_PATH);

    match user {
        None if protected => GuardDecision::Redirect(login_redirect(path, query)),
        None => GuardDecision::Allow,
        Some(_) if path == LOGIN_PATH || path == SIGNUP_PATH => {
            GuardDecision::Redirect(DASHBOARD_PATH.to_string())
        }
        Some(u) if in_section(path, ADMIN_PATH) && u.role != Role::Admin => {
            GuardDecision::Redirect(DASHBOARD_PATH.to_string())
        }
        Some(_) => GuardDecision::Allow,
    }
}
