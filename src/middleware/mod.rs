use actix_session::{Session, SessionExt};
use actix_web::{
    body::EitherBody,
    dev::{self, forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, FromRequest, HttpRequest, HttpResponse,
};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use std::future::{ready, Ready as StdReady};
use std::ops::Deref;

use crate::error::AppError;
use crate::models::db_operations::users_db_operations;
use crate::models::permissions::Permission;
use crate::models::{Role, User};
use crate::DbPool;

pub mod route_guard;

pub use route_guard::{guard_decision, GuardDecision};

pub const USER_ID_KEY: &str = "user_id";

/// Stores the authenticated user's id in a fresh session.
pub fn persist_login(session: &Session, user_id: i64) -> Result<(), AppError> {
    session.renew();
    session
        .insert(USER_ID_KEY, user_id)
        .map_err(|e| AppError::Session(e.to_string()))
}

pub fn clear_login(session: &Session) {
    session.purge();
}

/// Loads the user behind the session cookie, if any. A session pointing at
/// a deleted user is purged.
pub fn load_session_user(session: &Session, pool: &DbPool) -> Result<Option<User>, AppError> {
    let user_id = match session.get::<i64>(USER_ID_KEY) {
        Ok(Some(id)) => id,
        Ok(None) => return Ok(None),
        Err(e) => {
            log::warn!("Discarding unreadable session: {}", e);
            session.purge();
            return Ok(None);
        }
    };

    let conn = pool.get()?;
    match users_db_operations::read_user_by_id(&conn, user_id)? {
        Some(user) => Ok(Some(user)),
        None => {
            log::warn!("Session refers to missing user {}; purging.", user_id);
            session.purge();
            Ok(None)
        }
    }
}

/// The authenticated principal for the current request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    /// Fails with 403 unless the user's role grants `permission`.
    pub fn require(&self, permission: Permission) -> Result<&User, AppError> {
        if self.0.role.allows(permission) {
            Ok(&self.0)
        } else {
            log::info!(
                "Denied {:?} to user {} with role {}",
                permission,
                self.0.id,
                self.0.role
            );
            Err(AppError::Forbidden(forbidden_message(permission)))
        }
    }
}

impl Deref for CurrentUser {
    type Target = User;

    fn deref(&self) -> &User {
        &self.0
    }
}

fn forbidden_message(permission: Permission) -> String {
    let needed = Role::minimum_for(permission);
    format!(
        "You do not have permission to do that. This action requires the {} role.",
        needed
    )
}

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = StdReady<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let Some(pool) = req.app_data::<web::Data<DbPool>>() else {
            log::error!("DbPool missing from app data.");
            return ready(Err(AppError::Session("database pool not configured".to_string())));
        };
        let session = req.get_session();
        ready(match load_session_user(&session, pool) {
            Ok(Some(user)) => Ok(CurrentUser(user)),
            Ok(None) => Err(AppError::Unauthorized),
            Err(e) => Err(e),
        })
    }
}

// --- Page route guard ---

/// Redirects page requests according to [`guard_decision`].
pub struct RouteGuard;

impl<S, B> Transform<S, ServiceRequest> for RouteGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RouteGuardMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RouteGuardMiddleware { service })
    }
}

pub struct RouteGuardMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RouteGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let user = match req.app_data::<web::Data<DbPool>>() {
            Some(pool) => load_session_user(&req.get_session(), pool).unwrap_or_else(|e| {
                log::error!("Route guard could not load session user: {}", e);
                None
            }),
            None => None,
        };

        match guard_decision(req.path(), req.query_string(), user.as_ref()) {
            GuardDecision::Allow => {
                let fut = self.service.call(req);
                Box::pin(async move {
                    let res = fut.await?;
                    Ok(res.map_into_left_body())
                })
            }
            GuardDecision::Redirect(location) => Box::pin(async move {
                let (http_req, _payload) = req.into_parts();
                let res = HttpResponse::Found()
                    .append_header(("location", location))
                    .finish()
                    .map_into_right_body();
                Ok(ServiceResponse::new(http_req, res))
            }),
        }
    }
}
