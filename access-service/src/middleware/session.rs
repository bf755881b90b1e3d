//! Session resolution middleware and the authenticated-user extractor.
//!
//! Runs on every request: reads the session cookie, resolves it to an
//! identity and stores that identity in the request extensions. Requests
//! without a valid session proceed as anonymous; route handlers decide
//! whether anonymous is acceptable. When a dead session is detected the
//! response gets a clearing Set-Cookie so the client stops presenting
//! the stale token.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use service_core::error::AppError;
use uuid::Uuid;

use crate::services::Identity;
use crate::AppState;

/// Name of the cookie carrying the opaque session token.
pub const SESSION_COOKIE: &str = "session_key";

pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let jar = CookieJar::from_headers(req.headers());
    let token = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());

    let outcome = state.session_service.authenticate(token.as_deref()).await?;

    req.extensions_mut().insert(outcome.identity);

    let mut response = next.run(req).await;

    if outcome.clear_cookie {
        if let Ok(value) = HeaderValue::from_str(&removal_cookie().to_string()) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    Ok(response)
}

/// A Set-Cookie value that makes the client drop its session cookie.
/// Attributes must match the ones used when the cookie was issued.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
}

/// Extractor for routes that require an authenticated caller. Rejects
/// anonymous requests with 401.
pub struct CurrentUser {
    pub user_id: Uuid,
    pub role_id: Option<Uuid>,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts.extensions.get::<Identity>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Identity missing from request extensions"
            ))
            .into_response()
        })?;

        match identity {
            Identity::User { user_id, role_id } => Ok(CurrentUser {
                user_id: *user_id,
                role_id: *role_id,
            }),
            Identity::Anonymous => Err(AppError::Unauthorized(anyhow::anyhow!(
                "Authentication required"
            ))
            .into_response()),
        }
    }
}
