//! Account and session handlers: registration, login, logout and the
//! authenticated profile routes under /users/me.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::handlers::{ErrorResponse, MessageResponse};
use crate::middleware::{removal_cookie, CurrentUser, SESSION_COOKIE};
use crate::models::{Session, User, UserResponse};
use crate::services::ServiceError;
use crate::utils::{hash_password, Password, ValidatedJson};
use crate::AppState;
use service_core::error::AppError;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    pub middle_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateMeRequest {
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    pub middle_name: Option<String>,
}

/// Build the Set-Cookie for a freshly issued session. Expiry matches the
/// session record so the browser and the server agree on the lifetime.
fn session_cookie(state: &AppState, session: &Session) -> Result<Cookie<'static>, AppError> {
    let expires = time::OffsetDateTime::from_unix_timestamp(session.expiry_utc.timestamp())
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Invalid session expiry: {}", e)))?;

    Ok(Cookie::build((SESSION_COOKIE, session.session_key.clone()))
        .path("/")
        .http_only(true)
        .secure(state.config.session.cookie_secure)
        .same_site(SameSite::Lax)
        .expires(expires)
        .build())
}

/// Register a new account.
///
/// New accounts start without a role; permissions are granted once an
/// administrator assigns one.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let existing = state
        .users
        .find_by_email(&req.email)
        .await
        .map_err(AppError::DatabaseError)?;
    if existing.is_some() {
        return Err(ServiceError::EmailAlreadyRegistered.into());
    }

    let hash = hash_password(&Password::new(req.password))
        .map_err(AppError::InternalError)?;

    let user = User::new(
        req.email,
        hash.into_string(),
        req.first_name,
        req.last_name,
        req.middle_name,
    );

    state
        .users
        .insert(&user)
        .await
        .map_err(AppError::DatabaseError)?;

    tracing::info!(user_id = %user.user_id, "User registered");

    Ok((StatusCode::CREATED, Json(user.sanitized())))
}

/// Login with email and password. Issues the session cookie.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = UserResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (user, session) = state
        .session_service
        .login(&req.email, &req.password)
        .await?;

    let cookie = session_cookie(&state, &session)?;

    Ok((jar.add(cookie), Json(user.sanitized())))
}

/// Logout the current session. Idempotent.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("session_cookie" = []))
)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    _user: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.session_service.logout(cookie.value()).await?;
    }

    Ok((
        jar.add(removal_cookie()),
        Json(MessageResponse::new("Logged out successfully")),
    ))
}

/// Get the current user's profile.
#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "User",
    security(("session_cookie" = []))
)]
pub async fn get_me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .users
        .find_by_id(user.user_id)
        .await
        .map_err(AppError::DatabaseError)?
        .ok_or(ServiceError::UserNotFound)?;

    Ok(Json(user.sanitized()))
}

/// Update the current user's profile names.
#[utoipa::path(
    patch,
    path = "/users/me",
    request_body = UpdateMeRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "User",
    security(("session_cookie" = []))
)]
pub async fn update_me(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<UpdateMeRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let updated = state
        .users
        .update_profile(
            user.user_id,
            &req.first_name,
            &req.last_name,
            req.middle_name.as_deref(),
        )
        .await
        .map_err(AppError::DatabaseError)?
        .ok_or(ServiceError::UserNotFound)?;

    Ok(Json(updated.sanitized()))
}

/// Deactivate the current account. The record is retained and all of the
/// user's sessions are deactivated; the client's cookie is cleared.
#[utoipa::path(
    delete,
    path = "/users/me",
    responses(
        (status = 200, description = "Account deactivated", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "User",
    security(("session_cookie" = []))
)]
pub async fn delete_me(
    State(state): State<AppState>,
    jar: CookieJar,
    user: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    state.session_service.deactivate_account(user.user_id).await?;

    Ok((
        jar.add(removal_cookie()),
        Json(MessageResponse::new("Account deactivated")),
    ))
}
