//! Administration of permission rules.
//!
//! Roles, business elements and the initial rule set are provisioned out
//! of band; these routes let an administrator inspect and adjust the
//! flags at runtime. Every route requires the administrator role. On the
//! object routes an unknown rule id reports 404 before the role gate
//! runs.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::handlers::{ErrorResponse, MessageResponse};
use crate::middleware::CurrentUser;
use crate::models::RuleResponse;
use crate::services::{Identity, ServiceError};
use crate::AppState;
use service_core::error::AppError;

/// Full replacement of a rule's permission flags.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRuleRequest {
    pub read_own: bool,
    pub read_all: bool,
    pub create_own: bool,
    pub update_own: bool,
    pub update_all: bool,
    pub delete_own: bool,
    pub delete_all: bool,
}

fn identity_of(user: &CurrentUser) -> Identity {
    Identity::User {
        user_id: user.user_id,
        role_id: user.role_id,
    }
}

async fn require_admin(state: &AppState, user: &CurrentUser) -> Result<(), AppError> {
    if state.access_service.is_admin(&identity_of(user)).await? {
        Ok(())
    } else {
        Err(ServiceError::Forbidden.into())
    }
}

/// List every permission rule.
#[utoipa::path(
    get,
    path = "/access-rules",
    responses(
        (status = 200, description = "All rules", body = [RuleResponse]),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Administrator role required", body = ErrorResponse)
    ),
    tag = "Access Rules",
    security(("session_cookie" = []))
)]
pub async fn list_rules(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<RuleResponse>>, AppError> {
    require_admin(&state, &user).await?;

    let rules = state
        .rules
        .list_rules()
        .await
        .map_err(AppError::DatabaseError)?;

    Ok(Json(rules.into_iter().map(RuleResponse::from).collect()))
}

/// Get one rule by id.
#[utoipa::path(
    get,
    path = "/access-rules/{rule_id}",
    params(("rule_id" = Uuid, Path, description = "Rule id")),
    responses(
        (status = 200, description = "The rule", body = RuleResponse),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
        (status = 404, description = "Rule not found", body = ErrorResponse)
    ),
    tag = "Access Rules",
    security(("session_cookie" = []))
)]
pub async fn get_rule(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(rule_id): Path<Uuid>,
) -> Result<Json<RuleResponse>, AppError> {
    let rule = state
        .rules
        .find_rule_by_id(rule_id)
        .await
        .map_err(AppError::DatabaseError)?
        .ok_or(ServiceError::RuleNotFound)?;

    require_admin(&state, &user).await?;

    Ok(Json(RuleResponse::from(rule)))
}

/// Replace a rule's flags.
#[utoipa::path(
    put,
    path = "/access-rules/{rule_id}",
    params(("rule_id" = Uuid, Path, description = "Rule id")),
    request_body = UpdateRuleRequest,
    responses(
        (status = 200, description = "Updated rule", body = RuleResponse),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
        (status = 404, description = "Rule not found", body = ErrorResponse)
    ),
    tag = "Access Rules",
    security(("session_cookie" = []))
)]
pub async fn update_rule(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(rule_id): Path<Uuid>,
    Json(req): Json<UpdateRuleRequest>,
) -> Result<Json<RuleResponse>, AppError> {
    let mut rule = state
        .rules
        .find_rule_by_id(rule_id)
        .await
        .map_err(AppError::DatabaseError)?
        .ok_or(ServiceError::RuleNotFound)?;

    require_admin(&state, &user).await?;

    rule.read_own = req.read_own;
    rule.read_all = req.read_all;
    rule.create_own = req.create_own;
    rule.update_own = req.update_own;
    rule.update_all = req.update_all;
    rule.delete_own = req.delete_own;
    rule.delete_all = req.delete_all;

    let updated = state
        .rules
        .update_rule(&rule)
        .await
        .map_err(AppError::DatabaseError)?;
    if !updated {
        return Err(ServiceError::RuleNotFound.into());
    }

    tracing::info!(rule_id = %rule.rule_id, "Access rule updated");

    Ok(Json(RuleResponse::from(rule)))
}

/// Delete a rule. The affected role loses all access to the element.
#[utoipa::path(
    delete,
    path = "/access-rules/{rule_id}",
    params(("rule_id" = Uuid, Path, description = "Rule id")),
    responses(
        (status = 200, description = "Rule deleted", body = MessageResponse),
        (status = 403, description = "Administrator role required", body = ErrorResponse),
        (status = 404, description = "Rule not found", body = ErrorResponse)
    ),
    tag = "Access Rules",
    security(("session_cookie" = []))
)]
pub async fn delete_rule(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(rule_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .rules
        .find_rule_by_id(rule_id)
        .await
        .map_err(AppError::DatabaseError)?
        .ok_or(ServiceError::RuleNotFound)?;

    require_admin(&state, &user).await?;

    let deleted = state
        .rules
        .delete_rule(rule_id)
        .await
        .map_err(AppError::DatabaseError)?;
    if !deleted {
        return Err(ServiceError::RuleNotFound.into());
    }

    tracing::info!(%rule_id, "Access rule deleted");

    Ok(Json(MessageResponse::new("Rule deleted")))
}
