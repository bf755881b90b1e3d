//! Product routes, the permission-governed resource.
//!
//! Every route resolves the caller's rule for the "products" element and
//! lets the decision engine pick the scope. On object routes the record
//! is fetched first, so an unknown id reports 404 regardless of the
//! caller's permissions; ownership gating only applies to records that
//! exist.

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::handlers::{ErrorResponse, MessageResponse};
use crate::middleware::CurrentUser;
use crate::models::{Product, ProductResponse, Verb};
use crate::services::{AccessScope, Identity, ServiceError};
use crate::utils::ValidatedJson;
use crate::AppState;
use service_core::error::AppError;

/// Element name the product routes are governed by.
const ELEMENT: &str = "products";

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ProductRequest {
    #[validate(length(min = 1))]
    pub name: String,
}

fn identity_of(user: &CurrentUser) -> Identity {
    Identity::User {
        user_id: user.user_id,
        role_id: user.role_id,
    }
}

/// List products visible to the caller. "Own" scope narrows the result
/// to the caller's records; "all" returns everything.
#[utoipa::path(
    get,
    path = "/products",
    responses(
        (status = 200, description = "Visible products", body = [ProductResponse]),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Permission denied", body = ErrorResponse)
    ),
    tag = "Products",
    security(("session_cookie" = []))
)]
pub async fn list_products(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let decision = state
        .access_service
        .decide(&identity_of(&user), ELEMENT, Some(Verb::Get), None)
        .await?;
    if !decision.allow {
        return Err(ServiceError::Forbidden.into());
    }

    let mut products = state
        .products
        .list()
        .await
        .map_err(AppError::DatabaseError)?;

    if decision.scope == AccessScope::Own {
        products.retain(|p| p.owner_id == user.user_id);
    }

    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

/// Create a product owned by the caller.
#[utoipa::path(
    post,
    path = "/products",
    request_body = ProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Permission denied", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Products",
    security(("session_cookie" = []))
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(req): ValidatedJson<ProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    let decision = state
        .access_service
        .decide(&identity_of(&user), ELEMENT, Some(Verb::Post), None)
        .await?;
    if !decision.allow {
        return Err(ServiceError::Forbidden.into());
    }

    let product = Product::new(req.name, user.user_id);
    state
        .products
        .insert(&product)
        .await
        .map_err(AppError::DatabaseError)?;

    tracing::info!(product_id = %product.product_id, owner_id = %product.owner_id, "Product created");

    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

/// Get one product by id.
#[utoipa::path(
    get,
    path = "/products/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "The product", body = ProductResponse),
        (status = 403, description = "Permission denied", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse)
    ),
    tag = "Products",
    security(("session_cookie" = []))
)]
pub async fn get_product(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = find_product(&state, product_id).await?;

    let decision = state
        .access_service
        .decide(
            &identity_of(&user),
            ELEMENT,
            Some(Verb::Get),
            Some(product.owner_id),
        )
        .await?;
    if !decision.allow {
        return Err(ServiceError::Forbidden.into());
    }

    Ok(Json(ProductResponse::from(product)))
}

/// Rename a product. PUT and PATCH behave the same; both consult the
/// update pair of flags.
#[utoipa::path(
    put,
    path = "/products/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product id")),
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Updated product", body = ProductResponse),
        (status = 403, description = "Permission denied", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Products",
    security(("session_cookie" = []))
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(product_id): Path<Uuid>,
    method: Method,
    ValidatedJson(req): ValidatedJson<ProductRequest>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = find_product(&state, product_id).await?;

    let decision = state
        .access_service
        .decide(
            &identity_of(&user),
            ELEMENT,
            Verb::from_method(&method),
            Some(product.owner_id),
        )
        .await?;
    if !decision.allow {
        return Err(ServiceError::Forbidden.into());
    }

    let updated = state
        .products
        .update_name(product_id, &req.name)
        .await
        .map_err(AppError::DatabaseError)?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Product not found")))?;

    Ok(Json(ProductResponse::from(updated)))
}

/// Delete a product.
#[utoipa::path(
    delete,
    path = "/products/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product deleted", body = MessageResponse),
        (status = 403, description = "Permission denied", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse)
    ),
    tag = "Products",
    security(("session_cookie" = []))
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let product = find_product(&state, product_id).await?;

    let decision = state
        .access_service
        .decide(
            &identity_of(&user),
            ELEMENT,
            Some(Verb::Delete),
            Some(product.owner_id),
        )
        .await?;
    if !decision.allow {
        return Err(ServiceError::Forbidden.into());
    }

    let deleted = state
        .products
        .delete(product_id)
        .await
        .map_err(AppError::DatabaseError)?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Product not found")));
    }

    tracing::info!(%product_id, "Product deleted");

    Ok(Json(MessageResponse::new("Product deleted")))
}

async fn find_product(state: &AppState, product_id: Uuid) -> Result<Product, AppError> {
    state
        .products
        .find_by_id(product_id)
        .await
        .map_err(AppError::DatabaseError)?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Product not found")))
}
