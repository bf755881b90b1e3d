pub mod auth;
pub mod products;
pub mod rules;

use serde::Serialize;
use utoipa::ToSchema;

/// Error payload returned by validation rejections and documented in the
/// OpenAPI schema. Service errors render the same shape through
/// `AppError`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
