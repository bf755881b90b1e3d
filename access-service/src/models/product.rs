//! Product model - the demo resource protected by access rules.
//!
//! Ownership is a first-class column; the "own" permission scope filters
//! and gates on it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Product {
    pub product_id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub created_utc: DateTime<Utc>,
}

impl Product {
    pub fn new(name: String, owner_id: Uuid) -> Self {
        Self {
            product_id: Uuid::new_v4(),
            name,
            owner_id,
            created_utc: Utc::now(),
        }
    }
}

/// Product response for API.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub product_id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub created_utc: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            product_id: p.product_id,
            name: p.name,
            owner_id: p.owner_id,
            created_utc: p.created_utc,
        }
    }
}
