//! Business element model - the named resource categories permissions
//! are scoped by.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A protected resource type (e.g. "products"). Each resource endpoint
/// declares its element name statically.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BusinessElement {
    pub element_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl BusinessElement {
    pub fn new(name: String, description: Option<String>) -> Self {
        Self {
            element_id: Uuid::new_v4(),
            name,
            description,
            created_utc: Utc::now(),
        }
    }
}
