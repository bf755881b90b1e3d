//! Role model - named permission categories.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Name of the role whose members may manage access rules.
pub const ADMIN_ROLE_NAME: &str = "Administrator";

/// Role entity. Deletion is blocked by the schema while any user or
/// access rule references it.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Role {
    pub role_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl Role {
    pub fn new(name: String, description: Option<String>) -> Self {
        Self {
            role_id: Uuid::new_v4(),
            name,
            description,
            created_utc: Utc::now(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.name == ADMIN_ROLE_NAME
    }
}
