//! Persistence seams for the access-control core.
//!
//! The services talk to these traits only; `Database` backs them with
//! Postgres and `MemoryStore` backs them for tests and local development.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::Database;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{AccessRoleRule, BusinessElement, Product, Role, Session, User};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, anyhow::Error>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, anyhow::Error>;
    async fn insert(&self, user: &User) -> Result<(), anyhow::Error>;
    /// Replace the user's name fields. Returns the updated record, or
    /// `None` if the user does not exist.
    async fn update_profile(
        &self,
        user_id: Uuid,
        first_name: &str,
        last_name: &str,
        middle_name: Option<&str>,
    ) -> Result<Option<User>, anyhow::Error>;
    async fn set_active(&self, user_id: Uuid, active: bool) -> Result<(), anyhow::Error>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Exact token lookup restricted to `is_active = TRUE`.
    async fn find_active_by_token(&self, token: &str) -> Result<Option<Session>, anyhow::Error>;
    async fn insert(&self, session: &Session) -> Result<(), anyhow::Error>;
    /// Conditionally deactivate one session (compare-and-set on
    /// `is_active`). Returns whether a live session was deactivated, so
    /// concurrent callers cannot resurrect an already-dead session.
    async fn deactivate(&self, token: &str) -> Result<bool, anyhow::Error>;
    /// Deactivate every live session a user holds. Returns the number of
    /// sessions affected.
    async fn deactivate_all_for_user(&self, user_id: Uuid) -> Result<u64, anyhow::Error>;
}

#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn find_element_by_name(
        &self,
        name: &str,
    ) -> Result<Option<BusinessElement>, anyhow::Error>;
    async fn find_role_by_id(&self, role_id: Uuid) -> Result<Option<Role>, anyhow::Error>;
    /// The central permission lookup. A missing rule is not an error; the
    /// engine treats it as all-flags-false.
    async fn find_rule(
        &self,
        role_id: Uuid,
        element_id: Uuid,
    ) -> Result<Option<AccessRoleRule>, anyhow::Error>;
    async fn find_rule_by_id(
        &self,
        rule_id: Uuid,
    ) -> Result<Option<AccessRoleRule>, anyhow::Error>;
    async fn list_rules(&self) -> Result<Vec<AccessRoleRule>, anyhow::Error>;
    /// Replace the flags of an existing rule. Returns whether it matched.
    async fn update_rule(&self, rule: &AccessRoleRule) -> Result<bool, anyhow::Error>;
    async fn delete_rule(&self, rule_id: Uuid) -> Result<bool, anyhow::Error>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Product>, anyhow::Error>;
    async fn find_by_id(&self, product_id: Uuid) -> Result<Option<Product>, anyhow::Error>;
    async fn insert(&self, product: &Product) -> Result<(), anyhow::Error>;
    async fn update_name(
        &self,
        product_id: Uuid,
        name: &str,
    ) -> Result<Option<Product>, anyhow::Error>;
    async fn delete(&self, product_id: Uuid) -> Result<bool, anyhow::Error>;
}
