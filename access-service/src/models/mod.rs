//! Typed records for the access-control domain.

mod element;
mod product;
mod role;
mod rule;
mod session;
mod user;

pub use element::BusinessElement;
pub use product::{Product, ProductResponse};
pub use role::{Role, ADMIN_ROLE_NAME};
pub use rule::{AccessRoleRule, PermissionFlags, RuleResponse, Verb};
pub use session::Session;
pub use user::{User, UserResponse};
