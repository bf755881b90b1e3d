//! Access rule model - the permission record keyed by (role, element).

use axum::http::Method;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// HTTP verbs the permission table knows about. Anything else is denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    /// Map an HTTP method onto the permission table. Returns `None` for
    /// methods outside the table, which the engine treats as a denial.
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(Verb::Get),
            Method::POST => Some(Verb::Post),
            Method::PUT => Some(Verb::Put),
            Method::PATCH => Some(Verb::Patch),
            Method::DELETE => Some(Verb::Delete),
            _ => None,
        }
    }
}

/// The (own, all) flag pair a verb resolves to. Create has no "all"
/// counterpart, hence the `Option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionFlags {
    pub own: bool,
    pub all: Option<bool>,
}

/// Permission record for one (role, element) pair. The seven flags are
/// stored and evaluated independently; the engine alone decides how the
/// "all" flags take precedence over "own".
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AccessRoleRule {
    pub rule_id: Uuid,
    pub role_id: Uuid,
    pub element_id: Uuid,
    pub read_own: bool,
    pub read_all: bool,
    pub create_own: bool,
    pub update_own: bool,
    pub update_all: bool,
    pub delete_own: bool,
    pub delete_all: bool,
    pub created_utc: DateTime<Utc>,
}

impl AccessRoleRule {
    /// Create an all-false rule for a (role, element) pair.
    pub fn new(role_id: Uuid, element_id: Uuid) -> Self {
        Self {
            rule_id: Uuid::new_v4(),
            role_id,
            element_id,
            read_own: false,
            read_all: false,
            create_own: false,
            update_own: false,
            update_all: false,
            delete_own: false,
            delete_all: false,
            created_utc: Utc::now(),
        }
    }

    /// The fixed verb-to-flag-pair mapping:
    /// GET reads, POST creates, PUT/PATCH update, DELETE deletes.
    pub fn verb_flags(&self, verb: Verb) -> PermissionFlags {
        match verb {
            Verb::Get => PermissionFlags {
                own: self.read_own,
                all: Some(self.read_all),
            },
            Verb::Post => PermissionFlags {
                own: self.create_own,
                all: None,
            },
            Verb::Put | Verb::Patch => PermissionFlags {
                own: self.update_own,
                all: Some(self.update_all),
            },
            Verb::Delete => PermissionFlags {
                own: self.delete_own,
                all: Some(self.delete_all),
            },
        }
    }
}

/// Rule response for the admin API.
#[derive(Debug, Serialize, ToSchema)]
pub struct RuleResponse {
    pub rule_id: Uuid,
    pub role_id: Uuid,
    pub element_id: Uuid,
    pub read_own: bool,
    pub read_all: bool,
    pub create_own: bool,
    pub update_own: bool,
    pub update_all: bool,
    pub delete_own: bool,
    pub delete_all: bool,
}

impl From<AccessRoleRule> for RuleResponse {
    fn from(r: AccessRoleRule) -> Self {
        Self {
            rule_id: r.rule_id,
            role_id: r.role_id,
            element_id: r.element_id,
            read_own: r.read_own,
            read_all: r.read_all,
            create_own: r.create_own,
            update_own: r.update_own,
            update_all: r.update_all,
            delete_own: r.delete_own,
            delete_all: r.delete_all,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_with(f: impl FnOnce(&mut AccessRoleRule)) -> AccessRoleRule {
        let mut rule = AccessRoleRule::new(Uuid::new_v4(), Uuid::new_v4());
        f(&mut rule);
        rule
    }

    #[test]
    fn get_maps_to_read_pair() {
        let rule = rule_with(|r| {
            r.read_own = true;
            r.read_all = false;
        });
        let flags = rule.verb_flags(Verb::Get);
        assert!(flags.own);
        assert_eq!(flags.all, Some(false));
    }

    #[test]
    fn post_has_no_all_counterpart() {
        let rule = rule_with(|r| r.create_own = true);
        let flags = rule.verb_flags(Verb::Post);
        assert!(flags.own);
        assert_eq!(flags.all, None);
    }

    #[test]
    fn put_and_patch_share_the_update_pair() {
        let rule = rule_with(|r| r.update_all = true);
        assert_eq!(rule.verb_flags(Verb::Put), rule.verb_flags(Verb::Patch));
        assert_eq!(rule.verb_flags(Verb::Put).all, Some(true));
    }

    #[test]
    fn unknown_methods_have_no_verb() {
        assert_eq!(Verb::from_method(&Method::HEAD), None);
        assert_eq!(Verb::from_method(&Method::OPTIONS), None);
        assert_eq!(Verb::from_method(&Method::DELETE), Some(Verb::Delete));
    }
}
