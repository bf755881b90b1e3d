//! The access decision engine.
//!
//! Evaluates (identity, business element, verb, optional target owner)
//! against the stored permission rules. Fails closed: an anonymous
//! identity, a roleless user, an unknown element, a missing rule, or a
//! verb outside the mapping table all produce a denial. A denial is a
//! value, never an error.

use std::sync::Arc;
use uuid::Uuid;

use crate::models::Verb;
use crate::services::{Identity, ServiceError};
use crate::store::RuleStore;

/// How broadly an allowed request may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessScope {
    /// Caller must restrict results to records owned by the identity.
    Own,
    /// Unrestricted across all records of the element.
    All,
    /// No access.
    None,
}

/// Outcome of a permission evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allow: bool,
    pub scope: AccessScope,
}

impl Decision {
    pub fn deny() -> Self {
        Self {
            allow: false,
            scope: AccessScope::None,
        }
    }

    fn allow(scope: AccessScope) -> Self {
        Self { allow: true, scope }
    }
}

#[derive(Clone)]
pub struct AccessService {
    rules: Arc<dyn RuleStore>,
}

impl AccessService {
    pub fn new(rules: Arc<dyn RuleStore>) -> Self {
        Self { rules }
    }

    /// Evaluate a request against the rule table.
    ///
    /// Without a `target_owner` this is the list-level check: the "all"
    /// flag grants unrestricted access, otherwise the "own" flag grants
    /// access scoped to the identity's records. With a `target_owner` the
    /// object-level gate applies on top: "own" only passes when the
    /// target is owned by the identity.
    pub async fn decide(
        &self,
        identity: &Identity,
        element_name: &str,
        verb: Option<Verb>,
        target_owner: Option<Uuid>,
    ) -> Result<Decision, ServiceError> {
        let (Some(user_id), Some(role_id)) = (identity.user_id(), identity.role_id()) else {
            return Ok(Decision::deny());
        };
        let Some(verb) = verb else {
            return Ok(Decision::deny());
        };

        let Some(element) = self
            .rules
            .find_element_by_name(element_name)
            .await
            .map_err(ServiceError::Database)?
        else {
            return Ok(Decision::deny());
        };

        let Some(rule) = self
            .rules
            .find_rule(role_id, element.element_id)
            .await
            .map_err(ServiceError::Database)?
        else {
            return Ok(Decision::deny());
        };

        let flags = rule.verb_flags(verb);
        let all = flags.all.unwrap_or(false);

        let decision = if all {
            Decision::allow(AccessScope::All)
        } else if flags.own {
            match target_owner {
                Some(owner) if owner != user_id => Decision::deny(),
                _ => Decision::allow(AccessScope::Own),
            }
        } else {
            Decision::deny()
        };

        Ok(decision)
    }

    /// Whether the identity holds the administrator role. Gates the rule
    /// management endpoints.
    pub async fn is_admin(&self, identity: &Identity) -> Result<bool, ServiceError> {
        let Some(role_id) = identity.role_id() else {
            return Ok(false);
        };
        let role = self
            .rules
            .find_role_by_id(role_id)
            .await
            .map_err(ServiceError::Database)?;
        Ok(role.map(|r| r.is_admin()).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccessRoleRule, BusinessElement, Role, ADMIN_ROLE_NAME};
    use crate::store::MemoryStore;

    const ELEMENT: &str = "products";

    struct Fixture {
        svc: AccessService,
        store: Arc<MemoryStore>,
        role_id: Uuid,
        element_id: Uuid,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let role = Role::new("User".to_string(), None);
        let element = BusinessElement::new(ELEMENT.to_string(), None);
        let role_id = role.role_id;
        let element_id = element.element_id;
        store.add_role(role);
        store.add_element(element);
        Fixture {
            svc: AccessService::new(store.clone()),
            store,
            role_id,
            element_id,
        }
    }

    fn member(role_id: Uuid) -> Identity {
        Identity::User {
            user_id: Uuid::new_v4(),
            role_id: Some(role_id),
        }
    }

    #[tokio::test]
    async fn no_rule_denies_every_verb() {
        let fx = fixture();
        let identity = member(fx.role_id);
        for verb in [Verb::Get, Verb::Post, Verb::Put, Verb::Patch, Verb::Delete] {
            let decision = fx
                .svc
                .decide(&identity, ELEMENT, Some(verb), None)
                .await
                .unwrap();
            assert!(!decision.allow, "{:?} should be denied without a rule", verb);
            assert_eq!(decision.scope, AccessScope::None);
        }
    }

    #[tokio::test]
    async fn anonymous_and_roleless_identities_are_denied() {
        let fx = fixture();
        let mut rule = AccessRoleRule::new(fx.role_id, fx.element_id);
        rule.read_all = true;
        fx.store.add_rule(rule);

        let anon = fx
            .svc
            .decide(&Identity::Anonymous, ELEMENT, Some(Verb::Get), None)
            .await
            .unwrap();
        assert!(!anon.allow);

        let roleless = Identity::User {
            user_id: Uuid::new_v4(),
            role_id: None,
        };
        let decision = fx
            .svc
            .decide(&roleless, ELEMENT, Some(Verb::Get), None)
            .await
            .unwrap();
        assert!(!decision.allow);
    }

    #[tokio::test]
    async fn unknown_element_is_denied() {
        let fx = fixture();
        let mut rule = AccessRoleRule::new(fx.role_id, fx.element_id);
        rule.read_all = true;
        fx.store.add_rule(rule);

        let decision = fx
            .svc
            .decide(&member(fx.role_id), "warehouses", Some(Verb::Get), None)
            .await
            .unwrap();
        assert!(!decision.allow);
    }

    #[tokio::test]
    async fn unmapped_verb_is_denied() {
        let fx = fixture();
        let mut rule = AccessRoleRule::new(fx.role_id, fx.element_id);
        rule.read_all = true;
        fx.store.add_rule(rule);

        let decision = fx
            .svc
            .decide(&member(fx.role_id), ELEMENT, None, None)
            .await
            .unwrap();
        assert!(!decision.allow);
    }

    #[tokio::test]
    async fn read_own_scopes_the_list_and_gates_objects() {
        let fx = fixture();
        let mut rule = AccessRoleRule::new(fx.role_id, fx.element_id);
        rule.read_own = true;
        fx.store.add_rule(rule);

        let identity = member(fx.role_id);
        let me = identity.user_id().unwrap();

        let list = fx
            .svc
            .decide(&identity, ELEMENT, Some(Verb::Get), None)
            .await
            .unwrap();
        assert!(list.allow);
        assert_eq!(list.scope, AccessScope::Own);

        let own_object = fx
            .svc
            .decide(&identity, ELEMENT, Some(Verb::Get), Some(me))
            .await
            .unwrap();
        assert!(own_object.allow);

        let foreign_object = fx
            .svc
            .decide(&identity, ELEMENT, Some(Verb::Get), Some(Uuid::new_v4()))
            .await
            .unwrap();
        assert!(!foreign_object.allow);
    }

    #[tokio::test]
    async fn read_all_ignores_ownership() {
        let fx = fixture();
        let mut rule = AccessRoleRule::new(fx.role_id, fx.element_id);
        rule.read_all = true;
        fx.store.add_rule(rule);

        let identity = member(fx.role_id);
        let list = fx
            .svc
            .decide(&identity, ELEMENT, Some(Verb::Get), None)
            .await
            .unwrap();
        assert!(list.allow);
        assert_eq!(list.scope, AccessScope::All);

        let foreign_object = fx
            .svc
            .decide(&identity, ELEMENT, Some(Verb::Get), Some(Uuid::new_v4()))
            .await
            .unwrap();
        assert!(foreign_object.allow);
        assert_eq!(foreign_object.scope, AccessScope::All);
    }

    #[tokio::test]
    async fn create_consults_only_the_create_flag() {
        let fx = fixture();
        let mut rule = AccessRoleRule::new(fx.role_id, fx.element_id);
        rule.create_own = true;
        fx.store.add_rule(rule);

        let identity = member(fx.role_id);
        let create = fx
            .svc
            .decide(&identity, ELEMENT, Some(Verb::Post), None)
            .await
            .unwrap();
        assert!(create.allow);
        assert_eq!(create.scope, AccessScope::Own);

        // The same rule does not grant reads.
        let read = fx
            .svc
            .decide(&identity, ELEMENT, Some(Verb::Get), None)
            .await
            .unwrap();
        assert!(!read.allow);
    }

    #[tokio::test]
    async fn update_own_gates_on_target_owner() {
        let fx = fixture();
        let mut rule = AccessRoleRule::new(fx.role_id, fx.element_id);
        rule.update_own = true;
        fx.store.add_rule(rule);

        let identity = member(fx.role_id);
        let me = identity.user_id().unwrap();

        let mine = fx
            .svc
            .decide(&identity, ELEMENT, Some(Verb::Put), Some(me))
            .await
            .unwrap();
        assert!(mine.allow);

        let theirs = fx
            .svc
            .decide(&identity, ELEMENT, Some(Verb::Patch), Some(Uuid::new_v4()))
            .await
            .unwrap();
        assert!(!theirs.allow);
    }

    #[tokio::test]
    async fn delete_all_overrides_the_own_gate() {
        let fx = fixture();
        let mut rule = AccessRoleRule::new(fx.role_id, fx.element_id);
        rule.delete_own = false;
        rule.delete_all = true;
        fx.store.add_rule(rule);

        let identity = member(fx.role_id);
        let decision = fx
            .svc
            .decide(&identity, ELEMENT, Some(Verb::Delete), Some(Uuid::new_v4()))
            .await
            .unwrap();
        assert!(decision.allow);
        assert_eq!(decision.scope, AccessScope::All);
    }

    #[tokio::test]
    async fn admin_check_matches_the_role_name() {
        let store = Arc::new(MemoryStore::new());
        let admin_role = Role::new(ADMIN_ROLE_NAME.to_string(), None);
        let plain_role = Role::new("User".to_string(), None);
        let admin_id = admin_role.role_id;
        let plain_id = plain_role.role_id;
        store.add_role(admin_role);
        store.add_role(plain_role);
        let svc = AccessService::new(store);

        assert!(svc.is_admin(&member(admin_id)).await.unwrap());
        assert!(!svc.is_admin(&member(plain_id)).await.unwrap());
        assert!(!svc.is_admin(&Identity::Anonymous).await.unwrap());
    }
}
