//! In-memory store backing the unit and integration tests.
//!
//! Each collection sits behind its own mutex, so every store operation is
//! atomic per collection. The deactivation paths keep the same
//! compare-and-set contract as the Postgres implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::{AccessRoleRule, BusinessElement, Product, Role, Session, User};
use crate::store::{ProductStore, RuleStore, SessionStore, UserStore};

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<Uuid, User>>,
    sessions: Mutex<HashMap<String, Session>>,
    roles: Mutex<HashMap<Uuid, Role>>,
    elements: Mutex<HashMap<Uuid, BusinessElement>>,
    rules: Mutex<HashMap<Uuid, AccessRoleRule>>,
    products: Mutex<HashMap<Uuid, Product>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Seed helpers for data the HTTP surface does not create (roles,
    // elements and rules are provisioned out of band in production).

    pub fn add_role(&self, role: Role) {
        self.roles
            .lock()
            .expect("roles mutex poisoned")
            .insert(role.role_id, role);
    }

    pub fn add_element(&self, element: BusinessElement) {
        self.elements
            .lock()
            .expect("elements mutex poisoned")
            .insert(element.element_id, element);
    }

    pub fn add_rule(&self, rule: AccessRoleRule) {
        self.rules
            .lock()
            .expect("rules mutex poisoned")
            .insert(rule.rule_id, rule);
    }

    /// Snapshot of one session by token, active or not.
    pub fn session_by_token(&self, token: &str) -> Option<Session> {
        self.sessions
            .lock()
            .expect("sessions mutex poisoned")
            .get(token)
            .cloned()
    }

    /// Number of active sessions a user currently holds.
    pub fn active_session_count(&self, user_id: Uuid) -> usize {
        self.sessions
            .lock()
            .expect("sessions mutex poisoned")
            .values()
            .filter(|s| s.user_id == user_id && s.is_active)
            .count()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, anyhow::Error> {
        let users = self
            .users
            .lock()
            .map_err(|e| anyhow::anyhow!("users mutex poisoned: {}", e))?;
        Ok(users.get(&user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, anyhow::Error> {
        let users = self
            .users
            .lock()
            .map_err(|e| anyhow::anyhow!("users mutex poisoned: {}", e))?;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), anyhow::Error> {
        let mut users = self
            .users
            .lock()
            .map_err(|e| anyhow::anyhow!("users mutex poisoned: {}", e))?;
        users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        first_name: &str,
        last_name: &str,
        middle_name: Option<&str>,
    ) -> Result<Option<User>, anyhow::Error> {
        let mut users = self
            .users
            .lock()
            .map_err(|e| anyhow::anyhow!("users mutex poisoned: {}", e))?;
        Ok(users.get_mut(&user_id).map(|user| {
            user.first_name = first_name.to_string();
            user.last_name = last_name.to_string();
            user.middle_name = middle_name.map(str::to_string);
            user.updated_utc = Utc::now();
            user.clone()
        }))
    }

    async fn set_active(&self, user_id: Uuid, active: bool) -> Result<(), anyhow::Error> {
        let mut users = self
            .users
            .lock()
            .map_err(|e| anyhow::anyhow!("users mutex poisoned: {}", e))?;
        if let Some(user) = users.get_mut(&user_id) {
            user.is_active = active;
            user.updated_utc = Utc::now();
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn find_active_by_token(&self, token: &str) -> Result<Option<Session>, anyhow::Error> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|e| anyhow::anyhow!("sessions mutex poisoned: {}", e))?;
        Ok(sessions.get(token).filter(|s| s.is_active).cloned())
    }

    async fn insert(&self, session: &Session) -> Result<(), anyhow::Error> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| anyhow::anyhow!("sessions mutex poisoned: {}", e))?;
        sessions.insert(session.session_key.clone(), session.clone());
        Ok(())
    }

    async fn deactivate(&self, token: &str) -> Result<bool, anyhow::Error> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| anyhow::anyhow!("sessions mutex poisoned: {}", e))?;
        match sessions.get_mut(token) {
            Some(session) if session.is_active => {
                session.is_active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn deactivate_all_for_user(&self, user_id: Uuid) -> Result<u64, anyhow::Error> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| anyhow::anyhow!("sessions mutex poisoned: {}", e))?;
        let mut affected = 0;
        for session in sessions.values_mut() {
            if session.user_id == user_id && session.is_active {
                session.is_active = false;
                affected += 1;
            }
        }
        Ok(affected)
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn find_element_by_name(
        &self,
        name: &str,
    ) -> Result<Option<BusinessElement>, anyhow::Error> {
        let elements = self
            .elements
            .lock()
            .map_err(|e| anyhow::anyhow!("elements mutex poisoned: {}", e))?;
        Ok(elements.values().find(|e| e.name == name).cloned())
    }

    async fn find_role_by_id(&self, role_id: Uuid) -> Result<Option<Role>, anyhow::Error> {
        let roles = self
            .roles
            .lock()
            .map_err(|e| anyhow::anyhow!("roles mutex poisoned: {}", e))?;
        Ok(roles.get(&role_id).cloned())
    }

    async fn find_rule(
        &self,
        role_id: Uuid,
        element_id: Uuid,
    ) -> Result<Option<AccessRoleRule>, anyhow::Error> {
        let rules = self
            .rules
            .lock()
            .map_err(|e| anyhow::anyhow!("rules mutex poisoned: {}", e))?;
        Ok(rules
            .values()
            .find(|r| r.role_id == role_id && r.element_id == element_id)
            .cloned())
    }

    async fn find_rule_by_id(
        &self,
        rule_id: Uuid,
    ) -> Result<Option<AccessRoleRule>, anyhow::Error> {
        let rules = self
            .rules
            .lock()
            .map_err(|e| anyhow::anyhow!("rules mutex poisoned: {}", e))?;
        Ok(rules.get(&rule_id).cloned())
    }

    async fn list_rules(&self) -> Result<Vec<AccessRoleRule>, anyhow::Error> {
        let rules = self
            .rules
            .lock()
            .map_err(|e| anyhow::anyhow!("rules mutex poisoned: {}", e))?;
        let mut all: Vec<_> = rules.values().cloned().collect();
        all.sort_by_key(|r| r.created_utc);
        Ok(all)
    }

    async fn update_rule(&self, rule: &AccessRoleRule) -> Result<bool, anyhow::Error> {
        let mut rules = self
            .rules
            .lock()
            .map_err(|e| anyhow::anyhow!("rules mutex poisoned: {}", e))?;
        match rules.get_mut(&rule.rule_id) {
            Some(existing) => {
                existing.read_own = rule.read_own;
                existing.read_all = rule.read_all;
                existing.create_own = rule.create_own;
                existing.update_own = rule.update_own;
                existing.update_all = rule.update_all;
                existing.delete_own = rule.delete_own;
                existing.delete_all = rule.delete_all;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_rule(&self, rule_id: Uuid) -> Result<bool, anyhow::Error> {
        let mut rules = self
            .rules
            .lock()
            .map_err(|e| anyhow::anyhow!("rules mutex poisoned: {}", e))?;
        Ok(rules.remove(&rule_id).is_some())
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Product>, anyhow::Error> {
        let products = self
            .products
            .lock()
            .map_err(|e| anyhow::anyhow!("products mutex poisoned: {}", e))?;
        let mut all: Vec<_> = products.values().cloned().collect();
        all.sort_by_key(|p| p.created_utc);
        Ok(all)
    }

    async fn find_by_id(&self, product_id: Uuid) -> Result<Option<Product>, anyhow::Error> {
        let products = self
            .products
            .lock()
            .map_err(|e| anyhow::anyhow!("products mutex poisoned: {}", e))?;
        Ok(products.get(&product_id).cloned())
    }

    async fn insert(&self, product: &Product) -> Result<(), anyhow::Error> {
        let mut products = self
            .products
            .lock()
            .map_err(|e| anyhow::anyhow!("products mutex poisoned: {}", e))?;
        products.insert(product.product_id, product.clone());
        Ok(())
    }

    async fn update_name(
        &self,
        product_id: Uuid,
        name: &str,
    ) -> Result<Option<Product>, anyhow::Error> {
        let mut products = self
            .products
            .lock()
            .map_err(|e| anyhow::anyhow!("products mutex poisoned: {}", e))?;
        Ok(products.get_mut(&product_id).map(|product| {
            product.name = name.to_string();
            product.clone()
        }))
    }

    async fn delete(&self, product_id: Uuid) -> Result<bool, anyhow::Error> {
        let mut products = self
            .products
            .lock()
            .map_err(|e| anyhow::anyhow!("products mutex poisoned: {}", e))?;
        Ok(products.remove(&product_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deactivate_is_a_one_shot_compare_and_set() {
        let store = MemoryStore::new();
        let session = Session::new(Uuid::new_v4(), 60);
        let token = session.session_key.clone();
        SessionStore::insert(&store, &session).await.unwrap();

        // First caller wins; the second observes an already-dead session.
        assert!(store.deactivate(&token).await.unwrap());
        assert!(!store.deactivate(&token).await.unwrap());

        // Deactivation never resurrects: the record stays inactive.
        assert!(!store.session_by_token(&token).unwrap().is_active);
        assert!(store.find_active_by_token(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deactivate_all_only_touches_the_given_user() {
        let store = MemoryStore::new();
        let user_a = Uuid::new_v4();
        let user_b = Uuid::new_v4();
        SessionStore::insert(&store, &Session::new(user_a, 60))
            .await
            .unwrap();
        SessionStore::insert(&store, &Session::new(user_a, 60))
            .await
            .unwrap();
        SessionStore::insert(&store, &Session::new(user_b, 60))
            .await
            .unwrap();

        assert_eq!(store.deactivate_all_for_user(user_a).await.unwrap(), 2);
        assert_eq!(store.active_session_count(user_a), 0);
        assert_eq!(store.active_session_count(user_b), 1);
    }
}
