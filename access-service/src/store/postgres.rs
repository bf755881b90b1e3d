//! PostgreSQL persistence for the access-control stores.
//!
//! Every mutation is a single conditional statement, so the
//! read-then-conditionally-write sequences in the services stay safe under
//! concurrent requests (a dead session can never be resurrected).

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::models::{AccessRoleRule, BusinessElement, Product, Role, Session, User};
use crate::store::{ProductStore, RuleStore, SessionStore, UserStore};

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database wrapper from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for Database {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, anyhow::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, anyhow::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }

    async fn insert(&self, user: &User) -> Result<(), anyhow::Error> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, email, password_hash, first_name, last_name,
                               middle_name, role_id, is_active, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.middle_name)
        .bind(user.role_id)
        .bind(user.is_active)
        .bind(user.created_utc)
        .bind(user.updated_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        first_name: &str,
        last_name: &str,
        middle_name: Option<&str>,
    ) -> Result<Option<User>, anyhow::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET first_name = $1, last_name = $2, middle_name = $3, updated_utc = $4
            WHERE user_id = $5
            RETURNING *
            "#,
        )
        .bind(first_name)
        .bind(last_name)
        .bind(middle_name)
        .bind(Utc::now())
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!(e))
    }

    async fn set_active(&self, user_id: Uuid, active: bool) -> Result<(), anyhow::Error> {
        sqlx::query("UPDATE users SET is_active = $1, updated_utc = $2 WHERE user_id = $3")
            .bind(active)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for Database {
    async fn find_active_by_token(&self, token: &str) -> Result<Option<Session>, anyhow::Error> {
        sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE session_key = $1 AND is_active = TRUE",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!(e))
    }

    async fn insert(&self, session: &Session) -> Result<(), anyhow::Error> {
        sqlx::query(
            r#"
            INSERT INTO sessions (session_id, user_id, session_key, expiry_utc, is_active, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(session.session_id)
        .bind(session.user_id)
        .bind(&session.session_key)
        .bind(session.expiry_utc)
        .bind(session.is_active)
        .bind(session.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
        Ok(())
    }

    async fn deactivate(&self, token: &str) -> Result<bool, anyhow::Error> {
        // Compare-and-set: only a live session flips to inactive.
        let result = sqlx::query(
            "UPDATE sessions SET is_active = FALSE WHERE session_key = $1 AND is_active = TRUE",
        )
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_all_for_user(&self, user_id: Uuid) -> Result<u64, anyhow::Error> {
        let result = sqlx::query(
            "UPDATE sessions SET is_active = FALSE WHERE user_id = $1 AND is_active = TRUE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RuleStore for Database {
    async fn find_element_by_name(
        &self,
        name: &str,
    ) -> Result<Option<BusinessElement>, anyhow::Error> {
        sqlx::query_as::<_, BusinessElement>("SELECT * FROM business_elements WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }

    async fn find_role_by_id(&self, role_id: Uuid) -> Result<Option<Role>, anyhow::Error> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE role_id = $1")
            .bind(role_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }

    async fn find_rule(
        &self,
        role_id: Uuid,
        element_id: Uuid,
    ) -> Result<Option<AccessRoleRule>, anyhow::Error> {
        sqlx::query_as::<_, AccessRoleRule>(
            "SELECT * FROM access_role_rules WHERE role_id = $1 AND element_id = $2",
        )
        .bind(role_id)
        .bind(element_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!(e))
    }

    async fn find_rule_by_id(
        &self,
        rule_id: Uuid,
    ) -> Result<Option<AccessRoleRule>, anyhow::Error> {
        sqlx::query_as::<_, AccessRoleRule>("SELECT * FROM access_role_rules WHERE rule_id = $1")
            .bind(rule_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }

    async fn list_rules(&self) -> Result<Vec<AccessRoleRule>, anyhow::Error> {
        sqlx::query_as::<_, AccessRoleRule>(
            "SELECT * FROM access_role_rules ORDER BY created_utc",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!(e))
    }

    async fn update_rule(&self, rule: &AccessRoleRule) -> Result<bool, anyhow::Error> {
        let result = sqlx::query(
            r#"
            UPDATE access_role_rules
            SET read_own = $1, read_all = $2, create_own = $3, update_own = $4,
                update_all = $5, delete_own = $6, delete_all = $7
            WHERE rule_id = $8
            "#,
        )
        .bind(rule.read_own)
        .bind(rule.read_all)
        .bind(rule.create_own)
        .bind(rule.update_own)
        .bind(rule.update_all)
        .bind(rule.delete_own)
        .bind(rule.delete_all)
        .bind(rule.rule_id)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_rule(&self, rule_id: Uuid) -> Result<bool, anyhow::Error> {
        let result = sqlx::query("DELETE FROM access_role_rules WHERE rule_id = $1")
            .bind(rule_id)
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProductStore for Database {
    async fn list(&self) -> Result<Vec<Product>, anyhow::Error> {
        sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY created_utc")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }

    async fn find_by_id(&self, product_id: Uuid) -> Result<Option<Product>, anyhow::Error> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE product_id = $1")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }

    async fn insert(&self, product: &Product) -> Result<(), anyhow::Error> {
        sqlx::query(
            r#"
            INSERT INTO products (product_id, name, owner_id, created_utc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(product.product_id)
        .bind(&product.name)
        .bind(product.owner_id)
        .bind(product.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
        Ok(())
    }

    async fn update_name(
        &self,
        product_id: Uuid,
        name: &str,
    ) -> Result<Option<Product>, anyhow::Error> {
        sqlx::query_as::<_, Product>(
            "UPDATE products SET name = $1 WHERE product_id = $2 RETURNING *",
        )
        .bind(name)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow::anyhow!(e))
    }

    async fn delete(&self, product_id: Uuid) -> Result<bool, anyhow::Error> {
        let result = sqlx::query("DELETE FROM products WHERE product_id = $1")
            .bind(product_id)
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        Ok(result.rows_affected() > 0)
    }
}
