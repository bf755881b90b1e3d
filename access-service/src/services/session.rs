//! Session authentication and lifecycle.
//!
//! Resolving a token never fails for the caller: a missing, unknown,
//! expired or orphaned session simply resolves to the anonymous identity.
//! Dead sessions are deactivated write-through before the anonymous
//! result is returned, so a racing request cannot observe a live expired
//! session.

use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Session, User};
use crate::services::ServiceError;
use crate::store::{SessionStore, UserStore};
use crate::utils::{verify_password, Password, PasswordHashString};

/// The principal a request runs as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    User {
        user_id: Uuid,
        role_id: Option<Uuid>,
    },
}

impl Identity {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Identity::Anonymous => None,
            Identity::User { user_id, .. } => Some(*user_id),
        }
    }

    pub fn role_id(&self) -> Option<Uuid> {
        match self {
            Identity::Anonymous => None,
            Identity::User { role_id, .. } => *role_id,
        }
    }
}

/// Result of resolving a session token. `clear_cookie` instructs the
/// transport layer to clear the client's session cookie when a dead
/// session was detected.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub identity: Identity,
    pub clear_cookie: bool,
}

impl AuthOutcome {
    fn anonymous() -> Self {
        Self {
            identity: Identity::Anonymous,
            clear_cookie: false,
        }
    }
}

#[derive(Clone)]
pub struct SessionService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    ttl_minutes: i64,
}

impl SessionService {
    pub fn new(users: Arc<dyn UserStore>, sessions: Arc<dyn SessionStore>, ttl_minutes: i64) -> Self {
        Self {
            users,
            sessions,
            ttl_minutes,
        }
    }

    /// Resolve an opaque session token to an identity.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<AuthOutcome, ServiceError> {
        let Some(token) = token else {
            return Ok(AuthOutcome::anonymous());
        };

        let Some(session) = self
            .sessions
            .find_active_by_token(token)
            .await
            .map_err(ServiceError::Database)?
        else {
            return Ok(AuthOutcome::anonymous());
        };

        let user = self
            .users
            .find_by_id(session.user_id)
            .await
            .map_err(ServiceError::Database)?;

        match user {
            Some(user) if !session.is_expired() && user.is_active => Ok(AuthOutcome {
                identity: Identity::User {
                    user_id: user.user_id,
                    role_id: user.role_id,
                },
                clear_cookie: false,
            }),
            _ => {
                // Write-through before resolving anonymous: the conditional
                // update keeps concurrent requests from racing this one.
                self.sessions
                    .deactivate(token)
                    .await
                    .map_err(ServiceError::Database)?;
                tracing::debug!(user_id = %session.user_id, "Dead session deactivated");
                Ok(AuthOutcome {
                    identity: Identity::Anonymous,
                    clear_cookie: true,
                })
            }
        }
    }

    /// Authenticate credentials and open a session.
    ///
    /// A single-active-session policy holds: any prior active session for
    /// the user is deactivated before the new one is created.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, Session), ServiceError> {
        let user = self
            .users
            .find_by_email(email)
            .await
            .map_err(ServiceError::Database)?
            .filter(|u| u.is_active)
            .ok_or(ServiceError::InvalidCredentials)?;

        verify_password(
            &Password::new(password.to_string()),
            &PasswordHashString::new(user.password_hash.clone()),
        )
        .map_err(|_| ServiceError::InvalidCredentials)?;

        let displaced = self
            .sessions
            .deactivate_all_for_user(user.user_id)
            .await
            .map_err(ServiceError::Database)?;
        if displaced > 0 {
            tracing::debug!(user_id = %user.user_id, displaced, "Prior sessions deactivated");
        }

        let session = Session::new(user.user_id, self.ttl_minutes);
        self.sessions
            .insert(&session)
            .await
            .map_err(ServiceError::Database)?;

        tracing::info!(user_id = %user.user_id, "User logged in");

        Ok((user, session))
    }

    /// Deactivate one session. Idempotent: logging out an already-dead
    /// session is not an error.
    pub async fn logout(&self, token: &str) -> Result<(), ServiceError> {
        self.sessions
            .deactivate(token)
            .await
            .map_err(ServiceError::Database)?;
        Ok(())
    }

    /// Deactivate a user account and cascade-deactivate their sessions.
    /// The account record is retained; nothing is deleted.
    pub async fn deactivate_account(&self, user_id: Uuid) -> Result<(), ServiceError> {
        self.users
            .set_active(user_id, false)
            .await
            .map_err(ServiceError::Database)?;
        self.sessions
            .deactivate_all_for_user(user_id)
            .await
            .map_err(ServiceError::Database)?;
        tracing::info!(user_id = %user_id, "Account deactivated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::utils::hash_password;
    use chrono::{Duration, Utc};

    fn service(store: &Arc<MemoryStore>) -> SessionService {
        SessionService::new(store.clone(), store.clone(), 60)
    }

    async fn seed_user(store: &Arc<MemoryStore>, password: &str) -> User {
        let hash = hash_password(&Password::new(password.to_string())).unwrap();
        let user = User::new(
            "ada@example.com".to_string(),
            hash.into_string(),
            "Ada".to_string(),
            "Lovelace".to_string(),
            None,
        );
        UserStore::insert(store.as_ref(), &user).await.unwrap();
        user
    }

    #[tokio::test]
    async fn missing_token_resolves_anonymous_without_side_effects() {
        let store = Arc::new(MemoryStore::new());
        let outcome = service(&store).authenticate(None).await.unwrap();
        assert!(outcome.identity.is_anonymous());
        assert!(!outcome.clear_cookie);
    }

    #[tokio::test]
    async fn unknown_token_resolves_anonymous() {
        let store = Arc::new(MemoryStore::new());
        let outcome = service(&store)
            .authenticate(Some("no-such-token"))
            .await
            .unwrap();
        assert!(outcome.identity.is_anonymous());
        assert!(!outcome.clear_cookie);
    }

    #[tokio::test]
    async fn valid_session_resolves_the_user() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);
        let user = seed_user(&store, "correct horse").await;
        let (_, session) = svc.login("ada@example.com", "correct horse").await.unwrap();

        let outcome = svc
            .authenticate(Some(&session.session_key))
            .await
            .unwrap();
        assert_eq!(outcome.identity.user_id(), Some(user.user_id));
        assert!(!outcome.clear_cookie);
    }

    #[tokio::test]
    async fn expired_session_is_deactivated_write_through() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);
        let user = seed_user(&store, "pw-irrelevant").await;

        let mut session = Session::new(user.user_id, 60);
        session.expiry_utc = Utc::now() - Duration::minutes(1);
        let token = session.session_key.clone();
        SessionStore::insert(store.as_ref(), &session).await.unwrap();

        let outcome = svc.authenticate(Some(&token)).await.unwrap();
        assert!(outcome.identity.is_anonymous());
        assert!(outcome.clear_cookie);
        assert!(!store.session_by_token(&token).unwrap().is_active);

        // Repeating the call is idempotent and stays anonymous.
        let again = svc.authenticate(Some(&token)).await.unwrap();
        assert!(again.identity.is_anonymous());
        assert!(!store.session_by_token(&token).unwrap().is_active);
    }

    #[tokio::test]
    async fn session_of_deactivated_user_resolves_anonymous() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);
        let user = seed_user(&store, "hunter2hunter2").await;
        let (_, session) = svc.login("ada@example.com", "hunter2hunter2").await.unwrap();

        store.set_active(user.user_id, false).await.unwrap();

        let outcome = svc
            .authenticate(Some(&session.session_key))
            .await
            .unwrap();
        assert!(outcome.identity.is_anonymous());
        assert!(outcome.clear_cookie);
        assert!(!store.session_by_token(&session.session_key).unwrap().is_active);
    }

    #[tokio::test]
    async fn login_enforces_a_single_active_session() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);
        let user = seed_user(&store, "correct horse").await;

        let (_, first) = svc.login("ada@example.com", "correct horse").await.unwrap();
        let (_, second) = svc.login("ada@example.com", "correct horse").await.unwrap();

        assert_ne!(first.session_key, second.session_key);
        assert_eq!(store.active_session_count(user.user_id), 1);
        assert!(!store.session_by_token(&first.session_key).unwrap().is_active);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_fail_alike() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);
        seed_user(&store, "correct horse").await;

        let wrong = svc.login("ada@example.com", "battery staple").await;
        assert!(matches!(wrong, Err(ServiceError::InvalidCredentials)));

        let unknown = svc.login("nobody@example.com", "correct horse").await;
        assert!(matches!(unknown, Err(ServiceError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);
        let user = seed_user(&store, "correct horse").await;
        let (_, session) = svc.login("ada@example.com", "correct horse").await.unwrap();

        svc.logout(&session.session_key).await.unwrap();
        assert_eq!(store.active_session_count(user.user_id), 0);
        svc.logout(&session.session_key).await.unwrap();
    }

    #[tokio::test]
    async fn account_deactivation_cascades_to_sessions() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);
        let user = seed_user(&store, "correct horse").await;
        svc.login("ada@example.com", "correct horse").await.unwrap();

        svc.deactivate_account(user.user_id).await.unwrap();

        assert!(!store.find_by_id(user.user_id).await.unwrap().unwrap().is_active);
        assert_eq!(store.active_session_count(user.user_id), 0);

        // A deactivated account can no longer log in.
        let relogin = svc.login("ada@example.com", "correct horse").await;
        assert!(matches!(relogin, Err(ServiceError::InvalidCredentials)));
    }
}
