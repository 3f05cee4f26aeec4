//! Authentication session lifecycle.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::gateway::ChatGateway;
use crate::gateway::error::GatewayError;
use crate::gateway::types::User;

use super::token_store::{TokenStore, TokenStoreError};

/// Errors surfaced by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The backend rejected or failed the credential resolution.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The durable token slot failed.
    #[error("token storage error: {0}")]
    Storage(#[from] TokenStoreError),
}

/// Convenience result alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Mutable session fields behind the manager's lock.
#[derive(Clone, Debug, Default)]
struct SessionState {
    token: Option<String>,
    user: Option<User>,
    loading: bool,
}

impl SessionState {
    /// A session is authenticated only once the user behind the token has
    /// been resolved; a bare token is not enough to render protected views.
    const fn authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }
}

/// Single source of truth for "who is logged in".
///
/// Explicitly constructed with its gateway and token-store dependencies;
/// consumers (route guards, views) share it behind an `Arc`. Every
/// credential-resolution path, success or failure, terminates with
/// `loading == false`.
pub struct SessionManager {
    gateway: Arc<dyn ChatGateway>,
    tokens: Arc<dyn TokenStore>,
    state: RwLock<SessionState>,
}

impl SessionManager {
    /// Create a manager over the given gateway and token store.
    #[must_use]
    pub fn new(gateway: Arc<dyn ChatGateway>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            gateway,
            tokens,
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Restore a session from the persisted token, if one exists.
    ///
    /// Returns `true` when a session was restored. A token that no longer
    /// resolves to a user (expired, revoked, backend unreachable) is cleared
    /// from durable storage and the session is left logged out; that outcome
    /// is `Ok(false)`, not an error.
    ///
    /// # Errors
    /// Returns an error only if the durable token slot itself fails.
    pub async fn restore(&self) -> SessionResult<bool> {
        let Some(token) = self.tokens.load().await? else {
            debug!("no persisted token; starting logged out");
            self.set_loading(false).await;
            return Ok(false);
        };

        self.set_loading(true).await;
        self.gateway.set_token(Some(token.clone()));
        {
            let mut state = self.state.write().await;
            state.token = Some(token);
        }

        match self.gateway.current_user().await {
            Ok(user) => {
                let mut state = self.state.write().await;
                info!(username = %user.username, "session restored");
                state.user = Some(user);
                state.loading = false;
                Ok(true)
            }
            Err(err) => {
                warn!("persisted token rejected: {err}");
                if let Err(storage_err) = self.discard_session().await {
                    warn!("failed to clear persisted token: {storage_err}");
                }
                self.set_loading(false).await;
                Ok(false)
            }
        }
    }

    /// Install a freshly obtained token and resolve the user behind it.
    ///
    /// On failure the token is discarded (logout semantics) and the error is
    /// returned for the caller to surface; no partial session survives.
    ///
    /// # Errors
    /// Returns an error if the token cannot be persisted or the user
    /// resolution fails.
    pub async fn login(&self, token: &str) -> SessionResult<User> {
        self.set_loading(true).await;

        if let Err(err) = self.tokens.save(token).await {
            self.set_loading(false).await;
            return Err(err.into());
        }
        self.gateway.set_token(Some(token.to_string()));
        {
            let mut state = self.state.write().await;
            state.token = Some(token.to_string());
        }

        match self.gateway.current_user().await {
            Ok(user) => {
                let mut state = self.state.write().await;
                info!(username = %user.username, "logged in");
                state.user = Some(user.clone());
                state.loading = false;
                Ok(user)
            }
            Err(err) => {
                warn!("login token did not resolve to a user: {err}");
                if let Err(storage_err) = self.discard_session().await {
                    warn!("failed to clear persisted token: {storage_err}");
                }
                self.set_loading(false).await;
                Err(err.into())
            }
        }
    }

    /// Log out: clear the persisted token, the gateway credential, and the
    /// in-memory identity. Idempotent.
    ///
    /// The in-memory session is always cleared, even when durable storage
    /// fails; the storage error is returned so the caller can surface it.
    ///
    /// # Errors
    /// Returns an error if the durable token slot fails to clear.
    pub async fn logout(&self) -> SessionResult<()> {
        let cleared = self.discard_session().await;
        self.set_loading(false).await;
        info!("logged out");
        cleared.map_err(Into::into)
    }

    /// Whether protected views may be rendered.
    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.authenticated()
    }

    /// Whether an authentication decision is still in flight.
    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    /// Snapshot of the resolved user identity.
    pub async fn user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    async fn set_loading(&self, loading: bool) {
        let mut state = self.state.write().await;
        state.loading = loading;
    }

    /// Clear the credential everywhere: durable slot, gateway, memory.
    ///
    /// Memory and the gateway are always cleared; the durable slot's outcome
    /// is reported to the caller.
    async fn discard_session(&self) -> Result<(), TokenStoreError> {
        let cleared = self.tokens.clear().await;
        self.gateway.set_token(None);
        let mut state = self.state.write().await;
        state.token = None;
        state.user = None;
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::error::GatewayError;
    use crate::gateway::testing::{MockGateway, test_user};
    use crate::session::token_store::MemoryTokenStore;

    fn manager_with(
        gateway: MockGateway,
        tokens: MemoryTokenStore,
    ) -> (SessionManager, Arc<MockGateway>, Arc<MemoryTokenStore>) {
        let gateway = Arc::new(gateway);
        let tokens = Arc::new(tokens);
        let manager = SessionManager::new(gateway.clone(), tokens.clone());
        (manager, gateway, tokens)
    }

    #[tokio::test]
    async fn test_restore_without_token_settles_logged_out() {
        let (manager, gateway, _) = manager_with(MockGateway::new(), MemoryTokenStore::new());

        assert!(!manager.restore().await.unwrap());
        assert!(!manager.is_authenticated().await);
        assert!(!manager.is_loading().await);
        assert_eq!(manager.user().await, None);
        // No network call happens without a persisted token.
        assert_eq!(gateway.call_count("current_user"), 0);
    }

    #[tokio::test]
    async fn test_restore_with_valid_token() {
        let gateway = MockGateway::new();
        gateway.push_user(Ok(test_user()));
        let (manager, gateway, _) =
            manager_with(gateway, MemoryTokenStore::with_token("persisted"));

        assert!(manager.restore().await.unwrap());
        assert!(manager.is_authenticated().await);
        assert!(!manager.is_loading().await);
        assert_eq!(manager.user().await.unwrap().username, "jaspar");
        assert_eq!(gateway.installed_token(), Some("persisted".to_string()));
    }

    #[tokio::test]
    async fn test_restore_with_rejected_token_clears_storage() {
        let gateway = MockGateway::new();
        gateway.push_user(Err(GatewayError::Auth("token expired".to_string())));
        let (manager, gateway, tokens) =
            manager_with(gateway, MemoryTokenStore::with_token("stale"));

        assert!(!manager.restore().await.unwrap());
        assert!(!manager.is_authenticated().await);
        assert!(!manager.is_loading().await);
        assert_eq!(tokens.load().await.unwrap(), None);
        assert_eq!(gateway.installed_token(), None);
    }

    #[tokio::test]
    async fn test_login_success_persists_token() {
        let gateway = MockGateway::new();
        gateway.push_user(Ok(test_user()));
        let (manager, gateway, tokens) = manager_with(gateway, MemoryTokenStore::new());

        let user = manager.login("fresh-token").await.unwrap();
        assert_eq!(user.id, 1);
        assert!(manager.is_authenticated().await);
        assert!(!manager.is_loading().await);
        assert_eq!(tokens.load().await.unwrap(), Some("fresh-token".to_string()));
        assert_eq!(gateway.installed_token(), Some("fresh-token".to_string()));
    }

    #[tokio::test]
    async fn test_login_failure_applies_logout_semantics() {
        let gateway = MockGateway::new();
        gateway.push_user(Err(GatewayError::Auth("bad token".to_string())));
        let (manager, gateway, tokens) = manager_with(gateway, MemoryTokenStore::new());

        let err = manager.login("bogus").await.unwrap_err();
        assert!(matches!(err, SessionError::Gateway(inner) if inner.is_auth()));
        assert!(!manager.is_authenticated().await);
        assert!(!manager.is_loading().await);
        assert_eq!(manager.user().await, None);
        assert_eq!(tokens.load().await.unwrap(), None);
        assert_eq!(gateway.installed_token(), None);
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let gateway = MockGateway::new();
        gateway.push_user(Ok(test_user()));
        let (manager, gateway, tokens) = manager_with(gateway, MemoryTokenStore::new());

        manager.login("tok").await.unwrap();
        manager.logout().await.unwrap();
        assert!(!manager.is_authenticated().await);
        assert_eq!(tokens.load().await.unwrap(), None);
        assert_eq!(gateway.installed_token(), None);

        // Logging out again re-asserts the cleared state without failing.
        manager.logout().await.unwrap();
        assert!(!manager.is_authenticated().await);
        assert_eq!(manager.user().await, None);
    }

    #[tokio::test]
    async fn test_logout_then_restore_stays_logged_out() {
        let gateway = MockGateway::new();
        gateway.push_user(Ok(test_user()));
        let (manager, _, _) = manager_with(gateway, MemoryTokenStore::new());

        manager.login("tok").await.unwrap();
        manager.logout().await.unwrap();

        assert!(!manager.restore().await.unwrap());
        assert!(!manager.is_authenticated().await);
        assert_eq!(manager.user().await, None);
        assert!(!manager.is_loading().await);
    }
}
