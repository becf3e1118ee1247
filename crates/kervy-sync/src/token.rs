//! # ID Token Cell
//!
//! The signed-in user's ID token, shared by the session (writer) and the
//! REST clients (readers).
//!
//! ```text
//! SessionState ── store(session) ──► TokenCell ◄── bearer() ── FirestoreClient
//!                                        │                      FirebaseImageStore
//!                                        │ expires within 5 min?
//!                                        ▼
//!                           AuthProvider::refresh(refresh_token)
//! ```
//!
//! Refresh runs under the write lock, so concurrent requests near expiry
//! trigger one refresh between them. A failed refresh falls back to the
//! current token until it actually expires.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::auth::{AuthProvider, AuthSession};
use crate::error::{SyncError, SyncResult};

/// Refresh this long before the token expires.
const REFRESH_MARGIN: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct HeldToken {
    id_token: String,
    refresh_token: Option<String>,
    expires_at: Option<Instant>,
}

impl HeldToken {
    fn needs_refresh(&self) -> bool {
        self.expires_at
            .is_some_and(|at| Instant::now() + REFRESH_MARGIN >= at)
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Shared slot for the ID token, refreshed on demand.
#[derive(Clone, Default)]
pub struct TokenCell {
    held: Arc<RwLock<Option<HeldToken>>>,
    refresher: Option<Arc<dyn AuthProvider>>,
}

impl TokenCell {
    /// A cell that never refreshes; tokens are used until the server
    /// refuses them.
    pub fn new() -> Self {
        Self::default()
    }

    /// A cell that renews tokens through `auth` before they expire.
    pub fn refreshing(auth: Arc<dyn AuthProvider>) -> Self {
        TokenCell {
            held: Arc::default(),
            refresher: Some(auth),
        }
    }

    pub async fn store(&self, session: &AuthSession) {
        *self.held.write().await = Some(HeldToken {
            id_token: session.id_token.clone(),
            refresh_token: session.refresh_token.clone(),
            expires_at: session.expires_in.map(|ttl| Instant::now() + ttl),
        });
    }

    pub async fn clear(&self) {
        *self.held.write().await = None;
    }

    pub async fn is_signed_in(&self) -> bool {
        self.held.read().await.is_some()
    }

    /// A token fit for the next request, refreshing it first when it is
    /// close to expiry.
    pub async fn bearer(&self) -> SyncResult<String> {
        {
            let held = self.held.read().await;
            match held.as_ref() {
                None => return Err(SyncError::NotAuthenticated),
                Some(token) if !token.needs_refresh() => return Ok(token.id_token.clone()),
                Some(_) => {}
            }
        }

        let mut held = self.held.write().await;
        let Some(current) = held.clone() else {
            return Err(SyncError::NotAuthenticated);
        };
        // Another request may have refreshed while we waited for the lock.
        if !current.needs_refresh() {
            return Ok(current.id_token);
        }

        let (Some(auth), Some(refresh_token)) = (&self.refresher, current.refresh_token.as_deref())
        else {
            debug!("ID token near expiry and no way to refresh it");
            return Ok(current.id_token);
        };

        match auth.refresh(refresh_token).await {
            Ok(fresh) => {
                info!("ID token refreshed");
                let id_token = fresh.id_token.clone();
                *held = Some(HeldToken {
                    id_token: fresh.id_token,
                    refresh_token: fresh.refresh_token.or(current.refresh_token),
                    expires_at: fresh.expires_in.map(|ttl| Instant::now() + ttl),
                });
                Ok(id_token)
            }
            Err(e) if !current.is_expired() => {
                warn!(error = %e, "ID token refresh failed, using the current token");
                Ok(current.id_token)
            }
            Err(e) => {
                warn!(error = %e, "ID token expired and could not be refreshed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryAuth;

    fn expiring(session: &AuthSession, ttl: Duration) -> AuthSession {
        AuthSession {
            expires_in: Some(ttl),
            ..session.clone()
        }
    }

    #[tokio::test]
    async fn test_empty_cell_is_not_authenticated() {
        let cell = TokenCell::new();
        assert!(matches!(cell.bearer().await, Err(SyncError::NotAuthenticated)));
        assert!(!cell.is_signed_in().await);
    }

    #[tokio::test]
    async fn test_fresh_token_is_used_as_is() {
        let auth = Arc::new(MemoryAuth::new());
        let session = auth.sign_up("ana@kervy.ph", "secret1").await.unwrap();
        let cell = TokenCell::refreshing(auth);

        cell.store(&expiring(&session, Duration::from_secs(3600))).await;
        assert_eq!(cell.bearer().await.unwrap(), session.id_token);
    }

    #[tokio::test]
    async fn test_token_near_expiry_is_refreshed_once() {
        let auth = Arc::new(MemoryAuth::new());
        let session = auth.sign_up("ana@kervy.ph", "secret1").await.unwrap();
        let cell = TokenCell::refreshing(auth);

        cell.store(&expiring(&session, Duration::from_secs(60))).await;
        let first = cell.bearer().await.unwrap();
        let second = cell.bearer().await.unwrap();

        assert_ne!(first, session.id_token);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_an_unexpired_token() {
        let auth = Arc::new(MemoryAuth::new());
        let session = auth.sign_up("ana@kervy.ph", "secret1").await.unwrap();
        let cell = TokenCell::refreshing(auth);

        let broken = AuthSession {
            refresh_token: Some("revoked".to_string()),
            ..expiring(&session, Duration::from_secs(60))
        };
        cell.store(&broken).await;

        assert_eq!(cell.bearer().await.unwrap(), session.id_token);
    }

    #[tokio::test]
    async fn test_clear_signs_out() {
        let cell = TokenCell::new();
        let session = MemoryAuth::new().sign_up("ana@kervy.ph", "x").await.unwrap();
        cell.store(&session).await;
        cell.clear().await;
        assert!(matches!(cell.bearer().await, Err(SyncError::NotAuthenticated)));
    }
}
