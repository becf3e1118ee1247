//! # Authentication
//!
//! Email/password accounts against the Identity Toolkit REST API, and ID
//! token refresh against the Secure Token API.
//!
//! ## Sign-in Flow
//! ```text
//! ┌───────────────┐  POST /v1/accounts:signInWithPassword?key=..  ┌──────────────┐
//! │ SessionState  │ ─────────────────────────────────────────────►│ Identity     │
//! │ (terminal)    │   { email, password, returnSecureToken }      │ Toolkit      │
//! │               │◄───────────────────────────────────────────── │              │
//! └───────┬───────┘   { localId, idToken, refreshToken, ... }     └──────────────┘
//!         │
//!         ▼
//!   TokenCell ← idToken + refreshToken + expiry
//!         │
//!         │  within 5 min of expiry, on the next request:
//!         ▼
//!   POST /v1/token?key=..  grant_type=refresh_token ──► Secure Token
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::FirebaseSettings;
use crate::error::{SyncError, SyncResult};

/// A signed-in account.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub user_id: String,
    pub email: String,
    pub id_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime of `id_token` as reported at sign-in.
    pub expires_in: Option<Duration>,
}

/// A new ID token obtained with a refresh token.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshedToken {
    pub id_token: String,
    /// Providers may rotate the refresh token; `None` keeps the old one.
    pub refresh_token: Option<String>,
    pub expires_in: Option<Duration>,
}

/// Account provider.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Creates an account and signs it in.
    async fn sign_up(&self, email: &str, password: &str) -> SyncResult<AuthSession>;

    async fn sign_in(&self, email: &str, password: &str) -> SyncResult<AuthSession>;

    /// Exchanges a refresh token for a fresh ID token.
    async fn refresh(&self, refresh_token: &str) -> SyncResult<RefreshedToken>;
}

fn parse_expiry(raw: Option<&str>) -> Option<Duration> {
    raw.and_then(|s| s.parse::<u64>().ok()).map(Duration::from_secs)
}

// =============================================================================
// Identity Toolkit
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: Option<String>,
    id_token: String,
    refresh_token: Option<String>,
    expires_in: Option<String>,
}

/// Secure Token answers in snake_case, unlike Identity Toolkit.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: String,
    refresh_token: Option<String>,
    expires_in: Option<String>,
}

/// Identity Toolkit and Secure Token client.
pub struct FirebaseAuth {
    client: Client,
    base_url: String,
    token_url: String,
    api_key: String,
}

impl FirebaseAuth {
    pub fn new(settings: &FirebaseSettings) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| SyncError::Internal(format!("failed to create HTTP client: {}", e)))?;

        Ok(FirebaseAuth {
            client,
            base_url: settings.auth_url.trim_end_matches('/').to_string(),
            token_url: settings.token_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        })
    }

    /// Turns a refused request into [`SyncError::AuthFailed`] carrying the
    /// provider's reason code.
    async fn refused(endpoint: &str, response: Response) -> SyncError {
        let status = response.status();
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let message = body["error"]["message"]
            .as_str()
            .unwrap_or("unknown error")
            .to_string();
        warn!(endpoint, status = status.as_u16(), message = %message, "Account request refused");
        SyncError::AuthFailed(message)
    }

    async fn account_request(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> SyncResult<AuthSession> {
        let url = format!(
            "{}/v1/accounts:{}?key={}",
            self.base_url,
            endpoint,
            urlencoding::encode(&self.api_key)
        );

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::refused(endpoint, response).await);
        }

        let account: AccountResponse = response.json().await?;
        info!(user_id = %account.local_id, "Account signed in");

        Ok(AuthSession {
            expires_in: parse_expiry(account.expires_in.as_deref()),
            user_id: account.local_id,
            email: account.email.unwrap_or_else(|| email.to_string()),
            id_token: account.id_token,
            refresh_token: account.refresh_token,
        })
    }
}

#[async_trait]
impl AuthProvider for FirebaseAuth {
    async fn sign_up(&self, email: &str, password: &str) -> SyncResult<AuthSession> {
        self.account_request("signUp", email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> SyncResult<AuthSession> {
        self.account_request("signInWithPassword", email, password).await
    }

    async fn refresh(&self, refresh_token: &str) -> SyncResult<RefreshedToken> {
        let url = format!(
            "{}/v1/token?key={}",
            self.token_url,
            urlencoding::encode(&self.api_key)
        );

        let response = self
            .client
            .post(&url)
            .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::refused("token", response).await);
        }

        let token: TokenResponse = response.json().await?;
        debug!("ID token refreshed");

        Ok(RefreshedToken {
            expires_in: parse_expiry(token.expires_in.as_deref()),
            id_token: token.id_token,
            refresh_token: token.refresh_token,
        })
    }
}

// =============================================================================
// In-memory provider
// =============================================================================

/// Accounts held in process memory, for tests and offline demos.
///
/// User ids are derived from the email, so the same cashier gets the same id
/// across restarts. A [`registering`](Self::registering) provider signs
/// unknown emails straight in; the terminal uses it when no cloud project is
/// configured.
#[derive(Default)]
pub struct MemoryAuth {
    accounts: Mutex<HashMap<String, String>>,
    register_on_sign_in: bool,
    refreshes: AtomicUsize,
}

impl MemoryAuth {
    /// Rejects unknown emails with `EMAIL_NOT_FOUND`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registering() -> Self {
        MemoryAuth {
            register_on_sign_in: true,
            ..Self::default()
        }
    }

    /// Stable id for `email`.
    pub fn user_id_for(email: &str) -> String {
        let name = format!("mailto:{}", email.trim().to_lowercase());
        Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()).to_string()
    }

    fn session(user_id: &str, email: &str) -> AuthSession {
        AuthSession {
            user_id: user_id.to_string(),
            email: email.to_string(),
            id_token: format!("token-{}", user_id),
            refresh_token: Some(format!("refresh-{}", user_id)),
            expires_in: None,
        }
    }

    fn accounts(&self) -> SyncResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.accounts
            .lock()
            .map_err(|_| SyncError::Internal("account table poisoned".into()))
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn sign_up(&self, email: &str, password: &str) -> SyncResult<AuthSession> {
        let mut accounts = self.accounts()?;
        if accounts.contains_key(email) {
            return Err(SyncError::AuthFailed("EMAIL_EXISTS".into()));
        }

        accounts.insert(email.to_string(), password.to_string());
        Ok(Self::session(&Self::user_id_for(email), email))
    }

    async fn sign_in(&self, email: &str, password: &str) -> SyncResult<AuthSession> {
        let mut accounts = self.accounts()?;
        let stored = accounts.get(email).cloned();
        match stored {
            Some(stored) if stored == password => {}
            Some(_) => return Err(SyncError::AuthFailed("INVALID_PASSWORD".into())),
            None if self.register_on_sign_in => {
                debug!(email, "Registering local account on first sign-in");
                accounts.insert(email.to_string(), password.to_string());
            }
            None => return Err(SyncError::AuthFailed("EMAIL_NOT_FOUND".into())),
        }
        Ok(Self::session(&Self::user_id_for(email), email))
    }

    async fn refresh(&self, refresh_token: &str) -> SyncResult<RefreshedToken> {
        let user_id = refresh_token
            .strip_prefix("refresh-")
            .ok_or_else(|| SyncError::AuthFailed("INVALID_REFRESH_TOKEN".into()))?;

        let known = self
            .accounts()?
            .keys()
            .any(|email| Self::user_id_for(email) == user_id);
        if !known {
            return Err(SyncError::AuthFailed("USER_NOT_FOUND".into()));
        }

        let round = self.refreshes.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(RefreshedToken {
            id_token: format!("token-{}-r{}", user_id, round),
            refresh_token: None,
            expires_in: None,
        })
    }
}
