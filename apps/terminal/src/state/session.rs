//! # Session State
//!
//! The signed-in user and their store profile.
//!
//! ```text
//! sign_up ──► AuthProvider.sign_up ──► token ──► create Users/{id} profile
//! sign_in ──► AuthProvider.sign_in ──► token ──► load_profile (query Users by userId)
//! sign_out ─► token cleared, profile dropped
//! ```
//!
//! The ID token is written into the shared [`TokenCell`] read by the REST
//! clients, so every remote call after sign-in is authenticated.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use kervy_core::validation::validate_email;
use kervy_core::{Collection, ProfileUpdate, UserProfile};
use kervy_sync::remote::to_fields;
use kervy_sync::{AuthProvider, AuthSession, Query, RemoteStore, SyncError, TokenCell};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
struct Signed {
    session: AuthSession,
    profile: Option<UserProfile>,
}

/// Who is signed in on this terminal.
#[derive(Clone)]
pub struct SessionState {
    auth: Arc<dyn AuthProvider>,
    remote: Arc<dyn RemoteStore>,
    token: TokenCell,
    current: Arc<RwLock<Option<Signed>>>,
}

impl SessionState {
    pub fn new(auth: Arc<dyn AuthProvider>, remote: Arc<dyn RemoteStore>, token: TokenCell) -> Self {
        SessionState {
            auth,
            remote,
            token,
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates the account, signs it in and writes its profile document.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> AppResult<UserProfile> {
        validate_email(email)?;

        let session = self.auth.sign_up(email, password).await?;
        self.start(session.clone(), None).await;

        let profile = UserProfile::new(&session.user_id, &session.email, name);
        let profile = self.create_profile(profile).await?;
        info!(user_id = %session.user_id, "Account created");
        Ok(profile)
    }

    /// Signs in and loads the profile, if one exists.
    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        let session = self.auth.sign_in(email, password).await?;
        self.start(session.clone(), None).await;

        let profile = self.load_profile().await?;
        debug!(has_profile = profile.is_some(), "Profile loaded");
        info!(user_id = %session.user_id, "Signed in");
        Ok(session)
    }

    pub async fn sign_out(&self) {
        self.token.clear().await;
        if let Some(signed) = self.current.write().await.take() {
            info!(user_id = %signed.session.user_id, "Signed out");
        }
    }

    /// The signed-in account, if any.
    pub async fn current_user(&self) -> Option<AuthSession> {
        self.current.read().await.as_ref().map(|s| s.session.clone())
    }

    /// The signed-in user's id, or `NotAuthenticated`.
    pub async fn user_id(&self) -> AppResult<String> {
        self.current_user()
            .await
            .map(|s| s.user_id)
            .ok_or_else(|| SyncError::NotAuthenticated.into())
    }

    /// The cached profile, if loaded.
    pub async fn profile(&self) -> Option<UserProfile> {
        self.current.read().await.as_ref().and_then(|s| s.profile.clone())
    }

    /// Reads the profile from `Users` and caches it.
    pub async fn load_profile(&self) -> AppResult<Option<UserProfile>> {
        let user_id = self.user_id().await?;
        let query = Query::new().where_eq("userId", user_id.as_str()).limit(1);
        let profile = match self.remote.query(Collection::Users, &query).await?.first() {
            Some(doc) => Some(doc.decode::<UserProfile>()?),
            None => None,
        };

        self.set_profile(profile.clone()).await;
        Ok(profile)
    }

    /// Writes a new profile document and caches it.
    pub async fn create_profile(&self, mut profile: UserProfile) -> AppResult<UserProfile> {
        let fields = to_fields(&profile)?;
        profile.id = self.remote.create(Collection::Users, fields).await?;

        self.set_profile(Some(profile.clone())).await;
        Ok(profile)
    }

    /// Merges `update` into the stored profile.
    pub async fn update_profile(&self, update: ProfileUpdate) -> AppResult<UserProfile> {
        let mut profile = match self.profile().await {
            Some(profile) => profile,
            None => self
                .load_profile()
                .await?
                .ok_or_else(|| AppError::not_found("Profile", "current user"))?,
        };

        self.remote
            .update(Collection::Users, &profile.id, update.clone().into_fields())
            .await?;
        update.apply_to(&mut profile);

        self.set_profile(Some(profile.clone())).await;
        info!(profile_id = %profile.id, "Profile updated");
        Ok(profile)
    }

    async fn start(&self, session: AuthSession, profile: Option<UserProfile>) {
        self.token.store(&session).await;
        *self.current.write().await = Some(Signed { session, profile });
    }

    async fn set_profile(&self, profile: Option<UserProfile>) {
        if let Some(signed) = self.current.write().await.as_mut() {
            signed.profile = profile;
        }
    }
}
