use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};

use super::store::{SessionStore, StoreError};
use crate::{
    failure, info,
    spotify::{SpotifyClient, TransportError},
    success,
    types::{Identity, TokenPair, UserSession},
    warning,
};

/// Result of exchanging a refresh credential.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// New pair, already written to the matching session.
    Refreshed(TokenPair),
    /// The service answered `invalid_grant`; the session has been deleted.
    Revoked,
    /// Anything else. Stored state is untouched.
    Failed(TransportError),
}

#[derive(Debug)]
pub enum SessionError {
    Remote(TransportError),
    Store(StoreError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Remote(e) => write!(f, "{e}"),
            SessionError::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<TransportError> for SessionError {
    fn from(err: TransportError) -> Self {
        SessionError::Remote(err)
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        SessionError::Store(err)
    }
}

/// Owns the credential lifecycle of every session.
///
/// Only this type writes credentials and `last_run`; the reconciler writes
/// the playlist id.
#[derive(Clone)]
pub struct SessionManager {
    client: SpotifyClient,
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    pub fn new(client: SpotifyClient, store: Arc<dyn SessionStore>) -> Self {
        Self { client, store }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub async fn refresh(&self, refresh_token: &str) -> RefreshOutcome {
        match self.client.refresh_token(refresh_token).await {
            Ok(pair) => {
                match self.store.replace_tokens(refresh_token, &pair).await {
                    Ok(true) => success!("Refreshed access token"),
                    Ok(false) => warning!("Refreshed a token that no stored session holds"),
                    Err(e) => failure!("Failed to store refreshed token: {}", e),
                }
                RefreshOutcome::Refreshed(pair)
            }
            Err(e) if e.oauth_error().as_deref() == Some("invalid_grant") => {
                warning!("Refresh token was revoked, removing the session...");
                match self.store.remove_by_refresh_token(refresh_token).await {
                    Ok(_) => info!("Removed the revoked session"),
                    Err(e) => failure!("Failed to remove the revoked session: {}", e),
                }
                RefreshOutcome::Revoked
            }
            Err(e) => {
                failure!("Failed to refresh access token: {}", e);
                RefreshOutcome::Failed(e)
            }
        }
    }

    pub async fn fetch_identity(&self, access_token: &str) -> Result<Identity, TransportError> {
        self.client.current_user(access_token).await
    }

    /// Completes a login: exchanges the code, resolves the user and stores
    /// (or refreshes) their session.
    pub async fn register(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<UserSession, SessionError> {
        let tokens = self.client.exchange_code(code, redirect_uri).await?;
        let identity = self.fetch_identity(&tokens.access_token).await?;

        info!("Got a new user \"{}\" ({})", identity.label(), identity.id);
        let session = self
            .store
            .upsert_login(&identity.id, identity.label(), &tokens)
            .await?;
        Ok(session)
    }

    /// Completes a logout: proves ownership through a fresh code exchange and
    /// deletes the session of that user.
    pub async fn logout(&self, code: &str, redirect_uri: &str) -> Result<Identity, SessionError> {
        let tokens = self.client.exchange_code(code, redirect_uri).await?;
        let identity = self.fetch_identity(&tokens.access_token).await?;

        info!("User logout \"{}\" ({})", identity.label(), identity.id);
        if !self.store.remove(&identity.id).await? {
            warning!("No stored session for user {}", identity.id);
        }
        Ok(identity)
    }

    pub async fn record_run(&self, user_id: &str, at: DateTime<Utc>) {
        if let Err(e) = self.store.record_run(user_id, at).await {
            failure!("Failed to record last run for {}: {}", user_id, e);
        }
    }
}
