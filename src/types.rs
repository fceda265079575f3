use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Access and refresh credential issued together by the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    /// Pair from an authorization-code exchange, which must carry a refresh token.
    pub fn into_pair(self) -> Option<TokenPair> {
        let refresh_token = self.refresh_token.filter(|t| !t.is_empty())?;
        Some(TokenPair {
            access_token: self.access_token,
            refresh_token,
        })
    }

    /// Spotify may omit `refresh_token` on refresh; the previous one stays valid then.
    pub fn into_refreshed_pair(self, previous_refresh: &str) -> TokenPair {
        TokenPair {
            refresh_token: self
                .refresh_token
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| previous_refresh.to_string()),
            access_token: self.access_token,
        }
    }
}

/// Error body of the OAuth endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Identity {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

/// One page of `/me/tracks` or `/playlists/{id}/tracks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackPage {
    pub items: Vec<TrackItem>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackItem {
    pub track: Option<TrackRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackRef {
    pub id: Option<String>,
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlaylistRequest {
    pub name: String,
    pub description: String,
    pub public: bool,
    pub collaborative: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlaylistResponse {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistDetails {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTracksRequest {
    pub uris: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveTracksRequest {
    pub tracks: Vec<TrackUri>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackUri {
    pub uri: String,
}

/// Persisted state of one signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    pub id: String,
    pub username: String,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl UserSession {
    pub fn new(id: String, username: String, tokens: TokenPair) -> Self {
        Self {
            id,
            username,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            playlist_id: None,
            last_run: None,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncReason {
    Ok,
    TokenRevoked,
    TokenRefreshFailed,
    FetchFailed,
    WriteFailed,
    SkippedTooSoon,
}

impl fmt::Display for SyncReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncReason::Ok => "ok",
            SyncReason::TokenRevoked => "token revoked",
            SyncReason::TokenRefreshFailed => "token refresh failed",
            SyncReason::FetchFailed => "fetch failed",
            SyncReason::WriteFailed => "write failed",
            SyncReason::SkippedTooSoon => "skipped, ran too recently",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub user_id: String,
    pub success: bool,
    pub reason: SyncReason,
}

impl SyncOutcome {
    pub fn new(user_id: &str, reason: SyncReason) -> Self {
        Self {
            user_id: user_id.to_string(),
            success: reason == SyncReason::Ok,
            reason,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CycleSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub outcomes: Vec<SyncOutcome>,
}

impl CycleSummary {
    pub fn push(&mut self, outcome: SyncOutcome) {
        self.total += 1;
        if outcome.success {
            self.succeeded += 1;
        }
        if outcome.reason == SyncReason::SkippedTooSoon {
            self.skipped += 1;
        }
        self.outcomes.push(outcome);
    }
}

#[derive(Tabled)]
pub struct UserTableRow {
    pub id: String,
    pub username: String,
    pub playlist: String,
    pub last_run: String,
    pub enabled: bool,
}
