//! # Spotify Integration Module
//!
//! Thin client over the parts of the Spotify Web API the mirror needs. Every
//! request goes through the shared [`Transport`], which absorbs rate limiting;
//! all other failures surface as [`TransportError`] so the session and sync
//! layers can decide what a 401 or a 5xx means for the user at hand.
//!
//! ```text
//! Sync Scheduler / Playlist Reconciler / Session Manager
//!          ↓
//! SpotifyClient (auth, user, library, playlist)
//!          ↓
//! Transport (shared reqwest client, 429 handling)
//!          ↓
//! Spotify Web API / Accounts service
//! ```
//!
//! ## API Coverage
//!
//! - `POST /api/token` - code exchange and refresh (basic auth)
//! - `GET /me` - identity of the token bearer
//! - `GET /me/tracks` - liked songs, paginated by `next`
//! - `POST /me/playlists` - create the mirror playlist
//! - `GET /playlists/{id}` - name and description
//! - `GET /playlists/{id}/tracks` - current contents, paginated by `next`
//! - `POST /playlists/{id}/tracks` - append up to 100 URIs
//! - `DELETE /playlists/{id}/tracks` - remove up to 100 URIs
//! - `GET /playlists/{id}/followers/contains` - follow check
//! - `DELETE /playlists/{id}/followers` - unfollow

pub mod auth;
pub mod library;
pub mod playlist;
pub mod transport;
pub mod user;

pub use transport::{Transport, TransportError};

use crate::config::Config;

/// Spotify endpoints plus the application credentials, sharing one transport.
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    transport: Transport,
    api_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl SpotifyClient {
    pub fn new(config: &Config) -> Self {
        Self {
            transport: Transport::default(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }
}
