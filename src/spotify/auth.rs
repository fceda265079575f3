use reqwest::Url;

use super::{SpotifyClient, TransportError};
use crate::{
    config::Config,
    types::{TokenPair, TokenResponse},
};

/// Builds the Spotify authorize URL for the login or logout dance.
pub fn authorize_url(config: &Config, route: &str, state: &str) -> Result<Url, String> {
    Url::parse_with_params(
        &config.auth_url,
        &[
            ("response_type", "code"),
            ("client_id", config.client_id.as_str()),
            ("scope", config.scope.as_str()),
            ("redirect_uri", config.redirect_uri(route).as_str()),
            ("state", state),
        ],
    )
    .map_err(|e| format!("invalid authorize url {}: {}", config.auth_url, e))
}

impl SpotifyClient {
    /// Exchanges an authorization code for a credential pair.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenPair, TransportError> {
        let request = self
            .transport
            .client()
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ]);

        let response = self.transport.send(request).await?;
        let token = response.json::<TokenResponse>().await?;

        token.into_pair().ok_or_else(|| TransportError::Status {
            status: reqwest::StatusCode::BAD_GATEWAY,
            body: "token response without refresh_token".to_string(),
        })
    }

    /// Exchanges a refresh credential for a fresh pair.
    ///
    /// A revoked credential comes back as a 400 whose body carries
    /// `invalid_grant`; see [`TransportError::oauth_error`].
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, TransportError> {
        let request = self
            .transport
            .client()
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ]);

        let response = self.transport.send(request).await?;
        let token = response.json::<TokenResponse>().await?;

        Ok(token.into_refreshed_pair(refresh_token))
    }
}
