use std::fmt;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio::time::sleep;

use crate::{types::OAuthErrorBody, utils, warning};

/// Failure of a remote call after rate limiting has been absorbed.
#[derive(Debug)]
pub enum TransportError {
    /// The service answered with a non-2xx status other than 429.
    Status { status: StatusCode, body: String },
    /// The request never produced a response (connection, TLS, decoding).
    Network(reqwest::Error),
    /// The request body is a stream and cannot be re-issued after a 429.
    NotReplayable,
}

impl TransportError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Network(e) => e.status(),
            TransportError::NotReplayable => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// The OAuth `error` code carried by the body, e.g. `invalid_grant`.
    pub fn oauth_error(&self) -> Option<String> {
        match self {
            TransportError::Status { body, .. } => serde_json::from_str::<OAuthErrorBody>(body)
                .ok()
                .map(|b| b.error),
            _ => None,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Status { status, body } if body.is_empty() => {
                write!(f, "remote answered {status}")
            }
            TransportError::Status { status, body } => write!(f, "remote answered {status}: {body}"),
            TransportError::Network(e) => write!(f, "request failed: {e}"),
            TransportError::NotReplayable => f.write_str("request body cannot be replayed"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Network(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Network(err)
    }
}

/// Shared HTTP client that waits out 429 responses.
///
/// A 429 suspends the caller for the `Retry-After` seconds advertised by the
/// service and re-issues the identical request, as many times as the service
/// keeps asking. Every other outcome is handed back unchanged: 2xx as `Ok`,
/// anything else as [`TransportError`] so callers can react to 401 and friends.
#[derive(Debug, Clone, Default)]
pub struct Transport {
    client: Client,
}

impl Transport {
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn send(&self, request: RequestBuilder) -> Result<Response, TransportError> {
        let mut attempt: u32 = 0;

        loop {
            let pending = request.try_clone().ok_or(TransportError::NotReplayable)?;
            let response = pending.send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                attempt += 1;
                let wait = utils::parse_retry_after(
                    response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok()),
                );
                warning!(
                    "Rate limited on {}, retrying in {}s (attempt {})",
                    response.url().path(),
                    wait.as_secs(),
                    attempt
                );
                sleep(wait).await;
                continue;
            }

            if status.is_success() {
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }
    }
}
