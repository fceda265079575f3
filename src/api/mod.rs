//! Handlers of the web login surface.
//!
//! `/login` and `/logout` run the same OAuth dance: the first visit is sent
//! to Spotify's authorize page with a one-time `state`, the callback carries
//! `code` and `state` back and completes the action.

use std::{collections::VecDeque, sync::Arc};

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use tokio::sync::Mutex;

use crate::{config::Config, failure, spotify, sync::SyncScheduler, utils};

mod health;
mod login;
mod logout;

pub use health::health;
pub use login::login;
pub use logout::logout;

const STATE_LENGTH: usize = 16;
const MAX_PENDING_STATES: usize = 256;

/// Shared state of the web handlers.
///
/// Holds the loaded configuration, the scheduler used to register users and
/// trigger their first sync, and the OAuth `state` values issued but not yet
/// returned by a callback.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use likeify::{api::AppState, server};
///
/// let state = Arc::new(AppState::new(config, scheduler));
/// let app = server::router(state);
/// ```
pub struct AppState {
    pub config: Config,
    pub scheduler: Arc<SyncScheduler>,
    pending_states: Mutex<VecDeque<String>>,
}

impl AppState {
    pub fn new(config: Config, scheduler: Arc<SyncScheduler>) -> Self {
        Self {
            config,
            scheduler,
            pending_states: Mutex::new(VecDeque::new()),
        }
    }

    /// Issues a fresh OAuth `state` for the authorize redirect.
    ///
    /// The value is a random alphanumeric string remembered until a callback
    /// consumes it. At most 256 values are kept and the oldest is forgotten
    /// first.
    ///
    /// # Returns
    ///
    /// The issued value, to be placed in the authorize URL.
    pub async fn issue_state(&self) -> String {
        let state = utils::generate_state(STATE_LENGTH);
        let mut pending = self.pending_states.lock().await;
        if pending.len() >= MAX_PENDING_STATES {
            pending.pop_front();
        }
        pending.push_back(state.clone());
        state
    }

    /// Accepts a `state` once.
    ///
    /// # Arguments
    ///
    /// * `state` - The value returned by the callback
    ///
    /// # Returns
    ///
    /// `true` if the value was issued and not used yet. It is forgotten
    /// either way, so a replayed callback gets `false`.
    pub async fn consume_state(&self, state: &str) -> bool {
        let mut pending = self.pending_states.lock().await;
        match pending.iter().position(|s| s == state) {
            Some(index) => {
                pending.remove(index);
                true
            }
            None => false,
        }
    }
}

async fn authorize_redirect(state: &AppState, route: &str) -> Response {
    let oauth_state = state.issue_state().await;
    match spotify::auth::authorize_url(&state.config, route, &oauth_state) {
        Ok(url) => Redirect::to(url.as_str()).into_response(),
        Err(e) => {
            failure!("{}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn page(status: StatusCode, body: &'static str) -> Response {
    (status, Html(body)).into_response()
}

/// Fallback handler for unknown routes.
pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
