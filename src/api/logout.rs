use std::{collections::HashMap, sync::Arc};

use axum::{Extension, extract::Query, http::StatusCode, response::Response};

use super::{AppState, authorize_redirect, page};
use crate::warning;

pub async fn logout(
    Query(params): Query<HashMap<String, String>>,
    Extension(state): Extension<Arc<AppState>>,
) -> Response {
    if params.contains_key("error") {
        return page(StatusCode::NOT_FOUND, "<h4>Logout was cancelled.</h4>");
    }

    let (Some(code), Some(oauth_state)) = (params.get("code"), params.get("state")) else {
        return authorize_redirect(&state, "logout").await;
    };

    if !state.consume_state(oauth_state).await {
        return page(StatusCode::BAD_REQUEST, "<h4>Unknown logout attempt.</h4>");
    }

    let redirect_uri = state.config.redirect_uri("logout");
    match state.scheduler.sessions().logout(code, &redirect_uri).await {
        Ok(_) => page(
            StatusCode::OK,
            "<h2>Logged out.</h2><p>Your liked songs will no longer be synced.</p>",
        ),
        Err(e) => {
            warning!("Logout failed: {}", e);
            page(StatusCode::NOT_FOUND, "<h4>Logout failed.</h4>")
        }
    }
}
