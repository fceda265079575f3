use std::{collections::HashMap, sync::Arc};

use axum::{Extension, extract::Query, http::StatusCode, response::Response};
use chrono::Utc;

use super::{AppState, authorize_redirect, page};
use crate::{info, warning};

pub async fn login(
    Query(params): Query<HashMap<String, String>>,
    Extension(state): Extension<Arc<AppState>>,
) -> Response {
    if params.contains_key("error") {
        return page(StatusCode::UNAUTHORIZED, "<h4>Login was cancelled.</h4>");
    }

    let (Some(code), Some(oauth_state)) = (params.get("code"), params.get("state")) else {
        return authorize_redirect(&state, "login").await;
    };

    if !state.consume_state(oauth_state).await {
        return page(StatusCode::BAD_REQUEST, "<h4>Unknown login attempt.</h4>");
    }

    let redirect_uri = state.config.redirect_uri("login");
    match state.scheduler.sessions().register(code, &redirect_uri).await {
        Ok(session) => {
            if state.scheduler.can_sync_out_of_band(Utc::now()).await {
                let scheduler = Arc::clone(&state.scheduler);
                tokio::spawn(async move {
                    scheduler.sync_user_now(&session.id).await;
                });
            } else {
                info!("Next cycle is close, user {} will be synced then", session.id);
            }

            page(
                StatusCode::OK,
                "<h2>Login successful.</h2><p>Your liked songs playlist will show up shortly.</p>",
            )
        }
        Err(e) => {
            warning!("Login failed: {}", e);
            page(StatusCode::UNAUTHORIZED, "<h4>Login failed.</h4>")
        }
    }
}
