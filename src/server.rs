use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::{Extension, Router, routing::get};

use crate::{
    Res,
    api::{self, AppState},
    info,
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/login", get(api::login))
        .route("/logout", get(api::logout))
        .fallback(api::not_found)
        .layer(Extension(state))
}

/// Serves the login surface on the configured port until `shutdown` resolves.
pub async fn start_api_server<F>(state: Arc<AppState>, shutdown: F) -> Res<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.web_port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        "Webserver is running on {} (port {})",
        state.config.base_url, state.config.web_port
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
