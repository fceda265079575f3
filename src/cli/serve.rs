use std::sync::Arc;

use tokio::sync::watch;

use super::{load_config, open_store};
use crate::{api::AppState, failure, info, server, sync::SyncScheduler};

/// Runs the web login surface and the periodic scheduler until Ctrl+C.
pub async fn serve() {
    let config = load_config();
    let store = open_store(&config).await;
    let scheduler = Arc::new(SyncScheduler::from_config(&config, store));
    let state = Arc::new(AppState::new(config, Arc::clone(&scheduler)));

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, stopping...");
        }
        let _ = stop_tx.send(true);
    });

    let mut server_stop = stop_rx.clone();
    let web = tokio::spawn(async move {
        let shutdown = async move {
            let _ = server_stop.changed().await;
        };
        if let Err(e) = server::start_api_server(state, shutdown).await {
            failure!("Webserver stopped: {}", e);
        }
    });

    let mut scheduler_stop = stop_rx;
    scheduler
        .run_forever(async move {
            let _ = scheduler_stop.changed().await;
        })
        .await;

    let _ = web.await;
}
