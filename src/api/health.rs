use std::sync::Arc;

use axum::{Extension, response::Json};
use serde_json::{Value, json};

use super::AppState;

pub async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let next_run = state.scheduler.next_run().await.map(|t| t.to_rfc3339());

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "next_run": next_run,
    }))
}
