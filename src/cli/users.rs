use tabled::Table;

use super::{load_config, open_store};
use crate::{error, success, types::UserTableRow, warning};

pub async fn list_users() {
    let config = load_config();
    let store = open_store(&config).await;

    let sessions = match store.list().await {
        Ok(sessions) => sessions,
        Err(e) => error!("Cannot read sessions: {}", e),
    };

    if sessions.is_empty() {
        warning!("No users have signed in yet");
        return;
    }

    let rows: Vec<UserTableRow> = sessions
        .into_iter()
        .map(|s| UserTableRow {
            id: s.id,
            username: s.username,
            playlist: s.playlist_id.unwrap_or_else(|| "-".to_string()),
            last_run: s
                .last_run
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "never".to_string()),
            enabled: s.enabled,
        })
        .collect();

    println!("{}", Table::new(rows));
}

pub async fn set_enabled(user_id: &str, enabled: bool) {
    let config = load_config();
    let store = open_store(&config).await;

    match store.set_enabled(user_id, enabled).await {
        Ok(true) if enabled => success!("Enabled syncing for {}", user_id),
        Ok(true) => success!("Disabled syncing for {}", user_id),
        Ok(false) => warning!("No session for user {}", user_id),
        Err(e) => error!("Cannot update session {}: {}", user_id, e),
    }
}
