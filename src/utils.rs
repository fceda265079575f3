use std::{collections::HashSet, time::Duration};

use chrono::{DateTime, Utc};
use rand::{Rng, distr::Alphanumeric};

/// Maximum number of URIs Spotify accepts in one add or remove request.
pub const BATCH_SIZE: usize = 100;

/// Page size used when reading the liked-songs collection.
pub const LIKED_PAGE_SIZE: u32 = 50;

/// Wait applied when a 429 carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Random alphanumeric nonce for the OAuth `state` parameter.
pub fn generate_state(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

pub fn track_uri(track_id: &str) -> String {
    format!("spotify:track:{track_id}")
}

/// Parses a `Retry-After` value given in whole seconds.
pub fn parse_retry_after(value: Option<&str>) -> Duration {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

/// Drops repeated entries, keeping the first occurrence of each.
pub fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Whether a user last run at `last_run` may run again at `now`.
pub fn is_due(last_run: Option<DateTime<Utc>>, now: DateTime<Utc>, min_spacing: Duration) -> bool {
    let Some(last_run) = last_run else {
        return true;
    };

    match (now - last_run).to_std() {
        Ok(elapsed) => elapsed >= min_spacing,
        // last run lies in the future (clock skew): not due
        Err(_) => false,
    }
}

/// Whether there is room for an out-of-band sync before the next scheduled cycle.
pub fn leaves_room_before(
    next_run: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    buffer: Duration,
) -> bool {
    let Some(next_run) = next_run else {
        return true;
    };

    match (next_run - now).to_std() {
        Ok(remaining) => remaining > buffer,
        Err(_) => false,
    }
}
