use tabled::{Table, Tabled};

use super::{load_config, open_store};
use crate::{sync::SyncScheduler, types::SyncOutcome, warning};

#[derive(Tabled)]
struct OutcomeRow {
    user: String,
    success: bool,
    reason: String,
}

impl From<SyncOutcome> for OutcomeRow {
    fn from(outcome: SyncOutcome) -> Self {
        Self {
            user: outcome.user_id,
            success: outcome.success,
            reason: outcome.reason.to_string(),
        }
    }
}

/// Runs one cycle now, or syncs a single user when `user` is given.
pub async fn sync(user: Option<String>) {
    let config = load_config();
    let store = open_store(&config).await;
    let scheduler = SyncScheduler::from_config(&config, store);

    let outcomes = match user {
        Some(id) => match scheduler.sync_user_now(&id).await {
            Some(outcome) => vec![outcome],
            None => {
                warning!("Nothing synced for user {}", id);
                return;
            }
        },
        None => scheduler.run_cycle().await.outcomes,
    };

    if !outcomes.is_empty() {
        let rows: Vec<OutcomeRow> = outcomes.into_iter().map(OutcomeRow::from).collect();
        println!("{}", Table::new(rows));
    }
}
