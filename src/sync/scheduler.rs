use std::{future::Future, sync::Arc};

use chrono::{DateTime, Utc};
use tokio::{
    sync::Mutex,
    time::{MissedTickBehavior, interval, sleep},
};

use super::reconcile::PlaylistReconciler;
use crate::{
    config::{Config, SchedulePolicy},
    failure, info,
    management::{RefreshOutcome, SessionManager, SessionStore},
    spotify::SpotifyClient,
    success,
    types::{CycleSummary, SyncOutcome, SyncReason, UserSession},
    utils, warning,
};

/// Drives reconciliation for every enabled user, one at a time.
///
/// The next scheduled cycle time lives here rather than in a global so the
/// login handler can ask whether an immediate sync for a new user would run
/// into an imminent cycle.
pub struct SyncScheduler {
    sessions: SessionManager,
    reconciler: PlaylistReconciler,
    policy: SchedulePolicy,
    next_run: Mutex<Option<DateTime<Utc>>>,
}

impl SyncScheduler {
    pub fn new(
        sessions: SessionManager,
        reconciler: PlaylistReconciler,
        policy: SchedulePolicy,
    ) -> Self {
        Self {
            sessions,
            reconciler,
            policy,
            next_run: Mutex::new(None),
        }
    }

    pub fn from_config(config: &Config, store: Arc<dyn SessionStore>) -> Self {
        let client = SpotifyClient::new(config);
        Self::new(
            SessionManager::new(client.clone(), Arc::clone(&store)),
            PlaylistReconciler::new(client, store, config.playlist.clone()),
            config.schedule.clone(),
        )
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub async fn next_run(&self) -> Option<DateTime<Utc>> {
        *self.next_run.lock().await
    }

    pub async fn set_next_run(&self, at: DateTime<Utc>) {
        *self.next_run.lock().await = Some(at);
    }

    /// True when more than the configured buffer remains before the next cycle.
    pub async fn can_sync_out_of_band(&self, now: DateTime<Utc>) -> bool {
        utils::leaves_room_before(self.next_run().await, now, self.policy.out_of_band_buffer)
    }

    /// One pass over all enabled users.
    pub async fn run_cycle(&self) -> CycleSummary {
        let started = Utc::now();
        match chrono::Duration::from_std(self.policy.interval) {
            Ok(interval) => self.set_next_run(started + interval).await,
            Err(e) => failure!("Refresh interval is out of range: {}", e),
        }

        let mut summary = CycleSummary::default();

        let users = match self.sessions.store().list_enabled().await {
            Ok(users) => users,
            Err(e) => {
                failure!("Failed to load sessions: {}", e);
                return summary;
            }
        };

        if users.is_empty() {
            info!("No users to sync");
            return summary;
        }

        let last = users.len() - 1;
        for (index, listed) in users.iter().enumerate() {
            // an out-of-band sync may have rotated tokens since the listing
            match self.sessions.store().get(&listed.id).await {
                Ok(Some(user)) if user.enabled => summary.push(self.sync_user(&user).await),
                Ok(_) => info!("User {} was removed or disabled, skipping", listed.id),
                Err(e) => {
                    failure!("Failed to reload session {}: {}", listed.id, e);
                    summary.push(self.sync_user(listed).await);
                }
            }

            if index < last && !self.policy.user_delay.is_zero() {
                info!(
                    "Waiting {} seconds before doing next user...",
                    self.policy.user_delay.as_secs()
                );
                sleep(self.policy.user_delay).await;
            }
        }

        success!(
            "Cycle finished: {}/{} users synced, {} skipped",
            summary.succeeded,
            summary.total,
            summary.skipped
        );
        summary
    }

    /// Refreshes credentials and reconciles one user.
    ///
    /// `last_run` advances whatever the reconciler reports, so a broken
    /// account is retried no sooner than the next spacing window.
    pub async fn sync_user(&self, user: &UserSession) -> SyncOutcome {
        let now = Utc::now();
        if !utils::is_due(user.last_run, now, self.policy.min_spacing) {
            info!("User {} ran recently, skipping", user.id);
            return SyncOutcome::new(&user.id, SyncReason::SkippedTooSoon);
        }

        info!("Starting sync for user \"{}\" ({})...", user.username, user.id);

        let tokens = match self.sessions.refresh(&user.refresh_token).await {
            RefreshOutcome::Refreshed(tokens) => tokens,
            RefreshOutcome::Revoked => {
                warning!("User {} revoked access and was removed", user.id);
                return SyncOutcome::new(&user.id, SyncReason::TokenRevoked);
            }
            RefreshOutcome::Failed(_) => {
                warning!("Skipping user {}, token could not be refreshed", user.id);
                self.sessions.record_run(&user.id, Utc::now()).await;
                return SyncOutcome::new(&user.id, SyncReason::TokenRefreshFailed);
            }
        };

        let outcome = match self.reconciler.reconcile(user, &tokens.access_token).await {
            Ok(report) => {
                success!(
                    "Synced {} songs into playlist {} for user {}",
                    report.added,
                    report.playlist_id,
                    user.id
                );
                SyncOutcome::new(&user.id, SyncReason::Ok)
            }
            Err(e) => {
                failure!("Sync failed for user {}: {}", user.id, e);
                SyncOutcome::new(&user.id, e.reason())
            }
        };

        self.sessions.record_run(&user.id, Utc::now()).await;
        outcome
    }

    /// Syncs a single user outside the periodic cycle.
    pub async fn sync_user_now(&self, user_id: &str) -> Option<SyncOutcome> {
        match self.sessions.store().get(user_id).await {
            Ok(Some(user)) if user.enabled => Some(self.sync_user(&user).await),
            Ok(Some(_)) => {
                info!("User {} is disabled, not syncing", user_id);
                None
            }
            Ok(None) => {
                warning!("No session for user {}", user_id);
                None
            }
            Err(e) => {
                failure!("Failed to load session {}: {}", user_id, e);
                None
            }
        }
    }

    /// Runs a cycle now and then once per interval until `shutdown` resolves.
    pub async fn run_forever<F>(self: Arc<Self>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            "Refresh interval is set to {}ms",
            self.policy.interval.as_millis()
        );

        let mut ticker = interval(self.policy.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Scheduler stopped");
                    return;
                }
                _ = ticker.tick() => {
                    let scheduler = Arc::clone(&self);
                    tokio::spawn(async move {
                        scheduler.run_cycle().await;
                    });
                }
            }
        }
    }
}
