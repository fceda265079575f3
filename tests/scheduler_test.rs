mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use likeify::{
    config,
    management::{MemorySessionStore, SessionStore},
    sync::SyncScheduler,
    types::SyncReason,
};

fn scheduler(base_url: &str, store: Arc<MemorySessionStore>) -> SyncScheduler {
    SyncScheduler::from_config(&common::config(base_url), store)
}

#[tokio::test]
async fn test_user_synced_recently_is_skipped_without_remote_calls() {
    let (fake, base_url) = common::start().await;
    fake.lock().unwrap().add_user("alice", 10);
    let ran = Utc::now() - Duration::minutes(5);
    let store = Arc::new(MemorySessionStore::new(vec![common::session(
        "alice",
        Some("pl-a"),
        Some(ran),
    )]));
    let scheduler = scheduler(&base_url, Arc::clone(&store));

    let summary = scheduler.run_cycle().await;

    assert_eq!(summary.total, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.outcomes[0].reason, SyncReason::SkippedTooSoon);
    assert!(fake.lock().unwrap().log.is_empty());

    let alice = store.get("alice").await.unwrap().unwrap();
    assert_eq!(alice.last_run, Some(ran));
}

#[tokio::test]
async fn test_user_synced_long_ago_proceeds() {
    let (fake, base_url) = common::start().await;
    {
        let mut fake = fake.lock().unwrap();
        fake.add_user("alice", 10);
        fake.add_playlist("pl-a", "alice", Vec::new());
    }
    let ran = Utc::now() - Duration::minutes(25);
    let store = Arc::new(MemorySessionStore::new(vec![common::session(
        "alice",
        Some("pl-a"),
        Some(ran),
    )]));
    let scheduler = scheduler(&base_url, Arc::clone(&store));

    let summary = scheduler.run_cycle().await;

    assert_eq!(summary.succeeded, 1);
    assert!(summary.outcomes[0].success);

    let alice = store.get("alice").await.unwrap().unwrap();
    assert_eq!(alice.access_token, "access-alice");
    assert!(alice.last_run.unwrap() > ran);

    let fake = fake.lock().unwrap();
    assert_eq!(fake.log[0], "POST /api/token");
    assert_eq!(fake.playlists["pl-a"].tracks, fake.liked_uris("alice"));
}

#[tokio::test]
async fn test_revoked_user_is_removed_and_cycle_continues() {
    let (fake, base_url) = common::start().await;
    {
        let mut fake = fake.lock().unwrap();
        fake.add_user("alice", 3);
        fake.add_user("bob", 4);
        fake.revoked.insert("refresh-alice".to_string());
    }
    let store = Arc::new(MemorySessionStore::new(vec![
        common::session("alice", None, None),
        common::session("bob", None, None),
    ]));
    let scheduler = scheduler(&base_url, Arc::clone(&store));

    let summary = scheduler.run_cycle().await;

    assert_eq!(summary.total, 2);
    assert_eq!(summary.outcomes[0].reason, SyncReason::TokenRevoked);
    assert_eq!(summary.outcomes[1].reason, SyncReason::Ok);
    assert!(store.get("alice").await.unwrap().is_none());

    let bob = store.get("bob").await.unwrap().unwrap();
    assert!(bob.playlist_id.is_some());
    assert!(bob.last_run.is_some());
}

#[tokio::test]
async fn test_users_are_synced_one_after_another() {
    let (fake, base_url) = common::start().await;
    {
        let mut fake = fake.lock().unwrap();
        fake.add_user("alice", 0);
        fake.add_user("bob", 250);
    }
    let store = Arc::new(MemorySessionStore::new(vec![
        common::session("alice", None, None),
        common::session("bob", None, None),
    ]));
    let scheduler = scheduler(&base_url, Arc::clone(&store));

    let summary = scheduler.run_cycle().await;

    assert_eq!(summary.succeeded, 2);
    let fake = fake.lock().unwrap();
    assert_eq!(fake.add_batches, vec![100, 100, 50]);
    assert_eq!(fake.created, 2);

    // alice's whole pass precedes bob's token refresh
    let refreshes: Vec<usize> = fake
        .log
        .iter()
        .enumerate()
        .filter(|(_, k)| k.as_str() == "POST /api/token")
        .map(|(i, _)| i)
        .collect();
    assert_eq!(refreshes.len(), 2);
    let first_add = fake
        .log
        .iter()
        .position(|k| k == "POST /playlists/tracks")
        .unwrap();
    assert!(first_add > refreshes[1]);
}

#[tokio::test]
async fn test_disabled_users_are_left_alone() {
    let (fake, base_url) = common::start().await;
    fake.lock().unwrap().add_user("alice", 2);
    let mut alice = common::session("alice", None, None);
    alice.enabled = false;
    let store = Arc::new(MemorySessionStore::new(vec![alice]));
    let scheduler = scheduler(&base_url, Arc::clone(&store));

    let summary = scheduler.run_cycle().await;

    assert_eq!(summary.total, 0);
    assert!(fake.lock().unwrap().log.is_empty());
    assert_eq!(scheduler.sync_user_now("alice").await, None);
}

#[tokio::test]
async fn test_failed_refresh_still_records_the_run() {
    let (fake, base_url) = common::start().await;
    {
        let mut fake = fake.lock().unwrap();
        fake.add_user("alice", 2);
        fake.token_endpoint_down = true;
    }
    let store = Arc::new(MemorySessionStore::new(vec![common::session(
        "alice", None, None,
    )]));
    let scheduler = scheduler(&base_url, Arc::clone(&store));

    let summary = scheduler.run_cycle().await;

    assert_eq!(summary.outcomes[0].reason, SyncReason::TokenRefreshFailed);
    let alice = store.get("alice").await.unwrap().unwrap();
    assert!(alice.last_run.is_some());
    assert_eq!(alice.refresh_token, "refresh-alice");
    assert_eq!(fake.lock().unwrap().count("GET /me/tracks"), 0);
}

#[tokio::test]
async fn test_failed_reconcile_records_the_run() {
    let (fake, base_url) = common::start().await;
    {
        let mut fake = fake.lock().unwrap();
        fake.add_user("alice", 120);
        fake.unauthorized_adds = true;
    }
    let store = Arc::new(MemorySessionStore::new(vec![common::session(
        "alice", None, None,
    )]));
    let scheduler = scheduler(&base_url, Arc::clone(&store));

    let outcome = scheduler.sync_user_now("alice").await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.reason, SyncReason::WriteFailed);
    assert!(store.get("alice").await.unwrap().unwrap().last_run.is_some());

    // a second attempt right away is held back by the spacing guard
    let again = scheduler.sync_user_now("alice").await.unwrap();
    assert_eq!(again.reason, SyncReason::SkippedTooSoon);
}

#[tokio::test]
async fn test_cycle_schedules_the_next_run() {
    let (_fake, base_url) = common::start().await;
    let config = common::config_with(&base_url, &[(config::REFRESH_INTERVAL_MS, "600000")]);
    let scheduler = SyncScheduler::from_config(&config, Arc::new(MemorySessionStore::default()));

    assert_eq!(scheduler.next_run().await, None);
    assert!(scheduler.can_sync_out_of_band(Utc::now()).await);

    let before = Utc::now();
    scheduler.run_cycle().await;
    let next = scheduler.next_run().await.unwrap();

    assert!(next >= before + Duration::minutes(10));
    assert!(next <= Utc::now() + Duration::minutes(10));
    assert!(scheduler.can_sync_out_of_band(Utc::now()).await);

    // one minute before the next cycle there is no room left
    assert!(!scheduler.can_sync_out_of_band(next - Duration::minutes(1)).await);
}

#[tokio::test]
async fn test_run_forever_stops_on_shutdown() {
    let (fake, base_url) = common::start().await;
    fake.lock().unwrap().add_user("alice", 1);
    let store = Arc::new(MemorySessionStore::new(vec![common::session(
        "alice", None, None,
    )]));
    let scheduler = Arc::new(scheduler(&base_url, Arc::clone(&store)));

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let task = tokio::spawn(Arc::clone(&scheduler).run_forever(async move {
        let _ = rx.await;
    }));

    // the first tick fires immediately
    for _ in 0..50 {
        if store.get("alice").await.unwrap().unwrap().last_run.is_some() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    assert!(store.get("alice").await.unwrap().unwrap().last_run.is_some());

    tx.send(()).unwrap();
    tokio::time::timeout(std::time::Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_users_are_paced_but_not_after_the_last_one() {
    // recent runs keep every user off the network, so only pacing takes time
    let ran = Utc::now() - Duration::minutes(1);
    let store = Arc::new(MemorySessionStore::new(vec![
        common::session("alice", None, Some(ran)),
        common::session("bob", None, Some(ran)),
        common::session("carol", None, Some(ran)),
    ]));
    let config = common::config_with("http://127.0.0.1:9", &[(config::USER_DELAY_SECS, "10")]);
    let scheduler = SyncScheduler::from_config(&config, store);

    let started = tokio::time::Instant::now();
    let summary = scheduler.run_cycle().await;
    let elapsed = started.elapsed();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.skipped, 3);
    assert!(elapsed >= std::time::Duration::from_secs(20), "{elapsed:?}");
    assert!(elapsed < std::time::Duration::from_secs(30), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_single_user_cycle_does_not_wait() {
    let ran = Utc::now() - Duration::minutes(1);
    let store = Arc::new(MemorySessionStore::new(vec![common::session(
        "alice",
        None,
        Some(ran),
    )]));
    let config = common::config_with("http://127.0.0.1:9", &[(config::USER_DELAY_SECS, "10")]);
    let scheduler = SyncScheduler::from_config(&config, store);

    let started = tokio::time::Instant::now();
    scheduler.run_cycle().await;

    assert!(started.elapsed() < std::time::Duration::from_secs(10));
}
