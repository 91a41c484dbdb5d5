//! End-to-end flows across several devices sharing one game document.

use std::{sync::Arc, time::Duration};

use qr_hunt_client::dao::game_store::MemoryGameStore;
use qr_hunt_client::dao::kv_store::MemoryKeyValueStore;
use qr_hunt_client::dao::models::{GameDocument, MatchStatus, Team};
use qr_hunt_client::dto::register::RegisterRequest;
use qr_hunt_client::error::ServiceError;
use qr_hunt_client::services::{game_service, sync_service};
use qr_hunt_client::state::{AppState, SharedState, game::GameAggregate};

const SHARED_ID: &str = "11111111-1111-1111-1111-111111111111";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn payload(category: &str, id: &str) -> String {
    format!("GameQrcodeFach:{category}:{id}")
}

/// Bring up one simulated device: fresh cache, local load, subscription pump.
async fn device(store: &Arc<MemoryGameStore>) -> SharedState {
    let state = AppState::new(Arc::new(MemoryKeyValueStore::new()));
    game_service::load_local(&state).await;
    sync_service::spawn(state.clone(), store.clone());
    state
}

/// Wait until the device's view satisfies `predicate`, returning it.
async fn wait_until<F>(state: &SharedState, mut predicate: F) -> GameAggregate
where
    F: FnMut(&GameAggregate) -> bool,
{
    let mut watcher = state.view_watcher();
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            {
                let view = watcher.borrow_and_update().clone();
                if predicate(&view) {
                    return view;
                }
            }
            watcher.changed().await.expect("view channel closed");
        }
    })
    .await
    .expect("condition not reached in time")
}

#[tokio::test]
async fn same_team_duplicates_rejected_cross_team_accepted() {
    init_tracing();
    let store = Arc::new(MemoryGameStore::default());

    let ana = device(&store).await;
    let bia = device(&store).await;
    let caio = device(&store).await;

    game_service::register_player(&ana, RegisterRequest::new("Ana", Some(Team::Blue)))
        .await
        .unwrap();
    game_service::register_player(&bia, RegisterRequest::new("Bia", Some(Team::Blue)))
        .await
        .unwrap();
    game_service::register_player(&caio, RegisterRequest::new("Caio", Some(Team::Red)))
        .await
        .unwrap();

    // Ana scores the shared code for blue.
    game_service::record_scan(&ana, &payload("verde", SHARED_ID))
        .await
        .unwrap();
    wait_until(&ana, |view| view.teams.blue.score == 1).await;

    // Bia's device learns about the scan through the echo, then rejects the
    // duplicate for the same team.
    wait_until(&bia, |view| !view.results.is_empty()).await;
    let duplicate = game_service::record_scan(&bia, &payload("verde", SHARED_ID)).await;
    assert!(matches!(duplicate, Err(ServiceError::DuplicateScan { .. })));
    let view = bia.snapshot_view().await;
    assert_eq!(view.teams.blue.score, 1);

    // The other team may still score the same physical code once.
    wait_until(&caio, |view| !view.results.is_empty()).await;
    game_service::record_scan(&caio, &payload("verde", SHARED_ID))
        .await
        .unwrap();
    let settled = wait_until(&ana, |view| view.teams.red.score == 1).await;
    assert_eq!(settled.teams.blue.score, 1);
    assert_eq!(settled.results.len(), 2);
}

#[tokio::test]
async fn scores_accumulate_per_category() {
    let store = Arc::new(MemoryGameStore::default());
    let ana = device(&store).await;

    game_service::register_player(&ana, RegisterRequest::new("Ana", Some(Team::Blue)))
        .await
        .unwrap();

    for (category, id) in [
        ("verde", "11111111-1111-1111-1111-111111111111"),
        ("laranja", "22222222-2222-2222-2222-222222222222"),
        ("vermelho", "33333333-3333-3333-3333-333333333333"),
    ] {
        game_service::record_scan(&ana, &payload(category, id))
            .await
            .unwrap();
    }

    let view = wait_until(&ana, |view| view.teams.blue.score == 9).await;
    assert_eq!(view.total_score(), 9);
    assert_eq!(view.teams.red.score, 0);
}

#[tokio::test]
async fn registration_is_idempotent_and_rosters_merge_across_devices() {
    let store = Arc::new(MemoryGameStore::default());
    let ana = device(&store).await;
    let bia = device(&store).await;

    game_service::register_player(&ana, RegisterRequest::new("Ana", Some(Team::Blue)))
        .await
        .unwrap();
    wait_until(&bia, |view| view.teams.blue.players.contains("Ana")).await;

    game_service::register_player(&bia, RegisterRequest::new("Bia", Some(Team::Blue)))
        .await
        .unwrap();
    // re-registration under the same name is a no-op insert
    game_service::register_player(&ana, RegisterRequest::new("Ana", Some(Team::Blue)))
        .await
        .unwrap();

    let view = wait_until(&ana, |view| view.teams.blue.players.len() == 2).await;
    assert_eq!(
        view.teams.blue.players.iter().collect::<Vec<_>>(),
        ["Ana", "Bia"]
    );
}

#[tokio::test]
async fn malformed_payload_changes_nothing_and_scanning_stays_usable() {
    let store = Arc::new(MemoryGameStore::default());
    let ana = device(&store).await;

    game_service::register_player(&ana, RegisterRequest::new("Ana", Some(Team::Blue)))
        .await
        .unwrap();

    let rejected = game_service::record_scan(&ana, "garbage").await;
    assert!(matches!(rejected, Err(ServiceError::InvalidPayload(_))));
    assert!(ana.snapshot_view().await.results.is_empty());

    // a valid scan right after goes through
    game_service::record_scan(&ana, &payload("verde", SHARED_ID))
        .await
        .unwrap();
    wait_until(&ana, |view| view.teams.blue.score == 1).await;
}

#[tokio::test]
async fn clear_all_leaves_the_opposing_team_untouched() {
    let store = Arc::new(MemoryGameStore::default());
    let ana = device(&store).await;
    let caio = device(&store).await;

    game_service::register_player(&ana, RegisterRequest::new("Ana", Some(Team::Blue)))
        .await
        .unwrap();
    game_service::register_player(&caio, RegisterRequest::new("Caio", Some(Team::Red)))
        .await
        .unwrap();
    game_service::record_scan(&caio, &payload("vermelho", SHARED_ID))
        .await
        .unwrap();
    wait_until(&ana, |view| view.teams.red.score == 5).await;

    game_service::clear_all(&ana).await;

    let view = ana.snapshot_view().await;
    assert_eq!(view.player, None);
    assert_eq!(view.status, MatchStatus::Waiting);

    // the reset marker cleared the shared results but not the red roster
    let settled = wait_until(&caio, |view| view.results.is_empty()).await;
    assert!(settled.teams.red.players.contains("Caio"));
    assert_eq!(settled.teams.red.score, 5);
}

#[tokio::test]
async fn operator_status_changes_are_observed() {
    let store = Arc::new(MemoryGameStore::default());
    let ana = device(&store).await;

    store
        .put_document(GameDocument {
            status: Some(MatchStatus::Active),
            time_remaining: Some(480),
            ..GameDocument::default()
        })
        .await;

    let view = wait_until(&ana, |view| view.status == MatchStatus::Active).await;
    assert_eq!(view.time_remaining, 480);
}

#[tokio::test]
async fn a_restarted_device_comes_back_from_its_cache() -> anyhow::Result<()> {
    let store = Arc::new(MemoryGameStore::default());
    let cache = Arc::new(MemoryKeyValueStore::new());

    let first = AppState::new(cache.clone());
    sync_service::spawn(first.clone(), store.clone());
    game_service::register_player(&first, RegisterRequest::new("Ana", Some(Team::Blue))).await?;
    game_service::record_scan(&first, &payload("laranja", SHARED_ID)).await?;

    // same cache, no remote store: the offline fallback path
    let restarted = AppState::new(cache);
    game_service::load_local(&restarted).await;

    let view = restarted.snapshot_view().await;
    assert_eq!(view.player.as_ref().unwrap().name, "Ana");
    assert_eq!(view.results.len(), 1);
    assert_eq!(view.results[0].points, 3);
    Ok(())
}
