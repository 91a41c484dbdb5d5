use std::sync::Arc;

use serde::de::DeserializeOwned;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{debug, warn};
use validator::Validate;

use crate::{
    dao::{
        kv_store::{GAME_STARTED_KEY, KeyValueStore, PLAYER_KEY, RESULTS_KEY},
        models::{GamePatch, MatchStatus, PlayerEntity, ScanResultEntity},
        storage::StorageError,
    },
    dto::{payload::QrPayload, register::RegisterRequest},
    error::ServiceError,
    state::{
        SharedState,
        game::{Player, ScanResult, SessionPhase},
    },
};

/// Load the on-device fallback state written by a previous session.
///
/// Missing or corrupt blobs are tolerated; completing the load moves the
/// session out of [`SessionPhase::Uninitialized`] either way.
pub async fn load_local(state: &SharedState) {
    let kv = state.kv_store();
    let player = read_cached::<PlayerEntity>(&kv, PLAYER_KEY).await;
    let results = read_cached::<Vec<ScanResultEntity>>(&kv, RESULTS_KEY).await;

    state
        .update_game(|game| {
            if let Some(player) = player {
                game.player = Some(player.into());
            }
            if let Some(results) = results {
                game.results = results.into_iter().map(Into::into).collect();
            }
            game.phase = SessionPhase::Synced;
        })
        .await;
}

/// Register the local player into the chosen team.
///
/// Validation failures block the action; once past validation the identity
/// is applied optimistically and the roster is merged into the shared
/// document via read-merge-write so concurrent registrations on the other
/// team are not clobbered. Re-registering the same name is a no-op insert.
pub async fn register_player(
    state: &SharedState,
    request: RegisterRequest,
) -> Result<Player, ServiceError> {
    let request = request.trimmed();
    request.validate()?;
    let Some(team) = request.team else {
        return Err(ServiceError::InvalidInput("a team must be chosen".into()));
    };

    let player = Player {
        name: request.name,
        team,
        score: 0,
    };

    state
        .update_game(|game| {
            game.player = Some(player.clone());
        })
        .await;

    if let Some(store) = state.game_store().await {
        match store.fetch().await {
            Ok(doc) => {
                let mut teams = doc.and_then(|doc| doc.teams).unwrap_or_default();
                teams.team_mut(team).players.insert(player.name.clone());

                let patch = GamePatch {
                    teams: Some(teams),
                    ..GamePatch::default()
                };
                if let Err(err) = store.merge_write(patch).await {
                    warn!(error = %err, "roster merge-write failed; keeping optimistic identity");
                }
            }
            Err(err) => {
                warn!(error = %err, "roster read failed; skipping roster write");
            }
        }
    } else {
        debug!("no remote store installed; roster write skipped");
    }

    write_cached(state, PLAYER_KEY, &PlayerEntity::from(player.clone())).await;

    Ok(player)
}

/// Score a scanned QR payload for the acting player's team.
///
/// Rejections (malformed payload, duplicate for this team, no registered
/// player) leave the state untouched and scanning usable. An accepted scan
/// is applied optimistically, then merged into the shared document: the
/// full results sequence, the flat scanned-id list, and both teams — the
/// acting team with its recomputed score, the other team passed through
/// unchanged from the last known state.
pub async fn record_scan(state: &SharedState, raw: &str) -> Result<ScanResult, ServiceError> {
    let payload = QrPayload::parse(raw)?;

    let result = state
        .update_game(|game| {
            let Some(player) = game.player.as_ref() else {
                return Err(ServiceError::NotRegistered);
            };
            let team = player.team;

            if game.scanned_by_team(payload.scan_id, team) {
                return Err(ServiceError::DuplicateScan {
                    scan_id: payload.scan_id,
                });
            }

            let result = ScanResult::new(payload.category, payload.scan_id, team, now_rfc3339());
            game.results.push(result.clone());
            let points = game.team_points(team);
            game.teams.team_mut(team).score = points;
            Ok(result)
        })
        .await?;

    let view = state.snapshot_view().await;
    let results: Vec<ScanResultEntity> = view.results.iter().cloned().map(Into::into).collect();
    let patch = GamePatch {
        results: Some(results.clone()),
        scanned_qr_codes: Some(view.scanned_ids()),
        teams: Some(view.teams.clone().into()),
        ..GamePatch::default()
    };
    merge_remote(state, patch).await;
    write_cached(state, RESULTS_KEY, &results).await;

    Ok(result)
}

/// Remove the local player from their team roster and forget the local
/// identity.
pub async fn leave_match(state: &SharedState) -> Result<(), ServiceError> {
    let Some(player) = state.snapshot_view().await.player else {
        return Err(ServiceError::NotRegistered);
    };

    state
        .update_game(|game| {
            game.player = None;
        })
        .await;

    if let Some(store) = state.game_store().await {
        match store.fetch().await {
            Ok(doc) => {
                let mut teams = doc.and_then(|doc| doc.teams).unwrap_or_default();
                teams.team_mut(player.team).players.shift_remove(&player.name);

                let patch = GamePatch {
                    teams: Some(teams),
                    ..GamePatch::default()
                };
                if let Err(err) = store.merge_write(patch).await {
                    warn!(error = %err, "roster removal merge-write failed");
                }
            }
            Err(err) => {
                warn!(error = %err, "roster read failed; skipping roster removal");
            }
        }
    }

    remove_cached(state, PLAYER_KEY).await;
    Ok(())
}

/// Reset the local session and write the best-effort remote reset marker.
///
/// The other team's document data stays untouched; only the legacy
/// `player`/`gameStarted` fields and the shared results are cleared.
pub async fn clear_all(state: &SharedState) {
    state
        .update_game(|game| {
            game.player = None;
            game.results.clear();
            game.status = MatchStatus::Waiting;
            game.phase = SessionPhase::Uninitialized;
        })
        .await;

    for key in [PLAYER_KEY, RESULTS_KEY, GAME_STARTED_KEY] {
        remove_cached(state, key).await;
    }

    let patch = GamePatch {
        player: Some(None),
        results: Some(Vec::new()),
        game_started: Some(false),
        ..GamePatch::default()
    };
    merge_remote(state, patch).await;
}

/// Current RFC-3339 timestamp for a freshly accepted scan.
fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}

/// Best-effort merge-write; failures are logged and the optimistic state
/// is kept.
async fn merge_remote(state: &SharedState, patch: GamePatch) {
    let Some(store) = state.game_store().await else {
        debug!("no remote store installed; merge-write skipped");
        return;
    };
    if let Err(err) = store.merge_write(patch).await {
        warn!(error = %err, "remote merge-write failed; keeping optimistic state");
    }
}

async fn read_cached<T: DeserializeOwned>(kv: &Arc<dyn KeyValueStore>, key: &str) -> Option<T> {
    let raw = match kv.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            warn!(key, error = %err, "failed to read local cache");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            let err = StorageError::corrupt(key, err);
            warn!(error = %err, "ignoring corrupt cache blob");
            None
        }
    }
}

async fn write_cached<T: serde::Serialize>(state: &SharedState, key: &str, value: &T) {
    let blob = match serde_json::to_string(value) {
        Ok(blob) => blob,
        Err(err) => {
            warn!(key, error = %err, "failed to encode cache blob");
            return;
        }
    };
    if let Err(err) = state.kv_store().put(key, blob).await {
        warn!(key, error = %err, "failed to persist local cache");
    }
}

async fn remove_cached(state: &SharedState, key: &str) {
    if let Err(err) = state.kv_store().remove(key).await {
        warn!(key, error = %err, "failed to clear local cache");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::{
            game_store::{GameDocStore, MemoryGameStore},
            kv_store::MemoryKeyValueStore,
            models::Team,
        },
        state::AppState,
    };

    const PAYLOAD_LOW: &str = "GameQrcodeFach:verde:11111111-1111-1111-1111-111111111111";

    fn fresh_state() -> SharedState {
        AppState::new(Arc::new(MemoryKeyValueStore::new()))
    }

    async fn state_with_remote() -> (SharedState, Arc<MemoryGameStore>) {
        let state = fresh_state();
        let store = Arc::new(MemoryGameStore::default());
        state.install_game_store(store.clone()).await;
        (state, store)
    }

    #[tokio::test]
    async fn register_rejects_blank_name_and_missing_team() {
        let state = fresh_state();

        let blank = register_player(&state, RegisterRequest::new("  ", Some(Team::Blue))).await;
        assert!(matches!(blank, Err(ServiceError::InvalidInput(_))));

        let teamless = register_player(&state, RegisterRequest::new("Ana", None)).await;
        assert!(matches!(teamless, Err(ServiceError::InvalidInput(_))));

        assert_eq!(state.snapshot_view().await.player, None);
    }

    #[tokio::test]
    async fn register_merges_into_the_remote_roster() {
        let (state, store) = state_with_remote().await;

        register_player(&state, RegisterRequest::new("Ana", Some(Team::Blue)))
            .await
            .unwrap();

        let doc = store.fetch().await.unwrap().unwrap();
        let teams = doc.teams.unwrap();
        assert!(teams.blue.players.contains("Ana"));
        assert!(teams.red.players.is_empty());
    }

    #[tokio::test]
    async fn register_is_idempotent_per_roster() {
        let (state, store) = state_with_remote().await;

        for _ in 0..2 {
            register_player(&state, RegisterRequest::new("Ana", Some(Team::Blue)))
                .await
                .unwrap();
        }

        let doc = store.fetch().await.unwrap().unwrap();
        assert_eq!(doc.teams.unwrap().blue.players.len(), 1);
    }

    #[tokio::test]
    async fn scan_requires_a_registered_player() {
        let state = fresh_state();
        let outcome = record_scan(&state, PAYLOAD_LOW).await;
        assert!(matches!(outcome, Err(ServiceError::NotRegistered)));
    }

    #[tokio::test]
    async fn scan_rejections_leave_state_untouched() {
        let (state, _store) = state_with_remote().await;
        register_player(&state, RegisterRequest::new("Ana", Some(Team::Blue)))
            .await
            .unwrap();

        let garbage = record_scan(&state, "garbage").await;
        assert!(matches!(garbage, Err(ServiceError::InvalidPayload(_))));
        assert_eq!(state.snapshot_view().await.results.len(), 0);

        record_scan(&state, PAYLOAD_LOW).await.unwrap();
        let duplicate = record_scan(&state, PAYLOAD_LOW).await;
        assert!(matches!(duplicate, Err(ServiceError::DuplicateScan { .. })));

        let view = state.snapshot_view().await;
        assert_eq!(view.results.len(), 1);
        assert_eq!(view.teams.blue.score, 1);
    }

    #[tokio::test]
    async fn accepted_scans_merge_results_ids_and_both_teams() {
        let (state, store) = state_with_remote().await;
        register_player(&state, RegisterRequest::new("Ana", Some(Team::Blue)))
            .await
            .unwrap();

        record_scan(&state, PAYLOAD_LOW).await.unwrap();

        let doc = store.fetch().await.unwrap().unwrap();
        assert_eq!(doc.results.as_ref().unwrap().len(), 1);
        assert_eq!(doc.scanned_qr_codes.as_ref().unwrap().len(), 1);
        let teams = doc.teams.unwrap();
        assert_eq!(teams.blue.score, 1);
        assert_eq!(teams.red.score, 0);
    }

    #[tokio::test]
    async fn clear_all_resets_local_state_and_cache() {
        let (state, store) = state_with_remote().await;
        register_player(&state, RegisterRequest::new("Ana", Some(Team::Blue)))
            .await
            .unwrap();
        record_scan(&state, PAYLOAD_LOW).await.unwrap();

        clear_all(&state).await;

        let view = state.snapshot_view().await;
        assert_eq!(view.player, None);
        assert!(view.results.is_empty());
        assert_eq!(view.phase, SessionPhase::Uninitialized);

        let kv = state.kv_store();
        assert_eq!(kv.get(PLAYER_KEY).await.unwrap(), None);
        assert_eq!(kv.get(RESULTS_KEY).await.unwrap(), None);

        // the reset marker cleared results but left rosters alone
        let doc = store.fetch().await.unwrap().unwrap();
        assert_eq!(doc.results.as_deref(), Some(&[][..]));
        assert!(doc.teams.unwrap().blue.players.contains("Ana"));
    }

    #[tokio::test]
    async fn leave_match_removes_the_roster_entry_and_identity() {
        let (state, store) = state_with_remote().await;
        register_player(&state, RegisterRequest::new("Ana", Some(Team::Blue)))
            .await
            .unwrap();

        leave_match(&state).await.unwrap();

        assert_eq!(state.snapshot_view().await.player, None);
        let doc = store.fetch().await.unwrap().unwrap();
        assert!(doc.teams.unwrap().blue.players.is_empty());
        assert_eq!(state.kv_store().get(PLAYER_KEY).await.unwrap(), None);

        let again = leave_match(&state).await;
        assert!(matches!(again, Err(ServiceError::NotRegistered)));
    }

    #[tokio::test]
    async fn load_local_restores_a_previous_session() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.put(
            PLAYER_KEY,
            r#"{"name":"Ana","team":"blue","score":0}"#.into(),
        )
        .await
        .unwrap();
        kv.put(RESULTS_KEY, "not json at all".into()).await.unwrap();

        let state = AppState::new(kv);
        load_local(&state).await;

        let view = state.snapshot_view().await;
        assert_eq!(view.player.unwrap().name, "Ana");
        // corrupt results blob is ignored rather than fatal
        assert!(view.results.is_empty());
        assert_eq!(view.phase, SessionPhase::Synced);
    }
}
