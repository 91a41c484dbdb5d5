pub mod game;
pub mod reconcile;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    dao::{game_store::GameDocStore, kv_store::KeyValueStore, models::GameDocument},
    state::{game::GameAggregate, reconcile::reconcile},
};

pub use self::game::SessionPhase;

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

/// Central application state owning the in-memory game view and the storage
/// handles.
///
/// All mutation funnels through the single aggregate lock; awaited store
/// calls are the only suspension points, so the local view can briefly run
/// ahead of the remote document between a mutation and its echo.
pub struct AppState {
    kv_store: Arc<dyn KeyValueStore>,
    game_store: RwLock<Option<Arc<dyn GameDocStore>>>,
    game: RwLock<GameAggregate>,
    view: watch::Sender<GameAggregate>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be
    /// cloned cheaply.
    ///
    /// The session starts in degraded mode until a remote store is
    /// installed by the sync supervisor.
    pub fn new(kv_store: Arc<dyn KeyValueStore>) -> SharedState {
        let aggregate = GameAggregate::default();
        let (view_tx, _rx) = watch::channel(aggregate.clone());
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            kv_store,
            game_store: RwLock::new(None),
            game: RwLock::new(aggregate),
            view: view_tx,
            degraded: degraded_tx,
        })
    }

    /// Handle to the on-device cache.
    pub fn kv_store(&self) -> Arc<dyn KeyValueStore> {
        self.kv_store.clone()
    }

    /// Obtain a handle to the current remote store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameDocStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Install a remote store implementation and leave degraded mode.
    pub async fn install_game_store(&self, store: Arc<dyn GameDocStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.set_degraded(false);
    }

    /// Remove the current remote store and enter degraded mode.
    pub async fn clear_game_store(&self) {
        {
            let mut guard = self.game_store.write().await;
            guard.take();
        }
        self.set_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn set_degraded(&self, value: bool) {
        if self.is_degraded() == value {
            return;
        }
        let _ = self.degraded.send(value);
    }

    /// Subscribe to the evolving game view; fires after every applied
    /// mutation or reconciled snapshot.
    pub fn view_watcher(&self) -> watch::Receiver<GameAggregate> {
        self.view.subscribe()
    }

    /// Clone of the current aggregate.
    pub async fn snapshot_view(&self) -> GameAggregate {
        self.game.read().await.clone()
    }

    /// Apply a mutation to the aggregate and broadcast the updated view.
    pub async fn update_game<F, T>(&self, mutate: F) -> T
    where
        F: FnOnce(&mut GameAggregate) -> T,
    {
        let mut guard = self.game.write().await;
        let outcome = mutate(&mut guard);
        let _ = self.view.send(guard.clone());
        outcome
    }

    /// Reconcile an inbound snapshot into the aggregate, latest wins.
    pub async fn apply_snapshot(&self, snapshot: &GameDocument) {
        let mut guard = self.game.write().await;
        *guard = reconcile(guard.clone(), snapshot);
        let _ = self.view.send(guard.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::{kv_store::MemoryKeyValueStore, models::MatchStatus};

    #[tokio::test]
    async fn applied_snapshots_reach_view_watchers() {
        let state = AppState::new(Arc::new(MemoryKeyValueStore::new()));
        let mut watcher = state.view_watcher();

        state
            .apply_snapshot(&GameDocument {
                status: Some(MatchStatus::Active),
                ..GameDocument::default()
            })
            .await;

        watcher.changed().await.unwrap();
        assert_eq!(watcher.borrow().status, MatchStatus::Active);
        assert_eq!(state.snapshot_view().await.phase, SessionPhase::Synced);
    }

    #[tokio::test]
    async fn degraded_flag_follows_store_installation() {
        let state = AppState::new(Arc::new(MemoryKeyValueStore::new()));
        assert!(state.is_degraded());

        let store = Arc::new(crate::dao::game_store::MemoryGameStore::default());
        state.install_game_store(store).await;
        assert!(!state.is_degraded());

        state.clear_game_store().await;
        assert!(state.is_degraded());
    }
}
