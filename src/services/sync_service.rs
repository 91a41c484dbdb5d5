use std::{future::Future, sync::Arc, time::Duration};

use futures::StreamExt;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{game_store::GameDocStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Drive the remote subscription for the lifetime of the session.
///
/// Connects through `connect`, installs the store, and reconciles every
/// delivered snapshot into the shared state. While pumping, the store is
/// health-polled so the degraded flag tracks reachability; when the stream
/// ends or the connection cannot be established the session falls back to
/// the on-device cache and the connection is retried with capped
/// exponential backoff.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn GameDocStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                info!("remote store connected; leaving degraded mode");
                state.install_game_store(store.clone()).await;
                delay = INITIAL_DELAY;

                pump(&state, store.as_ref()).await;

                warn!("snapshot stream ended; entering degraded mode");
                state.clear_game_store().await;
            }
            Err(err) => {
                warn!(error = %err, "remote store connection attempt failed");
            }
        }

        sleep(delay).await;
        delay = (delay * 2).min(MAX_DELAY);
    }
}

/// Install `store` and pump its snapshots on a background task.
///
/// Used by tests and single-store setups that do not need the reconnect
/// loop of [`run`].
pub fn spawn(state: SharedState, store: Arc<dyn GameDocStore>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        state.install_game_store(store.clone()).await;
        pump(&state, store.as_ref()).await;
        state.clear_game_store().await;
    })
}

/// Apply snapshots in delivery order until the stream ends, health-polling
/// the store in between to keep the degraded flag honest.
async fn pump(state: &SharedState, store: &dyn GameDocStore) {
    let mut snapshots = store.subscribe();
    let mut health = tokio::time::interval(HEALTH_POLL_INTERVAL);

    loop {
        tokio::select! {
            snapshot = snapshots.next() => {
                match snapshot {
                    Some(snapshot) => state.apply_snapshot(&snapshot).await,
                    None => break,
                }
            }
            _ = health.tick() => {
                match store.health_check().await {
                    Ok(()) => {
                        if state.is_degraded() {
                            info!("remote store healthy again; leaving degraded mode");
                            state.set_degraded(false);
                        }
                    }
                    Err(err) => {
                        if !state.is_degraded() {
                            warn!(error = %err, "remote health check failed; entering degraded mode");
                            state.set_degraded(true);
                        }
                    }
                }
            }
        }
    }
}
