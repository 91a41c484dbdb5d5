use std::sync::Arc;

use futures::{StreamExt, future::BoxFuture, stream::BoxStream};
use tokio::sync::{RwLock, broadcast};
use tokio_stream::wrappers::BroadcastStream;

use crate::dao::{
    game_store::GameDocStore,
    models::{GameDocument, GamePatch},
    storage::StorageResult,
};

/// In-process game-document store.
///
/// Holds the single shared document in memory and echoes every committed
/// write to all subscribers through a broadcast channel, in commit order.
/// Backs the test suites and degraded single-device sessions.
#[derive(Clone)]
pub struct MemoryGameStore {
    doc: Arc<RwLock<Option<GameDocument>>>,
    tx: broadcast::Sender<GameDocument>,
}

impl MemoryGameStore {
    /// Create an empty store with the given echo-channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self {
            doc: Arc::new(RwLock::new(None)),
            tx,
        }
    }

    /// Replace the whole document and notify subscribers.
    ///
    /// Stands in for the operator surface and for foreign devices in tests.
    pub async fn put_document(&self, document: GameDocument) {
        {
            let mut slot = self.doc.write().await;
            *slot = Some(document.clone());
        }
        let _ = self.tx.send(document);
    }
}

impl Default for MemoryGameStore {
    fn default() -> Self {
        Self::new(16)
    }
}

impl GameDocStore for MemoryGameStore {
    fn fetch(&self) -> BoxFuture<'static, StorageResult<Option<GameDocument>>> {
        let doc = self.doc.clone();
        Box::pin(async move { Ok(doc.read().await.clone()) })
    }

    fn merge_write(&self, patch: GamePatch) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let committed = {
                let mut slot = store.doc.write().await;
                let doc = slot.get_or_insert_with(GameDocument::default);
                patch.apply_to(doc);
                doc.clone()
            };
            let _ = store.tx.send(committed);
            Ok(())
        })
    }

    fn subscribe(&self) -> BoxStream<'static, GameDocument> {
        // Lagged receivers skip ahead; only the latest snapshot matters.
        BroadcastStream::new(self.tx.subscribe())
            .filter_map(|delivery| async move { delivery.ok() })
            .boxed()
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
