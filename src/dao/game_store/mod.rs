#[cfg(feature = "couch-store")]
pub mod couchdb;
mod memory;

use futures::{future::BoxFuture, stream::BoxStream};

use crate::dao::{
    models::{GameDocument, GamePatch},
    storage::StorageResult,
};

pub use self::memory::MemoryGameStore;

/// Abstraction over the shared realtime game-document store.
///
/// All connected devices read and write the same single document; writes are
/// partial merges against named top-level fields, reads are full snapshots
/// pushed through [`GameDocStore::subscribe`].
pub trait GameDocStore: Send + Sync {
    /// Current full snapshot of the shared document, `None` before the first
    /// write ever lands.
    fn fetch(&self) -> BoxFuture<'static, StorageResult<Option<GameDocument>>>;

    /// Merge the populated fields of `patch` into the shared document,
    /// leaving every other field untouched.
    fn merge_write(&self, patch: GamePatch) -> BoxFuture<'static, StorageResult<()>>;

    /// Stream of full snapshots, one per committed write, delivered in commit
    /// order. The writer's own writes are echoed back like any other.
    fn subscribe(&self) -> BoxStream<'static, GameDocument>;

    /// Cheap reachability probe used by the sync supervisor.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
