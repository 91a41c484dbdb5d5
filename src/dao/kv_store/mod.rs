mod fs;
mod memory;

use futures::future::BoxFuture;

use crate::dao::storage::StorageResult;

pub use self::fs::FsKeyValueStore;
pub use self::memory::MemoryKeyValueStore;

/// Key holding the registered player identity blob.
pub const PLAYER_KEY: &str = "@game_player";
/// Key holding the locally cached scan results sequence.
pub const RESULTS_KEY: &str = "@game_results";
/// Legacy game-started flag; cleared on reset, never read back.
pub const GAME_STARTED_KEY: &str = "@game_started";

/// Abstraction over the on-device key-value cache.
///
/// Values are JSON-encoded strings keyed by the fixed names above. The cache
/// is a single-device best-effort fallback; every failure maps to
/// [`crate::dao::storage::StorageError`] and callers decide whether to
/// surface or swallow it.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<String>>>;
    fn put(&self, key: &str, value: String) -> BoxFuture<'static, StorageResult<()>>;
    fn remove(&self, key: &str) -> BoxFuture<'static, StorageResult<()>>;
}
