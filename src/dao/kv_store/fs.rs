use std::{io::ErrorKind, path::PathBuf};

use futures::future::BoxFuture;
use tokio::fs;

use crate::dao::{
    kv_store::KeyValueStore,
    storage::{StorageError, StorageResult},
};

/// Key-value cache persisted as one file per key under a directory.
///
/// Survives process restarts so the app can come back up with the last known
/// player identity and results while the remote store is unreachable.
#[derive(Debug, Clone)]
pub struct FsKeyValueStore {
    dir: PathBuf,
}

impl FsKeyValueStore {
    /// Open the cache directory, creating it if missing.
    pub async fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|source| {
            StorageError::unavailable(format!("creating cache dir `{}`", dir.display()), source)
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys like `@game_player` are not filesystem-friendly as-is.
        let sanitized: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.dir.join(format!("{sanitized}.json"))
    }
}

impl KeyValueStore for FsKeyValueStore {
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let path = self.path_for(key);
        let key = key.to_owned();
        Box::pin(async move {
            match fs::read_to_string(&path).await {
                Ok(contents) => Ok(Some(contents)),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
                Err(source) => Err(StorageError::unavailable(
                    format!("reading cache key `{key}`"),
                    source,
                )),
            }
        })
    }

    fn put(&self, key: &str, value: String) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.path_for(key);
        let key = key.to_owned();
        Box::pin(async move {
            fs::write(&path, value).await.map_err(|source| {
                StorageError::unavailable(format!("writing cache key `{key}`"), source)
            })
        })
    }

    fn remove(&self, key: &str) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.path_for(key);
        let key = key.to_owned();
        Box::pin(async move {
            match fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
                Err(source) => Err(StorageError::unavailable(
                    format!("removing cache key `{key}`"),
                    source,
                )),
            }
        })
    }
}
