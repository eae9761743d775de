//! File-backed store: one JSON file per record.
//!
//! Layout is `<root>/<collection>/<id>.json`. Every write goes to a synced
//! sibling temp file first, so readers only ever see a complete record.
//! Create publishes the temp file with a hard link, which fails if the id is
//! taken, so two racing creates cannot both succeed. Update renames the temp
//! file over an existing record and never creates one.

use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::{Collection, KvStore, StoreError, StoreResult, validate_key};

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) the store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a collection directory cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        for collection in Collection::ALL {
            fs::create_dir_all(root.join(collection.as_str())).await?;
        }
        debug!(root = %root.display(), "file store opened");
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, collection: Collection, id: &str) -> StoreResult<PathBuf> {
        validate_key(id)?;
        Ok(self.root.join(collection.as_str()).join(format!("{id}.json")))
    }
}

fn not_found(collection: Collection, id: &str) -> StoreError {
    StoreError::NotFound { collection, id: id.to_owned() }
}

/// Write `bytes` to a fresh sibling of `target` and flush it to disk.
async fn write_temp(target: &Path, bytes: &[u8]) -> StoreResult<PathBuf> {
    let mut name = target.file_name().map(OsStr::to_os_string).unwrap_or_default();
    name.push(format!(".tmp-{:016x}", rand::random::<u64>()));
    let tmp = target.with_file_name(name);

    let written = async {
        let mut file = OpenOptions::new().write(true).create_new(true).open(&tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await
    }
    .await;
    if let Err(e) = written {
        discard(&tmp).await;
        return Err(e.into());
    }
    Ok(tmp)
}

async fn discard(tmp: &Path) {
    if let Err(e) = fs::remove_file(tmp).await {
        warn!(path = %tmp.display(), error = %e, "failed to remove temp record file");
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn create(&self, collection: Collection, id: &str, record: serde_json::Value) -> StoreResult<()> {
        let path = self.record_path(collection, id)?;
        let tmp = write_temp(&path, &serde_json::to_vec(&record)?).await?;

        // hard_link publishes the finished file and fails if the name is taken.
        let linked = fs::hard_link(&tmp, &path).await;
        discard(&tmp).await;
        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StoreError::AlreadyExists { collection, id: id.to_owned() })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn read(&self, collection: Collection, id: &str) -> StoreResult<serde_json::Value> {
        let path = self.record_path(collection, id)?;
        let bytes = match fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found(collection, id)),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn update(&self, collection: Collection, id: &str, record: serde_json::Value) -> StoreResult<()> {
        let path = self.record_path(collection, id)?;
        // Callers hold the record lock, so the record cannot vanish between
        // this check and the rename.
        if !fs::try_exists(&path).await? {
            return Err(not_found(collection, id));
        }

        let tmp = write_temp(&path, &serde_json::to_vec(&record)?).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            discard(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()> {
        let path = self.record_path(collection, id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found(collection, id)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "file_test.rs"]
mod tests;
