//! [`FsBlobStore`]: one file per key under a root directory.

use std::{
  io::ErrorKind,
  path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, info};
use tvfi_core::blob::{BlobObject, BlobStore};

use crate::{Error, Result, check_batch, check_key};

/// A flat directory of blobs. Writes go through a dotfile and a rename, so a
/// reader never sees a partial object; dotfiles are never listed.
///
/// The content type is accepted for interface parity and not persisted.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
  root: PathBuf,
}

impl FsBlobStore {
  /// Open a store rooted at `root`, creating the directory if needed.
  pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
    let root = root.as_ref().to_path_buf();
    fs::create_dir_all(&root)
      .await
      .map_err(Error::io(root.display().to_string()))?;
    info!(path = %root.display(), "opened blob store");
    Ok(Self { root })
  }

  fn path(&self, key: &str) -> Result<PathBuf> {
    check_key(key)?;
    Ok(self.root.join(key))
  }
}

impl BlobStore for FsBlobStore {
  type Error = Error;

  async fn put(
    &self,
    key: &str,
    bytes: Vec<u8>,
    _content_type: &str,
    overwrite: bool,
  ) -> Result<()> {
    let path = self.path(key)?;
    if !overwrite && fs::try_exists(&path).await.map_err(Error::io(key))? {
      return Err(Error::AlreadyExists(key.to_owned()));
    }

    let tmp = self.root.join(format!(".{key}.tmp"));
    fs::write(&tmp, &bytes).await.map_err(Error::io(key))?;
    fs::rename(&tmp, &path).await.map_err(Error::io(key))?;

    debug!(key, size = bytes.len(), "stored blob");
    Ok(())
  }

  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
    let path = self.path(key)?;
    match fs::read(&path).await {
      Ok(bytes) => Ok(Some(bytes)),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(e) => Err(Error::io(key)(e)),
    }
  }

  async fn list(
    &self,
    prefix: &str,
    offset: usize,
    limit: usize,
  ) -> Result<Vec<BlobObject>> {
    let root_key = self.root.display().to_string();
    let mut dir = fs::read_dir(&self.root)
      .await
      .map_err(Error::io(root_key.clone()))?;

    let mut objects = Vec::new();
    while let Some(entry) = dir.next_entry().await.map_err(Error::io(root_key.clone()))? {
      let Ok(key) = entry.file_name().into_string() else {
        continue;
      };
      if key.starts_with('.') || !key.starts_with(prefix) {
        continue;
      }
      let meta = entry.metadata().await.map_err(Error::io(key.clone()))?;
      if !meta.is_file() {
        continue;
      }
      objects.push(BlobObject {
        size:          meta.len(),
        last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
        key,
      });
    }

    objects.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(objects.into_iter().skip(offset).take(limit).collect())
  }

  async fn delete(&self, keys: Vec<String>) -> Result<usize> {
    check_batch(keys.len())?;
    let mut removed = 0;
    for key in &keys {
      let path = self.path(key)?;
      match fs::remove_file(&path).await {
        Ok(()) => removed += 1,
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(Error::io(key.as_str())(e)),
      }
    }
    debug!(requested = keys.len(), removed, "deleted blobs");
    Ok(removed)
  }
}
