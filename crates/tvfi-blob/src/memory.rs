//! [`MemoryBlobStore`]: a map-backed store for tests.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tvfi_core::blob::{BlobObject, BlobStore};

use crate::{Error, Result, check_batch, check_key};

#[derive(Debug, Clone)]
struct MemoryObject {
  bytes:        Vec<u8>,
  content_type: String,
  modified:     DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
  objects: RwLock<BTreeMap<String, MemoryObject>>,
}

impl MemoryBlobStore {
  pub fn new() -> Self { Self::default() }

  /// Every stored key, in order.
  pub async fn keys(&self) -> Vec<String> {
    self.objects.read().await.keys().cloned().collect()
  }

  pub async fn content_type(&self, key: &str) -> Option<String> {
    self
      .objects
      .read()
      .await
      .get(key)
      .map(|o| o.content_type.clone())
  }

  /// Override an object's modification time. Returns `false` if the key is
  /// absent.
  pub async fn set_modified(&self, key: &str, at: DateTime<Utc>) -> bool {
    match self.objects.write().await.get_mut(key) {
      Some(o) => {
        o.modified = at;
        true
      }
      None => false,
    }
  }
}

impl BlobStore for MemoryBlobStore {
  type Error = Error;

  async fn put(
    &self,
    key: &str,
    bytes: Vec<u8>,
    content_type: &str,
    overwrite: bool,
  ) -> Result<()> {
    check_key(key)?;
    let mut objects = self.objects.write().await;
    if !overwrite && objects.contains_key(key) {
      return Err(Error::AlreadyExists(key.to_owned()));
    }
    objects.insert(key.to_owned(), MemoryObject {
      bytes,
      content_type: content_type.to_owned(),
      modified: Utc::now(),
    });
    Ok(())
  }

  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
    check_key(key)?;
    Ok(self.objects.read().await.get(key).map(|o| o.bytes.clone()))
  }

  async fn list(
    &self,
    prefix: &str,
    offset: usize,
    limit: usize,
  ) -> Result<Vec<BlobObject>> {
    let objects = self.objects.read().await;
    Ok(
      objects
        .range(prefix.to_owned()..)
        .take_while(|(k, _)| k.starts_with(prefix))
        .skip(offset)
        .take(limit)
        .map(|(k, o)| BlobObject {
          key:           k.clone(),
          size:          o.bytes.len() as u64,
          last_modified: Some(o.modified),
        })
        .collect(),
    )
  }

  async fn delete(&self, keys: Vec<String>) -> Result<usize> {
    check_batch(keys.len())?;
    let mut objects = self.objects.write().await;
    Ok(keys.iter().filter(|k| objects.remove(k.as_str()).is_some()).count())
  }
}
