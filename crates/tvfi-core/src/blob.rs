//! The `BlobStore` trait.
//!
//! Analysis artifacts live in a flat, key-addressed object store. Keys are
//! plain names (`<cid>.json`); there is no directory structure. Backends live
//! in `tvfi-blob`.

use std::future::Future;

use chrono::{DateTime, Utc};

/// One listed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobObject {
  pub key:           String,
  pub size:          u64,
  /// `None` when the backend cannot tell.
  pub last_modified: Option<DateTime<Utc>>,
}

pub trait BlobStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Write `bytes` under `key`. With `overwrite = false` an existing key is
  /// an error.
  fn put<'a>(
    &'a self,
    key: &'a str,
    bytes: Vec<u8>,
    content_type: &'a str,
    overwrite: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Read an object. `None` if the key does not exist.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send + 'a;

  /// One page of objects whose key starts with `prefix`, ordered by key.
  /// A page shorter than `limit` is the last one.
  fn list<'a>(
    &'a self,
    prefix: &'a str,
    offset: usize,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<BlobObject>, Self::Error>> + Send + 'a;

  /// Delete the given keys. Missing keys are not an error. Returns how many
  /// objects were actually removed.
  fn delete(
    &self,
    keys: Vec<String>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}
