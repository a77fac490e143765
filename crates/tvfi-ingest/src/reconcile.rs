//! Orphan reconciliation: delete artifact blobs no receipt points at.
//!
//! The blob listing is taken first and the valid set second, so an artifact
//! written between the two phases is still protected once its receipt is
//! attached. Blobs modified within the grace window before the snapshot are
//! left alone regardless, since their receipt update may still be in flight.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};
use tvfi_core::{
  blob::{BlobObject, BlobStore},
  cid::ContentId,
  store::FrontierStore,
};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
  /// Page size for both the blob listing and the valid-id query.
  pub page_size:    usize,
  /// Keys per delete request.
  pub delete_batch: usize,
  pub grace:        Duration,
  /// Classify only; delete nothing.
  pub dry_run:      bool,
}

impl Default for ReconcileOptions {
  fn default() -> Self {
    Self {
      page_size:    1000,
      delete_batch: 100,
      grace:        Duration::seconds(300),
      dry_run:      false,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
  /// Distinct valid content ids.
  pub valid:    usize,
  /// Blob keys listed.
  pub scanned:  usize,
  /// Artifact blobs with no valid content id.
  pub orphans:  usize,
  pub deleted:  usize,
  /// Orphans left alone because they are inside the grace window.
  pub deferred: usize,
}

/// Every content id referenced by a receipt with a non-empty source.
pub async fn valid_cid_set<S: FrontierStore>(
  store: &S,
  page_size: usize,
) -> Result<HashSet<ContentId>> {
  let mut valid = HashSet::new();
  let mut after: Option<ContentId> = None;
  loop {
    let page = store
      .valid_cids(after.as_ref(), page_size)
      .await
      .map_err(Error::store(
        "valid_cids",
        after.as_ref().map_or("start".to_owned(), ContentId::to_string),
      ))?;
    let len = page.len();
    after = page.last().cloned();
    valid.extend(page);
    if len < page_size {
      break;
    }
  }
  Ok(valid)
}

/// Every object in the blob store, paging until a short page.
pub async fn list_all_blobs<B: BlobStore>(
  blobs: &B,
  page_size: usize,
) -> Result<Vec<BlobObject>> {
  let mut objects = Vec::new();
  loop {
    let offset = objects.len();
    let page = blobs
      .list("", offset, page_size)
      .await
      .map_err(Error::blob("list", format!("offset {offset}")))?;
    let len = page.len();
    objects.extend(page);
    if len < page_size {
      break;
    }
  }
  Ok(objects)
}

pub async fn reconcile_orphans<S, B>(
  store: &S,
  blobs: &B,
  opts: ReconcileOptions,
) -> Result<ReconcileReport>
where
  S: FrontierStore,
  B: BlobStore,
{
  if opts.page_size == 0 || opts.delete_batch == 0 {
    return Err(Error::Misconfigured(
      "reconcile page size and delete batch must be positive".into(),
    ));
  }

  let objects = list_all_blobs(blobs, opts.page_size).await?;
  let snapshot = Utc::now();
  let cutoff = snapshot.checked_sub_signed(opts.grace).ok_or_else(|| {
    Error::Misconfigured(format!("reconcile grace of {} is out of range", opts.grace))
  })?;
  let valid = valid_cid_set(store, opts.page_size).await?;

  let mut report = ReconcileReport {
    valid: valid.len(),
    scanned: objects.len(),
    ..Default::default()
  };
  let mut orphans = Vec::new();
  for object in objects {
    let Some(cid) = ContentId::from_storage_key(&object.key) else {
      continue;
    };
    if valid.contains(&cid) {
      continue;
    }
    report.orphans += 1;
    if object.last_modified.is_some_and(|t| t > cutoff) {
      debug!(key = %object.key, "orphan inside grace window; deferring");
      report.deferred += 1;
      continue;
    }
    orphans.push(object.key);
  }

  if opts.dry_run {
    info!(orphans = orphans.len(), "dry run; nothing deleted");
  } else {
    for chunk in orphans.chunks(opts.delete_batch) {
      report.deleted += blobs
        .delete(chunk.to_vec())
        .await
        .map_err(Error::blob("delete", format!("{} keys from {}", chunk.len(), chunk[0])))?;
    }
  }

  info!(
    valid = report.valid,
    scanned = report.scanned,
    orphans = report.orphans,
    deleted = report.deleted,
    deferred = report.deferred,
    "reconcile complete"
  );
  Ok(report)
}
