//! The ingestion orchestrator.
//!
//! Each row runs the same idempotent sequence:
//!
//! 1. validate and canonicalise ([`IngestRow::from_raw`]); invalid rows are
//!    skipped
//! 2. upsert the receipt by identity hash
//! 3. build the artifact and derive its content id
//! 4. write `<cid>.json` to the blob store (overwrite)
//! 5. upsert the analysis index row
//! 6. attach the content id and scores to the receipt
//!
//! A failure in steps 2–6 fails that row only. After all rows, entities are
//! resolved and linked in one batch; a resolver failure fails the batch.

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};
use tvfi_core::{
  artifact::Artifact,
  blob::BlobStore,
  cid::{CidScheme, ContentId},
  row::{IngestRow, RawRow},
  score::Scorer,
  slug::EntityMention,
  store::FrontierStore,
};

use crate::{
  Error, Result,
  linker::{ReceiptMentions, link_entities},
  resolver::resolve_entities,
};

pub const ARTIFACT_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
  pub cid_scheme:         CidScheme,
  /// Visibility of newly inserted receipts.
  pub visible_by_default: bool,
}

impl Default for IngestOptions {
  fn default() -> Self {
    Self {
      cid_scheme:         CidScheme::default(),
      visible_by_default: true,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
  pub succeeded:         usize,
  pub failed:            usize,
  /// Rows rejected by validation.
  pub skipped:           usize,
  /// Distinct entities upserted or confirmed.
  pub entities_upserted: usize,
  /// Entity–receipt links created or confirmed.
  pub links:             usize,
}

/// Run a batch of raw rows through the pipeline.
pub async fn ingest_batch<S, B>(
  store: &S,
  blobs: &B,
  scorer: &dyn Scorer,
  rows: &[RawRow],
  opts: IngestOptions,
) -> Result<IngestReport>
where
  S: FrontierStore,
  B: BlobStore,
{
  let mut report = IngestReport::default();
  let mut mentions: Vec<EntityMention> = Vec::new();
  let mut per_receipt: Vec<ReceiptMentions> = Vec::new();

  for (i, raw) in rows.iter().enumerate() {
    let row = match IngestRow::from_raw(raw) {
      Ok(row) => row,
      Err(e) => {
        warn!(row = i + 1, title = IngestRow::raw_title(raw), error = %e, "skipping row");
        report.skipped += 1;
        continue;
      }
    };

    match ingest_row(store, blobs, scorer, &row, opts).await {
      Ok(cid) => {
        info!(title = %row.title, %cid, "ingested row");
        report.succeeded += 1;
      }
      Err(e) => {
        error!(title = %row.title, error = %e, "row failed");
        report.failed += 1;
      }
    }

    per_receipt.push(ReceiptMentions {
      hash:  row.identity_hash(),
      slugs: row.mentions.iter().map(|m| m.slug.clone()).collect(),
    });
    mentions.extend(row.mentions);
  }

  if !mentions.is_empty() {
    let ids = resolve_entities(store, &mentions).await?;
    report.entities_upserted = ids.len();
    report.links = link_entities(store, &ids, &per_receipt).await?;
  }

  info!(
    succeeded = report.succeeded,
    failed = report.failed,
    skipped = report.skipped,
    entities = report.entities_upserted,
    links = report.links,
    "ingest complete"
  );
  Ok(report)
}

/// Write one validated row. Returns the content id of its artifact.
pub async fn ingest_row<S, B>(
  store: &S,
  blobs: &B,
  scorer: &dyn Scorer,
  row: &IngestRow,
  opts: IngestOptions,
) -> Result<ContentId>
where
  S: FrontierStore,
  B: BlobStore,
{
  let hash = row.identity_hash();
  store
    .upsert_receipt(row.to_new_receipt(opts.visible_by_default))
    .await
    .map_err(Error::store("upsert_receipt", &hash))?;

  let artifact = Artifact::build(row, scorer, Utc::now());
  let cid = artifact.content_id(opts.cid_scheme)?;
  let stored = artifact.decorate(cid.clone(), hash.clone());

  blobs
    .put(&stored.storage_path, stored.to_bytes()?, ARTIFACT_CONTENT_TYPE, true)
    .await
    .map_err(Error::blob("put", &stored.storage_path))?;

  store
    .upsert_analysis(stored.analysis())
    .await
    .map_err(Error::store("upsert_analysis", cid.as_str()))?;

  let scores = scorer.scores(&row.technical, &row.market);
  store
    .attach_analysis(&hash, &cid, scores)
    .await
    .map_err(Error::store("attach_analysis", &hash))?;

  Ok(cid)
}
