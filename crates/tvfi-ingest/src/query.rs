//! Read-side queries over the stores.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::debug;
use tvfi_core::{
  artifact::StoredArtifact,
  blob::BlobStore,
  cid::{CidScheme, ContentId},
  model::{Entity, Frontier, Receipt},
  store::{FrontierStore, ReceiptQuery, StoreStats},
};

use crate::{
  Error, Result,
  lens::{EntityLens, LensView, render},
};

/// Most receipts returned with an entity profile.
pub const ENTITY_RECEIPT_CAP: usize = 200;
/// Newest receipts an entity lens considers.
pub const LENS_RECEIPT_WINDOW: usize = 20;
pub const DEFAULT_FEED_LIMIT: usize = 50;
pub const FEED_LIMIT_CAP: usize = 50;
pub const DEFAULT_PROMOTE_COUNT: usize = 3;
/// Shorter queries return nothing.
pub const SEARCH_MIN_CHARS: usize = 2;
pub const SEARCH_ENTITY_CAP: usize = 5;
pub const SEARCH_RECEIPT_CAP: usize = 8;

// ─── Entities ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct EntityProfile {
  pub entity:   Entity,
  /// Newest first.
  pub receipts: Vec<Receipt>,
}

async fn require_entity<S: FrontierStore>(store: &S, slug: &str) -> Result<Entity> {
  store
    .entity_by_slug(slug)
    .await
    .map_err(Error::store("entity_by_slug", slug))?
    .ok_or_else(|| Error::EntityNotFound(slug.to_owned()))
}

pub async fn entity_profile<S: FrontierStore>(store: &S, slug: &str) -> Result<EntityProfile> {
  let entity = require_entity(store, slug).await?;
  let receipts = store
    .receipts_for_entity(entity.id, ENTITY_RECEIPT_CAP)
    .await
    .map_err(Error::store("receipts_for_entity", slug))?;
  Ok(EntityProfile { entity, receipts })
}

/// Render a named lens over the entity's newest receipts.
pub async fn entity_lens<S: FrontierStore>(
  store: &S,
  lens: &str,
  slug: &str,
) -> Result<LensView> {
  let lens: EntityLens = lens.parse()?;
  let entity = require_entity(store, slug).await?;
  let receipts = store
    .receipts_for_entity(entity.id, LENS_RECEIPT_WINDOW)
    .await
    .map_err(Error::store("receipts_for_entity", slug))?;
  Ok(render(lens, &entity.slug, &receipts))
}

// ─── Analyses ────────────────────────────────────────────────────────────────

async fn analysis_bytes<B: BlobStore>(blobs: &B, cid: &ContentId) -> Result<Vec<u8>> {
  let key = cid.storage_path();
  blobs
    .get(&key)
    .await
    .map_err(Error::blob("get", &key))?
    .ok_or_else(|| Error::AnalysisNotFound(cid.clone()))
}

/// The stored artifact exactly as written, as JSON.
pub async fn fetch_analysis<B: BlobStore>(
  blobs: &B,
  cid: &ContentId,
) -> Result<serde_json::Value> {
  Ok(serde_json::from_slice(&analysis_bytes(blobs, cid).await?)?)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
  pub cid:        ContentId,
  pub recomputed: ContentId,
  pub matches:    bool,
}

/// Re-derive the content id from the stored blob's canonical subset.
pub async fn verify_analysis<B: BlobStore>(blobs: &B, cid: &ContentId) -> Result<Verification> {
  let stored = StoredArtifact::from_bytes(&analysis_bytes(blobs, cid).await?)?;
  let recomputed = stored.artifact.content_id(CidScheme::detect(cid))?;
  Ok(Verification {
    matches: &recomputed == cid,
    cid: cid.clone(),
    recomputed,
  })
}

// ─── Feed ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedMode {
  /// Only receipts older than the public delay.
  #[default]
  Public,
  All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedQuery {
  pub frontier:          Option<Frontier>,
  pub limit:             usize,
  pub mode:              FeedMode,
  pub public_delay_days: u32,
}

impl Default for FeedQuery {
  fn default() -> Self {
    Self {
      frontier:          None,
      limit:             DEFAULT_FEED_LIMIT,
      mode:              FeedMode::Public,
      public_delay_days: 7,
    }
  }
}

/// Visible receipts, newest first, at most [`FEED_LIMIT_CAP`].
pub async fn latest_receipts<S: FrontierStore>(
  store: &S,
  query: &FeedQuery,
  now: DateTime<Utc>,
) -> Result<Vec<Receipt>> {
  let published_before = match query.mode {
    FeedMode::Public => {
      let cutoff = TimeDelta::try_days(query.public_delay_days.into())
        .and_then(|delay| now.checked_sub_signed(delay))
        .ok_or_else(|| {
          Error::Misconfigured(format!(
            "public delay of {} days is out of range",
            query.public_delay_days
          ))
        })?;
      Some(cutoff)
    }
    FeedMode::All => None,
  };
  let q = ReceiptQuery {
    frontier: query.frontier,
    visible: Some(true),
    published_before,
    limit: Some(query.limit.min(FEED_LIMIT_CAP)),
  };
  store
    .list_receipts(&q)
    .await
    .map_err(Error::store("list_receipts", "latest"))
}

// ─── Search ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
  /// The trimmed query.
  pub query:    String,
  pub entities: Vec<Entity>,
  /// Visible receipts only, newest first.
  pub receipts: Vec<Receipt>,
}

/// Substring search over entity names and slugs and over receipt titles and
/// sources, ignoring ASCII case.
pub async fn search<S: FrontierStore>(store: &S, query: &str) -> Result<SearchResults> {
  let query = query.trim();
  if query.chars().count() < SEARCH_MIN_CHARS {
    return Ok(SearchResults { query: query.to_owned(), ..Default::default() });
  }

  let entities = store
    .search_entities(query, SEARCH_ENTITY_CAP)
    .await
    .map_err(Error::store("search_entities", query))?;
  let receipts = store
    .search_receipts(query, SEARCH_RECEIPT_CAP)
    .await
    .map_err(Error::store("search_receipts", query))?;
  debug!(query, entities = entities.len(), receipts = receipts.len(), "search");

  Ok(SearchResults { query: query.to_owned(), entities, receipts })
}

// ─── Maintenance ─────────────────────────────────────────────────────────────

pub async fn stats<S: FrontierStore>(store: &S) -> Result<StoreStats> {
  store.stats().await.map_err(Error::store("stats", "all"))
}

/// Make the `n` newest hidden receipts visible. Returns how many changed.
pub async fn promote_hidden<S: FrontierStore>(store: &S, n: usize) -> Result<usize> {
  if n == 0 {
    return Ok(0);
  }
  let hidden = store
    .list_receipts(&ReceiptQuery {
      visible: Some(false),
      limit: Some(n),
      ..Default::default()
    })
    .await
    .map_err(Error::store("list_receipts", "hidden"))?;
  let ids = hidden.iter().map(|r| r.id).collect();
  let promoted = store
    .set_visible(ids, true)
    .await
    .map_err(Error::store("set_visible", format!("{} receipts", hidden.len())))?;
  debug!(promoted, "promoted hidden receipts");
  Ok(promoted)
}
