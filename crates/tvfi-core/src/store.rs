//! The `FrontierStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `tvfi-store-sqlite`).
//! The ingestion pipeline depends on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  cid::ContentId,
  model::{
    Analysis, Entity, EntityReceipt, Frontier, NewEntity, NewReceipt, Receipt,
    Scores,
  },
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`FrontierStore::list_receipts`]. Results are ordered by
/// `published_at` descending, then `hash`.
#[derive(Debug, Clone, Default)]
pub struct ReceiptQuery {
  pub frontier:         Option<Frontier>,
  pub visible:          Option<bool>,
  /// Only receipts published at or before this instant.
  pub published_before: Option<DateTime<Utc>>,
  pub limit:            Option<usize>,
}

/// Aggregate counters over the whole store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
  pub receipts:            u64,
  pub entities:            u64,
  /// Receipts that have an analysis attached.
  pub with_cid:            u64,
  pub latest_published_at: Option<DateTime<Utc>>,
  /// Content id of the newest receipt that has one, for spot checks.
  pub sample_cid:          Option<ContentId>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the relational half of the pipeline: receipts, entities,
/// links and the analysis index.
///
/// All methods return `Send` futures so the trait can be used from a
/// multi-threaded tokio runtime.
pub trait FrontierStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Receipts ──────────────────────────────────────────────────────────

  /// Insert or update the receipt keyed by `hash`. On conflict only the
  /// descriptive fields change; `cid`, scores, `visible` and `created_at`
  /// are left alone.
  fn upsert_receipt(
    &self,
    input: NewReceipt,
  ) -> impl Future<Output = Result<Receipt, Self::Error>> + Send + '_;

  fn receipt_by_hash<'a>(
    &'a self,
    hash: &'a str,
  ) -> impl Future<Output = Result<Option<Receipt>, Self::Error>> + Send + 'a;

  /// Attach an analysis to the receipt with `hash`. Returns the number of
  /// rows updated (0 when no such receipt exists).
  fn attach_analysis<'a>(
    &'a self,
    hash: &'a str,
    cid: &'a ContentId,
    scores: Scores,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Set `visible` on every listed receipt. Returns the number changed.
  fn set_visible(
    &self,
    ids: Vec<Uuid>,
    visible: bool,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  fn list_receipts<'a>(
    &'a self,
    query: &'a ReceiptQuery,
  ) -> impl Future<Output = Result<Vec<Receipt>, Self::Error>> + Send + 'a;

  /// Visible receipts whose title or source contains `needle`, ignoring
  /// ASCII case. Same ordering as [`list_receipts`].
  ///
  /// [`list_receipts`]: FrontierStore::list_receipts
  fn search_receipts<'a>(
    &'a self,
    needle: &'a str,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Receipt>, Self::Error>> + Send + 'a;

  /// One page of distinct content ids attached to receipts with a non-empty
  /// source, ordered ascending, strictly after `after`.
  fn valid_cids<'a>(
    &'a self,
    after: Option<&'a ContentId>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<ContentId>, Self::Error>> + Send + 'a;

  fn stats(
    &self,
  ) -> impl Future<Output = Result<StoreStats, Self::Error>> + Send + '_;

  // ── Entities ──────────────────────────────────────────────────────────

  /// Insert or update entities keyed by `slug`, in one transaction. Rows
  /// whose stored name and kind already match may be omitted from the
  /// result; callers look those up with [`entities_by_slugs`].
  ///
  /// [`entities_by_slugs`]: FrontierStore::entities_by_slugs
  fn upsert_entities(
    &self,
    input: Vec<NewEntity>,
  ) -> impl Future<Output = Result<Vec<Entity>, Self::Error>> + Send + '_;

  fn entities_by_slugs(
    &self,
    slugs: Vec<String>,
  ) -> impl Future<Output = Result<Vec<Entity>, Self::Error>> + Send + '_;

  fn entity_by_slug<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<Option<Entity>, Self::Error>> + Send + 'a;

  /// Entities whose name or slug contains `needle`, ignoring ASCII case.
  /// Ordered by name, then slug.
  fn search_entities<'a>(
    &'a self,
    needle: &'a str,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Entity>, Self::Error>> + Send + 'a;

  // ── Links ─────────────────────────────────────────────────────────────

  /// Upsert on `(entity_id, receipt_id)`. Returns the number of rows
  /// written.
  fn upsert_links(
    &self,
    links: Vec<EntityReceipt>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Receipts linked to an entity, newest first.
  fn receipts_for_entity(
    &self,
    entity_id: Uuid,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Receipt>, Self::Error>> + Send + '_;

  // ── Analyses ──────────────────────────────────────────────────────────

  /// Upsert the index row keyed by `cid`.
  fn upsert_analysis(
    &self,
    input: Analysis,
  ) -> impl Future<Output = Result<Analysis, Self::Error>> + Send + '_;

  fn analysis_by_cid<'a>(
    &'a self,
    cid: &'a ContentId,
  ) -> impl Future<Output = Result<Option<Analysis>, Self::Error>> + Send + 'a;
}
