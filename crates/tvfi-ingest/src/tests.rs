//! Pipeline tests against an in-memory SQLite store and blob store.

use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use chrono::{Duration, TimeZone, Utc};
use tvfi_blob::MemoryBlobStore;
use tvfi_core::{
  blob::BlobStore,
  cid::{CidScheme, ContentId},
  model::{
    Analysis, Entity, EntityKind, EntityReceipt, Frontier, NewEntity, NewReceipt, Receipt,
    Scores,
  },
  row::RawRow,
  score::KeywordScorer,
  slug::EntityMention,
  store::{FrontierStore, ReceiptQuery, StoreStats},
};
use tvfi_store_sqlite::SqliteStore;
use uuid::Uuid;

use crate::{
  Error, IngestOptions, ReconcileOptions,
  ingest::{ARTIFACT_CONTENT_TYPE, ingest_batch},
  lens::NOT_ENOUGH_RECEIPTS,
  linker::{ReceiptMentions, link_entities},
  query::{
    FEED_LIMIT_CAP, FeedMode, FeedQuery, entity_lens, entity_profile, fetch_analysis,
    SEARCH_ENTITY_CAP, SEARCH_RECEIPT_CAP, latest_receipts, promote_hidden, search, stats,
    verify_analysis,
  },
  reconcile::reconcile_orphans,
  resolver::resolve_entities,
};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn raw(pairs: &[(&str, &str)]) -> RawRow {
  pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn row(title: &str, link: &str, date: &str, entities: &str) -> RawRow {
  raw(&[
    ("Title", title),
    ("Source / Link", link),
    ("Date (YYYY-MM)", date),
    ("Frontier", "Energy"),
    ("Entities (comma-separated)", entities),
    ("Summary (1–2 sentences)", "Something happened."),
    ("Technical Intelligence", "First prototype online."),
    ("Market Intelligence", "Signed a PPA."),
    ("Sentiment (tone + confidence)", "Positive (0.9)"),
  ])
}

fn batch() -> Vec<RawRow> {
  vec![
    row(
      "Helion signs PPA",
      "https://www.helionenergy.com/news/ppa?utm_source=x",
      "2023-05",
      "Helion Energy:org, Microsoft",
    ),
    row(
      "Microsoft backs fusion",
      "https://news.microsoft.com/fusion",
      "2023-06",
      "Microsoft, Sam Altman:person",
    ),
  ]
}

fn old_options() -> ReconcileOptions {
  ReconcileOptions { grace: Duration::zero(), ..Default::default() }
}

fn mention(raw: &str) -> EntityMention { EntityMention::parse(raw).unwrap() }

fn receipt(hash: &str) -> NewReceipt {
  NewReceipt {
    hash: hash.into(),
    source: "example.com".into(),
    title: format!("Title {hash}"),
    url: format!("https://example.com/{hash}"),
    published_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    frontier: Frontier::Ai,
    summary: String::new(),
    visible: true,
  }
}

// ─── Ingestion ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn ingest_writes_receipts_blobs_and_links() {
  let s = store().await;
  let b = MemoryBlobStore::new();

  let report = ingest_batch(&s, &b, &KeywordScorer, &batch(), IngestOptions::default())
    .await
    .unwrap();
  assert_eq!(report.succeeded, 2);
  assert_eq!(report.failed, 0);
  assert_eq!(report.skipped, 0);
  assert_eq!(report.entities_upserted, 3);
  assert_eq!(report.links, 4);

  let st = s.stats().await.unwrap();
  assert_eq!(st.receipts, 2);
  assert_eq!(st.with_cid, 2);

  let keys = b.keys().await;
  assert_eq!(keys.len(), 2);
  assert!(keys.iter().all(|k| k.ends_with(".json")));
  assert_eq!(b.content_type(&keys[0]).await.as_deref(), Some(ARTIFACT_CONTENT_TYPE));

  let receipts = s.list_receipts(&Default::default()).await.unwrap();
  for r in &receipts {
    let cid = r.cid.clone().unwrap();
    assert_eq!(r.novelty_score, Some(0.8));
    assert_eq!(r.impact_score, Some(0.75));
    let analysis = s.analysis_by_cid(&cid).await.unwrap().unwrap();
    assert_eq!(analysis.receipt_hash, r.hash);
    assert_eq!(analysis.storage_path, cid.storage_path());
  }
  assert_eq!(receipts[1].url, "https://www.helionenergy.com/news/ppa");
  assert_eq!(receipts[1].source, "www.helionenergy.com");
}

#[tokio::test]
async fn reingesting_is_idempotent() {
  let s = store().await;
  let b = MemoryBlobStore::new();
  let opts = IngestOptions::default();

  ingest_batch(&s, &b, &KeywordScorer, &batch(), opts).await.unwrap();
  let first_keys = b.keys().await;
  let first = s.list_receipts(&Default::default()).await.unwrap();

  let report = ingest_batch(&s, &b, &KeywordScorer, &batch(), opts).await.unwrap();
  assert_eq!(report.succeeded, 2);
  assert_eq!(report.links, 4);

  assert_eq!(b.keys().await, first_keys);
  let second = s.list_receipts(&Default::default()).await.unwrap();
  assert_eq!(second, first);

  let profile = entity_profile(&s, "microsoft").await.unwrap();
  assert_eq!(profile.receipts.len(), 2);
  assert_eq!(s.stats().await.unwrap().entities, 3);
}

#[tokio::test]
async fn invalid_rows_are_skipped_not_failed() {
  let s = store().await;
  let b = MemoryBlobStore::new();
  let mut rows = batch();
  rows.push(row("   ", "https://example.com/a", "2024-01", ""));
  rows.push(row("No link", "", "2024-01", ""));
  let mut unknown = row("Quantum leap", "https://example.com/q", "2024-01", "");
  unknown.insert("Frontier".into(), "Quantum".into());
  rows.push(unknown);

  let report = ingest_batch(&s, &b, &KeywordScorer, &rows, IngestOptions::default())
    .await
    .unwrap();
  assert_eq!(report.succeeded, 2);
  assert_eq!(report.skipped, 3);
  assert_eq!(report.failed, 0);
}

#[tokio::test]
async fn out_of_range_years_do_not_poison_the_feed() {
  let s = store().await;
  let b = MemoryBlobStore::new();
  let mut rows = batch();
  rows.push(row("Far future", "https://example.com/future", "+12345-01-01", ""));
  rows.push(row("Far past", "https://example.com/past", "-0001-01-01", ""));

  let report = ingest_batch(&s, &b, &KeywordScorer, &rows, IngestOptions::default())
    .await
    .unwrap();
  assert_eq!(report.succeeded, 4);
  assert_eq!(report.failed, 0);

  let all = FeedQuery { mode: FeedMode::All, ..Default::default() };
  let feed = latest_receipts(&s, &all, Utc::now()).await.unwrap();
  assert_eq!(feed.len(), 4);
  let future = feed.iter().find(|r| r.title == "Far future").unwrap();
  assert_eq!(future.published_at, chrono::DateTime::<Utc>::UNIX_EPOCH);
}

/// Rejects the `fail_on`-th put (1-based) and delegates everything else.
struct FlakyBlobs {
  inner:   MemoryBlobStore,
  fail_on: usize,
  puts:    AtomicUsize,
}

impl BlobStore for FlakyBlobs {
  type Error = tvfi_blob::Error;

  async fn put(
    &self,
    key: &str,
    bytes: Vec<u8>,
    content_type: &str,
    overwrite: bool,
  ) -> Result<(), Self::Error> {
    if self.puts.fetch_add(1, AtomicOrdering::SeqCst) + 1 == self.fail_on {
      return Err(tvfi_blob::Error::InvalidKey(key.to_owned()));
    }
    self.inner.put(key, bytes, content_type, overwrite).await
  }

  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Self::Error> {
    self.inner.get(key).await
  }

  async fn list(
    &self,
    prefix: &str,
    offset: usize,
    limit: usize,
  ) -> Result<Vec<tvfi_core::blob::BlobObject>, Self::Error> {
    self.inner.list(prefix, offset, limit).await
  }

  async fn delete(&self, keys: Vec<String>) -> Result<usize, Self::Error> {
    self.inner.delete(keys).await
  }
}

#[tokio::test]
async fn blob_failure_fails_only_that_row_and_is_retryable() {
  let s = store().await;
  let flaky = FlakyBlobs { inner: MemoryBlobStore::new(), fail_on: 1, puts: AtomicUsize::new(0) };
  let opts = IngestOptions::default();

  let report = ingest_batch(&s, &flaky, &KeywordScorer, &batch(), opts).await.unwrap();
  assert_eq!(report.succeeded, 1);
  assert_eq!(report.failed, 1);
  // The receipt was written before the upload failed, so it still links.
  assert_eq!(report.links, 4);
  let st = s.stats().await.unwrap();
  assert_eq!(st.receipts, 2);
  assert_eq!(st.with_cid, 1);

  let report = ingest_batch(&s, &flaky.inner, &KeywordScorer, &batch(), opts).await.unwrap();
  assert_eq!(report.succeeded, 2);
  assert_eq!(s.stats().await.unwrap().with_cid, 2);
  assert_eq!(flaky.inner.keys().await.len(), 2);
}

/// Fails the `fail_on`-th call (1-based) to the method named `op` and
/// delegates everything else.
struct FlakyStore {
  inner:   SqliteStore,
  op:      &'static str,
  fail_on: usize,
  calls:   AtomicUsize,
}

impl FlakyStore {
  async fn new(op: &'static str, fail_on: usize) -> Self {
    Self { inner: store().await, op, fail_on, calls: AtomicUsize::new(0) }
  }

  fn trip(&self, op: &'static str) -> Result<(), tvfi_store_sqlite::Error> {
    if op == self.op && self.calls.fetch_add(1, AtomicOrdering::SeqCst) + 1 == self.fail_on {
      return Err(tvfi_store_sqlite::Error::Decode { column: op, value: "injected".into() });
    }
    Ok(())
  }
}

impl FrontierStore for FlakyStore {
  type Error = tvfi_store_sqlite::Error;

  async fn upsert_receipt(&self, input: NewReceipt) -> Result<Receipt, Self::Error> {
    self.trip("upsert_receipt")?;
    self.inner.upsert_receipt(input).await
  }

  async fn receipt_by_hash(&self, hash: &str) -> Result<Option<Receipt>, Self::Error> {
    self.trip("receipt_by_hash")?;
    self.inner.receipt_by_hash(hash).await
  }

  async fn attach_analysis(
    &self,
    hash: &str,
    cid: &ContentId,
    scores: Scores,
  ) -> Result<usize, Self::Error> {
    self.trip("attach_analysis")?;
    self.inner.attach_analysis(hash, cid, scores).await
  }

  async fn set_visible(&self, ids: Vec<Uuid>, visible: bool) -> Result<usize, Self::Error> {
    self.trip("set_visible")?;
    self.inner.set_visible(ids, visible).await
  }

  async fn list_receipts(&self, query: &ReceiptQuery) -> Result<Vec<Receipt>, Self::Error> {
    self.trip("list_receipts")?;
    self.inner.list_receipts(query).await
  }

  async fn search_receipts(&self, needle: &str, limit: usize) -> Result<Vec<Receipt>, Self::Error> {
    self.trip("search_receipts")?;
    self.inner.search_receipts(needle, limit).await
  }

  async fn valid_cids(
    &self,
    after: Option<&ContentId>,
    limit: usize,
  ) -> Result<Vec<ContentId>, Self::Error> {
    self.trip("valid_cids")?;
    self.inner.valid_cids(after, limit).await
  }

  async fn stats(&self) -> Result<StoreStats, Self::Error> {
    self.trip("stats")?;
    self.inner.stats().await
  }

  async fn upsert_entities(&self, input: Vec<NewEntity>) -> Result<Vec<Entity>, Self::Error> {
    self.trip("upsert_entities")?;
    self.inner.upsert_entities(input).await
  }

  async fn entities_by_slugs(&self, slugs: Vec<String>) -> Result<Vec<Entity>, Self::Error> {
    self.trip("entities_by_slugs")?;
    self.inner.entities_by_slugs(slugs).await
  }

  async fn entity_by_slug(&self, slug: &str) -> Result<Option<Entity>, Self::Error> {
    self.trip("entity_by_slug")?;
    self.inner.entity_by_slug(slug).await
  }

  async fn search_entities(&self, needle: &str, limit: usize) -> Result<Vec<Entity>, Self::Error> {
    self.trip("search_entities")?;
    self.inner.search_entities(needle, limit).await
  }

  async fn upsert_links(&self, links: Vec<EntityReceipt>) -> Result<usize, Self::Error> {
    self.trip("upsert_links")?;
    self.inner.upsert_links(links).await
  }

  async fn receipts_for_entity(
    &self,
    entity_id: Uuid,
    limit: usize,
  ) -> Result<Vec<Receipt>, Self::Error> {
    self.trip("receipts_for_entity")?;
    self.inner.receipts_for_entity(entity_id, limit).await
  }

  async fn upsert_analysis(&self, input: Analysis) -> Result<Analysis, Self::Error> {
    self.trip("upsert_analysis")?;
    self.inner.upsert_analysis(input).await
  }

  async fn analysis_by_cid(&self, cid: &ContentId) -> Result<Option<Analysis>, Self::Error> {
    self.trip("analysis_by_cid")?;
    self.inner.analysis_by_cid(cid).await
  }
}

#[tokio::test]
async fn entity_upsert_failure_aborts_the_batch() {
  let s = FlakyStore::new("upsert_entities", 1).await;
  let b = MemoryBlobStore::new();

  let err = ingest_batch(&s, &b, &KeywordScorer, &batch(), IngestOptions::default())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Store { op: "upsert_entities", .. }), "{err}");

  // Rows were written before resolution; nothing got linked.
  let st = s.inner.stats().await.unwrap();
  assert_eq!(st.receipts, 2);
  assert_eq!(st.entities, 0);
}

#[tokio::test]
async fn analysis_index_failure_fails_only_that_row() {
  for op in ["upsert_analysis", "attach_analysis"] {
    let s = FlakyStore::new(op, 1).await;
    let b = MemoryBlobStore::new();

    let report = ingest_batch(&s, &b, &KeywordScorer, &batch(), IngestOptions::default())
      .await
      .unwrap();
    assert_eq!(report.succeeded, 1, "{op}");
    assert_eq!(report.failed, 1, "{op}");
    assert_eq!(report.links, 4, "{op}");
    assert_eq!(s.inner.stats().await.unwrap().with_cid, 1, "{op}");

    let report = ingest_batch(&s.inner, &b, &KeywordScorer, &batch(), IngestOptions::default())
      .await
      .unwrap();
    assert_eq!(report.succeeded, 2, "{op}");
    assert_eq!(s.inner.stats().await.unwrap().with_cid, 2, "{op}");
  }
}

#[tokio::test]
async fn sha256_hex_scheme_is_honoured() {
  let s = store().await;
  let b = MemoryBlobStore::new();
  let opts = IngestOptions { cid_scheme: CidScheme::Sha256Hex, visible_by_default: false };
  ingest_batch(&s, &b, &KeywordScorer, &batch(), opts).await.unwrap();

  let receipts = s.list_receipts(&Default::default()).await.unwrap();
  assert!(receipts.iter().all(|r| !r.visible));
  for r in receipts {
    let cid = r.cid.unwrap();
    assert!(cid.as_str().starts_with("sha256-"));
    assert!(verify_analysis(&b, &cid).await.unwrap().matches);
  }
}

// ─── Resolver and linker ─────────────────────────────────────────────────────

#[tokio::test]
async fn resolver_dedups_and_backfills_unchanged_entities() {
  let s = store().await;
  let first = resolve_entities(&s, &[mention("OpenAI:lab"), mention("openai:person")])
    .await
    .unwrap();
  assert_eq!(first.len(), 1);
  let stored = s.entity_by_slug("openai").await.unwrap().unwrap();
  assert_eq!(stored.kind, EntityKind::Lab);
  assert_eq!(stored.name, "OpenAI");

  // Unchanged rows are not echoed by the upsert; the lookup fills them in.
  let again = resolve_entities(&s, &[mention("OpenAI:lab"), mention("Anthropic")])
    .await
    .unwrap();
  assert_eq!(again.len(), 2);
  assert_eq!(again["openai"], first["openai"]);
}

#[tokio::test]
async fn resolver_with_no_mentions_is_a_no_op() {
  let s = store().await;
  assert!(resolve_entities(&s, &[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn linking_twice_keeps_one_row_per_pair() {
  let s = store().await;
  s.upsert_receipt(receipt("h1")).await.unwrap();
  let ids = resolve_entities(&s, &[mention("Helion")]).await.unwrap();
  let batch = vec![ReceiptMentions { hash: "h1".into(), slugs: vec!["helion".into()] }];

  assert_eq!(link_entities(&s, &ids, &batch).await.unwrap(), 1);
  assert_eq!(link_entities(&s, &ids, &batch).await.unwrap(), 1);

  let entity = s.entity_by_slug("helion").await.unwrap().unwrap();
  assert_eq!(s.receipts_for_entity(entity.id, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn linker_skips_missing_receipts() {
  let s = store().await;
  s.upsert_receipt(receipt("h1")).await.unwrap();
  let ids = resolve_entities(&s, &[mention("Helion")]).await.unwrap();
  let batch = vec![
    ReceiptMentions { hash: "missing".into(), slugs: vec!["helion".into()] },
    ReceiptMentions { hash: "h1".into(), slugs: vec!["helion".into(), "helion".into()] },
  ];
  assert_eq!(link_entities(&s, &ids, &batch).await.unwrap(), 1);
}

// ─── Reconciliation ──────────────────────────────────────────────────────────

async fn attach(s: &SqliteStore, hash: &str, cid: &ContentId) {
  s.upsert_receipt(receipt(hash)).await.unwrap();
  s.attach_analysis(hash, cid, Scores { novelty: 0.6, impact: 0.6 })
    .await
    .unwrap();
}

async fn put(b: &MemoryBlobStore, key: &str) {
  b.put(key, b"{}".to_vec(), ARTIFACT_CONTENT_TYPE, true).await.unwrap();
}

#[tokio::test]
async fn reconcile_deletes_exactly_the_orphans() {
  let s = store().await;
  let b = MemoryBlobStore::new();
  let (a, bb, c) = (
    CidScheme::Sha256Hex.derive(b"A"),
    CidScheme::Sha256Hex.derive(b"B"),
    CidScheme::Sha256Hex.derive(b"C"),
  );
  attach(&s, "ha", &a).await;
  attach(&s, "hb", &bb).await;
  for cid in [&a, &bb, &c] {
    put(&b, &cid.storage_path()).await;
  }
  put(&b, "README.txt").await;

  let report = reconcile_orphans(&s, &b, old_options()).await.unwrap();
  assert_eq!(report.valid, 2);
  assert_eq!(report.deleted, 1);
  assert_eq!(report.orphans, 1);
  assert_eq!(report.scanned, 4);

  let mut expected = vec![a.storage_path(), bb.storage_path(), "README.txt".to_owned()];
  expected.sort();
  assert_eq!(b.keys().await, expected);
}

#[tokio::test]
async fn reconcile_pages_and_batches() {
  let s = store().await;
  let b = MemoryBlobStore::new();
  let mut valid = Vec::new();
  for i in 0..7 {
    let cid = CidScheme::Sha256Hex.derive(format!("valid-{i}").as_bytes());
    attach(&s, &format!("h{i}"), &cid).await;
    put(&b, &cid.storage_path()).await;
    valid.push(cid);
  }
  for i in 0..5 {
    put(&b, &CidScheme::Sha256Hex.derive(format!("orphan-{i}").as_bytes()).storage_path()).await;
  }

  let opts = ReconcileOptions { page_size: 3, delete_batch: 2, ..old_options() };
  let report = reconcile_orphans(&s, &b, opts).await.unwrap();
  assert_eq!(report.valid, 7);
  assert_eq!(report.scanned, 12);
  assert_eq!(report.deleted, 5);
  let keys = b.keys().await;
  assert_eq!(keys.len(), 7);
  assert!(valid.iter().all(|c| keys.contains(&c.storage_path())));
}

#[tokio::test]
async fn reconcile_defers_fresh_orphans_and_ignores_sourceless_receipts() {
  let s = store().await;
  let b = MemoryBlobStore::new();
  let stale = CidScheme::Sha256Hex.derive(b"stale");
  let fresh = CidScheme::Sha256Hex.derive(b"fresh");

  // A receipt with an empty source does not protect its analysis.
  let mut r = receipt("h1");
  r.source = String::new();
  s.upsert_receipt(r).await.unwrap();
  s.attach_analysis("h1", &stale, Scores { novelty: 0.6, impact: 0.6 })
    .await
    .unwrap();

  put(&b, &stale.storage_path()).await;
  put(&b, &fresh.storage_path()).await;
  b.set_modified(&stale.storage_path(), Utc::now() - Duration::hours(1)).await;

  let report = reconcile_orphans(&s, &b, ReconcileOptions::default()).await.unwrap();
  assert_eq!(report.valid, 0);
  assert_eq!(report.orphans, 2);
  assert_eq!(report.deferred, 1);
  assert_eq!(report.deleted, 1);
  assert_eq!(b.keys().await, vec![fresh.storage_path()]);
}

#[tokio::test]
async fn reconcile_dry_run_deletes_nothing() {
  let s = store().await;
  let b = MemoryBlobStore::new();
  put(&b, &CidScheme::Sha256Hex.derive(b"x").storage_path()).await;

  let opts = ReconcileOptions { dry_run: true, ..old_options() };
  let report = reconcile_orphans(&s, &b, opts).await.unwrap();
  assert_eq!(report.orphans, 1);
  assert_eq!(report.deleted, 0);
  assert_eq!(b.keys().await.len(), 1);
}

#[tokio::test]
async fn reconcile_rejects_zero_sizes() {
  let s = store().await;
  let b = MemoryBlobStore::new();
  let opts = ReconcileOptions { page_size: 0, ..Default::default() };
  assert!(matches!(
    reconcile_orphans(&s, &b, opts).await,
    Err(Error::Misconfigured(_))
  ));
}

#[tokio::test]
async fn out_of_range_grace_is_rejected_before_deleting() {
  let s = store().await;
  let b = MemoryBlobStore::new();
  let orphan = CidScheme::Sha256Hex.derive(b"orphan");
  b.put(&orphan.storage_path(), b"{}".to_vec(), ARTIFACT_CONTENT_TYPE, true)
    .await
    .unwrap();

  let grace = Duration::try_days(i64::from(u32::MAX)).unwrap();
  let opts = ReconcileOptions { grace, ..Default::default() };
  assert!(matches!(
    reconcile_orphans(&s, &b, opts).await,
    Err(Error::Misconfigured(_))
  ));
  assert_eq!(b.keys().await, vec![orphan.storage_path()]);
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_and_verify_analysis() {
  let s = store().await;
  let b = MemoryBlobStore::new();
  ingest_batch(&s, &b, &KeywordScorer, &batch(), IngestOptions::default())
    .await
    .unwrap();
  let cid = s.stats().await.unwrap().sample_cid.unwrap();

  let json = fetch_analysis(&b, &cid).await.unwrap();
  assert_eq!(json["cid"], cid.as_str());
  assert_eq!(json["version"], "v1");

  let v = verify_analysis(&b, &cid).await.unwrap();
  assert!(v.matches);
  assert_eq!(v.recomputed, cid);

  let missing = CidScheme::DagJson.derive(b"nothing");
  assert!(matches!(
    fetch_analysis(&b, &missing).await,
    Err(Error::AnalysisNotFound(_))
  ));
}

#[tokio::test]
async fn tampered_blob_fails_verification() {
  let s = store().await;
  let b = MemoryBlobStore::new();
  ingest_batch(&s, &b, &KeywordScorer, &batch()[..1], IngestOptions::default())
    .await
    .unwrap();
  let cid = s.stats().await.unwrap().sample_cid.unwrap();

  let mut json = fetch_analysis(&b, &cid).await.unwrap();
  json["market"]["notes"] = "edited".into();
  b.put(&cid.storage_path(), serde_json::to_vec(&json).unwrap(), ARTIFACT_CONTENT_TYPE, true)
    .await
    .unwrap();
  assert!(!verify_analysis(&b, &cid).await.unwrap().matches);
}

#[tokio::test]
async fn entity_queries_report_not_found() {
  let s = store().await;
  assert!(matches!(entity_profile(&s, "nobody").await, Err(Error::EntityNotFound(_))));
  assert!(matches!(
    entity_lens(&s, "engineer-realist", "nobody").await,
    Err(Error::EntityNotFound(_))
  ));
  assert!(matches!(entity_lens(&s, "poet", "nobody").await, Err(Error::UnknownLens(_))));
}

#[tokio::test]
async fn lenses_cite_the_newest_receipts_in_order() {
  let s = store().await;
  let b = MemoryBlobStore::new();
  let rows: Vec<RawRow> = (1..=6)
    .map(|m| {
      row(
        &format!("Milestone {m}"),
        &format!("https://helion.example/{m}"),
        &format!("2024-{m:02}"),
        "Helion",
      )
    })
    .collect();
  ingest_batch(&s, &b, &KeywordScorer, &rows, IngestOptions::default())
    .await
    .unwrap();

  let view = entity_lens(&s, "engineer-realist", "helion").await.unwrap();
  let lines: Vec<&str> = view.answer.lines().collect();
  assert_eq!(lines.len(), 5);
  assert_eq!(lines[0], "Milestone 2 — helion.example [R1]");
  assert_eq!(lines[4], "Milestone 6 — helion.example [R5]");
  assert_eq!(view.citations[4].reference, "R5");
  assert_eq!(view.citations[4].date, "2024-06-01T00:00:00.000Z");

  let view = entity_lens(&s, "market-mapper", "helion").await.unwrap();
  assert_eq!(view.answer.lines().count(), 4);
  assert!(view.answer.starts_with("helion.example: Milestone 3 [R1]"));
}

#[tokio::test]
async fn lens_without_receipts_says_so() {
  let s = store().await;
  resolve_entities(&s, &[mention("Lonely")]).await.unwrap();
  let view = entity_lens(&s, "market-mapper", "lonely").await.unwrap();
  assert_eq!(view.answer, NOT_ENOUGH_RECEIPTS);
  assert!(view.citations.is_empty());
}

#[tokio::test]
async fn public_feed_applies_the_delay() {
  let s = store().await;
  let now = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
  for (hash, day) in [("old", 1), ("new", 8)] {
    let mut r = receipt(hash);
    r.published_at = Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap();
    s.upsert_receipt(r).await.unwrap();
  }
  let mut hidden = receipt("hidden");
  hidden.visible = false;
  s.upsert_receipt(hidden).await.unwrap();

  let all = FeedQuery { mode: FeedMode::All, ..Default::default() };
  let all = latest_receipts(&s, &all, now).await.unwrap();
  let hashes: Vec<_> = all.iter().map(|r| r.hash.as_str()).collect();
  assert_eq!(hashes, vec!["new", "old"]);

  let feed = latest_receipts(&s, &FeedQuery::default(), now).await.unwrap();
  assert_eq!(feed.len(), 1);
  assert_eq!(feed[0].hash, "old");

  let capped = FeedQuery { limit: 500, frontier: Some(Frontier::Energy), ..Default::default() };
  assert!(latest_receipts(&s, &capped, now).await.unwrap().is_empty());
}

#[test]
fn feed_defaults_to_public_with_the_full_cap() {
  let q = FeedQuery::default();
  assert_eq!(q.mode, FeedMode::Public);
  assert_eq!(q.limit, FEED_LIMIT_CAP);
  assert_eq!(q.public_delay_days, 7);
}

#[tokio::test]
async fn oversized_public_delay_is_an_error_not_a_panic() {
  let s = store().await;
  s.upsert_receipt(receipt("a")).await.unwrap();
  let q = FeedQuery { public_delay_days: u32::MAX, ..Default::default() };
  assert!(matches!(
    latest_receipts(&s, &q, Utc::now()).await,
    Err(Error::Misconfigured(_))
  ));
}

// ─── Search ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn search_finds_entities_and_visible_receipts() {
  let s = store().await;
  let b = MemoryBlobStore::new();
  ingest_batch(&s, &b, &KeywordScorer, &batch(), IngestOptions::default()).await.unwrap();
  let hidden = IngestOptions { visible_by_default: false, ..Default::default() };
  let secret = row("Microsoft secret", "https://example.com/secret", "2024-01", "");
  ingest_batch(&s, &b, &KeywordScorer, &[secret], hidden).await.unwrap();

  let found = search(&s, "  micro ").await.unwrap();
  assert_eq!(found.query, "micro");
  assert_eq!(found.entities.len(), 1);
  assert_eq!(found.entities[0].slug, "microsoft");
  let titles: Vec<_> = found.receipts.iter().map(|r| r.title.as_str()).collect();
  assert_eq!(titles, ["Microsoft backs fusion"]);

  let short = search(&s, " m ").await.unwrap();
  assert_eq!(short.query, "m");
  assert!(short.entities.is_empty() && short.receipts.is_empty());
}

#[tokio::test]
async fn search_results_are_capped() {
  let s = store().await;
  let b = MemoryBlobStore::new();
  let rows: Vec<_> = (1..=10)
    .map(|i| {
      row(
        &format!("Fusion note {i}"),
        &format!("https://example.com/note-{i}"),
        "2024-01",
        &format!("Fusion Lab {i}"),
      )
    })
    .collect();
  ingest_batch(&s, &b, &KeywordScorer, &rows, IngestOptions::default()).await.unwrap();

  let found = search(&s, "fusion").await.unwrap();
  assert_eq!(found.entities.len(), SEARCH_ENTITY_CAP);
  assert_eq!(found.receipts.len(), SEARCH_RECEIPT_CAP);
}

#[tokio::test]
async fn promote_flips_the_newest_hidden_receipts() {
  let s = store().await;
  for day in 1..=5 {
    let mut r = receipt(&format!("h{day}"));
    r.visible = false;
    r.published_at = Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap();
    s.upsert_receipt(r).await.unwrap();
  }

  assert_eq!(promote_hidden(&s, 3).await.unwrap(), 3);
  let visible: Vec<_> = s
    .list_receipts(&ReceiptQuery { visible: Some(true), ..Default::default() })
    .await
    .unwrap()
    .into_iter()
    .map(|r| r.hash)
    .collect();
  assert_eq!(visible, vec!["h5", "h4", "h3"]);
  assert_eq!(promote_hidden(&s, 0).await.unwrap(), 0);
  assert_eq!(stats(&s).await.unwrap().receipts, 5);
}
