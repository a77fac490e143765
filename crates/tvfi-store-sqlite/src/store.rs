//! [`SqliteStore`]: the SQLite implementation of [`FrontierStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tracing::debug;
use uuid::Uuid;

use tvfi_core::{
  cid::ContentId,
  model::{
    Analysis, Entity, EntityReceipt, NewEntity, NewReceipt, Receipt, Scores,
  },
  store::{FrontierStore, ReceiptQuery, StoreStats},
};

use crate::{
  Result,
  encode::{
    ENTITY_COLUMNS, RECEIPT_COLUMNS, RawAnalysis, RawEntity, RawReceipt,
    decode_cid, decode_dt, encode_dt, encode_uuid,
  },
  error::Error,
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A frontier receipt store backed by a single SQLite file.
///
/// Clones share one connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a receipt `SELECT` whose column list is [`RECEIPT_COLUMNS`].
  async fn select_receipts(
    &self,
    sql: String,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<Receipt>> {
    let raws: Vec<RawReceipt> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawReceipt::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReceipt::into_receipt).collect()
  }
}

/// `?, ?, …` with `n` placeholders.
fn placeholders(n: usize) -> String { vec!["?"; n].join(", ") }

fn sql_limit(limit: Option<usize>) -> i64 {
  limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX))
}

/// A `LIKE … ESCAPE '\'` pattern matching `needle` anywhere, with the
/// wildcards in `needle` taken literally.
fn contains_pattern(needle: &str) -> String {
  let mut pattern = String::with_capacity(needle.len() + 2);
  pattern.push('%');
  for c in needle.chars() {
    if matches!(c, '%' | '_' | '\\') {
      pattern.push('\\');
    }
    pattern.push(c);
  }
  pattern.push('%');
  pattern
}

// ─── FrontierStore impl ──────────────────────────────────────────────────────

impl FrontierStore for SqliteStore {
  type Error = Error;

  // ── Receipts ──────────────────────────────────────────────────────────────

  async fn upsert_receipt(&self, input: NewReceipt) -> Result<Receipt> {
    let id_str           = encode_uuid(Uuid::new_v4());
    let published_at_str = encode_dt(input.published_at);
    let created_at_str   = encode_dt(Utc::now());
    let frontier_str     = input.frontier.as_str();

    let raw: RawReceipt = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "INSERT INTO receipts (
             receipt_id, hash, source, title, url, published_at,
             frontier, summary, visible, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
           ON CONFLICT(hash) DO UPDATE SET
             source       = excluded.source,
             title        = excluded.title,
             url          = excluded.url,
             published_at = excluded.published_at,
             frontier     = excluded.frontier,
             summary      = excluded.summary
           RETURNING {RECEIPT_COLUMNS}"
        );
        Ok(conn.query_row(
          &sql,
          rusqlite::params![
            id_str,
            input.hash,
            input.source,
            input.title,
            input.url,
            published_at_str,
            frontier_str,
            input.summary,
            input.visible,
            created_at_str,
          ],
          RawReceipt::from_row,
        )?)
      })
      .await?;

    raw.into_receipt()
  }

  async fn receipt_by_hash(&self, hash: &str) -> Result<Option<Receipt>> {
    let hash = hash.to_owned();

    let raw: Option<RawReceipt> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {RECEIPT_COLUMNS} FROM receipts WHERE hash = ?1"),
            rusqlite::params![hash],
            RawReceipt::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawReceipt::into_receipt).transpose()
  }

  async fn attach_analysis(
    &self,
    hash:   &str,
    cid:    &ContentId,
    scores: Scores,
  ) -> Result<usize> {
    let hash    = hash.to_owned();
    let cid_str = cid.as_str().to_owned();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE receipts
           SET cid = ?2, novelty_score = ?3, impact_score = ?4
           WHERE hash = ?1",
          rusqlite::params![hash, cid_str, scores.novelty, scores.impact],
        )?)
      })
      .await?;

    Ok(changed)
  }

  async fn set_visible(&self, ids: Vec<Uuid>, visible: bool) -> Result<usize> {
    let ids: Vec<String> = ids.into_iter().map(encode_uuid).collect();

    let changed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut changed = 0;
        {
          let mut stmt = tx.prepare(
            "UPDATE receipts SET visible = ?2
             WHERE receipt_id = ?1 AND visible != ?2",
          )?;
          for id in &ids {
            changed += stmt.execute(rusqlite::params![id, visible])?;
          }
        }
        tx.commit()?;
        Ok(changed)
      })
      .await?;

    Ok(changed)
  }

  async fn list_receipts(&self, query: &ReceiptQuery) -> Result<Vec<Receipt>> {
    use rusqlite::types::Value;

    let params = vec![
      query
        .frontier
        .map_or(Value::Null, |f| Value::Text(f.as_str().to_owned())),
      query.visible.map_or(Value::Null, |v| Value::Integer(v.into())),
      query
        .published_before
        .map_or(Value::Null, |dt| Value::Text(encode_dt(dt))),
      Value::Integer(sql_limit(query.limit)),
    ];

    self
      .select_receipts(
        format!(
          "SELECT {RECEIPT_COLUMNS} FROM receipts
           WHERE (?1 IS NULL OR frontier = ?1)
             AND (?2 IS NULL OR visible = ?2)
             AND (?3 IS NULL OR published_at <= ?3)
           ORDER BY published_at DESC, hash
           LIMIT ?4"
        ),
        params,
      )
      .await
  }

  async fn search_receipts(&self, needle: &str, limit: usize) -> Result<Vec<Receipt>> {
    use rusqlite::types::Value;

    self
      .select_receipts(
        format!(
          "SELECT {RECEIPT_COLUMNS} FROM receipts
           WHERE visible = 1
             AND (title LIKE ?1 ESCAPE '\\' OR source LIKE ?1 ESCAPE '\\')
           ORDER BY published_at DESC, hash
           LIMIT ?2"
        ),
        vec![
          Value::Text(contains_pattern(needle)),
          Value::Integer(sql_limit(Some(limit))),
        ],
      )
      .await
  }

  async fn valid_cids(
    &self,
    after: Option<&ContentId>,
    limit: usize,
  ) -> Result<Vec<ContentId>> {
    let after = after.map(|c| c.as_str().to_owned());
    let limit = sql_limit(Some(limit));

    let cids: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT cid FROM receipts
           WHERE cid IS NOT NULL AND cid != ''
             AND source IS NOT NULL AND source != ''
             AND (?1 IS NULL OR cid > ?1)
           ORDER BY cid
           LIMIT ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![after, limit], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(cids.into_iter().map(ContentId::from_stored).collect())
  }

  async fn stats(&self) -> Result<StoreStats> {
    let (receipts, entities, with_cid, latest, sample): (
      i64,
      i64,
      i64,
      Option<String>,
      Option<String>,
    ) = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT
             (SELECT COUNT(*) FROM receipts),
             (SELECT COUNT(*) FROM entities),
             (SELECT COUNT(*) FROM receipts WHERE cid IS NOT NULL AND cid != ''),
             (SELECT MAX(published_at) FROM receipts),
             (SELECT cid FROM receipts WHERE cid IS NOT NULL AND cid != ''
              ORDER BY published_at DESC, created_at DESC, hash LIMIT 1)",
          [],
          |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )?)
      })
      .await?;

    Ok(StoreStats {
      receipts:            receipts.max(0) as u64,
      entities:            entities.max(0) as u64,
      with_cid:            with_cid.max(0) as u64,
      latest_published_at: latest.as_deref().map(decode_dt).transpose()?,
      sample_cid:          decode_cid(sample),
    })
  }

  // ── Entities ──────────────────────────────────────────────────────────────

  async fn upsert_entities(&self, input: Vec<NewEntity>) -> Result<Vec<Entity>> {
    if input.is_empty() {
      return Ok(Vec::new());
    }
    let rows: Vec<(String, NewEntity)> = input
      .into_iter()
      .map(|e| (encode_uuid(Uuid::new_v4()), e))
      .collect();

    let raws: Vec<RawEntity> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut out = Vec::with_capacity(rows.len());
        {
          // Rows whose name and kind already match are left untouched and
          // return nothing.
          let mut stmt = tx.prepare(&format!(
            "INSERT INTO entities (entity_id, slug, name, kind)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(slug) DO UPDATE SET
               name = excluded.name,
               kind = excluded.kind
             WHERE entities.name IS NOT excluded.name
                OR entities.kind IS NOT excluded.kind
             RETURNING {ENTITY_COLUMNS}"
          ))?;
          for (id, e) in &rows {
            let raw = stmt
              .query_row(
                rusqlite::params![id, e.slug, e.name, e.kind.as_str()],
                RawEntity::from_row,
              )
              .optional()?;
            out.extend(raw);
          }
        }
        tx.commit()?;
        Ok(out)
      })
      .await?;

    debug!(written = raws.len(), "upserted entities");
    raws.into_iter().map(RawEntity::into_entity).collect()
  }

  async fn entities_by_slugs(&self, slugs: Vec<String>) -> Result<Vec<Entity>> {
    if slugs.is_empty() {
      return Ok(Vec::new());
    }

    let raws: Vec<RawEntity> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {ENTITY_COLUMNS} FROM entities WHERE slug IN ({})",
          placeholders(slugs.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(slugs.iter()), RawEntity::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEntity::into_entity).collect()
  }

  async fn entity_by_slug(&self, slug: &str) -> Result<Option<Entity>> {
    let slug = slug.to_owned();

    let raw: Option<RawEntity> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE slug = ?1"),
            rusqlite::params![slug],
            RawEntity::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawEntity::into_entity).transpose()
  }

  async fn search_entities(&self, needle: &str, limit: usize) -> Result<Vec<Entity>> {
    let pattern = contains_pattern(needle);
    let limit   = sql_limit(Some(limit));

    let raws: Vec<RawEntity> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ENTITY_COLUMNS} FROM entities
           WHERE name LIKE ?1 ESCAPE '\\' OR slug LIKE ?1 ESCAPE '\\'
           ORDER BY name, slug
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![pattern, limit], RawEntity::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEntity::into_entity).collect()
  }

  // ── Links ─────────────────────────────────────────────────────────────────

  async fn upsert_links(&self, links: Vec<EntityReceipt>) -> Result<usize> {
    if links.is_empty() {
      return Ok(0);
    }
    let rows: Vec<(String, String, &'static str)> = links
      .into_iter()
      .map(|l| (encode_uuid(l.entity_id), encode_uuid(l.receipt_id), l.role.as_str()))
      .collect();

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut written = 0;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO entity_receipt (entity_id, receipt_id, role)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(entity_id, receipt_id) DO UPDATE SET role = excluded.role",
          )?;
          for (entity_id, receipt_id, role) in &rows {
            written += stmt.execute(rusqlite::params![entity_id, receipt_id, role])?;
          }
        }
        tx.commit()?;
        Ok(written)
      })
      .await?;

    Ok(written)
  }

  async fn receipts_for_entity(
    &self,
    entity_id: Uuid,
    limit:     usize,
  ) -> Result<Vec<Receipt>> {
    use rusqlite::types::Value;

    self
      .select_receipts(
        format!(
          "SELECT {RECEIPT_COLUMNS} FROM receipts
           WHERE receipt_id IN (
             SELECT receipt_id FROM entity_receipt WHERE entity_id = ?1
           )
           ORDER BY published_at DESC, hash
           LIMIT ?2"
        ),
        vec![
          Value::Text(encode_uuid(entity_id)),
          Value::Integer(sql_limit(Some(limit))),
        ],
      )
      .await
  }

  // ── Analyses ──────────────────────────────────────────────────────────────

  async fn upsert_analysis(&self, input: Analysis) -> Result<Analysis> {
    let cid_str        = input.cid.as_str().to_owned();
    let receipt_hash   = input.receipt_hash.clone();
    let version        = input.version.clone();
    let storage_path   = input.storage_path.clone();
    let created_at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO analyses (cid, receipt_hash, version, storage_path, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT(cid) DO UPDATE SET
             receipt_hash = excluded.receipt_hash,
             version      = excluded.version,
             storage_path = excluded.storage_path",
          rusqlite::params![cid_str, receipt_hash, version, storage_path, created_at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(input)
  }

  async fn analysis_by_cid(&self, cid: &ContentId) -> Result<Option<Analysis>> {
    let cid_str = cid.as_str().to_owned();

    let raw: Option<RawAnalysis> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT cid, receipt_hash, version, storage_path
             FROM analyses WHERE cid = ?1",
            rusqlite::params![cid_str],
            |row| {
              Ok(RawAnalysis {
                cid:          row.get(0)?,
                receipt_hash: row.get(1)?,
                version:      row.get(2)?,
                storage_path: row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    Ok(raw.map(RawAnalysis::into_analysis))
  }
}
