//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored in the canonical ISO form (millisecond precision,
//! `Z` suffix) so that lexicographic order is chronological order. UUIDs are
//! stored as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use tvfi_core::{
  canon::format_iso,
  cid::ContentId,
  model::{Analysis, Entity, EntityKind, Frontier, Receipt},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { format_iso(dt) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Vocabularies ────────────────────────────────────────────────────────────

pub fn decode_frontier(s: &str) -> Result<Frontier> {
  s.parse().map_err(|_| Error::Decode {
    column: "frontier",
    value:  s.to_owned(),
  })
}

pub fn decode_entity_kind(s: &str) -> Result<EntityKind> {
  let kind = EntityKind::from_tag(s);
  if kind.as_str() == s {
    Ok(kind)
  } else {
    Err(Error::Decode {
      column: "kind",
      value:  s.to_owned(),
    })
  }
}

/// Empty strings are treated as absent.
pub fn decode_cid(s: Option<String>) -> Option<ContentId> {
  s.filter(|s| !s.is_empty()).map(ContentId::from_stored)
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const RECEIPT_COLUMNS: &str = "receipt_id, hash, source, title, url, published_at, \
   frontier, summary, visible, cid, novelty_score, impact_score, created_at";

/// Raw values read directly from a `receipts` row.
pub struct RawReceipt {
  pub receipt_id:    String,
  pub hash:          String,
  pub source:        String,
  pub title:         String,
  pub url:           String,
  pub published_at:  String,
  pub frontier:      String,
  pub summary:       String,
  pub visible:       bool,
  pub cid:           Option<String>,
  pub novelty_score: Option<f64>,
  pub impact_score:  Option<f64>,
  pub created_at:    String,
}

impl RawReceipt {
  /// Map a row selected with [`RECEIPT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      receipt_id:    row.get(0)?,
      hash:          row.get(1)?,
      source:        row.get(2)?,
      title:         row.get(3)?,
      url:           row.get(4)?,
      published_at:  row.get(5)?,
      frontier:      row.get(6)?,
      summary:       row.get(7)?,
      visible:       row.get(8)?,
      cid:           row.get(9)?,
      novelty_score: row.get(10)?,
      impact_score:  row.get(11)?,
      created_at:    row.get(12)?,
    })
  }

  pub fn into_receipt(self) -> Result<Receipt> {
    Ok(Receipt {
      id:            decode_uuid(&self.receipt_id)?,
      hash:          self.hash,
      source:        self.source,
      title:         self.title,
      url:           self.url,
      published_at:  decode_dt(&self.published_at)?,
      frontier:      decode_frontier(&self.frontier)?,
      summary:       self.summary,
      visible:       self.visible,
      cid:           decode_cid(self.cid),
      novelty_score: self.novelty_score,
      impact_score:  self.impact_score,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub const ENTITY_COLUMNS: &str = "entity_id, slug, name, kind, profile";

/// Raw values read directly from an `entities` row.
pub struct RawEntity {
  pub entity_id: String,
  pub slug:      String,
  pub name:      String,
  pub kind:      String,
  pub profile:   Option<String>,
}

impl RawEntity {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      entity_id: row.get(0)?,
      slug:      row.get(1)?,
      name:      row.get(2)?,
      kind:      row.get(3)?,
      profile:   row.get(4)?,
    })
  }

  pub fn into_entity(self) -> Result<Entity> {
    Ok(Entity {
      id:      decode_uuid(&self.entity_id)?,
      slug:    self.slug,
      name:    self.name,
      kind:    decode_entity_kind(&self.kind)?,
      profile: self.profile,
    })
  }
}

/// Raw values read directly from an `analyses` row.
pub struct RawAnalysis {
  pub cid:          String,
  pub receipt_hash: String,
  pub version:      String,
  pub storage_path: String,
}

impl RawAnalysis {
  pub fn into_analysis(self) -> Analysis {
    Analysis {
      cid:          ContentId::from_stored(self.cid),
      receipt_hash: self.receipt_hash,
      version:      self.version,
      storage_path: self.storage_path,
    }
  }
}
