//! Persistent record types: receipts, entities, their links, and analyses.
//!
//! Receipts and entities are independent top-level records keyed by a
//! content-derived string (`hash` and `slug`). Storage ids are UUIDs assigned by
//! the store on first insert and stable across upserts.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, cid::ContentId};

// ─── Frontier ────────────────────────────────────────────────────────────────

/// The domain a receipt belongs to. Closed vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frontier {
  #[serde(rename = "AI")]
  Ai,
  Biotech,
  Crypto,
  Defense,
  Energy,
  Robotics,
  #[serde(rename = "Frontier Founders")]
  FrontierFounders,
  Telecom,
  Thielverse,
}

impl Frontier {
  pub const ALL: [Frontier; 9] = [
    Self::Ai,
    Self::Biotech,
    Self::Crypto,
    Self::Defense,
    Self::Energy,
    Self::Robotics,
    Self::FrontierFounders,
    Self::Telecom,
    Self::Thielverse,
  ];

  /// The display label, which is also the stored and serialised form.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Ai => "AI",
      Self::Biotech => "Biotech",
      Self::Crypto => "Crypto",
      Self::Defense => "Defense",
      Self::Energy => "Energy",
      Self::Robotics => "Robotics",
      Self::FrontierFounders => "Frontier Founders",
      Self::Telecom => "Telecom",
      Self::Thielverse => "Thielverse",
    }
  }
}

impl FromStr for Frontier {
  type Err = Error;

  /// Case-insensitive match against the display labels.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim();
    Self::ALL
      .into_iter()
      .find(|f| f.as_str().eq_ignore_ascii_case(wanted))
      .ok_or_else(|| Error::UnknownFrontier(s.to_owned()))
  }
}

impl fmt::Display for Frontier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Entities ────────────────────────────────────────────────────────────────

/// The kind of actor an entity represents.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
  #[default]
  Org,
  Person,
  Lab,
  Fund,
  Gov,
  Team,
}

impl EntityKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Org => "org",
      Self::Person => "person",
      Self::Lab => "lab",
      Self::Fund => "fund",
      Self::Gov => "gov",
      Self::Team => "team",
    }
  }

  /// Map a free-text kind tag onto the closed set. Anything unrecognised
  /// (including an empty tag) becomes [`EntityKind::Org`].
  pub fn from_tag(tag: &str) -> Self {
    match tag.trim().to_ascii_lowercase().as_str() {
      "person" => Self::Person,
      "lab" => Self::Lab,
      "fund" => Self::Fund,
      "gov" => Self::Gov,
      "team" => Self::Team,
      _ => Self::Org,
    }
  }
}

/// A named actor tracked across receipts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
  pub id:      Uuid,
  /// Pure function of `name`; see [`crate::slug::slugify`].
  pub slug:    String,
  pub name:    String,
  pub kind:    EntityKind,
  pub profile: Option<String>,
}

/// Input to [`crate::store::FrontierStore::upsert_entities`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntity {
  pub slug: String,
  pub name: String,
  pub kind: EntityKind,
}

// ─── Receipts ────────────────────────────────────────────────────────────────

/// Heuristic scores attached to a receipt once its analysis exists.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
  pub novelty: f64,
  pub impact:  f64,
}

/// An append-only record of one observed claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
  pub id:            Uuid,
  /// Identity key; see [`crate::identity::identity_hash`].
  pub hash:          String,
  /// URL host, or a literal origin label for non-URL sources.
  pub source:        String,
  pub title:         String,
  pub url:           String,
  pub published_at:  DateTime<Utc>,
  pub frontier:      Frontier,
  pub summary:       String,
  pub visible:       bool,
  pub cid:           Option<ContentId>,
  pub novelty_score: Option<f64>,
  pub impact_score:  Option<f64>,
  /// Server-assigned on first insert; never changes.
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::FrontierStore::upsert_receipt`].
///
/// `cid`, the scores and `created_at` are never accepted here: an upsert must
/// not detach an existing analysis or resurrect a hidden receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReceipt {
  pub hash:         String,
  pub source:       String,
  pub title:        String,
  pub url:          String,
  pub published_at: DateTime<Utc>,
  pub frontier:     Frontier,
  pub summary:      String,
  /// Only used when the receipt is first inserted.
  pub visible:      bool,
}

// ─── Links ───────────────────────────────────────────────────────────────────

/// How an entity appears in a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkRole {
  #[default]
  Mentioned,
}

impl LinkRole {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Mentioned => "mentioned",
    }
  }
}

/// Association between an entity and a receipt. Identity is the
/// `(entity_id, receipt_id)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityReceipt {
  pub entity_id:  Uuid,
  pub receipt_id: Uuid,
  pub role:       LinkRole,
}

// ─── Analyses ────────────────────────────────────────────────────────────────

/// Index row for a stored analysis artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
  pub cid:          ContentId,
  /// Back-reference to the receipt that produced the artifact.
  pub receipt_hash: String,
  pub version:      String,
  /// Blob key, conventionally `<cid>.json`.
  pub storage_path: String,
}
