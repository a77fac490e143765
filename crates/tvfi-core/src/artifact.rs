//! Analysis artifacts.
//!
//! An [`Artifact`] is the structured analysis of one receipt. Its canonical
//! subset (everything except lens timestamps) feeds the content identifier.
//! The stored blob is a [`StoredArtifact`]: the artifact plus echoed
//! decorations (receipt hash, identifier, storage path) that never influence
//! the identifier.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  canon::format_iso,
  cid::{CidScheme, ContentId, canonical_bytes_of},
  model::{Analysis, Frontier},
  row::IngestRow,
  score::{Scorer, Sentiment},
};

/// Schema version of the artifact body.
pub const ARTIFACT_VERSION: &str = "v1";

/// Confidence attached to every entity link pulled from a mention list.
pub const MENTION_LINK_CONFIDENCE: f64 = 0.8;

/// The lens generated for every artifact.
pub const ENGINEER_REALIST: &str = "engineer-realist";

// ─── Body ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMeta {
  pub title:        String,
  pub url:          String,
  /// Canonical ISO form, e.g. `2024-03-01T00:00:00.000Z`.
  pub published_at: String,
  pub frontier:     Frontier,
  /// Entity names as mentioned.
  pub entities:     Vec<String>,
  pub summary:      String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityLink {
  pub slug:       String,
  pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Notes {
  pub notes: String,
}

/// A generated textual view with inline `[R#]` citations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LensOutput {
  pub output:      String,
  pub citations:   Vec<String>,
  /// Wall-clock time of generation. Not part of the canonical subset.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub computed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
  pub version:      String,
  pub meta:         ArtifactMeta,
  pub entity_links: Vec<EntityLink>,
  pub technical:    Notes,
  pub market:       Notes,
  pub regulatory:   Notes,
  pub sentiment:    Sentiment,
  pub lenses:       BTreeMap<String, LensOutput>,
}

impl Artifact {
  /// Assemble the artifact for a validated row. `computed_at` stamps the
  /// lens outputs only.
  pub fn build(row: &IngestRow, scorer: &dyn Scorer, computed_at: DateTime<Utc>) -> Self {
    let (output, citations) = if row.summary.is_empty() {
      (String::new(), Vec::new())
    } else {
      (format!("{} [R1]", row.summary), vec!["R1".to_owned()])
    };
    let lenses = BTreeMap::from([(ENGINEER_REALIST.to_owned(), LensOutput {
      output,
      citations,
      computed_at: Some(computed_at),
    })]);

    Self {
      version: ARTIFACT_VERSION.to_owned(),
      meta: ArtifactMeta {
        title:        row.title.clone(),
        url:          row.url.clone(),
        published_at: format_iso(row.published_at),
        frontier:     row.frontier,
        entities:     row.mentions.iter().map(|m| m.name.clone()).collect(),
        summary:      row.summary.clone(),
      },
      entity_links: row
        .mentions
        .iter()
        .map(|m| EntityLink {
          slug:       m.slug.clone(),
          confidence: MENTION_LINK_CONFIDENCE,
        })
        .collect(),
      technical: Notes { notes: row.technical.clone() },
      market: Notes { notes: row.market.clone() },
      regulatory: Notes { notes: row.regulatory.clone() },
      sentiment: scorer.sentiment(&row.sentiment_text),
      lenses,
    }
  }

  /// The stable subset: this artifact with every lens timestamp removed.
  pub fn canonical(&self) -> Self {
    let mut out = self.clone();
    for lens in out.lenses.values_mut() {
      lens.computed_at = None;
    }
    out
  }

  /// Canonical bytes of the stable subset.
  pub fn canonical_bytes(&self) -> Result<Vec<u8>> { canonical_bytes_of(&self.canonical()) }

  /// Content identifier of the stable subset under `scheme`.
  pub fn content_id(&self, scheme: CidScheme) -> Result<ContentId> {
    Ok(scheme.derive(&self.canonical_bytes()?))
  }

  /// Attach the echoed decorations for storage.
  pub fn decorate(self, cid: ContentId, receipt_hash: String) -> StoredArtifact {
    StoredArtifact {
      storage_path: cid.storage_path(),
      artifact: self,
      receipt_hash,
      cid,
    }
  }
}

// ─── Stored form ─────────────────────────────────────────────────────────────

/// The blob body: artifact fields at the top level plus decorations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredArtifact {
  #[serde(flatten)]
  pub artifact:     Artifact,
  pub receipt_hash: String,
  #[serde(alias = "id")]
  pub cid:          ContentId,
  pub storage_path: String,
}

impl StoredArtifact {
  pub fn to_bytes(&self) -> Result<Vec<u8>> { Ok(serde_json::to_vec_pretty(self)?) }

  pub fn from_bytes(bytes: &[u8]) -> Result<Self> { Ok(serde_json::from_slice(bytes)?) }

  /// The index row pointing at this blob.
  pub fn analysis(&self) -> Analysis {
    Analysis {
      cid:          self.cid.clone(),
      receipt_hash: self.receipt_hash.clone(),
      version:      self.artifact.version.clone(),
      storage_path: self.storage_path.clone(),
    }
  }
}
