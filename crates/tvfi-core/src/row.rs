//! Typed input row schema.
//!
//! Tabular sources hand us rows keyed by free-form column names. This module
//! maps those names onto a fixed [`Column`] set, checks that the required
//! columns exist at all, and turns each row into a canonical [`IngestRow`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  canon::{canonical_published_at, canonical_title, canonical_url, source_label},
  identity::identity_hash,
  model::{Frontier, NewReceipt},
  slug::{EntityMention, parse_mentions},
};

/// A raw row as read from a tabular source: header name → cell text.
pub type RawRow = BTreeMap<String, String>;

// ─── Columns ─────────────────────────────────────────────────────────────────

/// The columns the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
  Title,
  Link,
  Date,
  Frontier,
  Entities,
  Summary,
  Technical,
  Market,
  Regulatory,
  Sentiment,
}

impl Column {
  pub const REQUIRED: [Column; 3] = [Self::Title, Self::Link, Self::Frontier];

  /// Accepted header names, in lookup priority order.
  pub fn aliases(&self) -> &'static [&'static str] {
    match self {
      Self::Title => &["Title"],
      Self::Link => &["Source / Link", "Source/Link", "Link", "URL"],
      Self::Date => &["Date (YYYY-MM)", "Date"],
      Self::Frontier => &["Frontier"],
      Self::Entities => &["Entities (comma-separated)", "Entities"],
      Self::Summary => &["Summary (1–2 sentences)", "Summary (1-2 sentences)", "Summary"],
      Self::Technical => &["Technical Intelligence"],
      Self::Market => &["Market Intelligence"],
      Self::Regulatory => &["Regulatory Intelligence"],
      Self::Sentiment => &["Sentiment (tone + confidence)", "Sentiment"],
    }
  }

  pub fn name(&self) -> &'static str { self.aliases()[0] }

  /// Whether any alias of this column appears among `headers`.
  pub fn present_in<'a>(&self, mut headers: impl Iterator<Item = &'a str>) -> bool {
    headers.any(|h| self.matches_header(h))
  }

  fn matches_header(&self, header: &str) -> bool {
    let header = header.trim();
    self.aliases().iter().any(|a| a.eq_ignore_ascii_case(header))
  }
}

/// Fail closed when a source lacks any required column.
pub fn check_headers<'a>(headers: impl IntoIterator<Item = &'a str> + Clone) -> Result<()> {
  let missing: Vec<&'static str> = Column::REQUIRED
    .iter()
    .filter(|c| !c.present_in(headers.clone().into_iter()))
    .map(Column::name)
    .collect();
  if missing.is_empty() {
    Ok(())
  } else {
    Err(Error::MissingColumns(missing))
  }
}

/// First non-empty trimmed cell among the column's aliases, or `""`.
pub fn cell(raw: &RawRow, column: Column) -> &str {
  column
    .aliases()
    .iter()
    .find_map(|alias| {
      raw
        .iter()
        .find(|(k, _)| k.trim().eq_ignore_ascii_case(alias))
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
    })
    .unwrap_or_default()
}

// ─── Typed row ───────────────────────────────────────────────────────────────

/// A validated, canonicalised input row.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestRow {
  pub title:          String,
  /// Canonical URL.
  pub url:            String,
  pub published_at:   DateTime<Utc>,
  pub frontier:       Frontier,
  /// Entity mentions parsed from the entities column.
  pub mentions:       Vec<EntityMention>,
  pub summary:        String,
  pub technical:      String,
  pub market:         String,
  pub regulatory:     String,
  pub sentiment_text: String,
}

impl IngestRow {
  /// Validate and canonicalise a raw row. Title, link and frontier must be
  /// non-empty; the frontier must belong to the closed vocabulary.
  pub fn from_raw(raw: &RawRow) -> Result<Self> {
    let title = canonical_title(cell(raw, Column::Title)).ok_or(Error::MissingField("title"))?;
    let link = cell(raw, Column::Link);
    if link.is_empty() {
      return Err(Error::MissingField("url"));
    }
    let frontier = cell(raw, Column::Frontier);
    if frontier.is_empty() {
      return Err(Error::MissingField("frontier"));
    }

    Ok(Self {
      title,
      url: canonical_url(link),
      published_at: canonical_published_at(cell(raw, Column::Date)),
      frontier: frontier.parse()?,
      mentions: parse_mentions(cell(raw, Column::Entities)),
      summary: cell(raw, Column::Summary).to_owned(),
      technical: cell(raw, Column::Technical).to_owned(),
      market: cell(raw, Column::Market).to_owned(),
      regulatory: cell(raw, Column::Regulatory).to_owned(),
      sentiment_text: cell(raw, Column::Sentiment).to_owned(),
    })
  }

  /// Title for log lines, even when validation failed.
  pub fn raw_title(raw: &RawRow) -> &str { cell(raw, Column::Title) }

  pub fn identity_hash(&self) -> String {
    identity_hash(&self.url, self.published_at, &self.title)
  }

  pub fn to_new_receipt(&self, visible: bool) -> NewReceipt {
    NewReceipt {
      hash: self.identity_hash(),
      source: source_label(&self.url),
      title: self.title.clone(),
      url: self.url.clone(),
      published_at: self.published_at,
      frontier: self.frontier,
      summary: self.summary.clone(),
      visible,
    }
  }
}
