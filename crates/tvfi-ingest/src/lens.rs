//! Deterministic entity lenses: short cited summaries over an entity's
//! receipts.

use std::{cmp::Ordering, str::FromStr};

use serde::Serialize;
use tvfi_core::{canon::format_iso, model::Receipt};

use crate::Error;

pub const NOT_ENOUGH_RECEIPTS: &str = "Not enough receipts.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityLens {
  /// Technical progress and bottlenecks.
  EngineerRealist,
  /// Funding and partnerships.
  MarketMapper,
}

impl EntityLens {
  pub fn name(&self) -> &'static str {
    match self {
      Self::EngineerRealist => "engineer-realist",
      Self::MarketMapper => "market-mapper",
    }
  }

  /// How many of the newest receipts the lens cites.
  pub fn max_items(&self) -> usize {
    match self {
      Self::EngineerRealist => 5,
      Self::MarketMapper => 4,
    }
  }

  fn line(&self, r: &Receipt, citation: &str) -> String {
    match self {
      Self::EngineerRealist => format!("{} — {} [{citation}]", r.title, r.source),
      Self::MarketMapper => format!("{}: {} [{citation}]", r.source, r.title),
    }
  }
}

impl FromStr for EntityLens {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "engineer-realist" => Ok(Self::EngineerRealist),
      "market-mapper" => Ok(Self::MarketMapper),
      other => Err(Error::UnknownLens(other.to_owned())),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
  #[serde(rename = "ref")]
  pub reference: String,
  pub title:     String,
  pub url:       String,
  pub source:    String,
  pub date:      String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LensView {
  pub entity:    String,
  pub lens:      &'static str,
  pub answer:    String,
  pub citations: Vec<Citation>,
}

/// Render `lens` over `receipts`. Receipts are ordered by `published_at`
/// then `hash`, and the last [`max_items`](EntityLens::max_items) are cited
/// as `R1..Rn`.
pub fn render(lens: EntityLens, entity: &str, receipts: &[Receipt]) -> LensView {
  let mut sorted: Vec<&Receipt> = receipts.iter().collect();
  sorted.sort_by(|a, b| match a.published_at.cmp(&b.published_at) {
    Ordering::Equal => a.hash.cmp(&b.hash),
    other => other,
  });
  let take = &sorted[sorted.len().saturating_sub(lens.max_items())..];

  if take.is_empty() {
    return LensView {
      entity:    entity.to_owned(),
      lens:      lens.name(),
      answer:    NOT_ENOUGH_RECEIPTS.to_owned(),
      citations: Vec::new(),
    };
  }

  let mut lines = Vec::with_capacity(take.len());
  let mut citations = Vec::with_capacity(take.len());
  for (i, r) in take.iter().enumerate() {
    let reference = format!("R{}", i + 1);
    lines.push(lens.line(r, &reference));
    citations.push(Citation {
      reference,
      title: r.title.clone(),
      url: r.url.clone(),
      source: r.source.clone(),
      date: format_iso(r.published_at),
    });
  }

  LensView {
    entity: entity.to_owned(),
    lens: lens.name(),
    answer: lines.join("\n"),
    citations,
  }
}
