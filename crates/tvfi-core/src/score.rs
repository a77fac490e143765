//! Heuristic "intelligence" scoring.
//!
//! [`KeywordScorer`] is keyword and pattern matching over free text. It sits
//! behind the [`Scorer`] trait so a real model can replace it without touching
//! the pipeline.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::Scores;

// ─── Sentiment ───────────────────────────────────────────────────────────────

/// Overall tone of a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
  #[default]
  Positive,
  Mixed,
  Cautious,
  Neutral,
}

/// Tone plus an optional confidence in `[0, 1]`. An absent confidence means
/// none was stated, which is different from zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sentiment {
  pub overall:    Tone,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub confidence: Option<f64>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

pub trait Scorer: Send + Sync {
  /// Judge the tone of a free-text sentiment column.
  fn sentiment(&self, text: &str) -> Sentiment;

  /// Novelty in `[0, 1]` from technical notes.
  fn novelty(&self, technical: &str) -> f64;

  /// Impact in `[0, 1]` from market notes.
  fn impact(&self, market: &str) -> f64;

  fn scores(&self, technical: &str, market: &str) -> Scores {
    Scores {
      novelty: self.novelty(technical),
      impact:  self.impact(market),
    }
  }
}

// ─── Keyword implementation ──────────────────────────────────────────────────

static RE_CONFIDENCE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"([01]\.\d+|\b0?\.\d+\b|\b1(?:\.0+)?\b|\b0(?:\.0+)?\b)")
    .expect("valid confidence regex")
});
static RE_NOVEL: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)breakthrough|first|novel|prototype").expect("valid novelty regex")
});
static RE_IMPACT: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)high|partnership|funding|tvl|contract|ppa|approval")
    .expect("valid impact regex")
});

pub const NOVELTY_HIT: f64 = 0.8;
pub const NOVELTY_BASE: f64 = 0.6;
pub const IMPACT_HIT: f64 = 0.75;
pub const IMPACT_BASE: f64 = 0.6;

/// Substring and regex heuristics. Text without a tone keyword reads as
/// positive.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordScorer;

impl Scorer for KeywordScorer {
  fn sentiment(&self, text: &str) -> Sentiment {
    let low = text.to_lowercase();
    let overall = if low.contains("mixed") {
      Tone::Mixed
    } else if low.contains("cautious") {
      Tone::Cautious
    } else if low.contains("neutral") {
      Tone::Neutral
    } else {
      Tone::Positive
    };
    let confidence = RE_CONFIDENCE
      .captures(&low)
      .and_then(|c| c[1].parse::<f64>().ok())
      .map(|v| v.clamp(0.0, 1.0));
    Sentiment { overall, confidence }
  }

  fn novelty(&self, technical: &str) -> f64 {
    if RE_NOVEL.is_match(technical) { NOVELTY_HIT } else { NOVELTY_BASE }
  }

  fn impact(&self, market: &str) -> f64 {
    if RE_IMPACT.is_match(market) { IMPACT_HIT } else { IMPACT_BASE }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tone_keywords_in_priority_order() {
    let s = KeywordScorer;
    assert_eq!(s.sentiment("Mixed but cautious").overall, Tone::Mixed);
    assert_eq!(s.sentiment("Cautious optimism").overall, Tone::Cautious);
    assert_eq!(s.sentiment("neutral").overall, Tone::Neutral);
    assert_eq!(s.sentiment("Bullish").overall, Tone::Positive);
    assert_eq!(s.sentiment("").overall, Tone::Positive);
  }

  #[test]
  fn confidence_is_extracted_and_clamped() {
    let s = KeywordScorer;
    assert_eq!(s.sentiment("Positive (0.85)").confidence, Some(0.85));
    assert_eq!(s.sentiment("cautious, conf 0.7").confidence, Some(0.7));
    assert_eq!(s.sentiment("confidence 1").confidence, Some(1.0));
    assert_eq!(s.sentiment("1.75 sure").confidence, Some(1.0));
  }

  #[test]
  fn missing_confidence_is_none_not_zero() {
    let s = KeywordScorer;
    assert_eq!(s.sentiment("Positive").confidence, None);
    assert_eq!(s.sentiment("up 25%").confidence, None);
  }

  #[test]
  fn novelty_and_impact_thresholds() {
    let s = KeywordScorer;
    assert_eq!(s.novelty("First net-energy PROTOTYPE"), NOVELTY_HIT);
    assert_eq!(s.novelty("incremental improvement"), NOVELTY_BASE);
    assert_eq!(s.impact("Signed a PPA with Microsoft"), IMPACT_HIT);
    assert_eq!(s.impact(""), IMPACT_BASE);
  }

  #[test]
  fn confidence_is_omitted_from_json_when_absent() {
    let json = serde_json::to_string(&Sentiment { overall: Tone::Neutral, confidence: None }).unwrap();
    assert_eq!(json, r#"{"overall":"neutral"}"#);
  }
}
