//! Receipt identity hashing.
//!
//! The identity of a receipt is a SHA-256 digest over a namespaced,
//! `|`-delimited string of its canonical URL, canonical published timestamp
//! and trimmed title:
//!
//! ```text
//! sha256("tvfi:v1|" + url + "|" + published_at + "|" + title)
//! ```
//!
//! Every producer and consumer must use this exact formula. A future change to
//! the canonicalisation rules must bump [`IDENTITY_NAMESPACE`] so old and new
//! hashes never collide.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::canon::{canonical_published_at, canonical_title, canonical_url, format_iso};

/// Namespace and schema version prefixed to every identity string.
pub const IDENTITY_NAMESPACE: &str = "tvfi:v1";

/// Hex-encoded identity hash of already-canonical fields.
pub fn identity_hash(url: &str, published_at: DateTime<Utc>, title: &str) -> String {
  let mut hasher = Sha256::new();
  let published_at = format_iso(published_at);
  hasher.update(IDENTITY_NAMESPACE.as_bytes());
  for part in [url, published_at.as_str(), title] {
    hasher.update(b"|");
    hasher.update(part.as_bytes());
  }
  hex::encode(hasher.finalize())
}

/// The canonical identity fields of a receipt together with their hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptIdentity {
  pub hash:         String,
  pub url:          String,
  pub published_at: DateTime<Utc>,
  pub title:        String,
}

impl ReceiptIdentity {
  /// Canonicalise raw fields and hash them. `None` when the title is empty.
  pub fn from_raw(url: &str, date: &str, title: &str) -> Option<Self> {
    let title = canonical_title(title)?;
    let url = canonical_url(url.trim());
    let published_at = canonical_published_at(date);
    Some(Self {
      hash: identity_hash(&url, published_at, &title),
      url,
      published_at,
      title,
    })
  }
}
