//! Content identifiers for analysis artifacts.
//!
//! A content identifier is derived from the canonical byte serialisation of an
//! artifact's stable subset: JSON with object keys sorted by their UTF-8 bytes
//! and no insignificant whitespace. The same logical content always yields the
//! same bytes and therefore the same identifier.

use std::{fmt, str::FromStr};

use ::cid::Cid;
use multihash_codetable::{Code, MultihashDigest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Multicodec code for DAG-JSON.
pub const DAG_JSON_CODEC: u64 = 0x0129;

/// Prefix of identifiers produced by [`CidScheme::Sha256Hex`].
pub const SHA256_HEX_PREFIX: &str = "sha256-";

/// Suffix of every artifact's blob key.
pub const STORAGE_SUFFIX: &str = ".json";

// ─── Scheme ──────────────────────────────────────────────────────────────────

/// How the canonical bytes are turned into an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CidScheme {
  /// CIDv1, DAG-JSON codec, SHA2-256 multihash, base32 text (`bagu…`).
  #[default]
  DagJson,
  /// `sha256-` followed by the hex digest.
  Sha256Hex,
}

impl CidScheme {
  /// The scheme an existing identifier was produced with.
  pub fn detect(cid: &ContentId) -> Self {
    if cid.as_str().starts_with(SHA256_HEX_PREFIX) {
      Self::Sha256Hex
    } else {
      Self::DagJson
    }
  }

  pub fn derive(&self, bytes: &[u8]) -> ContentId {
    match self {
      Self::DagJson => {
        let hash = Code::Sha2_256.digest(bytes);
        ContentId(Cid::new_v1(DAG_JSON_CODEC, hash).to_string())
      }
      Self::Sha256Hex => {
        ContentId(format!("{SHA256_HEX_PREFIX}{}", hex::encode(Sha256::digest(bytes))))
      }
    }
  }
}

// ─── ContentId ───────────────────────────────────────────────────────────────

/// A content identifier in its text form.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
  /// Accept an identifier produced by either scheme. CIDs must parse;
  /// `sha256-` identifiers must carry a 64-character hex digest.
  pub fn parse(s: &str) -> Result<Self> {
    let s = s.trim();
    if let Some(digest) = s.strip_prefix(SHA256_HEX_PREFIX) {
      if digest.len() == 64 && digest.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Ok(Self(s.to_owned()));
      }
      return Err(Error::InvalidContentId(s.to_owned()));
    }
    Cid::try_from(s)
      .map(|_| Self(s.to_owned()))
      .map_err(|_| Error::InvalidContentId(s.to_owned()))
  }

  /// Wrap a stored value without validation; for rows read back from a
  /// backend that only ever stored derived identifiers.
  pub fn from_stored(s: String) -> Self { Self(s) }

  pub fn as_str(&self) -> &str { &self.0 }

  /// Blob key of the artifact: `<cid>.json`.
  pub fn storage_path(&self) -> String { format!("{}{STORAGE_SUFFIX}", self.0) }

  /// Inverse of [`storage_path`](Self::storage_path). `None` for keys that are
  /// not artifact blobs.
  pub fn from_storage_key(key: &str) -> Option<Self> {
    key
      .strip_suffix(STORAGE_SUFFIX)
      .filter(|stem| !stem.is_empty())
      .map(|stem| Self(stem.to_owned()))
  }
}

impl FromStr for ContentId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::parse(s) }
}

impl fmt::Display for ContentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── Canonical encoding ──────────────────────────────────────────────────────

/// Serialise `value` deterministically: keys sorted bytewise at every level,
/// no whitespace. Independent of `serde_json`'s map ordering features.
pub fn canonical_bytes(value: &Value) -> Result<Vec<u8>> {
  let mut out = Vec::new();
  write_canonical(value, &mut out)?;
  Ok(out)
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) -> Result<()> {
  match value {
    Value::Object(map) => {
      let mut entries: Vec<(&String, &Value)> = map.iter().collect();
      entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
      out.push(b'{');
      for (i, (key, item)) in entries.into_iter().enumerate() {
        if i > 0 {
          out.push(b',');
        }
        serde_json::to_writer(&mut *out, key)?;
        out.push(b':');
        write_canonical(item, out)?;
      }
      out.push(b'}');
    }
    Value::Array(items) => {
      out.push(b'[');
      for (i, item) in items.iter().enumerate() {
        if i > 0 {
          out.push(b',');
        }
        write_canonical(item, out)?;
      }
      out.push(b']');
    }
    scalar => serde_json::to_writer(&mut *out, scalar)?,
  }
  Ok(())
}

/// Canonical bytes of any serialisable value.
pub fn canonical_bytes_of<T: Serialize>(value: &T) -> Result<Vec<u8>> {
  canonical_bytes(&serde_json::to_value(value)?)
}
