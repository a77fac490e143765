//! Slugs and entity mention parsing.

use crate::model::{EntityKind, NewEntity};

/// Lowercase `s`, collapse every run of characters outside `[a-z0-9]` into a
/// single hyphen, and strip leading and trailing hyphens.
///
/// `"Helion Energy, Inc."` → `"helion-energy-inc"`.
pub fn slugify(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  let mut pending_hyphen = false;
  for c in s.trim().to_lowercase().chars() {
    if c.is_ascii_lowercase() || c.is_ascii_digit() {
      if pending_hyphen && !out.is_empty() {
        out.push('-');
      }
      pending_hyphen = false;
      out.push(c);
    } else {
      pending_hyphen = true;
    }
  }
  out
}

/// One entity reference pulled out of a mention list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMention {
  pub name: String,
  pub slug: String,
  pub kind: EntityKind,
}

impl EntityMention {
  /// Parse a single `Name` or `Name:kind` mention. `None` when the name has
  /// no slug-able characters.
  pub fn parse(raw: &str) -> Option<Self> {
    let mut parts = raw.split(':');
    let name = parts.next().unwrap_or_default().trim();
    let kind = EntityKind::from_tag(parts.next().unwrap_or_default());
    let slug = slugify(name);
    (!slug.is_empty()).then(|| Self { name: name.to_owned(), slug, kind })
  }

  pub fn to_new_entity(&self) -> NewEntity {
    NewEntity {
      slug: self.slug.clone(),
      name: self.name.clone(),
      kind: self.kind,
    }
  }
}

/// Split a comma-separated mention list. Empty items and items without a
/// usable name are dropped; duplicates are kept (the resolver dedups).
pub fn parse_mentions(list: &str) -> Vec<EntityMention> {
  list
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .filter_map(EntityMention::parse)
    .collect()
}
