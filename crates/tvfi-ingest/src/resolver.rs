//! Entity resolution: mentions → storage ids, in one batch.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;
use tvfi_core::{slug::EntityMention, store::FrontierStore};
use uuid::Uuid;

use crate::{Error, Result};

/// Slug → entity id.
pub type EntityIds = BTreeMap<String, Uuid>;

/// Upsert every distinct mentioned entity and return the id of each slug.
///
/// Mentions are deduplicated by slug; the first occurrence decides name and
/// kind. Slugs the upsert did not echo back are looked up afterwards. Any
/// store failure, or a slug that still cannot be found, fails the call.
pub async fn resolve_entities<S: FrontierStore>(
  store: &S,
  mentions: &[EntityMention],
) -> Result<EntityIds> {
  let mut seen = HashSet::new();
  let distinct: Vec<_> = mentions
    .iter()
    .filter(|m| seen.insert(m.slug.as_str()))
    .map(EntityMention::to_new_entity)
    .collect();
  if distinct.is_empty() {
    return Ok(EntityIds::new());
  }
  let wanted: Vec<String> = distinct.iter().map(|e| e.slug.clone()).collect();

  let mut ids: EntityIds = store
    .upsert_entities(distinct)
    .await
    .map_err(Error::store("upsert_entities", format!("{} entities", wanted.len())))?
    .into_iter()
    .map(|e| (e.slug, e.id))
    .collect();

  let missing: Vec<String> = wanted
    .iter()
    .filter(|s| !ids.contains_key(*s))
    .cloned()
    .collect();
  if !missing.is_empty() {
    debug!(count = missing.len(), "looking up entities omitted by upsert");
    let found = store
      .entities_by_slugs(missing.clone())
      .await
      .map_err(Error::store("entities_by_slugs", missing.join(",")))?;
    ids.extend(found.into_iter().map(|e| (e.slug, e.id)));
  }

  if let Some(slug) = wanted.iter().find(|s| !ids.contains_key(*s)) {
    return Err(Error::EntityUnresolved(slug.clone()));
  }
  Ok(ids)
}
