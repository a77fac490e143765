//! Entity ↔ receipt association.

use std::collections::BTreeSet;

use tracing::{debug, warn};
use tvfi_core::{
  model::{EntityReceipt, LinkRole},
  store::FrontierStore,
};

use crate::{Error, Result, resolver::EntityIds};

/// The entity slugs mentioned by one receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptMentions {
  pub hash:  String,
  pub slugs: Vec<String>,
}

/// Upsert one `mentioned` link per distinct (entity, receipt) pair.
///
/// Receipts that do not exist yet are skipped. Returns the number of links
/// created or already present.
pub async fn link_entities<S: FrontierStore>(
  store: &S,
  ids: &EntityIds,
  batch: &[ReceiptMentions],
) -> Result<usize> {
  let mut pairs = BTreeSet::new();
  for item in batch {
    if item.slugs.is_empty() {
      continue;
    }
    let Some(receipt) = store
      .receipt_by_hash(&item.hash)
      .await
      .map_err(Error::store("receipt_by_hash", &item.hash))?
    else {
      debug!(hash = %item.hash, "receipt not found; skipping links");
      continue;
    };
    for slug in &item.slugs {
      match ids.get(slug) {
        Some(&entity_id) => {
          pairs.insert((entity_id, receipt.id));
        }
        None => warn!(slug, hash = %item.hash, "unresolved entity; skipping link"),
      }
    }
  }
  if pairs.is_empty() {
    return Ok(0);
  }

  let links: Vec<EntityReceipt> = pairs
    .into_iter()
    .map(|(entity_id, receipt_id)| EntityReceipt {
      entity_id,
      receipt_id,
      role: LinkRole::Mentioned,
    })
    .collect();
  let count = links.len();
  store
    .upsert_links(links)
    .await
    .map_err(Error::store("upsert_links", format!("{count} links")))?;
  Ok(count)
}
