//! Runtime settings, deserialised from `tvfi.toml` and `TVFI_*` variables.

use std::path::PathBuf;

use chrono::TimeDelta;
use serde::Deserialize;
use tvfi_core::cid::CidScheme;

use crate::{Error, IngestOptions, ReconcileOptions, Result};

fn default_true() -> bool { true }

fn default_public_delay_days() -> u32 { 7 }

/// Upper bound on `public_delay_days`: one hundred years.
pub const MAX_PUBLIC_DELAY_DAYS: u32 = 36_500;

/// Upper bound on `reconcile.grace_secs`: one hundred years.
pub const MAX_GRACE_SECS: u64 = MAX_PUBLIC_DELAY_DAYS as u64 * 86_400;

/// Top-level settings. `store_path` and `blob_dir` have no defaults; an empty
/// value is caught by [`Settings::validate`].
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  #[serde(default)]
  pub store_path:         PathBuf,
  #[serde(default)]
  pub blob_dir:           PathBuf,
  #[serde(default)]
  pub cid_scheme:         CidScheme,
  /// Visibility of receipts on first insert.
  #[serde(default = "default_true")]
  pub visible_by_default: bool,
  /// Age a receipt must reach before the public feed shows it.
  #[serde(default = "default_public_delay_days")]
  pub public_delay_days:  u32,
  #[serde(default)]
  pub reconcile:          ReconcileSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
  pub page_size:    usize,
  pub delete_batch: usize,
  pub grace_secs:   u64,
}

impl Default for ReconcileSettings {
  fn default() -> Self {
    Self {
      page_size:    1000,
      delete_batch: 100,
      grace_secs:   300,
    }
  }
}

impl Settings {
  /// Reject settings that would let a command start partial work.
  pub fn validate(&self) -> Result<()> {
    if self.store_path.as_os_str().is_empty() {
      return Err(Error::Misconfigured("store_path is not set".into()));
    }
    if self.blob_dir.as_os_str().is_empty() {
      return Err(Error::Misconfigured("blob_dir is not set".into()));
    }
    if self.reconcile.page_size == 0 {
      return Err(Error::Misconfigured("reconcile.page_size must be positive".into()));
    }
    if self.reconcile.delete_batch == 0 {
      return Err(Error::Misconfigured("reconcile.delete_batch must be positive".into()));
    }
    if self.public_delay_days > MAX_PUBLIC_DELAY_DAYS {
      return Err(Error::Misconfigured(format!(
        "public_delay_days must be at most {MAX_PUBLIC_DELAY_DAYS}, got {}",
        self.public_delay_days
      )));
    }
    if self.reconcile.grace_secs > MAX_GRACE_SECS {
      return Err(Error::Misconfigured(format!(
        "reconcile.grace_secs must be at most {MAX_GRACE_SECS}, got {}",
        self.reconcile.grace_secs
      )));
    }
    Ok(())
  }

  pub fn ingest_options(&self) -> IngestOptions {
    IngestOptions {
      cid_scheme:         self.cid_scheme,
      visible_by_default: self.visible_by_default,
    }
  }

  pub fn reconcile_options(&self, dry_run: bool) -> Result<ReconcileOptions> {
    let grace = i64::try_from(self.reconcile.grace_secs)
      .ok()
      .and_then(TimeDelta::try_seconds)
      .ok_or_else(|| {
        Error::Misconfigured(format!(
          "reconcile.grace_secs out of range: {}",
          self.reconcile.grace_secs
        ))
      })?;
    Ok(ReconcileOptions {
      page_size: self.reconcile.page_size,
      delete_batch: self.reconcile.delete_batch,
      grace,
      dry_run,
    })
  }
}
