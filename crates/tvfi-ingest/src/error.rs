//! Error type for `tvfi-ingest`.

use thiserror::Error;
use tvfi_core::cid::ContentId;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("store error in {op} ({key}): {source}")]
  Store {
    op:     &'static str,
    key:    String,
    #[source]
    source: BoxError,
  },

  #[error("blob error in {op} ({key}): {source}")]
  Blob {
    op:     &'static str,
    key:    String,
    #[source]
    source: BoxError,
  },

  #[error("core error: {0}")]
  Core(#[from] tvfi_core::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("entity not found: {0}")]
  EntityNotFound(String),

  #[error("analysis not found: {0}")]
  AnalysisNotFound(ContentId),

  #[error("unknown lens: {0:?}")]
  UnknownLens(String),

  /// An entity was neither returned by the upsert nor found afterwards.
  #[error("entity {0:?} could not be resolved after upsert")]
  EntityUnresolved(String),

  #[error("misconfigured: {0}")]
  Misconfigured(String),
}

impl Error {
  /// `map_err` adapter for relational store failures.
  pub(crate) fn store<E>(op: &'static str, key: impl Into<String>) -> impl FnOnce(E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    let key = key.into();
    move |e| Self::Store { op, key, source: Box::new(e) }
  }

  /// `map_err` adapter for blob store failures.
  pub(crate) fn blob<E>(op: &'static str, key: impl Into<String>) -> impl FnOnce(E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    let key = key.into();
    move |e| Self::Blob { op, key, source: Box::new(e) }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
