//! Error types for `tvfi-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown frontier: {0:?}")]
  UnknownFrontier(String),

  #[error("missing required field: {0}")]
  MissingField(&'static str),

  #[error("input is missing required columns: {0:?}")]
  MissingColumns(Vec<&'static str>),

  #[error("invalid content identifier: {0:?}")]
  InvalidContentId(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
