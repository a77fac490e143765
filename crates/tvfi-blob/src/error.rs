//! Error type for `tvfi-blob`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("i/o error on {key:?}: {source}")]
  Io {
    key:    String,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid blob key: {0:?}")]
  InvalidKey(String),

  #[error("blob already exists: {0:?}")]
  AlreadyExists(String),

  #[error("delete batch of {len} keys exceeds the limit of {max}")]
  BatchTooLarge { len: usize, max: usize },
}

impl Error {
  pub(crate) fn io(key: impl Into<String>) -> impl FnOnce(std::io::Error) -> Self {
    let key = key.into();
    move |source| Self::Io { key, source }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
