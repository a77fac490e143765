//! Blob backends for analysis artifacts.
//!
//! [`FsBlobStore`] keeps one file per key under a root directory.
//! [`MemoryBlobStore`] keeps everything in a map and is meant for tests.

mod fs;
mod memory;

pub mod error;

pub use error::{Error, Result};
pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

/// Upper bound on keys accepted by a single delete call.
pub const MAX_DELETE_KEYS: usize = 1000;

/// Keys are flat object names: non-empty, no path separators, no leading dot.
pub(crate) fn check_key(key: &str) -> Result<()> {
  let bad = key.is_empty()
    || key.starts_with('.')
    || key.contains(['/', '\\'])
    || key.contains('\0');
  if bad { Err(Error::InvalidKey(key.to_owned())) } else { Ok(()) }
}

pub(crate) fn check_batch(len: usize) -> Result<()> {
  if len > MAX_DELETE_KEYS {
    Err(Error::BatchTooLarge { len, max: MAX_DELETE_KEYS })
  } else {
    Ok(())
  }
}
