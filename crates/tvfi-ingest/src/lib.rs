//! The frontier receipt pipeline.
//!
//! Every stage is generic over [`FrontierStore`] and [`BlobStore`]; callers
//! construct the backends once and pass them in.
//!
//! [`FrontierStore`]: tvfi_core::store::FrontierStore
//! [`BlobStore`]: tvfi_core::blob::BlobStore

pub mod config;
pub mod error;
pub mod ingest;
pub mod lens;
pub mod linker;
pub mod query;
pub mod reconcile;
pub mod resolver;

pub use config::Settings;
pub use error::{Error, Result};
pub use ingest::{IngestOptions, IngestReport, ingest_batch};
pub use reconcile::{ReconcileOptions, ReconcileReport, reconcile_orphans};

#[cfg(test)]
mod tests;
