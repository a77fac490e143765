//! Core types and pure pipeline stages for the frontier receipt store.
//!
//! This crate turns loosely structured input rows into canonical receipts and
//! content-addressed analysis artifacts. It is deliberately free of database,
//! filesystem and network dependencies; backends implement the traits in
//! [`store`] and [`blob`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod artifact;
pub mod blob;
pub mod canon;
pub mod cid;
pub mod error;
pub mod identity;
pub mod model;
pub mod row;
pub mod score;
pub mod slug;
pub mod store;

pub use error::{Error, Result};
