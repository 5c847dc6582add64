//! Core types and trait definitions for the Knowledge Canvas project store.
//!
//! This crate is deliberately free of runtime, HTTP and database
//! dependencies. It holds the data model, the contracts the repository
//! consumes (key/value store, identifier source, knowledge-source factory),
//! and the pure algorithms that operate on the model: tree materialisation,
//! source sorting, and merge semantics for update requests.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod factory;
pub mod id;
pub mod merge;
pub mod project;
pub mod sort;
pub mod source;
pub mod store;
pub mod tree;

pub use error::{Error, Result};
pub use id::{Id, IdSource};
