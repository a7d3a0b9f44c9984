//! turbo-vector
//!
//! Per-shard vector storage. `VectorStore` is a pre-sized, memory-mapped file
//! of fixed-width slots (one little-endian f32 array per local doc id) and
//! `DocMap` ties those local ids back to global document ids.

pub mod docmap;
pub mod store;

pub use docmap::DocMap;
pub use store::VectorStore;
