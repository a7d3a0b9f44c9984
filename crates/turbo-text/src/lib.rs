//! turbo-text
//!
//! Tantivy-backed lexical index for one shard. `ShardTextIndex` is created
//! fresh at ingestion time, written in batches by a single shard writer,
//! and later reopened read-only by the shard node for scored search.

pub mod index;
pub mod tantivy_utils;

pub use index::ShardTextIndex;
