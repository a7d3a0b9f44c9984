//! turbo-hybrid
//!
//! Hybrid ranking for one shard (lexical candidates reranked with vector
//! similarity) and the score-ordered merge the gateway applies across shards.

pub mod executor;
pub mod merge;

pub use executor::{dot, hybrid_score, ShardQueryExecutor};
pub use merge::merge_hits;
