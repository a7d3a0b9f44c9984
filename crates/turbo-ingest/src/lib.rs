//! turbo-ingest
//!
//! Concurrent build pipeline that turns a newline-delimited JSON corpus into
//! persisted shards:
//!
//! ```text
//! source ──jobs──▶ embedding workers ──prepared──▶ router ──per-shard──▶ shard writers
//! ```
//!
//! Every arrow is a bounded queue, so a slow stage throttles everything
//! upstream of it. Closing propagates left to right: the source closes the
//! job queue, the last worker to exit closes the prepared queue, and the
//! router closes every shard queue once it has drained. Each shard writer is
//! the only thread touching its shard's state.

pub mod driver;
pub mod pipeline;
pub mod router;
pub mod source;
pub mod worker;
pub mod writer;

pub use driver::{ingest_corpus, open_shard_writers, persist_shards};
pub use pipeline::{IngestReport, Pipeline, PipelineConfig, PipelineOutput};
pub use worker::RetryPolicy;
pub use writer::{ShardSummary, ShardWriter};
