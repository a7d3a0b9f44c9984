use crate::error::Result;
use crate::types::{LexicalHit, TextEntry};

/// Text → fixed-dimension, L2-normalized vector.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_text(&self, text: &str) -> Result<Vec<f32>>;
}

/// Write side of a shard's lexical index. Owned by exactly one shard writer.
pub trait TextIndexWriter: Send {
    /// Persist a batch of entries and make them durable.
    fn flush(&mut self, batch: &[TextEntry]) -> Result<()>;
    /// Release the underlying writer. Further flushes fail.
    fn close(&mut self) -> Result<()>;
}

/// Read side of a shard's lexical index, shared across concurrent requests.
pub trait TextSearcher: Send + Sync {
    /// Top `window` lexical candidates for `query`, best first.
    fn search(&self, query: &str, window: usize) -> Result<Vec<LexicalHit>>;
}
