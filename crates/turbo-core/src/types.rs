//! Domain types shared by the ingestion pipeline, the shard nodes and the gateway.

use serde::{Deserialize, Serialize};

/// Corpus-wide document identifier; also the lexical index document id.
pub type GlobalDocId = String;

/// Per-shard sequential identifier; the slot index into the vector store.
pub type LocalDocId = u32;

/// One newline-delimited JSON record of the source corpus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceDoc {
    pub id: GlobalDocId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
}

impl SourceDoc {
    /// Text handed to the embedding collaborator.
    pub fn embedding_input(&self) -> String {
        format!("{} {}", self.title, self.text)
    }
}

/// A document after embedding, ready to be routed to its shard.
#[derive(Debug, Clone)]
pub struct PreparedDoc {
    pub global_id: GlobalDocId,
    pub title: String,
    pub text: String,
    pub vector: Vec<f32>,
}

/// Stored fields of one lexical index entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEntry {
    pub id: GlobalDocId,
    pub title: String,
    pub text: String,
}

/// A lexical candidate returned by the text index. Higher score is better.
#[derive(Debug, Clone)]
pub struct LexicalHit {
    pub id: GlobalDocId,
    pub score: f32,
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    /// Values `<= 0` select the server default.
    #[serde(default)]
    pub top_k: i64,
}

impl SearchRequest {
    /// Requested hit count: `default_top_k` when not positive, never above `max_top_k`.
    pub fn effective_top_k(&self, default_top_k: usize, max_top_k: usize) -> usize {
        let requested = usize::try_from(self.top_k)
            .ok()
            .filter(|k| *k > 0)
            .unwrap_or(default_top_k);
        requested.min(max_top_k)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub doc_id: GlobalDocId,
    pub score: f64,
    pub shard_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
}
