use std::cmp::Ordering;
use std::sync::Arc;

use turbo_core::config::ShardSettings;
use turbo_core::error::{Error, Result};
use turbo_core::traits::{Embedder, TextSearcher};
use turbo_core::types::{SearchHit, SearchRequest, SearchResponse};
use turbo_vector::{DocMap, VectorStore};

/// Dot product. Equals cosine similarity for unit-length inputs.
pub fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum()
}

/// `weight * norm_lexical + (1 - weight) * (cosine + 1) / 2`.
pub fn hybrid_score(norm_lexical: f64, cosine: f64, lexical_weight: f64) -> f64 {
    let norm_cos = (cosine + 1.0) / 2.0;
    lexical_weight * norm_lexical + (1.0 - lexical_weight) * norm_cos
}

/// Read-only view of one shard that answers search requests. Shared across
/// concurrent requests; nothing here mutates after construction.
pub struct ShardQueryExecutor {
    shard_id: String,
    text: Box<dyn TextSearcher>,
    vectors: VectorStore,
    doc_map: DocMap,
    embedder: Arc<dyn Embedder>,
    rerank_window: usize,
    default_top_k: usize,
    max_top_k: usize,
    lexical_weight: f64,
}

impl ShardQueryExecutor {
    pub fn new(
        text: Box<dyn TextSearcher>,
        vectors: VectorStore,
        doc_map: DocMap,
        embedder: Arc<dyn Embedder>,
        settings: &ShardSettings,
    ) -> Self {
        Self {
            shard_id: settings.id.to_string(),
            text,
            vectors,
            doc_map,
            embedder,
            rerank_window: settings.rerank_window,
            default_top_k: settings.default_top_k,
            max_top_k: settings.max_top_k,
            lexical_weight: settings.lexical_weight,
        }
    }

    pub fn shard_id(&self) -> &str { &self.shard_id }

    pub fn num_docs(&self) -> usize { self.doc_map.len() }

    pub fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let top_k = request.effective_top_k(self.default_top_k, self.max_top_k);
        if request.query.trim().is_empty() {
            tracing::debug!(shard_id = %self.shard_id, "blank query");
            return Ok(SearchResponse::default());
        }

        let query_vec = self.embedder.embed_text(&request.query)?;
        if query_vec.len() != self.vectors.dim() {
            return Err(Error::DimensionMismatch { expected: self.vectors.dim(), got: query_vec.len() });
        }

        let window = self.rerank_window.max(top_k);
        let candidates = self.text.search(&request.query, window)?;
        if candidates.is_empty() {
            return Ok(SearchResponse::default());
        }

        let top_score = candidates.iter().map(|c| f64::from(c.score)).fold(0.0, f64::max);
        let max_lexical = if top_score > 0.0 { top_score } else { 1.0 };

        let mut hits = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let Some(local_id) = self.doc_map.local_id(&candidate.id) else {
                tracing::debug!(shard_id = %self.shard_id, doc_id = %candidate.id, "candidate missing from docmap");
                continue;
            };
            // Out-of-bounds reads are logged by the store.
            let Some(doc_vec) = self.vectors.read(local_id) else { continue };
            let cosine = dot(&query_vec, &doc_vec);
            let norm_lexical = f64::from(candidate.score) / max_lexical;
            hits.push(SearchHit {
                doc_id: candidate.id,
                score: hybrid_score(norm_lexical, cosine, self.lexical_weight),
                shard_id: self.shard_id.clone(),
                title: candidate.title,
                text: candidate.text,
            });
        }

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(top_k);
        Ok(SearchResponse { hits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turbo_core::types::LexicalHit;

    #[test]
    fn hybrid_score_matches_worked_example() {
        assert!((hybrid_score(1.0, 0.8, 0.7) - 0.97).abs() < 1e-9);
        assert!((hybrid_score(0.5, -0.2, 0.7) - 0.47).abs() < 1e-9);
    }

    #[test]
    fn hybrid_score_stays_in_unit_interval() {
        for lex in [0.0, 0.25, 1.0] {
            for cos in [-1.0, 0.0, 1.0] {
                for w in [0.0, 0.7, 1.0] {
                    let s = hybrid_score(lex, cos, w);
                    assert!((0.0..=1.0).contains(&s), "{lex} {cos} {w} -> {s}");
                }
            }
        }
    }

    struct Fixed(Vec<LexicalHit>);

    impl TextSearcher for Fixed {
        fn search(&self, _query: &str, window: usize) -> Result<Vec<LexicalHit>> {
            Ok(self.0.iter().take(window).cloned().collect())
        }
    }

    struct Constant(Vec<f32>);

    impl Embedder for Constant {
        fn dim(&self) -> usize { self.0.len() }
        fn embed_text(&self, _text: &str) -> Result<Vec<f32>> { Ok(self.0.clone()) }
    }

    fn lexical(id: &str, score: f32) -> LexicalHit {
        LexicalHit { id: id.into(), score, title: format!("title {id}"), text: format!("text {id}") }
    }

    /// Two docs whose cosine with the query `[1, 0]` is 0.8 and -0.2.
    fn fixture(dir: &std::path::Path, candidates: Vec<LexicalHit>) -> ShardQueryExecutor {
        let mut vectors = VectorStore::create(&dir.join("v.bin"), 4, 2).unwrap();
        vectors.write(0, &[0.8, 0.6]).unwrap();
        vectors.write(1, &[-0.2, (1.0f32 - 0.04).sqrt()]).unwrap();
        let mut doc_map = DocMap::new();
        doc_map.insert("a".into(), 0);
        doc_map.insert("b".into(), 1);
        doc_map.insert("stale".into(), 9);
        ShardQueryExecutor::new(
            Box::new(Fixed(candidates)),
            vectors,
            doc_map,
            Arc::new(Constant(vec![1.0, 0.0])),
            &ShardSettings::default(),
        )
    }

    #[test]
    fn candidates_are_reranked_with_vector_similarity() {
        let tmp = tempfile::tempdir().unwrap();
        let exec = fixture(tmp.path(), vec![lexical("a", 10.0), lexical("b", 5.0)]);
        let resp = exec.search(&SearchRequest { query: "cats".into(), top_k: 5 }).unwrap();
        assert_eq!(resp.hits.len(), 2);
        assert_eq!(resp.hits[0].doc_id, "a");
        assert!((resp.hits[0].score - 0.97).abs() < 1e-6);
        assert!((resp.hits[1].score - 0.47).abs() < 1e-6);
        assert_eq!(resp.hits[0].shard_id, "0");
        assert_eq!(resp.hits[0].title, "title a");
    }

    #[test]
    fn unresolvable_candidates_are_dropped_not_backfilled() {
        let tmp = tempfile::tempdir().unwrap();
        let exec = fixture(tmp.path(), vec![lexical("unknown", 12.0), lexical("stale", 11.0), lexical("b", 5.0)]);
        let resp = exec.search(&SearchRequest { query: "cats".into(), top_k: 5 }).unwrap();
        let ids: Vec<&str> = resp.hits.iter().map(|h| h.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn zero_lexical_scores_do_not_divide_by_zero() {
        let tmp = tempfile::tempdir().unwrap();
        let exec = fixture(tmp.path(), vec![lexical("a", 0.0), lexical("b", 0.0)]);
        let resp = exec.search(&SearchRequest { query: "cats".into(), top_k: 0 }).unwrap();
        assert_eq!(resp.hits[0].doc_id, "a");
        assert!(resp.hits.iter().all(|h| h.score.is_finite()));
    }

    #[test]
    fn result_is_truncated_to_top_k() {
        let tmp = tempfile::tempdir().unwrap();
        let exec = fixture(tmp.path(), vec![lexical("a", 10.0), lexical("b", 5.0)]);
        let resp = exec.search(&SearchRequest { query: "cats".into(), top_k: 1 }).unwrap();
        assert_eq!(resp.hits.len(), 1);
    }

    #[test]
    fn oversized_top_k_is_clamped() {
        let tmp = tempfile::tempdir().unwrap();
        let exec = fixture(tmp.path(), vec![lexical("a", 10.0), lexical("b", 5.0)]);
        for top_k in [i64::MAX, 1_000_000_000_000] {
            let resp = exec.search(&SearchRequest { query: "cats".into(), top_k }).unwrap();
            assert_eq!(resp.hits.len(), 2);
        }
    }

    #[test]
    fn no_candidates_means_empty_hits() {
        let tmp = tempfile::tempdir().unwrap();
        let exec = fixture(tmp.path(), Vec::new());
        assert!(exec.search(&SearchRequest { query: "cats".into(), top_k: 5 }).unwrap().hits.is_empty());
    }

    #[test]
    fn query_vector_of_wrong_dimension_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let mut exec = fixture(tmp.path(), vec![lexical("a", 1.0)]);
        exec.embedder = Arc::new(Constant(vec![1.0, 0.0, 0.0]));
        let err = exec.search(&SearchRequest { query: "cats".into(), top_k: 5 }).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 2, got: 3 }));
    }
}
