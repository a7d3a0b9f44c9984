use std::cmp::Ordering;

use turbo_core::types::SearchHit;

/// Combine per-shard hit lists into one list ordered by descending score,
/// keeping at most `top_k`. Scores are taken as already comparable across shards.
pub fn merge_hits(per_shard: Vec<Vec<SearchHit>>, top_k: usize) -> Vec<SearchHit> {
    let mut merged: Vec<SearchHit> = per_shard.into_iter().flatten().collect();
    merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    merged.truncate(top_k);
    merged
}
