use std::sync::atomic::Ordering;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use turbo_core::config::IngestSettings;
use turbo_core::error::{Error, Result};
use turbo_core::traits::Embedder;
use turbo_core::types::{PreparedDoc, SourceDoc};

use crate::pipeline::IngestCounters;

/// How often a transient embedding failure is retried before the document is skipped.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { retries: 2, backoff: Duration::from_millis(250) }
    }
}

impl From<&IngestSettings> for RetryPolicy {
    fn from(settings: &IngestSettings) -> Self {
        Self { retries: settings.embed_retries, backoff: Duration::from_millis(settings.embed_retry_backoff_ms) }
    }
}

/// Embed `text`, retrying transient failures with linear backoff. The result is
/// guaranteed to have `embedder.dim()` entries and a non-zero norm.
pub fn embed_with_retry(embedder: &dyn Embedder, text: &str, policy: RetryPolicy) -> Result<Vec<f32>> {
    let mut attempt = 0u32;
    loop {
        match embedder.embed_text(text) {
            Ok(vector) => {
                if vector.len() != embedder.dim() {
                    return Err(Error::DimensionMismatch { expected: embedder.dim(), got: vector.len() });
                }
                if vector.iter().all(|x| *x == 0.0) {
                    return Err(Error::Embedding("embedding collaborator returned a zero vector".to_string()));
                }
                return Ok(vector);
            }
            Err(e) if e.is_transient() && attempt < policy.retries => {
                attempt += 1;
                tracing::debug!(attempt, error = %e, "embedding failed, retrying");
                std::thread::sleep(policy.backoff * attempt);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Drain `jobs` until the source closes it. Documents whose embedding keeps
/// failing are dropped and counted; they are never written with a placeholder vector.
pub fn run_worker(
    worker_id: usize,
    embedder: &dyn Embedder,
    jobs: Receiver<SourceDoc>,
    prepared: Sender<PreparedDoc>,
    policy: RetryPolicy,
    counters: &IngestCounters,
) {
    let mut handled = 0usize;
    for doc in jobs.iter() {
        let vector = match embed_with_retry(embedder, &doc.embedding_input(), policy) {
            Ok(v) => v,
            Err(e) => {
                counters.skipped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(worker_id, doc_id = %doc.id, error = %e, "skipping document after embedding failure");
                continue;
            }
        };
        counters.embedded.fetch_add(1, Ordering::Relaxed);
        handled += 1;
        let SourceDoc { id, title, text } = doc;
        if prepared.send(PreparedDoc { global_id: id, title, text, vector }).is_err() {
            tracing::error!(worker_id, "prepared queue closed; worker exiting early");
            break;
        }
    }
    tracing::debug!(worker_id, handled, "embedding worker finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    struct Flaky { failures_left: AtomicU32, transient: bool, dim: usize }

    impl Embedder for Flaky {
        fn dim(&self) -> usize { self.dim }
        fn embed_text(&self, _text: &str) -> Result<Vec<f32>> {
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(if self.transient {
                    Error::Embedding("service busy".into())
                } else {
                    Error::InvalidConfig("bad model".into())
                });
            }
            let mut v = vec![0.0; self.dim];
            v[0] = 1.0;
            Ok(v)
        }
    }

    fn quick(retries: u32) -> RetryPolicy { RetryPolicy { retries, backoff: Duration::from_millis(1) } }

    #[test]
    fn transient_failures_are_retried() {
        let e = Flaky { failures_left: AtomicU32::new(2), transient: true, dim: 4 };
        assert_eq!(embed_with_retry(&e, "x", quick(2)).unwrap().len(), 4);
    }

    #[test]
    fn retries_are_bounded() {
        let e = Flaky { failures_left: AtomicU32::new(3), transient: true, dim: 4 };
        assert!(matches!(embed_with_retry(&e, "x", quick(2)), Err(Error::Embedding(_))));
    }

    #[test]
    fn non_transient_failures_are_not_retried() {
        let e = Flaky { failures_left: AtomicU32::new(1), transient: false, dim: 4 };
        assert!(matches!(embed_with_retry(&e, "x", quick(5)), Err(Error::InvalidConfig(_))));
        assert_eq!(e.failures_left.load(Ordering::SeqCst), 0);
    }

    struct Zero;
    impl Embedder for Zero {
        fn dim(&self) -> usize { 3 }
        fn embed_text(&self, _text: &str) -> Result<Vec<f32>> { Ok(vec![0.0; 3]) }
    }

    #[test]
    fn zero_vectors_are_rejected() {
        assert!(embed_with_retry(&Zero, "x", quick(0)).is_err());
    }

    #[test]
    fn worker_skips_failed_documents() {
        let (job_tx, job_rx) = crossbeam_channel::unbounded();
        let (out_tx, out_rx) = crossbeam_channel::unbounded();
        job_tx.send(SourceDoc { id: "1".into(), title: "a".into(), text: "b".into() }).unwrap();
        drop(job_tx);
        let counters = IngestCounters::default();
        run_worker(0, &Zero, job_rx, out_tx, quick(0), &counters);
        assert!(out_rx.try_recv().is_err());
        assert_eq!(counters.skipped.load(Ordering::Relaxed), 1);
        assert_eq!(counters.embedded.load(Ordering::Relaxed), 0);
    }
}
