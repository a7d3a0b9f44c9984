use std::io::BufRead;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, bail, Context};
use crossbeam_channel::bounded;
use indicatif::ProgressBar;

use turbo_core::config::IngestSettings;
use turbo_core::ring::HashRing;
use turbo_core::traits::{Embedder, TextIndexWriter};
use turbo_core::types::{PreparedDoc, SourceDoc};

use crate::router::run_router;
use crate::source::read_corpus;
use crate::worker::{run_worker, RetryPolicy};
use crate::writer::ShardWriter;

/// Counters shared by the source and the embedding workers.
#[derive(Debug, Default)]
pub struct IngestCounters {
    pub read: AtomicUsize,
    pub malformed: AtomicUsize,
    pub embedded: AtomicUsize,
    pub skipped: AtomicUsize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub read: usize,
    pub malformed: usize,
    pub embedded: usize,
    pub skipped: usize,
    pub written_per_shard: Vec<u32>,
    pub flushes_per_shard: Vec<usize>,
    pub duplicates: usize,
}

impl IngestReport {
    pub fn total_written(&self) -> u64 { self.written_per_shard.iter().map(|n| u64::from(*n)).sum() }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub num_workers: usize,
    pub queue_capacity: usize,
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { num_workers: 4, queue_capacity: 1000, retry: RetryPolicy::default() }
    }
}

impl From<&IngestSettings> for PipelineConfig {
    fn from(settings: &IngestSettings) -> Self {
        Self { num_workers: settings.num_workers, queue_capacity: settings.queue_capacity, retry: RetryPolicy::from(settings) }
    }
}

/// Shard writers handed back after every queue has drained, ready to be persisted.
pub struct PipelineOutput<W: TextIndexWriter> {
    pub report: IngestReport,
    pub writers: Vec<ShardWriter<W>>,
}

pub struct Pipeline {
    config: PipelineConfig,
    ring: HashRing,
    embedder: Arc<dyn Embedder>,
    progress: ProgressBar,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, ring: HashRing, embedder: Arc<dyn Embedder>) -> Self {
        Self { config, ring, embedder, progress: ProgressBar::hidden() }
    }

    /// Advance `progress` once per document written to a shard.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn ring(&self) -> &HashRing { &self.ring }

    /// Stream `source` through the stages. `writers[i]` must own shard `i`.
    ///
    /// Threads are started consumer-first (writers, router, workers) and the
    /// source runs on the calling thread. Every queue is created inside the
    /// scope, so an early return closes them all and lets the scope join.
    pub fn run<R: BufRead, W: TextIndexWriter>(&self, source: R, writers: Vec<ShardWriter<W>>) -> anyhow::Result<PipelineOutput<W>> {
        let num_shards = self.ring.num_shards();
        if writers.len() != num_shards {
            bail!("pipeline needs {num_shards} shard writers, got {}", writers.len());
        }
        if let Some((pos, w)) = writers.iter().enumerate().find(|(i, w)| w.shard_id() != *i) {
            bail!("shard writer at position {pos} owns shard {}", w.shard_id());
        }
        let num_workers = self.config.num_workers.max(1);
        let capacity = self.config.queue_capacity.max(1);
        let counters = IngestCounters::default();
        let embedder: &dyn Embedder = self.embedder.as_ref();

        let (writers, source_result) = thread::scope(|s| -> anyhow::Result<_> {
            let (job_tx, job_rx) = bounded::<SourceDoc>(capacity);
            let (prepared_tx, prepared_rx) = bounded::<PreparedDoc>(capacity);
            let (shard_txs, shard_rxs): (Vec<_>, Vec<_>) = (0..num_shards).map(|_| bounded::<PreparedDoc>(capacity)).unzip();

            let mut writer_handles = Vec::with_capacity(num_shards);
            for (writer, queue) in writers.into_iter().zip(shard_rxs) {
                let progress = self.progress.clone();
                let handle = thread::Builder::new()
                    .name(format!("shard-writer-{}", writer.shard_id()))
                    .spawn_scoped(s, move || writer.run(queue, &progress))
                    .context("spawn shard writer")?;
                writer_handles.push(handle);
            }

            let ring = &self.ring;
            let router = thread::Builder::new()
                .name("router".to_string())
                .spawn_scoped(s, move || run_router(ring, prepared_rx, shard_txs))
                .context("spawn router")?;

            let mut worker_handles = Vec::with_capacity(num_workers);
            for worker_id in 0..num_workers {
                let jobs = job_rx.clone();
                let prepared = prepared_tx.clone();
                let retry = self.config.retry;
                let counters = &counters;
                let handle = thread::Builder::new()
                    .name(format!("embed-worker-{worker_id}"))
                    .spawn_scoped(s, move || run_worker(worker_id, embedder, jobs, prepared, retry, counters))
                    .context("spawn embedding worker")?;
                worker_handles.push(handle);
            }
            drop(job_rx);
            drop(prepared_tx);

            let source_result = read_corpus(source, &job_tx, &counters);
            drop(job_tx);
            tracing::info!(read = counters.read.load(Ordering::Relaxed), "source finished, draining pipeline");

            for handle in worker_handles {
                handle.join().map_err(|_| anyhow!("embedding worker panicked"))?;
            }
            let routed = router.join().map_err(|_| anyhow!("router panicked"))?;
            tracing::debug!(routed, "router joined");

            let mut finished = Vec::with_capacity(num_shards);
            let mut first_error = None;
            for (shard_id, handle) in writer_handles.into_iter().enumerate() {
                match handle.join() {
                    Ok(Ok(writer)) => finished.push(writer),
                    Ok(Err(e)) => {
                        first_error.get_or_insert_with(|| anyhow::Error::new(e).context(format!("shard {shard_id} writer failed")));
                    }
                    Err(_) => {
                        first_error.get_or_insert_with(|| anyhow!("shard {shard_id} writer panicked"));
                    }
                }
            }
            if let Some(e) = first_error { return Err(e); }
            Ok((finished, source_result))
        })?;
        source_result.context("reading corpus")?;

        let report = IngestReport {
            read: counters.read.load(Ordering::Relaxed),
            malformed: counters.malformed.load(Ordering::Relaxed),
            embedded: counters.embedded.load(Ordering::Relaxed),
            skipped: counters.skipped.load(Ordering::Relaxed),
            written_per_shard: writers.iter().map(ShardWriter::documents).collect(),
            flushes_per_shard: writers.iter().map(ShardWriter::flushes).collect(),
            duplicates: writers.iter().map(ShardWriter::duplicates).sum(),
        };
        tracing::info!(
            read = report.read,
            malformed = report.malformed,
            skipped = report.skipped,
            written = report.total_written(),
            "pipeline drained"
        );
        Ok(PipelineOutput { report, writers })
    }
}
