use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use indicatif::ProgressBar;

use turbo_core::config::{expand_path, Settings};
use turbo_core::error::Result;
use turbo_core::layout::ShardLayout;
use turbo_core::ring::HashRing;
use turbo_core::traits::{Embedder, TextIndexWriter};
use turbo_text::ShardTextIndex;
use turbo_vector::VectorStore;

use crate::pipeline::{IngestReport, Pipeline, PipelineConfig};
use crate::writer::{ShardSummary, ShardWriter};

/// Create fresh on-disk state for shards `0..num_shards` under `base`.
/// Existing indexes and vector files are replaced.
pub fn open_shard_writers(
    base: &Path,
    num_shards: usize,
    capacity: u32,
    dim: usize,
    batch_size: usize,
) -> Result<Vec<ShardWriter<ShardTextIndex>>> {
    let mut writers = Vec::with_capacity(num_shards);
    for shard_id in 0..num_shards {
        let layout = ShardLayout::under(base, shard_id);
        std::fs::create_dir_all(&layout.dir)?;
        let text = ShardTextIndex::create(&layout.index_dir())?;
        let vectors = VectorStore::create(&layout.vectors_path(), capacity, dim)?;
        tracing::debug!(shard_id, dir = %layout.dir.display(), "opened shard");
        writers.push(ShardWriter::new(shard_id, text, vectors, batch_size));
    }
    Ok(writers)
}

pub fn persist_shards<W: TextIndexWriter>(base: &Path, writers: Vec<ShardWriter<W>>) -> Result<Vec<ShardSummary>> {
    let mut summaries = Vec::with_capacity(writers.len());
    for writer in writers {
        let layout = ShardLayout::under(base, writer.shard_id());
        let summary = writer.finish(&layout.docmap_path())?;
        tracing::info!(
            shard_id = summary.shard_id,
            documents = summary.documents,
            flushes = summary.flushes,
            duplicates = summary.duplicates,
            "shard persisted"
        );
        summaries.push(summary);
    }
    Ok(summaries)
}

/// Build every shard under `settings.ingest.data_dir` from `source`.
pub fn ingest_corpus<R: BufRead>(
    settings: &Settings,
    embedder: Arc<dyn Embedder>,
    source: R,
    progress: ProgressBar,
) -> anyhow::Result<IngestReport> {
    let ingest = &settings.ingest;
    let dim = settings.embedding.dimension;
    if embedder.dim() != dim {
        bail!("embedder produces {}-dim vectors but embedding.dimension is {dim}", embedder.dim());
    }
    let ring = HashRing::new(ingest.num_shards, ingest.vnodes_per_shard)?;
    let base = expand_path(&ingest.data_dir);
    std::fs::create_dir_all(&base).with_context(|| format!("create data dir {}", base.display()))?;
    tracing::info!(
        base = %base.display(),
        shards = ingest.num_shards,
        vnodes = ingest.vnodes_per_shard,
        workers = ingest.num_workers,
        capacity = ingest.max_docs_per_shard,
        dim,
        "starting ingestion"
    );

    let writers = open_shard_writers(&base, ingest.num_shards, ingest.max_docs_per_shard, dim, ingest.batch_size)
        .context("open shard writers")?;
    let pipeline = Pipeline::new(PipelineConfig::from(ingest), ring, embedder).with_progress(progress);
    let output = pipeline.run(source, writers)?;
    persist_shards(&base, output.writers).context("persist shards")?;
    Ok(output.report)
}
