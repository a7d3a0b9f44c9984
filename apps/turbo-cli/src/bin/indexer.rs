use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

use turbo_core::config::expand_path;
use turbo_embed::get_default_embedder;
use turbo_ingest::ingest_corpus;
use turbo_ingest::source::open_corpus;

fn main() -> anyhow::Result<()> {
    turbo_cli::init_tracing();
    let mut settings = turbo_cli::load_settings()?;
    if let Some(path) = std::env::args().nth(1).filter(|a| !a.starts_with('-')) {
        settings.ingest.input_path = path;
    }
    let input = expand_path(&settings.ingest.input_path);
    println!("Shard Indexer\n=============");
    println!("Corpus:   {}", input.display());
    println!("Data dir: {}", expand_path(&settings.ingest.data_dir).display());
    println!("Shards:   {} x {} vnodes, {} workers", settings.ingest.num_shards, settings.ingest.vnodes_per_shard, settings.ingest.num_workers);

    let embedder = get_default_embedder(&settings.embedding)?;
    let source = open_corpus(&input)?;

    let progress = ProgressBar::new_spinner();
    progress.set_style(ProgressStyle::with_template("{spinner} [{elapsed_precise}] {pos} docs written ({per_sec})")?);
    progress.enable_steady_tick(Duration::from_millis(200));

    let start = Instant::now();
    let report = ingest_corpus(&settings, embedder, source, progress.clone())?;
    progress.finish_and_clear();

    println!("\nIndexing completed in {:.1?}", start.elapsed());
    println!("Read {} records ({} malformed, {} skipped after embedding failures, {} duplicates)", report.read, report.malformed, report.skipped, report.duplicates);
    for (shard_id, (docs, flushes)) in report.written_per_shard.iter().zip(&report.flushes_per_shard).enumerate() {
        println!("  shard-{shard_id}: {docs} docs, {flushes} index flushes");
    }
    println!("Total written: {}", report.total_written());
    Ok(())
}
