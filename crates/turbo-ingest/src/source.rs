use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::Ordering;

use crossbeam_channel::Sender;

use turbo_core::error::{Error, Result};
use turbo_core::types::SourceDoc;

use crate::pipeline::IngestCounters;

const READ_BUFFER_BYTES: usize = 1024 * 1024;

pub fn open_corpus(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).map_err(|e| Error::NotFound(format!("corpus {}: {e}", path.display())))?;
    Ok(BufReader::with_capacity(READ_BUFFER_BYTES, file))
}

/// Push one job per valid record onto `jobs`. Malformed lines are logged and
/// skipped; a read error ends the scan. The caller closes the queue by
/// dropping the sender once this returns.
pub fn read_corpus<R: BufRead>(mut reader: R, jobs: &Sender<SourceDoc>, counters: &IngestCounters) -> Result<()> {
    let mut line = Vec::new();
    let mut line_no = 0usize;
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 { break; }
        line_no += 1;
        let record = line.trim_ascii();
        if record.is_empty() { continue; }
        let doc = match serde_json::from_slice::<SourceDoc>(record) {
            Ok(doc) if !doc.id.is_empty() => doc,
            Ok(_) => {
                counters.malformed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(line_no, "skipping record without an id");
                continue;
            }
            Err(e) => {
                counters.malformed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(line_no, error = %e, "skipping malformed record");
                continue;
            }
        };
        counters.read.fetch_add(1, Ordering::Relaxed);
        if jobs.send(doc).is_err() {
            return Err(Error::Operation("job queue closed before the corpus was exhausted".to_string()));
        }
    }
    tracing::info!(lines = line_no, "source exhausted");
    Ok(())
}
