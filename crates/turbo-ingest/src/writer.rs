use std::path::Path;

use crossbeam_channel::Receiver;
use indicatif::ProgressBar;

use turbo_core::error::Result;
use turbo_core::traits::TextIndexWriter;
use turbo_core::types::{LocalDocId, PreparedDoc, TextEntry};
use turbo_vector::{DocMap, VectorStore};

/// What a shard writer persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardSummary {
    pub shard_id: usize,
    pub documents: u32,
    pub flushes: usize,
    pub duplicates: usize,
}

/// Sole owner of one shard's text index, vector file and doc map while
/// ingestion runs. Local ids are handed out densely from zero in arrival order.
pub struct ShardWriter<W: TextIndexWriter> {
    shard_id: usize,
    text: W,
    vectors: VectorStore,
    doc_map: DocMap,
    next_doc_id: LocalDocId,
    batch: Vec<TextEntry>,
    batch_size: usize,
    flushes: usize,
    duplicates: usize,
}

impl<W: TextIndexWriter> ShardWriter<W> {
    pub fn new(shard_id: usize, text: W, vectors: VectorStore, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            shard_id,
            text,
            vectors,
            doc_map: DocMap::new(),
            next_doc_id: 0,
            batch: Vec::with_capacity(batch_size),
            batch_size,
            flushes: 0,
            duplicates: 0,
        }
    }

    pub fn shard_id(&self) -> usize { self.shard_id }

    /// Documents accepted so far; equals the next local id.
    pub fn documents(&self) -> u32 { self.next_doc_id }

    pub fn doc_map(&self) -> &DocMap { &self.doc_map }

    pub fn flushes(&self) -> usize { self.flushes }

    pub fn duplicates(&self) -> usize { self.duplicates }

    pub fn text(&self) -> &W { &self.text }

    /// Accept one document. The vector slot is written first; the local id is
    /// only consumed once that succeeds.
    pub fn write(&mut self, doc: PreparedDoc) -> Result<()> {
        if self.doc_map.contains(&doc.global_id) {
            self.duplicates += 1;
            tracing::warn!(shard_id = self.shard_id, doc_id = %doc.global_id, "duplicate global id; keeping the first copy");
            return Ok(());
        }
        let local_id = self.next_doc_id;
        self.vectors.write(local_id, &doc.vector)?;
        self.doc_map.insert(doc.global_id.clone(), local_id);
        self.next_doc_id += 1;
        self.batch.push(TextEntry { id: doc.global_id, title: doc.title, text: doc.text });
        if self.batch.len() >= self.batch_size {
            self.flush_batch()?;
        }
        Ok(())
    }

    pub fn flush_batch(&mut self) -> Result<()> {
        if self.batch.is_empty() { return Ok(()); }
        self.text.flush(&self.batch)?;
        self.flushes += 1;
        tracing::debug!(shard_id = self.shard_id, docs = self.batch.len(), total = self.next_doc_id, "flushed batch");
        self.batch.clear();
        Ok(())
    }

    /// Consume the shard queue until the router closes it, then flush the
    /// trailing partial batch. On error the queue is dropped so the router
    /// stops delivering to this shard.
    pub fn run(mut self, queue: Receiver<PreparedDoc>, progress: &ProgressBar) -> Result<Self> {
        for doc in queue.iter() {
            if let Err(e) = self.write(doc) {
                tracing::error!(shard_id = self.shard_id, error = %e, "shard writer failed");
                return Err(e);
            }
            progress.inc(1);
        }
        self.flush_batch()?;
        tracing::info!(shard_id = self.shard_id, documents = self.next_doc_id, flushes = self.flushes, "shard queue drained");
        Ok(self)
    }

    /// Persist the doc map, sync the vector file and release the index writer.
    pub fn finish(mut self, docmap_path: &Path) -> Result<ShardSummary> {
        self.flush_batch()?;
        self.doc_map.save(docmap_path)?;
        self.vectors.flush()?;
        self.text.close()?;
        Ok(ShardSummary {
            shard_id: self.shard_id,
            documents: self.next_doc_id,
            flushes: self.flushes,
            duplicates: self.duplicates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turbo_core::error::Error;

    #[derive(Default)]
    struct Recording { batches: Vec<usize>, closed: bool }

    impl TextIndexWriter for Recording {
        fn flush(&mut self, batch: &[TextEntry]) -> Result<()> {
            self.batches.push(batch.len());
            Ok(())
        }
        fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }
    }

    fn doc(id: &str) -> PreparedDoc {
        PreparedDoc { global_id: id.into(), title: "t".into(), text: "x".into(), vector: vec![1.0, 0.0] }
    }

    #[test]
    fn batches_flush_every_hundred_plus_remainder() {
        let tmp = tempfile::tempdir().unwrap();
        let vectors = VectorStore::create(&tmp.path().join("v.bin"), 300, 2).unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();
        for i in 0..250 { tx.send(doc(&i.to_string())).unwrap(); }
        drop(tx);

        let writer = ShardWriter::new(0, Recording::default(), vectors, 100).run(rx, &ProgressBar::hidden()).unwrap();
        assert_eq!(writer.text().batches, vec![100, 100, 50]);
        assert_eq!(writer.documents(), 250);
        assert_eq!(writer.doc_map().local_id("0"), Some(0));
        assert_eq!(writer.doc_map().local_id("249"), Some(249));
    }

    #[test]
    fn exact_multiple_of_batch_size_has_no_trailing_flush() {
        let tmp = tempfile::tempdir().unwrap();
        let vectors = VectorStore::create(&tmp.path().join("v.bin"), 300, 2).unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();
        for i in 0..200 { tx.send(doc(&i.to_string())).unwrap(); }
        drop(tx);

        let writer = ShardWriter::new(0, Recording::default(), vectors, 100).run(rx, &ProgressBar::hidden()).unwrap();
        assert_eq!(writer.text().batches, vec![100, 100]);
        let summary = writer.finish(&tmp.path().join("docmap.json")).unwrap();
        assert_eq!(summary.flushes, 2);
    }

    #[test]
    fn duplicate_global_id_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let vectors = VectorStore::create(&tmp.path().join("v.bin"), 4, 2).unwrap();
        let mut writer = ShardWriter::new(0, Recording::default(), vectors, 10);
        writer.write(doc("a")).unwrap();
        writer.write(doc("a")).unwrap();
        writer.write(doc("b")).unwrap();
        assert_eq!(writer.documents(), 2);
        assert_eq!(writer.duplicates(), 1);
        assert_eq!(writer.doc_map().local_id("b"), Some(1));
    }

    #[test]
    fn failed_vector_write_does_not_consume_local_id() {
        let tmp = tempfile::tempdir().unwrap();
        let vectors = VectorStore::create(&tmp.path().join("v.bin"), 1, 2).unwrap();
        let mut writer = ShardWriter::new(3, Recording::default(), vectors, 10);
        writer.write(doc("a")).unwrap();
        assert!(matches!(writer.write(doc("b")), Err(Error::CapacityExceeded { local_id: 1, capacity: 1 })));
        assert_eq!(writer.documents(), 1);
        assert!(!writer.doc_map().contains("b"));
    }

    #[test]
    fn finish_saves_docmap_and_closes_index() {
        let tmp = tempfile::tempdir().unwrap();
        let vectors = VectorStore::create(&tmp.path().join("v.bin"), 4, 2).unwrap();
        let mut writer = ShardWriter::new(1, Recording::default(), vectors, 10);
        writer.write(doc("42")).unwrap();
        let path = tmp.path().join("docmap.json");
        let summary = writer.finish(&path).unwrap();
        assert_eq!(summary, ShardSummary { shard_id: 1, documents: 1, flushes: 1, duplicates: 0 });
        assert_eq!(DocMap::load(&path).unwrap().local_id("42"), Some(0));
    }
}
