use std::fmt::Display;
use std::path::Path;

use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Value};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};

use turbo_core::error::{Error, Result};
use turbo_core::traits::{TextIndexWriter, TextSearcher};
use turbo_core::types::{LexicalHit, TextEntry};

use crate::tantivy_utils::{build_schema, register_tokenizer, ID_FIELD, TEXT_FIELD, TITLE_FIELD};

const WRITER_HEAP_BYTES: usize = 50_000_000;

fn index_err(e: impl Display) -> Error { Error::TextIndex(e.to_string()) }

pub struct ShardTextIndex {
	index: Index,
	reader: IndexReader,
	writer: Option<IndexWriter>,
	id_field: Field,
	title_field: Field,
	text_field: Field,
}

impl ShardTextIndex {
	/// Create an empty index at `index_dir`, replacing whatever was there.
	pub fn create(index_dir: &Path) -> Result<Self> {
		if index_dir.exists() { std::fs::remove_dir_all(index_dir)?; }
		std::fs::create_dir_all(index_dir)?;
		let index = Index::create_in_dir(index_dir, build_schema()).map_err(index_err)?;
		register_tokenizer(&index);
		let writer: IndexWriter = index.writer(WRITER_HEAP_BYTES).map_err(index_err)?;
		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into().map_err(index_err)?;
		Self::from_parts(index, reader, Some(writer))
	}

	/// Open an existing index for serving. The handle has no writer.
	pub fn open(index_dir: &Path) -> Result<Self> {
		if !index_dir.exists() { return Err(Error::NotFound(format!("text index at {}", index_dir.display()))); }
		let index = Index::open_in_dir(index_dir).map_err(index_err)?;
		register_tokenizer(&index);
		let reader = index.reader().map_err(index_err)?;
		Self::from_parts(index, reader, None)
	}

	fn from_parts(index: Index, reader: IndexReader, writer: Option<IndexWriter>) -> Result<Self> {
		let schema = index.schema();
		let id_field = schema.get_field(ID_FIELD).map_err(index_err)?;
		let title_field = schema.get_field(TITLE_FIELD).map_err(index_err)?;
		let text_field = schema.get_field(TEXT_FIELD).map_err(index_err)?;
		Ok(Self { index, reader, writer, id_field, title_field, text_field })
	}

	pub fn num_docs(&self) -> u64 { self.reader.searcher().num_docs() }

	fn stored_str(&self, doc: &TantivyDocument, field: Field) -> String {
		doc.get_first(field).and_then(|v| v.as_str()).unwrap_or("").to_string()
	}
}

impl TextIndexWriter for ShardTextIndex {
	fn flush(&mut self, batch: &[TextEntry]) -> Result<()> {
		let writer = self.writer.as_mut().ok_or_else(|| Error::TextIndex("index is read-only or closed".to_string()))?;
		for entry in batch {
			writer.add_document(doc!(
				self.id_field => entry.id.clone(),
				self.title_field => entry.title.clone(),
				self.text_field => entry.text.clone(),
			)).map_err(index_err)?;
		}
		writer.commit().map_err(index_err)?;
		self.reader.reload().map_err(index_err)?;
		tracing::debug!(docs = batch.len(), "text batch committed");
		Ok(())
	}

	fn close(&mut self) -> Result<()> {
		if let Some(writer) = self.writer.take() {
			writer.wait_merging_threads().map_err(index_err)?;
		}
		Ok(())
	}
}

impl TextSearcher for ShardTextIndex {
	fn search(&self, query: &str, window: usize) -> Result<Vec<LexicalHit>> {
		let searcher = self.reader.searcher();
		// The collector preallocates `limit` slots; never ask for more than the index holds.
		let limit = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX).min(window);
		if limit == 0 { return Ok(Vec::new()); }
		let parser = QueryParser::for_index(&self.index, vec![self.title_field, self.text_field]);
		// Free text from clients may contain query syntax; never fail on it.
		let (parsed, errors) = parser.parse_query_lenient(query);
		if !errors.is_empty() { tracing::debug!(?errors, query, "lenient query parse dropped clauses"); }
		let top_docs = searcher.search(&parsed, &TopDocs::with_limit(limit)).map_err(index_err)?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr).map_err(index_err)?;
			hits.push(LexicalHit {
				id: self.stored_str(&doc, self.id_field),
				score,
				title: self.stored_str(&doc, self.title_field),
				text: self.stored_str(&doc, self.text_field),
			});
		}
		Ok(hits)
	}
}
