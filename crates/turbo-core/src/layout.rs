use std::path::{Path, PathBuf};

/// On-disk layout of one shard:
/// `shard-<id>/vectors.bin`, `shard-<id>/index/`, `shard-<id>/docmap.json`.
#[derive(Debug, Clone)]
pub struct ShardLayout {
    pub dir: PathBuf,
}

impl ShardLayout {
    /// Layout of shard `shard_id` under an ingestion base directory.
    pub fn under(base_dir: &Path, shard_id: usize) -> Self {
        Self { dir: base_dir.join(format!("shard-{shard_id}")) }
    }

    /// Layout rooted directly at a shard directory (as served by a shard node).
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn vectors_path(&self) -> PathBuf { self.dir.join("vectors.bin") }
    pub fn index_dir(&self) -> PathBuf { self.dir.join("index") }
    pub fn docmap_path(&self) -> PathBuf { self.dir.join("docmap.json") }
}
