use std::fs::{File, OpenOptions};
use std::ops::Range;
use std::path::Path;

use memmap2::{Mmap, MmapMut};

use turbo_core::error::{Error, Result};
use turbo_core::types::LocalDocId;

const F32_BYTES: usize = 4;

enum Mapping {
    Writable(MmapMut),
    ReadOnly(Mmap),
}

impl Mapping {
    fn bytes(&self) -> &[u8] {
        match self {
            Mapping::Writable(m) => &m[..],
            Mapping::ReadOnly(m) => &m[..],
        }
    }
}

/// Fixed-slot vector file. Slot `i` spans `[i*dim*4, (i+1)*dim*4)` and holds
/// `dim` little-endian f32 values for local doc id `i`; unwritten slots are zero.
pub struct VectorStore {
    mapping: Mapping,
    dim: usize,
    capacity: u32,
}

impl VectorStore {
    /// Create (or truncate) the vector file, zero-extend it to
    /// `capacity * dim * 4` bytes and map it read-write.
    pub fn create(path: &Path, capacity: u32, dim: usize) -> Result<Self> {
        if capacity == 0 || dim == 0 {
            return Err(Error::InvalidConfig(format!("vector store needs capacity and dim > 0 (got {capacity}, {dim})")));
        }
        let size = (capacity as usize)
            .checked_mul(dim * F32_BYTES)
            .ok_or_else(|| Error::InvalidConfig(format!("vector store of {capacity} x {dim} overflows")))?;
        let file = OpenOptions::new().read(true).write(true).create(true).truncate(true).open(path)?;
        file.set_len(size as u64)?;
        // SAFETY: the file is owned by this shard writer for the whole ingestion run
        // and is not resized while mapped.
        let mmap = unsafe { MmapMut::map_mut(&file) }
            .map_err(|e| Error::Storage(format!("mmap {} failed: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), capacity, dim, bytes = size, "vector store created");
        Ok(Self { mapping: Mapping::Writable(mmap), dim, capacity })
    }

    /// Map an existing vector file read-only for serving.
    pub fn open_read_only(path: &Path, dim: usize) -> Result<Self> {
        if dim == 0 { return Err(Error::InvalidConfig("vector dim must be > 0".to_string())); }
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        if len == 0 { return Err(Error::Storage(format!("vector file {} is empty", path.display()))); }
        let slot = (dim * F32_BYTES) as u64;
        if len % slot != 0 {
            tracing::warn!(path = %path.display(), len, slot, "vector file is not a whole number of slots");
        }
        let capacity = u32::try_from(len / slot).unwrap_or(u32::MAX);
        // SAFETY: serving assumes ingestion has finished; nothing writes the file while mapped.
        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|e| Error::Storage(format!("mmap {} failed: {e}", path.display())))?;
        Ok(Self { mapping: Mapping::ReadOnly(mmap), dim, capacity })
    }

    pub fn dim(&self) -> usize { self.dim }

    pub fn capacity(&self) -> u32 { self.capacity }

    fn slot_range(&self, local_id: LocalDocId) -> Option<Range<usize>> {
        let width = self.dim * F32_BYTES;
        let start = (local_id as usize).checked_mul(width)?;
        let end = start.checked_add(width)?;
        (end <= self.mapping.bytes().len()).then_some(start..end)
    }

    /// Store `vector` in slot `local_id`. Running past the end of the file means
    /// the shard was sized too small and is reported as `CapacityExceeded`.
    pub fn write(&mut self, local_id: LocalDocId, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, got: vector.len() });
        }
        let range = self.slot_range(local_id).ok_or(Error::CapacityExceeded { local_id, capacity: self.capacity })?;
        let Mapping::Writable(mmap) = &mut self.mapping else {
            return Err(Error::Storage("vector store is mapped read-only".to_string()));
        };
        for (chunk, value) in mmap[range].chunks_exact_mut(F32_BYTES).zip(vector) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        Ok(())
    }

    /// Decode slot `local_id`, or `None` (logged) when the id lies outside the file.
    pub fn read(&self, local_id: LocalDocId) -> Option<Vec<f32>> {
        let Some(range) = self.slot_range(local_id) else {
            tracing::warn!(local_id, capacity = self.capacity, mapped = self.mapping.bytes().len(), "vector read out of bounds");
            return None;
        };
        let raw = &self.mapping.bytes()[range];
        Some(raw.chunks_exact(F32_BYTES).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect())
    }

    pub fn flush(&self) -> Result<()> {
        if let Mapping::Writable(mmap) = &self.mapping {
            mmap.flush()?;
        }
        Ok(())
    }
}
