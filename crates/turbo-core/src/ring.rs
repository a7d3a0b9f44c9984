//! Consistent-hash ring with virtual nodes.
//!
//! Each shard `s` owns `V` positions `hash("shard-{s}-vnode-{v}")` on a 32-bit
//! ring. A key belongs to the first position at or after its own hash,
//! wrapping to the lowest position past the end. The ring is built once and
//! is read-only afterwards, so it can be shared freely across threads.

use std::collections::HashMap;
use std::hash::Hasher;

use twox_hash::XxHash32;

use crate::error::{Error, Result};

const HASH_SEED: u32 = 0;

/// Fixed 32-bit non-cryptographic hash used for both vnode positions and keys.
///
/// This is XxHash32 (seed 0), not FNV-1a. Shard assignment therefore differs
/// from rings built on FNV-1a, and shards indexed by such a ring cannot be
/// served or extended by this one.
pub fn hash32(key: &str) -> u32 {
    let mut hasher = XxHash32::with_seed(HASH_SEED);
    hasher.write(key.as_bytes());
    // XxHash32 only populates the low 32 bits.
    (hasher.finish() & u64::from(u32::MAX)) as u32
}

#[derive(Debug, Clone)]
pub struct HashRing {
    positions: Vec<u32>,
    owners: HashMap<u32, usize>,
    num_shards: usize,
}

impl HashRing {
    pub fn new(num_shards: usize, vnodes_per_shard: usize) -> Result<Self> {
        if num_shards == 0 || vnodes_per_shard == 0 {
            return Err(Error::InvalidConfig(format!(
                "hash ring needs at least one shard and one vnode (got {num_shards} shards, {vnodes_per_shard} vnodes)"
            )));
        }
        let mut positions = Vec::with_capacity(num_shards * vnodes_per_shard);
        let mut owners = HashMap::with_capacity(num_shards * vnodes_per_shard);
        for shard_id in 0..num_shards {
            for vnode in 0..vnodes_per_shard {
                let pos = hash32(&format!("shard-{shard_id}-vnode-{vnode}"));
                positions.push(pos);
                // A colliding vnode silently takes over the position.
                owners.insert(pos, shard_id);
            }
        }
        positions.sort_unstable();
        positions.dedup();
        Ok(Self { positions, owners, num_shards })
    }

    pub fn shard_for(&self, key: &str) -> usize {
        let h = hash32(key);
        let idx = self.positions.partition_point(|&p| p < h);
        let pos = self.positions.get(idx).or_else(|| self.positions.first());
        pos.and_then(|p| self.owners.get(p)).copied().unwrap_or(0)
    }

    pub fn num_shards(&self) -> usize { self.num_shards }

    pub fn num_positions(&self) -> usize { self.positions.len() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_deterministic() {
        let ring = HashRing::new(4, 128).expect("ring");
        let first = ring.shard_for("doc-42");
        for _ in 0..1000 {
            assert_eq!(ring.shard_for("doc-42"), first);
        }
        let rebuilt = HashRing::new(4, 128).expect("ring");
        assert_eq!(rebuilt.shard_for("doc-42"), first);
    }

    #[test]
    fn every_shard_receives_keys_roughly_evenly() {
        let ring = HashRing::new(4, 128).expect("ring");
        let total = 100_000usize;
        let mut counts = vec![0usize; 4];
        for i in 0..total {
            counts[ring.shard_for(&format!("doc-{i}"))] += 1;
        }
        let expected = total / 4;
        for (shard, count) in counts.iter().enumerate() {
            let deviation = (*count as f64 - expected as f64).abs() / expected as f64;
            assert!(deviation < 0.35, "shard {shard} got {count} keys (expected ~{expected})");
        }
    }

    fn max_relative_deviation(num_shards: usize, vnodes: usize, total: usize) -> f64 {
        let ring = HashRing::new(num_shards, vnodes).expect("ring");
        let mut counts = vec![0usize; num_shards];
        for i in 0..total {
            counts[ring.shard_for(&format!("doc-{i}"))] += 1;
        }
        let expected = total as f64 / num_shards as f64;
        counts.iter().map(|c| (*c as f64 - expected).abs() / expected).fold(0.0, f64::max)
    }

    #[test]
    fn more_vnodes_balance_better() {
        let sparse = max_relative_deviation(4, 1, 100_000);
        let dense = max_relative_deviation(4, 128, 100_000);
        assert!(dense < sparse, "128 vnodes deviate {dense:.3}, 1 vnode deviates {sparse:.3}");
    }

    #[test]
    fn keys_past_the_last_position_wrap_to_the_first() {
        let ring = HashRing::new(3, 16).expect("ring");
        let last = *ring.positions.last().expect("positions");
        let first_owner = ring.owners[&ring.positions[0]];
        // Find a key hashing beyond every vnode position.
        let key = (0..1_000_000)
            .map(|i| format!("wrap-{i}"))
            .find(|k| hash32(k) > last);
        if let Some(key) = key {
            assert_eq!(ring.shard_for(&key), first_owner);
        }
    }

    #[test]
    fn single_shard_owns_everything() {
        let ring = HashRing::new(1, 8).expect("ring");
        assert!((0..500).all(|i| ring.shard_for(&i.to_string()) == 0));
    }

    #[test]
    fn zero_shards_is_a_config_error() {
        assert!(matches!(HashRing::new(0, 128), Err(Error::InvalidConfig(_))));
        assert!(matches!(HashRing::new(4, 0), Err(Error::InvalidConfig(_))));
    }
}
