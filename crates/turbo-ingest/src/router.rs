use crossbeam_channel::{Receiver, Sender};

use turbo_core::ring::HashRing;
use turbo_core::types::PreparedDoc;

/// Forward each prepared document to the queue of the shard owning its global
/// id. Returns the number of documents delivered. The shard queues close when
/// `shards` is dropped at the end of this call.
pub fn run_router(ring: &HashRing, prepared: Receiver<PreparedDoc>, shards: Vec<Sender<PreparedDoc>>) -> usize {
    let mut routed = 0usize;
    for doc in prepared.iter() {
        let shard_id = ring.shard_for(&doc.global_id);
        let Some(queue) = shards.get(shard_id) else {
            tracing::error!(shard_id, doc_id = %doc.global_id, "ring returned a shard without a queue");
            continue;
        };
        // A writer that failed has dropped its receiver; keep draining so upstream never blocks.
        if let Err(e) = queue.send(doc) {
            tracing::warn!(shard_id, doc_id = %e.0.global_id, "shard queue closed; dropping document");
            continue;
        }
        routed += 1;
    }
    tracing::debug!(routed, "router finished");
    routed
}
