use crate::buffer::FrameSlot;
use crate::codec;
use crate::stats::PipelineStats;

/// Decodes one inbound payload and publishes it. Malformed payloads are
/// logged and dropped; nothing here waits on inference.
pub fn handle_frame(slot: &FrameSlot, stats: &PipelineStats, payload: &str) -> bool {
    match codec::decode_data_uri(payload) {
        Ok(frame) => {
            let overwrote = slot.publish(frame);
            stats.record_published(overwrote);
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, bytes = payload.len(), "frame decode failed");
            false
        }
    }
}
