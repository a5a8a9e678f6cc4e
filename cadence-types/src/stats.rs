use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

/// Decode counters reported by decoders and renderers.
///
/// Stages report deltas; the coordinator accumulates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PipelineStatistics {
    pub audio_bytes_decoded: u64,
    pub video_bytes_decoded: u64,
    pub video_frames_decoded: u32,
    pub video_frames_dropped: u32,
}

impl AddAssign for PipelineStatistics {
    fn add_assign(&mut self, delta: Self) {
        self.audio_bytes_decoded = self.audio_bytes_decoded.saturating_add(delta.audio_bytes_decoded);
        self.video_bytes_decoded = self.video_bytes_decoded.saturating_add(delta.video_bytes_decoded);
        self.video_frames_decoded = self.video_frames_decoded.saturating_add(delta.video_frames_decoded);
        self.video_frames_dropped = self.video_frames_dropped.saturating_add(delta.video_frames_dropped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deltas_accumulate() {
        let mut total = PipelineStatistics::default();
        total += PipelineStatistics {
            video_frames_decoded: 3,
            video_bytes_decoded: 1000,
            ..Default::default()
        };
        total += PipelineStatistics {
            video_frames_decoded: 2,
            video_frames_dropped: 1,
            ..Default::default()
        };
        assert_eq!(total.video_frames_decoded, 5);
        assert_eq!(total.video_frames_dropped, 1);
        assert_eq!(total.video_bytes_decoded, 1000);
    }
}
