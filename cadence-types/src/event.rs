use std::time::Duration;

use crate::{PipelineError, PipelineState, PipelineStatistics, VideoSize};

/// Notifications delivered to pipeline observers on the executor thread.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Created,
    StateChanged(PipelineState),
    Error(PipelineError),
    DurationSet(Duration),
    TotalBytesSet(u64),
    VideoSizeChanged(VideoSize),
    AudioRendererDisabled,
    Ended,
    NetworkActivity(bool),
    /// Periodic position report, emitted only while playing.
    TimeUpdate {
        current: Duration,
        buffered: Duration,
        statistics: PipelineStatistics,
    },
    Destroyed,
}
