use serde::{Deserialize, Serialize};

/// Lifecycle state of a pipeline.
///
/// Owned by the executor thread. Other threads only ever see the flags that
/// the executor mirrors into the playback snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PipelineState {
    #[default]
    Created,
    InitSource,
    InitAudioDecoder,
    InitAudioRenderer,
    InitVideoDecoder,
    InitVideoRenderer,
    Pausing,
    Seeking,
    Flushing,
    Starting,
    Started,
    Ended,
    Stopping,
    Stopped,
    Error,
}

impl PipelineState {
    /// True for the stage-by-stage initialization states.
    pub fn is_initializing(self) -> bool {
        matches!(
            self,
            PipelineState::InitSource
                | PipelineState::InitAudioDecoder
                | PipelineState::InitAudioRenderer
                | PipelineState::InitVideoDecoder
                | PipelineState::InitVideoRenderer
        )
    }

    /// True once every stage has been initialized and the pipeline has not
    /// begun tearing down.
    pub fn is_initialized(self) -> bool {
        matches!(
            self,
            PipelineState::Pausing
                | PipelineState::Flushing
                | PipelineState::Seeking
                | PipelineState::Starting
                | PipelineState::Started
                | PipelineState::Ended
        )
    }

    /// Terminal states: nothing further happens without an external request.
    pub fn is_stopped(self) -> bool {
        matches!(self, PipelineState::Stopped | PipelineState::Error)
    }

    pub fn name(self) -> &'static str {
        match self {
            PipelineState::Created => "created",
            PipelineState::InitSource => "init-source",
            PipelineState::InitAudioDecoder => "init-audio-decoder",
            PipelineState::InitAudioRenderer => "init-audio-renderer",
            PipelineState::InitVideoDecoder => "init-video-decoder",
            PipelineState::InitVideoRenderer => "init-video-renderer",
            PipelineState::Pausing => "pausing",
            PipelineState::Seeking => "seeking",
            PipelineState::Flushing => "flushing",
            PipelineState::Starting => "starting",
            PipelineState::Started => "started",
            PipelineState::Ended => "ended",
            PipelineState::Stopping => "stopping",
            PipelineState::Stopped => "stopped",
            PipelineState::Error => "error",
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
