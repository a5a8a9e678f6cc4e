use std::time::Duration;

use cadence_types::{PipelineError, PipelineEvent, PipelineState, PipelineStatus, Preload};

use crate::shutdown::ShutdownToken;
use crate::stage::{RepeatingStatusCb, StageCollection, StatusCb};

/// Embedder callbacks handed over with `start`.
pub(crate) struct SessionCallbacks {
    pub ended: RepeatingStatusCb,
    pub error: StatusCb,
    pub start: StatusCb,
}

/// Work posted to the executor thread. Public requests, stage completions
/// and stage reports all arrive through the same queue, which is what
/// serializes every state mutation.
pub(crate) enum PipelineCmd {
    // Embedder requests
    Start {
        collection: StageCollection,
        callbacks: SessionCallbacks,
        shutdown: ShutdownToken,
    },
    Seek {
        time: Duration,
        done: StatusCb,
    },
    Stop {
        done: StatusCb,
    },
    SetPlaybackRate(f32),
    SetVolume(f32),
    SetPreload(Preload),

    // Stage completions
    StageInitialized {
        session: u64,
        state: PipelineState,
        status: PipelineStatus,
    },
    OperationDone {
        op: u64,
        status: PipelineStatus,
    },

    // Stage reports
    StageError {
        session: u64,
        error: PipelineError,
    },
    RendererEnded {
        session: u64,
    },
    AudioDisabled {
        session: u64,
    },
    AudioUnderflow {
        session: u64,
    },
    NetworkActivity(bool),
    Notify(PipelineEvent),

    Shutdown,
}

impl PipelineCmd {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            PipelineCmd::Start { .. } => "start",
            PipelineCmd::Seek { .. } => "seek",
            PipelineCmd::Stop { .. } => "stop",
            PipelineCmd::SetPlaybackRate(_) => "set_playback_rate",
            PipelineCmd::SetVolume(_) => "set_volume",
            PipelineCmd::SetPreload(_) => "set_preload",
            PipelineCmd::StageInitialized { .. } => "stage_initialized",
            PipelineCmd::OperationDone { .. } => "operation_done",
            PipelineCmd::StageError { .. } => "stage_error",
            PipelineCmd::RendererEnded { .. } => "renderer_ended",
            PipelineCmd::AudioDisabled { .. } => "audio_disabled",
            PipelineCmd::AudioUnderflow { .. } => "audio_underflow",
            PipelineCmd::NetworkActivity(_) => "network_activity",
            PipelineCmd::Notify(_) => "notify",
            PipelineCmd::Shutdown => "shutdown",
        }
    }
}
