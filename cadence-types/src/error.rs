use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything that can go wrong while driving a pipeline.
///
/// The same type is used for synchronous argument/state validation on the
/// public handle and for the statuses delivered to completion callbacks.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineError {
    #[error("a required stage is missing")]
    RequiredStageMissing,
    #[error("no stream could be rendered")]
    CouldNotRender,
    #[error("stage initialization failed")]
    InitializationFailed,
    #[error("decoder does not support the stream")]
    DecoderNotSupported,
    #[error("decode error")]
    Decode,
    #[error("read error")]
    Read,
    #[error("network error")]
    Network,
    #[error("operation aborted")]
    Abort,
    #[error("pipeline is already running")]
    AlreadyRunning,
    #[error("pipeline is not running")]
    NotRunning,
    #[error("argument out of range")]
    InvalidArgument,
    #[error("request is not valid in the current pipeline state")]
    InvalidState,
    #[error("timed out waiting for the pipeline")]
    Timeout,
    #[error("pipeline executor is gone")]
    ExecutorGone,
}

impl PipelineError {
    /// Errors the coordinator may absorb by dropping the offending stage.
    /// Only honored while the video decoder is being initialized.
    pub fn is_recoverable(self) -> bool {
        matches!(
            self,
            PipelineError::DecoderNotSupported | PipelineError::RequiredStageMissing
        )
    }
}

/// Outcome carried by every completion callback.
pub type PipelineStatus = Result<(), PipelineError>;
