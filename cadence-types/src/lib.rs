//! # cadence-types
//!
//! Plain data shared between the pipeline coordinator in `cadence-core` and
//! the embedders and stages that talk to it. Nothing in here owns a thread or
//! a lock.

mod error;
mod event;
mod media;
mod ranges;
mod state;
mod stats;

pub use error::{PipelineError, PipelineStatus};
pub use event::PipelineEvent;
pub use media::{MediaType, Preload, VideoSize};
pub use ranges::Ranges;
pub use state::PipelineState;
pub use stats::PipelineStatistics;
