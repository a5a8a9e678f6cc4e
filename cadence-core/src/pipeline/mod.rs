//! The pipeline coordinator: public handle, executor thread and the state
//! shared between them.

mod commands;
mod executor;
mod handle;
mod host;
mod snapshot;
mod transitions;

pub use handle::{Pipeline, PipelineBuilder};
pub use host::StageHost;
