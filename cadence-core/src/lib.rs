//! # cadence-core
//!
//! Playback pipeline coordinator. Drives a demuxer, audio/video decoders and
//! audio/video renderers through initialization, preroll, seeking, rate and
//! volume changes and teardown, on a dedicated executor thread, while other
//! threads read playback position and buffering from a lock-guarded
//! snapshot.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use cadence_core::{Pipeline, PipelineConfig, StageCollection};
//!
//! let pipeline = Pipeline::builder()
//!     .config(PipelineConfig::load())
//!     .build()?;
//!
//! let stages = StageCollection::new()
//!     .with_demuxer(demuxer)
//!     .with_audio_decoder(audio_decoder)
//!     .with_audio_renderer(audio_renderer);
//!
//! pipeline.start_blocking(stages, Arc::new(|_| {}), Box::new(|_| {}))?;
//! pipeline.set_playback_rate(1.0)?;
//! pipeline.seek_blocking(Duration::from_secs(30))?;
//! pipeline.stop_blocking()?;
//! ```
//!
//! ## Module Overview
//!
//! - [`pipeline`]: `Pipeline` handle, its builder, and the `StageHost`
//!   stages report through
//! - [`stage`]: stage contracts and the `StageCollection` offered to `start`
//! - [`stage_group`]: fan-out/fan-in of lifecycle operations
//! - [`clock`]: rate-scaled reference clock
//! - [`notification`]: blocking bridge for completion callbacks
//! - [`observer`]: event observers registered at build time
//! - [`shutdown`]: per-session cancellation token
//! - [`config`]: embedded + user TOML configuration

pub mod clock;
pub mod config;
pub mod notification;
pub mod observer;
pub mod pipeline;
pub mod shutdown;
pub mod stage;
pub mod stage_group;

pub use cadence_types::*;

pub use clock::{ClockSource, ReferenceClock, SystemClock};
pub use config::{ConfigError, PipelineConfig};
pub use notification::StatusNotification;
pub use observer::PipelineObserver;
pub use pipeline::{Pipeline, PipelineBuilder, StageHost};
pub use shutdown::ShutdownToken;
pub use stage::{
    AudioDecoder, AudioRenderer, Demuxer, DemuxerStream, RepeatingStatusCb, Stage,
    StageCollection, StatusCb, VideoDecoder, VideoRenderer,
};
pub use stage_group::StageGroup;
