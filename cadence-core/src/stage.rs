//! Stage contracts: the asynchronous processing units the coordinator drives.
//!
//! Every lifecycle call completes through a one-shot [`StatusCb`] rather than
//! a return value, and may complete on any thread (including synchronously,
//! inside the call). Stages are shared as `Arc`s so an in-flight callback can
//! keep a stage alive after the coordinator has let go of it.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use cadence_types::{MediaType, PipelineStatus, Preload};

use crate::pipeline::StageHost;

/// One-shot completion callback. Consumed on use, so a completion can only
/// be reported once.
pub type StatusCb = Box<dyn FnOnce(PipelineStatus) + Send + 'static>;

/// Callback that may fire more than once (e.g. end of stream after every
/// replay).
pub type RepeatingStatusCb = Arc<dyn Fn(PipelineStatus) + Send + Sync + 'static>;

/// Uniform lifecycle shared by every stage. Operations default to completing
/// immediately with success, which suits stages (such as decoders) that are
/// driven indirectly by their renderer.
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    fn play(&self, done: StatusCb) {
        done(Ok(()));
    }

    fn pause(&self, done: StatusCb) {
        done(Ok(()));
    }

    fn flush(&self, done: StatusCb) {
        done(Ok(()));
    }

    fn seek(&self, _time: Duration, done: StatusCb) {
        done(Ok(()));
    }

    fn stop(&self, done: StatusCb) {
        done(Ok(()));
    }

    fn set_playback_rate(&self, _rate: f32) {}

    fn on_audio_renderer_disabled(&self) {}
}

/// Elementary stream handed from the demuxer to a decoder.
pub trait DemuxerStream: Send + Sync {
    fn media_type(&self) -> MediaType;
}

/// Source stage: reads the container and exposes per-type streams.
pub trait Demuxer: Stage {
    fn initialize(&self, host: StageHost, done: StatusCb);

    /// `None` when the media has no stream of this type. Not an error.
    fn stream(&self, media_type: MediaType) -> Option<Arc<dyn DemuxerStream>>;

    fn start_time(&self) -> Duration {
        Duration::ZERO
    }

    fn duration(&self) -> Duration;

    /// Bits per second, 0 when unknown.
    fn bitrate(&self) -> u32 {
        0
    }

    fn is_seekable(&self) -> bool {
        true
    }

    fn is_local_source(&self) -> bool {
        true
    }

    fn set_preload(&self, _preload: Preload) {}
}

pub trait AudioDecoder: Stage {
    fn initialize(&self, stream: Arc<dyn DemuxerStream>, host: StageHost, done: StatusCb);
}

pub trait VideoDecoder: Stage {
    fn initialize(&self, stream: Arc<dyn DemuxerStream>, host: StageHost, done: StatusCb);
}

pub trait AudioRenderer: Stage {
    fn initialize(&self, decoder: Arc<dyn AudioDecoder>, host: StageHost, done: StatusCb);

    fn has_ended(&self) -> bool;

    fn set_volume(&self, _volume: f32) {}

    fn resume_after_underflow(&self, _buffer_more_audio: bool) {}
}

pub trait VideoRenderer: Stage {
    fn initialize(&self, decoder: Arc<dyn VideoDecoder>, host: StageHost, done: StatusCb);

    fn has_ended(&self) -> bool;
}

/// The stages offered for one playback session.
///
/// Holds a single demuxer plus ordered candidate lists for every other stage
/// kind. Selecting a stage removes it from its list, so a rejected video
/// decoder makes way for the next candidate.
#[derive(Default)]
pub struct StageCollection {
    demuxer: Option<Arc<dyn Demuxer>>,
    audio_decoders: VecDeque<Arc<dyn AudioDecoder>>,
    video_decoders: VecDeque<Arc<dyn VideoDecoder>>,
    audio_renderers: VecDeque<Arc<dyn AudioRenderer>>,
    video_renderers: VecDeque<Arc<dyn VideoRenderer>>,
}

impl StageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_demuxer(mut self, demuxer: Arc<dyn Demuxer>) -> Self {
        self.demuxer = Some(demuxer);
        self
    }

    pub fn with_audio_decoder(mut self, decoder: Arc<dyn AudioDecoder>) -> Self {
        self.audio_decoders.push_back(decoder);
        self
    }

    pub fn with_video_decoder(mut self, decoder: Arc<dyn VideoDecoder>) -> Self {
        self.video_decoders.push_back(decoder);
        self
    }

    pub fn with_audio_renderer(mut self, renderer: Arc<dyn AudioRenderer>) -> Self {
        self.audio_renderers.push_back(renderer);
        self
    }

    pub fn with_video_renderer(mut self, renderer: Arc<dyn VideoRenderer>) -> Self {
        self.video_renderers.push_back(renderer);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.demuxer.is_none()
            && self.audio_decoders.is_empty()
            && self.video_decoders.is_empty()
            && self.audio_renderers.is_empty()
            && self.video_renderers.is_empty()
    }

    pub(crate) fn take_demuxer(&mut self) -> Option<Arc<dyn Demuxer>> {
        self.demuxer.take()
    }

    pub(crate) fn select_audio_decoder(&mut self) -> Option<Arc<dyn AudioDecoder>> {
        self.audio_decoders.pop_front()
    }

    pub(crate) fn select_video_decoder(&mut self) -> Option<Arc<dyn VideoDecoder>> {
        self.video_decoders.pop_front()
    }

    pub(crate) fn select_audio_renderer(&mut self) -> Option<Arc<dyn AudioRenderer>> {
        self.audio_renderers.pop_front()
    }

    pub(crate) fn select_video_renderer(&mut self) -> Option<Arc<dyn VideoRenderer>> {
        self.video_renderers.pop_front()
    }
}
