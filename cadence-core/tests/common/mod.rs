#![allow(dead_code)]
//! Test harness for cadence-core integration tests: scripted fake stages, a
//! hand-advanced clock and an event recorder.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cadence_core::{
    AudioDecoder, AudioRenderer, ClockSource, Demuxer, DemuxerStream, MediaType, Pipeline,
    PipelineConfig, PipelineError, PipelineEvent, PipelineObserver, PipelineStatus, Preload,
    RepeatingStatusCb, Stage, StageCollection, StageHost, StatusCb, StatusNotification,
    VideoDecoder, VideoRenderer,
};

pub const TEST_CONFIG: &str = r#"
[executor]
time_update_interval_ms = 20

[bridge]
blocking_wait_timeout_secs = 5
"#;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Poll `cond` until it holds, or panic after `timeout`.
pub fn wait_until(timeout: Duration, what: &str, mut cond: impl FnMut() -> bool) {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    panic!("Timed out waiting for {}", what);
}

pub fn wait(notification: &StatusNotification) -> PipelineStatus {
    notification
        .wait_timeout(Duration::from_secs(5))
        .expect("callback never fired")
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Instant::now()),
        })
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct EventRecorder {
    events: Mutex<Vec<PipelineEvent>>,
}

impl EventRecorder {
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn contains(&self, event: &PipelineEvent) -> bool {
        self.events.lock().unwrap().contains(event)
    }

    pub fn states(&self) -> Vec<cadence_core::PipelineState> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::StateChanged(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl PipelineObserver for EventRecorder {
    fn on_event(&self, event: &PipelineEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ---------------------------------------------------------------------------
// Fake stages
// ---------------------------------------------------------------------------

/// Operation log shared by every stage of a harness, in call order.
#[derive(Clone, Default)]
pub struct OpLog(Arc<Mutex<Vec<String>>>);

impl OpLog {
    fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.0.lock().unwrap().iter().any(|e| e == entry)
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.lock().unwrap().iter().position(|e| e == entry)
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

struct FakeStream(MediaType);

impl DemuxerStream for FakeStream {
    fn media_type(&self) -> MediaType {
        self.0
    }
}

/// One scripted stage. Implements every stage contract so a single type can
/// stand in for a demuxer, a decoder or a renderer.
///
/// Each operation completes immediately with success unless the test made it
/// fail (`fail`) or hold its completion until `release` (`hold`).
pub struct FakeStage {
    name: String,
    log: OpLog,
    failures: Mutex<HashMap<&'static str, PipelineError>>,
    held: Mutex<HashSet<&'static str>>,
    pending: Mutex<Vec<(&'static str, StatusCb)>>,
    host: Mutex<Option<StageHost>>,

    // Demuxer
    audio: bool,
    video: bool,
    duration: Duration,
    start_time: Duration,
    preload: Mutex<Option<Preload>>,

    // Renderers
    ended: AtomicBool,
    volume: Mutex<Option<f32>>,
    underflow_resumes: AtomicUsize,

    rates: Mutex<Vec<f32>>,
    audio_disabled_notices: AtomicUsize,
}

impl FakeStage {
    pub fn new(name: &str, log: &OpLog) -> Arc<Self> {
        Self::build(name, log, false, false, Duration::ZERO, Duration::ZERO)
    }

    pub fn demuxer(log: &OpLog, media: &Media) -> Arc<Self> {
        Self::build(
            "demuxer",
            log,
            media.audio,
            media.video,
            media.duration,
            media.start_time,
        )
    }

    fn build(
        name: &str,
        log: &OpLog,
        audio: bool,
        video: bool,
        duration: Duration,
        start_time: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            log: log.clone(),
            failures: Mutex::new(HashMap::new()),
            held: Mutex::new(HashSet::new()),
            pending: Mutex::new(Vec::new()),
            host: Mutex::new(None),
            audio,
            video,
            duration,
            start_time,
            preload: Mutex::new(None),
            ended: AtomicBool::new(false),
            volume: Mutex::new(None),
            underflow_resumes: AtomicUsize::new(0),
            rates: Mutex::new(Vec::new()),
            audio_disabled_notices: AtomicUsize::new(0),
        })
    }

    /// Make `op` complete with `err`.
    pub fn fail(&self, op: &'static str, err: PipelineError) {
        self.failures.lock().unwrap().insert(op, err);
    }

    /// Hold completions of `op` until released.
    pub fn hold(&self, op: &'static str) {
        self.held.lock().unwrap().insert(op);
    }

    pub fn has_pending(&self, op: &str) -> bool {
        self.pending.lock().unwrap().iter().any(|(o, _)| *o == op)
    }

    /// Stop holding `op` and complete every held call of it.
    pub fn release(&self, op: &'static str) {
        self.held.lock().unwrap().remove(op);
        let ready: Vec<StatusCb> = {
            let mut pending = self.pending.lock().unwrap();
            let (ready, rest): (Vec<_>, Vec<_>) =
                pending.drain(..).partition(|(o, _)| *o == op);
            *pending = rest;
            ready.into_iter().map(|(_, cb)| cb).collect()
        };
        let status = self.status_for(op);
        for cb in ready {
            cb(status);
        }
    }

    /// Host captured at initialization.
    pub fn host(&self) -> StageHost {
        self.host
            .lock()
            .unwrap()
            .clone()
            .expect("stage was never initialized")
    }

    pub fn set_ended(&self, ended: bool) {
        self.ended.store(ended, Ordering::SeqCst);
    }

    pub fn volume(&self) -> Option<f32> {
        *self.volume.lock().unwrap()
    }

    pub fn preload(&self) -> Option<Preload> {
        *self.preload.lock().unwrap()
    }

    pub fn rates(&self) -> Vec<f32> {
        self.rates.lock().unwrap().clone()
    }

    pub fn audio_disabled_notices(&self) -> usize {
        self.audio_disabled_notices.load(Ordering::SeqCst)
    }

    pub fn underflow_resumes(&self) -> usize {
        self.underflow_resumes.load(Ordering::SeqCst)
    }

    fn status_for(&self, op: &str) -> PipelineStatus {
        match self.failures.lock().unwrap().get(op) {
            Some(err) => Err(*err),
            None => Ok(()),
        }
    }

    fn complete(&self, op: &'static str, done: StatusCb) {
        self.log.push(format!("{}.{}", self.name, op));
        if self.held.lock().unwrap().contains(op) {
            self.pending.lock().unwrap().push((op, done));
            return;
        }
        done(self.status_for(op));
    }

    fn initialized(&self, host: StageHost, done: StatusCb) {
        *self.host.lock().unwrap() = Some(host);
        self.complete("initialize", done);
    }
}

impl Stage for FakeStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn play(&self, done: StatusCb) {
        self.complete("play", done);
    }

    fn pause(&self, done: StatusCb) {
        self.complete("pause", done);
    }

    fn flush(&self, done: StatusCb) {
        self.complete("flush", done);
    }

    fn seek(&self, _time: Duration, done: StatusCb) {
        self.complete("seek", done);
    }

    fn stop(&self, done: StatusCb) {
        self.complete("stop", done);
    }

    fn set_playback_rate(&self, rate: f32) {
        self.rates.lock().unwrap().push(rate);
    }

    fn on_audio_renderer_disabled(&self) {
        self.audio_disabled_notices.fetch_add(1, Ordering::SeqCst);
    }
}

impl Demuxer for FakeStage {
    fn initialize(&self, host: StageHost, done: StatusCb) {
        self.initialized(host, done);
    }

    fn stream(&self, media_type: MediaType) -> Option<Arc<dyn DemuxerStream>> {
        let present = match media_type {
            MediaType::Audio => self.audio,
            MediaType::Video => self.video,
        };
        present.then(|| Arc::new(FakeStream(media_type)) as Arc<dyn DemuxerStream>)
    }

    fn start_time(&self) -> Duration {
        self.start_time
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn bitrate(&self) -> u32 {
        128_000
    }

    fn set_preload(&self, preload: Preload) {
        *self.preload.lock().unwrap() = Some(preload);
    }
}

impl AudioDecoder for FakeStage {
    fn initialize(&self, _stream: Arc<dyn DemuxerStream>, host: StageHost, done: StatusCb) {
        self.initialized(host, done);
    }
}

impl VideoDecoder for FakeStage {
    fn initialize(&self, _stream: Arc<dyn DemuxerStream>, host: StageHost, done: StatusCb) {
        self.initialized(host, done);
    }
}

impl AudioRenderer for FakeStage {
    fn initialize(&self, _decoder: Arc<dyn AudioDecoder>, host: StageHost, done: StatusCb) {
        self.initialized(host, done);
    }

    fn has_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    fn set_volume(&self, volume: f32) {
        *self.volume.lock().unwrap() = Some(volume);
    }

    fn resume_after_underflow(&self, _buffer_more_audio: bool) {
        self.underflow_resumes.fetch_add(1, Ordering::SeqCst);
    }
}

impl VideoRenderer for FakeStage {
    fn initialize(&self, _decoder: Arc<dyn VideoDecoder>, host: StageHost, done: StatusCb) {
        self.initialized(host, done);
    }

    fn has_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// What the fake demuxer claims the media contains.
#[derive(Debug, Clone, Copy)]
pub struct Media {
    pub audio: bool,
    pub video: bool,
    pub duration: Duration,
    pub start_time: Duration,
}

impl Media {
    pub fn audio_video(duration_secs: u64) -> Self {
        Self {
            audio: true,
            video: true,
            duration: Duration::from_secs(duration_secs),
            start_time: Duration::ZERO,
        }
    }

    pub fn video_only(duration_secs: u64) -> Self {
        Self {
            audio: false,
            ..Self::audio_video(duration_secs)
        }
    }

    pub fn audio_only(duration_secs: u64) -> Self {
        Self {
            video: false,
            ..Self::audio_video(duration_secs)
        }
    }
}

pub struct Harness {
    pub pipeline: Pipeline,
    pub clock: Arc<ManualClock>,
    pub events: Arc<EventRecorder>,
    pub log: OpLog,
    pub demuxer: Arc<FakeStage>,
    pub audio_decoder: Arc<FakeStage>,
    pub audio_renderer: Arc<FakeStage>,
    pub video_decoder: Arc<FakeStage>,
    pub video_renderer: Arc<FakeStage>,
    pub ended_count: Arc<AtomicUsize>,
    pub errors: Arc<Mutex<Vec<PipelineStatus>>>,
}

impl Harness {
    pub fn new(media: Media) -> Self {
        Self::with_config(media, TEST_CONFIG)
    }

    pub fn with_config(media: Media, config: &str) -> Self {
        init_logging();
        let config = PipelineConfig::from_toml_str(config).unwrap();
        let clock = ManualClock::new();
        let events = Arc::new(EventRecorder::default());
        let pipeline = Pipeline::builder()
            .config(config)
            .clock_source(clock.clone())
            .observer(events.clone())
            .build()
            .unwrap();

        let log = OpLog::default();
        Self {
            pipeline,
            clock,
            events,
            demuxer: FakeStage::demuxer(&log, &media),
            audio_decoder: FakeStage::new("audio_decoder", &log),
            audio_renderer: FakeStage::new("audio_renderer", &log),
            video_decoder: FakeStage::new("video_decoder", &log),
            video_renderer: FakeStage::new("video_renderer", &log),
            log,
            ended_count: Arc::new(AtomicUsize::new(0)),
            errors: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every fake stage, one candidate per kind.
    pub fn collection(&self) -> StageCollection {
        StageCollection::new()
            .with_demuxer(self.demuxer.clone())
            .with_audio_decoder(self.audio_decoder.clone())
            .with_audio_renderer(self.audio_renderer.clone())
            .with_video_decoder(self.video_decoder.clone())
            .with_video_renderer(self.video_renderer.clone())
    }

    pub fn ended_cb(&self) -> RepeatingStatusCb {
        let count = self.ended_count.clone();
        Arc::new(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    pub fn error_cb(&self) -> StatusCb {
        let errors = self.errors.clone();
        Box::new(move |status| errors.lock().unwrap().push(status))
    }

    pub fn errors(&self) -> Vec<PipelineStatus> {
        self.errors.lock().unwrap().clone()
    }

    /// Start without waiting; returns the start notification.
    pub fn start(&self, collection: StageCollection) -> StatusNotification {
        let started = StatusNotification::new();
        self.pipeline
            .start(collection, self.ended_cb(), self.error_cb(), started.callback())
            .unwrap();
        started
    }

    pub fn start_blocking(&self) -> PipelineStatus {
        self.pipeline
            .start_blocking(self.collection(), self.ended_cb(), self.error_cb())
    }

    pub fn seek(&self, time: Duration) -> StatusNotification {
        let done = StatusNotification::new();
        self.pipeline.seek(time, done.callback()).unwrap();
        done
    }

    pub fn stop(&self) -> StatusNotification {
        let done = StatusNotification::new();
        self.pipeline.stop(done.callback()).unwrap();
        done
    }
}
