use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use crossbeam_channel::Sender;

use cadence_types::{
    PipelineError, PipelineStatistics, PipelineStatus, Preload, Ranges, VideoSize,
};

use super::commands::{PipelineCmd, SessionCallbacks};
use super::executor::PipelineExecutor;
use super::snapshot::{PlaybackDefaults, SharedSnapshot};
use crate::clock::{ClockSource, SystemClock};
use crate::config::PipelineConfig;
use crate::notification::StatusNotification;
use crate::observer::{ObserverList, PipelineObserver};
use crate::shutdown::ShutdownToken;
use crate::stage::{RepeatingStatusCb, StageCollection, StatusCb};

/// Configures and spawns a [`Pipeline`].
pub struct PipelineBuilder {
    config: PipelineConfig,
    observers: Vec<Arc<dyn PipelineObserver>>,
    clock_source: Arc<dyn ClockSource>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            observers: Vec::new(),
            clock_source: Arc::new(SystemClock),
        }
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Register an observer. Observers live as long as the pipeline.
    pub fn observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Replace the wall clock the reference clock samples.
    pub fn clock_source(mut self, source: Arc<dyn ClockSource>) -> Self {
        self.clock_source = source;
        self
    }

    /// Spawn the executor thread.
    pub fn build(self) -> std::io::Result<Pipeline> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let defaults = PlaybackDefaults {
            volume: self.config.initial_volume(),
            playback_rate: self.config.initial_playback_rate(),
            preload: self.config.preload(),
        };
        let snapshot = SharedSnapshot::new(self.clock_source, defaults);

        let executor = PipelineExecutor::new(
            rx,
            tx.clone(),
            Arc::clone(&snapshot),
            ObserverList::new(self.observers),
            self.config.time_update_interval(),
        );
        let join_handle = thread::Builder::new()
            .name(self.config.thread_name())
            .spawn(move || executor.run())?;

        Ok(Pipeline {
            tx,
            snapshot,
            bridge_timeout: self.config.blocking_wait_timeout(),
            executor_thread: join_handle.thread().id(),
            join_handle: Some(join_handle),
        })
    }
}

/// Handle to a running pipeline coordinator.
///
/// Every method may be called from any thread. Requests are validated
/// synchronously and then posted to the executor, so none of them block
/// except the `*_blocking` helpers. Accessors copy out of the shared
/// snapshot and are valid at any time, including before `start` and after
/// `stop`.
pub struct Pipeline {
    tx: Sender<PipelineCmd>,
    snapshot: Arc<SharedSnapshot>,
    bridge_timeout: Duration,
    executor_thread: ThreadId,
    join_handle: Option<JoinHandle<()>>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    fn send(&self, cmd: PipelineCmd) -> Result<(), PipelineError> {
        self.tx.send(cmd).map_err(|_| PipelineError::ExecutorGone)
    }

    /// Begin a session with `collection`. `start_cb` fires once preroll
    /// finishes or initialization fails; `error_cb` fires at most once, after
    /// an error-driven teardown; `ended_cb` fires each time playback reaches
    /// the end.
    pub fn start(
        &self,
        collection: StageCollection,
        ended_cb: RepeatingStatusCb,
        error_cb: StatusCb,
        start_cb: StatusCb,
    ) -> Result<(), PipelineError> {
        let shutdown = ShutdownToken::new();
        {
            let mut snapshot = self.snapshot.lock();
            if snapshot.running {
                return Err(PipelineError::AlreadyRunning);
            }
            snapshot.running = true;
            snapshot.shutdown = shutdown.clone();
        }

        let cmd = PipelineCmd::Start {
            collection,
            callbacks: SessionCallbacks {
                ended: ended_cb,
                error: error_cb,
                start: start_cb,
            },
            shutdown,
        };
        self.send(cmd).inspect_err(|_| {
            self.snapshot.lock().running = false;
        })
    }

    /// Seek to `time`. Only honored once started; otherwise `done` receives
    /// `InvalidState` and nothing else happens.
    pub fn seek(&self, time: Duration, done: StatusCb) -> Result<(), PipelineError> {
        if !self.snapshot.lock().running {
            return Err(PipelineError::NotRunning);
        }
        self.send(PipelineCmd::Seek { time, done })
    }

    /// Tear the session down. `done` always fires, after every stage has
    /// been stopped and released.
    pub fn stop(&self, done: StatusCb) -> Result<(), PipelineError> {
        {
            let mut snapshot = self.snapshot.lock();
            if !snapshot.running {
                return Err(PipelineError::NotRunning);
            }
            if snapshot.stop_requested {
                return Err(PipelineError::InvalidState);
            }
            snapshot.stop_requested = true;
        }
        self.send(PipelineCmd::Stop { done }).inspect_err(|_| {
            self.snapshot.lock().stop_requested = false;
        })
    }

    pub fn set_playback_rate(&self, rate: f32) -> Result<(), PipelineError> {
        if !rate.is_finite() || rate < 0.0 {
            return Err(PipelineError::InvalidArgument);
        }
        let running = {
            let mut snapshot = self.snapshot.lock();
            snapshot.playback_rate = rate;
            snapshot.running
        };
        if running {
            self.send(PipelineCmd::SetPlaybackRate(rate))?;
        }
        Ok(())
    }

    pub fn set_volume(&self, volume: f32) -> Result<(), PipelineError> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(PipelineError::InvalidArgument);
        }
        let running = {
            let mut snapshot = self.snapshot.lock();
            snapshot.volume = volume;
            snapshot.running
        };
        if running {
            self.send(PipelineCmd::SetVolume(volume))?;
        }
        Ok(())
    }

    pub fn set_preload(&self, preload: Preload) -> Result<(), PipelineError> {
        let running = {
            let mut snapshot = self.snapshot.lock();
            snapshot.preload = preload;
            snapshot.running
        };
        if running {
            self.send(PipelineCmd::SetPreload(preload))?;
        }
        Ok(())
    }

    // Blocking helpers

    fn ensure_off_executor(&self) -> Result<(), PipelineError> {
        if thread::current().id() == self.executor_thread {
            log::error!(target: "pipeline", "blocking call on the executor thread");
            return Err(PipelineError::InvalidState);
        }
        Ok(())
    }

    fn wait(&self, notification: &StatusNotification) -> PipelineStatus {
        notification
            .wait_timeout(self.bridge_timeout)
            .unwrap_or_else(|| {
                log::warn!(target: "pipeline", "gave up waiting after {:?}", self.bridge_timeout);
                Err(PipelineError::Timeout)
            })
    }

    /// [`Self::start`], then wait for the start callback. A timeout only
    /// abandons the wait; the session keeps initializing.
    pub fn start_blocking(
        &self,
        collection: StageCollection,
        ended_cb: RepeatingStatusCb,
        error_cb: StatusCb,
    ) -> PipelineStatus {
        self.ensure_off_executor()?;
        let notification = StatusNotification::new();
        self.start(collection, ended_cb, error_cb, notification.callback())?;
        self.wait(&notification)
    }

    pub fn seek_blocking(&self, time: Duration) -> PipelineStatus {
        self.ensure_off_executor()?;
        let notification = StatusNotification::new();
        self.seek(time, notification.callback())?;
        self.wait(&notification)
    }

    pub fn stop_blocking(&self) -> PipelineStatus {
        self.ensure_off_executor()?;
        let notification = StatusNotification::new();
        self.stop(notification.callback())?;
        self.wait(&notification)
    }

    // Accessors

    pub fn is_running(&self) -> bool {
        self.snapshot.lock().running
    }

    pub fn is_initialized(&self) -> bool {
        self.snapshot.lock().initialized
    }

    pub fn has_audio(&self) -> bool {
        self.snapshot.lock().has_audio
    }

    pub fn has_video(&self) -> bool {
        self.snapshot.lock().has_video
    }

    pub fn playback_rate(&self) -> f32 {
        self.snapshot.lock().playback_rate
    }

    pub fn volume(&self) -> f32 {
        self.snapshot.lock().volume
    }

    pub fn preload(&self) -> Preload {
        self.snapshot.lock().preload
    }

    /// Raw reference-clock time, without the clamping `current_time` applies.
    pub fn media_time(&self) -> Duration {
        self.snapshot.lock().clock.elapsed()
    }

    /// Playback position. Never exceeds the duration and never moves
    /// backwards except across a seek.
    pub fn current_time(&self) -> Duration {
        self.snapshot.lock().current_time()
    }

    pub fn buffered_time(&self) -> Duration {
        self.snapshot.lock().buffered_time()
    }

    pub fn buffered_time_ranges(&self) -> Ranges<Duration> {
        self.snapshot.lock().buffered_time_ranges()
    }

    pub fn duration(&self) -> Duration {
        self.snapshot.lock().duration()
    }

    pub fn total_bytes(&self) -> u64 {
        self.snapshot.lock().total_bytes
    }

    pub fn buffered_bytes(&self) -> u64 {
        self.snapshot.lock().buffered_bytes()
    }

    pub fn current_read_position(&self) -> u64 {
        self.snapshot.lock().current_read_position()
    }

    pub fn natural_video_size(&self) -> VideoSize {
        self.snapshot.lock().natural_size
    }

    pub fn is_streaming(&self) -> bool {
        self.snapshot.lock().streaming
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot.lock().loaded
    }

    pub fn is_local_source(&self) -> bool {
        self.snapshot.lock().local_source
    }

    pub fn bitrate(&self) -> u32 {
        self.snapshot.lock().bitrate
    }

    pub fn network_activity(&self) -> bool {
        self.snapshot.lock().network_activity
    }

    /// True if buffering advanced since the previous call.
    pub fn did_loading_progress(&self) -> bool {
        std::mem::take(&mut self.snapshot.lock().did_loading_progress)
    }

    pub fn statistics(&self) -> PipelineStatistics {
        self.snapshot.lock().statistics
    }

    /// Latched error of the current session, if any.
    pub fn status(&self) -> PipelineStatus {
        self.snapshot.lock().status
    }

    /// Cancellation token of the current (or most recent) session.
    pub fn shutdown_token(&self) -> ShutdownToken {
        self.snapshot.lock().shutdown.clone()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        let (running, errored) = {
            let snapshot = self.snapshot.lock();
            (snapshot.running, snapshot.status.is_err())
        };
        if running && !errored {
            log::error!(target: "pipeline", "pipeline dropped while running; stop it first");
        }
        let _ = self.tx.send(PipelineCmd::Shutdown);
        if thread::current().id() == self.executor_thread {
            // Dropped from a callback; the executor exits on its own.
            return;
        }
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}
