use std::sync::{Arc, MutexGuard};
use std::time::Duration;

use crossbeam_channel::Sender;

use cadence_types::{PipelineError, PipelineEvent, PipelineStatistics, VideoSize};

use super::commands::PipelineCmd;
use super::snapshot::{PlaybackSnapshot, SharedSnapshot};
use crate::shutdown::ShutdownToken;

/// Reporting channel handed to every stage at initialization.
///
/// Buffering, timing and statistics writes go straight into the shared
/// snapshot under its lock. Anything that can change the state machine
/// (end of stream, errors, audio loss) is posted to the executor instead, so
/// it is safe to call from any thread, including from inside a stage
/// operation that is running on the executor.
///
/// A host outlives its session only as a no-op: once the session's
/// shutdown token is cancelled every writer and report is dropped.
#[derive(Clone)]
pub struct StageHost {
    snapshot: Arc<SharedSnapshot>,
    tx: Sender<PipelineCmd>,
    shutdown: ShutdownToken,
    session: u64,
}

impl StageHost {
    pub(crate) fn new(
        snapshot: Arc<SharedSnapshot>,
        tx: Sender<PipelineCmd>,
        shutdown: ShutdownToken,
        session: u64,
    ) -> Self {
        Self {
            snapshot,
            tx,
            shutdown,
            session,
        }
    }

    fn post(&self, cmd: PipelineCmd) {
        let name = cmd.name();
        if self.tx.send(cmd).is_err() {
            log::debug!(target: "pipeline", "{} dropped: executor gone", name);
        }
    }

    /// Snapshot guard for a writer, or `None` once this session has been
    /// stopped. The token is checked under the lock, and cancellation
    /// always precedes the reset that starts a new session.
    fn live(&self) -> Option<MutexGuard<'_, PlaybackSnapshot>> {
        let snapshot = self.snapshot.lock();
        if self.shutdown.is_cancelled() {
            log::trace!(target: "pipeline", "write from stopped session {} dropped", self.session);
            return None;
        }
        Some(snapshot)
    }

    /// Cancellation token of the session this host belongs to.
    pub fn shutdown_token(&self) -> ShutdownToken {
        self.shutdown.clone()
    }

    pub fn set_duration(&self, duration: Duration) {
        let Some(mut snapshot) = self.live() else {
            return;
        };
        snapshot.clock.set_duration(duration);
        drop(snapshot);
        self.post(PipelineCmd::Notify(PipelineEvent::DurationSet(duration)));
    }

    pub fn duration(&self) -> Duration {
        self.snapshot.lock().duration()
    }

    pub fn set_total_bytes(&self, total_bytes: u64) {
        let Some(mut snapshot) = self.live() else {
            return;
        };
        snapshot.total_bytes = total_bytes;
        drop(snapshot);
        self.post(PipelineCmd::Notify(PipelineEvent::TotalBytesSet(total_bytes)));
    }

    pub fn set_buffered_bytes(&self, buffered_bytes: u64) {
        if let Some(mut snapshot) = self.live() {
            snapshot.set_buffered_bytes(buffered_bytes);
        }
    }

    pub fn set_current_read_position(&self, offset: u64) {
        if let Some(mut snapshot) = self.live() {
            snapshot.set_current_read_position(offset);
        }
    }

    pub fn add_buffered_byte_range(&self, start: u64, end: u64) {
        if let Some(mut snapshot) = self.live() {
            snapshot.buffered_byte_ranges.add(start, end);
            snapshot.did_loading_progress = true;
        }
    }

    pub fn add_buffered_time_range(&self, start: Duration, end: Duration) {
        if let Some(mut snapshot) = self.live() {
            snapshot.buffered_time_ranges.add(start, end);
            snapshot.did_loading_progress = true;
        }
    }

    pub fn set_buffered_time(&self, buffered_time: Duration) {
        if let Some(mut snapshot) = self.live() {
            snapshot.buffered_time = buffered_time;
            snapshot.did_loading_progress = true;
        }
    }

    pub fn set_natural_size(&self, size: VideoSize) {
        let Some(mut snapshot) = self.live() else {
            return;
        };
        snapshot.natural_size = size;
        drop(snapshot);
        self.post(PipelineCmd::Notify(PipelineEvent::VideoSizeChanged(size)));
    }

    pub fn set_streaming(&self, streaming: bool) {
        if let Some(mut snapshot) = self.live() {
            snapshot.streaming = streaming;
        }
    }

    pub fn set_loaded(&self, loaded: bool) {
        if let Some(mut snapshot) = self.live() {
            snapshot.loaded = loaded;
        }
    }

    /// Accumulate decode counters.
    pub fn update_statistics(&self, delta: PipelineStatistics) {
        if let Some(mut snapshot) = self.live() {
            snapshot.statistics += delta;
        }
    }

    /// Timestamp from the audio path; drives the reference clock.
    pub fn audio_time_update(&self, time: Duration, max_time: Duration) {
        if let Some(mut snapshot) = self.live() {
            snapshot.audio_time_update(time, max_time);
        }
    }

    /// Latest video frame time; caps the clock when there is no audio.
    pub fn video_time_update(&self, max_time: Duration) {
        if let Some(mut snapshot) = self.live() {
            snapshot.video_time_update(max_time);
        }
    }

    /// A renderer reached end of stream.
    pub fn ended(&self) {
        self.post(PipelineCmd::RendererEnded {
            session: self.session,
        });
    }

    pub fn error(&self, error: PipelineError) {
        self.post(PipelineCmd::StageError {
            session: self.session,
            error,
        });
    }

    /// The audio renderer lost its output device.
    pub fn audio_disabled(&self) {
        self.post(PipelineCmd::AudioDisabled {
            session: self.session,
        });
    }

    pub fn audio_underflow(&self) {
        self.post(PipelineCmd::AudioUnderflow {
            session: self.session,
        });
    }

    pub fn set_network_activity(&self, active: bool) {
        if self.shutdown.is_cancelled() {
            return;
        }
        self.post(PipelineCmd::NetworkActivity(active));
    }
}
