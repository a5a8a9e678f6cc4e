//! The lock-guarded subset of pipeline state readable from any thread.
//!
//! The executor mirrors the few lifecycle flags other threads need into here;
//! stages write buffering/time/statistics updates directly through their
//! host. One mutex guards the whole snapshot, including the reference clock,
//! and nothing blocks while it is held.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use cadence_types::{PipelineStatistics, PipelineStatus, Preload, Ranges, VideoSize};

use crate::clock::{ClockSource, ReferenceClock};
use crate::shutdown::ShutdownToken;

/// Values a fresh session starts from.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PlaybackDefaults {
    pub volume: f32,
    pub playback_rate: f32,
    pub preload: Preload,
}

pub(crate) struct PlaybackSnapshot {
    defaults: PlaybackDefaults,

    // Lifecycle flags mirrored by the executor.
    pub running: bool,
    pub stop_requested: bool,
    pub tearing_down: bool,
    pub initialized: bool,
    pub ended: bool,
    pub seeking: bool,
    pub status: PipelineStatus,
    pub shutdown: ShutdownToken,

    pub clock: ReferenceClock,
    /// Lowest value `current_time` may report until the next seek.
    time_floor: Duration,

    pub has_audio: bool,
    pub has_video: bool,
    pub natural_size: VideoSize,

    pub volume: f32,
    pub playback_rate: f32,
    pub preload: Preload,

    pub total_bytes: u64,
    buffered_bytes: u64,
    current_bytes: u64,
    /// Explicitly reported buffered extent; zero when never reported.
    pub buffered_time: Duration,
    pub buffered_byte_ranges: Ranges<u64>,
    pub buffered_time_ranges: Ranges<Duration>,
    max_buffered_time: Duration,
    pub did_loading_progress: bool,

    pub streaming: bool,
    pub loaded: bool,
    pub local_source: bool,
    pub bitrate: u32,
    pub network_activity: bool,

    pub statistics: PipelineStatistics,
}

impl PlaybackSnapshot {
    pub(crate) fn new(source: Arc<dyn ClockSource>, defaults: PlaybackDefaults) -> Self {
        let mut snapshot = Self {
            defaults,
            running: false,
            stop_requested: false,
            tearing_down: false,
            initialized: false,
            ended: false,
            seeking: false,
            status: Ok(()),
            shutdown: ShutdownToken::new(),
            clock: ReferenceClock::new(source),
            time_floor: Duration::ZERO,
            has_audio: false,
            has_video: false,
            natural_size: VideoSize::default(),
            volume: defaults.volume,
            playback_rate: defaults.playback_rate,
            preload: defaults.preload,
            total_bytes: 0,
            buffered_bytes: 0,
            current_bytes: 0,
            buffered_time: Duration::ZERO,
            buffered_byte_ranges: Ranges::new(),
            buffered_time_ranges: Ranges::new(),
            max_buffered_time: Duration::ZERO,
            did_loading_progress: false,
            streaming: false,
            loaded: false,
            local_source: false,
            bitrate: 0,
            network_activity: false,
            statistics: PipelineStatistics::default(),
        };
        snapshot.reset();
        snapshot
    }

    /// Back to the pre-`start` state. The shutdown token of the finished
    /// session is kept so late readers still see it cancelled.
    pub(crate) fn reset(&mut self) {
        self.running = false;
        self.stop_requested = false;
        self.tearing_down = false;
        self.initialized = false;
        self.ended = false;
        self.seeking = false;
        self.status = Ok(());
        self.clock.reset();
        self.clock.set_playback_rate(self.defaults.playback_rate);
        self.time_floor = Duration::ZERO;
        self.has_audio = false;
        self.has_video = false;
        self.natural_size = VideoSize::default();
        self.volume = self.defaults.volume;
        self.playback_rate = self.defaults.playback_rate;
        self.preload = self.defaults.preload;
        self.total_bytes = 0;
        self.buffered_bytes = 0;
        self.current_bytes = 0;
        self.buffered_time = Duration::ZERO;
        self.buffered_byte_ranges.clear();
        self.buffered_time_ranges.clear();
        self.max_buffered_time = Duration::ZERO;
        self.did_loading_progress = false;
        self.streaming = false;
        self.loaded = false;
        self.local_source = false;
        self.bitrate = 0;
        self.network_activity = false;
        self.statistics = PipelineStatistics::default();
    }

    pub(crate) fn duration(&self) -> Duration {
        self.clock.duration()
    }

    /// Rebase reported time after a seek: the clock jumps to `time` and the
    /// monotonic floors restart from there.
    pub(crate) fn rebase_time(&mut self, time: Duration) {
        self.clock.set_time(time, time);
        self.time_floor = time;
        self.max_buffered_time = Duration::ZERO;
    }

    /// Playback position, capped at the duration and never lower than a
    /// previously reported value since the last seek.
    pub(crate) fn current_time(&mut self) -> Duration {
        let duration = self.duration();
        if self.ended {
            return duration;
        }
        let elapsed = self.clock.elapsed();
        let time = if elapsed > duration { duration } else { elapsed };
        if time > self.time_floor {
            self.time_floor = time;
        }
        self.time_floor.min(duration)
    }

    /// Buffered extent. Uses the explicitly reported value when there is one,
    /// otherwise estimates from the buffered byte ratio. Never regresses
    /// between seeks.
    pub(crate) fn buffered_time(&mut self) -> Duration {
        let duration = self.duration();
        if self.loaded || (self.total_bytes > 0 && self.total_bytes == self.buffered_bytes) {
            self.max_buffered_time = duration;
            return duration;
        }

        let current = self.current_time();

        let explicit = self
            .buffered_time_ranges
            .iter()
            .map(|(_, end)| end)
            .max()
            .unwrap_or(Duration::ZERO)
            .max(self.buffered_time);
        let estimate = if !explicit.is_zero() {
            if duration.is_zero() { explicit } else { explicit.min(duration) }
        } else if self.total_bytes == 0 {
            Duration::ZERO
        } else {
            scale(duration, self.buffered_bytes, self.total_bytes).min(duration)
        };

        let buffered = estimate.max(current);
        self.max_buffered_time = self.max_buffered_time.max(buffered);
        self.max_buffered_time
    }

    /// Explicit time ranges plus byte ranges mapped onto the timeline.
    pub(crate) fn buffered_time_ranges(&self) -> Ranges<Duration> {
        let mut ranges = self.buffered_time_ranges.clone();
        let duration = self.duration();
        if duration.is_zero() || self.total_bytes == 0 {
            return ranges;
        }
        for (start, end) in self.buffered_byte_ranges.iter() {
            let start = self.time_for_byte_offset(start);
            let end = self.time_for_byte_offset(end).min(duration);
            ranges.add(start, end);
        }
        ranges
    }

    /// Approximate media time at `offset`, snapping the first and last
    /// percent of the timeline to its edges.
    fn time_for_byte_offset(&self, offset: u64) -> Duration {
        let duration = self.duration();
        let time = scale(duration, offset, self.total_bytes);
        let epsilon = duration / 100;
        if time < epsilon {
            return Duration::ZERO;
        }
        if time + epsilon > duration {
            return duration;
        }
        time
    }

    pub(crate) fn buffered_bytes(&self) -> u64 {
        self.buffered_bytes
    }

    pub(crate) fn current_read_position(&self) -> u64 {
        self.current_bytes
    }

    pub(crate) fn set_buffered_bytes(&mut self, bytes: u64) {
        if bytes < self.current_bytes {
            self.current_bytes = bytes;
        }
        self.buffered_bytes = bytes;
        self.did_loading_progress = true;
    }

    pub(crate) fn set_current_read_position(&mut self, offset: u64) {
        if offset > self.buffered_bytes {
            self.buffered_bytes = offset;
        }
        self.current_bytes = offset;
    }

    /// Apply an audio-clock timestamp. Ignored without audio, while seeking,
    /// or when it would drag a waiting clock backwards.
    pub(crate) fn audio_time_update(&mut self, time: Duration, max_time: Duration) {
        if !self.has_audio || self.seeking {
            return;
        }
        if self.clock.is_waiting_for_update() && time < self.clock.elapsed() {
            return;
        }
        self.clock.set_time(time, max_time);
        self.clock.start_if_waiting();
    }

    pub(crate) fn video_time_update(&mut self, max_time: Duration) {
        if self.has_audio || self.seeking {
            return;
        }
        self.clock.set_max_time(max_time);
    }

    /// Release a clock that would otherwise wait for audio timestamps.
    pub(crate) fn run_clock_to_duration(&mut self) {
        let duration = self.duration();
        self.clock.set_max_time(duration);
        self.clock.start_if_waiting();
    }
}

/// `total * num / den` without overflowing the intermediate product.
fn scale(total: Duration, num: u64, den: u64) -> Duration {
    if den == 0 {
        return Duration::ZERO;
    }
    let nanos = total.as_nanos() * u128::from(num) / u128::from(den);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Shared handle to the snapshot.
pub(crate) struct SharedSnapshot {
    inner: Mutex<PlaybackSnapshot>,
}

impl SharedSnapshot {
    pub(crate) fn new(source: Arc<dyn ClockSource>, defaults: PlaybackDefaults) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(PlaybackSnapshot::new(source, defaults)),
        })
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, PlaybackSnapshot> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
