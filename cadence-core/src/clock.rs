//! Reference clock used to interpolate playback time between the timestamps
//! stages report.
//!
//! The clock samples a [`ClockSource`] for wall time and scales the elapsed
//! wall time by the playback rate. It is owned by the playback snapshot and
//! only ever touched under the snapshot lock.

use std::sync::Arc;
use std::time::{Duration, Instant};

/// Wall-clock provider. Swapped out in tests for a manually advanced source.
pub trait ClockSource: Send + Sync {
    fn now(&self) -> Instant;
}

/// [`ClockSource`] backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

pub struct ReferenceClock {
    source: Arc<dyn ClockSource>,
    playing: bool,
    /// Paused until a stage reports a usable timestamp.
    waiting_for_update: bool,
    /// Wall time at which `media_time` was last sampled.
    reference: Instant,
    media_time: Duration,
    max_time: Option<Duration>,
    duration: Duration,
    playback_rate: f32,
}

impl ReferenceClock {
    pub fn new(source: Arc<dyn ClockSource>) -> Self {
        let reference = source.now();
        Self {
            source,
            playing: false,
            waiting_for_update: false,
            reference,
            media_time: Duration::ZERO,
            max_time: None,
            duration: Duration::ZERO,
            playback_rate: 0.0,
        }
    }

    /// Media time now. Frozen while paused; otherwise the last sampled time
    /// plus rate-scaled wall time, capped at the max time.
    pub fn elapsed(&self) -> Duration {
        let mut time = self.media_time;
        if self.playing {
            let wall = self.source.now().saturating_duration_since(self.reference);
            time += wall.mul_f64(f64::from(self.playback_rate));
        }
        match self.max_time {
            Some(max) => time.min(max),
            None => time,
        }
    }

    /// Discard accumulated time and rebase to `time`, never running past
    /// `max_time`.
    pub fn set_time(&mut self, time: Duration, max_time: Duration) {
        if time > max_time {
            log::debug!(target: "clock", "time {:?} beyond max {:?}, capping", time, max_time);
        }
        self.reference = self.source.now();
        self.media_time = time.min(max_time);
        self.max_time = Some(max_time);
    }

    pub fn set_max_time(&mut self, max_time: Duration) {
        self.update_reference_points();
        self.max_time = Some(max_time);
        if self.media_time > max_time {
            self.media_time = max_time;
        }
    }

    pub fn play(&mut self) {
        self.reference = self.source.now();
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.update_reference_points();
        self.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Freeze the clock until [`Self::start_if_waiting`] is called.
    pub fn wait_for_update(&mut self) {
        if self.playing {
            self.pause();
        }
        self.waiting_for_update = true;
    }

    pub fn is_waiting_for_update(&self) -> bool {
        self.waiting_for_update
    }

    pub fn start_if_waiting(&mut self) {
        if !self.waiting_for_update {
            return;
        }
        self.waiting_for_update = false;
        self.play();
    }

    pub fn set_playback_rate(&mut self, rate: f32) {
        self.update_reference_points();
        self.playback_rate = rate;
    }

    pub fn playback_rate(&self) -> f32 {
        self.playback_rate
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration = duration;
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Jump to the end of the media and stop advancing.
    pub fn end_of_stream(&mut self) {
        self.playing = false;
        self.waiting_for_update = false;
        self.media_time = self.duration;
        self.max_time = Some(self.duration);
    }

    pub fn reset(&mut self) {
        self.playing = false;
        self.waiting_for_update = false;
        self.reference = self.source.now();
        self.media_time = Duration::ZERO;
        self.max_time = None;
        self.duration = Duration::ZERO;
        self.playback_rate = 0.0;
    }

    fn update_reference_points(&mut self) {
        self.media_time = self.elapsed();
        self.reference = self.source.now();
    }
}
