//! Fan-out/fan-in over every stage taking part in a session.
//!
//! A lifecycle operation is issued to all stages at once; the group's own
//! completion fires after the last stage reports back, carrying the first
//! failure seen (if any). Completion order across stages is unspecified.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cadence_types::{PipelineError, PipelineStatus};

use crate::stage::{Stage, StatusCb};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageOp {
    Play,
    Pause,
    Flush,
    Seek(Duration),
    Stop,
}

#[derive(Default)]
pub struct StageGroup {
    stages: Vec<Arc<dyn Stage>>,
    /// Set once the first lifecycle operation is issued; membership is frozen
    /// from then on.
    started: bool,
}

impl StageGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `stage`. Returns false once the group has begun an operation.
    pub fn add_stage(&mut self, stage: Arc<dyn Stage>) -> bool {
        if self.started {
            log::warn!(target: "stage_group", "refusing to add {} to a running group", stage.name());
            return false;
        }
        self.stages.push(stage);
        true
    }

    /// Drop a stage that failed recoverably during initialization.
    pub(crate) fn remove_stage(&mut self, stage: &Arc<dyn Stage>) -> bool {
        let before = self.stages.len();
        self.stages
            .retain(|s| !std::ptr::addr_eq(Arc::as_ptr(s), Arc::as_ptr(stage)));
        self.stages.len() != before
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.name().to_string()).collect()
    }

    /// Release every stage and accept new members again.
    pub fn clear(&mut self) {
        self.stages.clear();
        self.started = false;
    }

    pub fn play(&mut self, done: StatusCb) {
        self.run(StageOp::Play, done);
    }

    pub fn pause(&mut self, done: StatusCb) {
        self.run(StageOp::Pause, done);
    }

    pub fn flush(&mut self, done: StatusCb) {
        self.run(StageOp::Flush, done);
    }

    pub fn seek(&mut self, time: Duration, done: StatusCb) {
        self.run(StageOp::Seek(time), done);
    }

    pub fn stop(&mut self, done: StatusCb) {
        self.run(StageOp::Stop, done);
    }

    pub fn set_playback_rate(&self, rate: f32) {
        for stage in &self.stages {
            stage.set_playback_rate(rate);
        }
    }

    pub fn on_audio_renderer_disabled(&self) {
        for stage in &self.stages {
            stage.on_audio_renderer_disabled();
        }
    }

    fn run(&mut self, op: StageOp, done: StatusCb) {
        self.started = true;
        if self.stages.is_empty() {
            done(Ok(()));
            return;
        }

        log::trace!(target: "stage_group", "{:?} -> {} stages", op, self.stages.len());
        let fan_in = FanIn::new(self.stages.len(), done);
        // Snapshot membership so a stage completing synchronously cannot
        // observe a half-issued operation.
        let stages = self.stages.clone();
        for stage in stages {
            let cb = fan_in.callback();
            match op {
                StageOp::Play => stage.play(cb),
                StageOp::Pause => stage.pause(cb),
                StageOp::Flush => stage.flush(cb),
                StageOp::Seek(time) => stage.seek(time, cb),
                StageOp::Stop => stage.stop(cb),
            }
        }
    }
}

struct FanInState {
    remaining: usize,
    first_error: Option<PipelineError>,
    done: Option<StatusCb>,
}

/// Counts outstanding per-stage completions.
struct FanIn {
    state: Mutex<FanInState>,
}

impl FanIn {
    fn new(count: usize, done: StatusCb) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FanInState {
                remaining: count,
                first_error: None,
                done: Some(done),
            }),
        })
    }

    fn callback(self: &Arc<Self>) -> StatusCb {
        let fan_in = Arc::clone(self);
        Box::new(move |status| fan_in.complete(status))
    }

    fn complete(&self, status: PipelineStatus) {
        let finished = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if let Err(err) = status {
                state.first_error.get_or_insert(err);
            }
            state.remaining = state.remaining.saturating_sub(1);
            if state.remaining == 0 {
                state.done.take().map(|done| (done, state.first_error))
            } else {
                None
            }
        };

        // Run outside the lock; `done` may re-enter the coordinator.
        if let Some((done, first_error)) = finished {
            done(first_error.map_or(Ok(()), Err));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    /// Records operations and either completes immediately or parks the
    /// callback for the test to release.
    struct Probe {
        name: String,
        ops: Mutex<Vec<String>>,
        parked: Mutex<Vec<StatusCb>>,
        defer: bool,
        result: PipelineStatus,
    }

    impl Probe {
        fn immediate(name: &str, result: PipelineStatus) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                ops: Mutex::new(Vec::new()),
                parked: Mutex::new(Vec::new()),
                defer: false,
                result,
            })
        }

        fn deferred(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                ops: Mutex::new(Vec::new()),
                parked: Mutex::new(Vec::new()),
                defer: true,
                result: Ok(()),
            })
        }

        fn handle(&self, op: &str, done: StatusCb) {
            self.ops.lock().unwrap().push(op.to_string());
            if self.defer {
                self.parked.lock().unwrap().push(done);
            } else {
                done(self.result);
            }
        }

        fn release(&self, status: PipelineStatus) {
            let cbs: Vec<StatusCb> = self.parked.lock().unwrap().drain(..).collect();
            for cb in cbs {
                cb(status);
            }
        }
    }

    impl Stage for Probe {
        fn name(&self) -> &str {
            &self.name
        }
        fn play(&self, done: StatusCb) {
            self.handle("play", done);
        }
        fn pause(&self, done: StatusCb) {
            self.handle("pause", done);
        }
        fn seek(&self, time: Duration, done: StatusCb) {
            self.handle(&format!("seek {}", time.as_secs()), done);
        }
        fn stop(&self, done: StatusCb) {
            self.handle("stop", done);
        }
    }

    fn recorder() -> (StatusCb, mpsc::Receiver<PipelineStatus>) {
        let (tx, rx) = mpsc::channel();
        (Box::new(move |s| tx.send(s).unwrap()), rx)
    }

    #[test]
    fn empty_group_completes_immediately() {
        let mut group = StageGroup::new();
        let (done, rx) = recorder();
        group.play(done);
        assert_eq!(rx.try_recv().unwrap(), Ok(()));
    }

    #[test]
    fn completes_after_the_slowest_stage() {
        let fast = Probe::immediate("fast", Ok(()));
        let slow = Probe::deferred("slow");
        let mut group = StageGroup::new();
        assert!(group.add_stage(fast.clone()));
        assert!(group.add_stage(slow.clone()));

        let (done, rx) = recorder();
        group.pause(done);
        assert!(rx.try_recv().is_err());

        slow.release(Ok(()));
        assert_eq!(rx.try_recv().unwrap(), Ok(()));
        assert_eq!(*fast.ops.lock().unwrap(), vec!["pause"]);
        assert_eq!(*slow.ops.lock().unwrap(), vec!["pause"]);
    }

    #[test]
    fn first_failure_is_reported() {
        let a = Probe::deferred("a");
        let b = Probe::deferred("b");
        let mut group = StageGroup::new();
        group.add_stage(a.clone());
        group.add_stage(b.clone());

        let (done, rx) = recorder();
        group.seek(Duration::from_secs(7), done);
        b.release(Err(PipelineError::Read));
        a.release(Err(PipelineError::Decode));
        assert_eq!(rx.try_recv().unwrap(), Err(PipelineError::Read));
        assert_eq!(*a.ops.lock().unwrap(), vec!["seek 7"]);
    }

    #[test]
    fn membership_frozen_once_running() {
        let mut group = StageGroup::new();
        group.add_stage(Probe::immediate("a", Ok(())));
        let (done, _rx) = recorder();
        group.stop(done);
        assert!(!group.add_stage(Probe::immediate("late", Ok(()))));

        group.clear();
        assert!(group.add_stage(Probe::immediate("fresh", Ok(()))));
    }

    #[test]
    fn remove_stage_matches_by_identity() {
        let a = Probe::immediate("a", Ok(()));
        let b = Probe::immediate("b", Ok(()));
        let mut group = StageGroup::new();
        group.add_stage(a.clone());
        group.add_stage(b.clone());

        let a_stage: Arc<dyn Stage> = a;
        assert!(group.remove_stage(&a_stage));
        assert!(!group.remove_stage(&a_stage));
        assert_eq!(group.stage_names(), vec!["b"]);
    }
}
