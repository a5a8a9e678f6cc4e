//! The pipeline executor: a dedicated thread that owns the state machine.
//!
//! Public requests, stage completions and stage reports all arrive as
//! [`PipelineCmd`]s on one channel and are handled strictly in order, so the
//! current [`PipelineState`], the stage group and every pending callback are
//! only ever touched from this thread. Stage completions never call back into
//! the executor directly; they post a command, which keeps a stage that
//! completes synchronously from re-entering a handler.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use cadence_types::{MediaType, PipelineError, PipelineEvent, PipelineState, PipelineStatus, Preload};

use super::commands::{PipelineCmd, SessionCallbacks};
use super::host::StageHost;
use super::snapshot::SharedSnapshot;
use super::transitions::{
    find_next_state, group_op, is_transient, teardown_plan, GroupOp, TeardownPlan,
    TransitionFlags,
};
use crate::observer::ObserverList;
use crate::shutdown::ShutdownToken;
use crate::stage::{
    AudioDecoder, AudioRenderer, Demuxer, RepeatingStatusCb, Stage, StageCollection, StatusCb,
    VideoDecoder, VideoRenderer,
};
use crate::stage_group::StageGroup;

/// Group operation currently awaiting its fan-in.
#[derive(Debug, Clone, Copy)]
struct InFlight {
    id: u64,
    teardown: bool,
}

/// Outcome of kicking off one initialization step.
enum InitStep {
    /// The stage was asked to initialize; its completion will arrive later.
    Pending,
    /// Nothing to initialize for this step (e.g. no audio stream).
    Skipped,
    Failed(PipelineError),
}

pub(crate) struct PipelineExecutor {
    rx: Receiver<PipelineCmd>,
    /// Loopback sender for stage completions.
    tx: Sender<PipelineCmd>,
    snapshot: Arc<SharedSnapshot>,
    observers: ObserverList,
    update_interval: Duration,
    last_update: Instant,

    state: PipelineState,
    flags: TransitionFlags,
    session: u64,
    next_op: u64,
    in_flight: Option<InFlight>,

    collection: StageCollection,
    group: StageGroup,
    host: Option<StageHost>,
    demuxer: Option<Arc<dyn Demuxer>>,
    audio_decoder: Option<Arc<dyn AudioDecoder>>,
    video_decoder: Option<Arc<dyn VideoDecoder>>,
    audio_renderer: Option<Arc<dyn AudioRenderer>>,
    video_renderer: Option<Arc<dyn VideoRenderer>>,
    audio_disabled: bool,
    shutdown: ShutdownToken,

    seek_time: Duration,
    /// Rate requested while a seek was in progress; applied once it lands.
    pending_rate: Option<f32>,

    ended_cb: Option<RepeatingStatusCb>,
    error_cb: Option<StatusCb>,
    start_cb: Option<StatusCb>,
    seek_cb: Option<StatusCb>,
    stop_cb: Option<StatusCb>,
}

impl PipelineExecutor {
    pub(crate) fn new(
        rx: Receiver<PipelineCmd>,
        tx: Sender<PipelineCmd>,
        snapshot: Arc<SharedSnapshot>,
        observers: ObserverList,
        update_interval: Duration,
    ) -> Self {
        Self {
            rx,
            tx,
            snapshot,
            observers,
            update_interval,
            last_update: Instant::now(),
            state: PipelineState::Created,
            flags: TransitionFlags::default(),
            session: 0,
            next_op: 0,
            in_flight: None,
            collection: StageCollection::default(),
            group: StageGroup::new(),
            host: None,
            demuxer: None,
            audio_decoder: None,
            video_decoder: None,
            audio_renderer: None,
            video_renderer: None,
            audio_disabled: false,
            shutdown: ShutdownToken::new(),
            seek_time: Duration::ZERO,
            pending_rate: None,
            ended_cb: None,
            error_cb: None,
            start_cb: None,
            seek_cb: None,
            stop_cb: None,
        }
    }

    pub(crate) fn run(mut self) {
        self.observers.notify(&PipelineEvent::Created);

        loop {
            let remaining = self.update_interval.saturating_sub(self.last_update.elapsed());
            match self.rx.recv_timeout(remaining) {
                Ok(cmd) => {
                    if self.handle_cmd(cmd) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if self.last_update.elapsed() >= self.update_interval {
                self.last_update = Instant::now();
                self.emit_time_update();
            }
        }

        self.shut_down();
        self.observers.notify(&PipelineEvent::Destroyed);
    }

    /// Returns true when the executor should exit.
    fn handle_cmd(&mut self, cmd: PipelineCmd) -> bool {
        log::trace!(target: "pipeline", "{} in {}", cmd.name(), self.state);
        match cmd {
            PipelineCmd::Start {
                collection,
                callbacks,
                shutdown,
            } => self.handle_start(collection, callbacks, shutdown),
            PipelineCmd::Seek { time, done } => self.handle_seek(time, done),
            PipelineCmd::Stop { done } => self.handle_stop(done),
            PipelineCmd::SetPlaybackRate(rate) => self.apply_playback_rate(rate),
            PipelineCmd::SetVolume(volume) => self.apply_volume(volume),
            PipelineCmd::SetPreload(preload) => self.apply_preload(preload),
            PipelineCmd::StageInitialized {
                session,
                state,
                status,
            } => self.on_stage_initialized(session, state, status),
            PipelineCmd::OperationDone { op, status } => self.on_operation_done(op, status),
            PipelineCmd::StageError { session, error } => {
                if self.is_current(session) {
                    self.set_error(error);
                }
            }
            PipelineCmd::RendererEnded { session } => {
                if self.is_current(session) {
                    self.on_renderer_ended();
                }
            }
            PipelineCmd::AudioDisabled { session } => {
                if self.is_current(session) {
                    self.on_audio_disabled();
                }
            }
            PipelineCmd::AudioUnderflow { session } => {
                if self.is_current(session) {
                    self.on_audio_underflow();
                }
            }
            PipelineCmd::NetworkActivity(active) => self.on_network_activity(active),
            PipelineCmd::Notify(event) => self.observers.notify(&event),
            PipelineCmd::Shutdown => return true,
        }
        false
    }

    /// Reports from stages of a finished session are dropped.
    fn is_current(&self, session: u64) -> bool {
        session == self.session && self.host.is_some()
    }

    fn set_state(&mut self, state: PipelineState) {
        if self.state == state {
            return;
        }
        log::debug!(target: "pipeline", "{} -> {}", self.state, state);
        self.state = state;
        {
            let mut snapshot = self.snapshot.lock();
            snapshot.initialized = state.is_initialized();
            snapshot.ended = state == PipelineState::Ended;
        }
        self.observers.notify(&PipelineEvent::StateChanged(state));
    }

    /// Complete a start or seek callback. A failure consumes the error
    /// callback so the embedder hears about it only once.
    fn report(&mut self, cb: StatusCb, status: PipelineStatus) {
        if status.is_err() {
            self.error_cb = None;
        }
        cb(status);
    }

    // ------------------------------------------------------------------
    // Initialization
    // ------------------------------------------------------------------

    fn handle_start(
        &mut self,
        collection: StageCollection,
        callbacks: SessionCallbacks,
        shutdown: ShutdownToken,
    ) {
        if !matches!(self.state, PipelineState::Created | PipelineState::Stopped) {
            log::error!(target: "pipeline", "start received in {}", self.state);
            (callbacks.start)(Err(PipelineError::AlreadyRunning));
            return;
        }

        self.session += 1;
        self.flags = TransitionFlags::default();
        self.collection = collection;
        self.shutdown = shutdown.clone();
        self.host = Some(StageHost::new(
            self.snapshot.clone(),
            self.tx.clone(),
            shutdown,
            self.session,
        ));
        self.ended_cb = Some(callbacks.ended);
        self.error_cb = Some(callbacks.error);
        self.start_cb = Some(callbacks.start);

        log::info!(target: "pipeline", "starting session {}", self.session);
        self.set_state(PipelineState::InitSource);
        if self.begin_init_step(PipelineState::InitSource) {
            self.advance_initialization();
        }
    }

    /// Returns true when the step was skipped and the chain should move on.
    fn begin_init_step(&mut self, state: PipelineState) -> bool {
        match self.init_stage(state) {
            InitStep::Pending => false,
            InitStep::Skipped => {
                log::debug!(target: "pipeline", "skipping {}", state);
                true
            }
            InitStep::Failed(err) => {
                self.set_error(err);
                false
            }
        }
    }

    fn init_callback(&self, state: PipelineState) -> StatusCb {
        let tx = self.tx.clone();
        let session = self.session;
        Box::new(move |status| {
            let cmd = PipelineCmd::StageInitialized {
                session,
                state,
                status,
            };
            if tx.send(cmd).is_err() {
                log::debug!(target: "pipeline", "{} finished after shutdown", state);
            }
        })
    }

    /// Register a stage before asking it to initialize, so it is part of
    /// any teardown that races with its completion.
    fn prepare_stage(&mut self, stage: Arc<dyn Stage>) -> Result<(), PipelineError> {
        if self.group.add_stage(stage) {
            Ok(())
        } else {
            Err(PipelineError::InitializationFailed)
        }
    }

    fn init_stage(&mut self, state: PipelineState) -> InitStep {
        let Some(host) = self.host.clone() else {
            return InitStep::Failed(PipelineError::InvalidState);
        };
        let done = self.init_callback(state);

        match state {
            PipelineState::InitSource => {
                let Some(demuxer) = self.collection.take_demuxer() else {
                    return InitStep::Failed(PipelineError::RequiredStageMissing);
                };
                if let Err(err) = self.prepare_stage(demuxer.clone()) {
                    return InitStep::Failed(err);
                }
                self.demuxer = Some(demuxer.clone());
                demuxer.initialize(host, done);
            }
            PipelineState::InitAudioDecoder => {
                let Some(stream) = self
                    .demuxer
                    .as_ref()
                    .and_then(|d| d.stream(MediaType::Audio))
                else {
                    return InitStep::Skipped;
                };
                let Some(decoder) = self.collection.select_audio_decoder() else {
                    return InitStep::Failed(PipelineError::RequiredStageMissing);
                };
                if let Err(err) = self.prepare_stage(decoder.clone()) {
                    return InitStep::Failed(err);
                }
                self.audio_decoder = Some(decoder.clone());
                decoder.initialize(stream, host, done);
            }
            PipelineState::InitAudioRenderer => {
                let Some(decoder) = self.audio_decoder.clone() else {
                    return InitStep::Skipped;
                };
                let Some(renderer) = self.collection.select_audio_renderer() else {
                    return InitStep::Failed(PipelineError::RequiredStageMissing);
                };
                if let Err(err) = self.prepare_stage(renderer.clone()) {
                    return InitStep::Failed(err);
                }
                self.audio_renderer = Some(renderer.clone());
                renderer.initialize(decoder, host, done);
            }
            PipelineState::InitVideoDecoder => {
                let Some(stream) = self
                    .demuxer
                    .as_ref()
                    .and_then(|d| d.stream(MediaType::Video))
                else {
                    return InitStep::Skipped;
                };
                let Some(decoder) = self.collection.select_video_decoder() else {
                    log::info!(target: "pipeline", "no usable video decoder, continuing without video");
                    return InitStep::Skipped;
                };
                if let Err(err) = self.prepare_stage(decoder.clone()) {
                    return InitStep::Failed(err);
                }
                self.video_decoder = Some(decoder.clone());
                decoder.initialize(stream, host, done);
            }
            PipelineState::InitVideoRenderer => {
                let Some(decoder) = self.video_decoder.clone() else {
                    return InitStep::Skipped;
                };
                let Some(renderer) = self.collection.select_video_renderer() else {
                    return InitStep::Failed(PipelineError::RequiredStageMissing);
                };
                if let Err(err) = self.prepare_stage(renderer.clone()) {
                    return InitStep::Failed(err);
                }
                self.video_renderer = Some(renderer.clone());
                renderer.initialize(decoder, host, done);
            }
            other => {
                log::error!(target: "pipeline", "no initialization step for {}", other);
                return InitStep::Failed(PipelineError::InvalidState);
            }
        }
        InitStep::Pending
    }

    fn on_stage_initialized(&mut self, session: u64, state: PipelineState, status: PipelineStatus) {
        if session != self.session || state != self.state || self.flags.tearing_down {
            log::debug!(target: "pipeline", "ignoring stale {} completion", state);
            return;
        }

        match status {
            Ok(()) => {}
            Err(err) if state == PipelineState::InitVideoDecoder && err.is_recoverable() => {
                log::info!(target: "pipeline", "video decoder rejected stream ({}), trying next", err);
                if let Some(decoder) = self.video_decoder.take() {
                    let stage: Arc<dyn Stage> = decoder;
                    self.group.remove_stage(&stage);
                }
                if !self.begin_init_step(PipelineState::InitVideoDecoder) {
                    return;
                }
            }
            Err(err) => {
                self.set_error(err);
                return;
            }
        }
        self.advance_initialization();
    }

    /// Move past the step that just finished, kicking off as many following
    /// steps as can be skipped synchronously.
    fn advance_initialization(&mut self) {
        loop {
            let next = match self.state {
                PipelineState::InitSource => {
                    self.on_source_initialized();
                    PipelineState::InitAudioDecoder
                }
                PipelineState::InitAudioDecoder => PipelineState::InitAudioRenderer,
                PipelineState::InitAudioRenderer => {
                    if self.audio_renderer.is_some() && !self.audio_disabled {
                        self.snapshot.lock().has_audio = true;
                    }
                    PipelineState::InitVideoDecoder
                }
                PipelineState::InitVideoDecoder => PipelineState::InitVideoRenderer,
                PipelineState::InitVideoRenderer => {
                    if self.video_renderer.is_some() {
                        self.snapshot.lock().has_video = true;
                    }
                    self.complete_initialization();
                    return;
                }
                other => {
                    log::error!(target: "pipeline", "initialization advanced from {}", other);
                    return;
                }
            };
            self.set_state(next);
            if !self.begin_init_step(next) {
                return;
            }
        }
    }

    fn on_source_initialized(&mut self) {
        let Some(demuxer) = self.demuxer.clone() else {
            return;
        };
        let duration = demuxer.duration();
        {
            let mut snapshot = self.snapshot.lock();
            snapshot.clock.set_duration(duration);
            snapshot.bitrate = demuxer.bitrate();
            snapshot.local_source = demuxer.is_local_source();
        }
        if !demuxer.is_seekable() {
            log::debug!(target: "pipeline", "source is not seekable");
        }
        self.observers.notify(&PipelineEvent::DurationSet(duration));
    }

    /// Every stage is up: push the current rate, volume and preload, then
    /// preroll with an implicit seek to the start time.
    fn complete_initialization(&mut self) {
        let (has_audio, has_video, rate, volume, preload) = {
            let snapshot = self.snapshot.lock();
            (
                snapshot.has_audio,
                snapshot.has_video,
                snapshot.playback_rate,
                snapshot.volume,
                snapshot.preload,
            )
        };
        if !has_audio && !has_video {
            self.set_error(PipelineError::CouldNotRender);
            return;
        }
        log::info!(
            target: "pipeline",
            "initialized (audio: {}, video: {}) with stages {:?}",
            has_audio,
            has_video,
            self.group.stage_names()
        );

        self.snapshot.lock().clock.set_playback_rate(rate);
        self.group.set_playback_rate(rate);
        if let Some(renderer) = &self.audio_renderer {
            renderer.set_volume(volume);
        }
        if self.audio_disabled {
            self.broadcast_audio_disabled();
        }
        if let Some(demuxer) = &self.demuxer {
            demuxer.set_preload(preload);
        }

        self.seek_time = self
            .demuxer
            .as_ref()
            .map_or(Duration::ZERO, |d| d.start_time());
        self.flags.seek_pending = true;
        self.snapshot.lock().seeking = true;
        self.enter(PipelineState::Seeking);
    }

    // ------------------------------------------------------------------
    // Group transitions
    // ------------------------------------------------------------------

    fn run_group_op(&mut self, op: GroupOp, teardown: bool) {
        self.next_op += 1;
        let id = self.next_op;
        self.in_flight = Some(InFlight { id, teardown });

        let tx = self.tx.clone();
        let done: StatusCb = Box::new(move |status| {
            if tx.send(PipelineCmd::OperationDone { op: id, status }).is_err() {
                log::debug!(target: "pipeline", "operation {} finished after shutdown", id);
            }
        });
        match op {
            GroupOp::Pause => self.group.pause(done),
            GroupOp::Flush => self.group.flush(done),
            GroupOp::Seek => self.group.seek(self.seek_time, done),
            GroupOp::Play => self.group.play(done),
            GroupOp::Stop => self.group.stop(done),
        }
    }

    /// Enter a state on the seek path and carry out its action.
    fn enter(&mut self, state: PipelineState) {
        self.set_state(state);
        match state {
            PipelineState::Seeking => {
                self.snapshot.lock().rebase_time(self.seek_time);
                self.run_group_op(GroupOp::Seek, false);
            }
            PipelineState::Started => self.complete_seek(),
            _ => match group_op(state) {
                Some(op) => self.run_group_op(op, false),
                None => log::error!(target: "pipeline", "no action for {}", state),
            },
        }
    }

    fn on_operation_done(&mut self, op: u64, status: PipelineStatus) {
        let Some(flight) = self.in_flight.take_if(|f| f.id == op) else {
            log::debug!(target: "pipeline", "dropping stale completion of operation {}", op);
            return;
        };

        if flight.teardown {
            if let Err(err) = status {
                log::debug!(target: "pipeline", "ignoring {} during teardown", err);
            }
            self.advance_teardown();
            return;
        }

        if let Err(err) = status {
            self.set_error(err);
        }
        if self.flags.tearing_down {
            return;
        }
        if self.flags.error_caused_teardown || self.flags.stop_pending {
            self.tear_down();
            return;
        }
        if !is_transient(self.state) {
            log::error!(target: "pipeline", "operation completed in {}", self.state);
            self.set_error(PipelineError::Abort);
            return;
        }

        let next = find_next_state(self.state, &self.flags);
        self.enter(next);
    }

    // ------------------------------------------------------------------
    // Seeking
    // ------------------------------------------------------------------

    fn handle_seek(&mut self, time: Duration, done: StatusCb) {
        let idle = matches!(self.state, PipelineState::Started | PipelineState::Ended);
        if !idle
            || self.flags.seek_pending
            || self.flags.stop_pending
            || self.flags.tearing_down
            || self.flags.error_caused_teardown
        {
            log::debug!(target: "pipeline", "seek ignored in {}", self.state);
            done(Err(PipelineError::InvalidState));
            return;
        }

        let start = self
            .demuxer
            .as_ref()
            .map_or(Duration::ZERO, |d| d.start_time());
        self.seek_time = time.max(start);
        self.flags.seek_pending = true;
        self.seek_cb = Some(done);
        {
            let mut snapshot = self.snapshot.lock();
            snapshot.seeking = true;
            snapshot.clock.pause();
        }
        self.enter(PipelineState::Pausing);
    }

    fn complete_seek(&mut self) {
        {
            let mut snapshot = self.snapshot.lock();
            snapshot.seeking = false;
            // Audio timestamps restart the clock; without audio nothing will.
            snapshot.clock.wait_for_update();
            if !snapshot.has_audio {
                snapshot.run_clock_to_duration();
            }
        }
        self.flags.seek_pending = false;
        let seek_time = std::mem::take(&mut self.seek_time);
        log::debug!(target: "pipeline", "seek to {:?} complete", seek_time);

        if let Some(cb) = self.start_cb.take() {
            self.report(cb, Ok(()));
        } else if let Some(cb) = self.seek_cb.take() {
            self.report(cb, Ok(()));
        }

        if let Some(rate) = self.pending_rate.take() {
            self.apply_playback_rate(rate);
        }
    }

    // ------------------------------------------------------------------
    // Errors and teardown
    // ------------------------------------------------------------------

    fn set_error(&mut self, error: PipelineError) {
        if self.state.is_stopped() || self.flags.tearing_down || self.flags.error_caused_teardown {
            log::debug!(target: "pipeline", "ignoring {} in {}", error, self.state);
            return;
        }
        log::warn!(target: "pipeline", "{} in {}", error, self.state);
        self.snapshot.lock().status = Err(error);
        self.observers.notify(&PipelineEvent::Error(error));
        self.flags.error_caused_teardown = true;
        // An in-flight group operation tears down from its completion.
        if self.in_flight.is_none() {
            self.tear_down();
        }
    }

    fn tear_down(&mut self) {
        log::debug!(target: "pipeline", "tearing down from {}", self.state);
        self.flags.tearing_down = true;
        self.flags.seek_pending = false;
        self.pending_rate = None;

        let status = {
            let mut snapshot = self.snapshot.lock();
            snapshot.tearing_down = true;
            snapshot.seeking = false;
            match snapshot.status {
                Err(err) if self.flags.error_caused_teardown => Err(err),
                _ => Err(PipelineError::Abort),
            }
        };
        if let Some(cb) = self.start_cb.take() {
            self.report(cb, status);
        }
        if let Some(cb) = self.seek_cb.take() {
            self.report(cb, status);
        }

        match teardown_plan(self.state) {
            TeardownPlan::Finish => {
                self.set_state(PipelineState::Stopped);
                self.finish_teardown();
            }
            TeardownPlan::Enter(state) => {
                self.set_state(state);
                match group_op(state) {
                    Some(op) => self.run_group_op(op, true),
                    None => self.finish_teardown(),
                }
            }
            TeardownPlan::Unexpected => {
                log::error!(target: "pipeline", "teardown requested in {}", self.state);
            }
        }
    }

    fn advance_teardown(&mut self) {
        let next = find_next_state(self.state, &self.flags);
        self.set_state(next);
        match group_op(next) {
            Some(op) => self.run_group_op(op, true),
            None => self.finish_teardown(),
        }
    }

    fn finish_teardown(&mut self) {
        self.release_stages();

        let status = self.snapshot.lock().status;
        if self.flags.error_caused_teardown && status.is_err() {
            if let Some(cb) = self.error_cb.take() {
                cb(status);
            }
        }

        if self.flags.stop_pending {
            self.flags.stop_pending = false;
            self.reset_session();
            log::info!(target: "pipeline", "session {} stopped", self.session);
            if let Some(cb) = self.stop_cb.take() {
                cb(Ok(()));
            }
        }

        self.flags.tearing_down = false;
        self.flags.error_caused_teardown = false;
        self.snapshot.lock().tearing_down = false;
    }

    fn handle_stop(&mut self, done: StatusCb) {
        self.shutdown.cancel();

        if self.state == PipelineState::Stopped && !self.flags.tearing_down {
            self.reset_session();
            done(Ok(()));
            return;
        }

        if self.flags.error_caused_teardown {
            log::debug!(target: "pipeline", "stop overrides error teardown");
            self.snapshot.lock().status = Ok(());
            self.flags.error_caused_teardown = false;
        }

        self.stop_cb = Some(done);
        self.flags.stop_pending = true;
        if self.in_flight.is_none() && !self.flags.tearing_down {
            self.tear_down();
        }
    }

    fn release_stages(&mut self) {
        self.group.clear();
        self.demuxer = None;
        self.audio_decoder = None;
        self.video_decoder = None;
        self.audio_renderer = None;
        self.video_renderer = None;
        self.collection = StageCollection::default();
        self.host = None;
    }

    fn reset_session(&mut self) {
        self.snapshot.lock().reset();
        self.ended_cb = None;
        self.error_cb = None;
        self.start_cb = None;
        self.seek_cb = None;
        self.pending_rate = None;
        self.seek_time = Duration::ZERO;
        self.audio_disabled = false;
        self.flags.seek_pending = false;
    }

    fn shut_down(&mut self) {
        self.shutdown.cancel();
        let pending = [self.start_cb.take(), self.seek_cb.take(), self.stop_cb.take()];
        for cb in pending.into_iter().flatten() {
            cb(Err(PipelineError::ExecutorGone));
        }
        self.release_stages();
    }

    // ------------------------------------------------------------------
    // Playback controls and stage reports
    // ------------------------------------------------------------------

    fn apply_playback_rate(&mut self, rate: f32) {
        if self.flags.seek_pending {
            log::debug!(target: "pipeline", "deferring rate {} until seek completes", rate);
            self.pending_rate = Some(rate);
            return;
        }
        // Applied by complete_initialization otherwise.
        if !self.state.is_initialized() || self.flags.tearing_down {
            return;
        }
        self.snapshot.lock().clock.set_playback_rate(rate);
        self.group.set_playback_rate(rate);
    }

    fn apply_volume(&mut self, volume: f32) {
        if let Some(renderer) = &self.audio_renderer {
            renderer.set_volume(volume);
        }
    }

    fn apply_preload(&mut self, preload: Preload) {
        if let Some(demuxer) = &self.demuxer {
            demuxer.set_preload(preload);
        }
    }

    fn on_renderer_ended(&mut self) {
        if self.state != PipelineState::Started {
            log::debug!(target: "pipeline", "end of stream ignored in {}", self.state);
            return;
        }
        let audio_ended = self.audio_disabled
            || self.audio_renderer.as_ref().map_or(true, |r| r.has_ended());
        let video_ended = self.video_renderer.as_ref().map_or(true, |r| r.has_ended());
        if !audio_ended || !video_ended {
            return;
        }

        self.snapshot.lock().clock.end_of_stream();
        self.set_state(PipelineState::Ended);
        self.observers.notify(&PipelineEvent::Ended);
        if let Some(cb) = self.ended_cb.clone() {
            cb(Ok(()));
        }
    }

    fn on_audio_disabled(&mut self) {
        if self.audio_disabled || self.state.is_stopped() || self.flags.tearing_down {
            return;
        }
        log::info!(target: "pipeline", "audio renderer disabled in {}", self.state);
        self.audio_disabled = true;
        self.snapshot.lock().has_audio = false;

        // Stages added later in the init chain would miss the broadcast;
        // complete_initialization sends it once the group is whole.
        if !self.state.is_initialized() {
            return;
        }
        {
            let mut snapshot = self.snapshot.lock();
            if !snapshot.seeking {
                snapshot.run_clock_to_duration();
            }
        }
        self.broadcast_audio_disabled();
    }

    fn broadcast_audio_disabled(&self) {
        self.group.on_audio_renderer_disabled();
        self.observers.notify(&PipelineEvent::AudioRendererDisabled);
    }

    fn on_audio_underflow(&mut self) {
        if self.state != PipelineState::Started {
            return;
        }
        if let Some(renderer) = &self.audio_renderer {
            renderer.resume_after_underflow(true);
        }
    }

    fn on_network_activity(&mut self, active: bool) {
        self.snapshot.lock().network_activity = active;
        self.observers.notify(&PipelineEvent::NetworkActivity(active));
    }

    fn emit_time_update(&mut self) {
        if self.state != PipelineState::Started {
            return;
        }
        let event = {
            let mut snapshot = self.snapshot.lock();
            PipelineEvent::TimeUpdate {
                current: snapshot.current_time(),
                buffered: snapshot.buffered_time(),
                statistics: snapshot.statistics,
            }
        };
        self.observers.notify(&event);
    }
}
