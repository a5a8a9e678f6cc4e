//! Pure transition tables for the coordinator state machine.
//!
//! Every match here is exhaustive over [`PipelineState`], so adding a state
//! forces a decision at each table instead of falling into a default arm.

use cadence_types::PipelineState;

/// Executor-owned flags that steer the automatic transitions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TransitionFlags {
    pub seek_pending: bool,
    pub stop_pending: bool,
    pub tearing_down: bool,
    pub error_caused_teardown: bool,
}

/// States that advance on their own once every stage completes the
/// matching group operation.
pub(crate) fn is_transient(state: PipelineState) -> bool {
    use PipelineState::*;
    match state {
        Pausing | Flushing | Seeking | Starting | Stopping => true,
        Created | InitSource | InitAudioDecoder | InitAudioRenderer | InitVideoDecoder
        | InitVideoRenderer | Started | Ended | Stopped | Error => false,
    }
}

/// Successor of a transient state. Non-transient states map to themselves.
pub(crate) fn find_next_state(state: PipelineState, flags: &TransitionFlags) -> PipelineState {
    use PipelineState::*;
    match state {
        Pausing => Flushing,
        Flushing if flags.seek_pending && !flags.tearing_down => Seeking,
        Flushing => Stopping,
        Seeking => Starting,
        Starting => Started,
        Stopping if flags.error_caused_teardown => Error,
        Stopping => Stopped,
        Created | InitSource | InitAudioDecoder | InitAudioRenderer | InitVideoDecoder
        | InitVideoRenderer | Started | Ended | Stopped | Error => state,
    }
}

/// Group operation issued on entry to a transient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GroupOp {
    Pause,
    Flush,
    Seek,
    Play,
    Stop,
}

pub(crate) fn group_op(state: PipelineState) -> Option<GroupOp> {
    use PipelineState::*;
    match state {
        Pausing => Some(GroupOp::Pause),
        Flushing => Some(GroupOp::Flush),
        Seeking => Some(GroupOp::Seek),
        Starting => Some(GroupOp::Play),
        Stopping => Some(GroupOp::Stop),
        Created | InitSource | InitAudioDecoder | InitAudioRenderer | InitVideoDecoder
        | InitVideoRenderer | Started | Ended | Stopped | Error => None,
    }
}

/// First move of a teardown started from a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TeardownPlan {
    /// Nothing is running; release stages right away.
    Finish,
    /// Enter this state and issue its group operation.
    Enter(PipelineState),
    /// Teardown is already under way.
    Unexpected,
}

pub(crate) fn teardown_plan(state: PipelineState) -> TeardownPlan {
    use PipelineState::*;
    match state {
        Created | Error => TeardownPlan::Finish,
        InitSource | InitAudioDecoder | InitAudioRenderer | InitVideoDecoder
        | InitVideoRenderer => TeardownPlan::Enter(Stopping),
        Pausing | Flushing | Seeking | Starting => TeardownPlan::Enter(Stopping),
        Started | Ended => TeardownPlan::Enter(Pausing),
        Stopping | Stopped => TeardownPlan::Unexpected,
    }
}
