//! Pointer-driven state machines. Each one is `Idle` until a pointer-down it
//! accepts, owns its transient state while dragging, and goes back to `Idle`
//! on pointer-up or [`cancel`](clip::ClipDrag::cancel).

pub mod audio;
pub mod clip;
pub mod marquee;
pub mod playhead;

use crate::model::{Fps, TimeSec};

/// Changes smaller than this are treated as no change on commit.
pub const COMMIT_EPSILON: f64 = 0.001;

/// Width of the trim handles at both ends of a clip box.
pub const EDGE_HANDLE_PX: f64 = 6.0;

pub const MIN_CLIP_DURATION_SEC: TimeSec = 0.01;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragPhase<S> {
    #[default]
    Idle,
    Dragging(S),
}

impl<S> DragPhase<S> {
    pub fn is_dragging(&self) -> bool { matches!(self, DragPhase::Dragging(_)) }

    pub fn state(&self) -> Option<&S> {
        match self {
            DragPhase::Dragging(s) => Some(s),
            DragPhase::Idle => None,
        }
    }

    pub fn state_mut(&mut self) -> Option<&mut S> {
        match self {
            DragPhase::Dragging(s) => Some(s),
            DragPhase::Idle => None,
        }
    }

    /// Ends the drag, handing back its state.
    pub fn take(&mut self) -> Option<S> {
        match std::mem::take(self) {
            DragPhase::Dragging(s) => Some(s),
            DragPhase::Idle => None,
        }
    }
}

/// Transport the playhead drag drives.
pub trait PlaybackControl {
    fn seek(&mut self, time: TimeSec);
    fn pause(&mut self);
    fn play(&mut self);
    fn is_playing(&self) -> bool;
}

/// One frame at the sequence rate, or 10 ms when the rate is unusable.
pub fn min_clip_duration(fps: Fps) -> TimeSec {
    let frame = fps.frame_duration();
    if frame > 0.0 { frame } else { MIN_CLIP_DURATION_SEC }
}

pub(crate) fn changed(before: f64, after: f64) -> bool {
    (after - before).abs() > COMMIT_EPSILON
}

/// `value.max(lo).min(hi)`, but never panics on inverted bounds.
pub(crate) fn bound(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi.max(lo))
}
