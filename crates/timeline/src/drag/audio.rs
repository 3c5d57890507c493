//! Volume and fade handles on audio clips.

use crate::drag::{bound, changed, DragPhase};
use crate::geometry::clamp_zoom;
use crate::model::{Clip, TimeSec, Track, MAX_VOLUME_DB, MIN_VOLUME_DB};
use crate::ops::{AudioSettingsChange, TimelineOps};

/// Vertical drag sensitivity of the volume handle.
pub const DB_PER_PIXEL: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioHandle { Volume, FadeIn, FadeOut }

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioValues {
    pub volume_db: f64,
    pub fade_in_sec: TimeSec,
    pub fade_out_sec: TimeSec,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioDragState {
    pub handle: AudioHandle,
    pub clip_id: String,
    pub track_id: String,
    pub start_x: f64,
    pub start_y: f64,
    pub clip_duration: TimeSec,
    pub start: AudioValues,
    pub current: AudioValues,
}

#[derive(Debug, Clone, Default)]
pub struct AudioDrag {
    phase: DragPhase<AudioDragState>,
}

impl AudioDrag {
    pub fn new() -> Self { Self::default() }

    pub fn is_dragging(&self) -> bool { self.phase.is_dragging() }

    pub fn state(&self) -> Option<&AudioDragState> { self.phase.state() }

    pub fn pointer_down(&mut self, handle: AudioHandle, track: &Track, clip: &Clip, x: f64, y: f64) -> bool {
        if track.locked || self.phase.is_dragging() { return false; }
        let start = AudioValues {
            volume_db: clip.audio.volume_db,
            fade_in_sec: clip.audio.fade_in_sec,
            fade_out_sec: clip.audio.fade_out_sec,
        };
        self.phase = DragPhase::Dragging(AudioDragState {
            handle,
            clip_id: clip.id.clone(),
            track_id: track.id.clone(),
            start_x: x,
            start_y: y,
            clip_duration: clip.duration().max(0.0),
            start,
            current: start,
        });
        true
    }

    /// Dragging up raises the volume; the fade-out handle sits at the clip's
    /// right edge so dragging it left lengthens the fade.
    pub fn pointer_move(&mut self, x: f64, y: f64, zoom: f64) -> Option<AudioValues> {
        let state = self.phase.state_mut()?;
        let s = state.start;
        let dur = state.clip_duration;
        let dt = (x - state.start_x) / clamp_zoom(zoom);
        match state.handle {
            AudioHandle::Volume => {
                let db = s.volume_db - (y - state.start_y) * DB_PER_PIXEL;
                state.current.volume_db = db.clamp(MIN_VOLUME_DB, MAX_VOLUME_DB);
            }
            AudioHandle::FadeIn => {
                state.current.fade_in_sec = bound(s.fade_in_sec + dt, 0.0, dur - s.fade_out_sec);
            }
            AudioHandle::FadeOut => {
                state.current.fade_out_sec = bound(s.fade_out_sec - dt, 0.0, dur - s.fade_in_sec);
            }
        }
        Some(state.current)
    }

    /// Reports only the fields that moved by more than the commit epsilon.
    pub fn pointer_up(&mut self, ops: &mut dyn TimelineOps) -> Option<AudioSettingsChange> {
        let state = self.phase.take()?;
        let (s, c) = (state.start, state.current);
        let change = AudioSettingsChange {
            clip_id: state.clip_id,
            track_id: state.track_id,
            volume_db: changed(s.volume_db, c.volume_db).then_some(c.volume_db),
            fade_in_sec: changed(s.fade_in_sec, c.fade_in_sec).then_some(c.fade_in_sec),
            fade_out_sec: changed(s.fade_out_sec, c.fade_out_sec).then_some(c.fade_out_sec),
        };
        if change.is_empty() { return None; }
        tracing::debug!(clip = %change.clip_id, volume_db = ?change.volume_db, "commit audio settings");
        ops.on_audio_settings_change(change.clone());
        Some(change)
    }

    pub fn cancel(&mut self) {
        self.phase = DragPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TrackKind;
    use crate::ops::{OpQueue, TimelineOp};

    fn fixture() -> (Track, Clip) {
        let track = Track::new("A1", TrackKind::Audio).with_id("a1");
        let mut clip = Clip::new("music", 0.0, 10.0).with_id("c1");
        clip.audio.fade_out_sec = 3.0;
        (track, clip)
    }

    #[test]
    fn volume_follows_vertical_drag_and_clamps() {
        let (track, clip) = fixture();
        let mut drag = AudioDrag::new();
        assert!(drag.pointer_down(AudioHandle::Volume, &track, &clip, 0.0, 100.0));
        let v = drag.pointer_move(0.0, 80.0, 100.0).unwrap();
        assert!((v.volume_db - 2.0).abs() < 1e-9);
        let v = drag.pointer_move(0.0, -1000.0, 100.0).unwrap();
        assert_eq!(v.volume_db, MAX_VOLUME_DB);
        let v = drag.pointer_move(0.0, 5000.0, 100.0).unwrap();
        assert_eq!(v.volume_db, MIN_VOLUME_DB);

        let mut ops = OpQueue::default();
        let change = drag.pointer_up(&mut ops).unwrap();
        assert_eq!(change.volume_db, Some(MIN_VOLUME_DB));
        assert!(change.fade_in_sec.is_none() && change.fade_out_sec.is_none());
        assert_eq!(ops.ops.len(), 1);
    }

    #[test]
    fn sub_epsilon_volume_change_never_commits() {
        let (track, clip) = fixture();
        let mut drag = AudioDrag::new();
        drag.pointer_down(AudioHandle::Volume, &track, &clip, 0.0, 100.0);
        // 0.005 px -> 0.0005 dB
        drag.pointer_move(0.0, 99.995, 100.0);
        let mut ops = OpQueue::default();
        assert!(drag.pointer_up(&mut ops).is_none());
        assert!(ops.ops.is_empty());
        assert!(!drag.is_dragging());
    }

    #[test]
    fn fades_cannot_overlap() {
        let (track, clip) = fixture();
        let mut drag = AudioDrag::new();
        drag.pointer_down(AudioHandle::FadeIn, &track, &clip, 0.0, 0.0);
        let v = drag.pointer_move(5000.0, 0.0, 100.0).unwrap();
        assert!((v.fade_in_sec - 7.0).abs() < 1e-9);
        let v = drag.pointer_move(-300.0, 0.0, 100.0).unwrap();
        assert_eq!(v.fade_in_sec, 0.0);
        drag.cancel();

        drag.pointer_down(AudioHandle::FadeOut, &track, &clip, 1000.0, 0.0);
        let v = drag.pointer_move(900.0, 0.0, 100.0).unwrap();
        assert!((v.fade_out_sec - 4.0).abs() < 1e-9);
        let mut ops = OpQueue::default();
        drag.pointer_up(&mut ops);
        match &ops.ops[..] {
            [TimelineOp::AudioSettings(c)] => {
                assert_eq!(c.fade_out_sec, Some(4.0));
                assert!(c.volume_db.is_none());
            }
            other => panic!("unexpected ops {other:?}"),
        }
    }

    #[test]
    fn locked_track_refuses() {
        let (mut track, clip) = fixture();
        track.locked = true;
        let mut drag = AudioDrag::new();
        assert!(!drag.pointer_down(AudioHandle::Volume, &track, &clip, 0.0, 0.0));
        assert!(drag.pointer_move(0.0, 10.0, 100.0).is_none());
    }
}
