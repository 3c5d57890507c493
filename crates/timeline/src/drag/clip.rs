//! Moving and trimming clips with the pointer.

use crate::drag::{bound, changed, min_clip_duration, DragPhase, Modifiers, EDGE_HANDLE_PX};
use crate::geometry::{TimelineGeometry, TrackRows};
use crate::model::{Sequence, TimeSec, TrackKind};
use crate::ops::{ClipMoveRequest, ClipTrimRequest, TimelineOps};
use crate::snap::{SnapConfig, SnapPoint};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClipDragMode { Move, TrimStart, TrimEnd }

/// Picks the drag mode from where the pointer landed on a clip box.
/// On boxes narrower than two handles the nearer edge wins.
pub fn hit_test_clip(pointer_x: f64, clip_x: f64, clip_width: f64, handle_px: f64) -> ClipDragMode {
    let from_left = pointer_x - clip_x;
    let from_right = clip_x + clip_width - pointer_x;
    if from_left <= handle_px && from_left <= from_right {
        ClipDragMode::TrimStart
    } else if from_right <= handle_px {
        ClipDragMode::TrimEnd
    } else {
        ClipDragMode::Move
    }
}

/// Video and overlay rows are interchangeable; other kinds only match themselves.
fn rows_compatible(a: TrackKind, b: TrackKind) -> bool {
    let visual = |k: TrackKind| matches!(k, TrackKind::Video | TrackKind::Overlay);
    a == b || (visual(a) && visual(b))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipPreview {
    pub timeline_in: TimeSec,
    pub source_in: TimeSec,
    pub source_out: TimeSec,
    pub speed: f64,
}

impl ClipPreview {
    pub fn duration(&self) -> TimeSec { (self.source_out - self.source_in) / self.speed }
    pub fn timeline_end(&self) -> TimeSec { self.timeline_in + self.duration() }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipDragState {
    pub mode: ClipDragMode,
    pub clip_id: String,
    pub origin_track_id: String,
    pub track_id: String,
    pub track_index: usize,
    pub start_mouse_x: f64,
    pub origin: ClipPreview,
    pub preview: ClipPreview,
    pub asset_duration: Option<TimeSec>,
    pub min_duration: TimeSec,
    pub snapped: Option<SnapPoint>,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, Copy)]
pub struct ClipDragContext<'a> {
    pub sequence: &'a Sequence,
    pub geometry: &'a TimelineGeometry,
    pub rows: &'a TrackRows,
    pub snap_points: &'a [SnapPoint],
}

#[derive(Debug, Clone)]
pub struct ClipDrag {
    phase: DragPhase<ClipDragState>,
    pub snap: SnapConfig,
    pub edge_handle_px: f64,
    pub quantize: bool,
}

impl Default for ClipDrag {
    fn default() -> Self {
        Self { phase: DragPhase::Idle, snap: SnapConfig::default(), edge_handle_px: EDGE_HANDLE_PX, quantize: false }
    }
}

impl ClipDrag {
    pub fn new(snap: SnapConfig) -> Self { Self { snap, ..Self::default() } }

    pub fn is_dragging(&self) -> bool { self.phase.is_dragging() }

    pub fn state(&self) -> Option<&ClipDragState> { self.phase.state() }

    /// Starts a drag on `clip_id`. Refused for locked tracks and unknown clips.
    pub fn pointer_down(&mut self, x: f64, clip_id: &str, ctx: &ClipDragContext<'_>, modifiers: Modifiers) -> bool {
        if self.phase.is_dragging() { return false; }
        let Some((track, clip)) = ctx.sequence.find_clip(clip_id) else { return false };
        if track.locked { return false; }
        let Some(track_index) = ctx.sequence.track_index(&track.id) else { return false };

        let (clip_x, clip_w) = ctx.geometry.clip_span(clip);
        let mode = hit_test_clip(x, clip_x, clip_w, self.edge_handle_px);
        let origin = ClipPreview {
            timeline_in: clip.timeline_in(),
            source_in: clip.range.source_in_sec,
            source_out: clip.range.source_out_sec,
            speed: clip.effective_speed(),
        };
        tracing::debug!(clip = clip_id, ?mode, "clip drag start");
        self.phase = DragPhase::Dragging(ClipDragState {
            mode,
            clip_id: clip.id.clone(),
            origin_track_id: track.id.clone(),
            track_id: track.id.clone(),
            track_index,
            start_mouse_x: x,
            origin,
            preview: origin,
            asset_duration: clip.asset_duration_sec,
            min_duration: min_clip_duration(ctx.sequence.format.fps),
            snapped: None,
            modifiers,
        });
        true
    }

    fn snap_time(&self, candidate: TimeSec, ctx: &ClipDragContext<'_>) -> (TimeSec, Option<SnapPoint>) {
        let (t, hit) = self.snap.snap(candidate, ctx.snap_points, ctx.geometry.zoom());
        if hit.is_none() && self.quantize { (ctx.sequence.format.fps.quantize(t), None) } else { (t, hit) }
    }

    /// Recomputes the preview for the pointer position.
    pub fn pointer_move(&mut self, x: f64, y: f64, ctx: &ClipDragContext<'_>) -> Option<ClipPreview> {
        let snap_enabled = self.snap.enabled;
        let state = self.phase.state()?;
        let dt = ctx.geometry.delta_to_time(x - state.start_mouse_x);
        let o = state.origin;
        let mode = state.mode;
        let min_dur = state.min_duration;
        let asset_duration = state.asset_duration;

        let (preview, snapped) = match mode {
            ClipDragMode::Move => {
                let candidate = o.timeline_in + dt;
                let (start, hit) = if snap_enabled {
                    self.snap.snap_span(candidate, o.duration(), ctx.snap_points, ctx.geometry.zoom())
                } else {
                    (candidate, None)
                };
                let start = if hit.is_none() && self.quantize { ctx.sequence.format.fps.quantize(start) } else { start };
                (ClipPreview { timeline_in: start.max(0.0), ..o }, hit)
            }
            ClipDragMode::TrimStart => {
                let (t, hit) = self.snap_time(o.timeline_in + dt, ctx);
                // cannot reveal source before 0 or shrink below one frame
                let lo = (o.timeline_in - o.source_in / o.speed).max(0.0);
                let hi = o.timeline_end() - min_dur;
                let new_in = bound(t, lo, hi);
                let source_in = (o.source_in + (new_in - o.timeline_in) * o.speed).max(0.0);
                (ClipPreview { timeline_in: new_in, source_in, ..o }, hit)
            }
            ClipDragMode::TrimEnd => {
                let (t, hit) = self.snap_time(o.timeline_end() + dt, ctx);
                let lo = o.timeline_in + min_dur;
                let hi = match asset_duration {
                    Some(total) if total.is_finite() => o.timeline_end() + (total - o.source_out) / o.speed,
                    _ => f64::INFINITY,
                };
                let new_end = bound(t, lo, hi);
                let source_out = o.source_out + (new_end - o.timeline_end()) * o.speed;
                (ClipPreview { source_out, ..o }, hit)
            }
        };

        let target = if mode == ClipDragMode::Move { self.target_row(y, ctx) } else { None };
        let state = self.phase.state_mut()?;
        if let Some((index, id)) = target {
            state.track_index = index;
            state.track_id = id;
        }
        state.preview = preview;
        state.snapped = snapped;
        Some(preview)
    }

    /// Row under `y` if the dragged clip may move there.
    fn target_row(&self, y: f64, ctx: &ClipDragContext<'_>) -> Option<(usize, String)> {
        let state = self.phase.state()?;
        let index = ctx.rows.row_at(y)?;
        if index == state.track_index { return None; }
        let origin = ctx.sequence.track(&state.origin_track_id)?;
        let target = ctx.sequence.tracks.get(index)?;
        if target.locked || !rows_compatible(origin.kind, target.kind) { return None; }
        Some((index, target.id.clone()))
    }

    /// Ends the drag and reports the change, if any, to `ops`.
    pub fn pointer_up(&mut self, ops: &mut dyn TimelineOps) -> bool {
        let Some(state) = self.phase.take() else { return false };
        let (o, p) = (state.origin, state.preview);
        match state.mode {
            ClipDragMode::Move => {
                let track_changed = state.track_id != state.origin_track_id;
                if !track_changed && !changed(o.timeline_in, p.timeline_in) {
                    return false;
                }
                tracing::debug!(clip = %state.clip_id, to = p.timeline_in, track_changed, "commit clip move");
                ops.on_clip_move(ClipMoveRequest {
                    clip_id: state.clip_id,
                    from_track_id: state.origin_track_id,
                    to_track_id: state.track_id,
                    timeline_in_sec: p.timeline_in,
                });
                true
            }
            ClipDragMode::TrimStart | ClipDragMode::TrimEnd => {
                let req = ClipTrimRequest {
                    new_source_in: changed(o.source_in, p.source_in).then_some(p.source_in),
                    new_source_out: changed(o.source_out, p.source_out).then_some(p.source_out),
                    new_timeline_in: changed(o.timeline_in, p.timeline_in).then_some(p.timeline_in),
                    clip_id: state.clip_id,
                    track_id: state.track_id,
                };
                if req.new_source_in.is_none() && req.new_source_out.is_none() && req.new_timeline_in.is_none() {
                    return false;
                }
                tracing::debug!(clip = %req.clip_id, mode = ?state.mode, "commit clip trim");
                ops.on_clip_trim(req);
                true
            }
        }
    }

    /// Blur/unmount: drop the drag without committing.
    pub fn cancel(&mut self) {
        self.phase = DragPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Clip, SequenceFormat, Track};
    use crate::ops::{OpQueue, TimelineOp};

    fn sequence() -> Sequence {
        let mut seq = Sequence::new("s", SequenceFormat::default());
        let mut v1 = Track::new("V1", TrackKind::Video).with_id("v1");
        let mut clip = Clip::new("a", 1.0, 5.0).with_id("c1").place_at(2.0);
        clip.asset_duration_sec = Some(6.0);
        v1.add_clip(clip);
        seq.add_track(v1);
        seq.add_track(Track::new("V2", TrackKind::Overlay).with_id("v2"));
        seq.add_track(Track::new("A1", TrackKind::Audio).with_id("a1"));
        seq
    }

    // zoom 100, header 100: clip c1 spans x 300..700
    fn geometry() -> TimelineGeometry { TimelineGeometry::new(100.0, 0.0, 100.0, 1000.0) }

    fn no_snap() -> ClipDrag { ClipDrag::new(SnapConfig { enabled: false, threshold_px: 10.0 }) }

    #[test]
    fn edge_handles_pick_trim_modes() {
        assert_eq!(hit_test_clip(302.0, 300.0, 400.0, 6.0), ClipDragMode::TrimStart);
        assert_eq!(hit_test_clip(697.0, 300.0, 400.0, 6.0), ClipDragMode::TrimEnd);
        assert_eq!(hit_test_clip(500.0, 300.0, 400.0, 6.0), ClipDragMode::Move);
        assert_eq!(hit_test_clip(304.0, 300.0, 6.0, 6.0), ClipDragMode::TrimEnd);
    }

    #[test]
    fn move_commits_new_position() {
        let seq = sequence();
        let geo = geometry();
        let rows = TrackRows::new(0.0, 50.0, seq.tracks.len());
        let ctx = ClipDragContext { sequence: &seq, geometry: &geo, rows: &rows, snap_points: &[] };
        let mut drag = no_snap();
        assert!(drag.pointer_down(500.0, "c1", &ctx, Modifiers::default()));
        drag.pointer_move(650.0, 10.0, &ctx);
        let mut ops = OpQueue::default();
        assert!(drag.pointer_up(&mut ops));
        match &ops.ops[..] {
            [TimelineOp::ClipMove(req)] => {
                assert!((req.timeline_in_sec - 3.5).abs() < 1e-9);
                assert_eq!(req.to_track_id, "v1");
            }
            other => panic!("unexpected ops {other:?}"),
        }
    }

    #[test]
    fn move_clamps_at_zero_and_changes_compatible_rows_only() {
        let seq = sequence();
        let geo = geometry();
        let rows = TrackRows::new(0.0, 50.0, seq.tracks.len());
        let ctx = ClipDragContext { sequence: &seq, geometry: &geo, rows: &rows, snap_points: &[] };
        let mut drag = no_snap();
        drag.pointer_down(500.0, "c1", &ctx, Modifiers::default());
        let p = drag.pointer_move(-500.0, 120.0, &ctx).unwrap();
        assert_eq!(p.timeline_in, 0.0);
        // audio row refused, stays on v1
        assert_eq!(drag.state().unwrap().track_id, "v1");
        drag.pointer_move(-500.0, 60.0, &ctx);
        assert_eq!(drag.state().unwrap().track_id, "v2");

        let mut ops = OpQueue::default();
        drag.pointer_up(&mut ops);
        match &ops.ops[..] {
            [TimelineOp::ClipMove(req)] => {
                assert_eq!(req.from_track_id, "v1");
                assert_eq!(req.to_track_id, "v2");
            }
            other => panic!("unexpected ops {other:?}"),
        }
    }

    #[test]
    fn tiny_move_does_not_commit() {
        let seq = sequence();
        let geo = geometry();
        let rows = TrackRows::new(0.0, 50.0, seq.tracks.len());
        let ctx = ClipDragContext { sequence: &seq, geometry: &geo, rows: &rows, snap_points: &[] };
        let mut drag = no_snap();
        drag.pointer_down(500.0, "c1", &ctx, Modifiers::default());
        drag.pointer_move(500.05, 10.0, &ctx);
        let mut ops = OpQueue::default();
        assert!(!drag.pointer_up(&mut ops));
        assert!(ops.ops.is_empty());
    }

    #[test]
    fn trim_start_cannot_reveal_before_source_zero() {
        let seq = sequence();
        let geo = geometry();
        let rows = TrackRows::new(0.0, 50.0, seq.tracks.len());
        let ctx = ClipDragContext { sequence: &seq, geometry: &geo, rows: &rows, snap_points: &[] };
        let mut drag = no_snap();
        drag.pointer_down(301.0, "c1", &ctx, Modifiers::default());
        assert_eq!(drag.state().unwrap().mode, ClipDragMode::TrimStart);
        let p = drag.pointer_move(0.0, 10.0, &ctx).unwrap();
        assert!((p.timeline_in - 1.0).abs() < 1e-9);
        assert!(p.source_in.abs() < 1e-9);

        let mut ops = OpQueue::default();
        drag.pointer_up(&mut ops);
        match &ops.ops[..] {
            [TimelineOp::ClipTrim(req)] => {
                assert!(req.new_source_out.is_none());
                assert!(req.new_source_in.is_some());
                assert!(req.new_timeline_in.is_some());
            }
            other => panic!("unexpected ops {other:?}"),
        }
    }

    #[test]
    fn trim_end_respects_asset_duration_and_min_length() {
        let seq = sequence();
        let geo = geometry();
        let rows = TrackRows::new(0.0, 50.0, seq.tracks.len());
        let ctx = ClipDragContext { sequence: &seq, geometry: &geo, rows: &rows, snap_points: &[] };
        let mut drag = no_snap();
        drag.pointer_down(699.0, "c1", &ctx, Modifiers::default());
        let p = drag.pointer_move(2000.0, 10.0, &ctx).unwrap();
        assert!((p.source_out - 6.0).abs() < 1e-9);
        let p = drag.pointer_move(-2000.0, 10.0, &ctx).unwrap();
        assert!((p.duration() - 1.0 / 30.0).abs() < 1e-9);
        drag.cancel();
        assert!(!drag.is_dragging());
    }

    #[test]
    fn locked_track_refuses_drag() {
        let mut seq = sequence();
        seq.tracks[0].locked = true;
        let geo = geometry();
        let rows = TrackRows::new(0.0, 50.0, seq.tracks.len());
        let ctx = ClipDragContext { sequence: &seq, geometry: &geo, rows: &rows, snap_points: &[] };
        let mut drag = ClipDrag::default();
        assert!(!drag.pointer_down(500.0, "c1", &ctx, Modifiers::default()));
        assert!(!drag.pointer_down(500.0, "missing", &ctx, Modifiers::default()));
    }

    #[test]
    fn move_snaps_end_edge_to_marker() {
        let seq = sequence();
        let geo = geometry();
        let rows = TrackRows::new(0.0, 50.0, seq.tracks.len());
        let pts = [SnapPoint::new(9.0, crate::snap::SnapKind::Marker)];
        let ctx = ClipDragContext { sequence: &seq, geometry: &geo, rows: &rows, snap_points: &pts };
        let mut drag = ClipDrag::default();
        drag.pointer_down(500.0, "c1", &ctx, Modifiers::default());
        // end would land on 8.95
        let p = drag.pointer_move(795.0, 10.0, &ctx).unwrap();
        assert!((p.timeline_end() - 9.0).abs() < 1e-9);
        assert!(drag.state().unwrap().snapped.is_some());
    }
}
