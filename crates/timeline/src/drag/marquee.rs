//! Rubber-band selection on empty canvas.

use crate::drag::{DragPhase, Modifiers};
use crate::geometry::{Rect, TimelineGeometry, TrackRows};
use crate::model::Sequence;
use crate::selection::Selection;

/// Pointer travel below this is still a click.
pub const CLICK_SLOP_PX: f64 = 3.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ClipBox {
    pub clip_id: String,
    pub track_id: String,
    pub rect: Rect,
}

/// Screen-space bounding boxes of every clip on a visible track, one row per track.
pub fn clip_boxes(seq: &Sequence, geometry: &TimelineGeometry, rows: &TrackRows) -> Vec<ClipBox> {
    let mut out = Vec::new();
    for (index, track) in seq.tracks.iter().enumerate().filter(|(_, t)| t.visible) {
        let y0 = rows.row_top(index);
        for clip in &track.clips {
            let (x, w) = geometry.clip_span(clip);
            out.push(ClipBox {
                clip_id: clip.id.clone(),
                track_id: track.id.clone(),
                rect: Rect::new(x, y0, x + w, y0 + rows.track_height),
            });
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarqueeState {
    pub origin: (f64, f64),
    pub current: (f64, f64),
    pub additive: bool,
    /// Selection at drag start, kept for shift-union.
    pub base: Vec<String>,
    pub moved: bool,
}

impl MarqueeState {
    pub fn rect(&self) -> Rect { Rect::from_points(self.origin, self.current) }
}

#[derive(Debug, Clone, Default)]
pub struct MarqueeDrag {
    phase: DragPhase<MarqueeState>,
}

impl MarqueeDrag {
    pub fn new() -> Self { Self::default() }

    pub fn is_dragging(&self) -> bool { self.phase.is_dragging() }

    pub fn rect(&self) -> Option<Rect> { self.phase.state().map(MarqueeState::rect) }

    /// Only starts on empty canvas; clicks on clips and controls belong to other machines.
    pub fn pointer_down(&mut self, x: f64, y: f64, on_empty_canvas: bool, modifiers: Modifiers, selection: &Selection) -> bool {
        if !on_empty_canvas || self.phase.is_dragging() { return false; }
        self.phase = DragPhase::Dragging(MarqueeState {
            origin: (x, y),
            current: (x, y),
            additive: modifiers.shift,
            base: selection.clips().to_vec(),
            moved: false,
        });
        true
    }

    /// Re-intersects the rectangle with `boxes` and writes the result into `selection`.
    pub fn pointer_move(&mut self, x: f64, y: f64, boxes: &[ClipBox], selection: &mut Selection) -> Option<Rect> {
        let state = self.phase.state_mut()?;
        state.current = (x, y);
        if !state.moved {
            let (dx, dy) = (x - state.origin.0, y - state.origin.1);
            state.moved = dx.hypot(dy) > CLICK_SLOP_PX;
        }
        if !state.moved { return Some(state.rect()); }

        let rect = state.rect();
        let hits = boxes.iter().filter(|b| b.rect.intersects(&rect)).map(|b| b.clip_id.as_str());
        if state.additive {
            selection.set_clips(state.base.iter().map(String::as_str).chain(hits));
        } else {
            selection.set_clips(hits);
        }
        Some(rect)
    }

    /// A plain click on empty canvas clears the selection.
    pub fn pointer_up(&mut self, selection: &mut Selection) {
        if let Some(state) = self.phase.take() {
            if !state.moved && !state.additive {
                selection.clear();
            }
        }
    }

    pub fn cancel(&mut self) {
        self.phase = DragPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Clip, SequenceFormat, Track, TrackKind};

    fn setup() -> (Sequence, TimelineGeometry, TrackRows) {
        let mut seq = Sequence::new("s", SequenceFormat::default());
        let mut v1 = Track::new("V1", TrackKind::Video).with_id("v1");
        v1.add_clip(Clip::new("a", 0.0, 2.0).with_id("c1").place_at(0.0));
        v1.add_clip(Clip::new("b", 0.0, 2.0).with_id("c2").place_at(5.0));
        let mut a1 = Track::new("A1", TrackKind::Audio).with_id("a1");
        a1.add_clip(Clip::new("m", 0.0, 4.0).with_id("c3").place_at(1.0));
        seq.add_track(v1);
        seq.add_track(a1);
        let geo = TimelineGeometry::new(100.0, 0.0, 0.0, 1000.0);
        let rows = TrackRows::new(0.0, 50.0, 2);
        (seq, geo, rows)
    }

    #[test]
    fn rectangle_selects_intersecting_clips() {
        let (seq, geo, rows) = setup();
        let boxes = clip_boxes(&seq, &geo, &rows);
        let mut sel = Selection::new();
        let mut drag = MarqueeDrag::new();
        assert!(drag.pointer_down(150.0, 10.0, true, Modifiers::default(), &sel));
        drag.pointer_move(250.0, 40.0, &boxes, &mut sel);
        assert_eq!(sel.clips(), ["c1".to_string()]);
        drag.pointer_move(250.0, 90.0, &boxes, &mut sel);
        assert_eq!(sel.clips(), ["c1".to_string(), "c3".to_string()]);
        drag.pointer_up(&mut sel);
        assert_eq!(sel.clips().len(), 2);
        assert!(drag.rect().is_none());
    }

    #[test]
    fn hidden_track_clips_are_not_selectable() {
        let (mut seq, geo, rows) = setup();
        seq.tracks[1].visible = false;
        let boxes = clip_boxes(&seq, &geo, &rows);
        assert!(boxes.iter().all(|b| b.track_id == "v1"));
        let mut sel = Selection::new();
        let mut drag = MarqueeDrag::new();
        drag.pointer_down(150.0, 10.0, true, Modifiers::default(), &sel);
        drag.pointer_move(250.0, 90.0, &boxes, &mut sel);
        assert_eq!(sel.clips(), ["c1".to_string()]);
    }

    #[test]
    fn shift_unions_with_initial_selection() {
        let (seq, geo, rows) = setup();
        let boxes = clip_boxes(&seq, &geo, &rows);
        let mut sel = Selection::from_clips(["c2"]);
        let mut drag = MarqueeDrag::new();
        drag.pointer_down(150.0, 60.0, true, Modifiers { shift: true, ..Default::default() }, &sel);
        drag.pointer_move(200.0, 90.0, &boxes, &mut sel);
        assert_eq!(sel.clips(), ["c2".to_string(), "c3".to_string()]);
    }

    #[test]
    fn click_without_movement_clears() {
        let (seq, geo, rows) = setup();
        let boxes = clip_boxes(&seq, &geo, &rows);
        let mut sel = Selection::from_clips(["c1"]);
        let mut drag = MarqueeDrag::new();
        drag.pointer_down(800.0, 10.0, true, Modifiers::default(), &sel);
        drag.pointer_move(801.0, 10.0, &boxes, &mut sel);
        assert_eq!(sel.clips().len(), 1);
        drag.pointer_up(&mut sel);
        assert!(sel.clips().is_empty());
    }

    #[test]
    fn refuses_when_not_on_empty_canvas() {
        let sel = Selection::new();
        let mut drag = MarqueeDrag::new();
        assert!(!drag.pointer_down(10.0, 10.0, false, Modifiers::default(), &sel));
    }
}
