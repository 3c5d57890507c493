//! Routes canvas pointer events into the timeline drag machines. Coordinates
//! are local to the timeline canvas: the ruler spans `y < rows.top` and the
//! track header column spans `x < geometry.header_width`.

use std::time::Instant;

use crate::timeline_crate::drag::audio::{AudioDrag, AudioHandle};
use crate::timeline_crate::drag::clip::{ClipDrag, ClipDragContext};
use crate::timeline_crate::drag::marquee::{clip_boxes, MarqueeDrag};
use crate::timeline_crate::drag::playhead::{PlayheadContext, PlayheadDrag};
use crate::timeline_crate::drag::{Modifiers, PlaybackControl};
use crate::timeline_crate::ops::TimelineOps;
use crate::timeline_crate::scene::{ClipOverlay, SceneOverlay};
use crate::timeline_crate::snap::{collect_snap_points, SnapSources};
use crate::timeline_crate::{Selection, Sequence, SnapPoint, TimelineConfig, TimelineGeometry, TrackKind, TrackRows};

/// Playback position owned by the shell.
#[derive(Debug, Clone, Default)]
pub struct Transport {
    pub time: f64,
    pub playing: bool,
    pub duration: f64,
}

impl Transport {
    pub fn tick(&mut self, dt: f64) {
        if !self.playing { return; }
        self.time += dt;
        if self.time >= self.duration {
            self.time = self.duration.max(0.0);
            self.playing = false;
        }
    }

    pub fn toggle(&mut self) {
        if self.playing {
            self.pause();
        } else {
            if self.time >= self.duration { self.time = 0.0; }
            self.play();
        }
    }
}

impl PlaybackControl for Transport {
    fn seek(&mut self, time: f64) { self.time = time.max(0.0); }
    fn pause(&mut self) { self.playing = false; }
    fn play(&mut self) { self.playing = true; }
    fn is_playing(&self) -> bool { self.playing }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Gesture { Playhead, Clip, Audio, Marquee }

#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub geometry: TimelineGeometry,
    pub rows: TrackRows,
}

pub struct TimelineInteraction {
    pub selection: Selection,
    playhead: PlayheadDrag,
    clip: ClipDrag,
    audio: AudioDrag,
    marquee: MarqueeDrag,
    active: Option<Gesture>,
    snap_points: Vec<SnapPoint>,
    overlay: SceneOverlay,
    /// Horizontal scroll requested by the playhead drag this frame.
    pub auto_scroll: f64,
}

impl TimelineInteraction {
    pub fn new(config: &TimelineConfig) -> Self {
        let mut playhead = PlayheadDrag::new(config.snap_config(), config.flush_rate_hz);
        playhead.quantize = config.quantize_to_frames;
        playhead.edge_zone = config.auto_scroll_zone_px;
        playhead.max_scroll_speed = config.auto_scroll_max_px;
        let mut clip = ClipDrag::new(config.snap_config());
        clip.edge_handle_px = config.edge_handle_px;
        clip.quantize = config.quantize_to_frames;
        Self {
            selection: Selection::new(),
            playhead,
            clip,
            audio: AudioDrag::new(),
            marquee: MarqueeDrag::new(),
            active: None,
            snap_points: Vec::new(),
            overlay: SceneOverlay::default(),
            auto_scroll: 0.0,
        }
    }

    pub fn overlay(&self) -> &SceneOverlay { &self.overlay }

    pub fn active(&self) -> Option<Gesture> { self.active }

    pub fn set_snap_enabled(&mut self, enabled: bool) {
        self.playhead.snap.enabled = enabled;
        self.clip.snap.enabled = enabled;
    }

    pub fn pointer_down(
        &mut self,
        x: f64,
        y: f64,
        modifiers: Modifiers,
        seq: &Sequence,
        layout: &Layout,
        transport: &mut Transport,
    ) -> Option<Gesture> {
        if self.active.is_some() { return None; }
        let gesture = if y < layout.rows.top {
            self.snap_points = collect_snap_points(seq, transport.time, &SnapSources::all().excluding_times([transport.time]));
            let ctx = playhead_ctx(seq, layout, &self.snap_points);
            self.playhead.pointer_down(x, &ctx, transport).then_some(Gesture::Playhead)
        } else if x < layout.geometry.header_width {
            None
        } else if let Some(hit) = clip_boxes(seq, &layout.geometry, &layout.rows).into_iter().find(|b| b.rect.contains(x, y)) {
            let (track, clip) = seq.find_clip(&hit.clip_id)?;
            if modifiers.alt && track.kind == TrackKind::Audio {
                let rel = (x - hit.rect.x0) / hit.rect.width().max(1.0);
                let handle = if rel < 0.25 {
                    AudioHandle::FadeIn
                } else if rel > 0.75 {
                    AudioHandle::FadeOut
                } else {
                    AudioHandle::Volume
                };
                self.audio.pointer_down(handle, track, clip, x, y).then_some(Gesture::Audio)
            } else {
                if modifiers.shift || modifiers.ctrl {
                    self.selection.toggle_clip(&clip.id);
                } else if !self.selection.is_clip_selected(&clip.id) {
                    self.selection.select_clip(&clip.id, false);
                }
                self.snap_points = collect_snap_points(seq, transport.time, &SnapSources::all().excluding_clip(clip.id.clone()));
                let ctx = ClipDragContext { sequence: seq, geometry: &layout.geometry, rows: &layout.rows, snap_points: &self.snap_points };
                self.clip.pointer_down(x, &clip.id, &ctx, modifiers).then_some(Gesture::Clip)
            }
        } else {
            self.marquee.pointer_down(x, y, true, modifiers, &self.selection).then_some(Gesture::Marquee)
        };
        self.active = gesture;
        gesture
    }

    pub fn pointer_move(&mut self, x: f64, y: f64, seq: &Sequence, layout: &Layout, transport: &mut Transport) {
        match self.active {
            Some(Gesture::Playhead) => {
                let ctx = playhead_ctx(seq, layout, &self.snap_points);
                if let Some(update) = self.playhead.pointer_move(x, &ctx, transport) {
                    self.overlay.snap = update.snapped;
                    self.auto_scroll = update.auto_scroll;
                }
            }
            Some(Gesture::Clip) => {
                let ctx = ClipDragContext { sequence: seq, geometry: &layout.geometry, rows: &layout.rows, snap_points: &self.snap_points };
                if let Some(preview) = self.clip.pointer_move(x, y, &ctx) {
                    if let Some(state) = self.clip.state() {
                        self.overlay.clip = Some(ClipOverlay {
                            clip_id: state.clip_id.clone(),
                            track_index: state.track_index,
                            preview,
                        });
                        self.overlay.snap = state.snapped.clone();
                    }
                }
            }
            Some(Gesture::Audio) => {
                self.audio.pointer_move(x, y, layout.geometry.zoom());
            }
            Some(Gesture::Marquee) => {
                let boxes = clip_boxes(seq, &layout.geometry, &layout.rows);
                self.overlay.marquee = self.marquee.pointer_move(x, y, &boxes, &mut self.selection);
            }
            None => {}
        }
    }

    /// Ends the active gesture. Returns true when an edit was reported to `ops`.
    pub fn pointer_up(&mut self, ops: &mut dyn TimelineOps, transport: &mut Transport) -> bool {
        let committed = match self.active.take() {
            Some(Gesture::Playhead) => {
                self.playhead.pointer_up(transport);
                false
            }
            Some(Gesture::Clip) => self.clip.pointer_up(ops),
            Some(Gesture::Audio) => self.audio.pointer_up(ops).is_some(),
            Some(Gesture::Marquee) => {
                self.marquee.pointer_up(&mut self.selection);
                false
            }
            None => false,
        };
        self.reset_overlay();
        committed
    }

    /// Focus loss or Escape: nothing is committed.
    pub fn cancel(&mut self, transport: &mut Transport) {
        self.playhead.cancel(transport);
        self.clip.cancel();
        self.audio.cancel();
        self.marquee.cancel();
        self.active = None;
        self.reset_overlay();
    }

    /// Once per frame: pulls the batched playhead indicator into the overlay.
    pub fn flush_frame(&mut self, now: Instant, geometry: &TimelineGeometry) {
        if let Some(x) = self.playhead.take_indicator(now) {
            self.overlay.playhead = self.playhead.is_dragging().then(|| geometry.pixel_to_time_unclamped(x));
        }
    }

    /// Live values of an audio drag, for the inline readout.
    pub fn audio_readout(&self) -> Option<String> {
        let s = self.audio.state()?;
        Some(match s.handle {
            AudioHandle::Volume => format!("{:+.1} dB", s.current.volume_db),
            AudioHandle::FadeIn => format!("fade in {:.2}s", s.current.fade_in_sec),
            AudioHandle::FadeOut => format!("fade out {:.2}s", s.current.fade_out_sec),
        })
    }

    fn reset_overlay(&mut self) {
        self.overlay = SceneOverlay::default();
        self.snap_points.clear();
        self.auto_scroll = 0.0;
    }
}

fn playhead_ctx<'a>(seq: &Sequence, layout: &'a Layout, points: &'a [SnapPoint]) -> PlayheadContext<'a> {
    PlayheadContext {
        geometry: &layout.geometry,
        duration: seq.duration(),
        fps: seq.format.fps,
        snap_points: points,
        viewport_left: layout.geometry.header_width,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline_crate::ops::{OpQueue, TimelineOp};
    use crate::timeline_crate::{Clip, SequenceFormat, Track};

    fn setup() -> (Sequence, Layout, TimelineInteraction, Transport) {
        let mut seq = Sequence::new("s", SequenceFormat::default());
        let mut v1 = Track::new("V1", TrackKind::Video).with_id("v1");
        v1.add_clip(Clip::new("a", 0.0, 2.0).with_id("c1"));
        v1.add_clip(Clip::new("b", 0.0, 2.0).with_id("c2").place_at(5.0));
        let mut a1 = Track::new("A1", TrackKind::Audio).with_id("a1");
        a1.add_clip(Clip::new("m", 0.0, 8.0).with_id("m1"));
        seq.add_track(v1);
        seq.add_track(a1);
        let layout = Layout {
            geometry: TimelineGeometry::new(100.0, 0.0, 100.0, 1000.0),
            rows: TrackRows::new(30.0, 50.0, 2),
        };
        let transport = Transport { duration: seq.duration(), ..Default::default() };
        (seq, layout, TimelineInteraction::new(&TimelineConfig::default()), transport)
    }

    #[test]
    fn ruler_press_scrubs_and_resumes_playback() {
        let (seq, layout, mut ix, mut transport) = setup();
        transport.playing = true;
        assert_eq!(ix.pointer_down(400.0, 10.0, Modifiers::default(), &seq, &layout, &mut transport), Some(Gesture::Playhead));
        assert!(!transport.playing);
        assert_eq!(transport.time, 3.0);
        ix.pointer_move(460.0, 10.0, &seq, &layout, &mut transport);
        assert_eq!(transport.time, 3.6);
        let mut ops = OpQueue::default();
        assert!(!ix.pointer_up(&mut ops, &mut transport));
        assert!(transport.playing);
        assert!(ops.ops.is_empty());
    }

    #[test]
    fn clip_press_selects_and_moves() {
        let (seq, layout, mut ix, mut transport) = setup();
        // c2 spans x 600..800 on the first row
        assert_eq!(ix.pointer_down(700.0, 50.0, Modifiers::default(), &seq, &layout, &mut transport), Some(Gesture::Clip));
        assert!(ix.selection.is_clip_selected("c2"));
        ix.pointer_move(750.0, 50.0, &seq, &layout, &mut transport);
        assert!(ix.overlay().clip.is_some());
        let mut ops = OpQueue::default();
        assert!(ix.pointer_up(&mut ops, &mut transport));
        assert!(ix.overlay().clip.is_none());
        match &ops.ops[..] {
            [TimelineOp::ClipMove(m)] => assert!((m.timeline_in_sec - 5.5).abs() < 1e-9),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_canvas_marquee_selects_and_click_clears() {
        let (seq, layout, mut ix, mut transport) = setup();
        assert_eq!(ix.pointer_down(350.0, 35.0, Modifiers::default(), &seq, &layout, &mut transport), Some(Gesture::Marquee));
        ix.pointer_move(650.0, 60.0, &seq, &layout, &mut transport);
        assert!(ix.selection.is_clip_selected("c2"));
        let mut ops = OpQueue::default();
        ix.pointer_up(&mut ops, &mut transport);
        assert!(ix.selection.is_clip_selected("c2"));

        ix.pointer_down(350.0, 35.0, Modifiers::default(), &seq, &layout, &mut transport);
        ix.pointer_up(&mut ops, &mut transport);
        assert!(ix.selection.is_empty());
    }

    #[test]
    fn alt_drag_on_audio_changes_volume() {
        let (seq, layout, mut ix, mut transport) = setup();
        let alt = Modifiers { alt: true, ..Default::default() };
        assert_eq!(ix.pointer_down(500.0, 100.0, alt, &seq, &layout, &mut transport), Some(Gesture::Audio));
        ix.pointer_move(500.0, 80.0, &seq, &layout, &mut transport);
        assert_eq!(ix.audio_readout().as_deref(), Some("+2.0 dB"));
        let mut ops = OpQueue::default();
        assert!(ix.pointer_up(&mut ops, &mut transport));
        assert!(matches!(&ops.ops[0], TimelineOp::AudioSettings(c) if c.volume_db == Some(2.0)));
    }

    #[test]
    fn cancel_commits_nothing() {
        let (seq, layout, mut ix, mut transport) = setup();
        ix.pointer_down(700.0, 50.0, Modifiers::default(), &seq, &layout, &mut transport);
        ix.pointer_move(900.0, 50.0, &seq, &layout, &mut transport);
        ix.cancel(&mut transport);
        let mut ops = OpQueue::default();
        assert!(!ix.pointer_up(&mut ops, &mut transport));
        assert!(ops.ops.is_empty());
    }
}
