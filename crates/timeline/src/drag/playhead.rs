//! Scrubbing the playhead.

use std::time::Instant;

use crate::drag::{DragPhase, PlaybackControl};
use crate::frame::FrameBatcher;
use crate::geometry::{edge_scroll_delta, TimelineGeometry};
use crate::model::{Fps, TimeSec};
use crate::snap::{SnapConfig, SnapPoint};

/// Everything the playhead drag reads from the current frame.
#[derive(Debug, Clone, Copy)]
pub struct PlayheadContext<'a> {
    pub geometry: &'a TimelineGeometry,
    pub duration: TimeSec,
    pub fps: Fps,
    pub snap_points: &'a [SnapPoint],
    /// Client x of the viewport's left edge, for auto-scroll.
    pub viewport_left: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayheadDragState {
    pub start_x: f64,
    pub time: TimeSec,
    pub was_playing: bool,
    pub snapped: Option<SnapPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayheadUpdate {
    pub time: TimeSec,
    pub snapped: Option<SnapPoint>,
    /// Pixels to scroll this frame; 0 outside the edge zones.
    pub auto_scroll: f64,
}

#[derive(Debug, Clone)]
pub struct PlayheadDrag {
    phase: DragPhase<PlayheadDragState>,
    indicator: FrameBatcher<f64>,
    pub snap: SnapConfig,
    pub quantize: bool,
    pub enabled: bool,
    pub edge_zone: f64,
    pub max_scroll_speed: f64,
}

impl PlayheadDrag {
    pub fn new(snap: SnapConfig, flush_rate_hz: f64) -> Self {
        Self {
            phase: DragPhase::Idle,
            indicator: FrameBatcher::new(flush_rate_hz),
            snap,
            quantize: false,
            enabled: true,
            edge_zone: 40.0,
            max_scroll_speed: 24.0,
        }
    }

    pub fn is_dragging(&self) -> bool { self.phase.is_dragging() }

    pub fn state(&self) -> Option<&PlayheadDragState> { self.phase.state() }

    fn resolve(&self, x: f64, ctx: &PlayheadContext<'_>) -> (TimeSec, Option<SnapPoint>) {
        let raw = ctx.geometry.pixel_to_time(x, ctx.duration);
        let (t, hit) = self.snap.snap(raw, ctx.snap_points, ctx.geometry.zoom());
        let t = if hit.is_none() && self.quantize { ctx.fps.quantize(t) } else { t };
        (t.clamp(0.0, ctx.duration.max(0.0)), hit)
    }

    /// Click-to-seek plus drag start. Pauses playback while scrubbing.
    pub fn pointer_down(&mut self, x: f64, ctx: &PlayheadContext<'_>, playback: &mut dyn PlaybackControl) -> bool {
        if !self.enabled || self.phase.is_dragging() { return false; }
        let was_playing = playback.is_playing();
        if was_playing { playback.pause(); }
        let (time, snapped) = self.resolve(x, ctx);
        playback.seek(time);
        self.indicator.push(ctx.geometry.time_to_pixel(time));
        self.phase = DragPhase::Dragging(PlayheadDragState { start_x: x, time, was_playing, snapped });
        true
    }

    /// Seeks on every move; the indicator position goes through the frame batcher.
    pub fn pointer_move(&mut self, x: f64, ctx: &PlayheadContext<'_>, playback: &mut dyn PlaybackControl) -> Option<PlayheadUpdate> {
        if !self.phase.is_dragging() { return None; }
        let (time, snapped) = self.resolve(x, ctx);
        let auto_scroll = edge_scroll_delta(x, ctx.viewport_left, ctx.geometry.viewport_width, self.edge_zone, self.max_scroll_speed);
        let state = self.phase.state_mut()?;
        state.time = time;
        state.snapped = snapped.clone();
        playback.seek(time);
        self.indicator.push(ctx.geometry.time_to_pixel(time));
        Some(PlayheadUpdate { time, snapped, auto_scroll })
    }

    /// Final time of the scrub; resumes playback if it was running.
    pub fn pointer_up(&mut self, playback: &mut dyn PlaybackControl) -> Option<TimeSec> {
        let state = self.phase.take()?;
        if state.was_playing { playback.play(); }
        tracing::debug!(time = state.time, "playhead scrub finished");
        Some(state.time)
    }

    pub fn cancel(&mut self, playback: &mut dyn PlaybackControl) {
        if let Some(state) = self.phase.take() {
            if state.was_playing { playback.play(); }
        }
        self.indicator.clear();
    }

    /// Indicator x for this frame, at most once per flush interval.
    pub fn take_indicator(&mut self, now: Instant) -> Option<f64> {
        if self.phase.is_dragging() { self.indicator.flush(now) } else { self.indicator.flush_now(now) }
    }
}

impl Default for PlayheadDrag {
    fn default() -> Self { Self::new(SnapConfig::default(), crate::frame::DEFAULT_FLUSH_HZ) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snap::SnapKind;

    #[derive(Default)]
    struct Transport {
        playing: bool,
        seeks: Vec<TimeSec>,
        pauses: usize,
        plays: usize,
    }

    impl PlaybackControl for Transport {
        fn seek(&mut self, time: TimeSec) { self.seeks.push(time); }
        fn pause(&mut self) { self.playing = false; self.pauses += 1; }
        fn play(&mut self) { self.playing = true; self.plays += 1; }
        fn is_playing(&self) -> bool { self.playing }
    }

    fn geo() -> TimelineGeometry { TimelineGeometry::new(100.0, 0.0, 100.0, 1000.0) }

    #[test]
    fn seeks_on_every_move_and_resumes_playback() {
        let geometry = geo();
        let ctx = PlayheadContext { geometry: &geometry, duration: 20.0, fps: Fps::default(), snap_points: &[], viewport_left: 0.0 };
        let mut transport = Transport { playing: true, ..Default::default() };
        let mut drag = PlayheadDrag::default();

        assert!(drag.pointer_down(300.0, &ctx, &mut transport));
        assert!(!transport.playing);
        drag.pointer_move(350.0, &ctx, &mut transport);
        drag.pointer_move(400.0, &ctx, &mut transport);
        assert_eq!(transport.seeks, vec![2.0, 2.5, 3.0]);

        assert_eq!(drag.pointer_up(&mut transport), Some(3.0));
        assert!(transport.playing);
        assert!(!drag.is_dragging());
    }

    #[test]
    fn snaps_and_clamps_to_duration() {
        let geometry = geo();
        let pts = [SnapPoint::new(4.0, SnapKind::Marker)];
        let ctx = PlayheadContext { geometry: &geometry, duration: 10.0, fps: Fps::default(), snap_points: &pts, viewport_left: 0.0 };
        let mut transport = Transport::default();
        let mut drag = PlayheadDrag::default();
        drag.pointer_down(100.0, &ctx, &mut transport);
        let up = drag.pointer_move(495.0, &ctx, &mut transport).unwrap();
        assert_eq!(up.time, 4.0);
        assert_eq!(up.snapped.map(|p| p.kind), Some(SnapKind::Marker));
        let up = drag.pointer_move(5000.0, &ctx, &mut transport).unwrap();
        assert_eq!(up.time, 10.0);
        assert!(up.auto_scroll > 0.0);
        drag.cancel(&mut transport);
        assert_eq!(transport.plays, 0);
    }

    #[test]
    fn disabled_refuses_pointer_down() {
        let geometry = geo();
        let ctx = PlayheadContext { geometry: &geometry, duration: 10.0, fps: Fps::default(), snap_points: &[], viewport_left: 0.0 };
        let mut transport = Transport::default();
        let mut drag = PlayheadDrag { enabled: false, ..PlayheadDrag::default() };
        assert!(!drag.pointer_down(200.0, &ctx, &mut transport));
        assert!(transport.seeks.is_empty());
        assert!(drag.pointer_up(&mut transport).is_none());
    }

    #[test]
    fn indicator_is_batched() {
        let geometry = geo();
        let ctx = PlayheadContext { geometry: &geometry, duration: 20.0, fps: Fps::default(), snap_points: &[], viewport_left: 0.0 };
        let mut transport = Transport::default();
        let mut drag = PlayheadDrag::default();
        let now = Instant::now();
        drag.pointer_down(200.0, &ctx, &mut transport);
        drag.pointer_move(250.0, &ctx, &mut transport);
        drag.pointer_move(260.0, &ctx, &mut transport);
        assert_eq!(drag.take_indicator(now), Some(260.0));
        assert_eq!(drag.take_indicator(now), None);
    }

    #[test]
    fn quantizes_when_not_snapped() {
        let geometry = geo();
        let ctx = PlayheadContext { geometry: &geometry, duration: 20.0, fps: Fps::new(10, 1), snap_points: &[], viewport_left: 0.0 };
        let mut transport = Transport::default();
        let mut drag = PlayheadDrag { quantize: true, ..PlayheadDrag::default() };
        drag.pointer_down(100.0, &ctx, &mut transport);
        let up = drag.pointer_move(213.0, &ctx, &mut transport).unwrap();
        assert!((up.time - 1.1).abs() < 1e-9);
    }

    #[test]
    fn pointer_down_indicator_matches_seek() {
        let geometry = geo();
        let ctx = PlayheadContext { geometry: &geometry, duration: 20.0, fps: Fps::new(10, 1), snap_points: &[], viewport_left: 0.0 };
        let mut transport = Transport::default();
        let mut drag = PlayheadDrag { quantize: true, ..PlayheadDrag::default() };
        drag.pointer_down(213.0, &ctx, &mut transport);
        let x = drag.take_indicator(Instant::now()).unwrap();
        assert!((x - 210.0).abs() < 1e-9, "indicator at {x}");

        let mut drag = PlayheadDrag::default();
        drag.pointer_down(40.0, &ctx, &mut transport);
        assert_eq!(drag.take_indicator(Instant::now()), Some(100.0));
    }
}
