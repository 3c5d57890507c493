//! Time/pixel conversions and the small amount of rectangle math the
//! interaction layer needs.

use serde::{Deserialize, Serialize};

use crate::model::{Clip, TimeSec};

/// Zoom floor in px/sec, guards the pixel-to-time division.
pub const MIN_ZOOM: f64 = 0.1;

pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_finite() { zoom.max(MIN_ZOOM) } else { MIN_ZOOM }
}

/// `timeSec * zoom + headerWidth - scrollX`.
pub fn time_to_pixel(time_sec: TimeSec, zoom: f64, scroll_x: f64, header_width: f64) -> f64 {
    time_sec * clamp_zoom(zoom) + header_width - scroll_x
}

/// Inverse of [`time_to_pixel`] without the duration clamp.
pub fn pixel_to_time_unclamped(px: f64, zoom: f64, scroll_x: f64, header_width: f64) -> TimeSec {
    (px - header_width + scroll_x) / clamp_zoom(zoom)
}

/// Inverse of [`time_to_pixel`], clamped to `[0, duration]`.
pub fn pixel_to_time(px: f64, zoom: f64, scroll_x: f64, header_width: f64, duration: TimeSec) -> TimeSec {
    let t = pixel_to_time_unclamped(px, zoom, scroll_x, header_width);
    if !t.is_finite() { return 0.0; }
    t.clamp(0.0, duration.max(0.0))
}

/// Fraction of a full-length preview image covered by a trimmed source range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipRegion {
    pub offset_percent: f64,
    pub width_percent: f64,
}

impl ClipRegion {
    pub const FULL: ClipRegion = ClipRegion { offset_percent: 0.0, width_percent: 100.0 };

    /// How much the full image has to be scaled so the region fills the box.
    pub fn scale_factor(&self) -> f64 {
        if self.width_percent > 0.0 { 100.0 / self.width_percent } else { 1.0 }
    }
}

pub fn clip_region(source_in: TimeSec, source_out: TimeSec, total_duration: TimeSec) -> ClipRegion {
    let finite = source_in.is_finite() && source_out.is_finite() && total_duration.is_finite();
    if !finite || total_duration <= 0.0 || source_out <= source_in {
        return ClipRegion::FULL;
    }
    let offset = (source_in / total_duration * 100.0).clamp(0.0, 100.0);
    let width = ((source_out - source_in) / total_duration * 100.0).clamp(0.0, 100.0 - offset);
    if width <= 0.0 {
        return ClipRegion::FULL;
    }
    ClipRegion { offset_percent: offset, width_percent: width }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self { Self { x0, y0, x1, y1 } }

    /// Normalized rectangle spanned by two corner points.
    pub fn from_points(a: (f64, f64), b: (f64, f64)) -> Self {
        Self { x0: a.0.min(b.0), y0: a.1.min(b.1), x1: a.0.max(b.0), y1: a.1.max(b.1) }
    }

    pub fn width(&self) -> f64 { self.x1 - self.x0 }
    pub fn height(&self) -> f64 { self.y1 - self.y0 }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x0 < other.x1 && self.x1 > other.x0 && self.y0 < other.y1 && self.y1 > other.y0
    }
}

/// Viewport state shared by hit-testing, virtualization and scene building.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineGeometry {
    pub zoom: f64,
    pub scroll_x: f64,
    pub header_width: f64,
    pub viewport_width: f64,
}

impl TimelineGeometry {
    pub fn new(zoom: f64, scroll_x: f64, header_width: f64, viewport_width: f64) -> Self {
        Self { zoom: clamp_zoom(zoom), scroll_x, header_width, viewport_width }
    }

    pub fn zoom(&self) -> f64 { clamp_zoom(self.zoom) }

    pub fn time_to_pixel(&self, t: TimeSec) -> f64 {
        time_to_pixel(t, self.zoom, self.scroll_x, self.header_width)
    }

    pub fn pixel_to_time(&self, px: f64, duration: TimeSec) -> TimeSec {
        pixel_to_time(px, self.zoom, self.scroll_x, self.header_width, duration)
    }

    pub fn pixel_to_time_unclamped(&self, px: f64) -> TimeSec {
        pixel_to_time_unclamped(px, self.zoom, self.scroll_x, self.header_width)
    }

    /// Converts a horizontal pixel delta into seconds.
    pub fn delta_to_time(&self, dx: f64) -> TimeSec { dx / self.zoom() }

    /// Left edge and width of a clip box in pixels.
    pub fn clip_span(&self, clip: &Clip) -> (f64, f64) {
        let x = self.time_to_pixel(clip.timeline_in());
        (x, clip.duration() * self.zoom())
    }

    /// Zoom that fits `duration` into the content viewport.
    pub fn fit_zoom(&self, duration: TimeSec) -> f64 {
        let usable = self.viewport_width.max(1.0);
        if duration <= 0.0 { return self.zoom(); }
        clamp_zoom(usable / duration)
    }

    /// Re-zooms keeping the time under `anchor_px` fixed on screen.
    pub fn zoom_around(&mut self, new_zoom: f64, anchor_px: f64) {
        let anchor_t = self.pixel_to_time_unclamped(anchor_px);
        self.zoom = clamp_zoom(new_zoom);
        self.scroll_x = (anchor_t * self.zoom + self.header_width - anchor_px).max(0.0);
    }
}

/// Vertical layout of the track rows, in the same client coordinates as the
/// pointer events fed to the drag machines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackRows {
    /// Client y of the first row's top edge.
    pub top: f64,
    pub track_height: f64,
    pub count: usize,
}

impl TrackRows {
    pub fn new(top: f64, track_height: f64, count: usize) -> Self { Self { top, track_height, count } }

    /// Row under `y`, `None` above the first or below the last row.
    pub fn row_at(&self, y: f64) -> Option<usize> {
        if self.track_height <= 0.0 || !y.is_finite() || y < self.top { return None; }
        let idx = ((y - self.top) / self.track_height).floor() as usize;
        (idx < self.count).then_some(idx)
    }

    pub fn row_top(&self, index: usize) -> f64 { self.top + index as f64 * self.track_height }

    pub fn row_rect(&self, index: usize, x0: f64, x1: f64) -> Rect {
        let y0 = self.row_top(index);
        Rect::new(x0, y0, x1, y0 + self.track_height)
    }

    pub fn bottom(&self) -> f64 { self.row_top(self.count) }
}

/// Scroll speed for auto-scroll while dragging near a viewport edge.
/// Negative near the left edge, positive near the right edge, 0 elsewhere;
/// grows linearly with how deep the pointer is inside the edge zone.
pub fn edge_scroll_delta(pointer_x: f64, viewport_left: f64, viewport_width: f64, edge_zone: f64, max_speed: f64) -> f64 {
    if edge_zone <= 0.0 || viewport_width <= 0.0 { return 0.0; }
    let left_depth = viewport_left + edge_zone - pointer_x;
    let right_depth = pointer_x - (viewport_left + viewport_width - edge_zone);
    if left_depth > 0.0 {
        -max_speed * (left_depth / edge_zone).min(1.0)
    } else if right_depth > 0.0 {
        max_speed * (right_depth / edge_zone).min(1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_time_round_trip() {
        let duration = 120.0;
        for &(zoom, scroll, header) in &[(100.0, 0.0, 100.0), (0.5, 35.0, 0.0), (37.3, 812.25, 180.0)] {
            for i in 0..=40 {
                let t = duration * i as f64 / 40.0;
                let px = time_to_pixel(t, zoom, scroll, header);
                let back = pixel_to_time(px, zoom, scroll, header, duration);
                assert!((back - t).abs() < 1e-9, "t={t} zoom={zoom} back={back}");
            }
        }
    }

    #[test]
    fn pixel_to_time_clamps_to_duration() {
        assert_eq!(pixel_to_time(-500.0, 100.0, 0.0, 100.0, 10.0), 0.0);
        assert_eq!(pixel_to_time(50_000.0, 100.0, 0.0, 100.0, 10.0), 10.0);
    }

    #[test]
    fn zoom_is_clamped_before_use() {
        assert_eq!(clamp_zoom(0.0), MIN_ZOOM);
        assert_eq!(clamp_zoom(f64::NAN), MIN_ZOOM);
        let t = pixel_to_time(10.0, 0.0, 0.0, 0.0, 1000.0);
        assert!((t - 100.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_clip_regions_are_full() {
        assert_eq!(clip_region(5.0, 5.0, 10.0), ClipRegion::FULL);
        assert_eq!(clip_region(6.0, 5.0, 10.0), ClipRegion::FULL);
        assert_eq!(clip_region(0.0, 5.0, 0.0), ClipRegion::FULL);
        assert_eq!(clip_region(0.0, 5.0, -1.0), ClipRegion::FULL);
        assert_eq!(clip_region(f64::NAN, 5.0, 10.0), ClipRegion::FULL);
        for r in [clip_region(1.0, 1.0, 0.0), clip_region(0.0, f64::INFINITY, 10.0)] {
            assert!(r.offset_percent.is_finite() && r.width_percent.is_finite());
            assert!(r.scale_factor().is_finite());
        }
    }

    #[test]
    fn clip_region_of_trimmed_range() {
        let r = clip_region(2.5, 7.5, 10.0);
        assert!((r.offset_percent - 25.0).abs() < 1e-9);
        assert!((r.width_percent - 50.0).abs() < 1e-9);
        assert!((r.scale_factor() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn clip_span_uses_speed() {
        let geo = TimelineGeometry::new(10.0, 0.0, 100.0, 800.0);
        let clip = Clip::new("a", 0.0, 8.0).with_speed(2.0).place_at(1.0);
        let (x, w) = geo.clip_span(&clip);
        assert_eq!(x, 110.0);
        assert_eq!(w, 40.0);
    }

    #[test]
    fn zoom_around_keeps_anchor() {
        let mut geo = TimelineGeometry::new(10.0, 50.0, 100.0, 800.0);
        let anchor = 400.0;
        let before = geo.pixel_to_time_unclamped(anchor);
        geo.zoom_around(20.0, anchor);
        assert!((geo.pixel_to_time_unclamped(anchor) - before).abs() < 1e-9);
    }

    #[test]
    fn edge_scroll_only_inside_zones() {
        assert_eq!(edge_scroll_delta(500.0, 0.0, 1000.0, 50.0, 20.0), 0.0);
        assert!(edge_scroll_delta(10.0, 0.0, 1000.0, 50.0, 20.0) < 0.0);
        assert!(edge_scroll_delta(990.0, 0.0, 1000.0, 50.0, 20.0) > 0.0);
        assert_eq!(edge_scroll_delta(2000.0, 0.0, 1000.0, 50.0, 20.0), 20.0);
    }

    #[test]
    fn track_rows_hit_test() {
        let rows = TrackRows::new(30.0, 50.0, 3);
        assert_eq!(rows.row_at(29.9), None);
        assert_eq!(rows.row_at(30.0), Some(0));
        assert_eq!(rows.row_at(130.0), Some(2));
        assert_eq!(rows.row_at(180.0), None);
        assert_eq!(rows.row_rect(1, 0.0, 10.0), Rect::new(0.0, 80.0, 10.0, 130.0));
        assert_eq!(TrackRows::new(0.0, 0.0, 3).row_at(10.0), None);
    }

    #[test]
    fn rect_intersection() {
        let a = Rect::from_points((10.0, 10.0), (0.0, 0.0));
        assert_eq!(a, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(a.intersects(&Rect::new(5.0, 5.0, 15.0, 15.0)));
        assert!(!a.intersects(&Rect::new(10.0, 0.0, 20.0, 10.0)));
        assert!(a.contains(10.0, 0.0));
    }
}
