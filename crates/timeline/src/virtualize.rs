//! Viewport culling: which clips, captions, markers and preview tiles are worth
//! building primitives for, and which keys just entered or left the viewport.

use std::collections::HashSet;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::geometry::TimelineGeometry;
use crate::model::{Caption, Clip, Marker, TimeSec};

/// Anything occupying a time interval on the timeline.
pub trait TimeSpan {
    fn span_start(&self) -> TimeSec;
    fn span_end(&self) -> TimeSec;
}

impl TimeSpan for Clip {
    fn span_start(&self) -> TimeSec { self.timeline_in() }
    fn span_end(&self) -> TimeSec { self.timeline_end() }
}

impl TimeSpan for Caption {
    fn span_start(&self) -> TimeSec { self.start_sec }
    fn span_end(&self) -> TimeSec { self.end_sec }
}

impl TimeSpan for Marker {
    fn span_start(&self) -> TimeSec { self.time_sec }
    fn span_end(&self) -> TimeSec { self.time_sec }
}

/// Visible time range, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisibleWindow {
    pub start: TimeSec,
    pub end: TimeSec,
}

impl VisibleWindow {
    /// Content pixels `[scroll - buffer, scroll + width + buffer]` in seconds.
    pub fn from_geometry(geometry: &TimelineGeometry, buffer_px: f64) -> Self {
        let zoom = geometry.zoom();
        let buffer = buffer_px.max(0.0);
        Self {
            start: (geometry.scroll_x - buffer) / zoom,
            end: (geometry.scroll_x + geometry.viewport_width + buffer) / zoom,
        }
    }

    pub fn overlaps(&self, start: TimeSec, end: TimeSec) -> bool {
        start <= self.end && end >= self.start
    }

    pub fn contains_span<T: TimeSpan + ?Sized>(&self, item: &T) -> bool {
        self.overlaps(item.span_start(), item.span_end())
    }
}

pub fn visible_items<'a, T: TimeSpan>(items: &'a [T], window: &VisibleWindow) -> impl Iterator<Item = &'a T> + 'a {
    let window = *window;
    items.iter().filter(move |item| window.contains_span(*item))
}

pub fn visible_indices<T: TimeSpan>(items: &[T], window: &VisibleWindow) -> Vec<usize> {
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| window.contains_span(*item))
        .map(|(i, _)| i)
        .collect()
}

/// One preview tile inside a clip box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailTile {
    pub index: usize,
    /// Screen x of the tile's left edge.
    pub x: f64,
    pub width: f64,
    /// Source time the tile shows (its midpoint).
    pub source_time: TimeSec,
}

/// Tiles of `clip` that overlap `window`. Tiles are `tile_width` px wide, the
/// last one is cut at the clip end.
pub fn thumbnail_tiles(clip: &Clip, geometry: &TimelineGeometry, tile_width: f64, window: &VisibleWindow) -> Vec<ThumbnailTile> {
    let zoom = geometry.zoom();
    let clip_in = clip.timeline_in();
    let clip_end = clip.timeline_end();
    if !(tile_width > 0.0) || !(clip_end > clip_in) || !window.overlaps(clip_in, clip_end) {
        return Vec::new();
    }
    let tile_sec = tile_width / zoom;
    let count = ((clip_end - clip_in) / tile_sec).ceil() as usize;
    let first = ((window.start - clip_in) / tile_sec).floor().max(0.0) as usize;
    let last = (((window.end - clip_in) / tile_sec).floor().max(0.0) as usize).min(count.saturating_sub(1));
    let speed = clip.effective_speed();
    let (src_in, src_out) = (clip.range.source_in_sec, clip.range.source_out_sec);

    (first..=last)
        .filter_map(|index| {
            let start = clip_in + index as f64 * tile_sec;
            let end = (start + tile_sec).min(clip_end);
            if end <= start { return None; }
            let mid = (start + end) / 2.0;
            Some(ThumbnailTile {
                index,
                x: geometry.time_to_pixel(start),
                width: (end - start) * zoom,
                source_time: (src_in + (mid - clip_in) * speed).clamp(src_in, src_out),
            })
        })
        .collect()
}

/// Keys that entered or left the viewport since the previous update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityChange<K> {
    pub shown: Vec<K>,
    pub hidden: Vec<K>,
}

impl<K> VisibilityChange<K> {
    pub fn is_empty(&self) -> bool { self.shown.is_empty() && self.hidden.is_empty() }
}

/// Frame-to-frame intersection watcher. Feed it the keys visible this frame.
#[derive(Debug, Clone)]
pub struct VisibilityTracker<K> {
    order: Vec<K>,
    set: HashSet<K>,
}

impl<K: Eq + Hash + Clone> Default for VisibilityTracker<K> {
    fn default() -> Self { Self { order: Vec::new(), set: HashSet::new() } }
}

impl<K: Eq + Hash + Clone> VisibilityTracker<K> {
    pub fn new() -> Self { Self::default() }

    pub fn update<I: IntoIterator<Item = K>>(&mut self, current: I) -> VisibilityChange<K> {
        let mut order = Vec::new();
        let mut set = HashSet::new();
        for key in current {
            if set.insert(key.clone()) {
                order.push(key);
            }
        }
        let shown = order.iter().filter(|k| !self.set.contains(*k)).cloned().collect();
        let hidden = self.order.iter().filter(|k| !set.contains(*k)).cloned().collect();
        self.order = order;
        self.set = set;
        VisibilityChange { shown, hidden }
    }

    pub fn is_visible(&self, key: &K) -> bool { self.set.contains(key) }

    pub fn visible(&self) -> &[K] { &self.order }

    pub fn clear(&mut self) -> Vec<K> {
        self.set.clear();
        std::mem::take(&mut self.order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_includes_buffer() {
        let geo = TimelineGeometry::new(100.0, 0.0, 0.0, 1000.0);
        let w = VisibleWindow::from_geometry(&geo, 200.0);
        assert_eq!(w, VisibleWindow { start: -2.0, end: 12.0 });
        assert!(w.overlaps(12.0, 13.0));
        assert!(!w.overlaps(12.01, 13.0));
    }

    #[test]
    fn tiles_only_for_visible_part() {
        // clip 0..100 s at zoom 10 -> 1000 px, 100 px tiles
        let clip = Clip::new("a", 10.0, 110.0);
        let geo = TimelineGeometry::new(10.0, 300.0, 0.0, 200.0);
        let window = VisibleWindow::from_geometry(&geo, 0.0);
        let tiles = thumbnail_tiles(&clip, &geo, 100.0, &window);
        let idx: Vec<usize> = tiles.iter().map(|t| t.index).collect();
        assert_eq!(idx, vec![3, 4, 5]);
        assert_eq!(tiles[0].x, 0.0);
        assert!((tiles[0].source_time - 45.0).abs() < 1e-9);
    }

    #[test]
    fn last_tile_is_cut_at_clip_end() {
        let clip = Clip::new("a", 0.0, 2.5);
        let geo = TimelineGeometry::new(100.0, 0.0, 0.0, 1000.0);
        let window = VisibleWindow::from_geometry(&geo, 0.0);
        let tiles = thumbnail_tiles(&clip, &geo, 100.0, &window);
        assert_eq!(tiles.len(), 3);
        assert!((tiles[2].width - 50.0).abs() < 1e-9);
        assert!(thumbnail_tiles(&clip, &geo, 0.0, &window).is_empty());
    }

    #[test]
    fn tracker_reports_transitions() {
        let mut tracker = VisibilityTracker::new();
        let c = tracker.update(["a", "b"]);
        assert_eq!(c.shown, vec!["a", "b"]);
        assert!(c.hidden.is_empty());

        let c = tracker.update(["b", "c", "c"]);
        assert_eq!(c.shown, vec!["c"]);
        assert_eq!(c.hidden, vec!["a"]);
        assert!(tracker.is_visible(&"b"));

        assert!(tracker.update(["b", "c"]).is_empty());
        assert_eq!(tracker.clear(), vec!["b", "c"]);
    }
}
