//! Snapping engine for timeline interactions.

use serde::{Deserialize, Serialize};

use crate::geometry::clamp_zoom;
use crate::model::{Sequence, TimeSec};

/// Times closer than this are considered the same edge when excluding.
const EXCLUDE_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SnapKind {
    Playhead,
    ClipStart,
    ClipEnd,
    Marker,
    Grid,
}

impl SnapKind {
    pub fn label(&self) -> &'static str {
        match self {
            SnapKind::Playhead => "Playhead",
            SnapKind::ClipStart => "Clip start",
            SnapKind::ClipEnd => "Clip end",
            SnapKind::Marker => "Marker",
            SnapKind::Grid => "Grid",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            SnapKind::Playhead => "#ef4444",
            SnapKind::ClipStart | SnapKind::ClipEnd => "#3b82f6",
            SnapKind::Marker => "#f97316",
            SnapKind::Grid => "#71717a",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapPoint {
    pub time: TimeSec,
    pub kind: SnapKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl SnapPoint {
    pub fn new(time: TimeSec, kind: SnapKind) -> Self { Self { time, kind, label: None } }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or_else(|| self.kind.label())
    }
}

/// Nearest point within `threshold_px` of `candidate`; the first point at the
/// minimal distance wins.
pub fn find_snap_point<'a>(candidate: TimeSec, points: &'a [SnapPoint], threshold_px: f64, zoom: f64) -> Option<&'a SnapPoint> {
    let threshold = threshold_px / clamp_zoom(zoom);
    let mut best: Option<(&SnapPoint, f64)> = None;
    for p in points {
        let dist = (p.time - candidate).abs();
        if dist > threshold { continue; }
        match best {
            Some((_, d)) if dist >= d => {}
            _ => best = Some((p, dist)),
        }
    }
    best.map(|(p, _)| p)
}

/// What to gather snap candidates from.
#[derive(Debug, Clone, Default)]
pub struct SnapSources {
    pub playhead: bool,
    pub clip_edges: bool,
    pub markers: bool,
    /// Grid spacing in seconds.
    pub grid_interval: Option<TimeSec>,
    /// Grid lines are only generated inside this range.
    pub visible_range: Option<(TimeSec, TimeSec)>,
    pub exclude_clip_ids: Vec<String>,
    pub exclude_times: Vec<TimeSec>,
}

impl SnapSources {
    pub fn all() -> Self {
        Self { playhead: true, clip_edges: true, markers: true, ..Default::default() }
    }

    pub fn excluding_clip(mut self, clip_id: impl Into<String>) -> Self {
        self.exclude_clip_ids.push(clip_id.into());
        self
    }

    pub fn excluding_times(mut self, times: impl IntoIterator<Item = TimeSec>) -> Self {
        self.exclude_times.extend(times);
        self
    }

    pub fn with_grid(mut self, interval: TimeSec, range: (TimeSec, TimeSec)) -> Self {
        self.grid_interval = Some(interval);
        self.visible_range = Some(range);
        self
    }
}

/// Maximum grid lines generated for one interaction.
const MAX_GRID_POINTS: usize = 10_000;

pub fn collect_snap_points(seq: &Sequence, playhead: TimeSec, sources: &SnapSources) -> Vec<SnapPoint> {
    let mut points = Vec::new();
    if sources.playhead {
        points.push(SnapPoint::new(playhead, SnapKind::Playhead));
    }
    if sources.clip_edges {
        for clip in seq.clips() {
            if sources.exclude_clip_ids.iter().any(|id| *id == clip.id) { continue; }
            points.push(SnapPoint::new(clip.timeline_in(), SnapKind::ClipStart));
            points.push(SnapPoint::new(clip.timeline_end(), SnapKind::ClipEnd));
        }
    }
    if sources.markers {
        for marker in &seq.markers {
            points.push(SnapPoint { time: marker.time_sec, kind: SnapKind::Marker, label: Some(marker.label.clone()) });
        }
    }
    if let (Some(interval), Some((start, end))) = (sources.grid_interval, sources.visible_range) {
        if interval > 0.0 && interval.is_finite() && end >= start {
            let first = (start.max(0.0) / interval).ceil() as u64;
            points.extend(
                (first..)
                    .map(|n| n as f64 * interval)
                    .take_while(|t| *t <= end)
                    .take(MAX_GRID_POINTS)
                    .map(|t| SnapPoint::new(t, SnapKind::Grid)),
            );
        }
    }
    if !sources.exclude_times.is_empty() {
        points.retain(|p| !sources.exclude_times.iter().any(|t| (p.time - t).abs() < EXCLUDE_EPSILON));
    }
    points
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapConfig {
    pub enabled: bool,
    pub threshold_px: f64,
}

impl Default for SnapConfig {
    fn default() -> Self { Self { enabled: true, threshold_px: 10.0 } }
}

impl SnapConfig {
    /// Returns the snapped time (or the candidate itself) and the point hit.
    pub fn snap(&self, candidate: TimeSec, points: &[SnapPoint], zoom: f64) -> (TimeSec, Option<SnapPoint>) {
        if !self.enabled { return (candidate, None); }
        match find_snap_point(candidate, points, self.threshold_px, zoom) {
            Some(p) => (p.time, Some(p.clone())),
            None => (candidate, None),
        }
    }

    /// Snaps a span of fixed `length` starting at `start`: its start edge is
    /// tried first, then its end edge. Returns the new start.
    pub fn snap_span(&self, start: TimeSec, length: TimeSec, points: &[SnapPoint], zoom: f64) -> (TimeSec, Option<SnapPoint>) {
        if !self.enabled { return (start, None); }
        if let Some(p) = find_snap_point(start, points, self.threshold_px, zoom) {
            return (p.time, Some(p.clone()));
        }
        if let Some(p) = find_snap_point(start + length, points, self.threshold_px, zoom) {
            return (p.time - length, Some(p.clone()));
        }
        (start, None)
    }
}
