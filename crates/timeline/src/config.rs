use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::geometry::clamp_zoom;
use crate::snap::SnapConfig;
use crate::TimelineError;

/// Layout and interaction tunables. Every field has a default so partial
/// files load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimelineConfig {
    pub track_height: f64,
    pub header_width: f64,
    pub ruler_height: f64,
    pub snap_enabled: bool,
    pub snap_threshold_px: f64,
    /// Extra pixels rendered on each side of the viewport.
    pub buffer_px: f64,
    pub thumbnail_tile_width: f64,
    pub flush_rate_hz: f64,
    pub default_zoom: f64,
    pub max_in_flight: usize,
    pub edge_handle_px: f64,
    pub auto_scroll_zone_px: f64,
    pub auto_scroll_max_px: f64,
    pub quantize_to_frames: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            track_height: 56.0,
            header_width: 160.0,
            ruler_height: 28.0,
            snap_enabled: true,
            snap_threshold_px: 10.0,
            buffer_px: 200.0,
            thumbnail_tile_width: 96.0,
            flush_rate_hz: 60.0,
            default_zoom: 100.0,
            max_in_flight: 4,
            edge_handle_px: 6.0,
            auto_scroll_zone_px: 40.0,
            auto_scroll_max_px: 24.0,
            quantize_to_frames: false,
        }
    }
}

impl TimelineConfig {
    pub fn from_json_str(s: &str) -> Result<Self, TimelineError> {
        let cfg: TimelineConfig = serde_json::from_str(s)?;
        Ok(cfg.normalized())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TimelineError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Replaces out-of-range values with their defaults.
    pub fn normalized(mut self) -> Self {
        let d = Self::default();
        fn positive(v: f64, fallback: f64) -> f64 {
            if v.is_finite() && v > 0.0 { v } else { fallback }
        }
        fn non_negative(v: f64, fallback: f64) -> f64 {
            if v.is_finite() && v >= 0.0 { v } else { fallback }
        }
        self.track_height = positive(self.track_height, d.track_height);
        self.header_width = non_negative(self.header_width, d.header_width);
        self.ruler_height = non_negative(self.ruler_height, d.ruler_height);
        self.snap_threshold_px = non_negative(self.snap_threshold_px, d.snap_threshold_px);
        self.buffer_px = non_negative(self.buffer_px, d.buffer_px);
        self.thumbnail_tile_width = positive(self.thumbnail_tile_width, d.thumbnail_tile_width);
        self.flush_rate_hz = positive(self.flush_rate_hz, d.flush_rate_hz);
        self.default_zoom = clamp_zoom(positive(self.default_zoom, d.default_zoom));
        self.max_in_flight = self.max_in_flight.max(1);
        self.edge_handle_px = non_negative(self.edge_handle_px, d.edge_handle_px);
        self.auto_scroll_zone_px = non_negative(self.auto_scroll_zone_px, d.auto_scroll_zone_px);
        self.auto_scroll_max_px = non_negative(self.auto_scroll_max_px, d.auto_scroll_max_px);
        self
    }

    pub fn snap_config(&self) -> SnapConfig {
        SnapConfig { enabled: self.snap_enabled, threshold_px: self.snap_threshold_px }
    }
}
