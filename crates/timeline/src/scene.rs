//! Retained scene built from a store snapshot. The shell paints these
//! primitives as-is; nothing here knows about the UI toolkit.

use serde::Serialize;

use crate::drag::clip::ClipPreview;
use crate::geometry::{clip_region, ClipRegion, Rect, TimelineGeometry, TrackRows};
use crate::model::{Clip, Sequence, TimeSec, TrackKind};
use crate::selection::Selection;
use crate::snap::{SnapKind, SnapPoint};
use crate::virtualize::{thumbnail_tiles, VisibleWindow};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ScenePrimitive {
    TrackRow {
        track_id: String,
        index: usize,
        kind: TrackKind,
        name: String,
        rect: Rect,
        muted: bool,
        locked: bool,
        visible: bool,
        selected: bool,
    },
    ClipBox {
        clip_id: String,
        track_id: String,
        label: String,
        color: Option<String>,
        rect: Rect,
        region: ClipRegion,
        selected: bool,
        dragging: bool,
    },
    Thumbnail {
        clip_id: String,
        asset_id: String,
        rect: Rect,
        source_time: TimeSec,
    },
    MarkerPin {
        marker_id: String,
        x: f64,
        label: String,
        color: String,
    },
    CaptionPin {
        caption_id: String,
        rect: Rect,
        text: String,
    },
    Playhead { x: f64 },
    SnapGuide { x: f64, kind: SnapKind },
    Marquee { rect: Rect },
}

/// Transient drag state laid over the committed snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneOverlay {
    pub clip: Option<ClipOverlay>,
    pub snap: Option<SnapPoint>,
    pub marquee: Option<Rect>,
    /// Overrides the store playhead while scrubbing.
    pub playhead: Option<TimeSec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipOverlay {
    pub clip_id: String,
    pub track_index: usize,
    pub preview: ClipPreview,
}

#[derive(Debug, Clone, Copy)]
pub struct SceneInput<'a> {
    pub sequence: &'a Sequence,
    pub geometry: &'a TimelineGeometry,
    pub rows: &'a TrackRows,
    pub selection: &'a Selection,
    pub playhead: TimeSec,
    pub overlay: &'a SceneOverlay,
    pub ruler_height: f64,
    pub buffer_px: f64,
    /// `None` disables thumbnail tiles.
    pub tile_width: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimelineScene {
    pub primitives: Vec<ScenePrimitive>,
}

fn overlay_clip(clip: &Clip, preview: &ClipPreview) -> Clip {
    let mut c = clip.clone();
    c.place.timeline_in_sec = preview.timeline_in;
    c.range.source_in_sec = preview.source_in;
    c.range.source_out_sec = preview.source_out;
    c.place.duration_sec = c.duration();
    c
}

impl TimelineScene {
    pub fn build(input: &SceneInput<'_>) -> Self {
        let geo = input.geometry;
        let rows = input.rows;
        let window = VisibleWindow::from_geometry(geo, input.buffer_px);
        let right = geo.header_width + geo.viewport_width;
        let mut prims = Vec::new();

        for (index, track) in input.sequence.tracks.iter().enumerate() {
            prims.push(ScenePrimitive::TrackRow {
                track_id: track.id.clone(),
                index,
                kind: track.kind,
                name: track.name.clone(),
                rect: rows.row_rect(index, 0.0, right),
                muted: track.muted,
                locked: track.locked,
                visible: track.visible,
                selected: input.selection.tracks().iter().any(|t| *t == track.id),
            });
        }

        let dragged = input.overlay.clip.as_ref();
        for (index, track) in input.sequence.tracks.iter().enumerate() {
            if !track.visible { continue; }
            for clip in &track.clips {
                let (clip, row) = match dragged {
                    Some(o) if o.clip_id == clip.id => (overlay_clip(clip, &o.preview), o.track_index),
                    _ => (clip.clone(), index),
                };
                if !window.overlaps(clip.timeline_in(), clip.timeline_end()) { continue; }
                let (x, w) = geo.clip_span(&clip);
                let y0 = rows.row_top(row);
                let rect = Rect::new(x, y0, x + w, y0 + rows.track_height);
                let total = clip.asset_duration_sec.unwrap_or(clip.range.source_out_sec);
                prims.push(ScenePrimitive::ClipBox {
                    clip_id: clip.id.clone(),
                    track_id: track.id.clone(),
                    label: clip.display_label().to_string(),
                    color: clip.color.clone(),
                    rect,
                    region: clip_region(clip.range.source_in_sec, clip.range.source_out_sec, total),
                    selected: input.selection.is_clip_selected(&clip.id),
                    dragging: dragged.is_some_and(|o| o.clip_id == clip.id),
                });
                let wants_tiles = matches!(track.kind, TrackKind::Video | TrackKind::Overlay);
                if let (true, Some(tile_width)) = (wants_tiles, input.tile_width) {
                    for tile in thumbnail_tiles(&clip, geo, tile_width, &window) {
                        prims.push(ScenePrimitive::Thumbnail {
                            clip_id: clip.id.clone(),
                            asset_id: clip.asset_id.clone(),
                            rect: Rect::new(tile.x, y0, tile.x + tile.width, y0 + rows.track_height),
                            source_time: tile.source_time,
                        });
                    }
                }
            }
        }

        let ruler_top = rows.top - input.ruler_height;
        for cap in input.sequence.captions.iter().filter(|c| window.overlaps(c.start_sec, c.end_sec)) {
            let x0 = geo.time_to_pixel(cap.start_sec);
            let x1 = geo.time_to_pixel(cap.end_sec);
            prims.push(ScenePrimitive::CaptionPin {
                caption_id: cap.id.clone(),
                rect: Rect::new(x0, ruler_top + input.ruler_height / 2.0, x1, rows.top),
                text: cap.text.clone(),
            });
        }
        for marker in input.sequence.markers.iter().filter(|m| window.overlaps(m.time_sec, m.time_sec)) {
            prims.push(ScenePrimitive::MarkerPin {
                marker_id: marker.id.clone(),
                x: geo.time_to_pixel(marker.time_sec),
                label: marker.label.clone(),
                color: marker.color.clone(),
            });
        }

        if let Some(snap) = &input.overlay.snap {
            prims.push(ScenePrimitive::SnapGuide { x: geo.time_to_pixel(snap.time), kind: snap.kind });
        }
        if let Some(rect) = input.overlay.marquee {
            prims.push(ScenePrimitive::Marquee { rect });
        }
        let playhead = input.overlay.playhead.unwrap_or(input.playhead);
        prims.push(ScenePrimitive::Playhead { x: geo.time_to_pixel(playhead) });

        Self { primitives: prims }
    }

    pub fn clip_boxes(&self) -> impl Iterator<Item = (&str, &Rect)> {
        self.primitives.iter().filter_map(|p| match p {
            ScenePrimitive::ClipBox { clip_id, rect, .. } => Some((clip_id.as_str(), rect)),
            _ => None,
        })
    }

    /// Topmost clip box under a point.
    pub fn clip_at(&self, x: f64, y: f64) -> Option<&str> {
        self.clip_boxes().filter(|(_, r)| r.contains(x, y)).last().map(|(id, _)| id)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct SceneKey {
    revision: u64,
    geometry: TimelineGeometry,
    rows: TrackRows,
    selection: Selection,
    overlay: SceneOverlay,
    playhead: TimeSec,
}

/// Rebuilds the scene only when one of its inputs changed.
#[derive(Debug, Default)]
pub struct SceneCache {
    key: Option<SceneKey>,
    scene: TimelineScene,
    builds: u64,
}

impl SceneCache {
    pub fn new() -> Self { Self::default() }

    pub fn get_or_build(&mut self, revision: u64, input: &SceneInput<'_>) -> &TimelineScene {
        let key = SceneKey {
            revision,
            geometry: *input.geometry,
            rows: *input.rows,
            selection: input.selection.clone(),
            overlay: input.overlay.clone(),
            playhead: input.playhead,
        };
        if self.key.as_ref() != Some(&key) {
            self.scene = TimelineScene::build(input);
            self.key = Some(key);
            self.builds += 1;
        }
        &self.scene
    }

    pub fn invalidate(&mut self) { self.key = None; }

    /// How many times the scene was rebuilt.
    pub fn builds(&self) -> u64 { self.builds }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Marker, SequenceFormat, Track};

    fn sequence() -> Sequence {
        let mut seq = Sequence::new("s", SequenceFormat::default());
        let mut v1 = Track::new("V1", TrackKind::Video).with_id("v1");
        v1.add_clip(Clip::new("a", 0.0, 2.0).with_id("near").place_at(1.0));
        v1.add_clip(Clip::new("b", 0.0, 2.0).with_id("far").place_at(500.0));
        seq.add_track(v1);
        seq.markers.push(Marker::new(3.0, "m"));
        seq
    }

    fn count_clips(scene: &TimelineScene) -> usize { scene.clip_boxes().count() }

    #[test]
    fn only_visible_clips_are_built() {
        let seq = sequence();
        let geo = TimelineGeometry::new(100.0, 0.0, 100.0, 1000.0);
        let rows = TrackRows::new(30.0, 50.0, 1);
        let sel = Selection::from_clips(["near"]);
        let overlay = SceneOverlay::default();
        let input = SceneInput { sequence: &seq, geometry: &geo, rows: &rows, selection: &sel, playhead: 0.0, overlay: &overlay, ruler_height: 30.0, buffer_px: 100.0, tile_width: None };
        let scene = TimelineScene::build(&input);
        assert_eq!(count_clips(&scene), 1);
        assert_eq!(scene.clip_at(250.0, 40.0), Some("near"));
        assert!(scene.primitives.iter().any(|p| matches!(p, ScenePrimitive::MarkerPin { .. })));
        assert!(scene.primitives.iter().any(|p| matches!(p, ScenePrimitive::ClipBox { selected: true, .. })));
    }

    #[test]
    fn overlay_moves_dragged_clip() {
        let seq = sequence();
        let geo = TimelineGeometry::new(100.0, 0.0, 100.0, 1000.0);
        let rows = TrackRows::new(30.0, 50.0, 1);
        let sel = Selection::new();
        let overlay = SceneOverlay {
            clip: Some(ClipOverlay {
                clip_id: "near".into(),
                track_index: 0,
                preview: ClipPreview { timeline_in: 4.0, source_in: 0.0, source_out: 2.0, speed: 1.0 },
            }),
            snap: Some(SnapPoint::new(4.0, SnapKind::Marker)),
            ..Default::default()
        };
        let input = SceneInput { sequence: &seq, geometry: &geo, rows: &rows, selection: &sel, playhead: 0.0, overlay: &overlay, ruler_height: 30.0, buffer_px: 0.0, tile_width: Some(50.0) };
        let scene = TimelineScene::build(&input);
        let rect = scene.clip_boxes().find(|(id, _)| *id == "near").map(|(_, r)| *r).unwrap();
        assert_eq!(rect.x0, 500.0);
        assert!(scene.primitives.iter().any(|p| matches!(p, ScenePrimitive::SnapGuide { x, .. } if *x == 500.0)));
        let tiles = scene.primitives.iter().filter(|p| matches!(p, ScenePrimitive::Thumbnail { .. })).count();
        assert_eq!(tiles, 4);
    }

    #[test]
    fn cache_rebuilds_only_on_change() {
        let seq = sequence();
        let mut geo = TimelineGeometry::new(100.0, 0.0, 100.0, 1000.0);
        let rows = TrackRows::new(30.0, 50.0, 1);
        let sel = Selection::new();
        let overlay = SceneOverlay::default();
        let mut cache = SceneCache::new();
        for _ in 0..3 {
            let input = SceneInput { sequence: &seq, geometry: &geo, rows: &rows, selection: &sel, playhead: 0.0, overlay: &overlay, ruler_height: 30.0, buffer_px: 0.0, tile_width: None };
            cache.get_or_build(7, &input);
        }
        assert_eq!(cache.builds(), 1);
        geo.scroll_x = 10.0;
        let input = SceneInput { sequence: &seq, geometry: &geo, rows: &rows, selection: &sel, playhead: 0.0, overlay: &overlay, ruler_height: 30.0, buffer_px: 0.0, tile_width: None };
        cache.get_or_build(7, &input);
        cache.get_or_build(8, &input);
        assert_eq!(cache.builds(), 3);
    }

    #[test]
    fn hidden_tracks_keep_their_row_but_draw_no_clips() {
        let mut seq = sequence();
        seq.tracks[0].visible = false;
        let geo = TimelineGeometry::new(100.0, 0.0, 100.0, 1000.0);
        let rows = TrackRows::new(30.0, 50.0, 1);
        let sel = Selection::new();
        let overlay = SceneOverlay::default();
        let input = SceneInput { sequence: &seq, geometry: &geo, rows: &rows, selection: &sel, playhead: 0.0, overlay: &overlay, ruler_height: 30.0, buffer_px: 0.0, tile_width: Some(50.0) };
        let scene = TimelineScene::build(&input);
        assert_eq!(count_clips(&scene), 0);
        assert!(!scene.primitives.iter().any(|p| matches!(p, ScenePrimitive::Thumbnail { .. })));
        assert!(scene.primitives.iter().any(|p| matches!(p, ScenePrimitive::TrackRow { visible: false, .. })));
        assert_eq!(scene.clip_at(250.0, 40.0), None);
    }
}
