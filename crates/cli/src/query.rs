use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use timeline::drop::{handle_asset_drop, DropContext};
use timeline::ops::OpQueue;
use timeline::snap::{collect_snap_points, SnapSources};
use timeline::virtualize::{visible_items, VisibleWindow};
use timeline::{clip_region, Sequence, TimelineConfig, TimelineGeometry, TrackRows};

pub fn visible(seq: &Sequence, config: &TimelineConfig, scroll_x: f64, width: f64, zoom: f64) -> Value {
    let geometry = TimelineGeometry::new(zoom, scroll_x, config.header_width, width);
    let window = VisibleWindow::from_geometry(&geometry, config.buffer_px);
    let tracks: Vec<Value> = seq
        .tracks
        .iter()
        .map(|t| {
            let ids: Vec<&str> = visible_items(&t.clips, &window).map(|c| c.id.as_str()).collect();
            json!({ "trackId": t.id, "clipIds": ids })
        })
        .collect();
    let markers: Vec<&str> = visible_items(&seq.markers, &window).map(|m| m.id.as_str()).collect();
    let captions: Vec<&str> = visible_items(&seq.captions, &window).map(|c| c.id.as_str()).collect();
    json!({ "window": window, "tracks": tracks, "markers": markers, "captions": captions })
}

pub fn snap(
    seq: &Sequence,
    config: &TimelineConfig,
    time: f64,
    zoom: f64,
    playhead: f64,
    exclude_clip: Option<&str>,
) -> Value {
    let mut sources = SnapSources::all();
    if let Some(id) = exclude_clip {
        sources = sources.excluding_clip(id);
    }
    let points = collect_snap_points(seq, playhead, &sources);
    let (snapped, point) = config.snap_config().snap(time, &points, zoom);
    json!({ "candidate": time, "time": snapped, "point": point })
}

pub fn region(seq: &Sequence, clip_id: &str) -> Result<Value> {
    let (track, clip) = seq.find_clip(clip_id).ok_or_else(|| anyhow!("clip {clip_id} not found"))?;
    let total = clip.asset_duration_sec.unwrap_or(clip.range.source_out_sec);
    let region = clip_region(clip.range.source_in_sec, clip.range.source_out_sec, total);
    Ok(json!({ "clipId": clip.id, "trackId": track.id, "region": region, "scale": region.scale_factor() }))
}

/// Host-side layout needed to turn client coordinates into a drop target.
pub struct DropView {
    pub container_left: f64,
    pub container_top: f64,
    pub scroll_x: f64,
    pub zoom: f64,
}

pub fn drop(seq: &Sequence, config: &TimelineConfig, view: &DropView, payload: &str, client_x: f64, client_y: f64) -> Value {
    let geometry = TimelineGeometry::new(view.zoom, view.scroll_x, config.header_width, 0.0);
    let rows = TrackRows::new(view.container_top + config.ruler_height, config.track_height, seq.tracks.len());
    let ctx = DropContext { sequence: seq, geometry: &geometry, rows: &rows, container_left: view.container_left };
    let mut ops = OpQueue::default();
    match handle_asset_drop(Some(payload), None, client_x, client_y, &ctx, &mut ops) {
        Ok(req) => json!({ "accepted": true, "request": req, "ops": ops.ops }),
        Err(reason) => json!({ "accepted": false, "reason": reason.to_string() }),
    }
}
