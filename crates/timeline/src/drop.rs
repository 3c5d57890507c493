//! Dropping library assets onto the timeline.

use serde::Deserialize;
use thiserror::Error;

use crate::geometry::{clamp_zoom, TimelineGeometry, TrackRows};
use crate::model::{AssetKind, Sequence, TimeSec, TrackKind};
use crate::ops::{AssetDropRequest, TimelineOps};

/// Drag payload written by the asset library.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DropPayload {
    pub id: String,
    #[serde(default)]
    pub kind: Option<String>,
}

impl DropPayload {
    /// Reads the `application/json` data first, then the plain-text fallback.
    pub fn parse(json: Option<&str>, text: Option<&str>) -> Option<Self> {
        [json, text]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .find_map(|s| serde_json::from_str::<DropPayload>(s).ok())
            .filter(|p| !p.id.trim().is_empty())
    }

    /// `None` when the payload carries no kind or an unknown one.
    pub fn asset_kind(&self) -> Option<AssetKind> {
        self.kind.as_deref().and_then(AssetKind::parse)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DropRejection {
    #[error("payload missing or malformed")]
    MalformedPayload,
    #[error("no track under the pointer")]
    NoTrack,
    #[error("track {0} is locked")]
    TrackLocked(String),
    #[error("{asset:?} asset not accepted by {track:?} track")]
    Incompatible { track: TrackKind, asset: AssetKind },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropTarget {
    pub track_index: usize,
    pub timeline_position: TimeSec,
}

/// `max(0, (clientX - containerLeft - headerWidth + scrollX) / zoom)`.
pub fn drop_position(client_x: f64, container_left: f64, geometry: &TimelineGeometry) -> TimeSec {
    let t = (client_x - container_left - geometry.header_width + geometry.scroll_x) / clamp_zoom(geometry.zoom);
    if t.is_finite() { t.max(0.0) } else { 0.0 }
}

pub fn resolve_drop(client_x: f64, client_y: f64, container_left: f64, geometry: &TimelineGeometry, rows: &TrackRows) -> Option<DropTarget> {
    let track_index = rows.row_at(client_y)?;
    Some(DropTarget { track_index, timeline_position: drop_position(client_x, container_left, geometry) })
}

/// What a drop needs from the current frame.
#[derive(Debug, Clone, Copy)]
pub struct DropContext<'a> {
    pub sequence: &'a Sequence,
    pub geometry: &'a TimelineGeometry,
    pub rows: &'a TrackRows,
    pub container_left: f64,
}

impl DropContext<'_> {
    /// Validates a drop without performing it; also drives drag-over highlighting.
    pub fn evaluate(&self, payload: &DropPayload, client_x: f64, client_y: f64) -> Result<AssetDropRequest, DropRejection> {
        let target = resolve_drop(client_x, client_y, self.container_left, self.geometry, self.rows).ok_or(DropRejection::NoTrack)?;
        let track = self.sequence.tracks.get(target.track_index).ok_or(DropRejection::NoTrack)?;
        if track.locked {
            return Err(DropRejection::TrackLocked(track.id.clone()));
        }
        if let Some(asset) = payload.asset_kind() {
            if !track.kind.accepts(asset) {
                return Err(DropRejection::Incompatible { track: track.kind, asset });
            }
        }
        Ok(AssetDropRequest {
            asset_id: payload.id.clone(),
            track_id: track.id.clone(),
            timeline_position: target.timeline_position,
        })
    }
}

/// Full drop handler: parse, validate, and call `on_asset_drop` exactly once on
/// success. Rejections have no effect beyond a debug log line.
pub fn handle_asset_drop(
    json: Option<&str>,
    text: Option<&str>,
    client_x: f64,
    client_y: f64,
    ctx: &DropContext<'_>,
    ops: &mut dyn TimelineOps,
) -> Result<AssetDropRequest, DropRejection> {
    let result = DropPayload::parse(json, text)
        .ok_or(DropRejection::MalformedPayload)
        .and_then(|payload| ctx.evaluate(&payload, client_x, client_y));
    match &result {
        Ok(req) => {
            tracing::debug!(asset = %req.asset_id, track = %req.track_id, at = req.timeline_position, "asset dropped");
            ops.on_asset_drop(req.clone());
        }
        Err(reason) => tracing::debug!(%reason, "asset drop ignored"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SequenceFormat, Track};
    use crate::ops::OpQueue;

    fn ctx_parts() -> (Sequence, TimelineGeometry, TrackRows) {
        let mut seq = Sequence::new("s", SequenceFormat::default());
        seq.add_track(Track::new("V1", TrackKind::Video).with_id("v1"));
        let mut locked = Track::new("V2", TrackKind::Video).with_id("v2");
        locked.locked = true;
        seq.add_track(locked);
        seq.add_track(Track::new("A1", TrackKind::Audio).with_id("a1"));
        (seq, TimelineGeometry::new(100.0, 0.0, 100.0, 1000.0), TrackRows::new(40.0, 50.0, 3))
    }

    #[test]
    fn payload_parsing() {
        assert_eq!(DropPayload::parse(Some(r#"{"id":"x"}"#), None).map(|p| p.id), Some("x".into()));
        assert_eq!(DropPayload::parse(Some("not json"), Some(r#"{"id":"y","kind":"audio"}"#)).map(|p| p.id), Some("y".into()));
        assert!(DropPayload::parse(Some(r#"{"id":"  "}"#), None).is_none());
        assert!(DropPayload::parse(Some(r#"{"name":"x"}"#), None).is_none());
        assert!(DropPayload::parse(None, None).is_none());
    }

    #[test]
    fn position_never_negative() {
        let geo = TimelineGeometry::new(100.0, 0.0, 100.0, 1000.0);
        assert_eq!(drop_position(150.0, 100.0, &geo), 0.0);
        let scrolled = TimelineGeometry::new(100.0, 250.0, 100.0, 1000.0);
        assert!((drop_position(300.0, 100.0, &scrolled) - 3.5).abs() < 1e-9);
    }

    #[test]
    fn rejections_do_not_call_ops() {
        let (seq, geo, rows) = ctx_parts();
        let ctx = DropContext { sequence: &seq, geometry: &geo, rows: &rows, container_left: 100.0 };
        let mut ops = OpQueue::default();

        let locked = handle_asset_drop(Some(r#"{"id":"a"}"#), None, 300.0, 100.0, &ctx, &mut ops);
        assert_eq!(locked, Err(DropRejection::TrackLocked("v2".into())));
        let outside = handle_asset_drop(Some(r#"{"id":"a"}"#), None, 300.0, 10.0, &ctx, &mut ops);
        assert_eq!(outside, Err(DropRejection::NoTrack));
        let bad = handle_asset_drop(Some("{"), None, 300.0, 50.0, &ctx, &mut ops);
        assert_eq!(bad, Err(DropRejection::MalformedPayload));
        let incompatible = handle_asset_drop(Some(r#"{"id":"a","kind":"image"}"#), None, 300.0, 150.0, &ctx, &mut ops);
        assert!(matches!(incompatible, Err(DropRejection::Incompatible { .. })));
        assert!(ops.ops.is_empty());
    }

    #[test]
    fn unknown_kind_is_not_validated() {
        let (seq, geo, rows) = ctx_parts();
        let ctx = DropContext { sequence: &seq, geometry: &geo, rows: &rows, container_left: 100.0 };
        let mut ops = OpQueue::default();
        let req = handle_asset_drop(Some(r#"{"id":"a","kind":"hologram"}"#), None, 300.0, 150.0, &ctx, &mut ops).unwrap();
        assert_eq!(req.track_id, "a1");
        assert_eq!(ops.ops.len(), 1);
    }
}
