//! Change requests emitted by the interaction layer. The store owner
//! implements [`TimelineOps`] and applies them; nothing here mutates state.

use serde::{Deserialize, Serialize};

use crate::model::{Clip, TimeSec};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipMoveRequest {
    pub clip_id: String,
    pub from_track_id: String,
    pub to_track_id: String,
    pub timeline_in_sec: TimeSec,
}

/// Only the fields that changed are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipTrimRequest {
    pub clip_id: String,
    pub track_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_source_in: Option<TimeSec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_source_out: Option<TimeSec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_timeline_in: Option<TimeSec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipSplitRequest {
    pub clip_id: String,
    pub track_id: String,
    pub split_time_sec: TimeSec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDropRequest {
    pub asset_id: String,
    pub track_id: String,
    pub timeline_position: TimeSec,
}

/// Only the fields that changed are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSettingsChange {
    pub clip_id: String,
    pub track_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_db: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fade_in_sec: Option<TimeSec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fade_out_sec: Option<TimeSec>,
}

impl AudioSettingsChange {
    pub fn is_empty(&self) -> bool {
        self.volume_db.is_none() && self.fade_in_sec.is_none() && self.fade_out_sec.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackToggle {
    pub track_id: String,
    pub value: bool,
}

/// Fire-and-forget operation callbacks; failures are the implementor's to report.
pub trait TimelineOps {
    fn on_clip_move(&mut self, _req: ClipMoveRequest) {}
    fn on_clip_trim(&mut self, _req: ClipTrimRequest) {}
    fn on_clip_split(&mut self, _req: ClipSplitRequest) {}
    fn on_asset_drop(&mut self, _req: AssetDropRequest) {}
    fn on_track_mute_toggle(&mut self, _req: TrackToggle) {}
    fn on_track_lock_toggle(&mut self, _req: TrackToggle) {}
    fn on_track_visibility_toggle(&mut self, _req: TrackToggle) {}
    fn on_audio_settings_change(&mut self, _req: AudioSettingsChange) {}
}

/// Split request for `clip` at `time`, only when `time` is strictly inside it.
pub fn split_request(track_id: &str, clip: &Clip, time: TimeSec) -> Option<ClipSplitRequest> {
    if time <= clip.timeline_in() || time >= clip.timeline_end() {
        return None;
    }
    Some(ClipSplitRequest { clip_id: clip.id.clone(), track_id: track_id.to_string(), split_time_sec: time })
}

/// Every operation as one enum; handy for queuing requests between frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum TimelineOp {
    ClipMove(ClipMoveRequest),
    ClipTrim(ClipTrimRequest),
    ClipSplit(ClipSplitRequest),
    AssetDrop(AssetDropRequest),
    TrackMute(TrackToggle),
    TrackLock(TrackToggle),
    TrackVisibility(TrackToggle),
    AudioSettings(AudioSettingsChange),
}

/// Collects requests instead of applying them.
#[derive(Debug, Default, Clone)]
pub struct OpQueue {
    pub ops: Vec<TimelineOp>,
}

impl OpQueue {
    pub fn drain(&mut self) -> std::vec::Drain<'_, TimelineOp> {
        self.ops.drain(..)
    }
}

impl TimelineOps for OpQueue {
    fn on_clip_move(&mut self, req: ClipMoveRequest) { self.ops.push(TimelineOp::ClipMove(req)); }
    fn on_clip_trim(&mut self, req: ClipTrimRequest) { self.ops.push(TimelineOp::ClipTrim(req)); }
    fn on_clip_split(&mut self, req: ClipSplitRequest) { self.ops.push(TimelineOp::ClipSplit(req)); }
    fn on_asset_drop(&mut self, req: AssetDropRequest) { self.ops.push(TimelineOp::AssetDrop(req)); }
    fn on_track_mute_toggle(&mut self, req: TrackToggle) { self.ops.push(TimelineOp::TrackMute(req)); }
    fn on_track_lock_toggle(&mut self, req: TrackToggle) { self.ops.push(TimelineOp::TrackLock(req)); }
    fn on_track_visibility_toggle(&mut self, req: TrackToggle) { self.ops.push(TimelineOp::TrackVisibility(req)); }
    fn on_audio_settings_change(&mut self, req: AudioSettingsChange) { self.ops.push(TimelineOp::AudioSettings(req)); }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_only_inside_clip() {
        let clip = Clip::new("a", 0.0, 4.0).with_id("c1").place_at(2.0);
        assert!(split_request("t1", &clip, 2.0).is_none());
        assert!(split_request("t1", &clip, 6.0).is_none());
        let req = split_request("t1", &clip, 3.5).unwrap();
        assert_eq!(req.split_time_sec, 3.5);
        assert_eq!(req.clip_id, "c1");
    }

    #[test]
    fn trim_request_omits_unchanged_fields() {
        let req = ClipTrimRequest { clip_id: "c".into(), track_id: "t".into(), new_source_out: Some(3.0), ..Default::default() };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("newSourceIn").is_none());
        assert_eq!(json["newSourceOut"], 3.0);
    }

    #[test]
    fn queue_records_in_order() {
        let mut q = OpQueue::default();
        q.on_track_mute_toggle(TrackToggle { track_id: "t".into(), value: true });
        q.on_asset_drop(AssetDropRequest { asset_id: "a".into(), track_id: "t".into(), timeline_position: 1.0 });
        let ops: Vec<_> = q.drain().collect();
        assert!(matches!(ops[0], TimelineOp::TrackMute(_)));
        assert!(matches!(ops[1], TimelineOp::AssetDrop(_)));
        assert!(q.ops.is_empty());
    }
}
