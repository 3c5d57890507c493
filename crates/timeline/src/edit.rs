//! Applies committed operations to a [`Sequence`]. This is the store owner's
//! side of [`TimelineOps`](crate::ops::TimelineOps); the interaction layer
//! never calls it directly.

use crate::model::{new_id, Clip, Sequence, TimeSec, Track, MAX_VOLUME_DB, MIN_VOLUME_DB};
use crate::ops::{
    AssetDropRequest, AudioSettingsChange, ClipMoveRequest, ClipSplitRequest, ClipTrimRequest, TimelineOp, TimelineOps,
};
use crate::store::MemoryStore;
use crate::TimelineError;

/// Length given to dropped assets whose duration the timeline cannot know.
pub const DEFAULT_DROP_DURATION_SEC: TimeSec = 5.0;

fn track_mut<'a>(seq: &'a mut Sequence, track_id: &str) -> Result<&'a mut Track, TimelineError> {
    seq.tracks
        .iter_mut()
        .find(|t| t.id == track_id)
        .ok_or_else(|| TimelineError::TrackNotFound(track_id.to_string()))
}

fn clip_index(track: &Track, clip_id: &str) -> Result<usize, TimelineError> {
    track
        .clips
        .iter()
        .position(|c| c.id == clip_id)
        .ok_or_else(|| TimelineError::ClipNotFound(clip_id.to_string()))
}

fn unlocked<'a>(seq: &'a mut Sequence, track_id: &str) -> Result<&'a mut Track, TimelineError> {
    let track = track_mut(seq, track_id)?;
    if track.locked {
        return Err(TimelineError::TrackLocked(track_id.to_string()));
    }
    Ok(track)
}

pub fn apply_move(seq: &mut Sequence, req: &ClipMoveRequest) -> Result<(), TimelineError> {
    if !req.timeline_in_sec.is_finite() {
        return Err(TimelineError::InvalidOp(format!("non-finite position for {}", req.clip_id)));
    }
    unlocked(seq, &req.to_track_id)?;
    let from = unlocked(seq, &req.from_track_id)?;
    let idx = clip_index(from, &req.clip_id)?;
    let mut clip = from.clips.remove(idx);
    clip.place.timeline_in_sec = req.timeline_in_sec.max(0.0);
    track_mut(seq, &req.to_track_id)?.clips.push(clip);
    Ok(())
}

pub fn apply_trim(seq: &mut Sequence, req: &ClipTrimRequest) -> Result<(), TimelineError> {
    let track = unlocked(seq, &req.track_id)?;
    let idx = clip_index(track, &req.clip_id)?;
    let clip = &mut track.clips[idx];
    let mut range = clip.range;
    if let Some(v) = req.new_source_in { range.source_in_sec = v.max(0.0); }
    if let Some(v) = req.new_source_out { range.source_out_sec = v; }
    if !range.is_valid() {
        return Err(TimelineError::InvalidOp(format!("trim would empty clip {}", req.clip_id)));
    }
    clip.range = range;
    if let Some(v) = req.new_timeline_in { clip.place.timeline_in_sec = v.max(0.0); }
    clip.place.duration_sec = clip.duration();
    Ok(())
}

/// Cuts a clip in two at a timeline time; the right half gets a fresh id.
pub fn apply_split(seq: &mut Sequence, req: &ClipSplitRequest) -> Result<String, TimelineError> {
    let track = unlocked(seq, &req.track_id)?;
    let idx = clip_index(track, &req.clip_id)?;
    let clip = &mut track.clips[idx];
    let t = req.split_time_sec;
    if t <= clip.timeline_in() || t >= clip.timeline_end() {
        return Err(TimelineError::InvalidOp(format!("split time {t} outside clip {}", req.clip_id)));
    }
    let cut = clip.range.source_in_sec + (t - clip.timeline_in()) * clip.effective_speed();
    let mut right = clip.clone();
    right.id = new_id();
    right.range.source_in_sec = cut;
    right.place.timeline_in_sec = t;
    right.place.duration_sec = right.duration();
    right.audio.fade_in_sec = 0.0;
    clip.range.source_out_sec = cut;
    clip.place.duration_sec = clip.duration();
    clip.audio.fade_out_sec = 0.0;
    let right_id = right.id.clone();
    track.clips.insert(idx + 1, right);
    Ok(right_id)
}

pub fn apply_drop(seq: &mut Sequence, req: &AssetDropRequest) -> Result<String, TimelineError> {
    let track = unlocked(seq, &req.track_id)?;
    let clip = Clip::new(req.asset_id.clone(), 0.0, DEFAULT_DROP_DURATION_SEC).place_at(req.timeline_position.max(0.0));
    let id = clip.id.clone();
    track.add_clip(clip);
    Ok(id)
}

pub fn apply_audio(seq: &mut Sequence, req: &AudioSettingsChange) -> Result<(), TimelineError> {
    let track = unlocked(seq, &req.track_id)?;
    let idx = clip_index(track, &req.clip_id)?;
    let clip = &mut track.clips[idx];
    let dur = clip.duration().max(0.0);
    let audio = &mut clip.audio;
    if let Some(db) = req.volume_db { audio.volume_db = db.clamp(MIN_VOLUME_DB, MAX_VOLUME_DB); }
    if let Some(v) = req.fade_in_sec { audio.fade_in_sec = v.clamp(0.0, dur); }
    if let Some(v) = req.fade_out_sec { audio.fade_out_sec = v.clamp(0.0, dur); }
    if audio.fade_in_sec + audio.fade_out_sec > dur {
        audio.fade_out_sec = (dur - audio.fade_in_sec).max(0.0);
    }
    Ok(())
}

pub fn apply_op(seq: &mut Sequence, op: &TimelineOp) -> Result<(), TimelineError> {
    match op {
        TimelineOp::ClipMove(req) => apply_move(seq, req),
        TimelineOp::ClipTrim(req) => apply_trim(seq, req),
        TimelineOp::ClipSplit(req) => apply_split(seq, req).map(|_| ()),
        TimelineOp::AssetDrop(req) => apply_drop(seq, req).map(|_| ()),
        TimelineOp::AudioSettings(req) => apply_audio(seq, req),
        // flag toggles ignore the lock
        TimelineOp::TrackMute(t) => track_mut(seq, &t.track_id).map(|tr| tr.muted = t.value),
        TimelineOp::TrackLock(t) => track_mut(seq, &t.track_id).map(|tr| tr.locked = t.value),
        TimelineOp::TrackVisibility(t) => track_mut(seq, &t.track_id).map(|tr| tr.visible = t.value),
    }
}

/// Applies every request straight to a shared store, logging failures.
pub struct StoreEditor<'a> {
    store: &'a MemoryStore<Sequence>,
}

impl<'a> StoreEditor<'a> {
    pub fn new(store: &'a MemoryStore<Sequence>) -> Self { Self { store } }

    pub fn apply(&self, op: TimelineOp) -> Result<(), TimelineError> {
        let result = self.store.update(|seq| apply_op(seq, &op));
        if let Err(e) = &result {
            tracing::warn!(error = %e, ?op, "timeline edit rejected");
        }
        result
    }
}

impl TimelineOps for StoreEditor<'_> {
    fn on_clip_move(&mut self, req: ClipMoveRequest) { let _ = self.apply(TimelineOp::ClipMove(req)); }
    fn on_clip_trim(&mut self, req: ClipTrimRequest) { let _ = self.apply(TimelineOp::ClipTrim(req)); }
    fn on_clip_split(&mut self, req: ClipSplitRequest) { let _ = self.apply(TimelineOp::ClipSplit(req)); }
    fn on_asset_drop(&mut self, req: AssetDropRequest) { let _ = self.apply(TimelineOp::AssetDrop(req)); }
    fn on_track_mute_toggle(&mut self, req: crate::ops::TrackToggle) { let _ = self.apply(TimelineOp::TrackMute(req)); }
    fn on_track_lock_toggle(&mut self, req: crate::ops::TrackToggle) { let _ = self.apply(TimelineOp::TrackLock(req)); }
    fn on_track_visibility_toggle(&mut self, req: crate::ops::TrackToggle) { let _ = self.apply(TimelineOp::TrackVisibility(req)); }
    fn on_audio_settings_change(&mut self, req: AudioSettingsChange) { let _ = self.apply(TimelineOp::AudioSettings(req)); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SequenceFormat, TrackKind};
    use crate::ops::TrackToggle;
    use crate::store::Store;

    fn seq() -> Sequence {
        let mut s = Sequence::new("s", SequenceFormat::default());
        let mut v1 = Track::new("V1", TrackKind::Video).with_id("v1");
        v1.add_clip(Clip::new("a", 2.0, 6.0).with_id("c1").place_at(1.0));
        s.add_track(v1);
        s.add_track(Track::new("V2", TrackKind::Video).with_id("v2"));
        s
    }

    #[test]
    fn move_across_tracks() {
        let mut s = seq();
        apply_move(&mut s, &ClipMoveRequest { clip_id: "c1".into(), from_track_id: "v1".into(), to_track_id: "v2".into(), timeline_in_sec: 3.0 }).unwrap();
        assert!(s.tracks[0].clips.is_empty());
        assert_eq!(s.tracks[1].clips[0].timeline_in(), 3.0);
    }

    #[test]
    fn locked_destination_leaves_sequence_untouched() {
        let mut s = seq();
        s.tracks[1].locked = true;
        let before = s.clone();
        let err = apply_move(&mut s, &ClipMoveRequest { clip_id: "c1".into(), from_track_id: "v1".into(), to_track_id: "v2".into(), timeline_in_sec: 3.0 });
        assert!(matches!(err, Err(TimelineError::TrackLocked(_))));
        assert_eq!(s, before);
    }

    #[test]
    fn split_keeps_source_continuity() {
        let mut s = seq();
        let right = apply_split(&mut s, &ClipSplitRequest { clip_id: "c1".into(), track_id: "v1".into(), split_time_sec: 2.5 }).unwrap();
        let clips = &s.tracks[0].clips;
        assert_eq!(clips.len(), 2);
        assert_eq!(clips[0].range.source_out_sec, 3.5);
        assert_eq!(clips[1].id, right);
        assert_eq!(clips[1].range.source_in_sec, 3.5);
        assert_eq!(clips[1].timeline_in(), 2.5);
        assert!(apply_split(&mut s, &ClipSplitRequest { clip_id: "c1".into(), track_id: "v1".into(), split_time_sec: 1.0 }).is_err());
    }

    #[test]
    fn trim_rejects_empty_range() {
        let mut s = seq();
        let req = ClipTrimRequest { clip_id: "c1".into(), track_id: "v1".into(), new_source_in: Some(6.0), ..Default::default() };
        assert!(apply_trim(&mut s, &req).is_err());
        let req = ClipTrimRequest { clip_id: "c1".into(), track_id: "v1".into(), new_source_out: Some(4.0), ..Default::default() };
        apply_trim(&mut s, &req).unwrap();
        assert_eq!(s.tracks[0].clips[0].place.duration_sec, 2.0);
    }

    #[test]
    fn store_editor_applies_and_bumps_revision() {
        let store = MemoryStore::new(seq());
        let mut editor = StoreEditor::new(&store);
        editor.on_track_lock_toggle(TrackToggle { track_id: "v1".into(), value: true });
        editor.on_audio_settings_change(AudioSettingsChange { clip_id: "c1".into(), track_id: "v1".into(), volume_db: Some(3.0), ..Default::default() });
        let s = store.get();
        assert!(s.tracks[0].locked);
        // locked track rejects the audio change
        assert_eq!(s.tracks[0].clips[0].audio.volume_db, 0.0);
        assert_eq!(store.revision(), 2);
    }
}
