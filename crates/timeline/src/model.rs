use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TimeSec = f64;

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32,
}

impl Fps {
    pub const fn new(num: u32, den: u32) -> Self { Self { num, den } }

    pub fn as_f64(&self) -> f64 {
        if self.num == 0 { return 0.0; }
        self.num as f64 / self.den.max(1) as f64
    }

    /// Length of one frame in seconds, 0 for a degenerate rate.
    pub fn frame_duration(&self) -> TimeSec {
        let rate = self.as_f64();
        if rate > 0.0 { 1.0 / rate } else { 0.0 }
    }

    /// Rounds `t` to the nearest frame boundary.
    pub fn quantize(&self, t: TimeSec) -> TimeSec {
        let rate = self.as_f64();
        if rate <= 0.0 || !t.is_finite() { return t; }
        (t * rate).round() / rate
    }
}

impl Default for Fps {
    fn default() -> Self { Self::new(30, 1) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceFormat {
    pub canvas: Canvas,
    pub fps: Fps,
}

impl Default for SequenceFormat {
    fn default() -> Self {
        Self { canvas: Canvas { width: 1920, height: 1080 }, fps: Fps::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackKind {
    Video,
    Audio,
    Caption,
    Overlay,
}

/// Kind of asset carried by a drag payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetKind {
    Video,
    Audio,
    Image,
    Caption,
}

impl AssetKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            "image" => Some(Self::Image),
            "caption" | "subtitle" => Some(Self::Caption),
            _ => None,
        }
    }
}

impl TrackKind {
    /// Whether an asset of `kind` may be placed on a track of this kind.
    /// Video assets land on audio tracks too (their audio stream is used).
    pub fn accepts(&self, kind: AssetKind) -> bool {
        match self {
            TrackKind::Video | TrackKind::Overlay => matches!(kind, AssetKind::Video | AssetKind::Image),
            TrackKind::Audio => matches!(kind, AssetKind::Audio | AssetKind::Video),
            TrackKind::Caption => matches!(kind, AssetKind::Caption),
        }
    }

    pub fn short_label(&self) -> &'static str {
        match self {
            TrackKind::Video => "V",
            TrackKind::Audio => "A",
            TrackKind::Caption => "C",
            TrackKind::Overlay => "O",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipRange {
    pub source_in_sec: TimeSec,
    pub source_out_sec: TimeSec,
}

impl ClipRange {
    pub fn new(source_in_sec: TimeSec, source_out_sec: TimeSec) -> Self {
        Self { source_in_sec, source_out_sec }
    }

    pub fn duration(&self) -> TimeSec { self.source_out_sec - self.source_in_sec }

    pub fn is_valid(&self) -> bool { self.source_out_sec > self.source_in_sec }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipPlace {
    pub timeline_in_sec: TimeSec,
    pub duration_sec: TimeSec,
}

impl ClipPlace {
    pub fn new(timeline_in_sec: TimeSec, duration_sec: TimeSec) -> Self {
        Self { timeline_in_sec, duration_sec }
    }

    pub fn timeline_out_sec(&self) -> TimeSec { self.timeline_in_sec + self.duration_sec }

    pub fn contains(&self, t: TimeSec) -> bool {
        t >= self.timeline_in_sec && t <= self.timeline_out_sec()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    pub position: (f64, f64),
    pub scale: (f64, f64),
    pub rotation_deg: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self { position: (0.5, 0.5), scale: (1.0, 1.0), rotation_deg: 0.0 }
    }
}

pub const MIN_VOLUME_DB: f64 = -60.0;
pub const MAX_VOLUME_DB: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSettings {
    pub volume_db: f64,
    pub pan: f64,
    pub muted: bool,
    #[serde(default)]
    pub fade_in_sec: TimeSec,
    #[serde(default)]
    pub fade_out_sec: TimeSec,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self { volume_db: 0.0, pan: 0.0, muted: false, fade_in_sec: 0.0, fade_out_sec: 0.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: String,
    pub asset_id: String,
    pub place: ClipPlace,
    pub range: ClipRange,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default)]
    pub effects: Vec<String>,
    #[serde(default)]
    pub audio: AudioSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Full length of the source asset when known; bounds trim-end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_duration_sec: Option<TimeSec>,
}

fn default_opacity() -> f64 { 1.0 }
fn default_speed() -> f64 { 1.0 }

impl Clip {
    pub fn new(asset_id: impl Into<String>, source_in: TimeSec, source_out: TimeSec) -> Self {
        let range = ClipRange::new(source_in, source_out);
        Self {
            id: new_id(),
            asset_id: asset_id.into(),
            place: ClipPlace::new(0.0, range.duration()),
            range,
            transform: Transform::default(),
            opacity: 1.0,
            speed: 1.0,
            effects: Vec::new(),
            audio: AudioSettings::default(),
            label: None,
            color: None,
            asset_duration_sec: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn place_at(mut self, timeline_in: TimeSec) -> Self {
        self.place.timeline_in_sec = timeline_in;
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self.place.duration_sec = self.duration();
        self
    }

    /// Speed used for layout; non-positive or non-finite speeds count as 1.
    pub fn effective_speed(&self) -> f64 {
        if self.speed.is_finite() && self.speed > 0.0 { self.speed } else { 1.0 }
    }

    /// Timeline length derived from the source range and speed.
    pub fn duration(&self) -> TimeSec { self.range.duration() / self.effective_speed() }

    pub fn timeline_in(&self) -> TimeSec { self.place.timeline_in_sec }

    pub fn timeline_end(&self) -> TimeSec { self.place.timeline_in_sec + self.duration() }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.asset_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub kind: TrackKind,
    pub name: String,
    #[serde(default)]
    pub clips: Vec<Clip>,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default = "default_volume")]
    pub volume: f64,
}

fn default_visible() -> bool { true }
fn default_volume() -> f64 { 1.0 }

impl Track {
    pub fn new(name: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: new_id(),
            kind,
            name: name.into(),
            clips: Vec::new(),
            muted: false,
            locked: false,
            visible: true,
            volume: 1.0,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn add_clip(&mut self, clip: Clip) { self.clips.push(clip); }

    pub fn clip(&self, clip_id: &str) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == clip_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum MarkerType {
    #[default]
    Generic,
    Chapter,
    Hook,
    Cta,
    Todo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub id: String,
    pub time_sec: TimeSec,
    pub label: String,
    pub color: String,
    #[serde(default)]
    pub marker_type: MarkerType,
}

impl Marker {
    pub fn new(time_sec: TimeSec, label: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            time_sec,
            label: label.into(),
            color: "#ffcc00".to_string(),
            marker_type: MarkerType::Generic,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionStyle {
    pub font_size: f64,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self { font_size: 48.0, color: "#ffffff".to_string(), background: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caption {
    pub id: String,
    pub start_sec: TimeSec,
    pub end_sec: TimeSec,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(default)]
    pub style: CaptionStyle,
}

impl Caption {
    /// Reversed bounds are swapped so `end_sec >= start_sec` always holds.
    pub fn new(start_sec: TimeSec, end_sec: TimeSec, text: impl Into<String>) -> Self {
        let (start_sec, end_sec) = if end_sec < start_sec { (end_sec, start_sec) } else { (start_sec, end_sec) };
        Self {
            id: new_id(),
            start_sec,
            end_sec,
            text: text.into(),
            speaker: None,
            style: CaptionStyle::default(),
        }
    }

    pub fn duration(&self) -> TimeSec { (self.end_sec - self.start_sec).max(0.0) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sequence {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub format: SequenceFormat,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(default)]
    pub captions: Vec<Caption>,
}

impl Sequence {
    pub fn new(name: impl Into<String>, format: SequenceFormat) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            format,
            tracks: Vec::new(),
            markers: Vec::new(),
            captions: Vec::new(),
        }
    }

    pub fn add_track(&mut self, track: Track) { self.tracks.push(track); }

    pub fn track(&self, track_id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == track_id)
    }

    pub fn track_index(&self, track_id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == track_id)
    }

    /// Finds a clip and the track holding it.
    pub fn find_clip(&self, clip_id: &str) -> Option<(&Track, &Clip)> {
        self.tracks
            .iter()
            .find_map(|t| t.clip(clip_id).map(|c| (t, c)))
    }

    pub fn clips(&self) -> impl Iterator<Item = &Clip> {
        self.tracks.iter().flat_map(|t| t.clips.iter())
    }

    pub fn duration(&self) -> TimeSec {
        let clip_end = self.clips().map(|c| c.timeline_end()).fold(0.0, f64::max);
        let caption_end = self.captions.iter().map(|c| c.end_sec).fold(0.0, f64::max);
        clip_end.max(caption_end)
    }
}
