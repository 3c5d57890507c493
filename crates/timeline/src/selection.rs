//! Clip and track selection.

use serde::{Deserialize, Serialize};

/// Ordered, duplicate-free selection of clip and track ids.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    clips: Vec<String>,
    tracks: Vec<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_clips<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut sel = Self::new();
        for id in ids {
            sel.add_clip(id.into());
        }
        sel
    }

    /// Select a clip. Without `additive` the previous clip selection is replaced.
    pub fn select_clip(&mut self, clip_id: &str, additive: bool) {
        if !additive {
            self.clips.clear();
        }
        self.add_clip(clip_id.to_string());
    }

    /// Shift/ctrl-click behaviour: flips membership of one clip.
    pub fn toggle_clip(&mut self, clip_id: &str) {
        if self.is_clip_selected(clip_id) {
            self.clips.retain(|id| id != clip_id);
        } else {
            self.clips.push(clip_id.to_string());
        }
    }

    fn add_clip(&mut self, clip_id: String) {
        if !self.clips.contains(&clip_id) {
            self.clips.push(clip_id);
        }
    }

    pub fn select_track(&mut self, track_id: &str, additive: bool) {
        if !additive {
            self.tracks.clear();
        }
        if !self.tracks.iter().any(|id| id == track_id) {
            self.tracks.push(track_id.to_string());
        }
    }

    /// Replace the clip selection wholesale, keeping first-seen order.
    pub fn set_clips<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clips.clear();
        for id in ids {
            self.add_clip(id.into());
        }
    }

    pub fn clear(&mut self) {
        self.clips.clear();
        self.tracks.clear();
    }

    pub fn clips(&self) -> &[String] {
        &self.clips
    }

    pub fn tracks(&self) -> &[String] {
        &self.tracks
    }

    pub fn is_clip_selected(&self, clip_id: &str) -> bool {
        self.clips.iter().any(|id| id == clip_id)
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty() && self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_select_replaces() {
        let mut sel = Selection::new();
        sel.select_clip("c1", false);
        sel.select_clip("c2", false);
        assert_eq!(sel.clips(), ["c2".to_string()]);
    }

    #[test]
    fn additive_select_has_no_duplicates() {
        let mut sel = Selection::new();
        sel.select_clip("c1", false);
        sel.select_clip("c2", true);
        sel.select_clip("c1", true);
        assert_eq!(sel.clips().len(), 2);
    }

    #[test]
    fn toggle_flips_membership() {
        let mut sel = Selection::from_clips(["c1", "c2"]);
        sel.toggle_clip("c1");
        assert!(!sel.is_clip_selected("c1"));
        sel.toggle_clip("c3");
        assert_eq!(sel.clips(), ["c2".to_string(), "c3".to_string()]);
    }

    #[test]
    fn clear_empties_everything() {
        let mut sel = Selection::from_clips(["c1"]);
        sel.select_track("t1", false);
        assert!(!sel.is_empty());
        sel.clear();
        assert!(sel.is_empty());
    }
}
