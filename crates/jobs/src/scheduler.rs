use std::collections::{HashMap, HashSet};

use timeline::virtualize::VisibilityTracker;

use crate::{PreviewHandle, PreviewOutput, PreviewRequest, PreviewStatus, Ticket};

/// Frames a finished slot may stay off screen before it is forgotten.
pub const DEFAULT_RETAIN_FRAMES: u64 = 120;
/// Finished slots kept regardless of age.
pub const DEFAULT_MAX_CACHED: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum SlotStatus {
    InFlight { job_id: String },
    Ready(PreviewOutput),
    Failed(String),
    Canceled,
}

/// Lazy loading on top of [`PreviewHandle`]: a preview is only requested
/// while its key is visible, and leaving the viewport cancels it.
///
/// Finished slots that stay off screen for `retain_frames` calls to
/// [`update_visible`](Self::update_visible), or that overflow `max_cached`,
/// are evicted oldest first. A key canceled by the user is not requested
/// again until it scrolls out of view or is invalidated.
pub struct PreviewScheduler {
    handle: PreviewHandle,
    tracker: VisibilityTracker<String>,
    in_flight: HashMap<String, Ticket>,
    ready: HashMap<String, PreviewOutput>,
    failed: HashMap<String, String>,
    canceled: HashSet<String>,
    last_seen: HashMap<String, u64>,
    frame: u64,
    retain_frames: u64,
    max_cached: usize,
}

impl PreviewScheduler {
    pub fn new(handle: PreviewHandle) -> Self {
        Self::with_limits(handle, DEFAULT_RETAIN_FRAMES, DEFAULT_MAX_CACHED)
    }

    pub fn with_limits(handle: PreviewHandle, retain_frames: u64, max_cached: usize) -> Self {
        Self {
            handle,
            tracker: VisibilityTracker::new(),
            in_flight: HashMap::new(),
            ready: HashMap::new(),
            failed: HashMap::new(),
            canceled: HashSet::new(),
            last_seen: HashMap::new(),
            frame: 0,
            retain_frames,
            max_cached,
        }
    }

    /// `visible` holds one request per preview slot currently on screen.
    /// Returns the keys evicted from the cache so callers can drop whatever
    /// they derived from them (textures).
    pub fn update_visible(&mut self, visible: Vec<PreviewRequest>) -> Vec<String> {
        self.frame += 1;
        let change = self.tracker.update(visible.iter().map(|r| r.key.clone()));
        for key in change.hidden {
            self.canceled.remove(&key);
            if self.in_flight.remove(&key).is_some() {
                self.handle.cancel_key(&key);
            }
        }
        for req in visible {
            self.last_seen.insert(req.key.clone(), self.frame);
            let known = self.ready.contains_key(&req.key)
                || self.failed.contains_key(&req.key)
                || self.in_flight.contains_key(&req.key)
                || self.canceled.contains(&req.key);
            if !known {
                let ticket = self.handle.request(req);
                self.in_flight.insert(ticket.key.clone(), ticket);
            }
        }
        self.evict()
    }

    fn evict(&mut self) -> Vec<String> {
        let mut idle: Vec<(u64, String)> = self
            .ready
            .keys()
            .chain(self.failed.keys())
            .filter(|k| !self.tracker.is_visible(k))
            .map(|k| (self.last_seen.get(k).copied().unwrap_or(0), k.clone()))
            .collect();
        idle.sort();

        let cached = self.ready.len() + self.failed.len();
        let overflow = cached.saturating_sub(self.max_cached);
        let mut evicted = Vec::new();
        for (i, (seen, key)) in idle.into_iter().enumerate() {
            let stale = self.frame.saturating_sub(seen) > self.retain_frames;
            if !stale && i >= overflow {
                break;
            }
            self.ready.remove(&key);
            self.failed.remove(&key);
            self.last_seen.remove(&key);
            evicted.push(key);
        }
        // keys that never finished only need their timestamp while tracked
        let tracked = &self.tracker;
        let (ready, failed, in_flight) = (&self.ready, &self.failed, &self.in_flight);
        self.last_seen
            .retain(|k, _| tracked.is_visible(k) || ready.contains_key(k) || failed.contains_key(k) || in_flight.contains_key(k));
        if !evicted.is_empty() {
            tracing::debug!(evicted = evicted.len(), cached = self.ready.len() + self.failed.len(), "preview slots evicted");
        }
        evicted
    }

    /// User-initiated cancel: stops the work and keeps the slot from being
    /// requested again while it stays visible.
    pub fn cancel(&mut self, key: &str) {
        if self.in_flight.remove(key).is_some() {
            self.handle.cancel_key(key);
        }
        self.canceled.insert(key.to_string());
    }

    /// Applies finished work; returns how many previews became ready.
    pub fn poll(&mut self) -> usize {
        let mut newly_ready = 0;
        for ev in self.handle.poll() {
            let ours = self.in_flight.get(&ev.key).is_some_and(|t| t.id == ev.id);
            if !ours { continue; }
            match ev.status {
                PreviewStatus::Done(out) => {
                    self.in_flight.remove(&ev.key);
                    self.ready.insert(ev.key, out);
                    newly_ready += 1;
                }
                PreviewStatus::Failed(err) => {
                    self.in_flight.remove(&ev.key);
                    self.failed.insert(ev.key, err);
                }
                PreviewStatus::Canceled => {
                    self.in_flight.remove(&ev.key);
                }
                PreviewStatus::Pending | PreviewStatus::Running => {}
            }
        }
        newly_ready
    }

    pub fn get(&self, key: &str) -> Option<&PreviewOutput> { self.ready.get(key) }

    pub fn error(&self, key: &str) -> Option<&str> { self.failed.get(key).map(String::as_str) }

    pub fn in_flight(&self) -> usize { self.in_flight.len() }

    /// Finished slots currently held.
    pub fn cached(&self) -> usize { self.ready.len() + self.failed.len() }

    /// Forgets a cached result or a cancel so the next visible frame
    /// requests the key again.
    pub fn invalidate(&mut self, key: &str) {
        self.ready.remove(key);
        self.failed.remove(key);
        self.canceled.remove(key);
    }

    pub fn handle(&self) -> &PreviewHandle { &self.handle }

    /// Every known slot, ordered by key.
    pub fn slots(&self) -> Vec<(String, SlotStatus)> {
        let mut out: Vec<(String, SlotStatus)> = self
            .in_flight
            .iter()
            .map(|(k, t)| (k.clone(), SlotStatus::InFlight { job_id: t.id.clone() }))
            .chain(self.ready.iter().map(|(k, o)| (k.clone(), SlotStatus::Ready(o.clone()))))
            .chain(self.failed.iter().map(|(k, e)| (k.clone(), SlotStatus::Failed(e.clone()))))
            .chain(self.canceled.iter().map(|k| (k.clone(), SlotStatus::Canceled)))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}
