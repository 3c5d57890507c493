use std::time::{Duration, Instant};

pub const DEFAULT_FLUSH_HZ: f64 = 60.0;

/// Latest-value-wins slot between input sampling and rendering. Every input
/// event overwrites the pending value; [`FrameBatcher::flush`] hands out at
/// most one value per interval, intermediate values are dropped.
#[derive(Debug, Clone)]
pub struct FrameBatcher<T> {
    pending: Option<T>,
    interval: Duration,
    last_flush: Option<Instant>,
    dropped: u64,
}

impl<T> FrameBatcher<T> {
    pub fn new(rate_hz: f64) -> Self {
        let rate = if rate_hz.is_finite() && rate_hz > 0.0 { rate_hz } else { DEFAULT_FLUSH_HZ };
        Self { pending: None, interval: Duration::from_secs_f64(1.0 / rate), last_flush: None, dropped: 0 }
    }

    pub fn push(&mut self, value: T) {
        if self.pending.replace(value).is_some() {
            self.dropped += 1;
        }
    }

    /// Releases the pending value if one exists and the interval has elapsed.
    pub fn flush(&mut self, now: Instant) -> Option<T> {
        if self.pending.is_none() { return None; }
        if let Some(last) = self.last_flush {
            if now.saturating_duration_since(last) < self.interval { return None; }
        }
        self.last_flush = Some(now);
        self.pending.take()
    }

    /// Releases the pending value regardless of timing (pointer-up).
    pub fn flush_now(&mut self, now: Instant) -> Option<T> {
        let value = self.pending.take();
        if value.is_some() { self.last_flush = Some(now); }
        value
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }

    pub fn has_pending(&self) -> bool { self.pending.is_some() }

    /// Values overwritten before they were flushed.
    pub fn dropped(&self) -> u64 { self.dropped }

    pub fn interval(&self) -> Duration { self.interval }
}

impl<T> Default for FrameBatcher<T> {
    fn default() -> Self { Self::new(DEFAULT_FLUSH_HZ) }
}
