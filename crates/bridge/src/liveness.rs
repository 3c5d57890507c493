use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Token handed out when async work starts; the result is applied only if the
/// token is still live when it comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LivenessTicket(u64);

/// Shared counter of outstanding work. Issuing a new ticket or calling
/// [`Liveness::invalidate`] makes every earlier ticket stale.
#[derive(Debug, Clone, Default)]
pub struct Liveness {
    current: Arc<AtomicU64>,
}

impl Liveness {
    pub fn new() -> Self { Self::default() }

    pub fn issue(&self) -> LivenessTicket {
        LivenessTicket(self.current.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Unmount, provider change, cleared conversation.
    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::AcqRel);
    }

    pub fn is_live(&self, ticket: LivenessTicket) -> bool {
        self.current.load(Ordering::Acquire) == ticket.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_ticket_and_invalidate_kill_older() {
        let live = Liveness::new();
        let a = live.issue();
        assert!(live.is_live(a));
        let b = live.issue();
        assert!(!live.is_live(a));
        assert!(live.is_live(b));
        live.clone().invalidate();
        assert!(!live.is_live(b));
    }
}
