//! The session timer set: three independent one-shot countdowns.
//!
//! Deadlines are absolute milliseconds on the caller's clock. Timers are
//! one-shot: firing clears the slot, and rescheduling replaces any previous
//! deadline. Keepalive re-arms itself from the session manager after each
//! fire.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Client-local inactivity lock-out.
    Idle,
    /// Periodic ping keeping the longer-lived server session record alive.
    Keepalive,
    /// Grace-delayed server-side logout of a doomed session.
    DeferredLogout,
}

const ALL_KINDS: [TimerKind; 3] = [
    TimerKind::Idle,
    TimerKind::Keepalive,
    TimerKind::DeferredLogout,
];

#[derive(Debug, Default)]
pub struct TimerSet {
    idle: Option<u64>,
    keepalive: Option<u64>,
    deferred_logout: Option<u64>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, kind: TimerKind) -> &mut Option<u64> {
        match kind {
            TimerKind::Idle => &mut self.idle,
            TimerKind::Keepalive => &mut self.keepalive,
            TimerKind::DeferredLogout => &mut self.deferred_logout,
        }
    }

    /// Arms `kind` to fire at the absolute deadline, replacing any previous
    /// schedule.
    pub fn schedule_at(&mut self, kind: TimerKind, deadline_ms: u64) {
        *self.slot(kind) = Some(deadline_ms);
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        *self.slot(kind) = None;
    }

    pub fn deadline(&self, kind: TimerKind) -> Option<u64> {
        match kind {
            TimerKind::Idle => self.idle,
            TimerKind::Keepalive => self.keepalive,
            TimerKind::DeferredLogout => self.deferred_logout,
        }
    }

    pub fn is_scheduled(&self, kind: TimerKind) -> bool {
        self.deadline(kind).is_some()
    }

    /// Clears and returns every timer whose deadline has passed, in a fixed
    /// order (idle, keepalive, deferred logout).
    pub fn take_due(&mut self, now_ms: u64) -> Vec<TimerKind> {
        let mut due = Vec::new();
        for kind in ALL_KINDS {
            if matches!(self.deadline(kind), Some(deadline) if deadline <= now_ms) {
                self.cancel(kind);
                due.push(kind);
            }
        }
        due
    }

    /// Earliest pending deadline, for hosts that sleep between ticks.
    pub fn next_deadline(&self) -> Option<u64> {
        ALL_KINDS
            .iter()
            .filter_map(|kind| self.deadline(*kind))
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_timers_fire_once() {
        let mut timers = TimerSet::new();
        timers.schedule_at(TimerKind::Idle, 100);
        timers.schedule_at(TimerKind::Keepalive, 200);

        assert!(timers.take_due(50).is_empty());
        assert_eq!(timers.take_due(150), vec![TimerKind::Idle]);
        // one-shot: does not fire again
        assert!(timers.take_due(150).is_empty());
        assert_eq!(timers.take_due(250), vec![TimerKind::Keepalive]);
    }

    #[test]
    fn reschedule_replaces_deadline() {
        let mut timers = TimerSet::new();
        timers.schedule_at(TimerKind::DeferredLogout, 100);
        timers.schedule_at(TimerKind::DeferredLogout, 500);
        assert!(timers.take_due(200).is_empty());
        assert_eq!(timers.take_due(500), vec![TimerKind::DeferredLogout]);
    }

    #[test]
    fn cancel_disarms() {
        let mut timers = TimerSet::new();
        timers.schedule_at(TimerKind::Keepalive, 100);
        timers.cancel(TimerKind::Keepalive);
        assert!(timers.take_due(1_000).is_empty());
    }

    #[test]
    fn next_deadline_is_minimum() {
        let mut timers = TimerSet::new();
        assert_eq!(timers.next_deadline(), None);
        timers.schedule_at(TimerKind::Idle, 300);
        timers.schedule_at(TimerKind::DeferredLogout, 120);
        assert_eq!(timers.next_deadline(), Some(120));
    }
}
