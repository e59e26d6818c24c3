//! Process-wide counters for the event loop, fan-out, and persistence
//! writer. Read by the periodic stats log line and by tests.

use std::sync::atomic::{AtomicU64, Ordering};

static EVENTS_IN: AtomicU64 = AtomicU64::new(0);
static BROADCASTS_OUT: AtomicU64 = AtomicU64::new(0);
static PERSIST_WRITES: AtomicU64 = AtomicU64::new(0);
static PERSIST_FAILURES: AtomicU64 = AtomicU64::new(0);
static LOGINS: AtomicU64 = AtomicU64::new(0);
static DISCONNECTS: AtomicU64 = AtomicU64::new(0);

pub fn inc_events_in() {
    EVENTS_IN.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_broadcasts_out() {
    BROADCASTS_OUT.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_persist_writes() {
    PERSIST_WRITES.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_persist_failures() {
    PERSIST_FAILURES.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_logins() {
    LOGINS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_disconnects() {
    DISCONNECTS.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub events_in: u64,
    pub broadcasts_out: u64,
    pub persist_writes: u64,
    pub persist_failures: u64,
    pub logins: u64,
    pub disconnects: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        events_in: EVENTS_IN.load(Ordering::Relaxed),
        broadcasts_out: BROADCASTS_OUT.load(Ordering::Relaxed),
        persist_writes: PERSIST_WRITES.load(Ordering::Relaxed),
        persist_failures: PERSIST_FAILURES.load(Ordering::Relaxed),
        logins: LOGINS.load(Ordering::Relaxed),
        disconnects: DISCONNECTS.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let before = snapshot();
        inc_events_in();
        inc_broadcasts_out();
        inc_persist_writes();
        let after = snapshot();
        assert!(after.events_in >= before.events_in + 1);
        assert!(after.broadcasts_out >= before.broadcasts_out + 1);
        assert!(after.persist_writes >= before.persist_writes + 1);
    }
}
