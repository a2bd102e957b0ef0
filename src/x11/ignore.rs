//! The event-ignore table: outgoing requests with event side effects
//! (configure, map, unmap) record their sequence numbers here so that the
//! echoed events can be told apart from user-caused ones and dropped.

use std::time::{Duration, Instant};

use log::trace;

use super::{EventKind, Seq};

/// Entries older than this are garbage collected.
const IGNORE_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
struct Entry {
    seq: Seq,
    kind: EventKind,
    added: Instant,
}

#[derive(Debug, Default)]
pub struct IgnoreTable {
    entries: Vec<Entry>,
}

impl IgnoreTable {
    pub fn new() -> IgnoreTable {
        IgnoreTable { entries: Vec::new() }
    }

    /// Records an outgoing request whose echoed event must be swallowed.
    pub fn add(&mut self, seq: Seq, kind: EventKind) {
        self.entries.push(Entry { seq, kind, added: Instant::now() });
    }

    /// Whether an incoming event matches a recorded request. A match
    /// consumes the entry.
    pub fn should_ignore(&mut self, seq: Seq, kind: EventKind) -> bool {
        let now = Instant::now();
        match self
            .entries
            .iter()
            .position(|e| e.seq == seq && e.kind == kind && now - e.added < IGNORE_TTL)
        {
            Some(index) => {
                trace!("swallowing self-caused {:?} (seq {})", kind, seq);
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Whether an X protocol error for this sequence belongs to a request
    /// we knowingly issued. Does not consume: an errored request may still
    /// produce no event.
    #[allow(dead_code)]
    pub fn covers_sequence(&self, seq: Seq) -> bool {
        let now = Instant::now();
        self.entries
            .iter()
            .any(|e| e.seq == seq && now - e.added < IGNORE_TTL)
    }

    /// Drops expired entries. Returns the time until the next entry
    /// expires, for the poll timeout.
    pub fn gc(&mut self) -> Option<Duration> {
        let now = Instant::now();
        self.entries.retain(|e| now - e.added < IGNORE_TTL);
        self.entries
            .iter()
            .map(|e| IGNORE_TTL - (now - e.added))
            .min()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_consumes_the_entry() {
        let mut table = IgnoreTable::new();
        table.add(42, EventKind::Enter);
        assert!(table.should_ignore(42, EventKind::Enter));
        assert!(!table.should_ignore(42, EventKind::Enter));
    }

    #[test]
    fn kind_must_match() {
        let mut table = IgnoreTable::new();
        table.add(42, EventKind::Enter);
        assert!(!table.should_ignore(42, EventKind::Unmap));
        assert!(table.should_ignore(42, EventKind::Enter));
    }

    #[test]
    fn gc_reports_next_deadline() {
        let mut table = IgnoreTable::new();
        assert_eq!(table.gc(), None);
        table.add(1, EventKind::Configure);
        let deadline = table.gc().expect("entry should have a deadline");
        assert!(deadline <= IGNORE_TTL);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn errors_on_recorded_sequences_are_covered() {
        let mut table = IgnoreTable::new();
        table.add(7, EventKind::Configure);
        assert!(table.covers_sequence(7));
        assert!(!table.covers_sequence(8));
        // Coverage does not consume.
        assert!(table.covers_sequence(7));
    }
}
