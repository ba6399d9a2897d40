//! Bounded change-event log with cursor-based draining.
//!
//! [`EventLog`] assigns a monotonic sequence number to every recorded
//! event. Consumers drain with an [`EventCursor`] and get back both the
//! events recorded after the cursor and an exact count of events that
//! were already evicted, so a slow consumer observes loss instead of a
//! silent gap.

use std::collections::VecDeque;

use vantage_core::{EventCursor, Tick, WorldEvent, WorldEventKind};

/// Fixed-capacity event buffer with monotonic sequence positions.
///
/// Single-writer: the owning world store records events as mutations are
/// applied. When the buffer is full, the oldest event is evicted and
/// counted, which is a throughput signal rather than an error.
#[derive(Clone, Debug)]
pub struct EventLog {
    events: VecDeque<WorldEvent>,
    /// Sequence number of the event at the front of `events`.
    first_seq: u64,
    capacity: usize,
    dropped: u64,
}

impl EventLog {
    /// Create a log with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "EventLog capacity must be at least 1");
        Self {
            events: VecDeque::with_capacity(capacity),
            first_seq: 0,
            capacity,
            dropped: 0,
        }
    }

    /// Record an event, evicting the oldest if the log is full.
    pub fn record(&mut self, tick: Tick, kind: WorldEventKind) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.first_seq += 1;
            self.dropped += 1;
        }
        self.events.push_back(WorldEvent { tick, kind });
    }

    /// The cursor just past the most recently recorded event.
    pub fn head(&self) -> EventCursor {
        EventCursor(self.first_seq + self.events.len() as u64)
    }

    /// Return the events recorded at or after `cursor`, plus the number
    /// of such events that have already been evicted.
    pub fn drain_after(&self, cursor: EventCursor) -> (Vec<WorldEvent>, u64) {
        if cursor.0 >= self.first_seq {
            let skip = (cursor.0 - self.first_seq) as usize;
            (self.events.iter().skip(skip).cloned().collect(), 0)
        } else {
            let missed = self.first_seq - cursor.0;
            (self.events.iter().cloned().collect(), missed)
        }
    }

    /// Number of events currently retained.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log retains no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Total events evicted over the log's lifetime.
    pub fn dropped_total(&self) -> u64 {
        self.dropped
    }

    /// Discard retained events while keeping sequence positions monotonic.
    pub fn clear(&mut self) {
        self.first_seq += self.events.len() as u64;
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_core::EntityId;

    fn created(index: u32) -> WorldEventKind {
        WorldEventKind::EntityCreated(EntityId {
            index,
            generation: 0,
        })
    }

    #[test]
    fn drain_from_default_cursor_sees_everything() {
        let mut log = EventLog::new(8);
        log.record(Tick(1), created(0));
        log.record(Tick(1), created(1));

        let (events, missed) = log.drain_after(EventCursor::default());
        assert_eq!(events.len(), 2);
        assert_eq!(missed, 0);
    }

    #[test]
    fn drain_after_head_is_empty() {
        let mut log = EventLog::new(8);
        log.record(Tick(1), created(0));
        let head = log.head();
        log.record(Tick(2), created(1));

        let (events, missed) = log.drain_after(head);
        assert_eq!(events.len(), 1);
        assert_eq!(missed, 0);
        assert_eq!(events[0].tick, Tick(2));

        let (events, missed) = log.drain_after(log.head());
        assert!(events.is_empty());
        assert_eq!(missed, 0);
    }

    #[test]
    fn eviction_is_reported_as_missed() {
        let mut log = EventLog::new(4);
        let cursor = log.head();
        for i in 0..6 {
            log.record(Tick(1), created(i));
        }

        // Two events were evicted; the drain must say so.
        let (events, missed) = log.drain_after(cursor);
        assert_eq!(events.len(), 4);
        assert_eq!(missed, 2);
        assert_eq!(log.dropped_total(), 2);
    }

    #[test]
    fn head_stays_monotonic_across_clear() {
        let mut log = EventLog::new(4);
        log.record(Tick(1), created(0));
        log.record(Tick(1), created(1));
        let before = log.head();
        log.clear();

        assert!(log.is_empty());
        assert_eq!(log.head(), before);

        log.record(Tick(2), created(2));
        let (events, missed) = log.drain_after(before);
        assert_eq!(events.len(), 1);
        assert_eq!(missed, 0);
    }

    #[test]
    #[should_panic(expected = "capacity must be at least 1")]
    fn zero_capacity_panics() {
        EventLog::new(0);
    }
}
