use std::collections::HashSet;

use tw_core::{WorldEvent, WorldObjectId, WorldTick};

/// A published event with the tick it was published at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    /// The simulation tick when this event was published.
    pub tick: WorldTick,
    /// The event.
    pub event: WorldEvent,
}

/// Bounded history of published events.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<RecordedEvent>,
    max_events: usize,
}

impl EventLog {
    /// Create a new event log with the given maximum capacity (0 = unlimited).
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            max_events,
        }
    }

    /// Append an event, dropping the oldest events if the log exceeds its capacity.
    pub fn push(&mut self, tick: WorldTick, event: WorldEvent) {
        self.events.push(RecordedEvent { tick, event });
        if self.max_events > 0 && self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(..drain_count);
        }
    }

    /// Return a slice of all recorded events.
    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    /// Return all events published at the given tick.
    pub fn events_at_tick(&self, tick: WorldTick) -> Vec<&RecordedEvent> {
        self.events.iter().filter(|e| e.tick == tick).collect()
    }

    /// Return all events involving the given world object.
    pub fn events_for_object(&self, id: WorldObjectId) -> Vec<&RecordedEvent> {
        self.events.iter().filter(|e| e.event.involves(id)).collect()
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing has been recorded or everything was trimmed.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Remove all recorded events.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

/// Collapse structurally identical events, keeping first occurrences in order.
pub fn dedup_events(events: Vec<WorldEvent>) -> Vec<WorldEvent> {
    let mut seen = HashSet::with_capacity(events.len());
    events
        .into_iter()
        .filter(|event| seen.insert(event.clone()))
        .collect()
}

/// Collects events raised during a tick and dispatches them after the tick commits.
pub trait EventPublisher: std::fmt::Debug + Send {
    /// Queue events raised by an aggregate mutation.
    fn record(&mut self, events: Vec<WorldEvent>);

    /// Number of queued events.
    fn pending_len(&self) -> usize;

    /// Publish everything queued for `tick`, deduplicated. Returns what was published.
    fn flush(&mut self, tick: WorldTick) -> Vec<WorldEvent>;

    /// Drop queued events of an aborted tick.
    fn discard(&mut self);
}

/// Publisher that keeps published events in an [`EventLog`].
#[derive(Debug, Default)]
pub struct InMemoryEventPublisher {
    pending: Vec<WorldEvent>,
    history: EventLog,
}

impl InMemoryEventPublisher {
    /// Create a publisher whose history holds at most `max_events` (0 = unlimited).
    pub fn new(max_events: usize) -> Self {
        Self {
            pending: Vec::new(),
            history: EventLog::new(max_events),
        }
    }

    /// Everything published so far.
    pub fn history(&self) -> &EventLog {
        &self.history
    }
}

impl EventPublisher for InMemoryEventPublisher {
    fn record(&mut self, events: Vec<WorldEvent>) {
        self.pending.extend(events);
    }

    fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn flush(&mut self, tick: WorldTick) -> Vec<WorldEvent> {
        let published = dedup_events(std::mem::take(&mut self.pending));
        for event in &published {
            self.history.push(tick, event.clone());
        }
        published
    }

    fn discard(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tw_core::{Coordinate, SpotId};

    fn added(id: u64) -> WorldEvent {
        WorldEvent::ObjectAdded {
            spot_id: SpotId::new(1),
            object_id: WorldObjectId::new(id),
            at: Coordinate::planar(0, 0),
        }
    }

    #[test]
    fn event_log_push_and_query() {
        let mut log = EventLog::new(0);
        log.push(WorldTick::new(1), added(1));
        assert_eq!(log.len(), 1);
        assert_eq!(log.events_at_tick(WorldTick::new(1)).len(), 1);
        assert_eq!(log.events_for_object(WorldObjectId::new(1)).len(), 1);
        assert!(log.events_for_object(WorldObjectId::new(2)).is_empty());
    }

    #[test]
    fn event_log_max_events_trims() {
        let mut log = EventLog::new(2);
        for i in 0..5 {
            log.push(WorldTick::new(i), added(i));
        }
        assert_eq!(log.len(), 2);
        // Oldest events were dropped, newest remain
        assert_eq!(log.events()[0].tick, WorldTick::new(3));
        assert_eq!(log.events()[1].tick, WorldTick::new(4));
    }

    #[test]
    fn event_log_clear() {
        let mut log = EventLog::new(0);
        log.push(WorldTick::new(1), added(1));
        assert!(!log.is_empty());
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let events = vec![added(2), added(1), added(2), added(3), added(1)];
        assert_eq!(dedup_events(events), vec![added(2), added(1), added(3)]);
    }

    #[test]
    fn publisher_flushes_deduplicated_events_into_history() {
        let mut publisher = InMemoryEventPublisher::new(0);
        publisher.record(vec![added(1), added(1)]);
        publisher.record(vec![added(2)]);
        assert_eq!(publisher.pending_len(), 3);

        let published = publisher.flush(WorldTick::new(9));
        assert_eq!(published, vec![added(1), added(2)]);
        assert_eq!(publisher.pending_len(), 0);
        assert_eq!(publisher.history().events_at_tick(WorldTick::new(9)).len(), 2);
    }

    #[test]
    fn discarded_events_are_never_published() {
        let mut publisher = InMemoryEventPublisher::new(0);
        publisher.record(vec![added(1)]);
        publisher.discard();
        assert!(publisher.flush(WorldTick::new(1)).is_empty());
        assert!(publisher.history().is_empty());
    }
}
