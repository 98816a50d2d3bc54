//! Simulation time: a virtual-time timeline advanced one event at a time.
//!
//! All timestamps and `clock.now()` are in **simulation time units**. The
//! timeline advances by popping the next scheduled event (same-timestamp
//! events are ordered by insertion, preserving FIFO order via a sequence
//! number).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::{Entity, Resource};

/// Kinds of events the kernel schedules and routes through the ECS schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SimulationStarted,
    SpawnOrder,
    CustomerPlacedOrder,
    EstablishmentAcceptedOrder,
    PreparationStarted,
    OrderReady,
    DriverAcceptedRoute,
    DriverArrivedPickup,
    DriverPickedUpOrder,
    DriverArrivedDelivery,
    DriverDeliveredOrder,
    ReorderCheck,
    /// Logged (never scheduled on the heap) the instant a dynamic reorder
    /// actually splices a pickup forward, so `EventLog` carries it.
    RouteReordered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSubject {
    Order(Entity),
    Driver(Entity),
    Establishment(Entity),
}

/// Simulation event. `timestamp` is in simulation time units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub timestamp: u64,
    pub kind: EventKind,
    pub subject: Option<EventSubject>,
    /// Monotonic insertion sequence; breaks ties between same-timestamp events
    /// so that FIFO scheduling order is preserved regardless of `EventKind`.
    seq: u64,
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap by (timestamp, seq): earliest timestamp first, then FIFO.
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The event currently being processed by the schedule, inserted by the runner.
#[derive(Debug, Clone, Copy, Resource)]
pub struct CurrentEvent(pub Event);

/// Virtual-time clock: advances to the next scheduled event. Holds a FIFO
/// core-event queue, fed by orders waiting on a driver, separately from the
/// timed event heap.
#[derive(Debug, Resource)]
pub struct SimulationClock {
    now: u64,
    events: BinaryHeap<Event>,
    next_seq: u64,
    core_events: std::collections::VecDeque<CoreEvent>,
}

/// An order that has reached the "needs driver assignment" point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreEvent {
    pub order: Entity,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self {
            now: 0,
            events: BinaryHeap::new(),
            next_seq: 0,
            core_events: std::collections::VecDeque::new(),
        }
    }
}

impl SimulationClock {
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Schedule an event at a specific simulation timestamp.
    pub fn schedule_at(&mut self, at: u64, kind: EventKind, subject: Option<EventSubject>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        debug_assert!(at >= self.now, "event timestamp must be >= current time");
        self.events.push(Event {
            timestamp: at,
            kind,
            subject,
            seq,
        });
    }

    /// Schedule an event at `now + delta` (relative).
    pub fn schedule_in(&mut self, delta: u64, kind: EventKind, subject: Option<EventSubject>) {
        self.schedule_at(self.now.saturating_add(delta), kind, subject);
    }

    /// Pop the next event (earliest timestamp; FIFO within a timestamp). Advances `now`.
    pub fn pop_next(&mut self) -> Option<Event> {
        let event = self.events.pop()?;
        self.now = event.timestamp;
        Some(event)
    }

    /// Timestamp of the next scheduled event without popping it.
    pub fn next_event_time(&self) -> Option<u64> {
        self.events.peek().map(|e| e.timestamp)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn pending_event_count(&self) -> usize {
        self.events.len()
    }

    /// Push an order onto the FIFO core-event queue.
    pub fn push_core_event(&mut self, order: Entity) {
        self.core_events.push_back(CoreEvent { order });
    }

    /// Pop the next core event, if any (FIFO).
    pub fn pop_core_event(&mut self) -> Option<CoreEvent> {
        self.core_events.pop_front()
    }

    pub fn has_core_event(&self) -> bool {
        !self.core_events.is_empty()
    }
}
