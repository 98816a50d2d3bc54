//! Per-event-kind firing counts, exposed through `AgentEnv::step`'s `info`
//! dict for diagnostics. Counting lives here rather than in `clock.rs` so the
//! clock stays a pure priority queue.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;

use crate::clock::EventKind;

#[derive(Debug, Default, Resource)]
pub struct EventCounters {
    counts: HashMap<EventKind, u64>,
}

impl EventCounters {
    pub fn record(&mut self, kind: EventKind) {
        *self.counts.entry(kind).or_insert(0) += 1;
    }

    pub fn count(&self, kind: EventKind) -> u64 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EventKind, &u64)> {
        self.counts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_accumulate_per_kind() {
        let mut counters = EventCounters::default();
        counters.record(EventKind::CustomerPlacedOrder);
        counters.record(EventKind::CustomerPlacedOrder);
        counters.record(EventKind::DriverArrivedPickup);
        assert_eq!(counters.count(EventKind::CustomerPlacedOrder), 2);
        assert_eq!(counters.count(EventKind::DriverArrivedPickup), 1);
        assert_eq!(counters.total(), 3);
    }
}
