//! Per-order completion records and aggregate counters, captured as orders
//! finish so the agent adapter's `info` dict and episodic reward objectives
//! never need to re-walk the ECS world. Also the in-scope half of the
//! teacher's telemetry/export split: an append-only event log and a
//! dynamic-reorder outcome log, both in-process and queryable, with
//! aggregation/export left to an external consumer.

use bevy_ecs::prelude::{Entity, Resource};

use crate::clock::{EventKind, EventSubject};
use crate::ecs::{OrderStatus, SegmentKind};

/// A terminal snapshot of one order, recorded the instant it reaches
/// `Delivered` (or is abandoned by truncation).
#[derive(Debug, Clone)]
pub struct CompletedOrderRecord {
    pub order: Entity,
    pub driver: Option<Entity>,
    pub establishment: Entity,
    pub request_time: u64,
    pub delivered_at: Option<u64>,
    pub final_status: OrderStatus,
    pub total_distance: f64,
}

impl CompletedOrderRecord {
    pub fn delay(&self) -> Option<u64> {
        self.delivered_at.map(|t| t.saturating_sub(self.request_time))
    }
}

/// Running totals and the full history of completed orders for the current
/// episode. Reset at the start of every `reset()` call.
#[derive(Debug, Default, Resource)]
pub struct SimTelemetry {
    pub orders_generated: u64,
    pub orders_delivered: u64,
    pub orders_abandoned: u64,
    pub records: Vec<CompletedOrderRecord>,
    /// Per-driver distance travelled, kept here too so episodic reward
    /// objectives can sum it without a world query.
    pub driver_distance: Vec<(Entity, f64)>,
}

impl SimTelemetry {
    pub fn record_generated(&mut self) {
        self.orders_generated += 1;
    }

    pub fn record_delivered(&mut self, record: CompletedOrderRecord) {
        self.orders_delivered += 1;
        self.records.push(record);
    }

    pub fn record_abandoned(&mut self, record: CompletedOrderRecord) {
        self.orders_abandoned += 1;
        self.records.push(record);
    }

    pub fn total_delay(&self) -> u64 {
        self.records.iter().filter_map(|r| r.delay()).sum()
    }

    pub fn mean_delay(&self) -> f64 {
        let delivered: Vec<u64> = self.records.iter().filter_map(|r| r.delay()).collect();
        if delivered.is_empty() {
            0.0
        } else {
            delivered.iter().sum::<u64>() as f64 / delivered.len() as f64
        }
    }
}

/// One append-only log entry: which event fired, on what, and when.
#[derive(Debug, Clone, Copy)]
pub struct EventLogEntry {
    pub time: u64,
    pub kind: EventKind,
    pub subject: Option<EventSubject>,
}

/// Append-only typed event record, the in-scope counterpart to the teacher's
/// columnar export: every entry keeps its timestamp and subject, so a
/// consumer can reconstruct per-order or per-driver timelines without
/// re-deriving them from `SimTelemetry`'s terminal-only snapshots.
#[derive(Debug, Default, Resource)]
pub struct EventLog {
    entries: Vec<EventLogEntry>,
}

impl EventLog {
    pub fn record(&mut self, time: u64, kind: EventKind, subject: Option<EventSubject>) {
        self.entries.push(EventLogEntry { time, kind, subject });
    }

    pub fn entries(&self) -> &[EventLogEntry] {
        &self.entries
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }
}

/// One dynamic-reorder outcome: the order whose pickup jumped the queue and
/// the estimated time/distance saved against the planned sequence it
/// replaced. Negative savings are logged too — the heuristic is myopic and
/// reorders whenever feasible, regardless of net benefit.
#[derive(Debug, Clone, Copy)]
pub struct ReorderRecord {
    pub time: u64,
    pub order: Entity,
    pub estimated_time_saved: i64,
    pub estimated_distance_saved: f64,
    pub segment_type: SegmentKind,
}

/// Running log of every dynamic-reorder attempt that actually spliced a
/// route, plus the aggregate counters spec.md's evaluation mode calls for.
#[derive(Debug, Default, Resource)]
pub struct ReorderLog {
    pub records: Vec<ReorderRecord>,
}

impl ReorderLog {
    pub fn record(&mut self, record: ReorderRecord) {
        self.records.push(record);
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn successful(&self) -> usize {
        self.records.iter().filter(|r| r.estimated_time_saved > 0).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.successful()
    }

    pub fn total_time_saved(&self) -> i64 {
        self.records.iter().map(|r| r.estimated_time_saved).sum()
    }

    pub fn total_distance_saved(&self) -> f64 {
        self.records.iter().map(|r| r.estimated_distance_saved).sum()
    }

    pub fn success_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.successful() as f64 / self.total() as f64
        }
    }
}
