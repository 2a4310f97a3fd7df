//! Event calendar: the time-ordered priority queue driving a replication.
//!
//! Events are ordered by (fire-time, secondary priority, insertion
//! sequence). Fire-times are compared with `f64::total_cmp`, which gives a
//! total order without panicking; the engine never schedules NaN times.
//! Secondary priority orders events that fire at the same instant (an
//! URGENT actor re-enters before a ROUTINE one on a zero-length hold); the
//! insertion sequence breaks remaining ties so that pops are deterministic
//! given a seed.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::actor::ActorId;

/// A scheduled resumption of an actor.
#[derive(Debug, Clone, Copy)]
pub struct Event {
    /// Simulated fire-time in hours.
    pub time: f64,
    /// Secondary priority; smaller fires earlier within the same instant.
    pub prio: i32,
    /// Insertion sequence; breaks remaining ties.
    pub seq: u64,
    /// Actor to resume.
    pub actor: ActorId,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.prio.cmp(&other.prio))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Min-ordered event queue.
#[derive(Debug, Default)]
pub struct Calendar {
    heap: BinaryHeap<Reverse<Event>>,
    next_seq: u64,
}

impl Calendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules an actor resumption, assigning the next insertion sequence.
    pub fn schedule(&mut self, time: f64, prio: i32, actor: ActorId) {
        debug_assert!(time.is_finite() && time >= 0.0, "bad fire-time {time}");
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Event {
            time,
            prio,
            seq,
            actor,
        }));
    }

    /// Pops the earliest event, if any.
    pub fn pop(&mut self) -> Option<Event> {
        self.heap.pop().map(|Reverse(ev)| ev)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(cal: &mut Calendar) -> Vec<(f64, i32, u64)> {
        std::iter::from_fn(|| cal.pop())
            .map(|e| (e.time, e.prio, e.seq))
            .collect()
    }

    #[test]
    fn pops_in_time_order() {
        let mut cal = Calendar::new();
        cal.schedule(2.0, 0, ActorId(0));
        cal.schedule(0.5, 0, ActorId(1));
        cal.schedule(1.0, 0, ActorId(2));
        let times: Vec<f64> = drain(&mut cal).into_iter().map(|(t, _, _)| t).collect();
        assert_eq!(times, vec![0.5, 1.0, 2.0]);
    }

    #[test]
    fn same_instant_ordered_by_priority_then_sequence() {
        let mut cal = Calendar::new();
        cal.schedule(1.0, 0, ActorId(0)); // seq 0
        cal.schedule(1.0, -3, ActorId(1)); // seq 1, urgent
        cal.schedule(1.0, 0, ActorId(2)); // seq 2
        let order = drain(&mut cal);
        assert_eq!(order, vec![(1.0, -3, 1), (1.0, 0, 0), (1.0, 0, 2)]);
    }

    #[test]
    fn insertion_sequence_is_stable() {
        let mut cal = Calendar::new();
        for i in 0..100 {
            cal.schedule(3.25, 0, ActorId(i));
        }
        let seqs: Vec<u64> = drain(&mut cal).into_iter().map(|(_, _, s)| s).collect();
        assert!(seqs.windows(2).all(|w| w[0] < w[1]));
    }
}
