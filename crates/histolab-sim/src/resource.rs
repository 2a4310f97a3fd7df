//! Capacity-limited seizable resources.
//!
//! A resource has a mutable non-negative integer capacity, a set of current
//! claimers, and a pending-requesters queue ordered by (request priority,
//! enqueue sequence). Shrinking capacity below the claimed count never
//! revokes in-flight claims; new grants are bounded by the capacity at
//! grant time. Three level monitors record claimed units, queue length, and
//! capacity.

use crate::actor::ActorId;
use crate::monitor::Monitor;

/// Identifies a resource within one replication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(pub usize);

/// A pending requester queue entry.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Waiter {
    pub actor: ActorId,
    pub prio: i32,
    pub seq: u64,
}

#[derive(Debug)]
pub(crate) struct Resource {
    pub name: String,
    pub capacity: u32,
    pub claimed: u32,
    /// Current claimers in claim order, merged per actor.
    pub claimers: Vec<(ActorId, u32)>,
    /// Pending requesters ordered by (priority, enqueue sequence).
    pub pending: Vec<Waiter>,
    pub claimed_mon: Monitor,
    pub waiting_mon: Monitor,
    pub capacity_mon: Monitor,
}

impl Resource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            capacity: 0,
            claimed: 0,
            claimers: Vec::new(),
            pending: Vec::new(),
            claimed_mon: Monitor::new(name, 0.0),
            waiting_mon: Monitor::new(name, 0.0),
            capacity_mon: Monitor::new(name, 0.0),
        }
    }

    /// Free units; negative after a capacity shrink below the claimed count.
    pub fn free(&self) -> i64 {
        i64::from(self.capacity) - i64::from(self.claimed)
    }

    /// Inserts a waiter at its (priority, sequence) position.
    pub fn enqueue(&mut self, t: f64, w: Waiter) {
        let pos = self.pending.partition_point(|p| p.prio <= w.prio);
        self.pending.insert(pos, w);
        self.waiting_mon.set(t, self.pending.len() as f64);
    }

    /// Removes a waiter wherever it sits in the queue.
    pub fn remove_waiter(&mut self, t: f64, actor: ActorId) {
        if let Some(pos) = self.pending.iter().position(|w| w.actor == actor) {
            self.pending.remove(pos);
            self.waiting_mon.set(t, self.pending.len() as f64);
        }
    }

    /// Records `units` claimed by `actor`.
    pub fn add_claim(&mut self, t: f64, actor: ActorId, units: u32) {
        self.claimed += units;
        match self.claimers.iter_mut().find(|(a, _)| *a == actor) {
            Some(entry) => entry.1 += units,
            None => self.claimers.push((actor, units)),
        }
        self.claimed_mon.set(t, f64::from(self.claimed));
    }

    /// Releases the actor's whole claim, returning the unit count.
    pub fn remove_claim(&mut self, t: f64, actor: ActorId) -> Option<u32> {
        let pos = self.claimers.iter().position(|(a, _)| *a == actor)?;
        let (_, units) = self.claimers.remove(pos);
        self.claimed -= units;
        self.claimed_mon.set(t, f64::from(self.claimed));
        Some(units)
    }

    /// Sets capacity, emitting a monitor sample on change.
    pub fn set_capacity(&mut self, t: f64, units: u32) -> bool {
        let grew = units > self.capacity;
        self.capacity = units;
        self.capacity_mon.set(t, f64::from(units));
        grew
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waiters_ordered_by_priority_then_sequence() {
        let mut r = Resource::new("staff");
        r.enqueue(0.0, Waiter { actor: ActorId(0), prio: 0, seq: 0 });
        r.enqueue(0.0, Waiter { actor: ActorId(1), prio: -3, seq: 1 });
        r.enqueue(0.0, Waiter { actor: ActorId(2), prio: 0, seq: 2 });
        r.enqueue(0.0, Waiter { actor: ActorId(3), prio: -3, seq: 3 });
        let order: Vec<usize> = r.pending.iter().map(|w| w.actor.0).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    #[test]
    fn claims_merge_per_actor() {
        let mut r = Resource::new("machine");
        r.set_capacity(0.0, 5);
        r.add_claim(1.0, ActorId(7), 2);
        r.add_claim(2.0, ActorId(7), 1);
        assert_eq!(r.claimed, 3);
        assert_eq!(r.claimers, vec![(ActorId(7), 3)]);
        assert_eq!(r.remove_claim(3.0, ActorId(7)), Some(3));
        assert_eq!(r.claimed, 0);
    }

    #[test]
    fn shrink_below_claimed_leaves_claims_intact() {
        let mut r = Resource::new("machine");
        r.set_capacity(0.0, 4);
        r.add_claim(0.0, ActorId(0), 3);
        r.set_capacity(1.0, 1);
        assert_eq!(r.claimed, 3);
        assert_eq!(r.free(), -2);
    }
}
