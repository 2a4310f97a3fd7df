//! Stores: priority-ordered queues between processes.
//!
//! A store is unbounded. A sorted push inserts before the first entry whose
//! priority is strictly greater (stable within equal priorities); a plain
//! push lands at the tail and inherits the tail entry's priority so later
//! sorted pushes order correctly against it. Pullers are served FIFO.

use std::collections::VecDeque;

use crate::actor::ActorId;

/// Identifies a store within one replication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreId(pub usize);

#[derive(Debug)]
struct Entry<I> {
    prio: i32,
    seq: u64,
    item: I,
}

#[derive(Debug)]
pub(crate) struct Store<I> {
    pub name: String,
    items: VecDeque<Entry<I>>,
    /// Actors blocked on `pull`, FIFO.
    pub pullers: VecDeque<ActorId>,
    next_seq: u64,
}

impl<I> Store<I> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            items: VecDeque::new(),
            pullers: VecDeque::new(),
            next_seq: 0,
        }
    }

    fn seq(&mut self) -> u64 {
        let s = self.next_seq;
        self.next_seq += 1;
        s
    }

    /// Appends at the tail, inheriting the tail entry's priority.
    pub fn push_tail(&mut self, item: I) {
        let prio = self.items.back().map_or(0, |e| e.prio);
        let seq = self.seq();
        self.items.push_back(Entry { prio, seq, item });
    }

    /// Inserts before the first entry with a strictly greater priority.
    pub fn push_sorted(&mut self, item: I, prio: i32) {
        let seq = self.seq();
        let pos = self.items.partition_point(|e| e.prio <= prio);
        self.items.insert(pos, Entry { prio, seq, item });
    }

    /// Takes the head item, if any.
    pub fn try_pull(&mut self) -> Option<I> {
        self.items.pop_front().map(|e| e.item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_push_orders_by_priority_stably() {
        let mut s: Store<u32> = Store::new("q");
        s.push_sorted(1, 0);
        s.push_sorted(2, -3);
        s.push_sorted(3, 0);
        s.push_sorted(4, -3);
        let order: Vec<u32> = std::iter::from_fn(|| s.try_pull()).collect();
        assert_eq!(order, vec![2, 4, 1, 3]);
    }

    #[test]
    fn plain_push_inherits_tail_priority() {
        let mut s: Store<u32> = Store::new("q");
        s.push_sorted(1, -3);
        s.push_tail(2); // inherits -3
        s.push_sorted(3, -3); // stable: after the inherited entry
        let order: Vec<u32> = std::iter::from_fn(|| s.try_pull()).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn empty_store_pulls_nothing() {
        let mut s: Store<u32> = Store::new("q");
        assert!(s.try_pull().is_none());
        s.push_tail(9);
        assert_eq!(s.try_pull(), Some(9));
        assert!(s.is_empty());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn sorted_pushes_drain_in_stable_priority_order(
                prios in proptest::collection::vec(-3i32..=0, 1..40),
            ) {
                let mut s: Store<usize> = Store::new("q");
                for (i, p) in prios.iter().enumerate() {
                    s.push_sorted(i, *p);
                }
                let drained: Vec<usize> = std::iter::from_fn(|| s.try_pull()).collect();
                // Priorities come out sorted, and equal priorities keep
                // their insertion order.
                let sorted_stable = drained.windows(2).all(|w| {
                    prios[w[0]] < prios[w[1]] || (prios[w[0]] == prios[w[1]] && w[0] < w[1])
                });
                prop_assert!(sorted_stable);
            }
        }
    }
}
