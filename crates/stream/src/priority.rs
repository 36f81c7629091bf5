//! RFC 7540 §5.3 stream dependency tree with weighted-fair-queueing
//! scheduling across the ready set.
//!
//! Nodes are keyed by [`StreamId`] and reference their parent by id, never
//! by an owning back-pointer, so the tree can be pruned independently of
//! whatever owns the actual `Stream` state.

use indexmap::IndexMap;
use nyx_proto::StreamId;

use crate::PriorityInfo;

const ROOT: StreamId = StreamId::CONNECTION;

#[derive(Debug, Clone)]
struct Node {
    parent: StreamId,
    weight: u16,
    /// Deficit-round-robin credit accumulated between scheduling passes.
    deficit: i64,
}

/// The dependency tree plus a deficit-round-robin scheduler over whatever
/// subset of its streams currently has data ready to send.
#[derive(Debug, Default)]
pub struct PriorityTree {
    nodes: IndexMap<StreamId, Node>,
}

impl PriorityTree {
    /// A fresh, empty tree (only the implicit root at stream 0).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or reprioritize `stream_id` per `priority`.
    ///
    /// If `priority.exclusive` is set, `stream_id` takes its new parent's
    /// other children as its own children (RFC 7540 §5.3.1).
    pub fn set_priority(&mut self, stream_id: StreamId, priority: PriorityInfo) {
        let parent = if priority.dependency == stream_id {
            // A stream cannot depend on itself; treat as a dependency on
            // the root, per RFC 7540 §5.3.1.
            ROOT
        } else {
            priority.dependency
        };

        if priority.exclusive {
            for (id, node) in self.nodes.iter_mut() {
                if *id != stream_id && node.parent == parent {
                    node.parent = stream_id;
                }
            }
        }

        self.nodes.insert(
            stream_id,
            Node {
                parent,
                weight: priority.weight,
                deficit: 0,
            },
        );
    }

    /// Remove a closed stream, reparenting its children onto its own
    /// parent (RFC 7540 §5.3.4) so the tree's shape survives churn.
    pub fn remove(&mut self, stream_id: StreamId) {
        let Some(removed) = self.nodes.shift_remove(&stream_id) else {
            return;
        };
        for node in self.nodes.values_mut() {
            if node.parent == stream_id {
                node.parent = removed.parent;
            }
        }
    }

    /// Parent of `stream_id`, if tracked.
    #[must_use]
    pub fn parent_of(&self, stream_id: StreamId) -> Option<StreamId> {
        self.nodes.get(&stream_id).map(|n| n.parent)
    }

    /// Pick the next stream to service from `ready`, a deficit-round-robin
    /// pass weighted by each stream's RFC 7540 weight.
    ///
    /// Streams not yet known to the tree are treated as weight-16 direct
    /// children of the root (the RFC 7540 default).
    pub fn next_ready(&mut self, ready: &[StreamId]) -> Option<StreamId> {
        if ready.is_empty() {
            return None;
        }
        loop {
            let mut best: Option<(StreamId, i64)> = None;
            for &id in ready {
                let weight = i64::from(self.nodes.get(&id).map_or(16, |n| n.weight));
                let entry = self.nodes.entry(id).or_insert(Node {
                    parent: ROOT,
                    weight: 16,
                    deficit: 0,
                });
                entry.deficit += weight;
                if best.is_none_or(|(_, d)| entry.deficit > d) {
                    best = Some((id, entry.deficit));
                }
            }
            let (winner, deficit) = best.expect("ready is non-empty");
            if deficit >= 256 {
                if let Some(node) = self.nodes.get_mut(&winner) {
                    node.deficit -= 256;
                }
                return Some(winner);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prio(dependency: u64, weight: u16, exclusive: bool) -> PriorityInfo {
        PriorityInfo {
            exclusive,
            dependency: StreamId(dependency),
            weight,
        }
    }

    #[test]
    fn exclusive_reparents_siblings() {
        let mut tree = PriorityTree::new();
        tree.set_priority(StreamId(1), prio(0, 16, false));
        tree.set_priority(StreamId(3), prio(0, 16, false));
        tree.set_priority(StreamId(5), prio(0, 16, true));
        assert_eq!(tree.parent_of(StreamId(1)), Some(StreamId(5)));
        assert_eq!(tree.parent_of(StreamId(3)), Some(StreamId(5)));
        assert_eq!(tree.parent_of(StreamId(5)), Some(StreamId::CONNECTION));
    }

    #[test]
    fn removal_reparents_children_to_grandparent() {
        let mut tree = PriorityTree::new();
        tree.set_priority(StreamId(1), prio(0, 16, false));
        tree.set_priority(StreamId(3), prio(1, 16, false));
        tree.remove(StreamId(1));
        assert_eq!(tree.parent_of(StreamId(3)), Some(StreamId::CONNECTION));
    }

    #[test]
    fn self_dependency_falls_back_to_root() {
        let mut tree = PriorityTree::new();
        tree.set_priority(StreamId(1), prio(1, 16, false));
        assert_eq!(tree.parent_of(StreamId(1)), Some(StreamId::CONNECTION));
    }

    #[test]
    fn heavier_weight_gets_serviced_more_often() {
        let mut tree = PriorityTree::new();
        tree.set_priority(StreamId(1), prio(0, 256, false));
        tree.set_priority(StreamId(3), prio(0, 32, false));
        let ready = [StreamId(1), StreamId(3)];
        let mut counts = std::collections::HashMap::new();
        for _ in 0..90 {
            let winner = tree.next_ready(&ready).unwrap();
            *counts.entry(winner).or_insert(0) += 1;
        }
        assert!(counts[&StreamId(1)] > counts[&StreamId(3)] * 2);
    }

    #[test]
    fn unknown_stream_defaults_to_weight_sixteen() {
        let mut tree = PriorityTree::new();
        let winner = tree.next_ready(&[StreamId(9)]);
        assert_eq!(winner, Some(StreamId(9)));
    }
}
