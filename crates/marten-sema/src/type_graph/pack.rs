// type_graph/pack.rs
//
// Pack rope helpers: flattening, sizing, and finiteness checks.

use super::graph::TypeGraph;
use super::node::PackNode;
use super::type_id::{PackId, TypeId};

impl TypeGraph {
    /// Flatten a pack rope into its head elements and terminal tail.
    ///
    /// Walks `Pack` segments, following `Bound` links between them. The
    /// returned tail, if any, is a non-`Pack` pack (free, generic, variadic,
    /// or error) after following.
    pub fn flatten_pack(&self, pack: PackId) -> (Vec<TypeId>, Option<PackId>) {
        let mut head = Vec::new();
        let mut current = self.follow_pack(pack);
        loop {
            match self.pack(current) {
                PackNode::Pack { head: seg, tail } => {
                    head.extend(seg.iter().copied());
                    match tail {
                        Some(tail) => current = self.follow_pack(*tail),
                        None => return (head, None),
                    }
                }
                _ => return (head, Some(current)),
            }
        }
    }

    /// Number of head elements in a pack rope.
    pub fn pack_size(&self, pack: PackId) -> usize {
        self.flatten_pack(pack).0.len()
    }

    /// True when the pack has a definite length: it terminates with no tail.
    /// Variadic, free, generic and error tails are all indefinite.
    pub fn pack_finite(&self, pack: PackId) -> bool {
        self.flatten_pack(pack).1.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_graph::TypeLevel;

    #[test]
    fn flatten_follows_segments() {
        let mut graph = TypeGraph::new();
        let inner = graph.pack_of([TypeId::STRING].as_slice());
        let outer = graph.add_pack(PackNode::Pack {
            head: smallvec::smallvec![TypeId::NUMBER],
            tail: Some(inner),
        });
        let (head, tail) = graph.flatten_pack(outer);
        assert_eq!(head, vec![TypeId::NUMBER, TypeId::STRING]);
        assert_eq!(tail, None);
        assert_eq!(graph.pack_size(outer), 2);
        assert!(graph.pack_finite(outer));
    }

    #[test]
    fn flatten_stops_at_free_tail() {
        let mut graph = TypeGraph::new();
        let free = graph.fresh_pack(TypeLevel::default());
        let pack = graph.add_pack(PackNode::Pack {
            head: smallvec::smallvec![TypeId::NUMBER],
            tail: Some(free),
        });
        let (head, tail) = graph.flatten_pack(pack);
        assert_eq!(head, vec![TypeId::NUMBER]);
        assert_eq!(tail, Some(free));
        assert!(!graph.pack_finite(pack));
    }

    #[test]
    fn variadic_is_not_finite() {
        let mut graph = TypeGraph::new();
        let variadic = graph.variadic(TypeId::NUMBER);
        assert!(!graph.pack_finite(variadic));
        assert_eq!(graph.pack_size(variadic), 0);
    }
}
