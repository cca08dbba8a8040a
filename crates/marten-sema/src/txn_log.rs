// txn_log.rs
//
// TxnLog: journal of node mutations so a failed unification attempt can be
// rolled back without unwinding.

use crate::type_graph::{PackId, PackNode, TypeGraph, TypeId, TypeNode};

/// One recorded snapshot: the node's identity and its variant before the
/// mutation.
#[derive(Debug, Clone)]
enum LogEntry {
    Type(TypeId, TypeNode),
    Pack(PackId, PackNode),
}

/// Journal of every mutation a unifier performs.
///
/// Snapshots are taken *before* the write. `rollback` restores them in
/// reverse order, so overlapping records of the same node compose correctly.
/// A child unifier owns its own log; on success the parent `concat`s it
/// (taking over rollback responsibility), on failure the child rolls back
/// before returning.
#[derive(Debug, Default)]
pub struct TxnLog {
    entries: Vec<LogEntry>,
}

impl TxnLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot a type node's current variant. Call immediately before
    /// mutating it.
    pub fn record_type(&mut self, graph: &TypeGraph, id: TypeId) {
        self.entries.push(LogEntry::Type(id, graph.get(id).clone()));
    }

    /// Snapshot a pack node's current variant.
    pub fn record_pack(&mut self, graph: &TypeGraph, id: PackId) {
        self.entries.push(LogEntry::Pack(id, graph.pack(id).clone()));
    }

    /// Restore every snapshot in reverse order, emptying the log.
    pub fn rollback(&mut self, graph: &mut TypeGraph) {
        for entry in self.entries.drain(..).rev() {
            match entry {
                LogEntry::Type(id, node) => *graph.get_mut(id) = node,
                LogEntry::Pack(id, node) => *graph.pack_mut(id) = node,
            }
        }
    }

    /// Append another log's entries, transferring rollback responsibility.
    pub fn concat(&mut self, other: TxnLog) {
        self.entries.extend(other.entries);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_graph::TypeLevel;

    #[test]
    fn rollback_restores_in_reverse_order() {
        let mut graph = TypeGraph::new();
        let free = graph.fresh_type(TypeLevel::default());
        let mut log = TxnLog::new();

        // Two successive overwrites of the same node.
        log.record_type(&graph, free);
        *graph.get_mut(free) = TypeNode::Bound(TypeId::NUMBER);
        log.record_type(&graph, free);
        *graph.get_mut(free) = TypeNode::Error;

        log.rollback(&mut graph);
        assert!(matches!(graph.get(free), TypeNode::Free { .. }));
        assert!(log.is_empty());
    }

    #[test]
    fn concat_transfers_entries() {
        let mut graph = TypeGraph::new();
        let free = graph.fresh_type(TypeLevel::default());

        let mut child = TxnLog::new();
        child.record_type(&graph, free);
        *graph.get_mut(free) = TypeNode::Bound(TypeId::STRING);

        let mut parent = TxnLog::new();
        parent.concat(child);
        assert_eq!(parent.len(), 1);

        parent.rollback(&mut graph);
        assert!(matches!(graph.get(free), TypeNode::Free { .. }));
    }

    #[test]
    fn pack_snapshots_roundtrip() {
        let mut graph = TypeGraph::new();
        let free = graph.fresh_pack(TypeLevel::default());
        let mut log = TxnLog::new();

        log.record_pack(&graph, free);
        *graph.pack_mut(free) = PackNode::Bound(PackId::ERROR);

        log.rollback(&mut graph);
        assert!(matches!(graph.pack(free), PackNode::Free { .. }));
    }
}
