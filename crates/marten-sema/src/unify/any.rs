// unify/any.rs
//
// Propagation of `any` and the error sentinel: every free node reachable
// from the other side gets bound so inference stops asking about it.

use rustc_hash::FxHashSet;

use crate::type_graph::{PackId, PackNode, TypeId, TypeNode};

use super::Unifier;

impl Unifier<'_> {
    /// One side is `any` or the error sentinel; settle every free node
    /// reachable from `ty`.
    pub(crate) fn unify_with_any_ty(&mut self, any_ty: TypeId, ty: TypeId) {
        debug_assert!(matches!(
            self.graph.get(any_ty),
            TypeNode::Any | TypeNode::Error
        ));

        // Primitives, any, and classes contain no free nodes to settle.
        if matches!(
            self.graph.get(ty),
            TypeNode::Primitive(_) | TypeNode::Any | TypeNode::Class(_)
        ) {
            return;
        }

        let driver_is_any = matches!(self.graph.get(any_ty), TypeNode::Any);
        let any_target = if driver_is_any { TypeId::ANY } else { TypeId::ERROR };
        let any_pack = if driver_is_any { PackId::ANY } else { PackId::ERROR };

        let mut seen_types = std::mem::take(&mut self.shared.scratch_seen_types);
        let mut seen_packs = std::mem::take(&mut self.shared.scratch_seen_packs);
        seen_types.clear();
        seen_packs.clear();

        let mut queue = vec![ty];
        self.propagate_any(&mut queue, &mut seen_types, &mut seen_packs, any_target, any_pack);

        self.shared.scratch_seen_types = seen_types;
        self.shared.scratch_seen_packs = seen_packs;
    }

    /// The pack analogue: the driver is the error pack sentinel.
    pub(crate) fn unify_with_any_tp(&mut self, any_tp: PackId, tp: PackId) {
        debug_assert!(matches!(self.graph.pack(any_tp), PackNode::Error));

        let mut seen_types = std::mem::take(&mut self.shared.scratch_seen_types);
        let mut seen_packs = std::mem::take(&mut self.shared.scratch_seen_packs);
        seen_types.clear();
        seen_packs.clear();

        let mut queue = Vec::new();
        self.queue_type_pack(&mut queue, &mut seen_packs, tp, any_tp);
        self.propagate_any(&mut queue, &mut seen_types, &mut seen_packs, TypeId::ERROR, any_tp);

        self.shared.scratch_seen_types = seen_types;
        self.shared.scratch_seen_packs = seen_packs;
    }

    /// Worklist walk binding every reachable free type to `any_target` and
    /// every reachable free pack to `any_pack`. Each node is visited once.
    fn propagate_any(
        &mut self,
        queue: &mut Vec<TypeId>,
        seen_types: &mut FxHashSet<TypeId>,
        seen_packs: &mut FxHashSet<PackId>,
        any_target: TypeId,
        any_pack: PackId,
    ) {
        while let Some(ty) = queue.pop() {
            let ty = self.graph.follow(ty);
            if !seen_types.insert(ty) {
                continue;
            }

            match self.graph.get(ty) {
                TypeNode::Free { .. } => {
                    self.record_ty(ty);
                    *self.graph.get_mut(ty) = TypeNode::Bound(any_target);
                }
                TypeNode::Function(f) => {
                    let (arg, ret) = (f.arg_pack, f.ret_pack);
                    self.queue_type_pack(queue, seen_packs, arg, any_pack);
                    self.queue_type_pack(queue, seen_packs, ret, any_pack);
                }
                TypeNode::Table(t) => {
                    let props: Vec<TypeId> = t.props.values().map(|p| p.ty).collect();
                    let indexer = t.indexer;
                    queue.extend(props);
                    if let Some(indexer) = indexer {
                        queue.push(indexer.index_ty);
                        queue.push(indexer.result_ty);
                    }
                }
                TypeNode::Metatable { table, metatable } => {
                    let (t, m) = (*table, *metatable);
                    queue.push(t);
                    queue.push(m);
                }
                TypeNode::Union { options } => {
                    let options = options.clone();
                    queue.extend(options);
                }
                TypeNode::Intersection { parts } => {
                    let parts = parts.clone();
                    queue.extend(parts);
                }
                // Primitives, singletons, any, errors, generics and classes
                // are left untouched.
                _ => {}
            }
        }
    }

    /// Queue a pack's head elements for the walk; a free pack (or free tail)
    /// is bound to `any_pack` on the spot.
    fn queue_type_pack(
        &mut self,
        queue: &mut Vec<TypeId>,
        seen_packs: &mut FxHashSet<PackId>,
        tp: PackId,
        any_pack: PackId,
    ) {
        let mut tp = tp;
        loop {
            tp = self.graph.follow_pack(tp);
            if !seen_packs.insert(tp) {
                break;
            }

            match self.graph.pack(tp) {
                PackNode::Free { .. } => {
                    self.record_tp(tp);
                    *self.graph.pack_mut(tp) = PackNode::Bound(any_pack);
                    break;
                }
                PackNode::Pack { head, tail } => {
                    let tail = *tail;
                    queue.extend(head.iter().copied());
                    match tail {
                        Some(tail) => tp = tail,
                        None => break,
                    }
                }
                _ => break,
            }
        }
    }
}
