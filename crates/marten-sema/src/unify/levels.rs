// unify/levels.rs
//
// Deep level promotion: binding a free variable to a type pulls every level
// inside that type out to the free variable's level.

use rustc_hash::FxHashSet;

use crate::type_graph::{PackId, PackNode, TypeId, TypeLevel, TypeNode};

use super::Unifier;

enum Item {
    Ty(TypeId),
    Tp(PackId),
}

impl Unifier<'_> {
    /// Walk everything reachable from `ty` once, dropping any level that the
    /// new minimum strictly subsumes.
    pub(crate) fn promote_type_levels(&mut self, min_level: TypeLevel, ty: TypeId) {
        self.promote_levels_walk(min_level, Item::Ty(ty));
    }

    /// The pack analogue of [`promote_type_levels`](Self::promote_type_levels).
    pub(crate) fn promote_pack_levels(&mut self, min_level: TypeLevel, tp: PackId) {
        self.promote_levels_walk(min_level, Item::Tp(tp));
    }

    fn promote_levels_walk(&mut self, min_level: TypeLevel, start: Item) {
        let mut seen_types: FxHashSet<TypeId> = FxHashSet::default();
        let mut seen_packs: FxHashSet<PackId> = FxHashSet::default();
        let mut queue = vec![start];

        while let Some(item) = queue.pop() {
            match item {
                Item::Ty(ty) => {
                    let ty = self.graph.follow(ty);
                    if !seen_types.insert(ty) {
                        continue;
                    }
                    match self.graph.get(ty) {
                        TypeNode::Free { level } => {
                            if min_level.subsumes_strict(*level) {
                                self.record_ty(ty);
                                *self.graph.get_mut(ty) = TypeNode::Free { level: min_level };
                            }
                        }
                        TypeNode::Function(f) => {
                            let (arg, ret, level) = (f.arg_pack, f.ret_pack, f.level);
                            if min_level.subsumes_strict(level) {
                                self.record_ty(ty);
                                if let TypeNode::Function(f) = self.graph.get_mut(ty) {
                                    f.level = min_level;
                                }
                            }
                            queue.push(Item::Tp(arg));
                            queue.push(Item::Tp(ret));
                        }
                        TypeNode::Table(t) => {
                            let level = t.level;
                            let props: Vec<TypeId> = t.props.values().map(|p| p.ty).collect();
                            let indexer = t.indexer;
                            if min_level.subsumes_strict(level) {
                                self.record_ty(ty);
                                if let TypeNode::Table(t) = self.graph.get_mut(ty) {
                                    t.level = min_level;
                                }
                            }
                            queue.extend(props.into_iter().map(Item::Ty));
                            if let Some(indexer) = indexer {
                                queue.push(Item::Ty(indexer.index_ty));
                                queue.push(Item::Ty(indexer.result_ty));
                            }
                        }
                        TypeNode::Metatable { table, metatable } => {
                            let (t, m) = (*table, *metatable);
                            queue.push(Item::Ty(t));
                            queue.push(Item::Ty(m));
                        }
                        TypeNode::Union { options } => {
                            let options = options.clone();
                            queue.extend(options.into_iter().map(Item::Ty));
                        }
                        TypeNode::Intersection { parts } => {
                            let parts = parts.clone();
                            queue.extend(parts.into_iter().map(Item::Ty));
                        }
                        // Primitives, singletons, generics, classes, any and
                        // error carry no promotable levels.
                        _ => {}
                    }
                }
                Item::Tp(tp) => {
                    let tp = self.graph.follow_pack(tp);
                    if !seen_packs.insert(tp) {
                        continue;
                    }
                    match self.graph.pack(tp) {
                        PackNode::Free { level } => {
                            if min_level.subsumes_strict(*level) {
                                self.record_tp(tp);
                                *self.graph.pack_mut(tp) = PackNode::Free { level: min_level };
                            }
                        }
                        PackNode::Pack { head, tail } => {
                            let head = head.clone();
                            let tail = *tail;
                            queue.extend(head.into_iter().map(Item::Ty));
                            if let Some(tail) = tail {
                                queue.push(Item::Tp(tail));
                            }
                        }
                        PackNode::Variadic { ty } => {
                            let ty = *ty;
                            queue.push(Item::Ty(ty));
                        }
                        _ => {}
                    }
                }
            }
        }
    }
}
