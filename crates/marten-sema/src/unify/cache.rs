// unify/cache.rs
//
// The unification cache: remembers proven (super, sub) pairs. Only stable
// types participate; a memoised predicate rules out anything that can still
// change shape.

use rustc_hash::FxHashSet;

use crate::options::Variance;
use crate::type_graph::{PackId, PackNode, TableState, TypeId, TypeNode};

use super::Unifier;

enum Item {
    Ty(TypeId),
    Tp(PackId),
}

impl Unifier<'_> {
    /// Record a successful table unification in the cache, unless either
    /// endpoint is unstable. Invariant proofs are symmetric, so both
    /// orderings are stored.
    pub(crate) fn cache_result(&mut self, super_ty: TypeId, sub_ty: TypeId) {
        if self.skip_cache_for(super_ty) {
            return;
        }
        if self.skip_cache_for(sub_ty) {
            return;
        }

        tracing::debug!(?super_ty, ?sub_ty, "caching proven unification");
        self.shared.cached_unify.insert((super_ty, sub_ty));
        if self.variance == Variance::Invariant {
            self.shared.cached_unify.insert((sub_ty, super_ty));
        }
    }

    /// True when the type transitively contains anything non-stable: a free
    /// or generic variable, a bound link, or a table that is not sealed.
    /// The walk runs at most once per type; the answer is memoised.
    fn skip_cache_for(&mut self, ty: TypeId) -> bool {
        if let Some(&skip) = self.shared.skip_cache_for_type.get(&ty) {
            return skip;
        }

        let mut seen_types: FxHashSet<TypeId> = FxHashSet::default();
        let mut seen_packs: FxHashSet<PackId> = FxHashSet::default();
        let mut queue = vec![Item::Ty(ty)];
        let mut unstable = false;

        // The walk inspects raw nodes: a Bound link itself marks the type
        // unstable, so nothing is followed here.
        while let Some(item) = queue.pop() {
            if unstable {
                break;
            }
            match item {
                Item::Ty(ty) => {
                    if !seen_types.insert(ty) {
                        continue;
                    }
                    if let Some(&memoised) = self.shared.skip_cache_for_type.get(&ty) {
                        if memoised {
                            unstable = true;
                        }
                        continue;
                    }
                    match self.graph.get(ty) {
                        TypeNode::Free { .. }
                        | TypeNode::Bound(_)
                        | TypeNode::Generic { .. } => unstable = true,
                        TypeNode::Table(t) => {
                            if t.bound_to.is_some() || t.state != TableState::Sealed {
                                unstable = true;
                            } else {
                                queue.extend(t.props.values().map(|p| Item::Ty(p.ty)));
                                if let Some(indexer) = t.indexer {
                                    queue.push(Item::Ty(indexer.index_ty));
                                    queue.push(Item::Ty(indexer.result_ty));
                                }
                            }
                        }
                        TypeNode::Function(f) => {
                            queue.extend(f.generics.iter().map(|&g| Item::Ty(g)));
                            queue.extend(f.generic_packs.iter().map(|&g| Item::Tp(g)));
                            queue.push(Item::Tp(f.arg_pack));
                            queue.push(Item::Tp(f.ret_pack));
                        }
                        TypeNode::Metatable { table, metatable } => {
                            queue.push(Item::Ty(*table));
                            queue.push(Item::Ty(*metatable));
                        }
                        TypeNode::Union { options } => {
                            queue.extend(options.iter().map(|&o| Item::Ty(o)));
                        }
                        TypeNode::Intersection { parts } => {
                            queue.extend(parts.iter().map(|&p| Item::Ty(p)));
                        }
                        // Primitives, singletons, classes, any and error are
                        // stable leaves.
                        _ => {}
                    }
                }
                Item::Tp(tp) => {
                    if !seen_packs.insert(tp) {
                        continue;
                    }
                    match self.graph.pack(tp) {
                        PackNode::Free { .. } | PackNode::Bound(_) | PackNode::Generic => {
                            unstable = true;
                        }
                        PackNode::Pack { head, tail } => {
                            queue.extend(head.iter().map(|&t| Item::Ty(t)));
                            if let Some(tail) = tail {
                                queue.push(Item::Tp(*tail));
                            }
                        }
                        PackNode::Variadic { ty } => queue.push(Item::Ty(*ty)),
                        PackNode::Error => {}
                    }
                }
            }
        }

        self.shared.skip_cache_for_type.insert(ty, unstable);
        unstable
    }
}
