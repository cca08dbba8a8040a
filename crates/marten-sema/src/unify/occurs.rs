// unify/occurs.rs
//
// The occurs check: a free variable must not appear inside the type it is
// about to be bound to. A violation replaces the free node with the error
// sentinel so inference can continue.

use rustc_hash::FxHashSet;

use crate::errors::TypeErrorKind;
use crate::type_graph::{PackId, PackNode, TypeId, TypeNode};

use super::Unifier;

impl Unifier<'_> {
    pub(crate) fn occurs_check_ty(&mut self, needle: TypeId, haystack: TypeId) {
        let mut seen = std::mem::take(&mut self.shared.scratch_seen_types);
        seen.clear();
        self.occurs_check_ty_inner(&mut seen, needle, haystack, 0);
        self.shared.scratch_seen_types = seen;
    }

    fn occurs_check_ty_inner(
        &mut self,
        seen: &mut FxHashSet<TypeId>,
        needle: TypeId,
        haystack: TypeId,
        depth: usize,
    ) {
        if depth > self.options.recursion_limit {
            self.error(TypeErrorKind::UnificationTooComplex);
            return;
        }

        let needle = self.graph.follow(needle);
        let haystack = self.graph.follow(haystack);

        if !seen.insert(haystack) {
            return;
        }

        if matches!(self.graph.get(needle), TypeNode::Error) {
            return;
        }
        if !matches!(self.graph.get(needle), TypeNode::Free { .. }) {
            self.ice("occurs check needle must be a free type");
        }

        if needle == haystack {
            self.error(TypeErrorKind::OccursCheckFailed);
            self.record_ty(needle);
            *self.graph.get_mut(needle) = TypeNode::Error;
            return;
        }

        match self.graph.get(haystack) {
            TypeNode::Free { .. } => {}
            TypeNode::Function(f) => {
                // A recursive function type `t = (t) -> t` is legal when the
                // option says so; then argument and return positions are not
                // traversed.
                if !self.options.occurs_check_ok_with_recursive_functions {
                    let (arg_pack, ret_pack) = (f.arg_pack, f.ret_pack);
                    let (args, _) = self.graph.flatten_pack(arg_pack);
                    let (rets, _) = self.graph.flatten_pack(ret_pack);
                    for ty in args.into_iter().chain(rets) {
                        self.occurs_check_ty_inner(seen, needle, ty, depth + 1);
                    }
                }
            }
            TypeNode::Union { options } => {
                let options = options.clone();
                for ty in options {
                    self.occurs_check_ty_inner(seen, needle, ty, depth + 1);
                }
            }
            TypeNode::Intersection { parts } => {
                let parts = parts.clone();
                for ty in parts {
                    self.occurs_check_ty_inner(seen, needle, ty, depth + 1);
                }
            }
            _ => {}
        }
    }

    pub(crate) fn occurs_check_tp(&mut self, needle: PackId, haystack: PackId) {
        let mut seen = std::mem::take(&mut self.shared.scratch_seen_packs);
        seen.clear();
        self.occurs_check_tp_inner(&mut seen, needle, haystack, 0);
        self.shared.scratch_seen_packs = seen;
    }

    fn occurs_check_tp_inner(
        &mut self,
        seen: &mut FxHashSet<PackId>,
        needle: PackId,
        haystack: PackId,
        depth: usize,
    ) {
        if depth > self.options.recursion_limit {
            self.error(TypeErrorKind::UnificationTooComplex);
            return;
        }

        let needle = self.graph.follow_pack(needle);
        let mut haystack = self.graph.follow_pack(haystack);

        if !seen.insert(haystack) {
            return;
        }

        if matches!(self.graph.pack(needle), PackNode::Error) {
            return;
        }
        if !matches!(self.graph.pack(needle), PackNode::Free { .. }) {
            self.ice("occurs check needle must be a free pack");
        }

        loop {
            if matches!(self.graph.pack(haystack), PackNode::Error) {
                return;
            }

            if needle == haystack {
                self.error(TypeErrorKind::OccursCheckFailed);
                self.record_tp(needle);
                *self.graph.pack_mut(needle) = PackNode::Error;
                return;
            }

            let (head, tail) = match self.graph.pack(haystack) {
                PackNode::Pack { head, tail } => (head.clone(), *tail),
                _ => return,
            };

            // Free packs hide inside function signatures carried by the
            // head; chase them unless recursive functions are allowed.
            if !self.options.occurs_check_ok_with_recursive_functions {
                for ty in head {
                    let ty = self.graph.follow(ty);
                    if let TypeNode::Function(f) = self.graph.get(ty) {
                        let (arg_pack, ret_pack) = (f.arg_pack, f.ret_pack);
                        self.occurs_check_tp_inner(seen, needle, arg_pack, depth + 1);
                        self.occurs_check_tp_inner(seen, needle, ret_pack, depth + 1);
                    }
                }
            }

            match tail {
                Some(tail) => {
                    haystack = self.graph.follow_pack(tail);
                    if !seen.insert(haystack) {
                        return;
                    }
                }
                None => return,
            }
        }
    }
}
