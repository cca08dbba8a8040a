// unify/packs.rs
//
// Pack unification: walking two pack ropes in lockstep, growing free tails,
// and variadic handling.

use crate::errors::{CountContext, TypeErrorKind};
use crate::txn_log::TxnLog;
use crate::type_graph::{PackId, PackNode, TypeGraph, TypeId, TypeIdVec, TypeLevel, TypeNode};
use crate::type_utils::is_optional;

use super::Unifier;

/// Cursor over one pack rope. Tracks the current segment and index; when the
/// rope runs out and its tail is free, the cursor can bind that tail to a
/// fresh segment and keep producing elements.
struct PackIter {
    pack_id: PackId,
    index: usize,
    growing: bool,
    /// Level of the free tail this cursor grew through; fresh elements are
    /// allocated at this level.
    level: TypeLevel,
}

impl PackIter {
    fn new(graph: &TypeGraph, pack_id: PackId) -> Self {
        let mut it = Self {
            pack_id: graph.follow_pack(pack_id),
            index: 0,
            growing: false,
            level: TypeLevel::default(),
        };
        // Skip leading empty segments.
        loop {
            match graph.pack(it.pack_id) {
                PackNode::Pack { head, tail: Some(tail) } if head.is_empty() => {
                    it.pack_id = graph.follow_pack(*tail);
                }
                _ => break,
            }
        }
        it
    }

    fn good(&self, graph: &TypeGraph) -> bool {
        matches!(graph.pack(self.pack_id), PackNode::Pack { head, .. } if self.index < head.len())
    }

    fn current(&self, graph: &TypeGraph) -> TypeId {
        match graph.pack(self.pack_id) {
            PackNode::Pack { head, .. } => head[self.index],
            _ => unreachable!("current() on an exhausted pack cursor"),
        }
    }

    fn advance(&mut self, graph: &TypeGraph) {
        let (head_len, tail) = match graph.pack(self.pack_id) {
            PackNode::Pack { head, tail } => (head.len(), *tail),
            _ => return,
        };
        if self.index < head_len {
            self.index += 1;
        }
        if self.growing || self.index < head_len {
            return;
        }
        if let Some(tail) = tail {
            self.pack_id = graph.follow_pack(tail);
            self.index = 0;
        }
    }

    /// True when the cursor is stuck at a free tail that could be grown.
    fn can_grow(&self, graph: &TypeGraph) -> bool {
        matches!(graph.pack(self.pack_id), PackNode::Free { .. })
    }

    /// Bind the free tail to `new_tail` and continue producing from it.
    fn grow(&mut self, graph: &mut TypeGraph, log: &mut TxnLog, new_tail: PackId) {
        if let PackNode::Free { level } = graph.pack(self.pack_id) {
            self.level = *level;
        }
        log.record_pack(graph, self.pack_id);
        *graph.pack_mut(self.pack_id) = PackNode::Bound(new_tail);
        self.pack_id = new_tail;
        self.index = 0;
        self.growing = true;
    }

    /// Append a fresh element to the (grown) current segment.
    fn push_head(&self, graph: &mut TypeGraph, log: &mut TxnLog, ty: TypeId) {
        log.record_pack(graph, self.pack_id);
        if let PackNode::Pack { head, .. } = graph.pack_mut(self.pack_id) {
            head.push(ty);
        }
    }
}

impl Unifier<'_> {
    pub(crate) fn unify_tp(&mut self, super_tp: PackId, sub_tp: PackId, is_function_call: bool) {
        self.enter_recursion_pack();
        self.unify_tp_inner(super_tp, sub_tp, is_function_call);
        self.exit_recursion_pack();
    }

    fn enter_recursion_pack(&mut self) {
        self.shared.counters.recursion_count += 1;
        if self.shared.counters.recursion_count > self.options.recursion_limit {
            self.ice("exceeded recursion depth limit during pack unification");
        }
    }

    fn exit_recursion_pack(&mut self) {
        self.shared.counters.recursion_count -= 1;
    }

    fn unify_tp_inner(&mut self, super_tp: PackId, sub_tp: PackId, is_function_call: bool) {
        self.shared.counters.iteration_count += 1;
        if self.options.iteration_limit > 0
            && self.shared.counters.iteration_count > self.options.iteration_limit
        {
            self.error(TypeErrorKind::UnificationTooComplex);
            return;
        }

        let mut super_tp = self.graph.follow_pack(super_tp);
        let mut sub_tp = self.graph.follow_pack(sub_tp);

        // Strip leading empty segments so a wrapper pack compares equal to
        // its payload.
        loop {
            match self.graph.pack(sub_tp) {
                PackNode::Pack { head, tail: Some(tail) } if head.is_empty() => {
                    sub_tp = self.graph.follow_pack(*tail);
                }
                _ => break,
            }
        }
        loop {
            match self.graph.pack(super_tp) {
                PackNode::Pack { head, tail: Some(tail) } if head.is_empty() => {
                    super_tp = self.graph.follow_pack(*tail);
                }
                _ => break,
            }
        }

        if super_tp == sub_tp {
            return;
        }

        if let PackNode::Free { level } = self.graph.pack(super_tp) {
            let level = *level;
            self.occurs_check_tp(super_tp, sub_tp);

            if !matches!(self.graph.pack(super_tp), PackNode::Error) {
                if self.options.proper_type_levels {
                    self.promote_pack_levels(level, sub_tp);
                }
                self.record_tp(super_tp);
                *self.graph.pack_mut(super_tp) = PackNode::Bound(sub_tp);
            }
            return;
        }
        if let PackNode::Free { level } = self.graph.pack(sub_tp) {
            let level = *level;
            self.occurs_check_tp(sub_tp, super_tp);

            if !matches!(self.graph.pack(sub_tp), PackNode::Error) {
                if self.options.proper_type_levels {
                    self.promote_pack_levels(level, super_tp);
                }
                self.record_tp(sub_tp);
                *self.graph.pack_mut(sub_tp) = PackNode::Bound(super_tp);
            }
            return;
        }

        if matches!(self.graph.pack(super_tp), PackNode::Error) {
            return self.unify_with_any_tp(super_tp, sub_tp);
        }
        if matches!(self.graph.pack(sub_tp), PackNode::Error) {
            return self.unify_with_any_tp(sub_tp, super_tp);
        }

        if matches!(self.graph.pack(super_tp), PackNode::Variadic { .. }) {
            return self.unify_variadics(super_tp, sub_tp, false, 0);
        }
        if matches!(self.graph.pack(sub_tp), PackNode::Variadic { .. }) {
            return self.unify_variadics(sub_tp, super_tp, true, 0);
        }

        let super_is_pack = matches!(self.graph.pack(super_tp), PackNode::Pack { .. });
        let sub_is_pack = matches!(self.graph.pack(sub_tp), PackNode::Pack { .. });
        if super_is_pack && sub_is_pack {
            self.unify_finite_packs(super_tp, sub_tp, is_function_call);
        } else {
            self.error(TypeErrorKind::GenericError {
                message: "failed to unify type packs".to_string(),
            });
        }
    }

    /// Walk two rope-like packs, unifying corresponding elements. If one side
    /// is shorter but ends in a free tail, the tail is grown to the required
    /// length.
    fn unify_finite_packs(&mut self, super_tp: PackId, sub_tp: PackId, is_function_call: bool) {
        let super_first_tail = match self.graph.pack(super_tp) {
            PackNode::Pack { tail, .. } => *tail,
            _ => None,
        };
        let sub_first_tail = match self.graph.pack(sub_tp) {
            PackNode::Pack { tail, .. } => *tail,
            _ => None,
        };

        // If the head sizes differ but both packs have free tails, growing
        // would oscillate forever; a sentinel disables it.
        let (super_flat, super_tail) = self.graph.flatten_pack(super_tp);
        let (sub_flat, sub_tail) = self.graph.flatten_pack(sub_tp);
        let no_infinite_growth = super_flat.len() != sub_flat.len()
            && super_tail
                .is_some_and(|t| matches!(self.graph.pack(t), PackNode::Free { .. }))
            && sub_tail.is_some_and(|t| matches!(self.graph.pack(t), PackNode::Free { .. }));

        let mut super_iter = PackIter::new(self.graph, super_tp);
        let mut sub_iter = PackIter::new(self.graph, sub_tp);

        let empty_tp = self.graph.add_pack(PackNode::Pack {
            head: TypeIdVec::new(),
            tail: None,
        });

        let mut loop_count = 0usize;

        loop {
            loop_count += 1;
            if loop_count > self.options.pack_growth_limit {
                self.ice("detected possibly infinite type pack growth");
            }

            if super_iter.good(self.graph) && sub_iter.growing {
                let fresh = self.graph.fresh_type(sub_iter.level);
                sub_iter.push_head(self.graph, &mut self.log, fresh);
            }
            if sub_iter.good(self.graph) && super_iter.growing {
                let fresh = self.graph.fresh_type(super_iter.level);
                super_iter.push_head(self.graph, &mut self.log, fresh);
            }

            if super_iter.good(self.graph) && sub_iter.good(self.graph) {
                let a = super_iter.current(self.graph);
                let b = sub_iter.current(self.graph);
                self.unify_ty(a, b, false, false);

                if self.options.extended_function_mismatch_error
                    && !self.errors.is_empty()
                    && self.first_pack_error_pos.is_none()
                {
                    self.first_pack_error_pos = Some(loop_count);
                }

                super_iter.advance(self.graph);
                sub_iter.advance(self.graph);
                if no_infinite_growth {
                    break;
                }
                continue;
            }

            // Both exhausted: deal with the tails and stop.
            if !super_iter.good(self.graph) && !sub_iter.good(self.graph) {
                let tail_is_free = |graph: &TypeGraph, tail: Option<PackId>| {
                    tail.is_some_and(|t| {
                        matches!(graph.pack(graph.follow_pack(t)), PackNode::Free { .. })
                    })
                };
                let l_free = tail_is_free(self.graph, super_first_tail);
                let r_free = tail_is_free(self.graph, sub_first_tail);

                if l_free && r_free {
                    self.unify_tp(super_first_tail.unwrap(), sub_first_tail.unwrap(), false);
                } else if l_free {
                    self.unify_tp(super_first_tail.unwrap(), empty_tp, false);
                } else if r_free {
                    self.unify_tp(sub_first_tail.unwrap(), empty_tp, false);
                }
                break;
            }

            // Both stuck at free tails: bind one to the other and be done.
            if super_iter.can_grow(self.graph) && sub_iter.can_grow(self.graph) {
                return self.unify_tp(super_iter.pack_id, sub_iter.pack_id, false);
            }

            // One side is free on its tail: grow it to fit the other.
            if super_iter.can_grow(self.graph) {
                let fresh = self.graph.add_pack(PackNode::Pack {
                    head: TypeIdVec::new(),
                    tail: None,
                });
                super_iter.grow(self.graph, &mut self.log, fresh);
            } else if sub_iter.can_grow(self.graph) {
                let fresh = self.graph.add_pack(PackNode::Pack {
                    head: TypeIdVec::new(),
                    tail: None,
                });
                sub_iter.grow(self.graph, &mut self.log, fresh);
            } else {
                // A trailing optional marks an argument that may be absent.
                if super_iter.good(self.graph)
                    && is_optional(self.graph, super_iter.current(self.graph))
                {
                    super_iter.advance(self.graph);
                    if no_infinite_growth {
                        break;
                    }
                    continue;
                }
                if sub_iter.good(self.graph)
                    && is_optional(self.graph, sub_iter.current(self.graph))
                {
                    sub_iter.advance(self.graph);
                    if no_infinite_growth {
                        break;
                    }
                    continue;
                }
                // In nonstrict mode `any` marks an optional argument too.
                if super_iter.good(self.graph) && self.is_nonstrict() {
                    let current = self.graph.follow(super_iter.current(self.graph));
                    if matches!(self.graph.get(current), TypeNode::Any) {
                        super_iter.advance(self.graph);
                        if no_infinite_growth {
                            break;
                        }
                        continue;
                    }
                }

                if matches!(self.graph.pack(super_iter.pack_id), PackNode::Variadic { .. }) {
                    return self.unify_variadics(
                        super_iter.pack_id,
                        sub_iter.pack_id,
                        false,
                        sub_iter.index,
                    );
                }
                if matches!(self.graph.pack(sub_iter.pack_id), PackNode::Variadic { .. }) {
                    return self.unify_variadics(
                        sub_iter.pack_id,
                        super_iter.pack_id,
                        true,
                        super_iter.index,
                    );
                }

                if !is_function_call && sub_iter.good(self.graph) {
                    // Providing more values than consumed is tolerated
                    // outside call sites.
                    return;
                }

                // We only know supertype vs subtype here, not expected vs
                // actual; return packs swap the two so messages read
                // naturally.
                let mut expected = self.graph.pack_size(sub_tp);
                let mut actual = self.graph.pack_size(super_tp);
                if self.ctx == CountContext::Result {
                    std::mem::swap(&mut expected, &mut actual);
                }
                let context = self.ctx;
                self.error(TypeErrorKind::CountMismatch {
                    expected,
                    actual,
                    context,
                });

                // Leftover elements are settled with the error type so the
                // surrounding inference doesn't see them as free.
                while super_iter.good(self.graph) {
                    let t = super_iter.current(self.graph);
                    self.unify_ty(TypeId::ERROR, t, false, false);
                    super_iter.advance(self.graph);
                }
                while sub_iter.good(self.graph) {
                    let t = sub_iter.current(self.graph);
                    self.unify_ty(TypeId::ERROR, t, false, false);
                    sub_iter.advance(self.graph);
                }
                return;
            }

            if no_infinite_growth {
                break;
            }
        }
    }

    /// Unify a variadic pack against another pack. `sub_offset` skips
    /// elements of `sub_tp` already consumed by the caller; `reversed`
    /// restores the caller's supertype/subtype orientation.
    pub(crate) fn unify_variadics(
        &mut self,
        super_tp: PackId,
        sub_tp: PackId,
        reversed: bool,
        sub_offset: usize,
    ) {
        let variadic_ty = match self.graph.pack(super_tp) {
            PackNode::Variadic { ty } => *ty,
            _ => self.ice("passed non-variadic pack to unify_variadics"),
        };

        match self.graph.pack(sub_tp) {
            PackNode::Variadic { ty } => {
                let ty = *ty;
                if reversed {
                    self.unify_ty(ty, variadic_ty, false, false);
                } else {
                    self.unify_ty(variadic_ty, ty, false, false);
                }
            }
            PackNode::Pack { .. } => {
                let (elements, tail) = self.graph.flatten_pack(sub_tp);
                for &ty in elements.iter().skip(sub_offset) {
                    if reversed {
                        self.unify_ty(ty, variadic_ty, false, false);
                    } else {
                        self.unify_ty(variadic_ty, ty, false, false);
                    }
                }

                if let Some(tail) = tail {
                    let tail = self.graph.follow_pack(tail);
                    match self.graph.pack(tail) {
                        PackNode::Free { .. } => {
                            self.record_tp(tail);
                            *self.graph.pack_mut(tail) = PackNode::Bound(super_tp);
                        }
                        PackNode::Variadic { ty } => {
                            let ty = *ty;
                            self.unify_ty(variadic_ty, ty, false, false);
                        }
                        PackNode::Generic => {
                            self.error(TypeErrorKind::GenericError {
                                message: "cannot unify variadic and generic packs".to_string(),
                            });
                        }
                        PackNode::Error => {}
                        _ => self.ice("unknown type pack kind in variadic tail"),
                    }
                }
            }
            _ => {
                self.error(TypeErrorKind::GenericError {
                    message: "failed to unify variadic packs".to_string(),
                });
            }
        }
    }
}
