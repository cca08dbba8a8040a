// unify/shared.rs
//
// State shared by a unifier and all of its children for one session:
// counters, the unification cache, scratch sets, and the panic hook.

use miette::SourceSpan;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::type_graph::{PackId, TypeId};
use crate::well_known::WellKnownNames;

/// Soft-deadline counters. Iteration counts dispatcher steps and is reset
/// per top-level call; recursion tracks the current depth.
#[derive(Debug, Default, Clone, Copy)]
pub struct Counters {
    pub iteration_count: usize,
    pub recursion_count: usize,
}

/// Hook invoked on internal checker errors before panicking.
pub type IceHandler = Box<dyn FnMut(&str, SourceSpan) + Send>;

/// State shared across a unification session.
///
/// A child unifier shares all of this with its parent; only the transaction
/// log and error list are per-unifier.
pub struct SharedState {
    pub counters: Counters,
    /// Proven (super, sub) pairs; both endpoints stable.
    pub cached_unify: FxHashSet<(TypeId, TypeId)>,
    /// Memoised "do not cache this type" predicate results.
    pub skip_cache_for_type: FxHashMap<TypeId, bool>,
    /// Names with special meaning (metatable `__index`).
    pub names: WellKnownNames,

    /// Pairs currently being unified; a re-entry is a cyclic fixpoint and
    /// terminates as success. One logical stack per session.
    seen_pairs: Vec<(TypeId, TypeId)>,

    // Scratch sets reused across walks to avoid re-allocation.
    pub(crate) scratch_seen_types: FxHashSet<TypeId>,
    pub(crate) scratch_seen_packs: FxHashSet<PackId>,

    ice_handler: Option<IceHandler>,
}

impl std::fmt::Debug for SharedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedState")
            .field("counters", &self.counters)
            .field("cached_unify", &self.cached_unify.len())
            .field("seen_pairs", &self.seen_pairs.len())
            .finish_non_exhaustive()
    }
}

impl SharedState {
    pub fn new(names: WellKnownNames) -> Self {
        Self {
            counters: Counters::default(),
            cached_unify: FxHashSet::default(),
            skip_cache_for_type: FxHashMap::default(),
            names,
            seen_pairs: Vec::new(),
            scratch_seen_types: FxHashSet::default(),
            scratch_seen_packs: FxHashSet::default(),
            ice_handler: None,
        }
    }

    /// Install a hook to observe internal checker errors. The unifier still
    /// panics afterwards; the hook exists so hosts can capture context.
    pub fn set_ice_handler(&mut self, handler: IceHandler) {
        self.ice_handler = Some(handler);
    }

    /// Report an internal checker error: corrupt invariant or malformed
    /// input. Never returns.
    pub(crate) fn ice(&mut self, message: &str, span: SourceSpan) -> ! {
        if let Some(handler) = &mut self.ice_handler {
            handler(message, span);
        }
        panic!("internal checker error: {message}");
    }

    fn sorted(a: TypeId, b: TypeId) -> (TypeId, TypeId) {
        if a <= b { (a, b) } else { (b, a) }
    }

    /// True when `(a, b)` is already being unified somewhere up the stack.
    pub(crate) fn have_seen(&self, a: TypeId, b: TypeId) -> bool {
        self.seen_pairs.contains(&Self::sorted(a, b))
    }

    pub(crate) fn push_seen(&mut self, a: TypeId, b: TypeId) {
        self.seen_pairs.push(Self::sorted(a, b));
    }

    /// Pops must match pushes in LIFO order per dispatcher invocation.
    pub(crate) fn pop_seen(&mut self, a: TypeId, b: TypeId) {
        let popped = self.seen_pairs.pop();
        debug_assert_eq!(popped, Some(Self::sorted(a, b)), "seen stack out of order");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marten_identity::NameInterner;

    fn shared() -> SharedState {
        let mut interner = NameInterner::new();
        SharedState::new(WellKnownNames::new(&mut interner))
    }

    #[test]
    fn seen_pairs_are_symmetric() {
        let mut state = shared();
        let a = TypeId::NUMBER;
        let b = TypeId::STRING;

        assert!(!state.have_seen(a, b));
        state.push_seen(a, b);
        assert!(state.have_seen(a, b));
        assert!(state.have_seen(b, a));
        state.pop_seen(b, a);
        assert!(!state.have_seen(a, b));
    }
}
