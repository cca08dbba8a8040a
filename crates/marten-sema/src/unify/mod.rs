// unify/mod.rs
//
// The unifier: dispatcher, free-variable binding, unions and intersections,
// primitives, singletons, and functions. Tables, packs, the occurs check and
// the propagation walkers live in sibling modules.

mod any;
mod cache;
mod levels;
mod occurs;
mod packs;
mod shared;
mod tables;

#[cfg(test)]
mod tests;

pub use shared::{Counters, IceHandler, SharedState};

use miette::SourceSpan;

use marten_identity::{NameId, NameInterner};

use crate::errors::{CountContext, TypeError, TypeErrorKind, find_too_complex};
use crate::options::{Mode, TypecheckOptions, Variance};
use crate::txn_log::TxnLog;
use crate::type_graph::{PackId, TypeGraph, TypeId, TypeLevel, TypeNode};
use crate::type_utils::{is_nil, table_match_tag, type_name};

/// Coarse node kind used for dispatch after follow and the free/any/cache
/// phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Primitive,
    Singleton,
    Function,
    Table,
    Metatable,
    Class,
    Other,
}

fn node_kind(node: &TypeNode) -> NodeKind {
    match node {
        TypeNode::Primitive(_) => NodeKind::Primitive,
        TypeNode::Singleton(_) => NodeKind::Singleton,
        TypeNode::Function(_) => NodeKind::Function,
        TypeNode::Table(_) => NodeKind::Table,
        TypeNode::Metatable { .. } => NodeKind::Metatable,
        TypeNode::Class(_) => NodeKind::Class,
        _ => NodeKind::Other,
    }
}

/// Decides whether the subtype relation holds between two types and mutates
/// the graph to bind free variables accordingly.
///
/// Errors accumulate in [`errors`](Self::errors); the walk continues past
/// failures to collect useful diagnostics. Every mutation is journaled in
/// [`log`](Self::log), so the caller (or a parent unifier) can roll the whole
/// attempt back.
pub struct Unifier<'a> {
    graph: &'a mut TypeGraph,
    shared: &'a mut SharedState,
    interner: &'a NameInterner,
    options: TypecheckOptions,
    mode: Mode,
    span: SourceSpan,
    pub(crate) variance: Variance,
    pub(crate) ctx: CountContext,
    /// 1-based position of the first element mismatch in a pack walk, for
    /// "argument #N" / "return #N" context.
    pub(crate) first_pack_error_pos: Option<usize>,

    pub log: TxnLog,
    pub errors: Vec<TypeError>,
}

impl<'a> Unifier<'a> {
    pub fn new(
        graph: &'a mut TypeGraph,
        shared: &'a mut SharedState,
        interner: &'a NameInterner,
        options: TypecheckOptions,
        mode: Mode,
        span: SourceSpan,
        variance: Variance,
    ) -> Self {
        Self {
            graph,
            shared,
            interner,
            options,
            mode,
            span,
            variance,
            ctx: CountContext::Arg,
            first_pack_error_pos: None,
            log: TxnLog::new(),
            errors: Vec::new(),
        }
    }

    // ========================================================================
    // Public entry points
    // ========================================================================

    /// Unify `sub_ty` against `super_ty`, binding free variables. Diagnostics
    /// land in `self.errors`; mutations in `self.log`.
    pub fn try_unify_type(
        &mut self,
        super_ty: TypeId,
        sub_ty: TypeId,
        is_function_call: bool,
        is_intersection: bool,
    ) {
        self.shared.counters.iteration_count = 0;
        tracing::trace!(?super_ty, ?sub_ty, "try_unify_type");
        self.unify_ty(super_ty, sub_ty, is_function_call, is_intersection);
    }

    /// The pack analogue of [`try_unify_type`](Self::try_unify_type).
    pub fn try_unify_pack(&mut self, super_tp: PackId, sub_tp: PackId, is_function_call: bool) {
        self.shared.counters.iteration_count = 0;
        tracing::trace!(?super_tp, ?sub_tp, "try_unify_pack");
        self.unify_tp(super_tp, sub_tp, is_function_call);
    }

    /// Run the unification in a child and roll it back: reports whether the
    /// relation would hold without mutating the graph.
    pub fn can_unify_type(&mut self, super_ty: TypeId, sub_ty: TypeId) -> Vec<TypeError> {
        let mut inner = self.child();
        inner.unify_ty(super_ty, sub_ty, false, false);
        let (mut log, errors) = inner.into_parts();
        log.rollback(self.graph);
        errors
    }

    /// The pack analogue of [`can_unify_type`](Self::can_unify_type).
    pub fn can_unify_pack(
        &mut self,
        super_tp: PackId,
        sub_tp: PackId,
        is_function_call: bool,
    ) -> Vec<TypeError> {
        let mut inner = self.child();
        inner.unify_tp(super_tp, sub_tp, is_function_call);
        let (mut log, errors) = inner.into_parts();
        log.rollback(self.graph);
        errors
    }

    /// Undo every mutation this unifier (and any concatenated children)
    /// performed.
    pub fn rollback(&mut self) {
        let mut log = std::mem::take(&mut self.log);
        log.rollback(self.graph);
    }

    // ========================================================================
    // Child unifiers
    // ========================================================================

    /// A child shares the graph, cache, seen-set and counters, but owns its
    /// log and errors. Concatenate the log on success, roll it back on
    /// failure.
    pub(crate) fn child(&mut self) -> Unifier<'_> {
        Unifier {
            graph: &mut *self.graph,
            shared: &mut *self.shared,
            interner: self.interner,
            options: self.options,
            mode: self.mode,
            span: self.span,
            variance: self.variance,
            ctx: CountContext::Arg,
            first_pack_error_pos: None,
            log: TxnLog::new(),
            errors: Vec::new(),
        }
    }

    pub(crate) fn into_parts(self) -> (TxnLog, Vec<TypeError>) {
        (self.log, self.errors)
    }

    // ========================================================================
    // Small helpers
    // ========================================================================

    pub(crate) fn error(&mut self, kind: TypeErrorKind) {
        self.errors.push(TypeError::new(self.span, kind));
    }

    pub(crate) fn record_ty(&mut self, id: TypeId) {
        self.log.record_type(self.graph, id);
    }

    pub(crate) fn record_tp(&mut self, id: PackId) {
        self.log.record_pack(self.graph, id);
    }

    pub(crate) fn ice(&mut self, message: &str) -> ! {
        self.shared.ice(message, self.span)
    }

    pub(crate) fn is_nonstrict(&self) -> bool {
        matches!(self.mode, Mode::Nonstrict | Mode::NoCheck)
    }

    fn is_any_or_error(&self, ty: TypeId) -> bool {
        matches!(self.graph.get(ty), TypeNode::Any | TypeNode::Error)
    }

    /// Inspect a child's errors: budget exhaustion is re-emitted verbatim,
    /// anything else collapses to a mismatch between the two parents.
    pub(crate) fn check_child_mismatch(
        &mut self,
        inner_errors: &[TypeError],
        wanted: TypeId,
        given: TypeId,
    ) {
        if let Some(e) = find_too_complex(inner_errors) {
            self.errors.push(e);
        } else if !inner_errors.is_empty() {
            self.error(TypeErrorKind::mismatch(wanted, given));
        }
    }

    /// As above, but names the offending property and carries the child's
    /// first error as context.
    pub(crate) fn check_child_mismatch_with_prop(
        &mut self,
        inner_errors: &[TypeError],
        prop: NameId,
        wanted: TypeId,
        given: TypeId,
    ) {
        if let Some(e) = find_too_complex(inner_errors) {
            self.errors.push(e);
        } else if !inner_errors.is_empty() {
            let prop_name = self.interner.resolve(prop);
            let reason = format!("property '{prop_name}' is not compatible");
            self.error(TypeErrorKind::TypeMismatch {
                wanted,
                given,
                reason: Some(reason),
                inner: Some(Box::new(inner_errors[0].clone())),
            });
        }
    }

    fn enter_recursion(&mut self) {
        self.shared.counters.recursion_count += 1;
        if self.shared.counters.recursion_count > self.options.recursion_limit {
            self.ice("exceeded recursion depth limit during unification");
        }
    }

    fn exit_recursion(&mut self) {
        self.shared.counters.recursion_count -= 1;
    }

    // ========================================================================
    // Dispatcher
    // ========================================================================

    pub(crate) fn unify_ty(
        &mut self,
        super_ty: TypeId,
        sub_ty: TypeId,
        is_function_call: bool,
        is_intersection: bool,
    ) {
        self.enter_recursion();
        self.unify_ty_inner(super_ty, sub_ty, is_function_call, is_intersection);
        self.exit_recursion();
    }

    fn unify_ty_inner(
        &mut self,
        super_ty: TypeId,
        sub_ty: TypeId,
        is_function_call: bool,
        is_intersection: bool,
    ) {
        self.shared.counters.iteration_count += 1;
        if self.options.iteration_limit > 0
            && self.shared.counters.iteration_count > self.options.iteration_limit
        {
            self.error(TypeErrorKind::UnificationTooComplex);
            return;
        }

        let super_ty = self.graph.follow(super_ty);
        let sub_ty = self.graph.follow(sub_ty);

        if super_ty == sub_ty {
            return;
        }

        let super_free = match self.graph.get(super_ty) {
            TypeNode::Free { level } => Some(*level),
            _ => None,
        };
        let sub_free = match self.graph.get(sub_ty) {
            TypeNode::Free { level } => Some(*level),
            _ => None,
        };

        match (super_free, sub_free) {
            (Some(super_level), Some(sub_level)) if super_level.subsumes(sub_level) => {
                self.occurs_check_ty(sub_ty, super_ty);

                // The occurs check may have turned the free node into an error.
                if !matches!(self.graph.get(sub_ty), TypeNode::Error) {
                    self.record_ty(sub_ty);
                    *self.graph.get_mut(sub_ty) = TypeNode::Bound(super_ty);
                }
                return;
            }
            (Some(super_level), Some(_)) => {
                if !self.options.error_recovery_type {
                    self.record_ty(super_ty);
                }
                self.occurs_check_ty(super_ty, sub_ty);

                // The surviving free keeps the more permissive level.
                if let TypeNode::Free { level } = self.graph.get(sub_ty) {
                    let promoted = level.min(super_level);
                    if *level != promoted {
                        self.record_ty(sub_ty);
                        *self.graph.get_mut(sub_ty) = TypeNode::Free { level: promoted };
                    }
                }

                if !self.options.error_recovery_type {
                    *self.graph.get_mut(super_ty) = TypeNode::Bound(sub_ty);
                } else if !matches!(self.graph.get(super_ty), TypeNode::Error) {
                    self.record_ty(super_ty);
                    *self.graph.get_mut(super_ty) = TypeNode::Bound(sub_ty);
                }
                return;
            }
            (Some(super_level), None) => {
                self.occurs_check_ty(super_ty, sub_ty);

                // Unification can't change the level of a generic.
                if let TypeNode::Generic { level } = self.graph.get(sub_ty) {
                    if !level.subsumes(super_level) {
                        self.error(TypeErrorKind::GenericError {
                            message: "generic subtype escaping scope".to_string(),
                        });
                        return;
                    }
                }

                if !matches!(self.graph.get(super_ty), TypeNode::Error) {
                    if self.options.proper_type_levels {
                        self.promote_type_levels(super_level, sub_ty);
                    } else {
                        self.adjust_top_level(sub_ty, super_level);
                    }
                    self.record_ty(super_ty);
                    *self.graph.get_mut(super_ty) = TypeNode::Bound(sub_ty);
                }
                return;
            }
            (None, Some(sub_level)) => {
                self.occurs_check_ty(sub_ty, super_ty);

                if let TypeNode::Generic { level } = self.graph.get(super_ty) {
                    if !level.subsumes(sub_level) {
                        self.error(TypeErrorKind::GenericError {
                            message: "generic supertype escaping scope".to_string(),
                        });
                        return;
                    }
                }

                if !matches!(self.graph.get(sub_ty), TypeNode::Error) {
                    if self.options.proper_type_levels {
                        self.promote_type_levels(sub_level, super_ty);
                    }
                    self.adjust_top_level(super_ty, sub_level);
                    self.record_ty(sub_ty);
                    *self.graph.get_mut(sub_ty) = TypeNode::Bound(super_ty);
                }
                return;
            }
            (None, None) => {}
        }

        if self.is_any_or_error(super_ty) {
            return self.unify_with_any_ty(super_ty, sub_ty);
        }
        if self.is_any_or_error(sub_ty) {
            return self.unify_with_any_ty(sub_ty, super_ty);
        }

        let cache_enabled = !is_function_call && !is_intersection;

        // The relation may have been proven before, if both types are stable.
        if cache_enabled
            && self.shared.cached_unify.contains(&(super_ty, sub_ty))
            && (self.variance == Variance::Covariant
                || self.shared.cached_unify.contains(&(sub_ty, super_ty)))
        {
            tracing::trace!(?super_ty, ?sub_ty, "unification cache hit");
            return;
        }

        // A pair already on the stack means we are recursing into cyclic
        // types; assume success, the rollback will tell us otherwise.
        if self.shared.have_seen(super_ty, sub_ty) {
            return;
        }

        self.shared.push_seen(super_ty, sub_ty);
        self.dispatch_pair(super_ty, sub_ty, is_function_call, is_intersection, cache_enabled);
        self.shared.pop_seen(super_ty, sub_ty);
    }

    fn dispatch_pair(
        &mut self,
        super_ty: TypeId,
        sub_ty: TypeId,
        is_function_call: bool,
        is_intersection: bool,
        cache_enabled: bool,
    ) {
        if let TypeNode::Union { options } = self.graph.get(sub_ty) {
            let options = options.clone();
            return self.unify_sub_union(super_ty, sub_ty, &options);
        }
        if let TypeNode::Union { options } = self.graph.get(super_ty) {
            let options = options.clone();
            return self.unify_super_union(super_ty, sub_ty, &options, is_function_call, cache_enabled);
        }
        if let TypeNode::Intersection { parts } = self.graph.get(super_ty) {
            let parts = parts.clone();
            return self.unify_super_intersection(super_ty, sub_ty, &parts);
        }
        if let TypeNode::Intersection { parts } = self.graph.get(sub_ty) {
            let parts = parts.clone();
            return self.unify_sub_intersection(super_ty, sub_ty, &parts, is_function_call, cache_enabled);
        }

        let super_kind = node_kind(self.graph.get(super_ty));
        let sub_kind = node_kind(self.graph.get(sub_ty));

        match (super_kind, sub_kind) {
            (NodeKind::Primitive, NodeKind::Primitive) => self.unify_primitives(super_ty, sub_ty),
            (NodeKind::Primitive | NodeKind::Singleton, NodeKind::Singleton)
                if self.options.singleton_types =>
            {
                self.unify_singletons(super_ty, sub_ty)
            }
            (NodeKind::Function, NodeKind::Function) => {
                self.unify_functions(super_ty, sub_ty, is_function_call)
            }
            (NodeKind::Table, NodeKind::Table) => {
                self.unify_tables(super_ty, sub_ty, is_intersection);
                if cache_enabled && self.errors.is_empty() {
                    self.cache_result(super_ty, sub_ty);
                }
            }
            // Metatable handling takes the metatable as its first argument;
            // the check is otherwise symmetrical.
            (NodeKind::Metatable, _) => self.unify_with_metatable(super_ty, sub_ty, false),
            (_, NodeKind::Metatable) => self.unify_with_metatable(sub_ty, super_ty, true),
            (NodeKind::Class, _) => self.unify_with_class(super_ty, sub_ty, false),
            // Class-vs-nonclass is almost, but not quite, symmetrical; when
            // both sides are classes the order of these two tests matters.
            (_, NodeKind::Class) => self.unify_with_class(super_ty, sub_ty, true),
            _ => self.error(TypeErrorKind::mismatch(super_ty, sub_ty)),
        }
    }

    // ========================================================================
    // Unions and intersections
    // ========================================================================

    /// `A | B <: T` requires `A <: T` and `B <: T`.
    fn unify_sub_union(&mut self, super_ty: TypeId, sub_ty: TypeId, options: &[TypeId]) {
        let mut failed = false;
        let mut too_complex: Option<TypeError> = None;
        let mut first_failed: Option<TypeError> = None;
        let count = options.len();

        for (i, &option) in options.iter().enumerate() {
            let mut inner = self.child();
            inner.unify_ty(super_ty, option, false, false);
            let (mut inner_log, inner_errors) = inner.into_parts();

            if let Some(e) = find_too_complex(&inner_errors) {
                too_complex = Some(e);
            } else if !inner_errors.is_empty() {
                // The nil option is left out of the report; optionals are
                // presented specially.
                if self.options.extended_type_mismatch_error
                    && first_failed.is_none()
                    && !is_nil(self.graph, option)
                {
                    first_failed = Some(inner_errors[0].clone());
                }
                failed = true;
            }

            if i != count - 1 {
                inner_log.rollback(self.graph);
            } else {
                self.log.concat(inner_log);
            }
        }

        if let Some(e) = too_complex {
            self.errors.push(e);
        } else if failed {
            if let Some(first) = first_failed {
                self.error(TypeErrorKind::TypeMismatch {
                    wanted: super_ty,
                    given: sub_ty,
                    reason: Some("not all union options are compatible".to_string()),
                    inner: Some(Box::new(first)),
                });
            } else {
                self.error(TypeErrorKind::mismatch(super_ty, sub_ty));
            }
        }
    }

    /// `T <: A | B` requires `T <: A` or `T <: B`. The heuristic only
    /// reorders attempts, for better diagnostics and cache hits.
    fn unify_super_union(
        &mut self,
        super_ty: TypeId,
        sub_ty: TypeId,
        options: &[TypeId],
        is_function_call: bool,
        cache_enabled: bool,
    ) {
        let mut found = false;
        let mut too_complex: Option<TypeError> = None;
        let mut failed_option_count = 0usize;
        let mut failed_option: Option<TypeError> = None;

        let mut found_heuristic = false;
        let mut start_index = 0usize;

        if self.options.union_heuristic {
            // A nominal name match is the strongest signal.
            if let Some(sub_name) = type_name(self.graph, sub_ty) {
                for (i, &option) in options.iter().enumerate() {
                    if type_name(self.graph, option) == Some(sub_name) {
                        found_heuristic = true;
                        start_index = i;
                        break;
                    }
                }
            }

            // Tagged-union discrimination on the first singleton property.
            if self.options.extended_union_mismatch_error && !found_heuristic {
                if let Some((tag_name, tag_value)) = table_match_tag(self.graph, sub_ty) {
                    for (i, &option) in options.iter().enumerate() {
                        if let Some((opt_name, opt_value)) = table_match_tag(self.graph, option) {
                            if opt_name == tag_name && opt_value == tag_value {
                                found_heuristic = true;
                                start_index = i;
                                break;
                            }
                        }
                    }
                }
            }

            // Fall back to an option the cache has already proven.
            if !found_heuristic && cache_enabled {
                for (i, &option) in options.iter().enumerate() {
                    if self.shared.cached_unify.contains(&(option, sub_ty))
                        && (self.variance == Variance::Covariant
                            || self.shared.cached_unify.contains(&(sub_ty, option)))
                    {
                        start_index = i;
                        break;
                    }
                }
            }
        }

        for i in 0..options.len() {
            let option = options[(i + start_index) % options.len()];
            let mut inner = self.child();
            inner.unify_ty(option, sub_ty, is_function_call, false);
            let (mut inner_log, inner_errors) = inner.into_parts();

            if inner_errors.is_empty() {
                found = true;
                self.log.concat(inner_log);
                break;
            }

            if let Some(e) = find_too_complex(&inner_errors) {
                too_complex = Some(e);
            } else if self.options.extended_union_mismatch_error && !is_nil(self.graph, option) {
                failed_option_count += 1;
                if failed_option.is_none() {
                    failed_option = Some(inner_errors[0].clone());
                }
            }

            inner_log.rollback(self.graph);
        }

        if let Some(e) = too_complex {
            self.errors.push(e);
        } else if !found {
            if self.options.extended_union_mismatch_error
                && (failed_option_count == 1 || found_heuristic)
                && failed_option.is_some()
            {
                self.error(TypeErrorKind::TypeMismatch {
                    wanted: super_ty,
                    given: sub_ty,
                    reason: Some("none of the union options are compatible; for example:".to_string()),
                    inner: failed_option.map(Box::new),
                });
            } else if self.options.extended_type_mismatch_error {
                self.error(TypeErrorKind::TypeMismatch {
                    wanted: super_ty,
                    given: sub_ty,
                    reason: Some("none of the union options are compatible".to_string()),
                    inner: None,
                });
            } else {
                self.error(TypeErrorKind::mismatch(super_ty, sub_ty));
            }
        }
    }

    /// `T <: A & B` requires `T` to unify with every part.
    fn unify_super_intersection(&mut self, super_ty: TypeId, sub_ty: TypeId, parts: &[TypeId]) {
        if self.options.extended_type_mismatch_error {
            let mut too_complex: Option<TypeError> = None;
            let mut first_failed: Option<TypeError> = None;

            for &part in parts {
                let mut inner = self.child();
                inner.unify_ty(part, sub_ty, false, true);
                let (inner_log, inner_errors) = inner.into_parts();

                if let Some(e) = find_too_complex(&inner_errors) {
                    too_complex = Some(e);
                } else if !inner_errors.is_empty() && first_failed.is_none() {
                    first_failed = Some(inner_errors[0].clone());
                }

                self.log.concat(inner_log);
            }

            if let Some(e) = too_complex {
                self.errors.push(e);
            } else if let Some(first) = first_failed {
                self.error(TypeErrorKind::TypeMismatch {
                    wanted: super_ty,
                    given: sub_ty,
                    reason: Some("not all intersection parts are compatible".to_string()),
                    inner: Some(Box::new(first)),
                });
            }
        } else {
            for &part in parts {
                self.unify_ty(part, sub_ty, false, true);
            }
        }
    }

    /// `A & B <: T` requires `A <: T` or `B <: T`; the first success wins.
    fn unify_sub_intersection(
        &mut self,
        super_ty: TypeId,
        sub_ty: TypeId,
        parts: &[TypeId],
        is_function_call: bool,
        cache_enabled: bool,
    ) {
        let mut found = false;
        let mut too_complex: Option<TypeError> = None;

        let mut start_index = 0usize;
        if cache_enabled {
            for (i, &part) in parts.iter().enumerate() {
                if self.shared.cached_unify.contains(&(super_ty, part))
                    && (self.variance == Variance::Covariant
                        || self.shared.cached_unify.contains(&(part, super_ty)))
                {
                    start_index = i;
                    break;
                }
            }
        }

        for i in 0..parts.len() {
            let part = parts[(i + start_index) % parts.len()];
            let mut inner = self.child();
            inner.unify_ty(super_ty, part, is_function_call, false);
            let (mut inner_log, inner_errors) = inner.into_parts();

            if inner_errors.is_empty() {
                found = true;
                self.log.concat(inner_log);
                break;
            }
            if let Some(e) = find_too_complex(&inner_errors) {
                too_complex = Some(e);
            }
            inner_log.rollback(self.graph);
        }

        if let Some(e) = too_complex {
            self.errors.push(e);
        } else if !found {
            if self.options.extended_type_mismatch_error {
                self.error(TypeErrorKind::TypeMismatch {
                    wanted: super_ty,
                    given: sub_ty,
                    reason: Some("none of the intersection parts are compatible".to_string()),
                    inner: None,
                });
            } else {
                self.error(TypeErrorKind::mismatch(super_ty, sub_ty));
            }
        }
    }

    // ========================================================================
    // Primitives and singletons
    // ========================================================================

    fn unify_primitives(&mut self, super_ty: TypeId, sub_ty: TypeId) {
        let (l, r) = match (self.graph.get(super_ty), self.graph.get(sub_ty)) {
            (TypeNode::Primitive(l), TypeNode::Primitive(r)) => (*l, *r),
            _ => self.ice("passed non-primitive types to unify_primitives"),
        };
        if l != r {
            self.error(TypeErrorKind::mismatch(super_ty, sub_ty));
        }
    }

    fn unify_singletons(&mut self, super_ty: TypeId, sub_ty: TypeId) {
        use crate::type_graph::{PrimitiveKind, SingletonValue};

        let sub_singleton = match self.graph.get(sub_ty) {
            TypeNode::Singleton(s) => s.clone(),
            _ => self.ice("passed non-singleton subtype to unify_singletons"),
        };

        match self.graph.get(super_ty) {
            TypeNode::Singleton(super_singleton) => {
                if *super_singleton == sub_singleton {
                    return;
                }
            }
            TypeNode::Primitive(kind) => {
                // A primitive accepts its singletons, but only covariantly.
                let admits = match (kind, &sub_singleton) {
                    (PrimitiveKind::Boolean, SingletonValue::Bool(_)) => true,
                    (PrimitiveKind::String, SingletonValue::Str(_)) => true,
                    _ => false,
                };
                if admits && self.variance == Variance::Covariant {
                    return;
                }
            }
            _ => self.ice("passed non-singleton/primitive types to unify_singletons"),
        }

        self.error(TypeErrorKind::mismatch(super_ty, sub_ty));
    }

    // ========================================================================
    // Functions
    // ========================================================================

    fn unify_functions(&mut self, super_ty: TypeId, sub_ty: TypeId, is_function_call: bool) {
        let (l, r) = match (self.graph.get(super_ty), self.graph.get(sub_ty)) {
            (TypeNode::Function(l), TypeNode::Function(r)) => (l.clone(), r.clone()),
            _ => self.ice("passed non-function types to unify_functions"),
        };

        let mut num_generics = l.generics.len();
        if num_generics != r.generics.len() {
            num_generics = num_generics.min(r.generics.len());
            if self.options.extended_function_mismatch_error {
                self.error(TypeErrorKind::TypeMismatch {
                    wanted: super_ty,
                    given: sub_ty,
                    reason: Some("different number of generic type parameters".to_string()),
                    inner: None,
                });
            } else {
                self.error(TypeErrorKind::mismatch(super_ty, sub_ty));
            }
        }

        if l.generic_packs.len() != r.generic_packs.len() {
            if self.options.extended_function_mismatch_error {
                self.error(TypeErrorKind::TypeMismatch {
                    wanted: super_ty,
                    given: sub_ty,
                    reason: Some("different number of generic type pack parameters".to_string()),
                    inner: None,
                });
            } else {
                self.error(TypeErrorKind::mismatch(super_ty, sub_ty));
            }
        }

        // Paired generics are treated as equal while unifying the signature.
        for i in 0..num_generics {
            self.shared.push_seen(l.generics[i], r.generics[i]);
        }

        let saved_ctx = self.ctx;

        if !is_function_call {
            if self.options.extended_function_mismatch_error {
                let mut inner = self.child();

                // Arguments are contravariant: the supertype's arguments must
                // be acceptable to the subtype.
                inner.ctx = CountContext::Arg;
                inner.unify_tp(r.arg_pack, l.arg_pack, is_function_call);

                let reported = !inner.errors.is_empty();
                let arg_errors: Vec<TypeError> = inner.errors.clone();
                let arg_error_pos = inner.first_pack_error_pos;

                // Results are covariant.
                inner.ctx = CountContext::Result;
                inner.unify_tp(l.ret_pack, r.ret_pack, false);

                let ret_error_pos = inner.first_pack_error_pos;
                let (inner_log, all_errors) = inner.into_parts();
                let ret_errors = &all_errors[arg_errors.len()..];

                if let Some(e) = find_too_complex(&arg_errors) {
                    self.errors.push(e);
                } else if !arg_errors.is_empty() {
                    if let Some(pos) = arg_error_pos {
                        self.error(TypeErrorKind::TypeMismatch {
                            wanted: super_ty,
                            given: sub_ty,
                            reason: Some(format!("argument #{pos} type is not compatible")),
                            inner: Some(Box::new(arg_errors[0].clone())),
                        });
                    } else {
                        self.error(TypeErrorKind::TypeMismatch {
                            wanted: super_ty,
                            given: sub_ty,
                            reason: None,
                            inner: Some(Box::new(arg_errors[0].clone())),
                        });
                    }
                }

                if !reported {
                    if let Some(e) = find_too_complex(ret_errors) {
                        self.errors.push(e);
                    } else if !ret_errors.is_empty() {
                        if self.graph.pack_size(l.ret_pack) == 1 && self.graph.pack_finite(l.ret_pack)
                        {
                            self.error(TypeErrorKind::TypeMismatch {
                                wanted: super_ty,
                                given: sub_ty,
                                reason: Some("return type is not compatible".to_string()),
                                inner: Some(Box::new(ret_errors[0].clone())),
                            });
                        } else if let Some(pos) = ret_error_pos {
                            self.error(TypeErrorKind::TypeMismatch {
                                wanted: super_ty,
                                given: sub_ty,
                                reason: Some(format!("return #{pos} type is not compatible")),
                                inner: Some(Box::new(ret_errors[0].clone())),
                            });
                        } else {
                            self.error(TypeErrorKind::TypeMismatch {
                                wanted: super_ty,
                                given: sub_ty,
                                reason: None,
                                inner: Some(Box::new(ret_errors[0].clone())),
                            });
                        }
                    }
                }

                self.log.concat(inner_log);
            } else {
                let mut inner = self.child();
                inner.unify_tp(r.arg_pack, l.arg_pack, is_function_call);
                inner.unify_tp(l.ret_pack, r.ret_pack, false);
                let (inner_log, inner_errors) = inner.into_parts();
                self.check_child_mismatch(&inner_errors, super_ty, sub_ty);
                self.log.concat(inner_log);
            }
        } else {
            // At a call site the caller owns the error context and cannot
            // roll back, so write straight to our own log.
            self.ctx = CountContext::Arg;
            self.unify_tp(r.arg_pack, l.arg_pack, is_function_call);
            self.ctx = CountContext::Result;
            self.unify_tp(l.ret_pack, r.ret_pack, false);
        }

        // Carry the definition marker across when exactly one side has one.
        if l.definition.is_some() && r.definition.is_none() {
            self.record_ty(sub_ty);
            if let TypeNode::Function(f) = self.graph.get_mut(sub_ty) {
                f.definition = l.definition;
            }
        } else if l.definition.is_none() && r.definition.is_some() {
            self.record_ty(super_ty);
            if let TypeNode::Function(f) = self.graph.get_mut(super_ty) {
                f.definition = r.definition;
            }
        }

        self.ctx = saved_ctx;

        for i in (0..num_generics).rev() {
            self.shared.pop_seen(l.generics[i], r.generics[i]);
        }
    }

    /// Minimal level adjustment at the top node only, for when the deep
    /// promotion walk is disabled.
    fn adjust_top_level(&mut self, ty: TypeId, min_level: TypeLevel) {
        let current = match self.graph.get(ty) {
            TypeNode::Free { level } => Some(*level),
            TypeNode::Function(f) => Some(f.level),
            TypeNode::Table(t) => Some(t.level),
            _ => None,
        };
        let Some(current) = current else { return };
        if current.subsumes(min_level) {
            return;
        }
        self.record_ty(ty);
        match self.graph.get_mut(ty) {
            TypeNode::Free { level } => *level = min_level,
            TypeNode::Function(f) => f.level = min_level,
            TypeNode::Table(t) => t.level = min_level,
            _ => {}
        }
    }
}
