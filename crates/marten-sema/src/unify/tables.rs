// unify/tables.rs
//
// Table unification (variance-aware and legacy paths), metatables, classes,
// and deep optional wrapping.

use rustc_hash::FxHashMap;

use marten_identity::NameId;

use crate::errors::{CannotExtendReason, MissingDirection, TypeError, TypeErrorKind, find_too_complex};
use crate::options::Variance;
use crate::type_graph::{Property, TableIndexer, TableState, TypeId, TypeNode};
use crate::type_utils::{find_table_property, is_optional, is_string};

use super::Unifier;

impl Unifier<'_> {
    // ========================================================================
    // Variance-aware table unification
    // ========================================================================

    pub(crate) fn unify_tables(&mut self, left: TypeId, right: TypeId, is_intersection: bool) {
        if !self.options.table_subtyping_variance {
            return self.unify_tables_legacy(left, right, is_intersection);
        }

        let (lt, rt) = match (self.graph.get(left), self.graph.get(right)) {
            (TypeNode::Table(lt), TypeNode::Table(rt)) => (lt.clone(), rt.clone()),
            _ => self.ice("passed non-table types to unify_tables"),
        };

        let mut missing: Vec<NameId> = Vec::new();
        let mut extra: Vec<NameId> = Vec::new();

        // Test that the property sets are compatible before any recursive
        // unification.
        if self.options.table_unification_early_test
            && rt.indexer.is_none()
            && rt.state != TableState::Free
        {
            for (&name, prop) in &lt.props {
                if !rt.props.contains_key(&name)
                    && !is_optional(self.graph, prop.ty)
                    && !self.follows_to_any(prop.ty)
                {
                    missing.push(name);
                }
            }
            if !missing.is_empty() {
                self.error(TypeErrorKind::MissingProperties {
                    super_ty: left,
                    sub_ty: right,
                    names: missing,
                    direction: MissingDirection::Missing,
                });
                return;
            }
        }

        // And vice versa when invariant.
        if self.options.table_unification_early_test
            && self.variance == Variance::Invariant
            && lt.indexer.is_none()
            && lt.state != TableState::Unsealed
            && lt.state != TableState::Free
        {
            for (&name, prop) in &rt.props {
                if !lt.props.contains_key(&name)
                    && !is_optional(self.graph, prop.ty)
                    && !self.follows_to_any(prop.ty)
                {
                    extra.push(name);
                }
            }
            if !extra.is_empty() {
                self.error(TypeErrorKind::MissingProperties {
                    super_ty: left,
                    sub_ty: right,
                    names: extra,
                    direction: MissingDirection::Extra,
                });
                return;
            }
        }

        // Width subtyping: every property of the supertype must be present
        // in the subtype, with exactly matching types.
        for (&name, prop) in &lt.props {
            if let Some(sub_prop) = rt.props.get(&name) {
                self.unify_prop_invariant(prop.ty, sub_prop.ty, name, left, right);
            } else if rt
                .indexer
                .is_some_and(|idx| is_string(self.graph, idx.index_ty))
            {
                let idx = rt.indexer.unwrap();
                self.unify_prop_invariant(prop.ty, idx.result_ty, name, left, right);
            } else if is_optional(self.graph, prop.ty) || self.follows_to_any(prop.ty) {
                // Optional and any-typed properties may be absent from the
                // subtype. Unsound for `any`; see the design notes.
            } else if rt.state == TableState::Free {
                self.record_ty(right);
                if let TypeNode::Table(t) = self.graph.get_mut(right) {
                    t.props.insert(name, prop.clone());
                }
            } else {
                missing.push(name);
            }
        }

        for (&name, prop) in &rt.props {
            if lt.props.contains_key(&name) {
                // Already unified above.
            } else if lt
                .indexer
                .is_some_and(|idx| is_string(self.graph, idx.index_ty))
            {
                let idx = lt.indexer.unwrap();
                self.unify_prop_invariant(idx.result_ty, prop.ty, name, left, right);
            } else if lt.state == TableState::Unsealed {
                // An unsealed supertype learns the property, deeply wrapped
                // as optional to stay sound for readers.
                let mut memo = FxHashMap::default();
                let wrapped = self.deeply_optional(prop.ty, &mut memo);
                self.record_ty(left);
                if let TypeNode::Table(t) = self.graph.get_mut(left) {
                    t.props.insert(
                        name,
                        Property {
                            ty: wrapped,
                            span: prop.span,
                        },
                    );
                }
            } else if self.variance == Variance::Covariant {
                // Width subtyping tolerates extras.
            } else if is_optional(self.graph, prop.ty) || self.follows_to_any(prop.ty) {
            } else if lt.state == TableState::Free {
                self.record_ty(left);
                if let TypeNode::Table(t) = self.graph.get_mut(left) {
                    t.props.insert(name, prop.clone());
                }
            } else {
                extra.push(name);
            }
        }

        // Indexers unify invariantly; a missing indexer is copied onto a
        // side that can still change shape.
        if let (Some(l_idx), Some(r_idx)) = (lt.indexer, rt.indexer) {
            let saved = self.variance;
            self.variance = Variance::Invariant;
            let mut inner = self.child();
            inner.unify_indexers(l_idx, r_idx);
            let (mut inner_log, inner_errors) = inner.into_parts();
            self.check_child_mismatch(&inner_errors, left, right);
            if inner_errors.is_empty() {
                self.log.concat(inner_log);
            } else {
                inner_log.rollback(self.graph);
            }
            self.variance = saved;
        } else if lt.indexer.is_some() {
            if rt.state == TableState::Unsealed || rt.state == TableState::Free {
                self.record_ty(right);
                if let TypeNode::Table(t) = self.graph.get_mut(right) {
                    t.indexer = lt.indexer;
                }
            }
        } else if rt.indexer.is_some() && self.variance == Variance::Invariant {
            if lt.state == TableState::Unsealed || lt.state == TableState::Free {
                self.record_ty(left);
                if let TypeNode::Table(t) = self.graph.get_mut(left) {
                    t.indexer = rt.indexer;
                }
            }
        }

        if !missing.is_empty() {
            self.error(TypeErrorKind::MissingProperties {
                super_ty: left,
                sub_ty: right,
                names: missing,
                direction: MissingDirection::Missing,
            });
            return;
        }
        if !extra.is_empty() {
            self.error(TypeErrorKind::MissingProperties {
                super_ty: left,
                sub_ty: right,
                names: extra,
                direction: MissingDirection::Extra,
            });
            return;
        }

        // Unifying a property of a cyclic table can rebind the table itself;
        // restart on the new representatives when that happens.
        let left_rebound =
            matches!(self.graph.get(left), TypeNode::Table(t) if t.bound_to.is_some());
        let right_rebound =
            matches!(self.graph.get(right), TypeNode::Table(t) if t.bound_to.is_some());
        if left_rebound || right_rebound {
            return self.unify_ty(left, right, false, false);
        }

        if lt.state == TableState::Free {
            self.record_ty(left);
            if let TypeNode::Table(t) = self.graph.get_mut(left) {
                t.bound_to = Some(right);
            }
        } else if rt.state == TableState::Free {
            self.record_ty(right);
            if let TypeNode::Table(t) = self.graph.get_mut(right) {
                t.bound_to = Some(left);
            }
        }
    }

    fn follows_to_any(&self, ty: TypeId) -> bool {
        matches!(self.graph.get(self.graph.follow(ty)), TypeNode::Any)
    }

    /// Unify two property types in a child unifier under forced invariance,
    /// attaching the property name to any failure.
    fn unify_prop_invariant(
        &mut self,
        super_prop: TypeId,
        sub_prop: TypeId,
        name: NameId,
        left: TypeId,
        right: TypeId,
    ) {
        let saved = self.variance;
        self.variance = Variance::Invariant;

        let mut inner = self.child();
        inner.unify_ty(super_prop, sub_prop, false, false);
        let (mut inner_log, inner_errors) = inner.into_parts();

        if self.options.extended_type_mismatch_error {
            self.check_child_mismatch_with_prop(&inner_errors, name, left, right);
        } else {
            self.check_child_mismatch(&inner_errors, left, right);
        }

        if inner_errors.is_empty() {
            self.log.concat(inner_log);
        } else {
            inner_log.rollback(self.graph);
        }
        self.variance = saved;
    }

    pub(crate) fn unify_indexers(&mut self, super_idx: TableIndexer, sub_idx: TableIndexer) {
        self.unify_ty(super_idx.index_ty, sub_idx.index_ty, false, false);
        self.unify_ty(super_idx.result_ty, sub_idx.result_ty, false, false);
    }

    /// `t | nil`, recursing into tables. Memoises visited tables so shared
    /// and cyclic structure stays shared.
    pub(crate) fn deeply_optional(
        &mut self,
        ty: TypeId,
        seen: &mut FxHashMap<TypeId, TypeId>,
    ) -> TypeId {
        let ty = self.graph.follow(ty);
        if matches!(self.graph.get(ty), TypeNode::Any) {
            return ty;
        }
        if is_optional(self.graph, ty) {
            return ty;
        }
        if let TypeNode::Table(table) = self.graph.get(ty) {
            if let Some(&memo) = seen.get(&ty) {
                return memo;
            }
            let clone = table.clone();
            let result = self.graph.add_type(TypeNode::Table(clone));
            seen.insert(ty, result);

            let names: Vec<NameId> = match self.graph.get(result) {
                TypeNode::Table(t) => t.props.keys().copied().collect(),
                _ => Vec::new(),
            };
            for name in names {
                let prop_ty = match self.graph.get(result) {
                    TypeNode::Table(t) => t.props[&name].ty,
                    _ => continue,
                };
                let wrapped = self.deeply_optional(prop_ty, seen);
                if let TypeNode::Table(t) = self.graph.get_mut(result) {
                    if let Some(prop) = t.props.get_mut(&name) {
                        prop.ty = wrapped;
                    }
                }
            }
            self.graph.union(smallvec::smallvec![TypeId::NIL, result])
        } else {
            self.graph.union(smallvec::smallvec![TypeId::NIL, ty])
        }
    }

    // ========================================================================
    // Legacy table unification
    // ========================================================================

    /// The pre-variance table algorithm: dispatch on the two table states.
    /// Everything below it runs invariantly.
    fn unify_tables_legacy(&mut self, left: TypeId, right: TypeId, is_intersection: bool) {
        let saved = self.variance;
        self.variance = Variance::Invariant;
        self.unify_tables_legacy_inner(left, right, is_intersection);
        self.variance = saved;
    }

    fn unify_tables_legacy_inner(&mut self, left: TypeId, right: TypeId, is_intersection: bool) {
        use TableState::*;

        let (l_state, r_state) = match (self.graph.get(left), self.graph.get(right)) {
            (TypeNode::Table(lt), TypeNode::Table(rt)) => (lt.state, rt.state),
            _ => self.ice("passed non-table types to unify_tables"),
        };

        match (l_state, r_state) {
            (Sealed, Sealed) | (Sealed, Unsealed) | (Unsealed, Sealed) => {
                self.unify_sealed_tables(left, right, is_intersection)
            }
            (Sealed, Generic) | (Generic, Sealed) => {
                self.error(TypeErrorKind::mismatch(left, right))
            }
            (Free, Free) => {
                self.unify_free_table(left, right);

                // Avoid creating a cycle when the two already point at each
                // other.
                if self.graph.follow(left) != self.graph.follow(right) {
                    self.record_ty(left);
                    if let TypeNode::Table(t) = self.graph.get_mut(left) {
                        t.bound_to = Some(right);
                    }
                }
            }
            (Free, _) => self.unify_free_table(left, right),
            (_, Free) => self.unify_free_table(right, left),
            (Unsealed | Generic, Unsealed | Generic) => {
                self.unify_shape_equal_tables(left, right)
            }
        }
    }

    /// Tables must have exactly the same properties, and their types must
    /// all unify.
    fn unify_shape_equal_tables(&mut self, left: TypeId, right: TypeId) {
        let (lt, rt) = match (self.graph.get(left), self.graph.get(right)) {
            (TypeNode::Table(lt), TypeNode::Table(rt)) => (lt.clone(), rt.clone()),
            _ => self.ice("passed non-table types to unify_tables"),
        };

        for (&name, prop) in &lt.props {
            match rt.props.get(&name) {
                None => self.error(TypeErrorKind::UnknownProperty {
                    container: right,
                    name,
                }),
                Some(sub_prop) => self.unify_ty(prop.ty, sub_prop.ty, false, false),
            }
        }

        if let (Some(l_idx), Some(r_idx)) = (lt.indexer, rt.indexer) {
            self.unify_indexers(l_idx, r_idx);
        } else if lt.indexer.is_some() {
            if rt.state == TableState::Unsealed {
                self.record_ty(right);
                if let TypeNode::Table(t) = self.graph.get_mut(right) {
                    t.indexer = lt.indexer;
                }
            } else {
                self.error(TypeErrorKind::CannotExtendTable {
                    table: right,
                    reason: CannotExtendReason::Indexer,
                });
            }
        }
    }

    /// A free table's properties must all exist (respecting metatables) on
    /// the other side; afterwards the free table is bound to it.
    fn unify_free_table(&mut self, free_id: TypeId, other_id: TypeId) {
        let (free_table, other_table) = match (self.graph.get(free_id), self.graph.get(other_id)) {
            (TypeNode::Table(f), TypeNode::Table(o)) => (f.clone(), o.clone()),
            _ => self.ice("passed non-table types to unify_free_table"),
        };

        let index_name = self.shared.names.index;

        for (&name, prop) in &free_table.props {
            if let Some(other_prop_ty) = find_table_property(self.graph, index_name, other_id, name)
            {
                self.unify_ty(other_prop_ty, prop.ty, false, false);

                // Unifying a property of a cyclic table can rebind either
                // table; restart on the new representatives.
                let free_is_table = matches!(self.graph.get(free_id), TypeNode::Table(_));
                let other_is_table = matches!(self.graph.get(other_id), TypeNode::Table(_));
                if !free_is_table || !other_is_table {
                    return self.unify_ty(free_id, other_id, false, false);
                }
                if matches!(self.graph.get(free_id), TypeNode::Table(t) if t.bound_to.is_some()) {
                    return self.unify_ty(free_id, other_id, false, false);
                }
            } else if other_table.state == TableState::Free {
                // The other table is also free: it just has more properties
                // than we knew about.
                self.record_ty(other_id);
                if let TypeNode::Table(t) = self.graph.get_mut(other_id) {
                    t.props.insert(name, prop.clone());
                }
            } else {
                self.error(TypeErrorKind::UnknownProperty {
                    container: other_id,
                    name,
                });
            }
        }

        if let (Some(f_idx), Some(o_idx)) = (free_table.indexer, other_table.indexer) {
            let mut inner = self.child();
            inner.unify_indexers(f_idx, o_idx);
            let (inner_log, inner_errors) = inner.into_parts();
            self.check_child_mismatch(&inner_errors, free_id, other_id);
            self.log.concat(inner_log);
        } else if other_table.state == TableState::Free && free_table.indexer.is_some() {
            self.record_ty(other_id);
            if let TypeNode::Table(t) = self.graph.get_mut(other_id) {
                t.indexer = free_table.indexer;
            }
        }

        let free_bound =
            matches!(self.graph.get(free_id), TypeNode::Table(t) if t.bound_to.is_some());
        if !free_bound && other_table.state != TableState::Free {
            self.record_ty(free_id);
            if let TypeNode::Table(t) = self.graph.get_mut(free_id) {
                t.bound_to = Some(other_id);
            }
        }
    }

    /// Sealed tables must have matching property sets; unsealed subtypes
    /// may still learn an indexer.
    fn unify_sealed_tables(&mut self, left: TypeId, right: TypeId, is_intersection: bool) {
        let (lt, rt) = match (self.graph.get(left), self.graph.get(right)) {
            (TypeNode::Table(lt), TypeNode::Table(rt)) => (lt.clone(), rt.clone()),
            _ => self.ice("passed non-table types to unify_sealed_tables"),
        };

        let mut missing: Vec<NameId> = Vec::new();
        let is_unnamed_table = rt.name.is_none() && rt.synthetic_name.is_none();

        if self.options.table_unification_early_test && rt.indexer.is_none() {
            for (&name, prop) in &lt.props {
                if !rt.props.contains_key(&name) && !is_optional(self.graph, prop.ty) {
                    missing.push(name);
                }
            }
            if !missing.is_empty() {
                self.error(TypeErrorKind::MissingProperties {
                    super_ty: left,
                    sub_ty: right,
                    names: missing,
                    direction: MissingDirection::Missing,
                });
                return;
            }
        }

        let mut inner = self.child();
        let mut first_prop_error: Option<TypeError> = None;

        for (&name, prop) in &lt.props {
            match rt.props.get(&name) {
                None => {
                    if is_optional(inner.graph, prop.ty) {
                        continue;
                    }
                    missing.push(name);
                    inner
                        .errors
                        .push(TypeError::new(inner.span, TypeErrorKind::mismatch(left, right)));
                }
                Some(sub_prop) => {
                    // For an unnamed literal table, report at the property's
                    // own definition span, and at most once.
                    if is_unnamed_table && sub_prop.span.is_some() {
                        let prior_errors = inner.errors.len();
                        let prior_span = inner.span;
                        inner.span = sub_prop.span.unwrap();
                        inner.unify_ty(prop.ty, sub_prop.ty, false, false);
                        inner.span = prior_span;

                        if inner.errors.len() != prior_errors && first_prop_error.is_none() {
                            first_prop_error = Some(inner.errors.last().unwrap().clone());
                        }
                    } else {
                        inner.unify_ty(prop.ty, sub_prop.ty, false, false);
                    }
                }
            }
        }

        if lt.indexer.is_some() || rt.indexer.is_some() {
            if let (Some(l_idx), Some(r_idx)) = (lt.indexer, rt.indexer) {
                inner.unify_indexers(l_idx, r_idx);
            } else if rt.state == TableState::Unsealed {
                if lt.indexer.is_some() {
                    inner.record_ty(right);
                    if let TypeNode::Table(t) = inner.graph.get_mut(right) {
                        t.indexer = lt.indexer;
                    }
                }
            } else if lt.state == TableState::Unsealed {
                if rt.indexer.is_some() {
                    inner.record_ty(left);
                    if let TypeNode::Table(t) = inner.graph.get_mut(left) {
                        t.indexer = rt.indexer;
                    }
                }
            } else if let Some(l_idx) = lt.indexer {
                inner.unify_ty(l_idx.index_ty, TypeId::STRING, false, false);
                // Properties were unified above; the remainder must fit the
                // indexer.
                for (&name, prop) in &rt.props {
                    if !lt.props.contains_key(&name) {
                        inner.unify_ty(l_idx.result_ty, prop.ty, false, false);
                    }
                }
            } else {
                inner
                    .errors
                    .push(TypeError::new(inner.span, TypeErrorKind::mismatch(left, right)));
            }
        }

        let (inner_log, inner_errors) = inner.into_parts();
        self.log.concat(inner_log);

        if let Some(err) = first_prop_error {
            self.errors.push(err);
            return;
        }

        if !missing.is_empty() {
            self.error(TypeErrorKind::MissingProperties {
                super_ty: left,
                sub_ty: right,
                names: missing,
                direction: MissingDirection::Missing,
            });
            return;
        }

        // When the supertype is part of an intersection, extra properties
        // are owed to the other parts and not an error here.
        if !is_intersection && lt.state != TableState::Unsealed && lt.indexer.is_none() {
            let mut extra: Vec<NameId> = Vec::new();
            for (&name, prop) in &rt.props {
                if !lt.props.contains_key(&name) && !is_optional(self.graph, prop.ty) {
                    extra.push(name);
                }
            }
            if !extra.is_empty() {
                self.error(TypeErrorKind::MissingProperties {
                    super_ty: left,
                    sub_ty: right,
                    names: extra,
                    direction: MissingDirection::Extra,
                });
                return;
            }
        }

        self.check_child_mismatch(&inner_errors, left, right);
    }

    // ========================================================================
    // Metatables
    // ========================================================================

    /// `metatable_id` is the metatable side; `reversed` restores the
    /// caller's orientation for diagnostics.
    pub(crate) fn unify_with_metatable(
        &mut self,
        metatable_id: TypeId,
        other_id: TypeId,
        reversed: bool,
    ) {
        let (m_table, m_meta) = match self.graph.get(metatable_id) {
            TypeNode::Metatable { table, metatable } => (*table, *metatable),
            _ => self.ice("unify_with_metatable invoked with non-metatable type"),
        };

        let (wanted, given) = if reversed {
            (other_id, metatable_id)
        } else {
            (metatable_id, other_id)
        };

        enum OtherKind {
            Metatable(TypeId, TypeId),
            Table(TableState),
            AnyOrError,
            Other,
        }

        let other = match self.graph.get(other_id) {
            TypeNode::Metatable { table, metatable } => OtherKind::Metatable(*table, *metatable),
            TypeNode::Table(t) => OtherKind::Table(t.state),
            TypeNode::Any | TypeNode::Error => OtherKind::AnyOrError,
            _ => OtherKind::Other,
        };

        match other {
            OtherKind::Metatable(o_table, o_meta) => {
                let mut inner = self.child();
                inner.unify_ty(m_table, o_table, false, false);
                inner.unify_ty(m_meta, o_meta, false, false);
                let (inner_log, inner_errors) = inner.into_parts();

                if self.options.extended_type_mismatch_error {
                    if let Some(e) = find_too_complex(&inner_errors) {
                        self.errors.push(e);
                    } else if !inner_errors.is_empty() {
                        self.error(TypeErrorKind::TypeMismatch {
                            wanted,
                            given,
                            reason: None,
                            inner: Some(Box::new(inner_errors[0].clone())),
                        });
                    }
                } else {
                    self.check_child_mismatch(&inner_errors, wanted, given);
                }

                self.log.concat(inner_log);
            }
            OtherKind::Table(TableState::Free) => {
                // A free table may well be this exact metatabled value.
                self.unify_ty(m_table, other_id, false, false);
                self.record_ty(other_id);
                if let TypeNode::Table(t) = self.graph.get_mut(other_id) {
                    t.bound_to = Some(metatable_id);
                }
            }
            // The shape of sealed, unsealed and generic tables is known; a
            // metatable cannot be added to them.
            OtherKind::Table(_) => self.error(TypeErrorKind::mismatch(wanted, given)),
            OtherKind::AnyOrError => {}
            OtherKind::Other => self.error(TypeErrorKind::mismatch(wanted, given)),
        }
    }

    // ========================================================================
    // Classes
    // ========================================================================

    /// Class unification is almost, but not quite, symmetrical; `reversed`
    /// says which scenario we are in.
    pub(crate) fn unify_with_class(&mut self, super_ty: TypeId, sub_ty: TypeId, reversed: bool) {
        let (mut super_ty, mut sub_ty) = (super_ty, sub_ty);
        if reversed {
            std::mem::swap(&mut super_ty, &mut sub_ty);
        }

        let super_class = match self.graph.get(super_ty) {
            TypeNode::Class(c) => c.clone(),
            _ => self.ice("unify_with_class invoked with non-class type"),
        };

        enum SubKind {
            Class,
            FreeTable,
            Other,
        }
        let sub_kind = match self.graph.get(sub_ty) {
            TypeNode::Class(_) => SubKind::Class,
            TypeNode::Table(t) if t.state == TableState::Free => SubKind::FreeTable,
            _ => SubKind::Other,
        };

        match sub_kind {
            SubKind::Class => match self.variance {
                Variance::Covariant => {
                    if !self.is_subclass(sub_ty, super_ty) {
                        self.class_fail(super_ty, sub_ty, reversed);
                    }
                }
                Variance::Invariant => {
                    if sub_ty != super_ty {
                        self.class_fail(super_ty, sub_ty, reversed);
                    }
                }
            },
            SubKind::FreeTable => {
                // A free table may be discovered to be a class instance: all
                // its properties must exist on the class with compatible
                // types, and it must have no indexer.
                let table = match self.graph.get(sub_ty) {
                    TypeNode::Table(t) => t.clone(),
                    _ => unreachable!(),
                };

                let mut ok = true;
                for (&name, prop) in &table.props {
                    if let Some(class_prop_ty) = self.lookup_class_prop(super_ty, name) {
                        if self.options.extended_class_mismatch_error {
                            let mut inner = self.child();
                            inner.unify_ty(prop.ty, class_prop_ty, false, false);
                            let (mut inner_log, inner_errors) = inner.into_parts();

                            let (wanted, given) = if reversed {
                                (sub_ty, super_ty)
                            } else {
                                (super_ty, sub_ty)
                            };
                            self.check_child_mismatch_with_prop(&inner_errors, name, wanted, given);

                            if inner_errors.is_empty() {
                                self.log.concat(inner_log);
                            } else {
                                ok = false;
                                inner_log.rollback(self.graph);
                            }
                        } else {
                            self.unify_ty(prop.ty, class_prop_ty, false, false);
                        }
                    } else {
                        ok = false;
                        self.error(TypeErrorKind::UnknownProperty {
                            container: super_ty,
                            name,
                        });
                        if !self.options.extended_class_mismatch_error {
                            self.unify_ty(prop.ty, TypeId::ERROR, false, false);
                        }
                    }
                }

                if table.indexer.is_some() {
                    ok = false;
                    let class_name = self.interner.resolve(super_class.name);
                    self.error(TypeErrorKind::GenericError {
                        message: format!("class '{class_name}' does not have an indexer"),
                    });
                }

                if !ok {
                    return;
                }

                self.record_ty(sub_ty);
                if let TypeNode::Table(t) = self.graph.get_mut(sub_ty) {
                    t.bound_to = Some(super_ty);
                }
            }
            SubKind::Other => self.class_fail(super_ty, sub_ty, reversed),
        }
    }

    fn class_fail(&mut self, super_ty: TypeId, sub_ty: TypeId, reversed: bool) {
        if reversed {
            self.error(TypeErrorKind::mismatch(sub_ty, super_ty));
        } else {
            self.error(TypeErrorKind::mismatch(super_ty, sub_ty));
        }
    }

    /// Walk the parent chain looking for `ancestor`.
    fn is_subclass(&self, sub_class: TypeId, ancestor: TypeId) -> bool {
        let mut current = self.graph.follow(sub_class);
        let ancestor = self.graph.follow(ancestor);
        let mut hops = 0usize;
        loop {
            if current == ancestor {
                return true;
            }
            let parent = match self.graph.get(current) {
                TypeNode::Class(c) => c.parent,
                _ => None,
            };
            match parent {
                Some(parent) => current = self.graph.follow(parent),
                None => return false,
            }
            hops += 1;
            if hops > self.options.recursion_limit {
                return false;
            }
        }
    }

    /// Look up a property on a class, consulting ancestors.
    fn lookup_class_prop(&self, class: TypeId, name: NameId) -> Option<TypeId> {
        let mut current = self.graph.follow(class);
        let mut hops = 0usize;
        loop {
            let class = match self.graph.get(current) {
                TypeNode::Class(c) => c,
                _ => return None,
            };
            if let Some(prop) = class.props.get(&name) {
                return Some(prop.ty);
            }
            match class.parent {
                Some(parent) => current = self.graph.follow(parent),
                None => return None,
            }
            hops += 1;
            if hops > self.options.recursion_limit {
                return None;
            }
        }
    }
}
