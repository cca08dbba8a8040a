// unify/tests.rs
//
// Scenario tests for the unifier: primitives, functions, packs, tables,
// unions, classes, rollback and caching.

use miette::SourceSpan;

use marten_identity::{NameId, NameInterner};

use crate::errors::{CountContext, MissingDirection, TypeError, TypeErrorKind};
use crate::options::{Mode, TypecheckOptions, Variance};
use crate::type_graph::{
    PackId, PackNode, Property, TableState, TypeGraph, TypeId, TypeLevel, TypeNode,
};
use crate::unify::{SharedState, Unifier};
use crate::well_known::WellKnownNames;

struct Fixture {
    graph: TypeGraph,
    shared: SharedState,
    interner: NameInterner,
    options: TypecheckOptions,
    mode: Mode,
    variance: Variance,
}

impl Fixture {
    fn new() -> Self {
        let mut interner = NameInterner::new();
        let shared = SharedState::new(WellKnownNames::new(&mut interner));
        Self {
            graph: TypeGraph::new(),
            shared,
            interner,
            options: TypecheckOptions::default(),
            mode: Mode::Strict,
            variance: Variance::Covariant,
        }
    }

    fn name(&mut self, name: &str) -> NameId {
        self.interner.intern(name)
    }

    fn unifier(&mut self) -> Unifier<'_> {
        Unifier::new(
            &mut self.graph,
            &mut self.shared,
            &self.interner,
            self.options,
            self.mode,
            SourceSpan::from((0, 0)),
            self.variance,
        )
    }

    fn try_unify(&mut self, super_ty: TypeId, sub_ty: TypeId) -> Vec<TypeError> {
        let mut state = self.unifier();
        state.try_unify_type(super_ty, sub_ty, false, false);
        state.errors
    }

    fn try_unify_packs(&mut self, super_tp: PackId, sub_tp: PackId) -> Vec<TypeError> {
        let mut state = self.unifier();
        state.try_unify_pack(super_tp, sub_tp, false);
        state.errors
    }
}

fn unwrap_inner(error: &TypeError) -> &TypeError {
    match &error.kind {
        TypeErrorKind::TypeMismatch {
            inner: Some(inner), ..
        } => inner,
        _ => panic!("expected a mismatch with an inner error, got {:?}", error),
    }
}

// ============================================================================
// Primitives and singletons
// ============================================================================

#[test]
fn primitives_unify() {
    let mut fx = Fixture::new();
    let one = fx.graph.add_type(TypeNode::Primitive(crate::type_graph::PrimitiveKind::Number));
    let two = fx.graph.add_type(TypeNode::Primitive(crate::type_graph::PrimitiveKind::Number));

    let errors = fx.try_unify(one, two);
    assert!(errors.is_empty());
}

#[test]
fn primitive_mismatch() {
    let mut fx = Fixture::new();
    let errors = fx.try_unify(TypeId::NUMBER, TypeId::STRING);

    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0].kind,
        TypeErrorKind::TypeMismatch {
            wanted: TypeId::NUMBER,
            given: TypeId::STRING,
            ..
        }
    ));
}

#[test]
fn primitive_accepts_singleton_covariantly() {
    let mut fx = Fixture::new();
    let yes = fx.graph.singleton_bool(true);
    let hello = fx.graph.singleton_str("hello");

    assert!(fx.try_unify(TypeId::BOOLEAN, yes).is_empty());
    assert!(fx.try_unify(TypeId::STRING, hello).is_empty());
    // The other direction is not admissible.
    assert_eq!(fx.try_unify(hello, TypeId::STRING).len(), 1);
}

#[test]
fn primitive_rejects_singleton_invariantly() {
    let mut fx = Fixture::new();
    fx.variance = Variance::Invariant;
    let yes = fx.graph.singleton_bool(true);

    assert_eq!(fx.try_unify(TypeId::BOOLEAN, yes).len(), 1);
}

#[test]
fn equal_singletons_unify_invariantly() {
    let mut fx = Fixture::new();
    fx.variance = Variance::Invariant;
    let a = fx.graph.singleton_str("tag");
    let b = fx.graph.singleton_str("tag");

    assert!(fx.try_unify(a, b).is_empty());
}

// ============================================================================
// Free variables and levels
// ============================================================================

#[test]
fn free_variable_binds_to_concrete_type() {
    let mut fx = Fixture::new();
    let free = fx.graph.fresh_type(TypeLevel::default());

    let errors = fx.try_unify(free, TypeId::NUMBER);
    assert!(errors.is_empty());
    assert_eq!(fx.graph.follow(free), TypeId::NUMBER);
}

#[test]
fn free_free_binding_prefers_outer_level() {
    let mut fx = Fixture::new();
    let outer = fx.graph.fresh_type(TypeLevel::new(0, 0));
    let inner = fx.graph.fresh_type(TypeLevel::new(1, 0));

    // The outer level wins regardless of which side it is on.
    assert!(fx.try_unify(outer, inner).is_empty());
    assert_eq!(fx.graph.follow(inner), outer);

    let outer2 = fx.graph.fresh_type(TypeLevel::new(0, 0));
    let inner2 = fx.graph.fresh_type(TypeLevel::new(1, 0));
    assert!(fx.try_unify(inner2, outer2).is_empty());
    assert_eq!(fx.graph.follow(inner2), outer2);
}

#[test]
fn generic_escaping_scope_is_an_error() {
    let mut fx = Fixture::new();
    let free = fx.graph.fresh_type(TypeLevel::new(0, 0));
    let generic = fx.graph.add_type(TypeNode::Generic {
        level: TypeLevel::new(1, 0),
    });

    let errors = fx.try_unify(free, generic);
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0].kind, TypeErrorKind::GenericError { .. }));
}

#[test]
fn binding_promotes_levels_throughout() {
    let mut fx = Fixture::new();
    let outer_free = fx.graph.fresh_type(TypeLevel::new(0, 0));
    let inner_elem = fx.graph.fresh_type(TypeLevel::new(2, 0));
    let x = fx.name("x");
    let table = fx
        .graph
        .table_with_props([(x, inner_elem)], TableState::Sealed, TypeLevel::new(2, 0));

    assert!(fx.try_unify(outer_free, table).is_empty());
    assert_eq!(fx.graph.follow(outer_free), table);
    assert!(matches!(
        fx.graph.get(table),
        TypeNode::Table(t) if t.level == TypeLevel::new(0, 0)
    ));
    assert!(matches!(
        fx.graph.get(inner_elem),
        TypeNode::Free { level } if *level == TypeLevel::new(0, 0)
    ));
}

// ============================================================================
// Occurs check
// ============================================================================

#[test]
fn occurs_check_catches_recursive_function() {
    let mut fx = Fixture::new();
    fx.options.occurs_check_ok_with_recursive_functions = false;

    let a = fx.graph.fresh_type(TypeLevel::default());
    let b = fx.graph.function([a].as_slice(), [a].as_slice());

    let errors = fx.try_unify(a, b);
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0].kind, TypeErrorKind::OccursCheckFailed));
    assert!(matches!(fx.graph.get(a), TypeNode::Error));
}

#[test]
fn recursive_function_type_is_legal_when_allowed() {
    let mut fx = Fixture::new();
    let a = fx.graph.fresh_type(TypeLevel::default());
    let b = fx.graph.function([a].as_slice(), [a].as_slice());

    let errors = fx.try_unify(a, b);
    assert!(errors.is_empty());
    assert_eq!(fx.graph.follow(a), b);
}

#[test]
fn occurs_check_always_traverses_unions() {
    let mut fx = Fixture::new();
    let a = fx.graph.fresh_type(TypeLevel::default());
    let u = fx.graph.union(smallvec::smallvec![a, TypeId::NUMBER]);

    let errors = fx.try_unify(a, u);
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0].kind, TypeErrorKind::OccursCheckFailed));
    assert!(matches!(fx.graph.get(a), TypeNode::Error));
}

// ============================================================================
// Functions and packs
// ============================================================================

#[test]
fn function_arity_mismatch_reports_counts() {
    let mut fx = Fixture::new();
    let super_fn = fx.graph.function([TypeId::NUMBER].as_slice(), [TypeId::NUMBER].as_slice());
    let sub_fn = fx
        .graph
        .function([TypeId::NUMBER, TypeId::STRING].as_slice(), [TypeId::NUMBER].as_slice());

    let errors = fx.try_unify(super_fn, sub_fn);
    assert_eq!(errors.len(), 1);
    let inner = unwrap_inner(&errors[0]);
    assert!(matches!(
        inner.kind,
        TypeErrorKind::CountMismatch {
            expected: 1,
            actual: 2,
            context: CountContext::Arg,
        }
    ));
}

#[test]
fn return_count_mismatch_swaps_for_readability() {
    let mut fx = Fixture::new();
    let super_fn = fx.graph.function([].as_slice(), [TypeId::NUMBER].as_slice());
    let sub_fn = fx.graph.function([].as_slice(), [].as_slice());

    let errors = fx.try_unify(super_fn, sub_fn);
    assert_eq!(errors.len(), 1);
    let inner = unwrap_inner(&errors[0]);
    assert!(matches!(
        inner.kind,
        TypeErrorKind::CountMismatch {
            expected: 1,
            actual: 0,
            context: CountContext::Result,
        }
    ));
}

#[test]
fn compatible_functions_bind_free_results() {
    let mut fx = Fixture::new();
    let free_ret = fx.graph.fresh_type(TypeLevel::default());
    let super_fn = fx.graph.function([TypeId::NUMBER].as_slice(), [free_ret].as_slice());
    let sub_fn = fx.graph.function([TypeId::NUMBER].as_slice(), [TypeId::STRING].as_slice());

    let errors = fx.try_unify(super_fn, sub_fn);
    assert!(errors.is_empty());
    assert_eq!(fx.graph.follow(free_ret), TypeId::STRING);
}

#[test]
fn variadic_absorbs_finite_pack() {
    let mut fx = Fixture::new();
    let variadic = fx.graph.variadic(TypeId::NUMBER);
    let finite = fx.graph.pack_of([TypeId::NUMBER, TypeId::STRING].as_slice());

    let errors = fx.try_unify_packs(variadic, finite);
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0].kind,
        TypeErrorKind::TypeMismatch {
            wanted: TypeId::NUMBER,
            given: TypeId::STRING,
            ..
        }
    ));
}

#[test]
fn variadic_tail_unifies_with_variadic() {
    let mut fx = Fixture::new();
    let inner_variadic = fx.graph.variadic(TypeId::BOOLEAN);
    let a = fx.graph.pack_of([
        TypeId::NUMBER,
        TypeId::STRING,
        TypeId::BOOLEAN,
        TypeId::BOOLEAN,
    ].as_slice());
    let b = fx.graph.add_pack(PackNode::Pack {
        head: smallvec::smallvec![TypeId::NUMBER, TypeId::STRING],
        tail: Some(inner_variadic),
    });

    let errors = fx.try_unify_packs(a, b);
    assert!(errors.is_empty());
}

#[test]
fn trailing_optional_argument_may_be_absent() {
    let mut fx = Fixture::new();
    let opt_string = fx.graph.optional(TypeId::STRING);
    let super_fn = fx.graph.function([TypeId::NUMBER].as_slice(), [].as_slice());
    let sub_fn = fx.graph.function([TypeId::NUMBER, opt_string].as_slice(), [].as_slice());

    let errors = fx.try_unify(super_fn, sub_fn);
    assert!(errors.is_empty());
}

#[test]
fn nonstrict_any_argument_may_be_absent() {
    let mut fx = Fixture::new();
    fx.mode = Mode::Nonstrict;
    let super_fn = fx.graph.function([TypeId::NUMBER, TypeId::ANY].as_slice(), [].as_slice());
    let sub_fn = fx.graph.function([TypeId::NUMBER].as_slice(), [].as_slice());

    // Arguments unify contravariantly, so the extra `any` sits on the
    // supertype side of the pack walk.
    let errors = fx.try_unify(sub_fn, super_fn);
    assert!(errors.is_empty());
}

#[test]
fn free_pack_binds_to_other_side() {
    let mut fx = Fixture::new();
    let free = fx.graph.fresh_pack(TypeLevel::default());
    let concrete = fx.graph.pack_of([TypeId::NUMBER].as_slice());

    let errors = fx.try_unify_packs(free, concrete);
    assert!(errors.is_empty());
    assert_eq!(fx.graph.follow_pack(free), concrete);
}

#[test]
fn free_tail_grows_to_match() {
    let mut fx = Fixture::new();
    let tail = fx.graph.fresh_pack(TypeLevel::default());
    let growing = fx.graph.add_pack(PackNode::Pack {
        head: smallvec::smallvec![TypeId::NUMBER],
        tail: Some(tail),
    });
    let fixed = fx.graph.pack_of([TypeId::NUMBER, TypeId::STRING].as_slice());

    let errors = fx.try_unify_packs(fixed, growing);
    assert!(errors.is_empty());

    let (elements, _) = fx.graph.flatten_pack(growing);
    assert_eq!(elements.len(), 2);
    assert_eq!(fx.graph.follow(elements[1]), TypeId::STRING);
}

#[test]
fn failed_pack_members_settle_to_error() {
    let mut fx = Fixture::new();
    let free_a = fx.graph.fresh_type(TypeLevel::default());
    let free_b = fx.graph.fresh_type(TypeLevel::default());
    let super_tp = fx.graph.pack_of([TypeId::NUMBER].as_slice());
    let sub_tp = fx.graph.pack_of([free_a, free_b].as_slice());

    // Checking a call's arguments: the extra value is an arity error, and
    // the leftovers are settled so inference stops seeing them as free.
    let mut state = fx.unifier();
    state.try_unify_pack(sub_tp, super_tp, true);
    let errors = state.errors;

    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0].kind,
        TypeErrorKind::CountMismatch {
            expected: 1,
            actual: 2,
            ..
        }
    ));
    assert_eq!(fx.graph.follow(free_a), TypeId::NUMBER);
    assert_eq!(fx.graph.follow(free_b), TypeId::ERROR);
}

// ============================================================================
// Unions and intersections
// ============================================================================

#[test]
fn sub_union_requires_every_option() {
    let mut fx = Fixture::new();
    let u = fx
        .graph
        .union(smallvec::smallvec![TypeId::NUMBER, TypeId::STRING]);

    let errors = fx.try_unify(TypeId::NUMBER, u);
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0].kind,
        TypeErrorKind::TypeMismatch {
            inner: Some(_),
            reason: Some(reason),
            ..
        } if reason.contains("union")
    ));
}

#[test]
fn super_union_accepts_any_matching_option() {
    let mut fx = Fixture::new();
    let u = fx
        .graph
        .union(smallvec::smallvec![TypeId::NUMBER, TypeId::STRING]);
    let string2 = fx
        .graph
        .add_type(TypeNode::Primitive(crate::type_graph::PrimitiveKind::String));

    assert!(fx.try_unify(u, string2).is_empty());
    assert_eq!(fx.try_unify(u, TypeId::BOOLEAN).len(), 1);
}

#[test]
fn super_intersection_requires_every_part() {
    let mut fx = Fixture::new();
    let i = fx
        .graph
        .intersection(smallvec::smallvec![TypeId::NUMBER, TypeId::STRING]);

    let errors = fx.try_unify(i, TypeId::NUMBER);
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0].kind,
        TypeErrorKind::TypeMismatch { reason: Some(reason), .. }
            if reason.contains("intersection")
    ));
}

#[test]
fn sub_intersection_needs_one_part() {
    let mut fx = Fixture::new();
    let i = fx
        .graph
        .intersection(smallvec::smallvec![TypeId::STRING, TypeId::NUMBER]);

    assert!(fx.try_unify(TypeId::NUMBER, i).is_empty());
}

#[test]
fn tagged_union_discrimination() {
    let mut fx = Fixture::new();
    let tag = fx.name("tag");
    let x = fx.name("x");
    let y = fx.name("y");

    let tag_a = fx.graph.singleton_str("a");
    let tag_b = fx.graph.singleton_str("b");
    let option_a = fx.graph.table_with_props(
        [(tag, tag_a), (x, TypeId::NUMBER)],
        TableState::Sealed,
        TypeLevel::default(),
    );
    let option_b = fx.graph.table_with_props(
        [(tag, tag_b), (y, TypeId::STRING)],
        TableState::Sealed,
        TypeLevel::default(),
    );
    let u = fx.graph.union(smallvec::smallvec![option_a, option_b]);

    let sub_tag = fx.graph.singleton_str("b");
    let sub = fx.graph.table_with_props(
        [(tag, sub_tag), (y, TypeId::STRING)],
        TableState::Sealed,
        TypeLevel::default(),
    );

    let errors = fx.try_unify(u, sub);
    assert!(errors.is_empty());
}

// ============================================================================
// Tables
// ============================================================================

#[test]
fn tables_with_matching_props_unify() {
    let mut fx = Fixture::new();
    let foo = fx.name("foo");
    let free_a = fx.graph.fresh_type(TypeLevel::default());
    let free_b = fx.graph.fresh_type(TypeLevel::default());
    let one = fx
        .graph
        .table_with_props([(foo, free_a)], TableState::Unsealed, TypeLevel::default());
    let two = fx
        .graph
        .table_with_props([(foo, free_b)], TableState::Unsealed, TypeLevel::default());

    let errors = fx.try_unify(one, two);
    assert!(errors.is_empty());
    assert_eq!(fx.graph.follow(free_a), fx.graph.follow(free_b));
}

#[test]
fn incompatible_tables_roll_back() {
    let mut fx = Fixture::new();
    let x = fx.name("x");
    let one = fx
        .graph
        .table_with_props([(x, TypeId::NUMBER)], TableState::Sealed, TypeLevel::default());
    let two = fx
        .graph
        .table_with_props([(x, TypeId::STRING)], TableState::Sealed, TypeLevel::default());

    let before = fx.graph.clone();
    let mut state = fx.unifier();
    let errors = state.can_unify_type(one, two);

    assert!(!errors.is_empty());
    assert_eq!(before, fx.graph);
}

#[test]
fn missing_property_is_reported_early() {
    let mut fx = Fixture::new();
    let x = fx.name("x");
    let y = fx.name("y");
    let super_table = fx.graph.table_with_props(
        [(x, TypeId::NUMBER), (y, TypeId::STRING)],
        TableState::Sealed,
        TypeLevel::default(),
    );
    let sub_table = fx
        .graph
        .table_with_props([(x, TypeId::NUMBER)], TableState::Sealed, TypeLevel::default());

    let errors = fx.try_unify(super_table, sub_table);
    assert_eq!(errors.len(), 1);
    match &errors[0].kind {
        TypeErrorKind::MissingProperties {
            names, direction, ..
        } => {
            assert_eq!(names, &vec![y]);
            assert_eq!(*direction, MissingDirection::Missing);
        }
        other => panic!("expected MissingProperties, got {other:?}"),
    }
}

#[test]
fn covariant_width_subtyping_tolerates_extras() {
    let mut fx = Fixture::new();
    let x = fx.name("x");
    let y = fx.name("y");
    let super_table = fx
        .graph
        .table_with_props([(x, TypeId::NUMBER)], TableState::Sealed, TypeLevel::default());
    let sub_table = fx.graph.table_with_props(
        [(x, TypeId::NUMBER), (y, TypeId::STRING)],
        TableState::Sealed,
        TypeLevel::default(),
    );

    assert!(fx.try_unify(super_table, sub_table).is_empty());

    // Invariance makes the width check symmetric.
    fx.variance = Variance::Invariant;
    let errors = fx.try_unify(super_table, sub_table);
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0].kind,
        TypeErrorKind::MissingProperties {
            direction: MissingDirection::Extra,
            ..
        }
    ));
}

#[test]
fn free_table_learns_props_and_binds() {
    let mut fx = Fixture::new();
    let x = fx.name("x");
    let y = fx.name("y");
    let free_prop = fx.graph.fresh_type(TypeLevel::default());
    let free_table = fx
        .graph
        .table_with_props([(x, free_prop)], TableState::Free, TypeLevel::default());
    let sealed = fx.graph.table_with_props(
        [(x, TypeId::NUMBER), (y, TypeId::STRING)],
        TableState::Sealed,
        TypeLevel::default(),
    );

    let errors = fx.try_unify(sealed, free_table);
    assert!(errors.is_empty());
    assert_eq!(fx.graph.follow(free_prop), TypeId::NUMBER);
    assert_eq!(fx.graph.follow(free_table), sealed);
}

#[test]
fn unsealed_supertype_learns_optional_props() {
    let mut fx = Fixture::new();
    let x = fx.name("x");
    let unsealed = fx.graph.table(TableState::Unsealed, TypeLevel::default());
    let sealed = fx
        .graph
        .table_with_props([(x, TypeId::NUMBER)], TableState::Sealed, TypeLevel::default());

    let mut state = fx.unifier();
    state.try_unify_type(unsealed, sealed, false, false);
    assert!(state.errors.is_empty());
    let mut log = std::mem::take(&mut state.log);
    drop(state);

    match fx.graph.get(unsealed) {
        TypeNode::Table(t) => {
            let prop = t.props.get(&x).expect("unsealed table should learn x");
            assert!(crate::type_utils::is_optional(&fx.graph, prop.ty));
        }
        _ => panic!("expected table"),
    }

    // Rolling the log back removes the learned property again.
    log.rollback(&mut fx.graph);
    match fx.graph.get(unsealed) {
        TypeNode::Table(t) => assert!(t.props.is_empty()),
        _ => panic!("expected table"),
    }
}

#[test]
fn cyclic_tables_unify_via_seen_set() {
    let mut fx = Fixture::new();
    let field = fx.name("field");
    let a = fx.graph.table(TableState::Sealed, TypeLevel::default());
    let b = fx.graph.table(TableState::Sealed, TypeLevel::default());
    if let TypeNode::Table(t) = fx.graph.get_mut(a) {
        t.props.insert(field, Property::new(a));
    }
    if let TypeNode::Table(t) = fx.graph.get_mut(b) {
        t.props.insert(field, Property::new(b));
    }

    let errors = fx.try_unify(a, b);
    assert!(errors.is_empty());
}

#[test]
fn repeated_unification_makes_no_new_mutations() {
    let mut fx = Fixture::new();
    let x = fx.name("x");
    let free_prop = fx.graph.fresh_type(TypeLevel::default());
    let free_table = fx
        .graph
        .table_with_props([(x, free_prop)], TableState::Free, TypeLevel::default());
    let sealed = fx
        .graph
        .table_with_props([(x, TypeId::NUMBER)], TableState::Sealed, TypeLevel::default());

    assert!(fx.try_unify(sealed, free_table).is_empty());

    let mut second = fx.unifier();
    second.try_unify_type(sealed, free_table, false, false);
    assert!(second.errors.is_empty());
    assert!(second.log.is_empty());
}

// ============================================================================
// Legacy table path
// ============================================================================

#[test]
fn legacy_sealed_tables_demand_equal_shape() {
    let mut fx = Fixture::new();
    fx.options.table_subtyping_variance = false;
    let x = fx.name("x");
    let y = fx.name("y");
    let narrow = fx
        .graph
        .table_with_props([(x, TypeId::NUMBER)], TableState::Sealed, TypeLevel::default());
    let wide = fx.graph.table_with_props(
        [(x, TypeId::NUMBER), (y, TypeId::STRING)],
        TableState::Sealed,
        TypeLevel::default(),
    );

    let errors = fx.try_unify(narrow, wide);
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0].kind,
        TypeErrorKind::MissingProperties {
            direction: MissingDirection::Extra,
            ..
        }
    ));
}

#[test]
fn legacy_free_table_binds_to_sealed() {
    let mut fx = Fixture::new();
    fx.options.table_subtyping_variance = false;
    let x = fx.name("x");
    let free_prop = fx.graph.fresh_type(TypeLevel::default());
    let free_table = fx
        .graph
        .table_with_props([(x, free_prop)], TableState::Free, TypeLevel::default());
    let sealed = fx
        .graph
        .table_with_props([(x, TypeId::NUMBER)], TableState::Sealed, TypeLevel::default());

    let errors = fx.try_unify(free_table, sealed);
    assert!(errors.is_empty());
    assert_eq!(fx.graph.follow(free_prop), TypeId::NUMBER);
    assert_eq!(fx.graph.follow(free_table), sealed);
}

// ============================================================================
// Metatables
// ============================================================================

#[test]
fn metatables_unify_componentwise() {
    let mut fx = Fixture::new();
    let x = fx.name("x");
    let base_a = fx
        .graph
        .table_with_props([(x, TypeId::NUMBER)], TableState::Sealed, TypeLevel::default());
    let meta_a = fx.graph.table(TableState::Sealed, TypeLevel::default());
    let a = fx.graph.add_type(TypeNode::Metatable {
        table: base_a,
        metatable: meta_a,
    });

    let base_b = fx
        .graph
        .table_with_props([(x, TypeId::NUMBER)], TableState::Sealed, TypeLevel::default());
    let meta_b = fx.graph.table(TableState::Sealed, TypeLevel::default());
    let b = fx.graph.add_type(TypeNode::Metatable {
        table: base_b,
        metatable: meta_b,
    });

    assert!(fx.try_unify(a, b).is_empty());
}

#[test]
fn metatable_binds_free_table() {
    let mut fx = Fixture::new();
    let base = fx.graph.table(TableState::Sealed, TypeLevel::default());
    let meta = fx.graph.table(TableState::Sealed, TypeLevel::default());
    let mt = fx.graph.add_type(TypeNode::Metatable {
        table: base,
        metatable: meta,
    });
    let free_table = fx.graph.table(TableState::Free, TypeLevel::default());

    let errors = fx.try_unify(mt, free_table);
    assert!(errors.is_empty());
    assert_eq!(fx.graph.follow(free_table), mt);
}

#[test]
fn metatable_rejects_sealed_table() {
    let mut fx = Fixture::new();
    let base = fx.graph.table(TableState::Sealed, TypeLevel::default());
    let meta = fx.graph.table(TableState::Sealed, TypeLevel::default());
    let mt = fx.graph.add_type(TypeNode::Metatable {
        table: base,
        metatable: meta,
    });
    let sealed = fx.graph.table(TableState::Sealed, TypeLevel::default());

    assert_eq!(fx.try_unify(mt, sealed).len(), 1);
}

// ============================================================================
// Classes
// ============================================================================

#[test]
fn subclass_is_covariantly_compatible() {
    let mut fx = Fixture::new();
    let base_name = fx.name("Base");
    let derived_name = fx.name("Derived");
    let base = fx.graph.class(base_name, [], None);
    let derived = fx.graph.class(derived_name, [], Some(base));

    assert!(fx.try_unify(base, derived).is_empty());
    assert_eq!(fx.try_unify(derived, base).len(), 1);

    // Invariance demands the same class.
    fx.variance = Variance::Invariant;
    assert_eq!(fx.try_unify(base, derived).len(), 1);
}

#[test]
fn class_binds_free_table_with_matching_props() {
    let mut fx = Fixture::new();
    let foo = fx.name("Foo");
    let a = fx.name("a");
    let class = fx.graph.class(foo, [(a, TypeId::NUMBER)], None);

    let free_prop = fx.graph.fresh_type(TypeLevel::default());
    let free_table = fx
        .graph
        .table_with_props([(a, free_prop)], TableState::Free, TypeLevel::default());

    let errors = fx.try_unify(class, free_table);
    assert!(errors.is_empty());
    assert_eq!(fx.graph.follow(free_table), class);
    assert_eq!(fx.graph.follow(free_prop), TypeId::NUMBER);
}

#[test]
fn class_rejects_free_table_with_unknown_prop() {
    let mut fx = Fixture::new();
    let foo = fx.name("Foo");
    let a = fx.name("a");
    let b = fx.name("b");
    let class = fx.graph.class(foo, [(a, TypeId::NUMBER)], None);
    let free_table = fx
        .graph
        .table_with_props([(b, TypeId::NUMBER)], TableState::Free, TypeLevel::default());

    let errors = fx.try_unify(class, free_table);
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0].kind,
        TypeErrorKind::UnknownProperty { name, .. } if name == b
    ));
    // The table stays unbound.
    assert_eq!(fx.graph.follow(free_table), free_table);
}

// ============================================================================
// Any and error propagation
// ============================================================================

#[test]
fn any_settles_reachable_free_types() {
    let mut fx = Fixture::new();
    let x = fx.name("x");
    let free_prop = fx.graph.fresh_type(TypeLevel::default());
    let table = fx
        .graph
        .table_with_props([(x, free_prop)], TableState::Sealed, TypeLevel::default());

    let errors = fx.try_unify(TypeId::ANY, table);
    assert!(errors.is_empty());
    assert_eq!(fx.graph.follow(free_prop), TypeId::ANY);
}

#[test]
fn error_settles_free_packs_and_types() {
    let mut fx = Fixture::new();
    let free_arg = fx.graph.fresh_type(TypeLevel::default());
    let free_tail = fx.graph.fresh_pack(TypeLevel::default());
    let arg_pack = fx.graph.add_pack(PackNode::Pack {
        head: smallvec::smallvec![free_arg],
        tail: Some(free_tail),
    });
    let ret_pack = fx.graph.pack_of([].as_slice());
    let f = fx.graph.add_type(TypeNode::Function(
        crate::type_graph::FunctionType::new(arg_pack, ret_pack),
    ));

    let errors = fx.try_unify(TypeId::ERROR, f);
    assert!(errors.is_empty());
    assert_eq!(fx.graph.follow(free_arg), TypeId::ERROR);
    assert_eq!(fx.graph.follow_pack(free_tail), PackId::ERROR);
}

// ============================================================================
// Caching and rollback
// ============================================================================

#[test]
fn proven_table_pairs_are_cached() {
    let mut fx = Fixture::new();
    let x = fx.name("x");
    let one = fx
        .graph
        .table_with_props([(x, TypeId::NUMBER)], TableState::Sealed, TypeLevel::default());
    let two = fx
        .graph
        .table_with_props([(x, TypeId::NUMBER)], TableState::Sealed, TypeLevel::default());

    assert!(fx.try_unify(one, two).is_empty());
    assert!(fx.shared.cached_unify.contains(&(one, two)));

    // A cached pair keeps unifying cleanly.
    let mut state = fx.unifier();
    assert!(state.can_unify_type(one, two).is_empty());
}

#[test]
fn unstable_types_are_not_cached() {
    let mut fx = Fixture::new();
    let x = fx.name("x");
    let free_prop = fx.graph.fresh_type(TypeLevel::default());
    let unstable = fx
        .graph
        .table_with_props([(x, free_prop)], TableState::Sealed, TypeLevel::default());
    let sealed = fx
        .graph
        .table_with_props([(x, TypeId::NUMBER)], TableState::Sealed, TypeLevel::default());

    assert!(fx.try_unify(sealed, unstable).is_empty());
    assert!(!fx.shared.cached_unify.contains(&(sealed, unstable)));
}

#[test]
fn can_unify_never_mutates() {
    let mut fx = Fixture::new();
    let x = fx.name("x");
    let free_prop = fx.graph.fresh_type(TypeLevel::default());
    let free_table = fx
        .graph
        .table_with_props([(x, free_prop)], TableState::Free, TypeLevel::default());
    let y = fx.name("y");
    let sealed = fx.graph.table_with_props(
        [(x, TypeId::NUMBER), (y, TypeId::STRING)],
        TableState::Sealed,
        TypeLevel::default(),
    );

    let before = fx.graph.clone();
    let mut state = fx.unifier();
    let errors = state.can_unify_type(sealed, free_table);
    assert!(errors.is_empty());
    assert_eq!(before, fx.graph);
}

#[test]
fn iteration_budget_produces_too_complex() {
    let mut fx = Fixture::new();
    fx.options.iteration_limit = 1;
    let x = fx.name("x");
    let one = fx
        .graph
        .table_with_props([(x, TypeId::NUMBER)], TableState::Sealed, TypeLevel::default());
    let two = fx
        .graph
        .table_with_props([(x, TypeId::NUMBER)], TableState::Sealed, TypeLevel::default());

    let errors = fx.try_unify(one, two);
    assert!(
        errors
            .iter()
            .any(|e| matches!(e.kind, TypeErrorKind::UnificationTooComplex))
    );
}
