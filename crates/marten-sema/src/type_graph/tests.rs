// type_graph/tests.rs
//
// Unit tests for node allocation, follow, and builders.

use super::*;

#[test]
fn type_id_is_copy() {
    let id = TypeId::from_raw(42);
    let id2 = id;
    assert_eq!(id, id2);
}

#[test]
fn type_id_size() {
    assert_eq!(size_of::<TypeId>(), 4);
    assert_eq!(size_of::<PackId>(), 4);
}

#[test]
fn sentinels_preallocated() {
    let graph = TypeGraph::new();
    assert!(matches!(graph.get(TypeId::ERROR), TypeNode::Error));
    assert!(matches!(graph.get(TypeId::ANY), TypeNode::Any));
    assert!(matches!(
        graph.get(TypeId::NUMBER),
        TypeNode::Primitive(PrimitiveKind::Number)
    ));
    assert!(matches!(graph.pack(PackId::ERROR), PackNode::Error));
    assert!(matches!(
        graph.pack(PackId::ANY),
        PackNode::Variadic { ty: TypeId::ANY }
    ));
    assert_eq!(graph.type_count(), TypeId::FIRST_DYNAMIC as usize);
    assert_eq!(graph.pack_count(), PackId::FIRST_DYNAMIC as usize);
}

#[test]
fn follow_chases_bound_chains() {
    let mut graph = TypeGraph::new();
    let a = graph.fresh_type(TypeLevel::default());
    let b = graph.fresh_type(TypeLevel::default());
    *graph.get_mut(a) = TypeNode::Bound(b);
    *graph.get_mut(b) = TypeNode::Bound(TypeId::NUMBER);

    assert_eq!(graph.follow(a), TypeId::NUMBER);
    assert_eq!(graph.follow(b), TypeId::NUMBER);
    assert_eq!(graph.follow(TypeId::NUMBER), TypeId::NUMBER);
}

#[test]
fn follow_chases_table_bound_to() {
    let mut graph = TypeGraph::new();
    let target = graph.table(TableState::Sealed, TypeLevel::default());
    let free = graph.table(TableState::Free, TypeLevel::default());
    if let TypeNode::Table(t) = graph.get_mut(free) {
        t.bound_to = Some(target);
    }

    assert_eq!(graph.follow(free), target);
}

#[test]
fn follow_pack_chases_bound() {
    let mut graph = TypeGraph::new();
    let a = graph.fresh_pack(TypeLevel::default());
    let b = graph.pack_of([TypeId::NUMBER].as_slice());
    *graph.pack_mut(a) = PackNode::Bound(b);

    assert_eq!(graph.follow_pack(a), b);
}

#[test]
fn fresh_type_is_free_at_level() {
    let mut graph = TypeGraph::new();
    let level = TypeLevel::new(2, 1);
    let f = graph.fresh_type(level);
    assert!(matches!(graph.get(f), TypeNode::Free { level: l } if *l == level));
}

#[test]
fn function_builder_allocates_packs() {
    let mut graph = TypeGraph::new();
    let f = graph.function([TypeId::NUMBER].as_slice(), [TypeId::STRING].as_slice());
    match graph.get(f) {
        TypeNode::Function(func) => {
            assert!(func.generics.is_empty());
            let (args, arg_tail) = graph.flatten_pack(func.arg_pack);
            assert_eq!(args, vec![TypeId::NUMBER]);
            assert_eq!(arg_tail, None);
            let (rets, _) = graph.flatten_pack(func.ret_pack);
            assert_eq!(rets, vec![TypeId::STRING]);
        }
        _ => panic!("expected function type"),
    }
}

#[test]
fn optional_builder_is_union_with_nil() {
    let mut graph = TypeGraph::new();
    let opt = graph.optional(TypeId::NUMBER);
    match graph.get(opt) {
        TypeNode::Union { options } => {
            assert_eq!(options.len(), 2);
            assert!(options.contains(&TypeId::NIL));
            assert!(options.contains(&TypeId::NUMBER));
        }
        _ => panic!("expected union type"),
    }
}
