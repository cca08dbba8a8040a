// type_utils.rs
//
// Shared predicates and lookups over the type graph.

use rustc_hash::FxHashSet;

use marten_identity::NameId;

use crate::type_graph::{PrimitiveKind, SingletonValue, TypeGraph, TypeId, TypeNode};

/// True when the type is `nil`.
pub fn is_nil(graph: &TypeGraph, ty: TypeId) -> bool {
    matches!(
        graph.get(graph.follow(ty)),
        TypeNode::Primitive(PrimitiveKind::Nil)
    )
}

/// True when the type is the `string` primitive.
pub fn is_string(graph: &TypeGraph, ty: TypeId) -> bool {
    matches!(
        graph.get(graph.follow(ty)),
        TypeNode::Primitive(PrimitiveKind::String)
    )
}

/// True when the type admits `nil`: it is `nil` itself or a union with a
/// `nil` option.
///
/// Note that `is_optional(any)` is false even though `any` admits `nil`.
/// Several unification branches lean on that; see the design notes.
pub fn is_optional(graph: &TypeGraph, ty: TypeId) -> bool {
    let ty = graph.follow(ty);
    if is_nil(graph, ty) {
        return true;
    }
    match graph.get(ty) {
        TypeNode::Union { options } => options.iter().any(|&opt| is_nil(graph, opt)),
        _ => false,
    }
}

/// The display name of a type, when it has one: a table's name or synthetic
/// name, a class's name, or the name of a metatable's underlying table.
pub fn type_name(graph: &TypeGraph, ty: TypeId) -> Option<NameId> {
    match graph.get(graph.follow(ty)) {
        TypeNode::Table(table) => table.name.or(table.synthetic_name),
        TypeNode::Class(class) => Some(class.name),
        TypeNode::Metatable { table, .. } => type_name(graph, *table),
        _ => None,
    }
}

/// Look up a property on a table-like type, respecting metatables: consult
/// the table's own props first, then chase the metatable's `__index` table
/// chain. Cycle-safe.
pub fn find_table_property(
    graph: &TypeGraph,
    index_name: NameId,
    ty: TypeId,
    name: NameId,
) -> Option<TypeId> {
    let mut seen: FxHashSet<TypeId> = FxHashSet::default();
    let mut current = graph.follow(ty);

    loop {
        if !seen.insert(current) {
            return None;
        }

        match graph.get(current) {
            TypeNode::Table(table) => {
                return table.props.get(&name).map(|prop| prop.ty);
            }
            TypeNode::Metatable { table, metatable } => {
                let table = graph.follow(*table);
                if let TypeNode::Table(inner) = graph.get(table) {
                    if let Some(prop) = inner.props.get(&name) {
                        return Some(prop.ty);
                    }
                }
                // Fall through to the metatable's __index table.
                let metatable = graph.follow(*metatable);
                let index = match graph.get(metatable) {
                    TypeNode::Table(meta) => meta.props.get(&index_name).map(|prop| prop.ty),
                    _ => None,
                };
                match index {
                    Some(index_ty) => current = graph.follow(index_ty),
                    None => return None,
                }
            }
            _ => return None,
        }
    }
}

/// The first singleton-typed property of a table, used for tagged-union
/// discrimination. Looks through a metatable's underlying table.
pub fn table_match_tag(graph: &TypeGraph, ty: TypeId) -> Option<(NameId, SingletonValue)> {
    match graph.get(graph.follow(ty)) {
        TypeNode::Table(table) => {
            for (&name, prop) in &table.props {
                if let TypeNode::Singleton(value) = graph.get(graph.follow(prop.ty)) {
                    return Some((name, value.clone()));
                }
            }
            None
        }
        TypeNode::Metatable { table, .. } => table_match_tag(graph, *table),
        _ => None,
    }
}
