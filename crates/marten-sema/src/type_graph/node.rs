// type_graph/node.rs
//
// TypeNode / PackNode: the tagged unions stored in the TypeGraph, plus the
// table, function and class payloads.

use std::collections::BTreeMap;

use miette::SourceSpan;

use marten_identity::NameId;

use super::level::TypeLevel;
use super::type_id::{PackId, PackIdVec, TypeId, TypeIdVec};

/// Built-in value kinds of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Nil,
    Boolean,
    Number,
    String,
    Thread,
}

/// A literal type inhabited by exactly one value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SingletonValue {
    Bool(bool),
    Str(String),
}

/// A named member of a table or class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub ty: TypeId,
    /// Where the property was written, when known. Used to re-point
    /// diagnostics at the offending member.
    pub span: Option<SourceSpan>,
}

impl Property {
    pub fn new(ty: TypeId) -> Self {
        Self { ty, span: None }
    }

    pub fn with_span(ty: TypeId, span: SourceSpan) -> Self {
        Self {
            ty,
            span: Some(span),
        }
    }
}

/// An indexer: `[index_ty]: result_ty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableIndexer {
    pub index_ty: TypeId,
    pub result_ty: TypeId,
}

/// How much of a table's shape is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableState {
    /// Shape entirely unknown; unification may add properties and finally
    /// bind the whole table to its counterpart.
    Free,
    /// Shape known so far but still open to widening.
    Unsealed,
    /// Shape fixed.
    Sealed,
    /// Quantified table inside a generic function signature.
    Generic,
}

impl Default for TableState {
    fn default() -> Self {
        TableState::Unsealed
    }
}

/// Payload of a [`TypeNode::Table`].
///
/// Properties live in a `BTreeMap` so iteration (and therefore error
/// reporting) is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableType {
    pub props: BTreeMap<NameId, Property>,
    pub indexer: Option<TableIndexer>,
    pub state: TableState,
    pub level: TypeLevel,
    pub name: Option<NameId>,
    pub synthetic_name: Option<NameId>,
    /// Set when unification decides this (free) table *is* another type.
    /// `follow` chases it like a `Bound` link.
    pub bound_to: Option<TypeId>,
}

impl TableType {
    pub fn new(state: TableState, level: TypeLevel) -> Self {
        Self {
            props: BTreeMap::new(),
            indexer: None,
            state,
            level,
            name: None,
            synthetic_name: None,
            bound_to: None,
        }
    }
}

/// Payload of a [`TypeNode::Function`]; closed under its generics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionType {
    pub generics: TypeIdVec,
    pub generic_packs: PackIdVec,
    pub arg_pack: PackId,
    pub ret_pack: PackId,
    pub level: TypeLevel,
    /// Where the function was defined, when known. Carried across
    /// unification so diagnostics can point at the original definition.
    pub definition: Option<SourceSpan>,
}

impl FunctionType {
    pub fn new(arg_pack: PackId, ret_pack: PackId) -> Self {
        Self {
            generics: TypeIdVec::new(),
            generic_packs: PackIdVec::new(),
            arg_pack,
            ret_pack,
            level: TypeLevel::default(),
            definition: None,
        }
    }
}

/// Payload of a [`TypeNode::Class`]: a nominal record. Subtyping walks the
/// `parent` chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassType {
    pub name: NameId,
    pub props: BTreeMap<NameId, Property>,
    pub parent: Option<TypeId>,
}

impl ClassType {
    pub fn new(name: NameId) -> Self {
        Self {
            name,
            props: BTreeMap::new(),
            parent: None,
        }
    }
}

/// A type node. Every variant is addressed by a [`TypeId`]; inspect only
/// after [`follow`](super::TypeGraph::follow).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeNode {
    /// An as-yet-unknown type at a given scope depth.
    Free { level: TypeLevel },
    /// Forwarding pointer installed by unification; must be followed.
    Bound(TypeId),
    /// Universally-quantified variable; never the target of a binding.
    Generic { level: TypeLevel },
    /// Type-error sentinel; unifies with anything silently.
    Error,
    /// The dynamic top type; unifies with anything silently.
    Any,
    Primitive(PrimitiveKind),
    Singleton(SingletonValue),
    Function(FunctionType),
    Table(TableType),
    /// A table plus its metatable companion.
    Metatable { table: TypeId, metatable: TypeId },
    Class(ClassType),
    Union { options: TypeIdVec },
    Intersection { parts: TypeIdVec },
}

/// A type-pack node: a sequence of types used for argument and return lists,
/// possibly terminating in a free or variadic tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackNode {
    Free { level: TypeLevel },
    Bound(PackId),
    Generic,
    Error,
    /// Finite prefix plus optional rest.
    Pack {
        head: TypeIdVec,
        tail: Option<PackId>,
    },
    /// Infinite repetition of one type.
    Variadic { ty: TypeId },
}
