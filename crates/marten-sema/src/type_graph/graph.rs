// type_graph/graph.rs
//
// TypeGraph: arena of type and pack nodes with reserved sentinel slots,
// `follow` canonicalisation, and compound builders.

use marten_identity::NameId;

use super::level::TypeLevel;
use super::node::{
    ClassType, FunctionType, PackNode, PrimitiveKind, Property, SingletonValue, TableState,
    TableType, TypeNode,
};
use super::type_id::{PackId, TypeId, TypeIdVec};

/// Arena of type nodes and type-pack nodes.
///
/// Identity is by index; every reference between types is a [`TypeId`] or
/// [`PackId`]. Nodes are allocated once and never freed during a
/// unification session. Mutation overwrites a node's variant in place and is
/// expected to go through the transaction log.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeGraph {
    types: Vec<TypeNode>,
    packs: Vec<PackNode>,
}

impl TypeGraph {
    /// Create a graph with the sentinel and primitive types pre-allocated at
    /// their reserved indices.
    pub fn new() -> Self {
        let mut graph = Self {
            types: Vec::new(),
            packs: Vec::new(),
        };

        // Allocation order must match the TypeId/PackId constants.
        let error = graph.add_type(TypeNode::Error);
        debug_assert_eq!(error, TypeId::ERROR);
        let any = graph.add_type(TypeNode::Any);
        debug_assert_eq!(any, TypeId::ANY);
        let nil = graph.add_type(TypeNode::Primitive(PrimitiveKind::Nil));
        debug_assert_eq!(nil, TypeId::NIL);
        let boolean = graph.add_type(TypeNode::Primitive(PrimitiveKind::Boolean));
        debug_assert_eq!(boolean, TypeId::BOOLEAN);
        let number = graph.add_type(TypeNode::Primitive(PrimitiveKind::Number));
        debug_assert_eq!(number, TypeId::NUMBER);
        let string = graph.add_type(TypeNode::Primitive(PrimitiveKind::String));
        debug_assert_eq!(string, TypeId::STRING);
        let thread = graph.add_type(TypeNode::Primitive(PrimitiveKind::Thread));
        debug_assert_eq!(thread, TypeId::THREAD);

        let error_pack = graph.add_pack(PackNode::Error);
        debug_assert_eq!(error_pack, PackId::ERROR);
        let any_pack = graph.add_pack(PackNode::Variadic { ty: TypeId::ANY });
        debug_assert_eq!(any_pack, PackId::ANY);

        graph
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    /// Allocate a type node, returning its identity.
    pub fn add_type(&mut self, node: TypeNode) -> TypeId {
        let id = TypeId::from_raw(self.types.len() as u32);
        self.types.push(node);
        id
    }

    /// Allocate a pack node, returning its identity.
    pub fn add_pack(&mut self, node: PackNode) -> PackId {
        let id = PackId::from_raw(self.packs.len() as u32);
        self.packs.push(node);
        id
    }

    /// Allocate a fresh free type at the given level.
    pub fn fresh_type(&mut self, level: TypeLevel) -> TypeId {
        self.add_type(TypeNode::Free { level })
    }

    /// Allocate a fresh free pack at the given level.
    pub fn fresh_pack(&mut self, level: TypeLevel) -> PackId {
        self.add_pack(PackNode::Free { level })
    }

    // ========================================================================
    // Access
    // ========================================================================

    pub fn get(&self, id: TypeId) -> &TypeNode {
        &self.types[id.raw() as usize]
    }

    pub fn get_mut(&mut self, id: TypeId) -> &mut TypeNode {
        debug_assert!(
            !id.is_reserved(),
            "reserved type sentinel must not be mutated"
        );
        &mut self.types[id.raw() as usize]
    }

    pub fn pack(&self, id: PackId) -> &PackNode {
        &self.packs[id.raw() as usize]
    }

    pub fn pack_mut(&mut self, id: PackId) -> &mut PackNode {
        debug_assert!(
            !id.is_reserved(),
            "reserved pack sentinel must not be mutated"
        );
        &mut self.packs[id.raw() as usize]
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn pack_count(&self) -> usize {
        self.packs.len()
    }

    // ========================================================================
    // Canonicalisation
    // ========================================================================

    /// Chase `Bound` links (and table `bound_to` links) to the canonical
    /// representative. Must be called before inspecting a node's variant.
    pub fn follow(&self, mut id: TypeId) -> TypeId {
        loop {
            match self.get(id) {
                TypeNode::Bound(target) => id = *target,
                TypeNode::Table(table) => match table.bound_to {
                    Some(target) => id = target,
                    None => return id,
                },
                _ => return id,
            }
        }
    }

    /// The pack analogue of [`follow`](Self::follow).
    pub fn follow_pack(&self, mut id: PackId) -> PackId {
        loop {
            match self.pack(id) {
                PackNode::Bound(target) => id = *target,
                _ => return id,
            }
        }
    }

    // ========================================================================
    // Sentinel accessors
    // ========================================================================

    pub fn error_recovery_type(&self) -> TypeId {
        TypeId::ERROR
    }

    pub fn error_recovery_pack(&self) -> PackId {
        PackId::ERROR
    }

    pub fn any_type(&self) -> TypeId {
        TypeId::ANY
    }

    pub fn nil_type(&self) -> TypeId {
        TypeId::NIL
    }

    pub fn boolean_type(&self) -> TypeId {
        TypeId::BOOLEAN
    }

    pub fn number_type(&self) -> TypeId {
        TypeId::NUMBER
    }

    pub fn string_type(&self) -> TypeId {
        TypeId::STRING
    }

    pub fn thread_type(&self) -> TypeId {
        TypeId::THREAD
    }

    pub fn primitive(&self, kind: PrimitiveKind) -> TypeId {
        match kind {
            PrimitiveKind::Nil => TypeId::NIL,
            PrimitiveKind::Boolean => TypeId::BOOLEAN,
            PrimitiveKind::Number => TypeId::NUMBER,
            PrimitiveKind::String => TypeId::STRING,
            PrimitiveKind::Thread => TypeId::THREAD,
        }
    }

    // ========================================================================
    // Compound builders
    // ========================================================================

    pub fn singleton_bool(&mut self, value: bool) -> TypeId {
        self.add_type(TypeNode::Singleton(SingletonValue::Bool(value)))
    }

    pub fn singleton_str(&mut self, value: &str) -> TypeId {
        self.add_type(TypeNode::Singleton(SingletonValue::Str(value.to_string())))
    }

    pub fn union(&mut self, options: impl Into<TypeIdVec>) -> TypeId {
        self.add_type(TypeNode::Union {
            options: options.into(),
        })
    }

    pub fn intersection(&mut self, parts: impl Into<TypeIdVec>) -> TypeId {
        self.add_type(TypeNode::Intersection {
            parts: parts.into(),
        })
    }

    /// `T | nil`
    pub fn optional(&mut self, inner: TypeId) -> TypeId {
        self.union(smallvec::smallvec![inner, TypeId::NIL])
    }

    /// A finite pack with no tail.
    pub fn pack_of(&mut self, head: impl Into<TypeIdVec>) -> PackId {
        self.add_pack(PackNode::Pack {
            head: head.into(),
            tail: None,
        })
    }

    pub fn variadic(&mut self, ty: TypeId) -> PackId {
        self.add_pack(PackNode::Variadic { ty })
    }

    /// A function type with finite argument and return lists and no generics.
    pub fn function(&mut self, args: impl Into<TypeIdVec>, rets: impl Into<TypeIdVec>) -> TypeId {
        let arg_pack = self.pack_of(args);
        let ret_pack = self.pack_of(rets);
        self.add_type(TypeNode::Function(FunctionType::new(arg_pack, ret_pack)))
    }

    /// An empty table in the given state.
    pub fn table(&mut self, state: TableState, level: TypeLevel) -> TypeId {
        self.add_type(TypeNode::Table(TableType::new(state, level)))
    }

    /// A table with the given properties.
    pub fn table_with_props(
        &mut self,
        props: impl IntoIterator<Item = (NameId, TypeId)>,
        state: TableState,
        level: TypeLevel,
    ) -> TypeId {
        let mut table = TableType::new(state, level);
        for (name, ty) in props {
            table.props.insert(name, Property::new(ty));
        }
        self.add_type(TypeNode::Table(table))
    }

    /// A class with the given properties and optional parent.
    pub fn class(
        &mut self,
        name: NameId,
        props: impl IntoIterator<Item = (NameId, TypeId)>,
        parent: Option<TypeId>,
    ) -> TypeId {
        let mut class = ClassType::new(name);
        class.parent = parent;
        for (prop_name, ty) in props {
            class.props.insert(prop_name, Property::new(ty));
        }
        self.add_type(TypeNode::Class(class))
    }
}

impl Default for TypeGraph {
    fn default() -> Self {
        Self::new()
    }
}
