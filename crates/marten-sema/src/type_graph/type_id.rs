// type_graph/type_id.rs
//
// TypeId / PackId: graph node handles with reserved constants for sentinels.

use smallvec::SmallVec;

/// Identity of a type node in the [`TypeGraph`](super::TypeGraph).
///
/// A `TypeId` is stable for the lifetime of a graph: nodes are allocated once
/// and never freed, and every reference between types is a `TypeId`. Equality
/// is O(1); two ids compare equal only when they name the same node.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    // ========================================================================
    // Reserved TypeIds for sentinel and primitive types
    // These are guaranteed to be allocated at these indices by TypeGraph::new()
    // ========================================================================

    // Error-recovery sentinel (must be 0 for is_error_sentinel() check)
    pub const ERROR: TypeId = TypeId(0);

    // The dynamic top type
    pub const ANY: TypeId = TypeId(1);

    // Primitives
    pub const NIL: TypeId = TypeId(2);
    pub const BOOLEAN: TypeId = TypeId(3);
    pub const NUMBER: TypeId = TypeId(4);
    pub const STRING: TypeId = TypeId(5);
    pub const THREAD: TypeId = TypeId(6);

    /// First non-reserved TypeId index
    pub const FIRST_DYNAMIC: u32 = 7;

    /// Get the raw index (for debugging/serialization)
    pub fn index(self) -> u32 {
        self.0
    }

    pub(crate) fn from_raw(index: u32) -> Self {
        TypeId(index)
    }

    pub(crate) fn raw(self) -> u32 {
        self.0
    }

    /// Check if this is the error-recovery sentinel (no graph needed)
    #[inline]
    pub fn is_error_sentinel(self) -> bool {
        self == Self::ERROR
    }

    /// Check if this id is one of the reserved sentinel slots
    #[inline]
    pub fn is_reserved(self) -> bool {
        self.0 < Self::FIRST_DYNAMIC
    }
}

/// Identity of a type-pack node in the [`TypeGraph`](super::TypeGraph).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct PackId(u32);

impl PackId {
    // Error-recovery pack sentinel
    pub const ERROR: PackId = PackId(0);

    // Variadic pack of `any`, used by the any-propagation walker
    pub const ANY: PackId = PackId(1);

    /// First non-reserved PackId index
    pub const FIRST_DYNAMIC: u32 = 2;

    pub fn index(self) -> u32 {
        self.0
    }

    pub(crate) fn from_raw(index: u32) -> Self {
        PackId(index)
    }

    pub(crate) fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn is_error_sentinel(self) -> bool {
        self == Self::ERROR
    }

    #[inline]
    pub fn is_reserved(self) -> bool {
        self.0 < Self::FIRST_DYNAMIC
    }
}

/// Inline-capacity vector of TypeIds.
///
/// Union options, intersection parts, pack heads and generic lists are almost
/// always short; four ids fit inline before spilling to the heap.
pub type TypeIdVec = SmallVec<[TypeId; 4]>;

/// Inline-capacity vector of PackIds (generic pack parameters).
pub type PackIdVec = SmallVec<[PackId; 2]>;
