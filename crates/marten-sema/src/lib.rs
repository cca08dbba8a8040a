//! Marten type-graph unification: the subtyping core of the type checker.
//!
//! Given two types in a shared [`TypeGraph`], one designated the supertype
//! and the other the subtype, the [`Unifier`] decides whether the relation holds
//! under the current [`Variance`] and binds free type variables along the
//! way. Mutations are journaled in a [`TxnLog`] so a failed attempt can be
//! rolled back; failures are collected as structured [`TypeError`] values
//! rather than rendered text.

pub mod errors;
pub mod options;
pub mod txn_log;
pub mod type_graph;
pub mod type_utils;
pub mod unify;
pub mod well_known;

pub use errors::{
    CannotExtendReason, CountContext, MissingDirection, TypeError, TypeErrorKind,
};
pub use options::{Mode, TypecheckOptions, Variance};
pub use txn_log::TxnLog;
pub use type_graph::{
    ClassType, FunctionType, PackId, PackIdVec, PackNode, PrimitiveKind, Property,
    SingletonValue, TableIndexer, TableState, TableType, TypeGraph, TypeId, TypeIdVec,
    TypeLevel, TypeNode,
};
pub use unify::{Counters, IceHandler, SharedState, Unifier};
pub use well_known::WellKnownNames;
