// errors.rs
//! Unification errors (E3xxx).
//!
//! The unifier produces structured error values; rendering them for end
//! users (including turning [`TypeId`]s back into type syntax) is the
//! caller's concern.

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use marten_identity::NameId;

use crate::type_graph::TypeId;

/// Whether a count mismatch was found among arguments or return values.
/// Return-value mismatches swap expected/actual so messages read naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountContext {
    Arg,
    Result,
}

/// Which side of a table comparison a property set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingDirection {
    /// The subtype lacks properties the supertype requires.
    Missing,
    /// The subtype has properties the supertype forbids (invariant only).
    Extra,
}

impl std::fmt::Display for MissingDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingDirection::Missing => write!(f, "missing"),
            MissingDirection::Extra => write!(f, "extra"),
        }
    }
}

/// Why a table could not be extended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CannotExtendReason {
    Property(NameId),
    Indexer,
}

/// The error taxonomy of the unifier.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum TypeErrorKind {
    #[error("type mismatch")]
    #[diagnostic(code(E3001))]
    TypeMismatch {
        wanted: TypeId,
        given: TypeId,
        reason: Option<String>,
        inner: Option<Box<TypeError>>,
    },

    #[error("table has {direction} properties")]
    #[diagnostic(code(E3002))]
    MissingProperties {
        super_ty: TypeId,
        sub_ty: TypeId,
        names: Vec<NameId>,
        direction: MissingDirection,
    },

    #[error("unknown property")]
    #[diagnostic(code(E3003))]
    UnknownProperty { container: TypeId, name: NameId },

    #[error("cannot extend table")]
    #[diagnostic(code(E3004))]
    CannotExtendTable {
        table: TypeId,
        reason: CannotExtendReason,
    },

    #[error("expected {expected} values, found {actual}")]
    #[diagnostic(code(E3005))]
    CountMismatch {
        expected: usize,
        actual: usize,
        context: CountContext,
    },

    #[error("type contains a reference to itself")]
    #[diagnostic(code(E3006))]
    OccursCheckFailed,

    #[error("{message}")]
    #[diagnostic(code(E3007))]
    GenericError { message: String },

    #[error("code is too complex to typecheck")]
    #[diagnostic(code(E3008))]
    UnificationTooComplex,
}

impl TypeErrorKind {
    /// A plain mismatch with no reason or inner error attached.
    pub fn mismatch(wanted: TypeId, given: TypeId) -> Self {
        TypeErrorKind::TypeMismatch {
            wanted,
            given,
            reason: None,
            inner: None,
        }
    }
}

/// An error with the source location the unifier was asked to report at.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}")]
pub struct TypeError {
    pub span: SourceSpan,
    pub kind: TypeErrorKind,
}

impl TypeError {
    pub fn new(span: SourceSpan, kind: TypeErrorKind) -> Self {
        Self { span, kind }
    }
}

/// Find a budget-exhaustion error among a child unifier's errors. These are
/// re-emitted verbatim because the budget is global, not per-child.
pub fn find_too_complex(errors: &[TypeError]) -> Option<TypeError> {
    errors
        .iter()
        .find(|e| matches!(e.kind, TypeErrorKind::UnificationTooComplex))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> SourceSpan {
        SourceSpan::from((0, 0))
    }

    #[test]
    fn too_complex_is_found_among_errors() {
        let errors = vec![
            TypeError::new(span(), TypeErrorKind::mismatch(TypeId::NUMBER, TypeId::STRING)),
            TypeError::new(span(), TypeErrorKind::UnificationTooComplex),
        ];
        let found = find_too_complex(&errors).unwrap();
        assert!(matches!(found.kind, TypeErrorKind::UnificationTooComplex));
        assert_eq!(find_too_complex(&errors[..1]), None);
    }

    #[test]
    fn display_does_not_render_types() {
        let err = TypeError::new(span(), TypeErrorKind::mismatch(TypeId::NUMBER, TypeId::STRING));
        assert_eq!(err.to_string(), "type mismatch");
    }
}
