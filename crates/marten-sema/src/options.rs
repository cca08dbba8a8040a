// options.rs
//
// Checker configuration: modes, variance, feature toggles and soft limits.

/// How strictly the surrounding checker is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Strict,
    Nonstrict,
    NoCheck,
}

/// The direction in which subtyping composes under a type constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variance {
    /// Subtyping is preserved: width and depth may differ asymmetrically.
    Covariant,
    /// Equality is demanded: checks run symmetrically.
    Invariant,
}

/// Immutable configuration passed at unifier construction.
///
/// Each boolean is a documented branch at its use sites. Defaults are the
/// mature behavior: the redesigned paths on, recursive function types legal.
#[derive(Debug, Clone, Copy)]
pub struct TypecheckOptions {
    /// Use the variance-aware table algorithm; otherwise the legacy
    /// state-dispatch one.
    pub table_subtyping_variance: bool,
    /// Pick a starting union option by name, tag, or cached proof instead of
    /// always starting at index 0.
    pub union_heuristic: bool,
    /// Reject tables on missing/extra property names before any recursive
    /// unification.
    pub table_unification_early_test: bool,
    /// Allow recursive function types such as `t = (t) -> t`.
    pub occurs_check_ok_with_recursive_functions: bool,
    /// Attach inner-error context to mismatch diagnostics.
    pub extended_type_mismatch_error: bool,
    /// Attach a representative failed option to union mismatches.
    pub extended_union_mismatch_error: bool,
    /// Attach positional argument/return context to function mismatches.
    pub extended_function_mismatch_error: bool,
    /// Attach property context to class mismatches.
    pub extended_class_mismatch_error: bool,
    /// Let primitive `boolean`/`string` accept their singletons covariantly.
    pub singleton_types: bool,
    /// Never overwrite a free node that became an error during the occurs
    /// check.
    pub error_recovery_type: bool,
    /// Promote levels throughout the bound type, not just at its top node.
    pub proper_type_levels: bool,

    /// Soft budget on dispatcher iterations before giving up with
    /// `UnificationTooComplex`.
    pub iteration_limit: usize,
    /// Hard recursion-depth bound; exceeding it means corrupt input.
    pub recursion_limit: usize,
    /// Hard bound on pack growth iterations; exceeding it means a malformed
    /// graph.
    pub pack_growth_limit: usize,
}

impl Default for TypecheckOptions {
    fn default() -> Self {
        Self {
            table_subtyping_variance: true,
            union_heuristic: true,
            table_unification_early_test: true,
            occurs_check_ok_with_recursive_functions: true,
            extended_type_mismatch_error: true,
            extended_union_mismatch_error: true,
            extended_function_mismatch_error: true,
            extended_class_mismatch_error: true,
            singleton_types: true,
            error_recovery_type: true,
            proper_type_levels: true,
            iteration_limit: 2000,
            recursion_limit: 500,
            pack_growth_limit: 5000,
        }
    }
}
