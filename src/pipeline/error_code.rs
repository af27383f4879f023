//! Stable, machine-readable error codes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of a construction-time or run-time pipeline failure.
///
/// Codes serialize as snake_case strings and never change meaning once
/// published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Incremental output feeding a stage that needs complete input.
    IncompatibleStyle,
    /// A complete value that cannot be iterated feeds an incremental stage.
    NotIterable,
    /// A generator feeds a stage that needs complete input.
    GeneratorToComplete,
    /// The chain does not end in a value-producing stage.
    MissingTerminal,
    /// Callback or stage arity differs from the bundle arity.
    ArityMismatch,
    /// Callback cannot be invoked with the element shape.
    NotInvocable,
    /// Elements cannot be ordered for sorting.
    NotSortable,
    /// Container cannot be built from the element shape.
    NotConstructible,
    /// Swizzle index listed twice.
    DuplicateIndex,
    /// Swizzle index at or beyond the bundle arity.
    IndexOutOfRange,
    /// In-place mutation requested through a shared borrow.
    ImmutableSource,
    /// Element shape not supported by the stage.
    UnsupportedShape,
    /// Chain exceeds the configured stage limit.
    TooManyStages,
    /// A stage whose semantics are easy to misuse.
    RiskyStage,
    /// Unrecognized configuration field.
    UnknownField,
    /// Configuration JSON that does not parse.
    InvalidConfig,
    /// A value's structure contradicts its slot at run time.
    TypeMismatch,
    /// Arithmetic on element values overflowed.
    Overflow,
    /// Engine invariant violated.
    Internal,
}

impl ErrorCode {
    /// Returns the user-facing name used in JSON and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IncompatibleStyle => "incompatible_style",
            Self::NotIterable => "not_iterable",
            Self::GeneratorToComplete => "generator_to_complete",
            Self::MissingTerminal => "missing_terminal",
            Self::ArityMismatch => "arity_mismatch",
            Self::NotInvocable => "not_invocable",
            Self::NotSortable => "not_sortable",
            Self::NotConstructible => "not_constructible",
            Self::DuplicateIndex => "duplicate_index",
            Self::IndexOutOfRange => "index_out_of_range",
            Self::ImmutableSource => "immutable_source",
            Self::UnsupportedShape => "unsupported_shape",
            Self::TooManyStages => "too_many_stages",
            Self::RiskyStage => "risky_stage",
            Self::UnknownField => "unknown_field",
            Self::InvalidConfig => "invalid_config",
            Self::TypeMismatch => "type_mismatch",
            Self::Overflow => "overflow",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
