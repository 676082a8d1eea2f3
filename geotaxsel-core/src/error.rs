//! Error types for the geotaxsel core library.
//!
//! Each pipeline stage owns a focused error enum; [`GeotaxselError`] wraps
//! them with orchestration context. Every enum exposes a stable
//! machine-readable code.

use std::fmt;

use thiserror::Error;

use crate::{
    builder::ExecutionStrategy, exemplar::ExemplarError, merge::MergeError,
    resolver::ResolveError, selection::SelectionError, subset::SubsetError,
};

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl ::std::fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

pub(crate) use define_error_codes;

/// Error type produced when configuring or running a [`crate::Reconciler`].
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GeotaxselError {
    /// The requested number of final groups must be greater than zero.
    #[error("target_size must be at least 1 (got {got})")]
    InvalidTargetSize {
        /// The invalid target supplied by the caller.
        got: usize,
    },
    /// The tally contained no weighted subsets.
    #[error("selection tally contains no groupings")]
    EmptySelection,
    /// The requested execution strategy is unavailable in the current build.
    #[error("the requested execution strategy {requested:?} is not available in this build")]
    BackendUnavailable {
        /// Strategy that could not be satisfied by the current build.
        requested: ExecutionStrategy,
    },
    /// A grouping could not be tallied.
    #[error("invalid grouping: {error}")]
    Subset {
        #[source]
        /// Underlying validation failure.
        error: SubsetError,
    },
    /// A connected component could not be resolved.
    #[error("component #{component} ({labels} labels) failed to resolve: {error}")]
    Resolve {
        /// Zero-based index of the component in partition order.
        component: usize,
        /// Number of labels in the failing component.
        labels: usize,
        #[source]
        /// Underlying resolver failure.
        error: ResolveError,
    },
    /// The per-component solutions could not be merged for the target size.
    #[error("failed to merge component solutions: {error}")]
    Merge {
        #[source]
        /// Underlying merge failure.
        error: MergeError,
    },
    /// Exemplar selection rejected the final groups.
    #[error("malformed groups: {error}")]
    MalformedGroups {
        #[source]
        /// Underlying tie-breaker failure.
        error: ExemplarError,
    },
    /// A per-tree selector failed.
    #[error("taxon selection failed: {error}")]
    Selection {
        #[source]
        /// Underlying selector failure.
        error: SelectionError,
    },
}

define_error_codes! {
    /// Stable codes describing [`GeotaxselError`] variants.
    enum GeotaxselErrorCode for GeotaxselError {
        /// The requested number of final groups must be greater than zero.
        InvalidTargetSize => InvalidTargetSize { .. } => "GEOTAXSEL_INVALID_TARGET_SIZE",
        /// The tally contained no weighted subsets.
        EmptySelection => EmptySelection => "GEOTAXSEL_EMPTY_SELECTION",
        /// The requested execution strategy is unavailable in the current build.
        BackendUnavailable => BackendUnavailable { .. } => "GEOTAXSEL_BACKEND_UNAVAILABLE",
        /// A grouping could not be tallied.
        SubsetFailure => Subset { .. } => "GEOTAXSEL_SUBSET_FAILURE",
        /// A connected component could not be resolved.
        ResolveFailure => Resolve { .. } => "GEOTAXSEL_RESOLVE_FAILURE",
        /// The per-component solutions could not be merged.
        MergeFailure => Merge { .. } => "GEOTAXSEL_MERGE_FAILURE",
        /// Exemplar selection rejected the final groups.
        MalformedGroups => MalformedGroups { .. } => "GEOTAXSEL_MALFORMED_GROUPS",
        /// A per-tree selector failed.
        SelectionFailure => Selection { .. } => "GEOTAXSEL_SELECTION_FAILURE",
    }
}

/// Code of the stage-specific error wrapped by a [`GeotaxselError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StageErrorCode {
    /// Wrapped [`SubsetError`] code.
    Subset(crate::subset::SubsetErrorCode),
    /// Wrapped [`ResolveError`] code.
    Resolve(crate::resolver::ResolveErrorCode),
    /// Wrapped [`MergeError`] code.
    Merge(crate::merge::MergeErrorCode),
    /// Wrapped [`ExemplarError`] code.
    Exemplar(crate::exemplar::ExemplarErrorCode),
    /// Wrapped [`SelectionError`] code.
    Selection(crate::selection::SelectionErrorCode),
}

impl StageErrorCode {
    /// Return the stable machine-readable representation of the inner code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subset(code) => code.as_str(),
            Self::Resolve(code) => code.as_str(),
            Self::Merge(code) => code.as_str(),
            Self::Exemplar(code) => code.as_str(),
            Self::Selection(code) => code.as_str(),
        }
    }
}

impl fmt::Display for StageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl GeotaxselError {
    /// Retrieve the code of the wrapped stage error, if this error wraps one.
    #[must_use]
    pub const fn stage_code(&self) -> Option<StageErrorCode> {
        match self {
            Self::Subset { error } => Some(StageErrorCode::Subset(error.code())),
            Self::Resolve { error, .. } => Some(StageErrorCode::Resolve(error.code())),
            Self::Merge { error } => Some(StageErrorCode::Merge(error.code())),
            Self::MalformedGroups { error } => Some(StageErrorCode::Exemplar(error.code())),
            Self::Selection { error } => Some(StageErrorCode::Selection(error.code())),
            _ => None,
        }
    }
}

impl From<SubsetError> for GeotaxselError {
    fn from(error: SubsetError) -> Self {
        Self::Subset { error }
    }
}

impl From<MergeError> for GeotaxselError {
    fn from(error: MergeError) -> Self {
        Self::Merge { error }
    }
}

impl From<ExemplarError> for GeotaxselError {
    fn from(error: ExemplarError) -> Self {
        Self::MalformedGroups { error }
    }
}

impl From<SelectionError> for GeotaxselError {
    fn from(error: SelectionError) -> Self {
        Self::Selection { error }
    }
}

/// Convenient alias for results returned by the orchestration API.
pub type Result<T> = core::result::Result<T, GeotaxselError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_code_exposes_wrapped_merge_code() {
        let err = GeotaxselError::from(MergeError::UnsatisfiableTarget {
            requested: 5,
            min: 2,
            max: 4,
        });
        assert_eq!(err.code(), GeotaxselErrorCode::MergeFailure);
        assert_eq!(
            err.stage_code().map(StageErrorCode::as_str),
            Some("MERGE_UNSATISFIABLE_TARGET")
        );
    }

    #[test]
    fn configuration_errors_have_no_stage_code() {
        let err = GeotaxselError::InvalidTargetSize { got: 0 };
        assert_eq!(err.code().as_str(), "GEOTAXSEL_INVALID_TARGET_SIZE");
        assert!(err.stage_code().is_none());
    }
}
