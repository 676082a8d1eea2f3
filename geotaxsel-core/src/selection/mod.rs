//! Per-tree selectors that produce the groupings fed to the reconciler.

mod greedy_mmd;
mod source;
mod ultrametric;

use thiserror::Error;

pub use self::{
    greedy_mmd::{MMD_TIE_TOLERANCE, greedy_mmd},
    source::{DistanceMatrix, SourceError, SourceErrorCode, TaxonSource},
    ultrametric::{
        CladeCut, CladeTree, NodeId, TreeError, TreeErrorCode, UltrametricSelection,
        ultrametric_selection,
    },
};
use crate::{error::define_error_codes, label::Label};

/// Errors raised by the selectors.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SelectionError {
    /// Zero taxa were requested.
    #[error("at least one taxon must be requested (got {requested})")]
    InvalidTaxonCount {
        /// The rejected count.
        requested: usize,
    },
    /// More taxa were requested than can be selected.
    #[error("requested {requested} taxa but only {available} can be selected")]
    TooManyTaxa {
        /// Number of taxa requested.
        requested: usize,
        /// Number of taxa that could be selected.
        available: usize,
    },
    /// Splitting a multifurcation jumped past the requested count.
    #[error("splitting a polytomy selected {selected} clades instead of {requested}")]
    PolytomyOvershoot {
        /// Number of clades requested.
        requested: usize,
        /// Number of clades selected after the last split.
        selected: usize,
    },
    /// A taxon needed for geographic tie-breaking has no location.
    #[error("taxon `{label}` has no recorded location")]
    MissingLocation {
        /// The label without locations.
        label: Label,
    },
    /// The distance source failed.
    #[error("distance source failed: {error}")]
    Source {
        #[source]
        /// Underlying source failure.
        error: SourceError,
    },
    /// The tree was malformed.
    #[error("malformed tree: {error}")]
    Tree {
        #[source]
        /// Underlying tree failure.
        error: TreeError,
    },
}

define_error_codes! {
    /// Stable codes describing [`SelectionError`] variants.
    enum SelectionErrorCode for SelectionError {
        /// Zero taxa were requested.
        InvalidTaxonCount => InvalidTaxonCount { .. } => "SELECTION_INVALID_TAXON_COUNT",
        /// More taxa were requested than can be selected.
        TooManyTaxa => TooManyTaxa { .. } => "SELECTION_TOO_MANY_TAXA",
        /// Splitting a multifurcation jumped past the requested count.
        PolytomyOvershoot => PolytomyOvershoot { .. } => "SELECTION_POLYTOMY_OVERSHOOT",
        /// A taxon needed for geographic tie-breaking has no location.
        MissingLocation => MissingLocation { .. } => "SELECTION_MISSING_LOCATION",
        /// The distance source failed.
        Source => Source { .. } => "SELECTION_SOURCE_FAILURE",
        /// The tree was malformed.
        Tree => Tree { .. } => "SELECTION_TREE_FAILURE",
    }
}

impl From<SourceError> for SelectionError {
    fn from(error: SourceError) -> Self {
        Self::Source { error }
    }
}

impl From<TreeError> for SelectionError {
    fn from(error: TreeError) -> Self {
        Self::Tree { error }
    }
}
