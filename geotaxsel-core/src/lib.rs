//! Geotaxsel core library.
//!
//! Reconciles the groupings chosen independently on many trees into the
//! single best-supported partition of a requested size, and picks one
//! geographically spread exemplar per group.
#![cfg_attr(docsrs, feature(doc_cfg))]

mod builder;
mod component;
mod error;
mod exemplar;
mod label;
mod merge;
pub mod persist;
mod reconciler;
mod resolver;
mod selection;
mod subset;
#[cfg(test)]
mod test_utils;

pub use crate::{
    builder::{ExecutionStrategy, ReconcilerBuilder},
    component::{Component, ComponentPartitioner, partition_into_components},
    error::{GeotaxselError, GeotaxselErrorCode, Result, StageErrorCode},
    exemplar::{
        ExemplarError, ExemplarErrorCode, GeoDistance, GeoPoint, Haversine, LocationIndex,
        choose_exemplars, rank_alternatives,
    },
    label::{Label, LabelSet},
    merge::{MergeError, MergeErrorCode, MergedSelection, merge_components},
    reconciler::{Reconciler, Reconciliation},
    resolver::{
        Resolution, ResolveError, ResolveErrorCode, ResolverConfig, SolutionTable,
        resolve_component, resolve_component_with,
    },
    selection::{
        CladeCut, CladeTree, DistanceMatrix, MMD_TIE_TOLERANCE, NodeId, SelectionError,
        SelectionErrorCode, SourceError, SourceErrorCode, TaxonSource, TreeError, TreeErrorCode,
        UltrametricSelection, greedy_mmd, ultrametric_selection,
    },
    subset::{SelectionTally, SubsetError, SubsetErrorCode, WeightedSubset},
};
