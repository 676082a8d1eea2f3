//! JSON problem and solution files for out-of-process resolution.
//!
//! A problem file holds one component's weighted subsets; a solution file
//! holds its [`SolutionTable`]. A manifest pairs them up so a driver can tell
//! which components still need solving.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    component::Component,
    error::define_error_codes,
    label::LabelSet,
    resolver::{Resolution, SolutionTable},
    subset::{SubsetError, WeightedSubset},
};

/// Errors raised while reading or writing persisted files.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum PersistError {
    /// The file was not valid JSON for the expected shape, or I/O failed.
    #[error("failed to encode or decode JSON: {source}")]
    Json {
        /// Underlying serde failure.
        #[from]
        source: serde_json::Error,
    },
    /// A problem file contained an invalid subset.
    #[error("invalid subset in problem file: {error}")]
    InvalidProblem {
        #[source]
        /// Underlying validation failure.
        error: SubsetError,
    },
    /// A solution entry was not a valid resolution.
    #[error("solution entry of size {size} is inconsistent: {reason}")]
    InconsistentSolution {
        /// Declared size of the offending entry.
        size: usize,
        /// What was wrong with it.
        reason: &'static str,
    },
}

define_error_codes! {
    /// Stable codes describing [`PersistError`] variants.
    enum PersistErrorCode for PersistError {
        /// The file was not valid JSON for the expected shape.
        Json => Json { .. } => "PERSIST_JSON",
        /// A problem file contained an invalid subset.
        InvalidProblem => InvalidProblem { .. } => "PERSIST_INVALID_PROBLEM",
        /// A solution entry was not a valid resolution.
        InconsistentSolution => InconsistentSolution { .. } => "PERSIST_INCONSISTENT_SOLUTION",
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ProblemSubset {
    members: LabelSet,
    weight: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProblemFile {
    subsets: Vec<ProblemSubset>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SolutionFile {
    resolutions: Vec<Resolution>,
}

/// One problem/solution file pair listed in a [`Manifest`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Problem file name, relative to the manifest.
    pub problem: String,
    /// Solution file name, relative to the manifest.
    pub solution: String,
    /// Number of labels in the component.
    pub labels: usize,
}

/// Index of every component written for out-of-process resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Entries in partition order.
    pub components: Vec<ManifestEntry>,
}

/// Writes `component` as a problem file.
///
/// # Errors
/// Returns [`PersistError::Json`] if encoding or writing fails.
pub fn write_problem<W: Write>(component: &Component, writer: W) -> Result<(), PersistError> {
    let file = ProblemFile {
        subsets: component
            .subsets()
            .map(|(members, weight)| ProblemSubset {
                members: members.clone(),
                weight,
            })
            .collect(),
    };
    serde_json::to_writer_pretty(writer, &file)?;
    Ok(())
}

/// Reads a problem file back into a [`Component`].
///
/// # Errors
/// Returns [`PersistError::Json`] for malformed JSON and
/// [`PersistError::InvalidProblem`] for empty subsets or invalid weights.
///
/// # Examples
/// ```
/// use geotaxsel_core::persist::read_problem;
///
/// let json = r#"{"subsets": [
///     {"members": ["B", "A"], "weight": 2.0},
///     {"members": ["C"], "weight": 1.0}
/// ]}"#;
/// let component = read_problem(json.as_bytes()).expect("problem parses");
/// assert_eq!(component.leaves().len(), 3);
/// assert!(read_problem(r#"{"subsets": [{"members": [], "weight": 1.0}]}"#.as_bytes()).is_err());
/// ```
pub fn read_problem<R: Read>(reader: R) -> Result<Component, PersistError> {
    let file: ProblemFile = serde_json::from_reader(reader)?;
    let subsets = file
        .subsets
        .into_iter()
        .map(|subset| WeightedSubset::new(subset.members, subset.weight))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| PersistError::InvalidProblem { error })?;
    Ok(Component::from_subsets(subsets))
}

/// Writes `table` as a solution file.
///
/// # Errors
/// Returns [`PersistError::Json`] if encoding or writing fails.
pub fn write_solution<W: Write>(table: &SolutionTable, writer: W) -> Result<(), PersistError> {
    let file = SolutionFile {
        resolutions: table.iter().cloned().collect(),
    };
    serde_json::to_writer_pretty(writer, &file)?;
    Ok(())
}

/// Reads a solution file.
///
/// # Errors
/// Returns [`PersistError::Json`] for malformed JSON and
/// [`PersistError::InconsistentSolution`] when an entry's size does not match
/// its subsets or its subsets overlap.
pub fn read_solution<R: Read>(reader: R) -> Result<SolutionTable, PersistError> {
    let file: SolutionFile = serde_json::from_reader(reader)?;
    for resolution in &file.resolutions {
        if !resolution.is_consistent() {
            return Err(PersistError::InconsistentSolution {
                size: resolution.size(),
                reason: "size differs from the number of subsets",
            });
        }
        let mut covered = LabelSet::default();
        for members in resolution.subsets() {
            if !covered.is_disjoint(members) {
                return Err(PersistError::InconsistentSolution {
                    size: resolution.size(),
                    reason: "subsets overlap",
                });
            }
            covered = covered.union(members);
        }
    }
    Ok(file.resolutions.into_iter().collect())
}

/// Writes a manifest.
///
/// # Errors
/// Returns [`PersistError::Json`] if encoding or writing fails.
pub fn write_manifest<W: Write>(manifest: &Manifest, writer: W) -> Result<(), PersistError> {
    serde_json::to_writer_pretty(writer, manifest)?;
    Ok(())
}

/// Reads a manifest.
///
/// # Errors
/// Returns [`PersistError::Json`] for malformed JSON.
pub fn read_manifest<R: Read>(reader: R) -> Result<Manifest, PersistError> {
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{label::Label, resolver::resolve_component};

    fn set(names: &[&str]) -> LabelSet {
        names.iter().copied().map(Label::from).collect()
    }

    #[test]
    fn problem_files_round_trip_components() {
        let component = Component::from_subsets([
            WeightedSubset::new(set(&["A", "B"]), 3.0).expect("valid"),
            WeightedSubset::new(set(&["C"]), 0.5).expect("valid"),
        ]);
        let mut buffer = Vec::new();
        write_problem(&component, &mut buffer).expect("encoding succeeds");
        let parsed = read_problem(buffer.as_slice()).expect("decoding succeeds");
        assert_eq!(parsed, component);
    }

    #[test]
    fn solution_files_round_trip_tables() {
        let component = Component::from_subsets([
            WeightedSubset::new(set(&["A", "B"]), 3.0).expect("valid"),
            WeightedSubset::new(set(&["A"]), 1.25).expect("valid"),
            WeightedSubset::new(set(&["B"]), 1.0).expect("valid"),
        ]);
        let table = resolve_component(&component).expect("component has covers");
        let mut buffer = Vec::new();
        write_solution(&table, &mut buffer).expect("encoding succeeds");
        let parsed = read_solution(buffer.as_slice()).expect("decoding succeeds");
        assert_eq!(parsed, table);
    }

    #[test]
    fn inconsistent_sizes_are_rejected() {
        let json = r#"{"resolutions": [{"size": 2, "score": 1.0, "subsets": [["A", "B"]]}]}"#;
        let err = read_solution(json.as_bytes()).expect_err("size does not match");
        assert_eq!(err.code(), PersistErrorCode::InconsistentSolution);
    }

    #[test]
    fn overlapping_subsets_are_rejected() {
        let json = r#"{"resolutions": [
            {"size": 2, "score": 1.0, "subsets": [["A", "B"], ["B"]]}
        ]}"#;
        let err = read_solution(json.as_bytes()).expect_err("subsets overlap");
        assert_eq!(err.code().as_str(), "PERSIST_INCONSISTENT_SOLUTION");
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = read_manifest("{".as_bytes()).expect_err("truncated JSON");
        assert_eq!(err.code(), PersistErrorCode::Json);
    }
}
