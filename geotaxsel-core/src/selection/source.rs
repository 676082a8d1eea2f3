//! Patristic distance sources for the greedy selectors.

use std::sync::Arc;

use thiserror::Error;

use crate::{error::define_error_codes, label::Label};

/// Errors raised by a [`TaxonSource`].
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SourceError {
    /// Requested index was outside the source's bounds.
    #[error("taxon index {index} is out of bounds")]
    OutOfBounds {
        /// The requested index.
        index: usize,
    },
    /// A matrix row did not have one entry per label.
    #[error("row {row} has {len} entries but {expected} labels were given")]
    RaggedRow {
        /// Zero-based row index.
        row: usize,
        /// Number of entries found.
        len: usize,
        /// Number of labels.
        expected: usize,
    },
    /// A distance was negative or not finite.
    #[error("distance at ({row}, {column}) must be finite and non-negative (got {value})")]
    InvalidDistance {
        /// Row index.
        row: usize,
        /// Column index.
        column: usize,
        /// The rejected value.
        value: f64,
    },
    /// The matrix was not symmetric.
    #[error("distance at ({row}, {column}) differs from its mirror entry")]
    Asymmetric {
        /// Row index.
        row: usize,
        /// Column index.
        column: usize,
    },
}

define_error_codes! {
    /// Stable codes describing [`SourceError`] variants.
    enum SourceErrorCode for SourceError {
        /// Requested index was outside the source's bounds.
        OutOfBounds => OutOfBounds { .. } => "SOURCE_OUT_OF_BOUNDS",
        /// A matrix row did not have one entry per label.
        RaggedRow => RaggedRow { .. } => "SOURCE_RAGGED_ROW",
        /// A distance was negative or not finite.
        InvalidDistance => InvalidDistance { .. } => "SOURCE_INVALID_DISTANCE",
        /// The matrix was not symmetric.
        Asymmetric => Asymmetric { .. } => "SOURCE_ASYMMETRIC",
    }
}

/// A set of labelled taxa with symmetric pairwise patristic distances.
///
/// # Examples
/// ```
/// use geotaxsel_core::{Label, SourceError, TaxonSource};
///
/// struct Line(Vec<(Label, f64)>);
///
/// impl TaxonSource for Line {
///     fn len(&self) -> usize { self.0.len() }
///     fn name(&self) -> &str { "line" }
///     fn label(&self, index: usize) -> Result<&Label, SourceError> {
///         self.0.get(index).map(|(l, _)| l).ok_or(SourceError::OutOfBounds { index })
///     }
///     fn distance(&self, i: usize, j: usize) -> Result<f64, SourceError> {
///         let a = self.0.get(i).ok_or(SourceError::OutOfBounds { index: i })?.1;
///         let b = self.0.get(j).ok_or(SourceError::OutOfBounds { index: j })?.1;
///         Ok((a - b).abs())
///     }
/// }
///
/// let source = Line(vec![(Label::from("A"), 0.0), (Label::from("B"), 2.5)]);
/// assert_eq!(source.batch_distances(0, &[0, 1])?, [0.0, 2.5]);
/// # Ok::<(), SourceError>(())
/// ```
pub trait TaxonSource {
    /// Returns the number of taxa.
    fn len(&self) -> usize;

    /// Returns whether the source has no taxa.
    #[must_use]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a human-readable name.
    fn name(&self) -> &str;

    /// Returns the label of taxon `index`.
    fn label(&self, index: usize) -> Result<&Label, SourceError>;

    /// Patristic distance between taxa `i` and `j`.
    fn distance(&self, i: usize, j: usize) -> Result<f64, SourceError>;

    /// Distances from `query` to every entry in `candidates`.
    ///
    /// # Errors
    /// Returns any [`SourceError`] surfaced by [`TaxonSource::distance`].
    fn batch_distances(&self, query: usize, candidates: &[usize]) -> Result<Vec<f64>, SourceError> {
        candidates
            .iter()
            .map(|&candidate| self.distance(query, candidate))
            .collect()
    }
}

/// A dense, validated, in-memory distance matrix.
///
/// # Examples
/// ```
/// use geotaxsel_core::{DistanceMatrix, Label, TaxonSource};
///
/// let matrix = DistanceMatrix::new(
///     "toy",
///     vec![Label::from("A"), Label::from("B")],
///     vec![vec![0.0, 3.0], vec![3.0, 0.0]],
/// )
/// .expect("matrix is square and symmetric");
/// assert_eq!(matrix.distance(1, 0).expect("in bounds"), 3.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DistanceMatrix {
    name: Arc<str>,
    labels: Vec<Label>,
    values: Vec<f64>,
}

impl DistanceMatrix {
    /// Validates and builds a matrix from one row per label.
    ///
    /// # Errors
    /// Returns [`SourceError::RaggedRow`] unless the matrix is square,
    /// [`SourceError::InvalidDistance`] for negative or non-finite entries and
    /// [`SourceError::Asymmetric`] when `d(i, j) != d(j, i)`.
    pub fn new(
        name: impl Into<Arc<str>>,
        labels: Vec<Label>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, SourceError> {
        let n = labels.len();
        if rows.len() != n {
            return Err(SourceError::RaggedRow {
                row: rows.len().min(n),
                len: rows.len(),
                expected: n,
            });
        }
        let mut values = Vec::with_capacity(n * n);
        for (row, entries) in rows.into_iter().enumerate() {
            if entries.len() != n {
                return Err(SourceError::RaggedRow {
                    row,
                    len: entries.len(),
                    expected: n,
                });
            }
            for (column, value) in entries.into_iter().enumerate() {
                if !value.is_finite() || value < 0.0 {
                    return Err(SourceError::InvalidDistance { row, column, value });
                }
                values.push(value);
            }
        }
        for row in 0..n {
            for column in (row + 1)..n {
                if values[row * n + column] != values[column * n + row] {
                    return Err(SourceError::Asymmetric { row, column });
                }
            }
        }
        Ok(Self {
            name: name.into(),
            labels,
            values,
        })
    }

    fn check(&self, index: usize) -> Result<usize, SourceError> {
        if index < self.labels.len() {
            Ok(index)
        } else {
            Err(SourceError::OutOfBounds { index })
        }
    }
}

impl TaxonSource for DistanceMatrix {
    fn len(&self) -> usize {
        self.labels.len()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn label(&self, index: usize) -> Result<&Label, SourceError> {
        self.labels
            .get(index)
            .ok_or(SourceError::OutOfBounds { index })
    }

    fn distance(&self, i: usize, j: usize) -> Result<f64, SourceError> {
        let (i, j) = (self.check(i)?, self.check(j)?);
        Ok(self.values[i * self.labels.len() + j])
    }

    fn batch_distances(&self, query: usize, candidates: &[usize]) -> Result<Vec<f64>, SourceError> {
        let query = self.check(query)?;
        let row = &self.values[query * self.labels.len()..(query + 1) * self.labels.len()];
        candidates
            .iter()
            .map(|&candidate| self.check(candidate).map(|column| row[column]))
            .collect()
    }
}
