//! Exemplar tie-breaking: one representative label per final group.
//!
//! Groups with several labels are resolved greedily so that the chosen
//! representatives are as geographically spread out as possible. Distance
//! computation is injected through [`GeoDistance`].

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::{
    error::define_error_codes,
    label::{Label, LabelSet},
};

/// Errors raised when the final groups cannot be resolved to exemplars.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExemplarError {
    /// A group had no labels.
    #[error("group #{group} is empty")]
    EmptyGroup {
        /// Zero-based index of the empty group.
        group: usize,
    },
    /// A label has no known location.
    #[error("label `{label}` has no recorded location")]
    MissingLocation {
        /// The label without locations.
        label: Label,
    },
    /// A label appears in more than one group.
    #[error("label `{label}` appears in more than one group")]
    DuplicateLabel {
        /// The repeated label.
        label: Label,
    },
    /// The exemplar passed for ranking is not a member of its group.
    #[error("exemplar `{label}` is not a member of the ranked group")]
    UnknownExemplar {
        /// The stray exemplar.
        label: Label,
    },
}

define_error_codes! {
    /// Stable codes describing [`ExemplarError`] variants.
    enum ExemplarErrorCode for ExemplarError {
        /// A group had no labels.
        EmptyGroup => EmptyGroup { .. } => "EXEMPLAR_EMPTY_GROUP",
        /// A label has no known location.
        MissingLocation => MissingLocation { .. } => "EXEMPLAR_MISSING_LOCATION",
        /// A label appears in more than one group.
        DuplicateLabel => DuplicateLabel { .. } => "EXEMPLAR_DUPLICATE_LABEL",
        /// The exemplar passed for ranking is not a member of its group.
        UnknownExemplar => UnknownExemplar { .. } => "EXEMPLAR_UNKNOWN_EXEMPLAR",
    }
}

/// A point on the globe in decimal degrees.
///
/// Serialised as a `[latitude, longitude]` pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a point from latitude and longitude in degrees.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl From<[f64; 2]> for GeoPoint {
    fn from([latitude, longitude]: [f64; 2]) -> Self {
        Self::new(latitude, longitude)
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(point: GeoPoint) -> Self {
        [point.latitude, point.longitude]
    }
}

/// Distance between two locations. Must be non-negative.
pub trait GeoDistance {
    /// Returns the distance between `left` and `right`.
    fn distance(&self, left: &GeoPoint, right: &GeoPoint) -> f64;
}

impl<F> GeoDistance for F
where
    F: Fn(&GeoPoint, &GeoPoint) -> f64,
{
    fn distance(&self, left: &GeoPoint, right: &GeoPoint) -> f64 {
        self(left, right)
    }
}

/// Great-circle distance on a sphere, in the unit of the radius.
///
/// # Examples
/// ```
/// use geotaxsel_core::{GeoDistance, GeoPoint, Haversine};
///
/// let equator = GeoPoint::new(0.0, 0.0);
/// let pole = GeoPoint::new(90.0, 0.0);
/// let quarter = Haversine::default().distance(&equator, &pole);
/// assert!((quarter - 10_007.5).abs() < 1.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Haversine {
    radius: f64,
}

impl Haversine {
    /// Mean Earth radius in kilometres.
    pub const EARTH_RADIUS_KM: f64 = 6371.0088;

    /// Uses a custom sphere radius.
    #[must_use]
    pub const fn with_radius(radius: f64) -> Self {
        Self { radius }
    }
}

impl Default for Haversine {
    fn default() -> Self {
        Self::with_radius(Self::EARTH_RADIUS_KM)
    }
}

impl GeoDistance for Haversine {
    fn distance(&self, left: &GeoPoint, right: &GeoPoint) -> f64 {
        let (lat1, lat2) = (left.latitude.to_radians(), right.latitude.to_radians());
        let half_dlat = (lat2 - lat1) / 2.0;
        let half_dlon = (right.longitude - left.longitude).to_radians() / 2.0;
        let h = half_dlat.sin().powi(2) + lat1.cos() * lat2.cos() * half_dlon.sin().powi(2);
        2.0 * self.radius * h.sqrt().min(1.0).asin()
    }
}

/// Known locations per label.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationIndex {
    points: HashMap<Label, Vec<GeoPoint>>,
}

impl LocationIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends locations for `label`.
    pub fn insert(&mut self, label: Label, points: impl IntoIterator<Item = GeoPoint>) {
        self.points.entry(label).or_default().extend(points);
    }

    /// Returns the locations of `label`, if any are known.
    #[must_use]
    pub fn get(&self, label: &Label) -> Option<&[GeoPoint]> {
        self.points
            .get(label)
            .map(Vec::as_slice)
            .filter(|points| !points.is_empty())
    }

    /// Number of labels with locations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns whether no label has locations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn require(&self, label: &Label) -> Result<&[GeoPoint], ExemplarError> {
        self.get(label).ok_or_else(|| ExemplarError::MissingLocation {
            label: label.clone(),
        })
    }
}

impl FromIterator<(Label, Vec<GeoPoint>)> for LocationIndex {
    fn from_iter<I: IntoIterator<Item = (Label, Vec<GeoPoint>)>>(iter: I) -> Self {
        let mut index = Self::new();
        for (label, points) in iter {
            index.insert(label, points);
        }
        index
    }
}

/// Smallest distance between any point of `from` and any point of `to`.
fn min_distance(from: &[GeoPoint], to: &[GeoPoint], distance: &impl GeoDistance) -> f64 {
    from.iter()
        .flat_map(|left| to.iter().map(move |right| distance.distance(left, right)))
        .fold(f64::INFINITY, f64::min)
}

struct Candidate<'a> {
    group: usize,
    label: &'a Label,
    points: &'a [GeoPoint],
    nearest: f64,
}

/// Picks one exemplar per group, maximising the minimum geographic distance
/// between representatives.
///
/// Singleton groups are fixed first. Then, repeatedly, the candidate farthest
/// from everything chosen so far is picked (ties: lowest group index, then
/// label order) and its group closed.
///
/// # Errors
/// Returns [`ExemplarError::EmptyGroup`], [`ExemplarError::DuplicateLabel`] or
/// [`ExemplarError::MissingLocation`] for malformed input.
///
/// # Examples
/// ```
/// use geotaxsel_core::{GeoPoint, Label, LabelSet, LocationIndex, choose_exemplars};
///
/// let group = |names: &[&str]| names.iter().copied().map(Label::from).collect::<LabelSet>();
/// let locations: LocationIndex = [
///     (Label::from("X"), vec![GeoPoint::new(0.0, 0.0)]),
///     (Label::from("Y"), vec![GeoPoint::new(0.0, 10.0)]),
///     (Label::from("Z"), vec![GeoPoint::new(0.0, 1.0)]),
/// ]
/// .into_iter()
/// .collect();
/// let euclid = |a: &GeoPoint, b: &GeoPoint| {
///     (a.latitude - b.latitude).hypot(a.longitude - b.longitude)
/// };
/// let chosen = choose_exemplars(&[group(&["X"]), group(&["Y", "Z"])], &locations, &euclid)
///     .expect("groups are well formed");
/// assert_eq!(chosen, vec![Label::from("X"), Label::from("Y")]);
/// ```
#[instrument(
    name = "core.exemplars",
    err,
    skip(groups, locations, distance),
    fields(groups = groups.len()),
)]
pub fn choose_exemplars(
    groups: &[LabelSet],
    locations: &LocationIndex,
    distance: &impl GeoDistance,
) -> Result<Vec<Label>, ExemplarError> {
    validate_groups(groups, locations).inspect_err(|err| {
        warn!(code = %err.code(), "rejecting malformed groups");
    })?;

    let mut chosen: Vec<Option<Label>> = vec![None; groups.len()];
    let mut chosen_points: Vec<GeoPoint> = Vec::new();
    for (index, group) in groups.iter().enumerate() {
        if let [label] = group.as_slice() {
            chosen_points.extend_from_slice(locations.require(label)?);
            chosen[index] = Some(label.clone());
        }
    }

    let mut candidates = Vec::new();
    for (index, group) in groups.iter().enumerate() {
        if group.len() < 2 {
            continue;
        }
        for label in group {
            let points = locations.require(label)?;
            candidates.push(Candidate {
                group: index,
                label,
                points,
                nearest: min_distance(points, &chosen_points, distance),
            });
        }
    }

    let mut open = candidates.len();
    while open > 0 {
        let mut best: Option<&Candidate<'_>> = None;
        for candidate in candidates.iter().filter(|c| chosen[c.group].is_none()) {
            if best.is_none_or(|current| candidate.nearest > current.nearest) {
                best = Some(candidate);
            }
        }
        let Some(picked) = best else { break };
        let (group, label, added) = (picked.group, picked.label, picked.points);
        debug!(
            group,
            label = %label,
            nearest = picked.nearest,
            "picked exemplar"
        );
        chosen[group] = Some(label.clone());
        for candidate in candidates.iter_mut().filter(|c| chosen[c.group].is_none()) {
            candidate.nearest = candidate
                .nearest
                .min(min_distance(candidate.points, added, distance));
        }
        open = candidates
            .iter()
            .filter(|c| chosen[c.group].is_none())
            .count();
    }

    Ok(chosen.into_iter().flatten().collect())
}

fn validate_groups(groups: &[LabelSet], locations: &LocationIndex) -> Result<(), ExemplarError> {
    let mut seen: HashSet<&Label> = HashSet::new();
    for (index, group) in groups.iter().enumerate() {
        if group.is_empty() {
            return Err(ExemplarError::EmptyGroup { group: index });
        }
        for label in group {
            if !seen.insert(label) {
                return Err(ExemplarError::DuplicateLabel {
                    label: label.clone(),
                });
            }
            locations.require(label)?;
        }
    }
    Ok(())
}

/// Orders a group for reporting backup choices: the exemplar first, then the
/// remaining members by ascending minimum distance to the exemplar.
///
/// # Errors
/// Returns [`ExemplarError::UnknownExemplar`] when `exemplar` is not in
/// `group` and [`ExemplarError::MissingLocation`] for members without
/// locations.
pub fn rank_alternatives(
    group: &LabelSet,
    exemplar: &Label,
    locations: &LocationIndex,
    distance: &impl GeoDistance,
) -> Result<Vec<Label>, ExemplarError> {
    if !group.contains(exemplar) {
        return Err(ExemplarError::UnknownExemplar {
            label: exemplar.clone(),
        });
    }
    let anchor = locations.require(exemplar)?;
    let mut others = Vec::with_capacity(group.len().saturating_sub(1));
    for label in group.iter().filter(|label| *label != exemplar) {
        let nearest = min_distance(locations.require(label)?, anchor, distance);
        others.push((nearest, label.clone()));
    }
    others.sort_by(|left, right| left.0.total_cmp(&right.0));
    let mut ranked = Vec::with_capacity(group.len());
    ranked.push(exemplar.clone());
    ranked.extend(others.into_iter().map(|(_, label)| label));
    Ok(ranked)
}
