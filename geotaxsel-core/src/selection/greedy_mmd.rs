//! Greedy maximum-minimum-distance taxon selection.

use tracing::{debug, instrument};

use super::{SelectionError, source::TaxonSource};
use crate::{
    exemplar::{GeoDistance, GeoPoint, LocationIndex},
    label::Label,
};

/// Minimum distances closer than this are treated as ties.
pub const MMD_TIE_TOLERANCE: f64 = 1.0e-5;

fn locations_of<'a>(
    locations: &'a LocationIndex,
    label: &Label,
) -> Result<&'a [GeoPoint], SelectionError> {
    locations
        .get(label)
        .ok_or_else(|| SelectionError::MissingLocation {
            label: label.clone(),
        })
}

/// Selects `num_taxa` taxa that are phylogenetically spread out.
///
/// The most distant pair seeds the selection (first maximum in row-major
/// order) together with its most divergent pair of locations. Each further
/// taxon maximises its minimum patristic distance to the selection. Taxa
/// within [`MMD_TIE_TOLERANCE`] of the best are broken geographically: the
/// taxon owning the location with the largest summed distance to the
/// locations chosen so far wins, and that location joins the chosen set.
///
/// # Errors
/// - [`SelectionError::InvalidTaxonCount`] when `num_taxa` is zero.
/// - [`SelectionError::TooManyTaxa`] when `num_taxa` exceeds the source.
/// - [`SelectionError::MissingLocation`] when a seed or tied taxon has no
///   locations.
/// - [`SelectionError::Source`] for source failures.
///
/// # Examples
/// ```
/// use geotaxsel_core::{DistanceMatrix, GeoPoint, Haversine, Label, LocationIndex, greedy_mmd};
///
/// let labels: Vec<Label> = ["A", "B", "C", "D"].map(Label::from).into();
/// let matrix = DistanceMatrix::new(
///     "toy",
///     labels.clone(),
///     vec![
///         vec![0.0, 2.0, 6.0, 6.0],
///         vec![2.0, 0.0, 6.0, 6.0],
///         vec![6.0, 6.0, 0.0, 4.0],
///         vec![6.0, 6.0, 4.0, 0.0],
///     ],
/// )
/// .expect("matrix is valid");
/// let locations: LocationIndex = labels
///     .iter()
///     .enumerate()
///     .map(|(i, label)| (label.clone(), vec![GeoPoint::new(0.0, i as f64)]))
///     .collect();
/// let chosen = greedy_mmd(&matrix, 3, &locations, &Haversine::default())
///     .expect("selection succeeds");
/// assert_eq!(chosen, vec![Label::from("A"), Label::from("C"), Label::from("D")]);
/// ```
#[instrument(
    name = "selection.greedy_mmd",
    err,
    skip(source, locations, distance),
    fields(source = %source.name(), taxa = source.len(), num_taxa = num_taxa),
)]
pub fn greedy_mmd<S>(
    source: &S,
    num_taxa: usize,
    locations: &LocationIndex,
    distance: &impl GeoDistance,
) -> Result<Vec<Label>, SelectionError>
where
    S: TaxonSource + ?Sized,
{
    let available = source.len();
    if num_taxa == 0 {
        return Err(SelectionError::InvalidTaxonCount { requested: 0 });
    }
    if num_taxa > available {
        return Err(SelectionError::TooManyTaxa {
            requested: num_taxa,
            available,
        });
    }
    if num_taxa == available {
        return (0..available)
            .map(|index| Ok(source.label(index)?.clone()))
            .collect();
    }

    let everyone: Vec<usize> = (0..available).collect();
    let mut seed: Option<(f64, usize, usize)> = None;
    for row in 0..available {
        let distances = source.batch_distances(row, &everyone)?;
        for (column, &value) in distances.iter().enumerate() {
            if column != row && seed.is_none_or(|(best, _, _)| value > best) {
                seed = Some((value, row, column));
            }
        }
    }
    let Some((widest, first, second)) = seed else {
        return Err(SelectionError::TooManyTaxa {
            requested: num_taxa,
            available,
        });
    };
    debug!(first, second, widest, "seeded with most distant pair");
    if num_taxa == 1 {
        return Ok(vec![source.label(first)?.clone()]);
    }

    let mut chosen_points =
        most_divergent_pair(source, first, second, locations, distance)?.to_vec();
    let mut selected = vec![false; available];
    let mut nearest = vec![f64::INFINITY; available];
    let mut order = Vec::with_capacity(num_taxa);
    for taxon in [first, second] {
        admit(source, taxon, &everyone, &mut selected, &mut nearest)?;
        order.push(taxon);
    }

    while order.len() < num_taxa {
        let mut best = -1.0;
        let mut tied: Vec<usize> = Vec::new();
        for (taxon, &value) in nearest.iter().enumerate() {
            if selected[taxon] {
                continue;
            }
            if value > best {
                best = value;
                tied.clear();
                tied.push(taxon);
            } else if (value - best).abs() < MMD_TIE_TOLERANCE {
                tied.push(taxon);
            }
        }
        let Some((taxon, point)) =
            most_geo_divergent(source, &tied, &chosen_points, locations, distance)?
        else {
            break;
        };
        debug!(
            taxon,
            min_distance = best,
            tied = tied.len(),
            "selected taxon"
        );
        admit(source, taxon, &everyone, &mut selected, &mut nearest)?;
        chosen_points.push(point);
        order.push(taxon);
    }

    if order.len() < num_taxa {
        return Err(SelectionError::TooManyTaxa {
            requested: num_taxa,
            available: order.len(),
        });
    }
    order
        .into_iter()
        .map(|index| Ok(source.label(index)?.clone()))
        .collect()
}

fn admit<S: TaxonSource + ?Sized>(
    source: &S,
    taxon: usize,
    everyone: &[usize],
    selected: &mut [bool],
    nearest: &mut [f64],
) -> Result<(), SelectionError> {
    selected[taxon] = true;
    let distances = source.batch_distances(taxon, everyone)?;
    for (slot, value) in nearest.iter_mut().zip(distances) {
        *slot = slot.min(value);
    }
    Ok(())
}

fn most_divergent_pair<S: TaxonSource + ?Sized>(
    source: &S,
    first: usize,
    second: usize,
    locations: &LocationIndex,
    distance: &impl GeoDistance,
) -> Result<[GeoPoint; 2], SelectionError> {
    let left = locations_of(locations, source.label(first)?)?;
    let right = locations_of(locations, source.label(second)?)?;
    let mut best: Option<(f64, [GeoPoint; 2])> = None;
    for a in left {
        for b in right {
            let value = distance.distance(a, b);
            if best.is_none_or(|(current, _)| value > current) {
                best = Some((value, [*a, *b]));
            }
        }
    }
    match best {
        Some((_, pair)) => Ok(pair),
        None => Err(SelectionError::MissingLocation {
            label: source.label(first)?.clone(),
        }),
    }
}

/// Among `tied` taxa, the one owning the location farthest in summed
/// distance from `chosen`.
fn most_geo_divergent<S: TaxonSource + ?Sized>(
    source: &S,
    tied: &[usize],
    chosen: &[GeoPoint],
    locations: &LocationIndex,
    distance: &impl GeoDistance,
) -> Result<Option<(usize, GeoPoint)>, SelectionError> {
    let mut best: Option<(f64, usize, GeoPoint)> = None;
    for &taxon in tied {
        for point in locations_of(locations, source.label(taxon)?)? {
            let total: f64 = chosen
                .iter()
                .map(|other| distance.distance(point, other))
                .sum();
            if best.is_none_or(|(current, _, _)| total > current) {
                best = Some((total, taxon, *point));
            }
        }
    }
    Ok(best.map(|(_, taxon, point)| (taxon, point)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::DistanceMatrix;
    use rstest::{fixture, rstest};

    fn euclid(left: &GeoPoint, right: &GeoPoint) -> f64 {
        (left.latitude - right.latitude).hypot(left.longitude - right.longitude)
    }

    fn labels(names: &[&str]) -> Vec<Label> {
        names.iter().copied().map(Label::from).collect()
    }

    /// Five taxa on a line at positions 0, 1, 5, 9, 10.
    #[fixture]
    fn line() -> DistanceMatrix {
        let positions = [0.0_f64, 1.0, 5.0, 9.0, 10.0];
        let rows = positions
            .iter()
            .map(|a| positions.iter().map(|b| (a - b).abs()).collect())
            .collect();
        DistanceMatrix::new("line", labels(&["A", "B", "C", "D", "E"]), rows)
            .expect("line matrix is valid")
    }

    fn everywhere(names: &[&str]) -> LocationIndex {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| (Label::from(*name), vec![GeoPoint::new(0.0, i as f64)]))
            .collect()
    }

    #[rstest]
    fn picks_the_extremes_then_the_middle(line: DistanceMatrix) {
        let locations = everywhere(&["A", "B", "C", "D", "E"]);
        let chosen = greedy_mmd(&line, 3, &locations, &euclid).expect("selection succeeds");
        assert_eq!(chosen, labels(&["A", "E", "C"]));
    }

    #[rstest]
    fn single_taxon_is_the_first_of_the_most_distant_pair(line: DistanceMatrix) {
        let chosen = greedy_mmd(&line, 1, &LocationIndex::new(), &euclid)
            .expect("selection succeeds");
        assert_eq!(chosen, labels(&["A"]));
    }

    #[rstest]
    fn full_request_returns_every_label_without_locations(line: DistanceMatrix) {
        let chosen = greedy_mmd(&line, 5, &LocationIndex::new(), &euclid)
            .expect("selection succeeds");
        assert_eq!(chosen, labels(&["A", "B", "C", "D", "E"]));
    }

    #[rstest]
    #[case(0, "SELECTION_INVALID_TAXON_COUNT")]
    #[case(6, "SELECTION_TOO_MANY_TAXA")]
    fn rejects_impossible_counts(
        line: DistanceMatrix,
        #[case] num_taxa: usize,
        #[case] code: &str,
    ) {
        let err = greedy_mmd(&line, num_taxa, &LocationIndex::new(), &euclid)
            .expect_err("count is impossible");
        assert_eq!(err.code().as_str(), code);
    }

    #[test]
    fn ties_go_to_the_geographically_divergent_taxon() {
        // B and C are both 5 away from A and D; C lives far from the seeds.
        let rows = vec![
            vec![0.0, 5.0, 5.0, 10.0],
            vec![5.0, 0.0, 6.0, 5.0],
            vec![5.0, 6.0, 0.0, 5.0],
            vec![10.0, 5.0, 5.0, 0.0],
        ];
        let matrix = DistanceMatrix::new("tie", labels(&["A", "B", "C", "D"]), rows)
            .expect("matrix is valid");
        let locations: LocationIndex = [
            ("A", 0.0, 0.0),
            ("B", 0.0, 1.0),
            ("C", 40.0, 0.0),
            ("D", 0.0, 2.0),
        ]
        .into_iter()
        .map(|(name, lat, lon)| (Label::from(name), vec![GeoPoint::new(lat, lon)]))
        .collect();
        let chosen = greedy_mmd(&matrix, 3, &locations, &euclid).expect("selection succeeds");
        assert_eq!(chosen, labels(&["A", "D", "C"]));
    }

    #[rstest]
    fn missing_seed_location_is_reported(line: DistanceMatrix) {
        let err = greedy_mmd(&line, 3, &everywhere(&["B", "C", "D", "E"]), &euclid)
            .expect_err("seed A has no location");
        assert_eq!(
            err,
            SelectionError::MissingLocation {
                label: Label::from("A"),
            }
        );
    }
}
