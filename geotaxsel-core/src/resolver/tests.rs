use rstest::{fixture, rstest};

use super::*;
use crate::{
    label::{Label, LabelSet},
    subset::WeightedSubset,
};

fn set(names: &[&str]) -> LabelSet {
    names.iter().copied().map(Label::from).collect()
}

fn component(subsets: &[(&[&str], f64)]) -> Component {
    Component::from_subsets(subsets.iter().map(|(names, weight)| {
        WeightedSubset::new(set(names), *weight).expect("test subsets are valid")
    }))
}

fn sizes_and_scores(table: &SolutionTable) -> Vec<(usize, f64)> {
    table.iter().map(|r| (r.size(), r.score())).collect()
}

#[fixture]
fn nested() -> Component {
    component(&[(&["A", "B"], 3.0), (&["C"], 5.0), (&["A", "B", "C"], 1.0)])
}

#[rstest]
fn resolves_every_achievable_size(nested: Component) {
    let table = resolve_component(&nested).expect("nested component has covers");
    assert_eq!(sizes_and_scores(&table), vec![(1, 1.0), (2, 8.0)]);
    assert_eq!(
        table.get(1).map(Resolution::subsets),
        Some(&[set(&["A", "B", "C"])][..])
    );
    assert_eq!(
        table.get(2).map(Resolution::subsets),
        Some(&[set(&["A", "B"]), set(&["C"])][..])
    );
}

#[test]
fn larger_partitions_may_score_lower() {
    let table = resolve_component(&component(&[
        (&["A", "B"], 10.0),
        (&["A"], 1.0),
        (&["B"], 1.0),
    ]))
    .expect("component has covers");
    assert_eq!(sizes_and_scores(&table), vec![(1, 10.0), (2, 2.0)]);
}

#[test]
fn equal_scores_keep_the_first_resolution_found() {
    let table = resolve_component(&component(&[
        (&["A", "B"], 1.0),
        (&["C", "D"], 1.0),
        (&["A", "C"], 1.0),
        (&["B", "D"], 1.0),
    ]))
    .expect("component has covers");
    assert_eq!(table.len(), 1);
    assert_eq!(
        table.get(2).map(Resolution::subsets),
        Some(&[set(&["A", "B"]), set(&["C", "D"])][..])
    );
}

#[test]
fn uncoverable_component_is_invalid() {
    let err = resolve_component(&component(&[(&["A", "B"], 1.0), (&["B", "C"], 1.0)]))
        .expect_err("overlapping chain has no exact cover");
    assert_eq!(
        err,
        ResolveError::InvalidComponent {
            labels: 3,
            subsets: 2,
        }
    );
    assert_eq!(err.code().as_str(), "RESOLVE_INVALID_COMPONENT");
}

#[test]
fn empty_component_is_rejected() {
    let err = resolve_component(&Component::default()).expect_err("nothing to resolve");
    assert_eq!(err.code(), ResolveErrorCode::EmptyComponent);
}

#[rstest]
fn greedy_step_follows_the_heaviest_alternative(nested: Component) {
    let config = ResolverConfig::new().with_greedy_steps(1);
    let table = resolve_component_with(&nested, &config).expect("greedy path still covers");
    assert_eq!(sizes_and_scores(&table), vec![(2, 8.0)]);
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(3)]
fn parallel_search_matches_sequential(#[case] greedy_steps: usize) {
    let wide = component(&[
        (&["A", "B"], 2.0),
        (&["A"], 1.0),
        (&["B"], 1.0),
        (&["B", "C"], 3.0),
        (&["C"], 1.0),
        (&["C", "D", "E"], 2.0),
        (&["D"], 1.0),
        (&["E"], 0.5),
        (&["D", "E"], 4.0),
        (&["A", "E"], 1.5),
    ]);
    let sequential = ResolverConfig::new().with_greedy_steps(greedy_steps);
    let parallel = sequential.with_parallel(true);
    assert_eq!(
        resolve_component_with(&wide, &sequential),
        resolve_component_with(&wide, &parallel)
    );
}

#[test]
fn every_resolution_is_an_exact_cover() {
    let wide = component(&[
        (&["A", "B"], 2.0),
        (&["A"], 1.0),
        (&["B"], 1.0),
        (&["B", "C"], 3.0),
        (&["C"], 1.0),
    ]);
    let table = resolve_component(&wide).expect("component has covers");
    for resolution in table.iter() {
        let mut covered = LabelSet::default();
        for members in resolution.subsets() {
            assert!(covered.is_disjoint(members));
            covered = covered.union(members);
        }
        assert_eq!(&covered, wide.leaves());
        let expected: f64 = resolution
            .subsets()
            .iter()
            .filter_map(|members| wide.weight_of(members))
            .sum();
        assert_eq!(resolution.score(), expected);
    }
}
