//! End-to-end tests: per-tree selection, reconciliation and exemplars.

mod common;

use common::{balanced_tree, equator_locations, group, lopsided_tree};
use geotaxsel_core::{
    ExecutionStrategy, ExemplarError, GeotaxselError, GeotaxselErrorCode, Haversine, LabelSet,
    ReconcilerBuilder, SelectionTally, StageErrorCode, choose_exemplars, ultrametric_selection,
};
use geotaxsel_test_support::tracing::RecordingLayer;
use rstest::{fixture, rstest};
use tracing::Level;

#[fixture]
fn tally() -> SelectionTally {
    let mut tally = SelectionTally::new();
    for tree in [balanced_tree(), balanced_tree(), lopsided_tree()] {
        let selection = ultrametric_selection(&tree, 3).expect("three clades are selectable");
        tally
            .record_tree(selection.groups())
            .expect("clades are disjoint");
    }
    tally
}

fn sorted(groups: &[LabelSet]) -> Vec<LabelSet> {
    let mut groups = groups.to_vec();
    groups.sort();
    groups
}

#[rstest]
fn tally_counts_each_tree_once(tally: SelectionTally) {
    assert_eq!(tally.trees(), 3);
    assert_eq!(tally.weight_of(&group(&["E", "F"])), Some(3.0));
    assert_eq!(tally.weight_of(&group(&["A", "B", "C"])), Some(1.0));
}

#[rstest]
#[case::sequential(ExecutionStrategy::Sequential)]
#[case::auto(ExecutionStrategy::Auto)]
fn reconciles_trees_into_the_best_supported_partition(
    tally: SelectionTally,
    #[case] strategy: ExecutionStrategy,
) {
    let reconciler = ReconcilerBuilder::new()
        .with_target_size(3)
        .with_execution_strategy(strategy)
        .build()
        .expect("configuration is valid");
    let result = reconciler
        .reconcile(&tally)
        .expect("three groups are reachable");
    assert_eq!(result.score(), 7.0);
    assert_eq!(result.component_count(), 2);
    assert_eq!(
        sorted(result.groups()),
        vec![group(&["A", "B"]), group(&["C", "D"]), group(&["E", "F"])]
    );

    let locations = equator_locations(&["A", "B", "C", "D", "E", "F"]);
    assert_eq!(result.weights().len(), 3);
    assert_eq!(result.weights().iter().sum::<f64>(), result.score());
    let exemplars = choose_exemplars(result.groups(), &locations, &Haversine::default())
        .expect("every label has a location");
    assert_eq!(exemplars.len(), 3);
    for (exemplar, members) in exemplars.iter().zip(result.groups()) {
        assert!(members.contains(exemplar), "{exemplar} not in {members}");
    }
}

#[rstest]
fn unreachable_target_names_the_merge_stage(tally: SelectionTally) {
    let err = ReconcilerBuilder::new()
        .with_target_size(5)
        .build()
        .expect("configuration is valid")
        .reconcile(&tally)
        .expect_err("only sizes 3 exist");
    assert_eq!(err.code(), GeotaxselErrorCode::MergeFailure);
    assert_eq!(
        err.stage_code().map(StageErrorCode::as_str),
        Some("MERGE_UNSATISFIABLE_TARGET")
    );
}

#[rstest]
fn missing_locations_are_reported(tally: SelectionTally) {
    let reconciler = ReconcilerBuilder::new()
        .with_target_size(3)
        .build()
        .expect("configuration is valid");
    let result = reconciler
        .reconcile(&tally)
        .expect("three groups are reachable");
    let locations = equator_locations(&["A", "B"]);
    let err = choose_exemplars(result.groups(), &locations, &Haversine::default())
        .expect_err("C to F have no location");
    assert!(matches!(err, ExemplarError::MissingLocation { .. }));
    let wrapped = GeotaxselError::from(err);
    assert_eq!(wrapped.code(), GeotaxselErrorCode::MalformedGroups);
}

#[rstest]
fn reconcile_records_pipeline_spans(tally: SelectionTally) {
    let reconciler = ReconcilerBuilder::new()
        .with_target_size(3)
        .with_execution_strategy(ExecutionStrategy::Sequential)
        .build()
        .expect("configuration is valid");
    let (result, layer) = RecordingLayer::capture(|| reconciler.reconcile(&tally));
    result.expect("reconciliation succeeds");

    let reconcile = layer.span("core.reconcile").expect("core.reconcile span");
    assert_eq!(reconcile.fields.get("target"), Some(&"3".to_owned()));
    assert_eq!(
        reconcile.fields.get("strategy"),
        Some(&"Sequential".to_owned())
    );
    assert!(layer.span("core.partition").is_some());
    assert!(layer.span("core.merge").is_some());

    let resolved: Vec<String> = layer
        .spans()
        .into_iter()
        .filter(|span| span.name == "core.resolve")
        .filter_map(|span| span.fields.get("labels").cloned())
        .collect();
    assert_eq!(resolved, vec!["2".to_owned(), "4".to_owned()]);
    assert!(
        layer
            .messages(Level::INFO)
            .contains(&"reconciliation completed".to_owned())
    );
}
