//! End-to-end runs of the engine with the built-in subword model.

use std::fs;

use optimus_rs::{InputData, OptimusConfig, OptimusEngine, ReviewTable, RunOptions, SKIPPED};
use tempfile::TempDir;

fn descriptions() -> Vec<&'static str> {
    vec![
        "Frozen pizza",
        "frozen pizzas",
        "Pizza, frozen (12 inch)",
        "Cheese pizza",
        "Green tea",
        "green tea bags",
        "Black tea",
        "Black tea leaves",
        "Chocolate biscuits",
        "chocolate biscuit",
        "Digestive biscuits",
        "Tractor tyres",
        "Car tyres",
        "Car tyre",
        "12345",
    ]
}

fn run(config: OptimusConfig, options: RunOptions) -> optimus_rs::RunOutput {
    let mut engine = OptimusEngine::new(config).unwrap();
    engine.run(&InputData::from(descriptions()), options).unwrap()
}

#[test]
fn tiers_are_consecutive_and_bounded_by_the_cutoff() {
    let config = OptimusConfig::default();
    let output = run(config.clone(), RunOptions::default());

    let tiers = output.table.tier_numbers();
    assert_eq!(tiers.len(), output.depths.len());
    assert!(!tiers.is_empty());
    assert!(tiers.len() <= 6);
    for (i, tier) in tiers.iter().enumerate() {
        assert_eq!(*tier, i as u32 + 1);
    }
    for pair in output.depths.windows(2) {
        assert!((pair[1].distance - pair[0].distance - config.stepsize).abs() < 1e-9);
    }
}

fn label_of<'a>(labels: &'a [(String, Option<String>)], original: &str) -> Option<&'a str> {
    labels
        .iter()
        .find(|(o, _)| o == original)
        .and_then(|(_, label)| label.as_deref())
}

#[test]
fn default_run_accepts_near_duplicates() {
    let output = run(OptimusConfig::default(), RunOptions::default());

    assert!(output.depths.iter().any(|depth| depth.total_accepted() > 0));
    assert!(output.depths[0].clusters > 0);

    let labels = output.labels();
    assert_eq!(
        label_of(&labels, "Frozen pizza"),
        label_of(&labels, "frozen pizzas")
    );
    assert_eq!(label_of(&labels, "Car tyre"), label_of(&labels, "Car tyres"));

    let relabelled = labels
        .iter()
        .filter(|(original, label)| {
            let cleaned = original.to_lowercase();
            label.as_deref().is_some_and(|label| label != cleaned)
        })
        .count();
    assert!(relabelled > 0);
}

#[test]
fn rows_follow_distinct_originals() {
    let output = run(OptimusConfig::default(), RunOptions::default());
    assert_eq!(output.table.len(), descriptions().len());

    let labels = output.labels();
    let digits = labels.iter().find(|(original, _)| original == "12345").unwrap();
    assert_eq!(digits.1, None);
    assert!(labels.iter().any(|(_, label)| label.is_some()));
}

#[test]
fn labels_never_revert_to_null() {
    let output = run(OptimusConfig::default(), RunOptions::default());
    let table = &output.table;
    let tiers = table.tier_numbers();

    for row in 0..table.len() {
        let mut labelled = false;
        for tier in &tiers {
            let value = &table.tier(*tier).unwrap()[row];
            if labelled {
                assert!(value.is_some(), "row {row} lost its label at tier {tier}");
            }
            labelled |= value.is_some();
        }
        if labelled {
            assert!(table.current_labels()[row].is_some());
        }
    }
}

#[test]
fn runs_are_deterministic() {
    let first = run(OptimusConfig::default(), RunOptions::default());
    let second = run(OptimusConfig::default(), RunOptions::default());
    assert_eq!(first.table, second.table);
    assert_eq!(first.depths, second.depths);
}

#[test]
fn tier_counter_offsets_the_first_tier() {
    let config = OptimusConfig {
        tier_counter: 3,
        ..OptimusConfig::default()
    };
    let output = run(config, RunOptions::default());
    assert_eq!(output.table.tier_numbers().first().copied(), Some(4));
}

#[test]
fn regrouping_still_terminates() {
    let config = OptimusConfig {
        regroup_labels: true,
        stepsize: 0.5,
        ..OptimusConfig::default()
    };
    let output = run(config, RunOptions::default());
    assert!(output.depths.len() <= 11);
}

#[test]
fn knn_predictions_refer_to_table_rows() {
    let options = RunOptions {
        run_knn: true,
        keep_model: false,
    };
    let output = run(OptimusConfig::default(), options);
    assert!(!output.knn.is_empty());
    let mut predicted: Vec<&str> = output.knn.iter().map(|p| p.original.as_str()).collect();
    predicted.sort_unstable();
    predicted.dedup();
    assert_eq!(predicted.len(), output.knn.len());
    let originals = output.table.originals();
    for prediction in &output.knn {
        assert!(originals.contains(&prediction.original));
        assert!(!prediction.predicted_label.is_empty());
        assert_ne!(prediction.predicted_label, SKIPPED);
    }
}

#[test]
fn results_can_be_prepared_for_review() {
    let dir = TempDir::new().unwrap();
    let results = dir.path().join("results.csv");
    let output = run(OptimusConfig::default(), RunOptions::default());
    output.write_table(&results).unwrap();

    let mut review = ReviewTable::read_csv(&results).unwrap();
    assert_eq!(review.len(), output.table.len());
    let kept = review.prepare(2);
    assert!(!kept.is_empty());
    for cluster in &kept {
        review
            .relabel(cluster, &optimus_rs::pipeline::LabelSource::Fixed("ok".to_string()), &[])
            .unwrap();
    }

    let reviewed = dir.path().join("review.csv");
    review.write_csv(&reviewed).unwrap();
    let content = fs::read_to_string(&reviewed).unwrap();
    assert!(content.lines().next().unwrap().ends_with("current_labels,new_labels"));

    let new_labels = review.column("new_labels").unwrap();
    assert!(new_labels
        .iter()
        .all(|label| matches!(label.as_deref(), Some("ok") | Some(SKIPPED))));
}
