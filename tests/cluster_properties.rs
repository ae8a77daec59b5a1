//! Property tests for Ward linkage and flat cluster extraction.

use std::collections::HashSet;

use ndarray::Array2;
use optimus_rs::clustering::{ward, ClusterConstructor};
use proptest::prelude::*;

fn points_strategy() -> impl Strategy<Value = Vec<Vec<f32>>> {
    prop::collection::vec(prop::collection::vec(-10.0f32..10.0, 3), 2..30)
}

fn matrix(points: &[Vec<f32>]) -> Array2<f32> {
    let flat: Vec<f32> = points.iter().flatten().copied().collect();
    Array2::from_shape_vec((points.len(), 3), flat).unwrap()
}

fn words(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("w{i}")).collect()
}

proptest! {
    #[test]
    fn linkage_rows_are_monotone(points in points_strategy()) {
        let tree = ward(matrix(&points).view()).unwrap();
        prop_assert_eq!(tree.rows().len(), points.len() - 1);
        prop_assert!(tree.rows().windows(2).all(|w| w[0].distance <= w[1].distance));
        prop_assert_eq!(tree.rows().last().unwrap().size, points.len());
    }

    #[test]
    fn clusters_and_non_selected_partition_the_words(
        points in points_strategy(),
        threshold in 0.0f64..30.0,
    ) {
        let words = words(points.len());
        let tree = ward(matrix(&points).view()).unwrap();
        let set = ClusterConstructor::new(threshold).construct(&tree, &words);

        let mut seen = HashSet::new();
        for word in set.clusters.iter().flatten().chain(set.non_selected.iter()) {
            prop_assert!(seen.insert(word.clone()), "{} appears twice", word);
        }
        prop_assert_eq!(seen.len(), words.len());
        prop_assert_eq!(set.word_count(), words.len());
        prop_assert!(set.clusters.iter().all(|c| c.len() >= 2));
    }

    #[test]
    fn a_cut_above_every_merge_keeps_one_cluster(points in points_strategy()) {
        let words = words(points.len());
        let tree = ward(matrix(&points).view()).unwrap();
        let top = tree.rows().last().unwrap().distance;
        let set = ClusterConstructor::new(top + 1.0).construct(&tree, &words);

        prop_assert_eq!(set.clusters.len(), 1);
        prop_assert_eq!(set.clusters[0].len(), words.len());
        prop_assert!(set.non_selected.is_empty());
    }
}

#[test]
fn a_zero_cut_selects_nothing() {
    let points = vec![vec![0.0, 0.0, 0.0], vec![0.0, 0.0, 0.0], vec![1.0, 2.0, 3.0]];
    let words = words(3);
    let tree = ward(matrix(&points).view()).unwrap();
    let set = ClusterConstructor::new(0.0).construct(&tree, &words);

    assert!(set.clusters.is_empty());
    assert_eq!(set.non_selected.len(), 3);
}
