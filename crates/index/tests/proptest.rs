//! Property-based tests for tarn-index using proptest.

use proptest::prelude::*;
use tarn_core::{Document, IndexSpec, Order, Value};
use tarn_index::{ActiveBucket, MultiLevelTree};

fn make_doc(id: usize, a: i64, b: i64) -> Document {
    Document::new()
        .with("_id", Value::from(id as i64))
        .with("a", Value::from(a))
        .with("b", Value::from(b))
}

fn keys(docs: &[Document]) -> Vec<(i64, i64)> {
    docs.iter()
        .map(|d| {
            (
                d.get("a").and_then(Value::as_i64).unwrap(),
                d.get("b").and_then(Value::as_i64).unwrap(),
            )
        })
        .collect()
}

proptest! {
    /// In-order traversal yields the compound-key sort of the input,
    /// for any insertion order.
    #[test]
    fn tree_in_order_is_sorted(pairs in prop::collection::vec((0i64..50, 0i64..50), 1..200)) {
        let spec = IndexSpec::asc("a").with("b", Order::Asc);
        let mut tree = MultiLevelTree::new(spec);
        for (i, &(a, b)) in pairs.iter().enumerate() {
            tree.insert(&make_doc(i, a, b));
        }

        let got = keys(&tree.in_order());
        let mut expected: Vec<(i64, i64)> = pairs.clone();
        expected.sort();
        prop_assert_eq!(got, expected);
        prop_assert_eq!(tree.count(), pairs.len());
    }

    /// The traversal is permutation-independent: any two insertion orders
    /// of the same multiset produce the same sequence.
    #[test]
    fn tree_in_order_permutation_independent(
        pairs in prop::collection::vec((0i64..20, 0i64..20), 1..100).prop_shuffle()
    ) {
        let spec = IndexSpec::asc("a").with("b", Order::Asc);

        let mut shuffled_tree = MultiLevelTree::new(spec.clone());
        for (i, &(a, b)) in pairs.iter().enumerate() {
            shuffled_tree.insert(&make_doc(i, a, b));
        }

        let mut sorted_pairs = pairs.clone();
        sorted_pairs.sort();
        let mut sorted_tree = MultiLevelTree::new(spec);
        for (i, &(a, b)) in sorted_pairs.iter().enumerate() {
            sorted_tree.insert(&make_doc(i, a, b));
        }

        prop_assert_eq!(keys(&shuffled_tree.in_order()), keys(&sorted_tree.in_order()));
    }

    /// Prefix lookup returns exactly the matching documents, sorted on
    /// the remaining fields.
    #[test]
    fn tree_lookup_prefix(pairs in prop::collection::vec((0i64..10, 0i64..10), 1..100), probe in 0i64..10) {
        let spec = IndexSpec::asc("a").with("b", Order::Asc);
        let mut tree = MultiLevelTree::new(spec);
        for (i, &(a, b)) in pairs.iter().enumerate() {
            tree.insert(&make_doc(i, a, b));
        }

        let hits = tree.lookup(&Document::new().with("a", Value::from(probe)));
        let got = keys(&hits);

        let mut expected: Vec<(i64, i64)> =
            pairs.iter().copied().filter(|&(a, _)| a == probe).collect();
        expected.sort();
        prop_assert_eq!(got, expected);
    }

    /// Placing each document at the bucket-reported index keeps the
    /// sequence sorted at every step.
    #[test]
    fn bucket_positions_keep_sequence_sorted(values in prop::collection::vec(0i64..100, 1..200)) {
        let mut bucket = ActiveBucket::new(IndexSpec::asc("n"));
        let mut sequence: Vec<i64> = Vec::new();

        for (i, &n) in values.iter().enumerate() {
            let doc = Document::new()
                .with("_id", Value::from(i as i64))
                .with("n", Value::from(n));
            let pos = bucket.insert(&doc);
            prop_assert!(pos <= sequence.len());
            sequence.insert(pos, n);
            prop_assert!(sequence.windows(2).all(|w| w[0] <= w[1]));
        }

        prop_assert_eq!(bucket.count(), values.len());
    }

    /// Remove-then-reinsert reports a position consistent with the
    /// remaining population.
    #[test]
    fn bucket_remove_reinsert(values in prop::collection::vec(0i64..50, 2..100), victim in 0usize..100, new_n in 0i64..50) {
        let mut bucket = ActiveBucket::new(IndexSpec::asc("n"));
        let mut sequence: Vec<(i64, i64)> = Vec::new();

        for (i, &n) in values.iter().enumerate() {
            let doc = Document::new()
                .with("_id", Value::from(i as i64))
                .with("n", Value::from(n));
            let pos = bucket.insert(&doc);
            sequence.insert(pos, (i as i64, n));
        }

        let victim = victim % values.len();
        let old = Document::new()
            .with("_id", Value::from(victim as i64))
            .with("n", Value::from(values[victim]));
        prop_assert!(bucket.remove(&old));
        sequence.retain(|&(id, _)| id != victim as i64);

        let updated = Document::new()
            .with("_id", Value::from(victim as i64))
            .with("n", Value::from(new_n));
        let pos = bucket.insert(&updated);
        sequence.insert(pos, (victim as i64, new_n));
        prop_assert!(sequence.windows(2).all(|w| w[0].1 <= w[1].1));
    }
}
