//! Property-based tests for test-row alignment.
//!
//! For any test index file, in any order:
//! - The re-seat map is a permutation that only touches test slots
//! - A sorted index file leaves every row in place
//! - Labels and feature rows move together under the same map

use grafene_core::CsrMatrix;
use grafene_data::citation::reseat_permutation;
use grafene_data::LabelVector;
use proptest::prelude::*;

/// Node count plus a subset of test ids, listed in arbitrary order.
fn arb_test_index() -> impl Strategy<Value = (usize, Vec<usize>)> {
    (1usize..30).prop_flat_map(|n| {
        let ids: Vec<usize> = (0..n).collect();
        (Just(n), prop::sample::subsequence(ids, 0..=n).prop_shuffle())
    })
}

fn sorted(ids: &[usize]) -> Vec<usize> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids
}

proptest! {
    #[test]
    fn reseat_is_a_permutation((n, test) in arb_test_index()) {
        let source = reseat_permutation(n, &test, &sorted(&test)).unwrap();
        prop_assert_eq!(source.len(), n);
        prop_assert_eq!(sorted(&source), (0..n).collect::<Vec<_>>());
        for (i, &s) in source.iter().enumerate() {
            if !test.contains(&i) {
                prop_assert_eq!(s, i);
            }
        }
    }

    #[test]
    fn sorted_index_is_identity((n, test) in arb_test_index()) {
        let test = sorted(&test);
        let source = reseat_permutation(n, &test, &test).unwrap();
        prop_assert_eq!(source, (0..n).collect::<Vec<_>>());
    }

    #[test]
    fn labels_and_rows_move_together(
        (n, test) in arb_test_index(),
        classes in prop::collection::vec(prop::option::of(0u32..4), 30),
    ) {
        let source = reseat_permutation(n, &test, &sorted(&test)).unwrap();

        // Row i carries its own id in column i.
        let triplets: Vec<_> = (0..n).map(|i| (i, i, 1.0)).collect();
        let rows = CsrMatrix::from_triplets((n, n), &triplets).unwrap();
        let labels = LabelVector::from_options(classes[..n].to_vec());

        let moved_rows = rows.select_rows(&source).unwrap();
        let moved_labels = labels.permute(&source).unwrap();
        for (i, &s) in source.iter().enumerate() {
            prop_assert_eq!(moved_rows.row(i).collect::<Vec<_>>(), vec![(s, 1.0)]);
            prop_assert_eq!(moved_labels.get(i), labels.get(s));
        }
    }
}

#[test]
fn out_of_range_test_id_is_rejected() {
    assert!(reseat_permutation(4, &[5, 3], &[3, 5]).is_err());
}
