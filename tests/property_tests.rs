use idem::matrix::LabelMatrix;
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_set_then_get_round_trips(
        writes in prop::collection::vec((0usize..8, 0usize..8, -100.0f64..100.0), 1..40)
    ) {
        let mut matrix = LabelMatrix::new(f64::NEG_INFINITY);
        for &(i, j, v) in &writes {
            matrix.set(i, j, v);
        }
        // last write per cell wins
        for &(i, j, _) in &writes {
            let expected = writes
                .iter()
                .rev()
                .find(|&&(wi, wj, _)| wi == i && wj == j)
                .map(|&(_, _, v)| v);
            prop_assert_eq!(Some(matrix.get(&i, &j)), expected);
        }
    }

    #[test]
    fn prop_unset_cells_return_default(
        writes in prop::collection::vec((0usize..5, 0usize..5, 0.0f64..1.0), 1..20),
        probe in (0usize..5, 5usize..10)
    ) {
        let mut matrix = LabelMatrix::new(-1.0);
        for &(i, j, v) in &writes {
            matrix.set(i, j, v);
        }
        // the probe column label never appears in any write
        prop_assert_eq!(matrix.get(&probe.0, &probe.1), -1.0);
    }

    #[test]
    fn prop_transpose_is_an_involution(
        writes in prop::collection::vec((0usize..6, 0usize..6, -5.0f64..5.0), 1..30)
    ) {
        let mut matrix = LabelMatrix::new(0.0);
        for &(i, j, v) in &writes {
            matrix.set(i, j, v);
        }
        let twice = matrix.transpose().transpose();
        prop_assert_eq!(twice.shape(), matrix.shape());
        for &(i, j, _) in &writes {
            prop_assert_eq!(twice.get(&i, &j), matrix.get(&i, &j));
            prop_assert_eq!(matrix.transpose().get(&j, &i), matrix.get(&i, &j));
        }
    }

    #[test]
    fn prop_remove_row_drops_only_that_row(
        rows in prop::collection::vec(0usize..6, 2..10),
        victim_index in 0usize..6
    ) {
        let mut matrix = LabelMatrix::new(0.0);
        for (k, &r) in rows.iter().enumerate() {
            matrix.set(r, 0, k as f64);
        }
        let victim = rows[victim_index % rows.len()];
        matrix.remove_row(&victim);
        prop_assert!(!matrix.row_labels().contains(&victim));
        for &r in &rows {
            if r != victim {
                prop_assert!(matrix.row_labels().contains(&r));
            }
        }
    }
}
