//! Comparator properties over generated tables.

use proptest::prelude::*;
use tensure_compare::{compare_tables, Verdict};
use tensure_model::TensorData;

fn finite_table() -> impl Strategy<Value = TensorData> {
    prop::collection::vec((prop::collection::vec(0i64..8, 2), -1e6f64..1e6), 0..20)
        .prop_map(|records| records.into_iter().collect())
}

proptest! {
    #[test]
    fn table_equals_itself(table in finite_table()) {
        prop_assert_eq!(compare_tables(&table, &table, 0.0), Verdict::Equal);
    }

    #[test]
    fn verdict_is_symmetric_for_equal_sizes(a in finite_table(), b in finite_table(), tol in 0.0f64..10.0) {
        let forward = compare_tables(&a, &b, tol).is_equal();
        let backward = compare_tables(&b, &a, tol).is_equal();
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn extra_record_breaks_equality(table in finite_table()) {
        let mut bigger = table.clone();
        bigger.insert(vec![100, 100], 1.0);
        prop_assert!(!compare_tables(&table, &bigger, f64::MAX).is_equal());
    }
}
