//! Property-based tests for series smoothing

use covid_etl::smoothing::{
    cumulative_sum, detect_outliers, replace_outliers, smooth_series, SmoothingParams,
};
use proptest::prelude::*;

fn counts(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((0u32..5000).prop_map(f64::from), 0..max_len)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Length is preserved and unflagged positions keep their raw value
    #[test]
    fn unflagged_positions_are_unchanged(
        values in counts(40),
        window_size in 1usize..8,
        threshold in 0.0f64..3.0,
    ) {
        let params = SmoothingParams::new(window_size, threshold);
        let series = smooth_series(&values, &params);

        prop_assert_eq!(series.smoothed.len(), values.len());
        prop_assert_eq!(series.cumulative.len(), values.len());
        for (i, flagged) in series.outliers.iter().enumerate() {
            if !flagged {
                prop_assert_eq!(series.smoothed[i], values[i]);
            }
        }
    }

    /// Flagged positions take the raw predecessor, or the raw successor at the head
    #[test]
    fn flagged_positions_borrow_a_raw_neighbour(
        values in counts(40),
        threshold in 0.0f64..1.2,
    ) {
        let series = smooth_series(&values, &SmoothingParams::new(3, threshold));
        for (i, flagged) in series.outliers.iter().enumerate() {
            if *flagged {
                let expected = if i == 0 { values[1] } else { values[i - 1] };
                prop_assert_eq!(series.smoothed[i], expected);
            }
        }
    }

    /// |x - mean| can never exceed (n - 1) / sqrt(n) sample deviations
    #[test]
    fn threshold_above_maximum_z_never_flags(
        values in counts(40),
        window_size in 2usize..8,
    ) {
        let n = window_size as f64;
        let params = SmoothingParams::new(window_size, (n - 1.0) / n.sqrt() + 0.01);
        prop_assert!(detect_outliers(&values, &params).iter().all(|f| !f));
    }

    #[test]
    fn default_parameters_never_flag(values in counts(40)) {
        let series = smooth_series(&values, &SmoothingParams::default());
        prop_assert_eq!(series.outlier_count(), 0);
        prop_assert_eq!(series.smoothed, values);
    }

    #[test]
    fn constant_series_has_no_outliers(
        value in 0u32..1000,
        len in 0usize..30,
        window_size in 1usize..8,
    ) {
        let values = vec![f64::from(value); len];
        let flags = detect_outliers(&values, &SmoothingParams::new(window_size, 0.0));
        prop_assert!(flags.iter().all(|f| !f));
    }

    #[test]
    fn short_series_are_unchanged(value in 0u32..5000, threshold in 0.0f64..3.0) {
        let values = vec![f64::from(value)];
        let series = smooth_series(&values, &SmoothingParams::new(3, threshold));
        prop_assert_eq!(&series.smoothed, &values);
        prop_assert_eq!(&series.cumulative, &values);

        let empty = smooth_series(&[], &SmoothingParams::new(3, threshold));
        prop_assert!(empty.smoothed.is_empty());
    }

    /// The running total is recounted from the raw values, not the smoothed ones
    #[test]
    fn cumulative_is_prefix_sum_of_raw(values in counts(40), threshold in 0.0f64..1.2) {
        let series = smooth_series(&values, &SmoothingParams::new(3, threshold));
        let mut total = 0.0;
        for (i, value) in values.iter().enumerate() {
            total += value;
            prop_assert_eq!(series.cumulative[i], total);
        }
    }

    #[test]
    fn missing_values_stay_missing(
        values in prop::collection::vec(
            prop_oneof![Just(f64::NAN), (0u32..100).prop_map(f64::from)],
            1..30,
        ),
    ) {
        let flags = detect_outliers(&values, &SmoothingParams::new(3, 0.5));
        let totals = cumulative_sum(&values);
        for (i, value) in values.iter().enumerate() {
            if value.is_nan() {
                prop_assert!(!flags[i]);
                prop_assert!(totals[i].is_nan());
            }
        }
        let known: f64 = values.iter().filter(|v| !v.is_nan()).sum();
        let last_known = totals.iter().rev().find(|v| !v.is_nan()).copied().unwrap_or(0.0);
        prop_assert_eq!(last_known, known);
    }

    #[test]
    fn explicit_mask_replacement(values in counts(20), mask_seed in any::<u64>()) {
        let mask: Vec<bool> = (0..values.len()).map(|i| (mask_seed >> (i % 64)) & 1 == 1).collect();
        let replaced = replace_outliers(&values, &mask);
        for (i, flagged) in mask.iter().enumerate() {
            let expected = match (*flagged, i) {
                (false, _) => values[i],
                (true, 0) if values.len() > 1 => values[1],
                (true, 0) => values[0],
                (true, _) => values[i - 1],
            };
            prop_assert_eq!(replaced[i], expected);
        }
    }
}
