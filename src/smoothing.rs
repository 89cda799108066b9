//! Rolling-window outlier smoothing of a daily count series
//!
//! A position is an outlier when its value falls outside
//! `mean ± threshold * std` of the centered window around it. Outliers take
//! the raw value of the previous position; the head of the series, having no
//! predecessor, takes the raw value of the next one.
//!
//! Missing counts are represented as `NaN`. They are skipped by the window
//! statistics, are never outliers, and stay missing in the running total.

use statrs::statistics::{Data, Distribution};
use std::ops::Range;

/// Window size and outlier threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingParams {
    pub window_size: usize,
    /// Number of standard deviations tolerated around the window mean
    pub threshold: f64,
}

impl SmoothingParams {
    pub fn new(window_size: usize, threshold: f64) -> Self {
        Self {
            window_size,
            threshold,
        }
    }
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self::new(3, 2.0)
    }
}

/// Statistics of one centered window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    /// `None` when the window holds no values
    pub mean: Option<f64>,
    /// Sample standard deviation, `None` with fewer than two values
    pub std_dev: Option<f64>,
}

impl WindowStats {
    /// Accepted value range, or `None` when it cannot be computed
    pub fn bounds(&self, threshold: f64) -> Option<(f64, f64)> {
        let mean = self.mean?;
        let std_dev = self.std_dev?;
        Some((mean - threshold * std_dev, mean + threshold * std_dev))
    }
}

/// Result of smoothing one series, aligned by position
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothedSeries {
    pub smoothed: Vec<f64>,
    /// Running total of the raw values
    pub cumulative: Vec<f64>,
    pub outliers: Vec<bool>,
}

impl SmoothedSeries {
    pub fn outlier_count(&self) -> usize {
        self.outliers.iter().filter(|&&flag| flag).count()
    }
}

/// Positions covered by the centered window around `position`.
///
/// An odd window is symmetric; an even one reaches one step further back
/// than forward. Windows are clipped at both ends of the series.
pub fn rolling_window_bounds(position: usize, len: usize, window_size: usize) -> Range<usize> {
    let window_size = window_size.max(1);
    let reach = position + 1 + (window_size - 1) / 2;
    reach.saturating_sub(window_size)..reach.min(len)
}

/// Mean and sample standard deviation of the window around every position
pub fn rolling_stats(values: &[f64], window_size: usize) -> Vec<WindowStats> {
    (0..values.len())
        .map(|position| {
            let window: Vec<f64> = values[rolling_window_bounds(position, values.len(), window_size)]
                .iter()
                .copied()
                .filter(|v| !v.is_nan())
                .collect();
            let count = window.len();
            let data = Data::new(window);

            WindowStats {
                mean: if count > 0 { data.mean() } else { None },
                std_dev: if count > 1 { data.std_dev() } else { None },
            }
        })
        .collect()
}

/// Flag the positions whose value lies outside their window bounds
pub fn detect_outliers(values: &[f64], params: &SmoothingParams) -> Vec<bool> {
    rolling_stats(values, params.window_size)
        .iter()
        .zip(values.iter())
        .map(|(stats, &value)| match stats.bounds(params.threshold) {
            Some((lower, upper)) => value < lower || value > upper,
            None => false,
        })
        .collect()
}

/// Substitute flagged positions with the raw value of their predecessor.
///
/// A flagged head takes the second raw value instead. A single-element series
/// is returned unchanged since it has no neighbour to borrow from.
pub fn replace_outliers(values: &[f64], outliers: &[bool]) -> Vec<f64> {
    debug_assert_eq!(values.len(), outliers.len());

    let mut smoothed = values.to_vec();
    for (position, _) in outliers.iter().enumerate().filter(|(_, &flag)| flag) {
        if position > 0 {
            smoothed[position] = values[position - 1];
        } else if values.len() > 1 {
            smoothed[0] = values[1];
        }
    }
    smoothed
}

/// Running total; missing values stay missing and do not reset the total
pub fn cumulative_sum(values: &[f64]) -> Vec<f64> {
    let mut total = 0.0;
    values
        .iter()
        .map(|&value| {
            if value.is_nan() {
                f64::NAN
            } else {
                total += value;
                total
            }
        })
        .collect()
}

/// Smooth a series and recount its cumulative total from the raw values
pub fn smooth_series(values: &[f64], params: &SmoothingParams) -> SmoothedSeries {
    let outliers = detect_outliers(values, params);
    SmoothedSeries {
        smoothed: replace_outliers(values, &outliers),
        cumulative: cumulative_sum(values),
        outliers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_window_bounds_odd() {
        assert_eq!(rolling_window_bounds(0, 6, 3), 0..2);
        assert_eq!(rolling_window_bounds(3, 6, 3), 2..5);
        assert_eq!(rolling_window_bounds(5, 6, 3), 4..6);
        assert_eq!(rolling_window_bounds(0, 1, 3), 0..1);
    }

    #[test]
    fn test_window_bounds_even_and_unit() {
        assert_eq!(rolling_window_bounds(2, 6, 4), 0..4);
        assert_eq!(rolling_window_bounds(5, 6, 4), 3..6);
        assert_eq!(rolling_window_bounds(3, 6, 1), 3..4);
        assert_eq!(rolling_window_bounds(3, 6, 0), 3..4);
    }

    #[test]
    fn test_rolling_stats() {
        let stats = rolling_stats(&[10.0, 11.0, 9.0], 3);
        assert_relative_eq!(stats[0].mean.unwrap(), 10.5);
        assert_relative_eq!(stats[0].std_dev.unwrap(), 0.5f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(stats[1].mean.unwrap(), 10.0);
        assert_relative_eq!(stats[1].std_dev.unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_single_value_window_has_no_std() {
        let stats = rolling_stats(&[7.0], 3);
        assert_eq!(stats[0].mean, Some(7.0));
        assert_eq!(stats[0].std_dev, None);
        assert_eq!(stats[0].bounds(2.0), None);
    }

    #[test]
    fn test_missing_values_skipped_by_stats() {
        let stats = rolling_stats(&[f64::NAN, 4.0, f64::NAN], 3);
        assert_eq!(stats[0].mean, Some(4.0));
        assert_eq!(stats[0].std_dev, None);

        let stats = rolling_stats(&[f64::NAN], 3);
        assert_eq!(stats[0].mean, None);
    }

    #[test]
    fn test_spike_replaced_with_previous_value() {
        let raw = [10.0, 11.0, 9.0, 500.0, 12.0, 13.0];
        let result = smooth_series(&raw, &SmoothingParams::new(3, 1.1));

        assert_eq!(result.outliers, vec![false, false, false, true, false, false]);
        assert_eq!(result.smoothed, vec![10.0, 11.0, 9.0, 9.0, 12.0, 13.0]);
        assert_eq!(result.cumulative, vec![10.0, 21.0, 30.0, 530.0, 542.0, 555.0]);
        assert_eq!(result.outlier_count(), 1);
    }

    #[test]
    fn test_default_window_cannot_reach_two_std() {
        // In a window of three the largest sample z-score is 2/sqrt(3)
        let raw = [10.0, 11.0, 9.0, 500.0, 12.0, 13.0];
        let result = smooth_series(&raw, &SmoothingParams::default());

        assert_eq!(result.outlier_count(), 0);
        assert_eq!(result.smoothed, raw.to_vec());
        assert_eq!(result.cumulative, vec![10.0, 21.0, 30.0, 530.0, 542.0, 555.0]);
    }

    #[test]
    fn test_head_outlier_borrows_next_value() {
        let raw = [500.0, 10.0, 11.0, 12.0];
        let mask = [true, false, false, false];
        assert_eq!(replace_outliers(&raw, &mask), vec![10.0, 10.0, 11.0, 12.0]);

        let result = smooth_series(&raw, &SmoothingParams::new(3, 0.5));
        assert!(result.outliers[0]);
        assert_eq!(result.smoothed[0], 10.0);
        assert_eq!(result.smoothed, vec![10.0, 500.0, 11.0, 11.0]);
    }

    #[test]
    fn test_replacement_uses_raw_predecessor() {
        // Consecutive outliers take raw predecessors, not already smoothed ones
        let raw = [1.0, 2.0, 3.0, 4.0];
        let mask = [false, true, true, false];
        assert_eq!(replace_outliers(&raw, &mask), vec![1.0, 1.0, 2.0, 4.0]);
    }

    #[test]
    fn test_single_record_never_replaced() {
        assert_eq!(replace_outliers(&[42.0], &[true]), vec![42.0]);

        let result = smooth_series(&[42.0], &SmoothingParams::new(3, 0.0));
        assert_eq!(result.outliers, vec![false]);
        assert_eq!(result.smoothed, vec![42.0]);
        assert_eq!(result.cumulative, vec![42.0]);
    }

    #[test]
    fn test_empty_series() {
        let result = smooth_series(&[], &SmoothingParams::default());
        assert!(result.smoothed.is_empty());
        assert!(result.cumulative.is_empty());
        assert!(result.outliers.is_empty());
    }

    #[test]
    fn test_constant_series_not_flagged() {
        let raw = vec![5.0; 10];
        let result = smooth_series(&raw, &SmoothingParams::new(3, 0.0));
        assert_eq!(result.outlier_count(), 0);
        assert_eq!(result.smoothed, raw);
    }

    #[test]
    fn test_cumulative_sum_with_missing() {
        let cumulative = cumulative_sum(&[1.0, f64::NAN, 2.0]);
        assert_eq!(cumulative[0], 1.0);
        assert!(cumulative[1].is_nan());
        assert_eq!(cumulative[2], 3.0);
    }

    #[test]
    fn test_missing_value_never_outlier() {
        let raw = [1.0, f64::NAN, 100.0, 1.0];
        let outliers = detect_outliers(&raw, &SmoothingParams::new(3, 0.0));
        assert!(!outliers[1]);
    }
}
