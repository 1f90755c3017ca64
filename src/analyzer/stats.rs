//! Small numeric helpers shared by the detectors
//!
//! Variance and standard deviation are population statistics (divide by N),
//! matching how the outlier thresholds were tuned.

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population variance, `None` for an empty slice
pub fn variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    Some(values.iter().map(|&v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64)
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> Option<f64> {
    variance(values).map(f64::sqrt)
}

/// Calculate RMS of a slice
pub fn rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&x| x * x).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

/// `mean + sigma * std` together with the indices strictly above it.
///
/// Returns `None` when there is nothing to threshold or the statistics are
/// not finite (NaN input, overflow).
pub fn outliers_above(values: &[f64], sigma: f64) -> Option<(f64, Vec<usize>)> {
    let m = mean(values)?;
    let s = std_dev(values)?;
    let threshold = m + sigma * s;
    if !threshold.is_finite() {
        return None;
    }

    let indices = values
        .iter()
        .enumerate()
        .filter(|(_, &v)| v > threshold)
        .map(|(i, _)| i)
        .collect();

    Some((threshold, indices))
}

/// Start offsets of every full window, `range(0, len - window, hop)` style:
/// the last start is strictly below `len - window`.
pub fn window_starts(len: usize, window: usize, hop: usize) -> impl Iterator<Item = usize> {
    let end = len.saturating_sub(window);
    (0..end).step_by(hop.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // ==========================================================================
    // MEAN / VARIANCE
    // ==========================================================================

    #[test]
    fn test_mean_and_population_variance() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&v).unwrap(), 5.0);
        assert_relative_eq!(variance(&v).unwrap(), 4.0);
        assert_relative_eq!(std_dev(&v).unwrap(), 2.0);
    }

    #[test]
    fn test_empty_statistics_are_none() {
        assert!(mean(&[]).is_none());
        assert!(variance(&[]).is_none());
        assert!(std_dev(&[]).is_none());
        assert!(outliers_above(&[], 2.0).is_none());
    }

    // ==========================================================================
    // RMS TESTS
    // ==========================================================================

    #[test]
    fn test_rms_constant() {
        let samples = vec![0.5, 0.5, 0.5, 0.5];
        assert!((rms(&samples) - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_rms_symmetric() {
        let samples = vec![1.0, -1.0, 1.0, -1.0];
        assert!((rms(&samples) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_rms_empty() {
        let samples: Vec<f64> = vec![];
        assert_eq!(rms(&samples), 0.0);
    }

    // ==========================================================================
    // OUTLIER THRESHOLD
    // ==========================================================================

    #[test]
    fn test_single_spike_is_outlier() {
        let mut v = vec![1.0; 20];
        v[7] = 10.0;
        let (threshold, idx) = outliers_above(&v, 2.0).unwrap();
        assert!(threshold < 10.0);
        assert_eq!(idx, vec![7]);
    }

    #[test]
    fn test_constant_series_has_no_outliers() {
        let v = vec![0.3; 50];
        let (_, idx) = outliers_above(&v, 2.0).unwrap();
        assert!(idx.is_empty());
    }

    #[test]
    fn test_even_step_never_clears_two_sigma() {
        // Half low, half high: every value sits exactly one std from the mean
        let mut v = vec![1.0; 10];
        v.extend(vec![2.0; 10]);
        let (_, idx) = outliers_above(&v, 2.0).unwrap();
        assert!(idx.is_empty());
        let (_, idx) = outliers_above(&v, 0.5).unwrap();
        assert_eq!(idx, (10..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_nan_input_yields_none() {
        assert!(outliers_above(&[1.0, f64::NAN], 2.0).is_none());
    }

    // ==========================================================================
    // WINDOWING
    // ==========================================================================

    #[test]
    fn test_window_starts_exclude_final_position() {
        let starts: Vec<usize> = window_starts(10, 4, 2).collect();
        assert_eq!(starts, vec![0, 2, 4]);
    }

    #[test]
    fn test_window_starts_short_input() {
        assert_eq!(window_starts(4, 4, 2).count(), 0);
        assert_eq!(window_starts(3, 4, 2).count(), 0);
    }
}
