//! Linear resampling shared by all renderers.

/// Resample `values` to `target_len` samples by linear interpolation.
///
/// The index ratio is `(len - 1) / (target_len - 1)`. When one
/// interpolation neighbor is a NaN hole, the non-missing neighbor's value
/// is used instead; two NaN neighbors propagate the hole. A no-op when
/// `target_len` is zero or the input is empty, and the identity when
/// `target_len == values.len()`.
pub fn resample(values: &[f64], target_len: usize) -> Vec<f64> {
    if target_len == 0 || values.is_empty() {
        return values.to_vec();
    }
    if target_len == values.len() {
        return values.to_vec();
    }
    if target_len == 1 {
        return vec![values[0]];
    }

    let ratio = (values.len() - 1) as f64 / (target_len - 1) as f64;
    let mut out = Vec::with_capacity(target_len);

    for i in 0..target_len {
        let pos = i as f64 * ratio;
        let lo = pos.floor() as usize;
        let hi = (pos.ceil() as usize).min(values.len() - 1);
        let frac = pos - lo as f64;

        let a = values[lo];
        let b = values[hi];

        let sample = match (a.is_nan(), b.is_nan()) {
            (false, false) => a + (b - a) * frac,
            (true, false) => b,
            (false, true) => a,
            (true, true) => f64::NAN,
        };
        out.push(sample);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_length() {
        let values = vec![1.0, 5.0, 3.0, 8.0];
        assert_eq!(resample(&values, values.len()), values);
    }

    #[test]
    fn test_idempotent_at_target_length() {
        let values = vec![1.0, 5.0, 3.0, 8.0, 2.0, 9.0];
        let once = resample(&values, 4);
        let twice = resample(&once, 4);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_upsample_interpolates() {
        let out = resample(&[0.0, 10.0], 3);
        assert_eq!(out, vec![0.0, 5.0, 10.0]);
    }

    #[test]
    fn test_downsample_keeps_endpoints() {
        let out = resample(&[0.0, 1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(out, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_zero_target_is_noop() {
        let values = vec![1.0, 2.0];
        assert_eq!(resample(&values, 0), values);
    }

    #[test]
    fn test_empty_input_is_noop() {
        assert!(resample(&[], 5).is_empty());
    }

    #[test]
    fn test_target_one_takes_first() {
        assert_eq!(resample(&[7.0, 8.0, 9.0], 1), vec![7.0]);
    }

    #[test]
    fn test_nan_neighbor_falls_back() {
        let out = resample(&[1.0, f64::NAN, 3.0], 5);
        // No interpolated sample between real neighbors may be NaN.
        assert!(out.iter().filter(|v| v.is_nan()).count() <= 1);
        assert_eq!(out[0], 1.0);
        assert_eq!(out[4], 3.0);
    }

    #[test]
    fn test_all_nan_stays_nan() {
        let out = resample(&[f64::NAN, f64::NAN], 4);
        assert!(out.iter().all(|v| v.is_nan()));
    }
}
