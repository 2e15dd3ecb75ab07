use crate::CoreError;

/// Floating point type used throughout system
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

pub fn ensure_len(actual: usize, expected: usize, what: &'static str) -> Result<(), CoreError> {
    if actual == expected {
        Ok(())
    } else {
        Err(CoreError::LengthMismatch {
            what,
            expected,
            actual,
        })
    }
}

/// Largest magnitude among the values, i.e. `max(|min|, |max|)`. Zero for an empty slice.
pub fn extreme_magnitude(values: &[Real]) -> Real {
    values.iter().fold(0.0, |acc: Real, v| acc.max(v.abs()))
}

/// Infinity norm of `a - b` over the common length.
pub fn inf_norm_diff(a: &[Real], b: &[Real]) -> Real {
    a.iter()
        .zip(b)
        .fold(0.0, |acc: Real, (x, y)| acc.max((x - y).abs()))
}

/// `num / den`, except that a zero numerator over a zero denominator yields 0.
pub fn relative_ratio(num: Real, den: Real) -> Real {
    if num == 0.0 && den == 0.0 {
        0.0
    } else {
        num / den
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn extreme_magnitude_picks_negative_side() {
        assert_eq!(extreme_magnitude(&[-5.0, 2.0, 3.0]), 5.0);
        assert_eq!(extreme_magnitude(&[]), 0.0);
    }

    #[test]
    fn inf_norm_diff_basic() {
        assert_eq!(inf_norm_diff(&[1.0, 2.0, 3.0], &[1.0, 0.5, 3.5]), 1.5);
    }

    #[test]
    fn relative_ratio_zero_over_zero() {
        assert_eq!(relative_ratio(0.0, 0.0), 0.0);
        assert_eq!(relative_ratio(1.0, 4.0), 0.25);
        assert!(relative_ratio(1.0, 0.0).is_infinite());
    }

    #[test]
    fn ensure_len_reports_mismatch() {
        let err = ensure_len(3, 4, "faces").unwrap_err();
        assert!(matches!(
            err,
            CoreError::LengthMismatch {
                expected: 4,
                actual: 3,
                ..
            }
        ));
    }
}
