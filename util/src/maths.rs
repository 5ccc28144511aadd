//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Limit a value to the inclusive window `[centre - half_width, centre + half_width]`.
///
/// Non-finite values are passed through as-is, `NaN` in particular is not
/// mapped onto either bound.
pub fn clamp_about<T>(value: T, centre: T, half_width: T) -> T
where
    T: Float,
{
    let mut ret = value;

    if ret > centre + half_width {
        ret = centre + half_width
    }
    if ret < centre - half_width {
        ret = centre - half_width
    }

    ret
}

/// Arithmetic mean of two values.
pub fn mean2<T>(a: T, b: T) -> T
where
    T: Float,
{
    (a + b) / (T::one() + T::one())
}

/// Dot product of two equal length arrays.
pub fn dot<T, const N: usize>(a: &[T; N], b: &[T; N]) -> T
where
    T: Float,
{
    a.iter()
        .zip(b.iter())
        .fold(T::zero(), |acc, (&x, &y)| acc + x * y)
}

#[cfg(test)]
mod test {
    use super::*;

    const TAU: f64 = std::f64::consts::TAU;

    #[test]
    fn test_clamp_about() {
        assert_eq!(clamp_about(1.0, 0.0, TAU), 1.0);
        assert_eq!(clamp_about(10.0, 0.0, TAU), TAU);
        assert_eq!(clamp_about(-10.0, 0.0, TAU), -TAU);
        assert_eq!(clamp_about(-10.0, -5.0, 1.0), -6.0);

        // Bounds are inclusive
        assert_eq!(clamp_about(2.0 + TAU, 2.0, TAU), 2.0 + TAU);

        assert!(clamp_about(f64::NAN, 0.0, 1.0).is_nan());
    }

    #[test]
    fn test_mean_dot() {
        assert_eq!(mean2(-1.0, 3.0), 1.0);
        assert_eq!(dot(&[1.0, 2.0, 3.0], &[4.0, -5.0, 6.0]), 12.0);
        assert_eq!(dot::<f64, 0>(&[], &[]), 0.0);
    }
}
