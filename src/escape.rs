//! Escape-time evaluation with a smooth (continuous) iteration count.

use num::Complex;

/// Iteration cap; points still bounded after this many steps are in the set.
pub const MAX_ITERATIONS: u32 = 1000;

/// Iteration continues while `|z|² <= ESCAPE_RADIUS_SQUARED`.
pub const ESCAPE_RADIUS_SQUARED: f64 = 200.0;

/// Maps `c` to a normalised escape value in `[0, 1]`, with 1 meaning "did not
/// escape".
///
/// For an orbit escaping after `n` iterations with final magnitude `|z|` the
/// value is `(n + 1 - ln(log2 |z|)) / MAX_ITERATIONS`.
pub fn escape_value(c: Complex<f64>) -> f64 {
    let mut z = Complex::new(0.0, 0.0);
    let mut iteration = 0;
    while z.norm_sqr() <= ESCAPE_RADIUS_SQUARED && iteration < MAX_ITERATIONS {
        z = z * z + c;
        iteration += 1;
    }

    if iteration == MAX_ITERATIONS {
        return 1.0;
    }

    let magnitude = z.norm_sqr().sqrt();
    let mu = (iteration as f64 + 1.0 - magnitude.log2().ln()) / MAX_ITERATIONS as f64;
    if mu.is_nan() {
        1.0
    } else {
        mu.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_never_escapes() {
        assert_eq!(escape_value(Complex::new(0.0, 0.0)), 1.0);
    }

    #[test]
    fn period_two_pinch_point_is_in_the_set() {
        assert_eq!(escape_value(Complex::new(-0.75, 0.0)), 1.0);
    }

    #[test]
    fn far_corner_escapes_in_a_few_steps() {
        // 0 -> -2-i -> 1+3i -> -10+5i -> 73-101i
        let value = escape_value(Complex::new(-2.0, -1.0));
        let expected = (4.0 + 1.0 - (73f64 * 73.0 + 101.0 * 101.0).sqrt().log2().ln()) / 1000.0;
        assert!((value - expected).abs() < 1e-12, "{} != {}", value, expected);
    }

    #[test]
    fn values_stay_in_the_unit_interval() {
        for re in -40..=10 {
            for im in -20..=20 {
                let value = escape_value(Complex::new(re as f64 / 10.0, im as f64 / 10.0));
                assert!((0.0..=1.0).contains(&value), "{} at {}+{}i", value, re, im);
            }
        }
    }

    #[test]
    fn value_grows_towards_the_cusp() {
        // Along the real axis right of 1/4 every orbit is increasing in c, so
        // the escape value must not drop as c approaches the cusp.
        let mut previous = 0.0;
        for step in 0..750 {
            let value = escape_value(Complex::new(1.0 - step as f64 * 0.001, 0.0));
            assert!(value >= previous, "dropped at step {}", step);
            previous = value;
        }
    }
}
