//! Normal and Student-t distribution helpers.

use std::f64::consts::{PI, SQRT_2};

/// Standard normal CDF.
pub fn normal_cdf(z: f64) -> f64 {
    (1.0 + libm::erf(z / SQRT_2)) / 2.0
}

/// Normal CDF of `x` under N(mean, stddev).
pub fn normal_cdf_at(x: f64, mean: f64, stddev: f64) -> f64 {
    (1.0 + libm::erf((x - mean) / (stddev * SQRT_2))) / 2.0
}

/// The value `v` such that P(X <= v) = 1 - p for X ~ N(x, stddev).
///
/// Mirrors the erfinv formulation: `-erfinv(2p - 1) * stddev * sqrt(2) + x`.
/// Returns ±infinity at p = 0 or 1; callers clamp.
pub fn inverse_cdf(x: f64, p: f64, stddev: f64) -> f64 {
    -erf_inv(2.0 * p - 1.0) * stddev * SQRT_2 + x
}

/// Inverse error function.
///
/// Initial estimate from the Winitzki log-based approximation, then Newton
/// steps against `libm::erf`, which take the result to full double precision
/// across (-1, 1).
pub fn erf_inv(x: f64) -> f64 {
    if x >= 1.0 {
        return f64::INFINITY;
    }
    if x <= -1.0 {
        return f64::NEG_INFINITY;
    }
    if x == 0.0 {
        return 0.0;
    }

    const A: f64 = 0.147;
    let ln_term = (1.0 - x * x).ln();
    let t1 = 2.0 / (PI * A) + ln_term / 2.0;
    let mut r = (x.signum()) * ((t1 * t1 - ln_term / A).sqrt() - t1).sqrt();

    // Newton refinement: f(r) = erf(r) - x, f'(r) = 2/sqrt(pi) * exp(-r^2).
    for _ in 0..3 {
        let err = libm::erf(r) - x;
        r -= err * (PI.sqrt() / 2.0) * (r * r).exp();
    }
    r
}

/// Student-t probability density with integer degrees of freedom.
pub fn t_pdf(x: f64, df: i32) -> f64 {
    let dff = df as f64;
    let coeff = libm::tgamma((dff + 1.0) / 2.0) / libm::tgamma(dff / 2.0) / (dff * PI).sqrt();
    coeff * (1.0 + (x * x) / dff).powf(-((dff + 1.0) / 2.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_cdf_symmetry() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-12);
        for z in [-2.5, -1.0, -0.3, 0.7, 1.96] {
            assert!((normal_cdf(z) + normal_cdf(-z) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_normal_cdf_known_values() {
        // Phi(1) ~ 0.8413, Phi(2) ~ 0.9772.
        assert!((normal_cdf(1.0) - 0.841344746).abs() < 1e-6);
        assert!((normal_cdf(2.0) - 0.977249868).abs() < 1e-6);
    }

    #[test]
    fn test_normal_cdf_at_shift_scale() {
        // P(X <= mean) is always one half.
        assert!((normal_cdf_at(7.0, 7.0, 3.0) - 0.5).abs() < 1e-12);
        // One sigma above the mean.
        assert!((normal_cdf_at(10.0, 7.0, 3.0) - normal_cdf(1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_erf_inv_round_trip() {
        for x in [-0.95, -0.5, -0.1, 0.0, 0.1, 0.5, 0.9, 0.999] {
            let r = erf_inv(x);
            assert!(
                (libm::erf(r) - x).abs() < 1e-12,
                "erf(erf_inv({x})) = {}",
                libm::erf(r)
            );
        }
    }

    #[test]
    fn test_erf_inv_tails() {
        assert_eq!(erf_inv(1.0), f64::INFINITY);
        assert_eq!(erf_inv(-1.0), f64::NEG_INFINITY);
    }

    #[test]
    fn test_inverse_cdf_median() {
        // p = 0.5 recovers the location parameter.
        assert!((inverse_cdf(3.0, 0.5, 2.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_cdf_round_trip() {
        let v = inverse_cdf(1.0, 0.2, 3.0);
        // P(X <= v) should be 1 - 0.2 = 0.8.
        assert!((normal_cdf_at(v, 1.0, 3.0) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_t_pdf_peak() {
        // At x = 0, df = 1 (Cauchy), pdf = 1/pi.
        assert!((t_pdf(0.0, 1) - 1.0 / PI).abs() < 1e-12);
    }

    #[test]
    fn test_t_pdf_symmetric_and_decreasing() {
        for df in [1, 3] {
            assert!((t_pdf(1.3, df) - t_pdf(-1.3, df)).abs() < 1e-12);
            assert!(t_pdf(0.0, df) > t_pdf(1.0, df));
            assert!(t_pdf(1.0, df) > t_pdf(2.0, df));
        }
    }

    #[test]
    fn test_t_pdf_df3_known_value() {
        // f(0; 3) = Gamma(2) / (Gamma(1.5) * sqrt(3*pi)) = 2/(pi*sqrt(3)).
        let expected = 2.0 / (PI * 3.0f64.sqrt());
        assert!((t_pdf(0.0, 3) - expected).abs() < 1e-12);
    }
}
