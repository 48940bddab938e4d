use std::f64::consts::PI;

/// Above this argument `erfc` falls below ~1e-296 and the asymptotic series takes over
const ASYMPTOTIC_THRESHOLD: f64 = 26.0;

/// $\ln \mathrm{erfc}(x)$, finite for arguments where `erfc` underflows
pub fn ln_erfc(x: f64) -> f64 {
    if x < ASYMPTOTIC_THRESHOLD {
        return f64::ln(libm::erfc(x));
    }
    let inv_2x2 = 0.5 / (x * x);
    // 1 - 1/(2x^2) + 3/(2x^2)^2 - 15/(2x^2)^3 + 105/(2x^2)^4
    let series = 1.0 - inv_2x2 * (1.0 - inv_2x2 * (3.0 - inv_2x2 * (15.0 - 105.0 * inv_2x2)));
    -x * x - f64::ln(x * PI.sqrt()) + f64::ln(series)
}
