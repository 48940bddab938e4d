use crate::error::BasisError;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Working interval of a basis set and its affine map onto the intrinsic interval
///
/// Arguments are translated as
/// $x = x_\mathrm{min} + (s - s_\mathrm{min}) \frac{x_\mathrm{max} - x_\mathrm{min}}{s_\mathrm{max} - s_\mathrm{min}}$,
/// where $[s_\mathrm{min}, s_\mathrm{max}]$ is the working interval and
/// $[x_\mathrm{min}, x_\mathrm{max}]$ is the interval the basis functions are defined on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BasisInterval {
    min: f64,
    max: f64,
    intrinsic_min: f64,
    intrinsic_max: f64,
    periodic: bool,
    bounded: bool,
}

impl BasisInterval {
    pub fn new(
        min: f64,
        max: f64,
        intrinsic_min: f64,
        intrinsic_max: f64,
        periodic: bool,
        bounded: bool,
    ) -> Result<Self, BasisError> {
        for (a, b) in [(min, max), (intrinsic_min, intrinsic_max)] {
            if !(a.is_finite() && b.is_finite() && a < b) {
                return Err(BasisError::InvalidInterval { min: a, max: b });
            }
        }
        Ok(Self {
            min,
            max,
            intrinsic_min,
            intrinsic_max,
            periodic,
            bounded,
        })
    }

    /// Interval which is mapped onto itself
    pub fn identity(min: f64, max: f64, periodic: bool, bounded: bool) -> Result<Self, BasisError> {
        Self::new(min, max, min, max, periodic, bounded)
    }

    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    #[inline]
    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    pub fn mean(&self) -> f64 {
        0.5 * (self.min + self.max)
    }

    #[inline]
    pub fn intrinsic_min(&self) -> f64 {
        self.intrinsic_min
    }

    #[inline]
    pub fn intrinsic_max(&self) -> f64 {
        self.intrinsic_max
    }

    pub fn intrinsic_range(&self) -> f64 {
        self.intrinsic_max - self.intrinsic_min
    }

    #[inline]
    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    #[inline]
    pub fn is_bounded(&self) -> bool {
        self.bounded
    }

    /// Chain-rule factor $dx/ds$
    #[inline]
    pub fn deriv_factor(&self) -> f64 {
        self.intrinsic_range() / self.range()
    }

    /// Translate an argument into the intrinsic interval
    ///
    /// Returns the translated argument and whether the argument lies inside the working interval.
    /// Arguments outside of a bounded interval are clamped to its edge.
    pub fn translate(&self, arg: f64) -> (f64, bool) {
        let arg_t = self.intrinsic_min + (arg - self.min) * self.deriv_factor();
        if !self.bounded || (arg >= self.min && arg <= self.max) {
            (arg_t, true)
        } else {
            (arg_t.clamp(self.intrinsic_min, self.intrinsic_max), false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn translate_inside() {
        let interval = BasisInterval::new(2.0, 6.0, -1.0, 1.0, false, true).unwrap();
        assert_relative_eq!(interval.deriv_factor(), 0.5);
        let (x, inside) = interval.translate(5.0);
        assert!(inside);
        assert_relative_eq!(x, 0.5);
        let (x, inside) = interval.translate(6.0);
        assert!(inside);
        assert_relative_eq!(x, 1.0);
    }

    #[test]
    fn translate_outside_is_clamped() {
        let interval = BasisInterval::new(2.0, 6.0, -1.0, 1.0, false, true).unwrap();
        let (x, inside) = interval.translate(7.0);
        assert!(!inside);
        assert_relative_eq!(x, 1.0);
        let (x, inside) = interval.translate(-3.0);
        assert!(!inside);
        assert_relative_eq!(x, -1.0);
    }

    #[test]
    fn unbounded_extrapolates() {
        let interval = BasisInterval::new(2.0, 6.0, -1.0, 1.0, false, false).unwrap();
        let (x, inside) = interval.translate(10.0);
        assert!(inside);
        assert_relative_eq!(x, 3.0);
    }

    #[test]
    fn invalid() {
        assert_eq!(
            BasisInterval::identity(1.0, 1.0, false, true),
            Err(BasisError::InvalidInterval { min: 1.0, max: 1.0 })
        );
        assert!(BasisInterval::identity(f64::NAN, 1.0, false, true).is_err());
    }
}
