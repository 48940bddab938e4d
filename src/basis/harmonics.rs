//! Harmonics by angle-addition recurrence

/// Iterator over $(\sin kx, \cos kx)$ for $k = 0, 1, 2, \dots$
///
/// Each step rotates the previous pair by $x$, so only one `sin_cos` call is made per argument.
#[derive(Clone, Debug)]
pub struct Harmonics {
    rotation: (f64, f64),
    current: (f64, f64),
}

impl Harmonics {
    pub fn new(x: f64) -> Self {
        Self {
            rotation: x.sin_cos(),
            current: (0.0, 1.0),
        }
    }
}

impl Iterator for Harmonics {
    type Item = (f64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        let (sin, cos) = self.current;
        let (sin_x, cos_x) = self.rotation;
        self.current = (sin * cos_x + cos * sin_x, cos * cos_x - sin * sin_x);
        Some((sin, cos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    #[test]
    fn matches_direct_evaluation() {
        const N: usize = 1000;
        let x = 0.3;
        let (desired_sin, desired_cos): (Vec<_>, Vec<_>) =
            (0..N).map(|k| f64::sin_cos(x * (k as f64))).unzip();
        let (actual_sin, actual_cos): (Vec<_>, Vec<_>) = Harmonics::new(x).take(N).unzip();
        assert_abs_diff_eq!(&actual_sin[..], &desired_sin[..], epsilon = 1e-11);
        assert_abs_diff_eq!(&actual_cos[..], &desired_cos[..], epsilon = 1e-11);
    }

    #[test]
    fn first_is_constant() {
        let (sin, cos) = Harmonics::new(2.5).next().unwrap();
        assert_eq!(sin, 0.0);
        assert_eq!(cos, 1.0);
    }
}
