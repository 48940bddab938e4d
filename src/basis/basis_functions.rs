use crate::basis::chebyshev::ChebyshevBasis;
use crate::basis::interval::BasisInterval;
use crate::basis::legendre::LegendreBasis;
use crate::basis::powers::PowersBasis;
use crate::basis::trigonometric::{CosineBasis, FourierBasis, SineBasis};
use crate::error::{BasisError, TargetDistError};
use crate::target::{TargetDistribution, TargetDistributionTrait};

use enum_dispatch::enum_dispatch;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Number of trapezoid bins used for numerical integrals over a basis interval
pub const DEFAULT_INTEGRATION_BINS: usize = 1000;

/// Translated argument and whether the raw argument was inside the working interval
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BasisPoint {
    pub arg_t: f64,
    pub inside: bool,
}

/// Owned result of [BasisFunctionsTrait::evaluate]
#[derive(Clone, Debug, PartialEq)]
pub struct BasisValues {
    pub arg_t: f64,
    pub inside: bool,
    pub values: Vec<f64>,
    pub derivs: Vec<f64>,
}

#[enum_dispatch]
pub trait BasisFunctionsTrait: Clone + Debug + Serialize + DeserializeOwned {
    /// Keyword the family is registered with
    fn keyword(&self) -> &'static str;

    /// Type string written to coefficient files
    fn kind(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn order(&self) -> usize;

    /// Number of basis functions
    fn size(&self) -> usize;

    fn interval(&self) -> &BasisInterval;

    /// Human-readable label of every basis function, `s` denotes the argument
    fn labels(&self) -> Vec<String>;

    /// Averages of every basis function over the working interval under a uniform weight
    fn uniform_integrals(&self) -> &[f64];

    /// Evaluate values and derivatives with respect to the translated argument
    ///
    /// Both slices must have length [size()](BasisFunctionsTrait::size).
    fn eval_translated(&self, arg_t: f64, values: &mut [f64], derivs: &mut [f64]);

    /// Evaluate all basis functions and their derivatives with respect to the raw argument
    ///
    /// Outside of a bounded interval values are computed at the clamped argument and all
    /// derivatives are zero.
    fn eval_all(&self, arg: f64, values: &mut [f64], derivs: &mut [f64]) -> BasisPoint {
        debug_assert_eq!(values.len(), self.size());
        debug_assert_eq!(derivs.len(), self.size());
        let interval = self.interval();
        let (arg_t, inside) = interval.translate(arg);
        self.eval_translated(arg_t, values, derivs);
        if inside {
            let factor = interval.deriv_factor();
            derivs.iter_mut().for_each(|d| *d *= factor);
        } else {
            derivs.fill(0.0);
        }
        BasisPoint { arg_t, inside }
    }

    fn evaluate(&self, arg: f64) -> BasisValues {
        let mut values = vec![0.0; self.size()];
        let mut derivs = vec![0.0; self.size()];
        let BasisPoint { arg_t, inside } = self.eval_all(arg, &mut values, &mut derivs);
        BasisValues {
            arg_t,
            inside,
            values,
            derivs,
        }
    }

    fn is_periodic(&self) -> bool {
        self.interval().is_periodic()
    }

    /// Trapezoid-rule version of [uniform_integrals()](BasisFunctionsTrait::uniform_integrals)
    fn numerical_uniform_integrals(&self, nbins: usize) -> Vec<f64> {
        let mut integrals = vec![0.0; self.size()];
        let mut values = vec![0.0; self.size()];
        let mut derivs = vec![0.0; self.size()];
        for (x, weight) in trapezoid_nodes(self.interval(), nbins) {
            self.eval_all(x, &mut values, &mut derivs);
            for (integral, value) in integrals.iter_mut().zip(values.iter()) {
                *integral += weight * value;
            }
        }
        let range = self.interval().range();
        integrals.iter_mut().for_each(|integral| *integral /= range);
        integrals
    }

    /// Averages of every basis function under a one-dimensional target distribution
    ///
    /// The density is renormalized over the working interval.
    fn target_distribution_integrals(
        &self,
        target: &TargetDistribution,
        nbins: usize,
    ) -> Result<Vec<f64>, TargetDistError> {
        if let Some(dim) = target.dimension() {
            if dim != 1 {
                return Err(TargetDistError::DimensionMismatch {
                    expected: dim,
                    actual: 1,
                });
            }
        }
        let mut integrals = vec![0.0; self.size()];
        let mut values = vec![0.0; self.size()];
        let mut derivs = vec![0.0; self.size()];
        let mut norm = 0.0;
        for (x, weight) in trapezoid_nodes(self.interval(), nbins) {
            let density = target.density(&[x]);
            if density < 0.0 {
                return Err(TargetDistError::NegativeDensity {
                    value: density,
                    point: vec![x],
                });
            }
            let weight = weight * density;
            norm += weight;
            self.eval_all(x, &mut values, &mut derivs);
            for (integral, value) in integrals.iter_mut().zip(values.iter()) {
                *integral += weight * value;
            }
        }
        if !(norm.is_finite() && norm > 0.0) {
            return Err(TargetDistError::Degenerate(
                "target density integrates to zero over the basis interval",
            ));
        }
        integrals.iter_mut().for_each(|integral| *integral /= norm);
        Ok(integrals)
    }
}

fn trapezoid_nodes(interval: &BasisInterval, nbins: usize) -> impl Iterator<Item = (f64, f64)> {
    let nbins = nbins.max(1);
    let step = interval.range() / nbins as f64;
    let min = interval.min();
    (0..=nbins).map(move |i| {
        let weight = if i == 0 || i == nbins {
            0.5 * step
        } else {
            step
        };
        (min + step * i as f64, weight)
    })
}

/// One-dimensional basis-function set
#[enum_dispatch(BasisFunctionsTrait)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[non_exhaustive]
pub enum BasisFunctions {
    Chebyshev(ChebyshevBasis),
    Legendre(LegendreBasis),
    Fourier(FourierBasis),
    Cosine(CosineBasis),
    Sine(SineBasis),
    Powers(PowersBasis),
}

impl BasisFunctions {
    pub fn chebyshev(order: usize, min: f64, max: f64) -> Result<Self, BasisError> {
        Ok(ChebyshevBasis::new(order, min, max)?.into())
    }

    pub fn legendre(order: usize, min: f64, max: f64) -> Result<Self, BasisError> {
        Ok(LegendreBasis::new(order, min, max)?.into())
    }

    pub fn fourier(order: usize, min: f64, max: f64) -> Result<Self, BasisError> {
        Ok(FourierBasis::new(order, min, max)?.into())
    }

    pub fn cosine(order: usize, min: f64, max: f64) -> Result<Self, BasisError> {
        Ok(CosineBasis::new(order, min, max)?.into())
    }

    pub fn sine(order: usize, min: f64, max: f64) -> Result<Self, BasisError> {
        Ok(SineBasis::new(order, min, max)?.into())
    }

    pub fn powers(order: usize, min: f64, max: f64) -> Result<Self, BasisError> {
        Ok(PowersBasis::new(order, min, max)?.into())
    }
}

/// Serialized form shared by all basis-function families
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BasisParameters {
    pub order: usize,
    pub interval_min: f64,
    pub interval_max: f64,
}

/// Implement conversions between a family and [BasisParameters]
///
/// The family must have `order` and `interval` fields and a `new(order, min, max)` constructor.
macro_rules! basis_parameters_conversion {
    ($family: ty) => {
        impl From<$family> for $crate::basis::BasisParameters {
            fn from(f: $family) -> Self {
                Self {
                    order: f.order,
                    interval_min: f.interval.min(),
                    interval_max: f.interval.max(),
                }
            }
        }

        impl TryFrom<$crate::basis::BasisParameters> for $family {
            type Error = $crate::error::BasisError;

            fn try_from(p: $crate::basis::BasisParameters) -> Result<Self, Self::Error> {
                Self::new(p.order, p.interval_min, p.interval_max)
            }
        }
    };
}
pub(crate) use basis_parameters_conversion;
