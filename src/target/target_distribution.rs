use crate::error::TargetDistError;
use crate::target::gaussian::{ExpModGaussianTarget, GaussianTarget};

use enum_dispatch::enum_dispatch;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

#[enum_dispatch]
pub trait TargetDistributionTrait: Clone + Debug + Serialize + DeserializeOwned {
    /// Number of arguments the distribution is defined for, `None` if it fits any number
    fn dimension(&self) -> Option<usize>;

    /// Probability density at a point, not necessarily normalized
    fn density(&self, point: &[f64]) -> f64;

    /// Whether the density integrates to one over the whole space
    fn is_normalized(&self) -> bool;

    fn check_dimension(&self, ndim: usize) -> Result<(), TargetDistError> {
        match self.dimension() {
            Some(expected) if expected != ndim => Err(TargetDistError::DimensionMismatch {
                expected,
                actual: ndim,
            }),
            _ => Ok(()),
        }
    }
}

/// Static target distribution of the collective variables
///
/// Densities are evaluated on grids spanning the basis intervals and renormalized there, so
/// distributions do not need to be normalized.
#[enum_dispatch(TargetDistributionTrait)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[non_exhaustive]
pub enum TargetDistribution {
    Uniform(UniformTarget),
    Gaussian(GaussianTarget),
    ExponentiallyModifiedGaussian(ExpModGaussianTarget),
    LinearCombination(LinearCombinationTarget),
    ProductCombination(ProductCombinationTarget),
}

impl TargetDistribution {
    /// Uniform distribution over the whole grid
    pub fn uniform() -> Self {
        UniformTarget::default().into()
    }

    /// Uniform distribution over `[minima, maxima]` with Gaussian-decaying edges
    pub fn uniform_with_edges(
        minima: &[f64],
        maxima: &[f64],
        sigma_minima: &[f64],
        sigma_maxima: &[f64],
    ) -> Result<Self, TargetDistError> {
        Ok(UniformTarget::new(
            Some(minima.to_vec()),
            Some(maxima.to_vec()),
            sigma_minima.to_vec(),
            sigma_maxima.to_vec(),
        )?
        .into())
    }

    /// Weighted sum of uncorrelated Gaussians
    pub fn gaussian(
        centers: &[Vec<f64>],
        sigmas: &[Vec<f64>],
        weights: &[f64],
    ) -> Result<Self, TargetDistError> {
        Ok(GaussianTarget::new(centers, sigmas, &[], weights)?.into())
    }

    /// Weighted sum of two-dimensional Gaussians with correlations
    pub fn correlated_gaussian(
        centers: &[Vec<f64>],
        sigmas: &[Vec<f64>],
        correlations: &[f64],
        weights: &[f64],
    ) -> Result<Self, TargetDistError> {
        Ok(GaussianTarget::new(centers, sigmas, correlations, weights)?.into())
    }

    /// Weighted sum of exponentially modified Gaussians
    pub fn exp_mod_gaussian(
        centers: &[Vec<f64>],
        sigmas: &[Vec<f64>],
        lambdas: &[Vec<f64>],
        weights: &[f64],
    ) -> Result<Self, TargetDistError> {
        Ok(ExpModGaussianTarget::new(centers, sigmas, lambdas, weights)?.into())
    }

    pub fn linear_combination(
        weight_distribution_pairs: &[(f64, TargetDistribution)],
    ) -> Result<Self, TargetDistError> {
        Ok(LinearCombinationTarget::new(weight_distribution_pairs)?.into())
    }

    pub fn product_combination(
        distributions: &[TargetDistribution],
    ) -> Result<Self, TargetDistError> {
        Ok(ProductCombinationTarget::new(distributions)?.into())
    }
}

/// Common dimension of several distributions
fn common_dimension<'a>(
    distributions: impl IntoIterator<Item = &'a TargetDistribution>,
) -> Result<Option<usize>, TargetDistError> {
    let mut common = None;
    for dim in distributions.into_iter().filter_map(|d| d.dimension()) {
        match common {
            None => common = Some(dim),
            Some(expected) if expected != dim => {
                return Err(TargetDistError::DimensionMismatch {
                    expected,
                    actual: dim,
                });
            }
            Some(_) => {}
        }
    }
    Ok(common)
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "UniformTargetParameters", into = "UniformTargetParameters")]
pub struct UniformTarget {
    minima: Option<Vec<f64>>,
    maxima: Option<Vec<f64>>,
    sigma_minima: Vec<f64>,
    sigma_maxima: Vec<f64>,
}

impl UniformTarget {
    /// Zero sigmas, or empty sigma vectors, give hard edges
    pub fn new(
        minima: Option<Vec<f64>>,
        maxima: Option<Vec<f64>>,
        sigma_minima: Vec<f64>,
        sigma_maxima: Vec<f64>,
    ) -> Result<Self, TargetDistError> {
        let sigma_minima = Self::sigmas(minima.as_deref(), sigma_minima)?;
        let sigma_maxima = Self::sigmas(maxima.as_deref(), sigma_maxima)?;
        if let (Some(min), Some(max)) = (&minima, &maxima) {
            if min.len() != max.len() {
                return Err(TargetDistError::DimensionMismatch {
                    expected: min.len(),
                    actual: max.len(),
                });
            }
            if min.iter().zip(max.iter()).any(|(a, b)| !(a < b)) {
                return Err(TargetDistError::InvalidParameter(
                    "uniform minima must be less than maxima",
                ));
            }
        }
        Ok(Self {
            minima,
            maxima,
            sigma_minima,
            sigma_maxima,
        })
    }

    fn sigmas(bounds: Option<&[f64]>, sigmas: Vec<f64>) -> Result<Vec<f64>, TargetDistError> {
        let Some(bounds) = bounds else {
            return Ok(vec![]);
        };
        if bounds.iter().any(|x| !x.is_finite()) {
            return Err(TargetDistError::InvalidParameter(
                "uniform bounds must be finite",
            ));
        }
        let sigmas = if sigmas.is_empty() {
            vec![0.0; bounds.len()]
        } else {
            sigmas
        };
        if sigmas.len() != bounds.len() {
            return Err(TargetDistError::DimensionMismatch {
                expected: bounds.len(),
                actual: sigmas.len(),
            });
        }
        if sigmas.iter().any(|&s| !(s >= 0.0 && s.is_finite())) {
            return Err(TargetDistError::InvalidParameter(
                "uniform edge sigmas must be non-negative",
            ));
        }
        Ok(sigmas)
    }
}

fn edge_factor(distance: f64, sigma: f64) -> f64 {
    if sigma > 0.0 {
        let z = distance / sigma;
        f64::exp(-0.5 * z * z)
    } else {
        0.0
    }
}

impl TargetDistributionTrait for UniformTarget {
    fn dimension(&self) -> Option<usize> {
        self.minima
            .as_ref()
            .or(self.maxima.as_ref())
            .map(|bounds| bounds.len())
    }

    fn density(&self, point: &[f64]) -> f64 {
        let mut value = 1.0;
        if let Some(minima) = &self.minima {
            for ((&x, &min), &sigma) in point.iter().zip(minima).zip(&self.sigma_minima) {
                if x < min {
                    value *= edge_factor(min - x, sigma);
                }
            }
        }
        if let Some(maxima) = &self.maxima {
            for ((&x, &max), &sigma) in point.iter().zip(maxima).zip(&self.sigma_maxima) {
                if x > max {
                    value *= edge_factor(x - max, sigma);
                }
            }
        }
        value
    }

    fn is_normalized(&self) -> bool {
        false
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename = "UniformTarget")]
struct UniformTargetParameters {
    #[serde(default)]
    minima: Option<Vec<f64>>,
    #[serde(default)]
    maxima: Option<Vec<f64>>,
    #[serde(default)]
    sigma_minima: Vec<f64>,
    #[serde(default)]
    sigma_maxima: Vec<f64>,
}

impl From<UniformTarget> for UniformTargetParameters {
    fn from(f: UniformTarget) -> Self {
        Self {
            minima: f.minima,
            maxima: f.maxima,
            sigma_minima: f.sigma_minima,
            sigma_maxima: f.sigma_maxima,
        }
    }
}

impl TryFrom<UniformTargetParameters> for UniformTarget {
    type Error = TargetDistError;

    fn try_from(p: UniformTargetParameters) -> Result<Self, Self::Error> {
        Self::new(p.minima, p.maxima, p.sigma_minima, p.sigma_maxima)
    }
}

/// Weighted sum of distributions, weights are normalized to unit sum
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(
    try_from = "LinearCombinationTargetParameters",
    into = "LinearCombinationTargetParameters"
)]
pub struct LinearCombinationTarget {
    dimension: Option<usize>,
    weights: Vec<f64>,
    distributions: Vec<TargetDistribution>,
}

impl LinearCombinationTarget {
    pub fn new(
        weight_distribution_pairs: &[(f64, TargetDistribution)],
    ) -> Result<Self, TargetDistError> {
        if weight_distribution_pairs.is_empty() {
            return Err(TargetDistError::InvalidParameter(
                "linear combination requires at least one distribution",
            ));
        }
        if weight_distribution_pairs
            .iter()
            .any(|(w, _)| !(*w >= 0.0 && w.is_finite()))
        {
            return Err(TargetDistError::InvalidParameter(
                "linear combination weights must be non-negative",
            ));
        }
        let total: f64 = weight_distribution_pairs.iter().map(|(w, _)| *w).sum();
        if total <= 0.0 {
            return Err(TargetDistError::Degenerate(
                "linear combination weights sum to zero",
            ));
        }
        let dimension = common_dimension(weight_distribution_pairs.iter().map(|(_, d)| d))?;
        Ok(Self {
            dimension,
            weights: weight_distribution_pairs
                .iter()
                .map(|(w, _)| w / total)
                .collect(),
            distributions: weight_distribution_pairs
                .iter()
                .map(|(_, d)| d.clone())
                .collect(),
        })
    }
}

impl TargetDistributionTrait for LinearCombinationTarget {
    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn density(&self, point: &[f64]) -> f64 {
        self.weights
            .iter()
            .zip(self.distributions.iter())
            .map(|(w, d)| w * d.density(point))
            .sum()
    }

    fn is_normalized(&self) -> bool {
        self.distributions.iter().all(|d| d.is_normalized())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename = "LinearCombinationTarget")]
struct LinearCombinationTargetParameters {
    weights: Vec<f64>,
    distributions: Vec<TargetDistribution>,
}

impl From<LinearCombinationTarget> for LinearCombinationTargetParameters {
    fn from(f: LinearCombinationTarget) -> Self {
        Self {
            weights: f.weights,
            distributions: f.distributions,
        }
    }
}

impl TryFrom<LinearCombinationTargetParameters> for LinearCombinationTarget {
    type Error = TargetDistError;

    fn try_from(p: LinearCombinationTargetParameters) -> Result<Self, Self::Error> {
        if p.weights.len() != p.distributions.len() {
            return Err(TargetDistError::DimensionMismatch {
                expected: p.distributions.len(),
                actual: p.weights.len(),
            });
        }
        let pairs: Vec<_> = p.weights.into_iter().zip(p.distributions).collect();
        Self::new(&pairs)
    }
}

/// Point-wise product of distributions in the full argument space
///
/// The product is not normalized, it is renormalized on the grid like any other density.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(
    try_from = "ProductCombinationTargetParameters",
    into = "ProductCombinationTargetParameters"
)]
pub struct ProductCombinationTarget {
    dimension: Option<usize>,
    distributions: Vec<TargetDistribution>,
}

impl ProductCombinationTarget {
    pub fn new(distributions: &[TargetDistribution]) -> Result<Self, TargetDistError> {
        if distributions.is_empty() {
            return Err(TargetDistError::InvalidParameter(
                "product combination requires at least one distribution",
            ));
        }
        Ok(Self {
            dimension: common_dimension(distributions)?,
            distributions: distributions.to_vec(),
        })
    }
}

impl TargetDistributionTrait for ProductCombinationTarget {
    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn density(&self, point: &[f64]) -> f64 {
        self.distributions.iter().map(|d| d.density(point)).product()
    }

    fn is_normalized(&self) -> bool {
        false
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename = "ProductCombinationTarget")]
struct ProductCombinationTargetParameters {
    distributions: Vec<TargetDistribution>,
}

impl From<ProductCombinationTarget> for ProductCombinationTargetParameters {
    fn from(f: ProductCombinationTarget) -> Self {
        Self {
            distributions: f.distributions,
        }
    }
}

impl TryFrom<ProductCombinationTargetParameters> for ProductCombinationTarget {
    type Error = TargetDistError;

    fn try_from(p: ProductCombinationTargetParameters) -> Result<Self, Self::Error> {
        Self::new(&p.distributions)
    }
}
