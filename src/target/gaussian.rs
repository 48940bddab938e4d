use crate::error::TargetDistError;
use crate::lnerfc::ln_erfc;
use crate::target::target_distribution::TargetDistributionTrait;

use macro_const::macro_const;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, SQRT_2};

/// Validate kernel parameter sets and return their common dimension
fn kernel_dimension(
    centers: &[Vec<f64>],
    others: &[(&[Vec<f64>], &'static str)],
) -> Result<usize, TargetDistError> {
    let first = centers.first().ok_or(TargetDistError::InvalidParameter(
        "at least one center is required",
    ))?;
    let dim = first.len();
    if dim == 0 {
        return Err(TargetDistError::InvalidParameter(
            "centers must have at least one component",
        ));
    }
    for center in centers.iter() {
        if center.len() != dim {
            return Err(TargetDistError::DimensionMismatch {
                expected: dim,
                actual: center.len(),
            });
        }
    }
    for &(params, message) in others.iter() {
        if params.len() != centers.len() {
            return Err(TargetDistError::InvalidParameter(message));
        }
        for p in params.iter() {
            if p.len() != dim {
                return Err(TargetDistError::DimensionMismatch {
                    expected: dim,
                    actual: p.len(),
                });
            }
            if p.iter().any(|&x| !(x > 0.0 && x.is_finite())) {
                return Err(TargetDistError::InvalidParameter(message));
            }
        }
    }
    Ok(dim)
}

/// Weights normalized to unit sum, equal weights if none are given
fn normalized_weights(weights: &[f64], n: usize) -> Result<Vec<f64>, TargetDistError> {
    if weights.is_empty() {
        return Ok(vec![1.0 / n as f64; n]);
    }
    if weights.len() != n {
        return Err(TargetDistError::InvalidParameter(
            "there must be one weight per kernel",
        ));
    }
    if weights.iter().any(|&w| !(w >= 0.0 && w.is_finite())) {
        return Err(TargetDistError::InvalidParameter(
            "weights must be non-negative",
        ));
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(TargetDistError::Degenerate("weights sum to zero"));
    }
    Ok(weights.iter().map(|w| w / total).collect())
}

macro_const! {
    const GAUSSIAN_DOC: &str = r"
Weighted sum of normalized Gaussian kernels

$$
p(\mathbf{s}) = \sum_i w_i \prod_k \frac{1}{\sqrt{2\pi}\sigma_{ik}}
    \exp\left(-\frac{(s_k - \mu_{ik})^2}{2\sigma_{ik}^2}\right).
$$

Two-dimensional kernels may have a correlation $\rho_i$, $|\rho_i| < 1$, in this case the
kernel is the bivariate normal distribution. Weights are normalized to unit sum.
";
}

#[doc = GAUSSIAN_DOC!()]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "GaussianTargetParameters", into = "GaussianTargetParameters")]
pub struct GaussianTarget {
    centers: Vec<Vec<f64>>,
    sigmas: Vec<Vec<f64>>,
    correlations: Vec<f64>,
    weights: Vec<f64>,
}

impl GaussianTarget {
    /// Empty `correlations` or `weights` mean uncorrelated and equally weighted kernels
    pub fn new(
        centers: &[Vec<f64>],
        sigmas: &[Vec<f64>],
        correlations: &[f64],
        weights: &[f64],
    ) -> Result<Self, TargetDistError> {
        let dim = kernel_dimension(centers, &[(sigmas, "sigmas must be positive, one per center")])?;
        let correlations = if correlations.is_empty() {
            vec![0.0; centers.len()]
        } else {
            correlations.to_vec()
        };
        if correlations.len() != centers.len() {
            return Err(TargetDistError::InvalidParameter(
                "there must be one correlation per center",
            ));
        }
        if correlations.iter().any(|&rho| rho != 0.0) {
            if dim != 2 {
                return Err(TargetDistError::InvalidParameter(
                    "correlations are only supported for two-dimensional kernels",
                ));
            }
            if correlations.iter().any(|rho| !(rho.abs() < 1.0)) {
                return Err(TargetDistError::Degenerate(
                    "correlation must be strictly between -1 and 1",
                ));
            }
        }
        Ok(Self {
            centers: centers.to_vec(),
            sigmas: sigmas.to_vec(),
            correlations,
            weights: normalized_weights(weights, centers.len())?,
        })
    }

    fn diagonal(point: &[f64], center: &[f64], sigma: &[f64]) -> f64 {
        point
            .iter()
            .zip(center.iter())
            .zip(sigma.iter())
            .map(|((&x, &mu), &sigma)| {
                let z = (x - mu) / sigma;
                f64::exp(-0.5 * z * z) / (sigma * (2.0 * PI).sqrt())
            })
            .product()
    }

    fn bivariate(point: &[f64], center: &[f64], sigma: &[f64], rho: f64) -> f64 {
        let z1 = (point[0] - center[0]) / sigma[0];
        let z2 = (point[1] - center[1]) / sigma[1];
        let one_minus_rho2 = 1.0 - rho * rho;
        let exponent = -(z1 * z1 + z2 * z2 - 2.0 * rho * z1 * z2) / (2.0 * one_minus_rho2);
        f64::exp(exponent) / (2.0 * PI * sigma[0] * sigma[1] * one_minus_rho2.sqrt())
    }
}

impl TargetDistributionTrait for GaussianTarget {
    fn dimension(&self) -> Option<usize> {
        self.centers.first().map(Vec::len)
    }

    fn density(&self, point: &[f64]) -> f64 {
        itertools::izip!(&self.weights, &self.centers, &self.sigmas, &self.correlations)
            .map(|(w, center, sigma, &rho)| {
                let kernel = if rho != 0.0 && point.len() == 2 {
                    Self::bivariate(point, center, sigma, rho)
                } else {
                    Self::diagonal(point, center, sigma)
                };
                w * kernel
            })
            .sum()
    }

    fn is_normalized(&self) -> bool {
        true
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename = "GaussianTarget")]
struct GaussianTargetParameters {
    centers: Vec<Vec<f64>>,
    sigmas: Vec<Vec<f64>>,
    #[serde(default)]
    correlations: Vec<f64>,
    #[serde(default)]
    weights: Vec<f64>,
}

impl From<GaussianTarget> for GaussianTargetParameters {
    fn from(f: GaussianTarget) -> Self {
        Self {
            centers: f.centers,
            sigmas: f.sigmas,
            correlations: f.correlations,
            weights: f.weights,
        }
    }
}

impl TryFrom<GaussianTargetParameters> for GaussianTarget {
    type Error = TargetDistError;

    fn try_from(p: GaussianTargetParameters) -> Result<Self, Self::Error> {
        Self::new(&p.centers, &p.sigmas, &p.correlations, &p.weights)
    }
}

macro_const! {
    const EMG_DOC: &str = r"
Weighted sum of exponentially modified Gaussian kernels

Every kernel is a product over dimensions of
$$
\frac{\lambda}{2} \exp\left(\frac{\lambda}{2}\left(2\mu + \lambda\sigma^2 - 2s\right)\right)
    \mathrm{erfc}\left(\frac{\mu + \lambda\sigma^2 - s}{\sqrt{2}\sigma}\right),
$$
the distribution of a normal variable plus an exponentially distributed one, it has a long
tail towards larger $s$. Sigmas and lambdas must be positive.
";
}

#[doc = EMG_DOC!()]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "ExpModGaussianTargetParameters", into = "ExpModGaussianTargetParameters")]
pub struct ExpModGaussianTarget {
    centers: Vec<Vec<f64>>,
    sigmas: Vec<Vec<f64>>,
    lambdas: Vec<Vec<f64>>,
    weights: Vec<f64>,
}

impl ExpModGaussianTarget {
    pub fn new(
        centers: &[Vec<f64>],
        sigmas: &[Vec<f64>],
        lambdas: &[Vec<f64>],
        weights: &[f64],
    ) -> Result<Self, TargetDistError> {
        kernel_dimension(
            centers,
            &[
                (sigmas, "sigmas must be positive, one per center"),
                (lambdas, "lambdas must be positive, one per center"),
            ],
        )?;
        Ok(Self {
            centers: centers.to_vec(),
            sigmas: sigmas.to_vec(),
            lambdas: lambdas.to_vec(),
            weights: normalized_weights(weights, centers.len())?,
        })
    }

    fn kernel(point: &[f64], center: &[f64], sigma: &[f64], lambda: &[f64]) -> f64 {
        itertools::izip!(point, center, sigma, lambda)
            .map(|(&s, &mu, &sigma, &lambda)| {
                let lambda_sigma2 = lambda * sigma * sigma;
                let exponent = 0.5 * lambda * (2.0 * mu + lambda_sigma2 - 2.0 * s);
                let erfc_arg = (mu + lambda_sigma2 - s) / (SQRT_2 * sigma);
                0.5 * lambda * f64::exp(exponent + ln_erfc(erfc_arg))
            })
            .product()
    }
}

impl TargetDistributionTrait for ExpModGaussianTarget {
    fn dimension(&self) -> Option<usize> {
        self.centers.first().map(Vec::len)
    }

    fn density(&self, point: &[f64]) -> f64 {
        itertools::izip!(&self.weights, &self.centers, &self.sigmas, &self.lambdas)
            .map(|(w, center, sigma, lambda)| w * Self::kernel(point, center, sigma, lambda))
            .sum()
    }

    fn is_normalized(&self) -> bool {
        true
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename = "ExpModGaussianTarget")]
struct ExpModGaussianTargetParameters {
    centers: Vec<Vec<f64>>,
    sigmas: Vec<Vec<f64>>,
    lambdas: Vec<Vec<f64>>,
    #[serde(default)]
    weights: Vec<f64>,
}

impl From<ExpModGaussianTarget> for ExpModGaussianTargetParameters {
    fn from(f: ExpModGaussianTarget) -> Self {
        Self {
            centers: f.centers,
            sigmas: f.sigmas,
            lambdas: f.lambdas,
            weights: f.weights,
        }
    }
}

impl TryFrom<ExpModGaussianTargetParameters> for ExpModGaussianTarget {
    type Error = TargetDistError;

    fn try_from(p: ExpModGaussianTargetParameters) -> Result<Self, Self::Error> {
        Self::new(&p.centers, &p.sigmas, &p.lambdas, &p.weights)
    }
}
