use crate::error::TargetDistError;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Smooth upper limit of the bias potential
///
/// The reported bias is switched to the cutoff value with a Fermi function of
/// $x = V_c - V$,
/// $$
/// f(x) = \frac{1}{1 + e^{\min(\lambda x,\, x_\mathrm{max})}}, \qquad V' = V + x f(x),
/// $$
/// so $V' \approx V$ well below the cutoff and $V' \approx V_c$ above it. The target distribution
/// is multiplied by $1 - f$, which removes regions where the bias already exceeds the cutoff.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "BiasCutoffParameters", into = "BiasCutoffParameters")]
pub struct BiasCutoff {
    value: f64,
    fermi_lambda: f64,
    fermi_exp_max: f64,
}

impl BiasCutoff {
    pub const DEFAULT_FERMI_LAMBDA: f64 = 10.0;
    pub const DEFAULT_FERMI_EXP_MAX: f64 = 100.0;

    pub fn new(value: f64, fermi_lambda: f64, fermi_exp_max: f64) -> Result<Self, TargetDistError> {
        if !(value.is_finite() && value > 0.0) {
            return Err(TargetDistError::InvalidParameter(
                "bias cutoff must be positive",
            ));
        }
        if !(fermi_lambda.is_finite() && fermi_lambda > 0.0) {
            return Err(TargetDistError::InvalidParameter(
                "Fermi lambda must be positive",
            ));
        }
        if !(fermi_exp_max > 0.0) {
            return Err(TargetDistError::InvalidParameter(
                "Fermi exponent limit must be positive",
            ));
        }
        Ok(Self {
            value,
            fermi_lambda,
            fermi_exp_max,
        })
    }

    pub fn with_value(value: f64) -> Result<Self, TargetDistError> {
        Self::new(value, Self::DEFAULT_FERMI_LAMBDA, Self::DEFAULT_FERMI_EXP_MAX)
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn fermi_lambda(&self) -> f64 {
        self.fermi_lambda
    }

    /// Fermi function and its derivative
    fn fermi(&self, x: f64) -> (f64, f64) {
        let exponent = self.fermi_lambda * x;
        if exponent > self.fermi_exp_max {
            (1.0 / (1.0 + self.fermi_exp_max.exp()), 0.0)
        } else {
            let e = exponent.exp();
            let f = 1.0 / (1.0 + e);
            (f, -self.fermi_lambda * e * f * f)
        }
    }

    /// Switched bias and its derivative with respect to the raw bias
    ///
    /// Forces and coefficient derivatives of the raw bias must be multiplied by the returned
    /// factor.
    pub fn apply(&self, bias: f64) -> (f64, f64) {
        let x = self.value - bias;
        let (f, df) = self.fermi(x);
        (bias + x * f, 1.0 - f - x * df)
    }

    /// Factor the target density is multiplied with at a given raw bias
    pub fn target_factor(&self, bias: f64) -> f64 {
        let exponent = (self.fermi_lambda * (bias - self.value)).min(self.fermi_exp_max);
        1.0 / (1.0 + exponent.exp())
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename = "BiasCutoff")]
struct BiasCutoffParameters {
    value: f64,
    #[serde(default = "default_fermi_lambda")]
    fermi_lambda: f64,
    #[serde(default = "default_fermi_exp_max")]
    fermi_exp_max: f64,
}

fn default_fermi_lambda() -> f64 {
    BiasCutoff::DEFAULT_FERMI_LAMBDA
}

fn default_fermi_exp_max() -> f64 {
    BiasCutoff::DEFAULT_FERMI_EXP_MAX
}

impl From<BiasCutoff> for BiasCutoffParameters {
    fn from(f: BiasCutoff) -> Self {
        Self {
            value: f.value,
            fermi_lambda: f.fermi_lambda,
            fermi_exp_max: f.fermi_exp_max,
        }
    }
}

impl TryFrom<BiasCutoffParameters> for BiasCutoff {
    type Error = TargetDistError;

    fn try_from(p: BiasCutoffParameters) -> Result<Self, Self::Error> {
        Self::new(p.value, p.fermi_lambda, p.fermi_exp_max)
    }
}
