use crate::error::OptimizerError;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Step size of the coefficient updates
///
/// The schedule depends on the iteration counter only, so all replicas use the same value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub enum StepSize {
    Fixed(f64),
    /// $\mu_n = \mu_0 / (1 + n / \tau)$
    Decaying { initial: f64, decay_constant: f64 },
}

impl StepSize {
    pub fn validate(&self) -> Result<(), OptimizerError> {
        let positive = |x: f64| x.is_finite() && x > 0.0;
        match *self {
            Self::Fixed(mu) if !positive(mu) => {
                Err(OptimizerError::InvalidSetting("step size must be positive"))
            }
            Self::Decaying { initial, .. } if !positive(initial) => {
                Err(OptimizerError::InvalidSetting("initial step size must be positive"))
            }
            Self::Decaying { decay_constant, .. } if !positive(decay_constant) => Err(
                OptimizerError::InvalidSetting("step size decay constant must be positive"),
            ),
            _ => Ok(()),
        }
    }

    /// Step size for the update following `iteration` completed ones
    pub fn at(&self, iteration: u64) -> f64 {
        match *self {
            Self::Fixed(mu) => mu,
            Self::Decaying {
                initial,
                decay_constant,
            } => initial / (1.0 + iteration as f64 / decay_constant),
        }
    }
}
