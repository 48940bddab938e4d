use crate::coeffs::{CoeffsMatrix, CoeffsVector};
use crate::error::OptimizerError;

use enum_dispatch::enum_dispatch;
use ndarray::{Array1, ArrayView1, Zip};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Statistics of one update, already averaged over replicas
#[derive(Clone, Copy, Debug)]
pub struct UpdateStep<'a> {
    /// Number of updates applied before this one
    pub iteration: u64,
    pub step_size: f64,
    pub gradient: &'a CoeffsVector,
    pub hessian: Option<&'a CoeffsMatrix>,
}

#[enum_dispatch]
pub trait UpdateRuleTrait: Clone + Debug {
    fn name(&self) -> &'static str;

    fn requires_hessian(&self) -> bool {
        false
    }

    /// `false` if the rule never changes coefficients
    fn mutates(&self) -> bool {
        true
    }

    /// Apply an update to `coeffs` and the auxiliary tensor `aux` which the rule owns
    fn apply(
        &self,
        step: UpdateStep,
        coeffs: &mut CoeffsVector,
        aux: &mut CoeffsVector,
    ) -> Result<(), OptimizerError>;

    /// Coefficients averaged over the update trajectory
    fn averaged<'a>(&self, coeffs: &'a CoeffsVector, aux: &'a CoeffsVector) -> &'a CoeffsVector;
}

/// Rule which turns the accumulated statistics into a coefficient update
#[enum_dispatch(UpdateRuleTrait)]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[non_exhaustive]
pub enum UpdateRule {
    SteepestDescent(SteepestDescent),
    AveragedSgd(AveragedSgd),
    Fake(Fake),
}

impl UpdateRule {
    pub fn steepest_descent() -> Self {
        SteepestDescent {}.into()
    }

    pub fn averaged_sgd() -> Self {
        AveragedSgd {}.into()
    }

    pub fn fake() -> Self {
        Fake {}.into()
    }
}

impl Default for UpdateRule {
    fn default() -> Self {
        Self::steepest_descent()
    }
}

/// `delta` with inactive entries set to zero
fn masked(mut delta: Array1<f64>, active: &[bool]) -> Array1<f64> {
    Zip::from(&mut delta)
        .and(ArrayView1::from(active))
        .for_each(|x, &active| {
            if !active {
                *x = 0.0
            }
        });
    delta
}

fn running_mean_rate(iteration: u64) -> f64 {
    (iteration as f64 + 1.0).recip()
}

/// $c \leftarrow c - \mu g$, the auxiliary tensor is the running mean of the coefficients
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SteepestDescent {}

impl UpdateRuleTrait for SteepestDescent {
    fn name(&self) -> &'static str {
        "SteepestDescent"
    }

    fn apply(
        &self,
        step: UpdateStep,
        coeffs: &mut CoeffsVector,
        aux: &mut CoeffsVector,
    ) -> Result<(), OptimizerError> {
        coeffs.check_same_shape(step.gradient)?;
        let delta = masked(
            step.gradient.values() * (-step.step_size),
            coeffs.active_mask(),
        );
        *coeffs.values_mut() += &delta;
        aux.relax_towards(coeffs, running_mean_rate(step.iteration))?;
        Ok(())
    }

    fn averaged<'a>(&self, _coeffs: &'a CoeffsVector, aux: &'a CoeffsVector) -> &'a CoeffsVector {
        aux
    }
}

/// Averaged stochastic gradient descent of Bach and Moulines
///
/// The auxiliary tensor holds the instantaneous iterate
/// $a \leftarrow a - \mu \left(g + H (a - c)\right)$,
/// where the gradient $g$ is measured with the coefficients $c$, which are the running mean of
/// the iterates.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AveragedSgd {}

impl UpdateRuleTrait for AveragedSgd {
    fn name(&self) -> &'static str {
        "AveragedSgd"
    }

    fn requires_hessian(&self) -> bool {
        true
    }

    fn apply(
        &self,
        step: UpdateStep,
        coeffs: &mut CoeffsVector,
        aux: &mut CoeffsVector,
    ) -> Result<(), OptimizerError> {
        let hessian = step
            .hessian
            .ok_or(OptimizerError::HessianRequired(self.name()))?;
        coeffs.check_same_shape(step.gradient)?;
        let curvature = hessian.dot(&aux.sub(coeffs)?)?;
        let delta = masked(
            (step.gradient.values() + &curvature) * (-step.step_size),
            coeffs.active_mask(),
        );
        *aux.values_mut() += &delta;
        coeffs.relax_towards(aux, running_mean_rate(step.iteration))?;
        Ok(())
    }

    fn averaged<'a>(&self, coeffs: &'a CoeffsVector, _aux: &'a CoeffsVector) -> &'a CoeffsVector {
        coeffs
    }
}

/// Never changes coefficients, gradient and Hessian are still collected
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Fake {}

impl UpdateRuleTrait for Fake {
    fn name(&self) -> &'static str {
        "Fake"
    }

    fn mutates(&self) -> bool {
        false
    }

    fn apply(
        &self,
        _step: UpdateStep,
        _coeffs: &mut CoeffsVector,
        _aux: &mut CoeffsVector,
    ) -> Result<(), OptimizerError> {
        Ok(())
    }

    fn averaged<'a>(&self, coeffs: &'a CoeffsVector, _aux: &'a CoeffsVector) -> &'a CoeffsVector {
        coeffs
    }
}
