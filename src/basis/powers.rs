use crate::basis::basis_functions::{BasisFunctionsTrait, basis_parameters_conversion};
use crate::basis::interval::BasisInterval;
use crate::error::BasisError;

use macro_const::macro_const;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

macro_const! {
    const DOC: &str = r"
Polynomial powers $1, s, s^2, \dots, s^n$

The argument is used as is, the working interval only bounds it. The basis is poorly
conditioned for high orders, orthogonal polynomials should be preferred.

- Keyword: `BF_POWERS`
- Number of functions: order + 1
";
}

#[doc = DOC!()]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(
    try_from = "crate::basis::BasisParameters",
    into = "crate::basis::BasisParameters"
)]
pub struct PowersBasis {
    order: usize,
    interval: BasisInterval,
    uniform_integrals: Vec<f64>,
}

impl PowersBasis {
    pub const KEYWORD: &'static str = "BF_POWERS";

    pub fn new(order: usize, min: f64, max: f64) -> Result<Self, BasisError> {
        let interval = BasisInterval::identity(min, max, false, true)?;
        let uniform_integrals = (0..=order as i32)
            .map(|n| {
                (max.powi(n + 1) - min.powi(n + 1)) / (f64::from(n + 1) * interval.range())
            })
            .collect();
        Ok(Self {
            order,
            interval,
            uniform_integrals,
        })
    }
}

basis_parameters_conversion!(PowersBasis);

impl BasisFunctionsTrait for PowersBasis {
    fn keyword(&self) -> &'static str {
        Self::KEYWORD
    }

    fn kind(&self) -> &'static str {
        "powers"
    }

    fn description(&self) -> &'static str {
        DOC
    }

    fn order(&self) -> usize {
        self.order
    }

    fn size(&self) -> usize {
        self.order + 1
    }

    fn interval(&self) -> &BasisInterval {
        &self.interval
    }

    fn labels(&self) -> Vec<String> {
        std::iter::once("1".to_owned())
            .chain((1..=self.order).map(|n| format!("s^{n}")))
            .collect()
    }

    fn uniform_integrals(&self) -> &[f64] {
        &self.uniform_integrals
    }

    fn eval_translated(&self, x: f64, values: &mut [f64], derivs: &mut [f64]) {
        values[0] = 1.0;
        derivs[0] = 0.0;
        for n in 1..=self.order {
            values[n] = values[n - 1] * x;
            derivs[n] = n as f64 * values[n - 1];
        }
    }
}
