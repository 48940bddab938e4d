use crate::basis::basis_functions::{BasisFunctionsTrait, basis_parameters_conversion};
use crate::basis::interval::BasisInterval;
use crate::error::BasisError;

use macro_const::macro_const;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

macro_const! {
    const DOC: &str = r"
Legendre polynomials

$$
P_0(x) = 1,\quad P_1(x) = x,\quad (n + 1) P_{n+1}(x) = (2n + 1) x P_n(x) - n P_{n-1}(x),
$$
defined on $x \in [-1, 1]$. Only $P_0$ has a non-zero uniform average.

- Keyword: `BF_LEGENDRE`
- Number of functions: order + 1
";
}

#[doc = DOC!()]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(
    try_from = "crate::basis::BasisParameters",
    into = "crate::basis::BasisParameters"
)]
pub struct LegendreBasis {
    order: usize,
    interval: BasisInterval,
    uniform_integrals: Vec<f64>,
}

impl LegendreBasis {
    pub const KEYWORD: &'static str = "BF_LEGENDRE";

    pub fn new(order: usize, min: f64, max: f64) -> Result<Self, BasisError> {
        let interval = BasisInterval::new(min, max, -1.0, 1.0, false, true)?;
        let mut uniform_integrals = vec![0.0; order + 1];
        uniform_integrals[0] = 1.0;
        Ok(Self {
            order,
            interval,
            uniform_integrals,
        })
    }
}

basis_parameters_conversion!(LegendreBasis);

impl BasisFunctionsTrait for LegendreBasis {
    fn keyword(&self) -> &'static str {
        Self::KEYWORD
    }

    fn kind(&self) -> &'static str {
        "legendre"
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
        (0..=self.order).map(|n| format!("L{n}(s)")).collect()
    }

    fn uniform_integrals(&self) -> &[f64] {
        &self.uniform_integrals
    }

    fn eval_translated(&self, x: f64, values: &mut [f64], derivs: &mut [f64]) {
        values[0] = 1.0;
        derivs[0] = 0.0;
        if self.order == 0 {
            return;
        }
        values[1] = x;
        derivs[1] = 1.0;
        for n in 1..self.order {
            let a = (2 * n + 1) as f64;
            let b = n as f64;
            let c = (n + 1) as f64;
            values[n + 1] = (a * x * values[n] - b * values[n - 1]) / c;
            derivs[n + 1] = (a * (values[n] + x * derivs[n]) - b * derivs[n - 1]) / c;
        }
    }
}
