use crate::basis::basis_functions::{BasisFunctionsTrait, basis_parameters_conversion};
use crate::basis::interval::BasisInterval;
use crate::error::BasisError;

use macro_const::macro_const;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

macro_const! {
    const DOC: &str = r"
Chebyshev polynomials of the first kind

$$
T_0(x) = 1,\quad T_1(x) = x,\quad T_{n+1}(x) = 2 x T_n(x) - T_{n-1}(x),
$$
defined on $x \in [-1, 1]$. Derivatives follow the differentiated recurrence
$T'_{n+1} = 2 T_n + 2 x T'_n - T'_{n-1}$.

- Keyword: `BF_CHEBYSHEV`
- Number of functions: order + 1
";
}

#[doc = DOC!()]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(
    try_from = "crate::basis::BasisParameters",
    into = "crate::basis::BasisParameters"
)]
pub struct ChebyshevBasis {
    order: usize,
    interval: BasisInterval,
    uniform_integrals: Vec<f64>,
}

impl ChebyshevBasis {
    pub const KEYWORD: &'static str = "BF_CHEBYSHEV";

    pub fn new(order: usize, min: f64, max: f64) -> Result<Self, BasisError> {
        let interval = BasisInterval::new(min, max, -1.0, 1.0, false, true)?;
        let uniform_integrals = (0..=order)
            .map(|n| {
                if n % 2 == 0 {
                    let n = n as f64;
                    -1.0 / (n * n - 1.0)
                } else {
                    0.0
                }
            })
            .collect();
        Ok(Self {
            order,
            interval,
            uniform_integrals,
        })
    }
}

basis_parameters_conversion!(ChebyshevBasis);

impl BasisFunctionsTrait for ChebyshevBasis {
    fn keyword(&self) -> &'static str {
        Self::KEYWORD
    }

    fn kind(&self) -> &'static str {
        "chebyshev-1st-kind"
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
        (0..=self.order).map(|n| format!("T{n}(s)")).collect()
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
            values[n + 1] = 2.0 * x * values[n] - values[n - 1];
            derivs[n + 1] = 2.0 * values[n] + 2.0 * x * derivs[n] - derivs[n - 1];
        }
    }
}
