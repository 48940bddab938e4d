use crate::basis::basis_functions::{BasisFunctionsTrait, basis_parameters_conversion};
use crate::basis::harmonics::Harmonics;
use crate::basis::interval::BasisInterval;
use crate::error::BasisError;

use macro_const::macro_const;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

fn periodic_interval(min: f64, max: f64) -> Result<BasisInterval, BasisError> {
    BasisInterval::new(min, max, -PI, PI, true, true)
}

/// Only the constant term survives averaging over a full period
fn constant_only_integrals(size: usize) -> Vec<f64> {
    let mut integrals = vec![0.0; size];
    integrals[0] = 1.0;
    integrals
}

macro_const! {
    const FOURIER_DOC: &str = r"
Fourier series

$$
1,\ \cos x,\ \sin x,\ \cos 2x,\ \sin 2x,\ \dots,\ \cos nx,\ \sin nx,
$$
defined on the periodic interval $x \in [-\pi, \pi]$. Harmonics are computed by the
angle-addition recurrence.

- Keyword: `BF_FOURIER`
- Number of functions: 2 order + 1
";
}

#[doc = FOURIER_DOC!()]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(
    try_from = "crate::basis::BasisParameters",
    into = "crate::basis::BasisParameters"
)]
pub struct FourierBasis {
    order: usize,
    interval: BasisInterval,
    uniform_integrals: Vec<f64>,
}

impl FourierBasis {
    pub const KEYWORD: &'static str = "BF_FOURIER";

    pub fn new(order: usize, min: f64, max: f64) -> Result<Self, BasisError> {
        Ok(Self {
            order,
            interval: periodic_interval(min, max)?,
            uniform_integrals: constant_only_integrals(2 * order + 1),
        })
    }
}

basis_parameters_conversion!(FourierBasis);

impl BasisFunctionsTrait for FourierBasis {
    fn keyword(&self) -> &'static str {
        Self::KEYWORD
    }

    fn kind(&self) -> &'static str {
        "fourier"
    }

    fn description(&self) -> &'static str {
        FOURIER_DOC
    }

    fn order(&self) -> usize {
        self.order
    }

    fn size(&self) -> usize {
        2 * self.order + 1
    }

    fn interval(&self) -> &BasisInterval {
        &self.interval
    }

    fn labels(&self) -> Vec<String> {
        std::iter::once("1".to_owned())
            .chain((1..=self.order).flat_map(|k| [format!("cos({k}*s)"), format!("sin({k}*s)")]))
            .collect()
    }

    fn uniform_integrals(&self) -> &[f64] {
        &self.uniform_integrals
    }

    fn eval_translated(&self, x: f64, values: &mut [f64], derivs: &mut [f64]) {
        values[0] = 1.0;
        derivs[0] = 0.0;
        for (k, (sin, cos)) in Harmonics::new(x).enumerate().take(self.order + 1).skip(1) {
            let kf = k as f64;
            values[2 * k - 1] = cos;
            derivs[2 * k - 1] = -kf * sin;
            values[2 * k] = sin;
            derivs[2 * k] = kf * cos;
        }
    }
}

macro_const! {
    const COSINE_DOC: &str = r"
Cosine series $1, \cos x, \cos 2x, \dots, \cos nx$ on the periodic interval $x \in [-\pi, \pi]$

Suitable for arguments symmetric around the interval center.

- Keyword: `BF_COSINE`
- Number of functions: order + 1
";
}

#[doc = COSINE_DOC!()]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(
    try_from = "crate::basis::BasisParameters",
    into = "crate::basis::BasisParameters"
)]
pub struct CosineBasis {
    order: usize,
    interval: BasisInterval,
    uniform_integrals: Vec<f64>,
}

impl CosineBasis {
    pub const KEYWORD: &'static str = "BF_COSINE";

    pub fn new(order: usize, min: f64, max: f64) -> Result<Self, BasisError> {
        Ok(Self {
            order,
            interval: periodic_interval(min, max)?,
            uniform_integrals: constant_only_integrals(order + 1),
        })
    }
}

basis_parameters_conversion!(CosineBasis);

impl BasisFunctionsTrait for CosineBasis {
    fn keyword(&self) -> &'static str {
        Self::KEYWORD
    }

    fn kind(&self) -> &'static str {
        "cosine"
    }

    fn description(&self) -> &'static str {
        COSINE_DOC
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
            .chain((1..=self.order).map(|k| format!("cos({k}*s)")))
            .collect()
    }

    fn uniform_integrals(&self) -> &[f64] {
        &self.uniform_integrals
    }

    fn eval_translated(&self, x: f64, values: &mut [f64], derivs: &mut [f64]) {
        values[0] = 1.0;
        derivs[0] = 0.0;
        for (k, (sin, cos)) in Harmonics::new(x).enumerate().take(self.order + 1).skip(1) {
            values[k] = cos;
            derivs[k] = -(k as f64) * sin;
        }
    }
}

macro_const! {
    const SINE_DOC: &str = r"
Sine series $1, \sin x, \sin 2x, \dots, \sin nx$ on the periodic interval $x \in [-\pi, \pi]$

The constant term is kept so the bias can be shifted.

- Keyword: `BF_SINE`
- Number of functions: order + 1
";
}

#[doc = SINE_DOC!()]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(
    try_from = "crate::basis::BasisParameters",
    into = "crate::basis::BasisParameters"
)]
pub struct SineBasis {
    order: usize,
    interval: BasisInterval,
    uniform_integrals: Vec<f64>,
}

impl SineBasis {
    pub const KEYWORD: &'static str = "BF_SINE";

    pub fn new(order: usize, min: f64, max: f64) -> Result<Self, BasisError> {
        Ok(Self {
            order,
            interval: periodic_interval(min, max)?,
            uniform_integrals: constant_only_integrals(order + 1),
        })
    }
}

basis_parameters_conversion!(SineBasis);

impl BasisFunctionsTrait for SineBasis {
    fn keyword(&self) -> &'static str {
        Self::KEYWORD
    }

    fn kind(&self) -> &'static str {
        "sine"
    }

    fn description(&self) -> &'static str {
        SINE_DOC
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
            .chain((1..=self.order).map(|k| format!("sin({k}*s)")))
            .collect()
    }

    fn uniform_integrals(&self) -> &[f64] {
        &self.uniform_integrals
    }

    fn eval_translated(&self, x: f64, values: &mut [f64], derivs: &mut [f64]) {
        values[0] = 1.0;
        derivs[0] = 0.0;
        for (k, (sin, cos)) in Harmonics::new(x).enumerate().take(self.order + 1).skip(1) {
            values[k] = sin;
            derivs[k] = (k as f64) * cos;
        }
    }
}
