use crate::basis::{BasisFunctions, BasisFunctionsTrait};

use ndarray::Array1;

/// Result of a single-point evaluation of a [LinearExpansion](crate::LinearExpansion)
///
/// The struct also owns the per-dimension basis buffers, so reusing it between steps does not
/// allocate.
#[derive(Clone, Debug, PartialEq)]
pub struct BiasEvaluation {
    /// Bias value, after the cutoff if one is configured
    pub bias: f64,
    /// Bias before the cutoff
    pub raw_bias: f64,
    /// $-\partial V / \partial s_k$ for every argument
    pub forces: Vec<f64>,
    /// $\partial V / \partial c_I$ for every coefficient in flat order
    pub coeff_derivs: Array1<f64>,
    /// Translated arguments
    pub args_t: Vec<f64>,
    /// Whether every argument is inside of its basis interval
    pub inside: Vec<bool>,
    pub(crate) values: Vec<Vec<f64>>,
    pub(crate) derivs: Vec<Vec<f64>>,
    pub(crate) index: Vec<usize>,
}

impl BiasEvaluation {
    pub(crate) fn new(basis: &[BasisFunctions], ncoeffs: usize) -> Self {
        let ndim = basis.len();
        Self {
            bias: 0.0,
            raw_bias: 0.0,
            forces: vec![0.0; ndim],
            coeff_derivs: Array1::zeros(ncoeffs),
            args_t: vec![0.0; ndim],
            inside: vec![true; ndim],
            values: basis.iter().map(|b| vec![0.0; b.size()]).collect(),
            derivs: basis.iter().map(|b| vec![0.0; b.size()]).collect(),
            index: vec![0; ndim],
        }
    }

    /// Squared norm of the force vector
    pub fn force2(&self) -> f64 {
        self.forces.iter().map(|f| f * f).sum()
    }

    pub fn all_inside(&self) -> bool {
        self.inside.iter().all(|&x| x)
    }

    /// Basis values of dimension `dim` at the last evaluated point
    pub fn basis_values(&self, dim: usize) -> Option<&[f64]> {
        self.values.get(dim).map(Vec::as_slice)
    }

    /// Basis derivatives of dimension `dim`, zero if the argument was outside of the interval
    pub fn basis_derivs(&self, dim: usize) -> Option<&[f64]> {
        self.derivs.get(dim).map(Vec::as_slice)
    }
}
