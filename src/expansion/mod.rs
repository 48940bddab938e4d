//! Linear expansion of the bias in tensor products of basis functions
//!
//! $$
//! V(\mathbf{s}) = \sum_{\mathbf{I}} c_{\mathbf{I}} \prod_k f_{k, i_k}(s_k),
//! $$
//! where $f_{k,i}$ is the $i$-th function of the basis set of argument $k$. The expansion is
//! linear in the coefficients, so $\partial V / \partial c_{\mathbf{I}}$ is the basis product
//! itself.

mod evaluation;
pub use evaluation::BiasEvaluation;

mod grids;
pub use grids::GridKind;

mod target;

use crate::basis::{BasisFunctions, BasisFunctionsTrait, BasisPoint};
use crate::coeffs::CoeffsVector;
use crate::error::{CoeffsError, ExpansionError};
use crate::grid::Grid;
use crate::index::IndexMap;
use crate::target::TargetSettings;

use ndarray::Array1;

/// Bias potential expanded in a basis, see the [module docs](self)
///
/// The expansion does not own the coefficients, every evaluation takes them as an argument and
/// checks their shape. It owns the target-distribution averages of the basis products, which are
/// the reference term of the variational gradient, and the optional diagnostic grids.
#[derive(Clone, Debug)]
pub struct LinearExpansion {
    label: String,
    arg_names: Vec<String>,
    basis: Vec<BasisFunctions>,
    index: IndexMap,
    kbt: f64,
    target_settings: TargetSettings,
    target_averages: CoeffsVector,
    target_grid: Option<Grid>,
    bias_grid: Option<Grid>,
    fes_grid: Option<Grid>,
}

impl LinearExpansion {
    /// Expansion with a uniform target distribution
    pub fn new<S: AsRef<str>>(
        label: &str,
        arg_names: &[S],
        basis: Vec<BasisFunctions>,
        kbt: f64,
    ) -> Result<Self, ExpansionError> {
        if arg_names.len() != basis.len() {
            return Err(ExpansionError::DimensionCount {
                args: arg_names.len(),
                basis: basis.len(),
            });
        }
        if !(kbt.is_finite() && kbt > 0.0) {
            return Err(ExpansionError::InvalidKbt(kbt));
        }
        let target_averages =
            CoeffsVector::from_basis(&format!("{label}.targetdist_averages"), arg_names, &basis)?;
        let index = target_averages.index_map().clone();
        let mut expansion = Self {
            label: label.to_owned(),
            arg_names: arg_names.iter().map(|s| s.as_ref().to_owned()).collect(),
            basis,
            index,
            kbt,
            target_settings: TargetSettings::default(),
            target_averages,
            target_grid: None,
            bias_grid: None,
            fes_grid: None,
        };
        expansion.set_uniform_averages();
        log::info!(
            "{}: linear expansion in {} arguments with {} coefficients",
            expansion.label,
            expansion.ndim(),
            expansion.ncoeffs(),
        );
        for (name, basis) in expansion.arg_names.iter().zip(expansion.basis.iter()) {
            log::info!(
                "{}: argument {name} uses {} basis of order {} on [{}, {}]{}",
                expansion.label,
                basis.kind(),
                basis.order(),
                basis.interval().min(),
                basis.interval().max(),
                if basis.is_periodic() { ", periodic" } else { "" },
            );
        }
        Ok(expansion)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn arg_names(&self) -> &[String] {
        &self.arg_names
    }

    pub fn basis(&self) -> &[BasisFunctions] {
        &self.basis
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.basis.len()
    }

    /// Total number of coefficients
    #[inline]
    pub fn ncoeffs(&self) -> usize {
        self.index.size()
    }

    pub fn shape(&self) -> &[usize] {
        self.index.shape()
    }

    pub fn index_map(&self) -> &IndexMap {
        &self.index
    }

    /// Thermal energy $k_B T$
    pub fn kbt(&self) -> f64 {
        self.kbt
    }

    pub fn beta(&self) -> f64 {
        self.kbt.recip()
    }

    /// Zero coefficients shaped and described after the basis sets
    pub fn new_coeffs(&self, label: &str) -> CoeffsVector {
        self.target_averages.zeros_like(label)
    }

    pub fn check_coeffs(&self, coeffs: &CoeffsVector) -> Result<(), ExpansionError> {
        if coeffs.shape() == self.shape() {
            Ok(())
        } else {
            Err(CoeffsError::shape_mismatch(self.shape(), coeffs.shape()).into())
        }
    }

    /// Buffers for [evaluate_into](Self::evaluate_into)
    pub fn new_evaluation(&self) -> BiasEvaluation {
        BiasEvaluation::new(&self.basis, self.ncoeffs())
    }

    pub fn evaluate(
        &self,
        coeffs: &CoeffsVector,
        args: &[f64],
    ) -> Result<BiasEvaluation, ExpansionError> {
        let mut evaluation = self.new_evaluation();
        self.evaluate_into(coeffs, args, &mut evaluation)?;
        Ok(evaluation)
    }

    /// Bias, forces and coefficient derivatives at a point
    ///
    /// Arguments outside of their basis interval are not an error: the corresponding entry of
    /// [BiasEvaluation::inside] is false and the argument gets no force. If a bias cutoff is
    /// configured, the bias is switched and forces and coefficient derivatives are scaled by the
    /// derivative of the switching.
    pub fn evaluate_into(
        &self,
        coeffs: &CoeffsVector,
        args: &[f64],
        evaluation: &mut BiasEvaluation,
    ) -> Result<(), ExpansionError> {
        self.check_args(args)?;
        self.check_coeffs(coeffs)?;
        if evaluation.values.len() != self.ndim()
            || evaluation.coeff_derivs.len() != self.ncoeffs()
            || evaluation
                .values
                .iter()
                .zip(self.basis.iter())
                .any(|(v, b)| v.len() != b.size())
        {
            *evaluation = self.new_evaluation();
        }
        self.expand(Some(coeffs.values()), args, evaluation);
        if let Some(cutoff) = &self.target_settings.cutoff {
            let (bias, factor) = cutoff.apply(evaluation.raw_bias);
            evaluation.bias = bias;
            evaluation.forces.iter_mut().for_each(|f| *f *= factor);
            evaluation.coeff_derivs *= factor;
        }
        Ok(())
    }

    fn check_args(&self, args: &[f64]) -> Result<(), ExpansionError> {
        if args.len() == self.ndim() {
            Ok(())
        } else {
            Err(ExpansionError::DimensionCount {
                args: args.len(),
                basis: self.ndim(),
            })
        }
    }

    /// Raw tensor-product evaluation, only basis products are computed if `coeffs` is `None`
    fn expand(&self, coeffs: Option<&Array1<f64>>, args: &[f64], evaluation: &mut BiasEvaluation) {
        for (k, basis) in self.basis.iter().enumerate() {
            let BasisPoint { arg_t, inside } =
                basis.eval_all(args[k], &mut evaluation.values[k], &mut evaluation.derivs[k]);
            evaluation.args_t[k] = arg_t;
            evaluation.inside[k] = inside;
        }
        let ndim = self.ndim();
        let mut bias = 0.0;
        evaluation.forces.fill(0.0);
        evaluation.index.fill(0);
        for flat in 0..self.ncoeffs() {
            let values = &evaluation.values;
            let derivs = &evaluation.derivs;
            let index = &evaluation.index;
            let product: f64 = (0..ndim).map(|k| values[k][index[k]]).product();
            if let Some(c) = coeffs.map(|c| c[flat]).filter(|&c| c != 0.0) {
                bias += c * product;
                for k in 0..ndim {
                    let mut d = c * derivs[k][index[k]];
                    if d == 0.0 {
                        continue;
                    }
                    for j in (0..ndim).filter(|&j| j != k) {
                        d *= values[j][index[j]];
                    }
                    evaluation.forces[k] -= d;
                }
            }
            evaluation.coeff_derivs[flat] = product;
            self.index.advance(&mut evaluation.index);
        }
        evaluation.raw_bias = bias;
        evaluation.bias = bias;
    }

    /// Bias without cutoff at a point
    pub fn raw_bias(&self, coeffs: &CoeffsVector, args: &[f64]) -> Result<f64, ExpansionError> {
        self.check_args(args)?;
        self.check_coeffs(coeffs)?;
        let mut evaluation = self.new_evaluation();
        self.expand(Some(coeffs.values()), args, &mut evaluation);
        Ok(evaluation.raw_bias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::BiasCutoff;

    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rand::prelude::*;

    pub(super) fn expansion_2d() -> LinearExpansion {
        LinearExpansion::new(
            "ves",
            &["d1", "d2"],
            vec![
                BasisFunctions::legendre(4, -2.0, 2.0).unwrap(),
                BasisFunctions::fourier(2, -3.0, 3.0).unwrap(),
            ],
            2.5,
        )
        .unwrap()
    }

    pub(super) fn random_coeffs(expansion: &LinearExpansion, seed: u64) -> CoeffsVector {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut coeffs = expansion.new_coeffs("coeffs");
        coeffs
            .values_mut()
            .iter_mut()
            .for_each(|c| *c = rng.random_range(-1.0..1.0));
        coeffs
    }

    #[test]
    fn invalid_configuration() {
        let basis = vec![BasisFunctions::legendre(4, -2.0, 2.0).unwrap()];
        assert!(matches!(
            LinearExpansion::new("ves", &["a", "b"], basis.clone(), 1.0),
            Err(ExpansionError::DimensionCount { args: 2, basis: 1 })
        ));
        assert!(matches!(
            LinearExpansion::new("ves", &["a"], basis, 0.0),
            Err(ExpansionError::InvalidKbt(_))
        ));
    }

    #[test]
    fn coefficient_derivatives_are_basis_products() {
        let expansion = expansion_2d();
        let args = [0.3, -1.1];
        let a = expansion.evaluate(&random_coeffs(&expansion, 0), &args).unwrap();
        let b = expansion.evaluate(&random_coeffs(&expansion, 1), &args).unwrap();
        assert_eq!(a.coeff_derivs, b.coeff_derivs);
        let v1 = expansion.basis()[0].evaluate(args[0]).values;
        let v2 = expansion.basis()[1].evaluate(args[1]).values;
        let flat = expansion.index_map().flatten(&[3, 4]).unwrap();
        assert_relative_eq!(a.coeff_derivs[flat], v1[3] * v2[4], max_relative = 1e-14);
        let bias = a.coeff_derivs.dot(random_coeffs(&expansion, 0).values());
        assert_abs_diff_eq!(a.bias, bias, epsilon = 1e-12);
    }

    #[test]
    fn bias_is_linear_in_coefficients() {
        let expansion = expansion_2d();
        let coeffs = random_coeffs(&expansion, 2);
        let args = [-0.7, 2.2];
        let bias = expansion.evaluate(&coeffs, &args).unwrap().bias;
        let alpha = -3.5;
        let scaled = expansion.evaluate(&coeffs.scaled(alpha), &args).unwrap().bias;
        assert_relative_eq!(scaled, alpha * bias, max_relative = 1e-12);
    }

    #[test]
    fn forces_match_finite_differences() {
        let expansion = expansion_2d();
        let coeffs = random_coeffs(&expansion, 3);
        let eps = 1e-5;
        for args in [[0.1, 0.2], [-1.5, 2.7], [1.9, -2.9]] {
            let evaluation = expansion.evaluate(&coeffs, &args).unwrap();
            for k in 0..2 {
                let mut plus = args;
                plus[k] += eps;
                let mut minus = args;
                minus[k] -= eps;
                let numerical = -(expansion.raw_bias(&coeffs, &plus).unwrap()
                    - expansion.raw_bias(&coeffs, &minus).unwrap())
                    / (2.0 * eps);
                assert_abs_diff_eq!(evaluation.forces[k], numerical, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn domain_excursion_suppresses_one_force() {
        let expansion = expansion_2d();
        let coeffs = random_coeffs(&expansion, 4);
        let evaluation = expansion.evaluate(&coeffs, &[2.01, 0.5]).unwrap();
        assert_eq!(evaluation.inside, vec![false, true]);
        assert!(!evaluation.all_inside());
        assert_eq!(evaluation.forces[0], 0.0);
        assert!(evaluation.basis_derivs(0).unwrap().iter().all(|&d| d == 0.0));
        assert!(evaluation.bias.is_finite());
        // the other dimension sees the clamped value of the first one
        let edge = expansion.evaluate(&coeffs, &[2.0, 0.5]).unwrap();
        assert_relative_eq!(evaluation.bias, edge.bias, max_relative = 1e-12);
        assert_relative_eq!(evaluation.forces[1], edge.forces[1], max_relative = 1e-12);
        assert!(evaluation.forces[1] != 0.0);
    }

    #[test]
    fn force2() {
        let expansion = expansion_2d();
        let evaluation = expansion.evaluate(&random_coeffs(&expansion, 5), &[0.4, 0.4]).unwrap();
        let expected: f64 = evaluation.forces.iter().map(|f| f * f).sum();
        assert_eq!(evaluation.force2(), expected);
    }

    #[test]
    fn argument_and_shape_errors() {
        let expansion = expansion_2d();
        let coeffs = expansion.new_coeffs("coeffs");
        assert!(matches!(
            expansion.evaluate(&coeffs, &[0.0]),
            Err(ExpansionError::DimensionCount { args: 1, basis: 2 })
        ));
        let other = LinearExpansion::new(
            "other",
            &["d1"],
            vec![BasisFunctions::legendre(4, -2.0, 2.0).unwrap()],
            1.0,
        )
        .unwrap();
        assert!(matches!(
            expansion.evaluate(&other.new_coeffs("c"), &[0.0, 0.0]),
            Err(ExpansionError::Coeffs(CoeffsError::ShapeMismatch { .. }))
        ));
    }

    #[test]
    fn reused_buffers() {
        let expansion = expansion_2d();
        let coeffs = random_coeffs(&expansion, 6);
        let mut evaluation = expansion.new_evaluation();
        expansion.evaluate_into(&coeffs, &[1.0, 1.0], &mut evaluation).unwrap();
        expansion.evaluate_into(&coeffs, &[-0.5, 0.25], &mut evaluation).unwrap();
        assert_eq!(evaluation, expansion.evaluate(&coeffs, &[-0.5, 0.25]).unwrap());
    }

    #[test]
    fn cutoff_switches_bias() {
        let mut expansion = LinearExpansion::new(
            "ves",
            &["d"],
            vec![BasisFunctions::powers(1, -1.0, 1.0).unwrap()],
            1.0,
        )
        .unwrap();
        let cutoff = BiasCutoff::new(1.0, 5.0, 100.0).unwrap();
        expansion
            .setup_target(
                TargetSettings::default()
                    .with_grid_points(vec![51])
                    .with_cutoff(cutoff.clone()),
                &expansion.new_coeffs("c"),
            )
            .unwrap();
        let mut coeffs = expansion.new_coeffs("c");
        coeffs.set(&[1], 2.0).unwrap();
        let evaluation = expansion.evaluate(&coeffs, &[0.8]).unwrap();
        let (bias, factor) = cutoff.apply(1.6);
        assert_relative_eq!(evaluation.raw_bias, 1.6, max_relative = 1e-14);
        assert_relative_eq!(evaluation.bias, bias, max_relative = 1e-14);
        assert_relative_eq!(evaluation.forces[0], -2.0 * factor, max_relative = 1e-12);
        assert_relative_eq!(evaluation.coeff_derivs[1], 0.8 * factor, max_relative = 1e-12);
    }
}
