use crate::basis::BasisFunctionsTrait;
use crate::coeffs::CoeffsVector;
use crate::error::ExpansionError;
use crate::expansion::LinearExpansion;
use crate::grid::Grid;
use crate::target::{TargetDistributionTrait, TargetMode};

use std::path::Path;

/// Grids maintained by a [LinearExpansion]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GridKind {
    /// Reported bias, with cutoff, and its gradient
    Bias,
    /// Free-energy estimate implied by the bias and the target distribution
    FreeEnergy,
    /// Normalized target density
    Target,
}

impl GridKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Bias => "bias",
            Self::FreeEnergy => "fes",
            Self::Target => "targetdist",
        }
    }
}

impl LinearExpansion {
    /// Create an empty grid spanning the basis intervals
    ///
    /// `points` holds one point count per argument, or a single count for all of them. A new
    /// target grid is filled by the next [update_grid](Self::update_grid).
    pub fn setup_grid(&mut self, kind: GridKind, points: &[usize]) -> Result<(), ExpansionError> {
        if points.is_empty() {
            return Err(ExpansionError::MissingGrid(kind.name()));
        }
        let label = format!("{}.{}", self.label, kind.name());
        let grid = Grid::new(&label, self.grid_axes(points)?, kind == GridKind::Bias)?;
        match kind {
            GridKind::Bias => self.bias_grid = Some(grid),
            GridKind::FreeEnergy => self.fes_grid = Some(grid),
            GridKind::Target => {
                self.target_settings.grid_points = points.to_vec();
                self.target_grid = Some(grid);
            }
        }
        Ok(())
    }

    pub fn grid(&self, kind: GridKind) -> Option<&Grid> {
        match kind {
            GridKind::Bias => self.bias_grid.as_ref(),
            GridKind::FreeEnergy => self.fes_grid.as_ref(),
            GridKind::Target => self.target_grid.as_ref(),
        }
    }

    /// Evaluate a grid for the given coefficients, for the target grid this is
    /// [update_target](Self::update_target)
    pub fn update_grid(&mut self, kind: GridKind, coeffs: &CoeffsVector) -> Result<(), ExpansionError> {
        match kind {
            GridKind::Bias => {
                let mut grid = self.bias_grid.take().ok_or(ExpansionError::MissingGrid("bias"))?;
                let result = self.fill_bias_grid(coeffs, &mut grid);
                self.bias_grid = Some(grid);
                result
            }
            GridKind::FreeEnergy => {
                let mut grid = self.fes_grid.take().ok_or(ExpansionError::MissingGrid("fes"))?;
                let result = self.fill_fes_grid(coeffs, &mut grid);
                self.fes_grid = Some(grid);
                result
            }
            GridKind::Target => self.update_target(coeffs),
        }
    }

    pub fn write_grid(&self, kind: GridKind, path: impl AsRef<Path>) -> Result<(), ExpansionError> {
        let grid = self
            .grid(kind)
            .ok_or(ExpansionError::MissingGrid(kind.name()))?;
        grid.write_to_path(path)?;
        Ok(())
    }

    fn fill_bias_grid(&self, coeffs: &CoeffsVector, grid: &mut Grid) -> Result<(), ExpansionError> {
        let mut point = vec![0.0; self.ndim()];
        let mut evaluation = self.new_evaluation();
        let mut gradient = vec![0.0; self.ndim()];
        for flat in 0..grid.size() {
            grid.point_into(flat, &mut point)?;
            self.evaluate_into(coeffs, &point, &mut evaluation)?;
            grid.set_value(flat, evaluation.bias)?;
            gradient
                .iter_mut()
                .zip(evaluation.forces.iter())
                .for_each(|(g, f)| *g = -f);
            grid.set_derivs(flat, &gradient)?;
        }
        Ok(())
    }

    /// $F = -V - k_B T \ln p$ for uniform and static targets, $F = -\gamma V / (\gamma - 1)$ for
    /// the well-tempered one, shifted to a zero minimum
    fn fill_fes_grid(&self, coeffs: &CoeffsVector, grid: &mut Grid) -> Result<(), ExpansionError> {
        self.check_coeffs(coeffs)?;
        let mut point = vec![0.0; self.ndim()];
        let mut evaluation = self.new_evaluation();
        for flat in 0..grid.size() {
            grid.point_into(flat, &mut point)?;
            self.expand(Some(coeffs.values()), &point, &mut evaluation);
            let bias = evaluation.raw_bias;
            let mut fes = match &self.target_settings.mode {
                TargetMode::Uniform => -bias,
                TargetMode::Static(distribution) => -bias - self.kbt * distribution.density(&point).ln(),
                TargetMode::WellTempered { bias_factor } => {
                    -bias_factor / (bias_factor - 1.0) * bias
                }
            };
            if let Some(cutoff) = &self.target_settings.cutoff {
                fes -= self.kbt * cutoff.target_factor(bias).ln();
            }
            grid.set_value(flat, fes)?;
        }
        grid.set_min_to_zero();
        Ok(())
    }

    /// Subtract the minimum of the bias on the bias grid from the constant coefficient
    ///
    /// Returns the subtracted value. The bias grid is updated.
    pub fn shift_bias_minimum_to_zero(
        &mut self,
        coeffs: &mut CoeffsVector,
    ) -> Result<f64, ExpansionError> {
        self.check_coeffs(coeffs)?;
        let grid = self.bias_grid.as_ref().ok_or(ExpansionError::MissingGrid("bias"))?;
        let mut constant = 1.0;
        for (dim, basis) in self.basis.iter().enumerate() {
            let interval = basis.interval();
            let first = basis.evaluate(interval.min()).values[0];
            let last = basis.evaluate(interval.max()).values[0];
            if first == 0.0 || first != last {
                return Err(ExpansionError::NoConstantTerm(dim));
            }
            constant *= first;
        }
        let mut point = vec![0.0; self.ndim()];
        let mut evaluation = self.new_evaluation();
        let mut minimum = f64::INFINITY;
        for flat in 0..grid.size() {
            grid.point_into(flat, &mut point)?;
            self.expand(Some(coeffs.values()), &point, &mut evaluation);
            minimum = minimum.min(evaluation.raw_bias);
        }
        let zero = vec![0; self.ndim()];
        coeffs.add_to(&zero, -minimum / constant)?;
        self.update_grid(GridKind::Bias, coeffs)?;
        Ok(minimum)
    }
}
