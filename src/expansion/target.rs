use crate::basis::BasisFunctionsTrait;
use crate::coeffs::CoeffsVector;
use crate::error::{ExpansionError, GridError, TargetDistError};
use crate::expansion::LinearExpansion;
use crate::grid::{Grid, GridAxis};
use crate::target::{TargetDistributionTrait, TargetMode, TargetSettings};

use ndarray::Array1;

/// Relative deviation of a normalized static distribution's mass on the grid which is reported
const MASS_WARNING_THRESHOLD: f64 = 0.01;

impl LinearExpansion {
    /// Configure the target distribution and compute its averages for the given coefficients
    ///
    /// Dynamic targets depend on the bias, with zero coefficients a well-tempered target is
    /// uniform.
    pub fn setup_target(
        &mut self,
        settings: TargetSettings,
        coeffs: &CoeffsVector,
    ) -> Result<(), ExpansionError> {
        self.check_coeffs(coeffs)?;
        match &settings.mode {
            TargetMode::Uniform => {}
            TargetMode::Static(distribution) => distribution.check_dimension(self.ndim())?,
            TargetMode::WellTempered { bias_factor } => {
                if !(bias_factor.is_finite() && *bias_factor > 1.0) {
                    return Err(ExpansionError::InvalidBiasFactor(*bias_factor));
                }
            }
        }
        self.target_grid = if settings.needs_grid() {
            if settings.grid_points.is_empty() {
                return Err(ExpansionError::MissingGrid("target distribution"));
            }
            Some(Grid::new(
                &format!("{}.targetdist", self.label),
                self.grid_axes(&settings.grid_points)?,
                false,
            )?)
        } else {
            None
        };
        log::info!(
            "{}: {} target distribution{}{}",
            self.label,
            match settings.mode {
                TargetMode::Uniform => "uniform",
                TargetMode::Static(_) => "static",
                TargetMode::WellTempered { .. } => "well-tempered",
            },
            if settings.cutoff.is_some() {
                " with bias cutoff"
            } else {
                ""
            },
            match &self.target_grid {
                Some(grid) => format!(" on a grid of {} points", grid.size()),
                None => String::new(),
            },
        );
        self.target_settings = settings;
        self.update_target(coeffs)
    }

    pub fn target_settings(&self) -> &TargetSettings {
        &self.target_settings
    }

    /// Whether the target must be recomputed when the coefficients change
    pub fn is_target_dynamic(&self) -> bool {
        self.target_settings.is_dynamic()
    }

    /// Averages of the basis products over the target distribution
    pub fn target_averaged_derivatives(&self) -> &CoeffsVector {
        &self.target_averages
    }

    /// Normalized target density on its grid, `None` for the grid-free uniform target
    pub fn target_grid(&self) -> Option<&Grid> {
        self.target_grid.as_ref()
    }

    /// Recompute the target distribution and its averages from the current coefficients
    pub fn update_target(&mut self, coeffs: &CoeffsVector) -> Result<(), ExpansionError> {
        self.check_coeffs(coeffs)?;
        let Some(grid) = self.target_grid.as_ref() else {
            self.set_uniform_averages();
            return Ok(());
        };
        let density = self.target_density(coeffs, grid)?;
        let averages = self.grid_averages(grid, &density)?;
        self.target_averages.set_values(&averages)?;
        if let Some(grid) = self.target_grid.as_mut() {
            grid.values_mut().assign(&density);
        }
        log::debug!(
            "{}: target distribution updated, maximum density {:.6e}",
            self.label,
            density.iter().copied().fold(0.0, f64::max),
        );
        Ok(())
    }

    pub(crate) fn grid_axes(&self, points: &[usize]) -> Result<Vec<GridAxis>, ExpansionError> {
        let points = match points.len() {
            1 => vec![points[0]; self.ndim()],
            n if n == self.ndim() => points.to_vec(),
            n => return Err(GridError::DimensionCount(n, self.ndim()).into()),
        };
        Ok(self
            .arg_names
            .iter()
            .zip(self.basis.iter())
            .zip(points)
            .map(|((name, basis), points)| {
                let interval = basis.interval();
                GridAxis::new(
                    name,
                    interval.min(),
                    interval.max(),
                    points,
                    interval.is_periodic(),
                )
            })
            .collect())
    }

    /// Tensor products of the analytic uniform averages
    pub(crate) fn set_uniform_averages(&mut self) {
        let integrals: Vec<_> = self.basis.iter().map(|b| b.uniform_integrals()).collect();
        let averages: Array1<f64> = self
            .index
            .iter()
            .map(|index| {
                index
                    .iter()
                    .zip(integrals.iter())
                    .map(|(&i, integrals)| integrals[i])
                    .product::<f64>()
            })
            .collect();
        self.target_averages.values_mut().assign(&averages);
    }

    /// Target density on the grid nodes, normalized with the trapezoid weights
    fn target_density(
        &self,
        coeffs: &CoeffsVector,
        grid: &Grid,
    ) -> Result<Array1<f64>, ExpansionError> {
        let settings = &self.target_settings;
        let needs_bias = settings.is_dynamic();
        let mut density = Array1::zeros(grid.size());
        let mut bias = Array1::zeros(if needs_bias { grid.size() } else { 0 });
        let mut point = vec![0.0; self.ndim()];
        let mut evaluation = self.new_evaluation();
        for flat in 0..grid.size() {
            grid.point_into(flat, &mut point)?;
            let value = match &settings.mode {
                TargetMode::Static(distribution) => distribution.density(&point),
                TargetMode::Uniform | TargetMode::WellTempered { .. } => 1.0,
            };
            if !(value >= 0.0) {
                return Err(TargetDistError::NegativeDensity {
                    value,
                    point: point.clone(),
                }
                .into());
            }
            density[flat] = value;
            if needs_bias {
                self.expand(Some(coeffs.values()), &point, &mut evaluation);
                bias[flat] = evaluation.raw_bias;
            }
        }
        if let TargetMode::WellTempered { bias_factor } = settings.mode {
            let scale = self.beta() / (bias_factor - 1.0);
            let max = bias.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            density.zip_mut_with(&bias, |p, &v| *p *= f64::exp(scale * (v - max)));
        }
        if let Some(cutoff) = &settings.cutoff {
            density.zip_mut_with(&bias, |p, &v| *p *= cutoff.target_factor(v));
        }
        let weights = grid.integration_weights();
        let norm = weights.dot(&density);
        if !(norm.is_finite() && norm > 0.0) {
            return Err(GridError::ZeroNormalization(norm).into());
        }
        if let (TargetMode::Static(distribution), None) = (&settings.mode, &settings.cutoff) {
            if distribution.is_normalized() && (norm - 1.0).abs() > MASS_WARNING_THRESHOLD {
                log::warn!(
                    "{}: target distribution has mass {norm} on the grid, it is renormalized",
                    self.label,
                );
            }
        }
        density /= norm;
        Ok(density)
    }

    /// $\sum_g w_g p_g \prod_k f_{k,i_k}(s_g)$ for every coefficient
    fn grid_averages(&self, grid: &Grid, density: &Array1<f64>) -> Result<Array1<f64>, ExpansionError> {
        let weights = grid.integration_weights();
        let mut averages = Array1::zeros(self.ncoeffs());
        let mut point = vec![0.0; self.ndim()];
        let mut evaluation = self.new_evaluation();
        for (flat, (&w, &p)) in weights.iter().zip(density.iter()).enumerate() {
            let weight = w * p;
            if weight == 0.0 {
                continue;
            }
            grid.point_into(flat, &mut point)?;
            self.expand(None, &point, &mut evaluation);
            averages.scaled_add(weight, &evaluation.coeff_derivs);
        }
        Ok(averages)
    }
}
