//! Bias driver used by a sampling host at every step

mod settings;
pub use settings::{ArgumentSettings, BasisSettings, VesSettings};

use crate::basis::BasisRegistry;
use crate::coeffs::CoeffsVector;
use crate::error::VesError;
use crate::expansion::{BiasEvaluation, GridKind, LinearExpansion};
use crate::optimizer::{Optimizer, ReplicaCommunicator};

use ndarray::{Array1, Zip};
use std::path::Path;

/// Bias and its derivatives returned to the host
#[derive(Clone, Debug, PartialEq)]
pub struct BiasOutput {
    pub bias: f64,
    /// Minus gradient of the bias, one value per argument
    pub forces: Vec<f64>,
    /// Squared norm of the forces
    pub force2: f64,
}

/// Variationally optimized bias: a [LinearExpansion] with its coefficients and an optional
/// [Optimizer]
///
/// Every [calculate](VesBias::calculate) call is one sample for the optimizer. Coefficients are
/// updated every `stride` samples, a dynamic target distribution is recomputed every
/// `target_update_stride` updates.
#[derive(Debug)]
pub struct VesBias {
    settings: VesSettings,
    expansion: LinearExpansion,
    coeffs: CoeffsVector,
    optimizer: Option<Optimizer>,
    evaluation: BiasEvaluation,
    // The variational gradient is <phi>_target - <phi>_biased, the optimizer forms
    // mean(sample) - reference, so both enter with a minus sign
    reference: CoeffsVector,
    sample: Array1<f64>,
}

impl VesBias {
    pub fn new(
        settings: VesSettings,
        registry: &BasisRegistry,
        communicator: Box<dyn ReplicaCommunicator>,
    ) -> Result<Self, VesError> {
        if settings.target_update_stride == 0 {
            return Err(VesError::InvalidSetting(
                "target update stride must be positive",
            ));
        }
        let basis = settings
            .arguments
            .iter()
            .map(|arg| arg.basis.build(registry))
            .collect::<Result<Vec<_>, _>>()?;
        let names: Vec<_> = settings.arguments.iter().map(|arg| arg.name.as_str()).collect();
        let mut expansion = LinearExpansion::new(&settings.label, &names, basis, settings.kbt)?;

        let mut coeffs = expansion.new_coeffs(&format!("{}.coeffs", settings.label));
        if let Some(path) = &settings.initial_coeffs {
            coeffs.read_from_path(path, true)?;
            log::info!(
                "{}: initial coefficients are read from {}",
                settings.label,
                path.display()
            );
        }
        expansion.setup_target(settings.target.clone(), &coeffs)?;
        if !settings.grid_points.is_empty() {
            for kind in [GridKind::Bias, GridKind::FreeEnergy] {
                expansion.setup_grid(kind, &settings.grid_points)?;
            }
        }
        let optimizer = settings
            .optimizer
            .clone()
            .map(|optimizer| Optimizer::new(optimizer, settings.kbt, &[&coeffs], communicator))
            .transpose()?;

        let evaluation = expansion.new_evaluation();
        let reference = coeffs.zeros_like(&format!("{}.reference", settings.label));
        let sample = Array1::zeros(coeffs.size());
        let mut bias = Self {
            settings,
            expansion,
            coeffs,
            optimizer,
            evaluation,
            reference,
            sample,
        };
        bias.refresh_reference()?;
        Ok(bias)
    }

    pub fn settings(&self) -> &VesSettings {
        &self.settings
    }

    pub fn expansion(&self) -> &LinearExpansion {
        &self.expansion
    }

    /// Coefficients the bias is evaluated with
    pub fn coeffs(&self) -> &CoeffsVector {
        &self.coeffs
    }

    /// Coefficients, e.g. to exclude entries from optimization
    ///
    /// Dynamic targets follow changed values at the next [update_target](VesBias::update_target).
    pub fn coeffs_mut(&mut self) -> &mut CoeffsVector {
        &mut self.coeffs
    }

    /// Coefficients averaged over the optimization trajectory, the current ones without an
    /// optimizer
    pub fn averaged_coeffs(&self) -> &CoeffsVector {
        match &self.optimizer {
            Some(optimizer) => optimizer
                .averaged_coeffs(0, &self.coeffs)
                .unwrap_or(&self.coeffs),
            None => &self.coeffs,
        }
    }

    pub fn optimizer(&self) -> Option<&Optimizer> {
        self.optimizer.as_ref()
    }

    /// Gradient of the last update
    pub fn gradient(&self) -> Result<&CoeffsVector, VesError> {
        let optimizer = self.optimizer.as_ref().ok_or(VesError::NoOptimizer)?;
        Ok(optimizer.gradient(0)?)
    }

    fn refresh_reference(&mut self) -> Result<(), VesError> {
        let averages = self.expansion.target_averaged_derivatives();
        self.reference.set_values(&(averages.values() * -1.0))?;
        Ok(())
    }

    /// Evaluate the bias and pass the sample to the optimizer
    pub fn calculate(&mut self, args: &[f64]) -> Result<BiasOutput, VesError> {
        self.expansion
            .evaluate_into(&self.coeffs, args, &mut self.evaluation)?;
        let output = BiasOutput {
            bias: self.evaluation.bias,
            forces: self.evaluation.forces.clone(),
            force2: self.evaluation.force2(),
        };
        if let Some(optimizer) = self.optimizer.as_mut() {
            Zip::from(&mut self.sample)
                .and(&self.evaluation.coeff_derivs)
                .for_each(|s, &d| *s = -d);
            let updated =
                optimizer.step(&[&self.sample], &mut [&mut self.coeffs], &[&self.reference])?;
            if updated
                && self.expansion.is_target_dynamic()
                && optimizer.iteration() % self.settings.target_update_stride == 0
            {
                self.update_target()?;
            }
        }
        Ok(output)
    }

    /// Recompute the target distribution for the current coefficients
    pub fn update_target(&mut self) -> Result<(), VesError> {
        self.expansion.update_target(&self.coeffs)?;
        self.refresh_reference()?;
        log::debug!(
            "{}: target distribution is updated at iteration {}",
            self.settings.label,
            self.coeffs.counter()
        );
        Ok(())
    }

    /// Evaluate a grid for the current coefficients and write it
    pub fn write_grid(&mut self, kind: GridKind, path: impl AsRef<Path>) -> Result<(), VesError> {
        if kind != GridKind::Target {
            self.expansion.update_grid(kind, &self.coeffs)?;
        }
        self.expansion.write_grid(kind, path)?;
        Ok(())
    }

    /// Shift the bias to a zero minimum on the bias grid, returns the shift
    pub fn shift_bias_minimum_to_zero(&mut self) -> Result<f64, VesError> {
        self.expansion.update_grid(GridKind::Bias, &self.coeffs)?;
        Ok(self.expansion.shift_bias_minimum_to_zero(&mut self.coeffs)?)
    }

    /// Write coefficients, the running average and the iteration counter
    pub fn write_checkpoint(&self, path: impl AsRef<Path>) -> Result<(), VesError> {
        match &self.optimizer {
            Some(optimizer) => optimizer.write_checkpoint(0, &self.coeffs, path)?,
            None => self.coeffs.write_to_path(path, None)?,
        }
        Ok(())
    }

    pub fn restore_checkpoint(&mut self, path: impl AsRef<Path>) -> Result<(), VesError> {
        match self.optimizer.as_mut() {
            Some(optimizer) => optimizer.restore_checkpoint(0, &mut self.coeffs, path)?,
            None => {
                self.coeffs.read_from_path(path, true)?;
            }
        }
        if self.expansion.is_target_dynamic() {
            self.update_target()?;
        }
        Ok(())
    }
}
