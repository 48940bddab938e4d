//! Stochastic optimization of expansion coefficients
//!
//! The [Optimizer] collects per-coefficient derivatives over `stride` samples, forms the
//! gradient `mean(derivatives) - reference` and optionally the Hessian estimate
//! `beta * (mean(d d^T) - mean(d) mean(d)^T)`, averages both over replicas and passes them to an
//! [UpdateRule].

use crate::coeffs::{CoeffsMatrix, CoeffsVector};
use crate::error::OptimizerError;

use itertools::izip;
use ndarray::Array1;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod replica;
pub use replica::{ReplicaCommunicator, SingleReplica, ThreadReplicas};

mod step_size;
pub use step_size::StepSize;

mod update_rule;
pub use update_rule::{AveragedSgd, Fake, SteepestDescent, UpdateRule, UpdateRuleTrait, UpdateStep};

/// Storage of the Hessian estimate
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum HessianMode {
    /// No Hessian is collected
    #[default]
    None,
    Diagonal,
    Full,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OptimizerSettings {
    /// Number of samples per update
    pub stride: usize,
    pub step_size: StepSize,
    #[serde(default)]
    pub rule: UpdateRule,
    #[serde(default)]
    pub hessian: HessianMode,
    /// Average gradient and Hessian over all replicas of the communicator
    #[serde(default)]
    pub multiple_walkers: bool,
}

impl OptimizerSettings {
    /// Steepest descent without Hessian and replica averaging
    pub fn new(stride: usize, step_size: StepSize) -> Self {
        Self {
            stride,
            step_size,
            rule: UpdateRule::default(),
            hessian: HessianMode::None,
            multiple_walkers: false,
        }
    }

    pub fn with_rule(mut self, rule: UpdateRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_hessian(mut self, hessian: HessianMode) -> Self {
        self.hessian = hessian;
        self
    }

    pub fn with_multiple_walkers(mut self, multiple_walkers: bool) -> Self {
        self.multiple_walkers = multiple_walkers;
        self
    }

    pub fn validate(&self) -> Result<(), OptimizerError> {
        if self.stride == 0 {
            return Err(OptimizerError::InvalidSetting("stride must be positive"));
        }
        self.step_size.validate()?;
        if self.rule.requires_hessian() && self.hessian == HessianMode::None {
            return Err(OptimizerError::HessianRequired(self.rule.name()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
struct Component {
    aux: CoeffsVector,
    sum_derivs: Array1<f64>,
    sum_outer: Option<CoeffsMatrix>,
    gradient: CoeffsVector,
    hessian: Option<CoeffsMatrix>,
}

impl Component {
    fn new(coeffs: &CoeffsVector, mode: HessianMode) -> Self {
        let matrix = |label: &str| match mode {
            HessianMode::None => None,
            HessianMode::Diagonal => Some(CoeffsMatrix::new(label, coeffs, true)),
            HessianMode::Full => Some(CoeffsMatrix::new(label, coeffs, false)),
        };
        let label = coeffs.label();
        Self {
            aux: coeffs.clone(),
            sum_derivs: Array1::zeros(coeffs.size()),
            sum_outer: matrix(&format!("{label}.sum_outer")),
            gradient: coeffs.zeros_like(&format!("{label}.gradient")),
            hessian: matrix(&format!("{label}.hessian")),
        }
    }

    fn reset(&mut self) {
        self.sum_derivs.fill(0.0);
        if let Some(sum_outer) = self.sum_outer.as_mut() {
            sum_outer.fill(0.0);
        }
    }
}

/// Optimizer of one or more coefficient tensors
///
/// Coefficients are owned by the caller and lent to [update](Optimizer::update), the optimizer
/// owns the statistics and the auxiliary tensors of the update rule.
#[derive(Debug)]
pub struct Optimizer {
    settings: OptimizerSettings,
    beta: f64,
    components: Vec<Component>,
    samples: usize,
    iteration: u64,
    communicator: Box<dyn ReplicaCommunicator>,
}

impl Optimizer {
    pub fn new(
        settings: OptimizerSettings,
        kbt: f64,
        coeffs: &[&CoeffsVector],
        communicator: Box<dyn ReplicaCommunicator>,
    ) -> Result<Self, OptimizerError> {
        settings.validate()?;
        if !(kbt.is_finite() && kbt > 0.0) {
            return Err(OptimizerError::InvalidSetting("kT must be positive"));
        }
        if coeffs.is_empty() {
            return Err(OptimizerError::InvalidSetting(
                "at least one coefficient tensor is required",
            ));
        }
        let components = coeffs
            .iter()
            .map(|c| Component::new(c, settings.hessian))
            .collect();
        log::info!(
            "{} optimizer of {} coefficient tensor(s): stride {}, Hessian {:?}, replica {} of {}{}",
            settings.rule.name(),
            coeffs.len(),
            settings.stride,
            settings.hessian,
            communicator.rank(),
            communicator.participants(),
            if settings.multiple_walkers {
                ", multiple walkers"
            } else {
                ""
            },
        );
        Ok(Self {
            settings,
            beta: kbt.recip(),
            components,
            samples: 0,
            iteration: coeffs[0].counter(),
            communicator,
        })
    }

    pub fn settings(&self) -> &OptimizerSettings {
        &self.settings
    }

    pub fn ncomponents(&self) -> usize {
        self.components.len()
    }

    /// Number of completed updates
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn set_iteration(&mut self, iteration: u64) {
        self.iteration = iteration;
    }

    /// Samples collected since the last update
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn is_update_due(&self) -> bool {
        self.samples >= self.settings.stride
    }

    fn component(&self, k: usize) -> Result<&Component, OptimizerError> {
        self.components.get(k).ok_or(OptimizerError::NoComponent(k))
    }

    fn check_count(&self, actual: usize) -> Result<(), OptimizerError> {
        if actual == self.components.len() {
            Ok(())
        } else {
            Err(OptimizerError::ComponentCount {
                expected: self.components.len(),
                actual,
            })
        }
    }

    /// Gradient of the last update
    pub fn gradient(&self, k: usize) -> Result<&CoeffsVector, OptimizerError> {
        Ok(&self.component(k)?.gradient)
    }

    /// Hessian estimate of the last update
    pub fn hessian(&self, k: usize) -> Result<&CoeffsMatrix, OptimizerError> {
        self.component(k)?
            .hessian
            .as_ref()
            .ok_or(OptimizerError::HessianNotEnabled)
    }

    /// Coefficients averaged over the update trajectory, `coeffs` are the current coefficients
    /// of component `k`
    pub fn averaged_coeffs<'a>(
        &'a self,
        k: usize,
        coeffs: &'a CoeffsVector,
    ) -> Result<&'a CoeffsVector, OptimizerError> {
        let component = self.component(k)?;
        coeffs.check_same_shape(&component.aux)?;
        Ok(self.settings.rule.averaged(coeffs, &component.aux))
    }

    /// Add one sample of per-coefficient derivatives, one array per component
    pub fn accumulate(&mut self, derivs: &[&Array1<f64>]) -> Result<(), OptimizerError> {
        self.check_count(derivs.len())?;
        for (component, d) in self.components.iter().zip(derivs) {
            if d.len() != component.sum_derivs.len() {
                return Err(OptimizerError::shape_mismatch(
                    component.gradient.shape(),
                    &[d.len()],
                ));
            }
        }
        for (component, &d) in self.components.iter_mut().zip(derivs) {
            component.sum_derivs += d;
            if let Some(sum_outer) = component.sum_outer.as_mut() {
                sum_outer.add_outer_product(d.view(), 1.0)?;
            }
        }
        self.samples += 1;
        Ok(())
    }

    /// Form gradient and Hessian from the collected samples and apply the update rule
    ///
    /// `references` are the reference averages subtracted from the sample means, one per
    /// component. Accumulators are cleared afterwards.
    pub fn update(
        &mut self,
        coeffs: &mut [&mut CoeffsVector],
        references: &[&CoeffsVector],
    ) -> Result<(), OptimizerError> {
        if self.samples == 0 {
            return Err(OptimizerError::NoSamples);
        }
        self.check_count(coeffs.len())?;
        self.check_count(references.len())?;
        for (component, c, reference) in izip!(self.components.iter(), coeffs.iter(), references) {
            c.check_same_shape(&component.gradient)?;
            reference.check_same_shape(&component.gradient)?;
        }

        let n = self.samples as f64;
        let mut estimates = Vec::with_capacity(self.components.len());
        for (component, reference) in self.components.iter().zip(references) {
            let mean = &component.sum_derivs / n;
            let mut gradient = component.gradient.clone();
            gradient.set_values(&(&mean - reference.values()))?;
            let hessian = match component.sum_outer.as_ref() {
                Some(sum_outer) => {
                    let mut hessian = sum_outer.clone();
                    hessian.scale(n.recip());
                    hessian.add_outer_product(mean.view(), -1.0)?;
                    hessian.scale(self.beta);
                    Some(hessian)
                }
                None => None,
            };
            estimates.push((gradient, hessian));
        }
        // estimates are committed only after the replicas agreed on them
        self.reduce_over_replicas(&mut estimates)?;
        for (component, (gradient, hessian)) in self.components.iter_mut().zip(estimates) {
            component.gradient = gradient;
            component.hessian = hessian;
        }

        let step_size = self.settings.step_size.at(self.iteration);
        let rule = &self.settings.rule;
        for (component, c) in self.components.iter_mut().zip(coeffs.iter_mut()) {
            let step = UpdateStep {
                iteration: self.iteration,
                step_size,
                gradient: &component.gradient,
                hessian: component.hessian.as_ref(),
            };
            rule.apply(step, c, &mut component.aux)?;
            if rule.mutates() {
                c.increment_counter();
            }
        }
        log::debug!(
            "optimizer update {}: step size {step_size:e}, gradient norm {:e}, {} samples",
            self.iteration,
            self.components
                .iter()
                .map(|component| component.gradient.norm().powi(2))
                .sum::<f64>()
                .sqrt(),
            self.samples,
        );
        self.iteration += 1;
        self.samples = 0;
        self.components.iter_mut().for_each(Component::reset);
        Ok(())
    }

    /// [accumulate](Optimizer::accumulate) and [update](Optimizer::update) when `stride` samples
    /// are collected, returns `true` if the coefficients are updated
    pub fn step(
        &mut self,
        derivs: &[&Array1<f64>],
        coeffs: &mut [&mut CoeffsVector],
        references: &[&CoeffsVector],
    ) -> Result<bool, OptimizerError> {
        self.accumulate(derivs)?;
        if self.is_update_due() {
            self.update(coeffs, references)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn reduce_over_replicas(
        &self,
        estimates: &mut [(CoeffsVector, Option<CoeffsMatrix>)],
    ) -> Result<(), OptimizerError> {
        if !self.settings.multiple_walkers || self.communicator.participants() < 2 {
            return Ok(());
        }
        let mut buffer: Vec<f64> = vec![];
        for (gradient, hessian) in estimates.iter() {
            buffer.extend(gradient.values().iter());
            if let Some(hessian) = hessian.as_ref() {
                buffer.extend(hessian.stored());
            }
        }
        self.communicator.sum_average(&mut buffer)?;
        let mut mean = buffer.into_iter();
        for (gradient, hessian) in estimates.iter_mut() {
            gradient
                .values_mut()
                .iter_mut()
                .zip(mean.by_ref())
                .for_each(|(x, value)| *x = value);
            if let Some(hessian) = hessian.as_mut() {
                hessian
                    .stored_mut()
                    .zip(mean.by_ref())
                    .for_each(|(x, value)| *x = value);
            }
        }
        Ok(())
    }

    /// Write coefficients of component `k` with the auxiliary tensor and the iteration counter
    pub fn write_checkpoint(
        &self,
        k: usize,
        coeffs: &CoeffsVector,
        path: impl AsRef<Path>,
    ) -> Result<(), OptimizerError> {
        let component = self.component(k)?;
        coeffs.check_same_shape(&component.aux)?;
        coeffs.write_to_path(path.as_ref(), Some(component.aux.values()))?;
        log::info!(
            "coefficients {} at iteration {} are written to {}",
            coeffs.label(),
            coeffs.counter(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Load coefficients of component `k` and the auxiliary tensor from a checkpoint
    ///
    /// The iteration counter of the optimizer is set to the one of the file. A file without the
    /// auxiliary column restarts the running average from the loaded coefficients.
    pub fn restore_checkpoint(
        &mut self,
        k: usize,
        coeffs: &mut CoeffsVector,
        path: impl AsRef<Path>,
    ) -> Result<(), OptimizerError> {
        let component = self
            .components
            .get_mut(k)
            .ok_or(OptimizerError::NoComponent(k))?;
        coeffs.check_same_shape(&component.aux)?;
        let aux = coeffs.read_from_path(path.as_ref(), true)?;
        match aux {
            Some(aux) => component.aux.set_values(&aux)?,
            None => component.aux.set_values(coeffs.values())?,
        }
        component.aux.set_counter(coeffs.counter());
        component.reset();
        self.samples = 0;
        self.iteration = coeffs.counter();
        log::info!(
            "coefficients {} at iteration {} are restored from {}",
            coeffs.label(),
            coeffs.counter(),
            path.as_ref().display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::BasisFunctions;
    use crate::error::CommunicationError;
    use crate::io::test_dir;

    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use ndarray::array;
    use rand::prelude::*;
    use rand_distr::Normal;
    use std::thread;

    fn coeffs() -> CoeffsVector {
        let basis = [BasisFunctions::legendre(2, -1.0, 1.0).unwrap()];
        CoeffsVector::from_basis("bias.coeffs", &["s"], &basis).unwrap()
    }

    fn optimizer(settings: OptimizerSettings, c: &CoeffsVector) -> Optimizer {
        Optimizer::new(settings, 2.0, &[c], Box::new(SingleReplica)).unwrap()
    }

    #[test]
    fn quadratic_convergence() {
        let minimum = array![0.5, -0.3, 0.2];
        let curvature = 1.0;
        let mut c = coeffs();
        let reference = c.zeros_like("reference");
        let settings = OptimizerSettings::new(10, StepSize::Fixed(0.5));
        let mut optimizer = optimizer(settings, &c);
        let mut rng = StdRng::seed_from_u64(0);
        let noise = Normal::new(0.0, 0.05).unwrap();
        let mut updates = 0;
        while updates < 200 {
            let derivs = (c.values() - &minimum) * curvature
                + Array1::from_shape_fn(3, |_| noise.sample(&mut rng));
            if optimizer.step(&[&derivs], &mut [&mut c], &[&reference]).unwrap() {
                updates += 1;
            }
        }
        assert_eq!(optimizer.iteration(), 200);
        assert_eq!(c.counter(), 200);
        assert_abs_diff_eq!(c.values(), &minimum, epsilon = 0.05);
        let averaged = optimizer.averaged_coeffs(0, &c).unwrap();
        assert_abs_diff_eq!(averaged.values(), &minimum, epsilon = 0.02);
    }

    #[test]
    fn gradient_is_mean_minus_reference() {
        let mut c = coeffs();
        let mut reference = c.zeros_like("reference");
        reference.set_values(&array![1.0, 0.0, 0.5]).unwrap();
        let settings = OptimizerSettings::new(2, StepSize::Fixed(0.1)).with_rule(UpdateRule::fake());
        let mut optimizer = optimizer(settings, &c);
        optimizer.accumulate(&[&array![1.0, 2.0, 0.0]]).unwrap();
        assert!(!optimizer.is_update_due());
        optimizer.accumulate(&[&array![3.0, 0.0, 0.0]]).unwrap();
        assert!(optimizer.is_update_due());
        optimizer.update(&mut [&mut c], &[&reference]).unwrap();
        assert_relative_eq!(optimizer.gradient(0).unwrap().values(), &array![1.0, 1.0, -0.5]);
        assert_eq!(c.values(), &Array1::<f64>::zeros(3));
        assert_eq!(c.counter(), 0);
        assert_eq!(optimizer.iteration(), 1);
        assert_eq!(optimizer.samples(), 0);
    }

    #[test]
    fn hessian_estimate() {
        let mut c = coeffs();
        let reference = c.zeros_like("reference");
        let settings = OptimizerSettings::new(2, StepSize::Fixed(0.1))
            .with_rule(UpdateRule::fake())
            .with_hessian(HessianMode::Full);
        let mut optimizer = optimizer(settings, &c);
        optimizer.accumulate(&[&array![1.0, 1.0, 0.0]]).unwrap();
        optimizer.accumulate(&[&array![3.0, -1.0, 0.0]]).unwrap();
        optimizer.update(&mut [&mut c], &[&reference]).unwrap();
        let hessian = optimizer.hessian(0).unwrap();
        // covariance [[1, -1], [-1, 1]] divided by kT = 2
        assert_relative_eq!(hessian.get(0, 0).unwrap(), 0.5);
        assert_relative_eq!(hessian.get(0, 1).unwrap(), -0.5);
        assert_relative_eq!(hessian.get(1, 1).unwrap(), 0.5);
        assert_abs_diff_eq!(hessian.get(2, 2).unwrap(), 0.0);
    }

    #[test]
    fn masked_entries_are_kept() {
        let mut c = coeffs();
        c.set(&[1], 0.7).unwrap();
        c.set_active(&[1], false).unwrap();
        let reference = c.zeros_like("reference");
        let mut optimizer = optimizer(OptimizerSettings::new(1, StepSize::Fixed(1.0)), &c);
        for _ in 0..5 {
            optimizer
                .step(&[&array![1.0, 1.0, 1.0]], &mut [&mut c], &[&reference])
                .unwrap();
        }
        assert_eq!(c.at(&[1]).unwrap(), 0.7);
        assert_relative_eq!(c.at(&[0]).unwrap(), -5.0);
    }

    #[test]
    fn configuration_errors() {
        let c = coeffs();
        let new = |settings: OptimizerSettings, kbt: f64| {
            Optimizer::new(settings, kbt, &[&c], Box::new(SingleReplica))
        };
        let settings = OptimizerSettings::new(1, StepSize::Fixed(0.1));
        assert!(matches!(
            new(settings.clone().with_rule(UpdateRule::averaged_sgd()), 1.0),
            Err(OptimizerError::HessianRequired("AveragedSgd"))
        ));
        assert!(matches!(
            new(OptimizerSettings::new(0, StepSize::Fixed(0.1)), 1.0),
            Err(OptimizerError::InvalidSetting(_))
        ));
        assert!(matches!(
            new(OptimizerSettings::new(1, StepSize::Fixed(-0.1)), 1.0),
            Err(OptimizerError::InvalidSetting(_))
        ));
        assert!(matches!(
            new(settings.clone(), 0.0),
            Err(OptimizerError::InvalidSetting(_))
        ));
        assert!(matches!(
            Optimizer::new(settings.clone(), 1.0, &[], Box::new(SingleReplica)),
            Err(OptimizerError::InvalidSetting(_))
        ));

        let mut optimizer = new(settings, 1.0).unwrap();
        assert!(matches!(optimizer.hessian(0), Err(OptimizerError::HessianNotEnabled)));
        assert!(matches!(optimizer.gradient(1), Err(OptimizerError::NoComponent(1))));
        let mut c = coeffs();
        let reference = c.zeros_like("reference");
        assert!(matches!(
            optimizer.update(&mut [&mut c], &[&reference]),
            Err(OptimizerError::NoSamples)
        ));
        assert!(matches!(
            optimizer.accumulate(&[&array![1.0, 2.0]]),
            Err(OptimizerError::Coeffs(_))
        ));
        assert!(matches!(
            optimizer.accumulate(&[]),
            Err(OptimizerError::ComponentCount {
                expected: 1,
                actual: 0
            })
        ));
    }

    fn run_replicas(multiple_walkers: bool) -> Vec<Array1<f64>> {
        let local_gradients = [array![1.0, 0.0, 2.0], array![3.0, -2.0, 0.0]];
        thread::scope(|s| {
            let handles: Vec<_> = ThreadReplicas::group(2)
                .into_iter()
                .zip(local_gradients.iter())
                .map(|(replica, gradient)| {
                    s.spawn(move || {
                        let mut c = coeffs();
                        let reference = c.zeros_like("reference");
                        let settings = OptimizerSettings::new(1, StepSize::Fixed(1.0))
                            .with_hessian(HessianMode::Diagonal)
                            .with_multiple_walkers(multiple_walkers);
                        let mut optimizer =
                            Optimizer::new(settings, 1.0, &[&c], Box::new(replica)).unwrap();
                        for _ in 0..3 {
                            optimizer
                                .step(&[gradient], &mut [&mut c], &[&reference])
                                .unwrap();
                        }
                        c.values().clone()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        })
    }

    #[test]
    fn replica_averaging() {
        for values in run_replicas(true) {
            assert_relative_eq!(values, array![-6.0, 3.0, -3.0]);
        }
    }

    #[test]
    fn independent_replicas() {
        let values = run_replicas(false);
        assert_relative_eq!(values[0], array![-3.0, 0.0, -6.0]);
        assert_relative_eq!(values[1], array![-9.0, 6.0, 0.0]);
    }

    /// Averages nothing and fails from the second reduction on
    #[derive(Debug, Default)]
    struct FailingReplica {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl ReplicaCommunicator for FailingReplica {
        fn participants(&self) -> usize {
            2
        }

        fn rank(&self) -> usize {
            0
        }

        fn sum_average(&self, _buffer: &mut [f64]) -> Result<(), CommunicationError> {
            match self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) {
                0 => Ok(()),
                _ => Err(CommunicationError::Aborted { rank: 1 }),
            }
        }
    }

    #[test]
    fn failed_reduction_keeps_state() {
        let mut c = coeffs();
        let reference = c.zeros_like("reference");
        let settings = OptimizerSettings::new(2, StepSize::Fixed(0.5))
            .with_hessian(HessianMode::Diagonal)
            .with_multiple_walkers(true);
        let mut optimizer =
            Optimizer::new(settings, 2.0, &[&c], Box::new(FailingReplica::default())).unwrap();
        for derivs in [array![1.0, 0.0, 2.0], array![3.0, 0.0, 2.0]] {
            optimizer.step(&[&derivs], &mut [&mut c], &[&reference]).unwrap();
        }
        let gradient = optimizer.gradient(0).unwrap().clone();
        let hessian = optimizer.hessian(0).unwrap().clone();
        let values = c.values().clone();

        optimizer.accumulate(&[&array![5.0, 5.0, 5.0]]).unwrap();
        optimizer.accumulate(&[&array![7.0, 7.0, 7.0]]).unwrap();
        assert!(matches!(
            optimizer.update(&mut [&mut c], &[&reference]),
            Err(OptimizerError::Communication(CommunicationError::Aborted { rank: 1 }))
        ));
        assert_eq!(optimizer.gradient(0).unwrap(), &gradient);
        assert_eq!(optimizer.hessian(0).unwrap(), &hessian);
        assert_eq!(c.values(), &values);
        assert_eq!(optimizer.iteration(), 1);
        assert_eq!(optimizer.samples(), 2);
    }

    #[test]
    fn checkpoint_round_trip() {
        let path = test_dir("optimizer-checkpoint").join("coeffs.data");
        let mut c = coeffs();
        let reference = c.zeros_like("reference");
        let settings = OptimizerSettings::new(1, StepSize::Fixed(0.5));
        let mut first = optimizer(settings.clone(), &c);
        for derivs in [array![1.0, 0.0, 0.0], array![0.0, 2.0, 0.0], array![0.0, 0.0, 4.0]] {
            first.step(&[&derivs], &mut [&mut c], &[&reference]).unwrap();
        }
        first.write_checkpoint(0, &c, &path).unwrap();

        let mut restored = coeffs();
        let mut restarted = optimizer(settings, &restored);
        restarted.restore_checkpoint(0, &mut restored, &path).unwrap();
        assert_eq!(restarted.iteration(), 3);
        assert_eq!(restored.values(), c.values());
        assert_eq!(
            restarted.averaged_coeffs(0, &restored).unwrap().values(),
            first.averaged_coeffs(0, &c).unwrap().values()
        );
    }
}
