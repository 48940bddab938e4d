use crate::basis::{BasisFunctions, BasisParameters, BasisRegistry};
use crate::error::BasisError;
use crate::optimizer::OptimizerSettings;
use crate::target::TargetSettings;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Basis-function family and its parameters, the family is resolved by a [BasisRegistry]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BasisSettings {
    /// Registry keyword, e.g. `BF_LEGENDRE`
    pub keyword: String,
    pub order: usize,
    pub interval_min: f64,
    pub interval_max: f64,
}

impl BasisSettings {
    pub fn new(keyword: &str, order: usize, interval_min: f64, interval_max: f64) -> Self {
        Self {
            keyword: keyword.to_owned(),
            order,
            interval_min,
            interval_max,
        }
    }

    pub fn build(&self, registry: &BasisRegistry) -> Result<BasisFunctions, BasisError> {
        registry.create(
            &self.keyword,
            &BasisParameters {
                order: self.order,
                interval_min: self.interval_min,
                interval_max: self.interval_max,
            },
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ArgumentSettings {
    pub name: String,
    pub basis: BasisSettings,
}

impl ArgumentSettings {
    pub fn new(name: &str, basis: BasisSettings) -> Self {
        Self {
            name: name.to_owned(),
            basis,
        }
    }
}

fn default_label() -> String {
    "bias".to_owned()
}

fn default_target_update_stride() -> u64 {
    1
}

/// Configuration of a [VesBias](crate::VesBias)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VesSettings {
    #[serde(default = "default_label")]
    pub label: String,
    pub arguments: Vec<ArgumentSettings>,
    /// Thermal energy in the units of the bias
    pub kbt: f64,
    #[serde(default)]
    pub target: TargetSettings,
    /// Coefficients are never updated without an optimizer
    #[serde(default)]
    pub optimizer: Option<OptimizerSettings>,
    /// Number of optimizer iterations between recomputations of a dynamic target
    #[serde(default = "default_target_update_stride")]
    pub target_update_stride: u64,
    /// Points per dimension of the bias and free-energy grids, no grids if empty
    #[serde(default)]
    pub grid_points: Vec<usize>,
    /// Coefficient file to start from
    #[serde(default)]
    pub initial_coeffs: Option<PathBuf>,
}

impl VesSettings {
    pub fn new(arguments: Vec<ArgumentSettings>, kbt: f64) -> Self {
        Self {
            label: default_label(),
            arguments,
            kbt,
            target: TargetSettings::default(),
            optimizer: None,
            target_update_stride: default_target_update_stride(),
            grid_points: vec![],
            initial_coeffs: None,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_owned();
        self
    }

    pub fn with_target(mut self, target: TargetSettings) -> Self {
        self.target = target;
        self
    }

    pub fn with_optimizer(mut self, optimizer: OptimizerSettings) -> Self {
        self.optimizer = Some(optimizer);
        self
    }

    pub fn with_target_update_stride(mut self, stride: u64) -> Self {
        self.target_update_stride = stride;
        self
    }

    pub fn with_grid_points(mut self, grid_points: Vec<usize>) -> Self {
        self.grid_points = grid_points;
        self
    }

    pub fn with_initial_coeffs(mut self, path: impl Into<PathBuf>) -> Self {
        self.initial_coeffs = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::{HessianMode, StepSize, UpdateRule};
    use crate::target::{BiasCutoff, TargetMode, TargetSettings};

    fn settings() -> VesSettings {
        VesSettings::new(
            vec![
                ArgumentSettings::new("d1", BasisSettings::new("BF_LEGENDRE", 8, 0.0, 2.0)),
                ArgumentSettings::new("phi", BasisSettings::new("BF_FOURIER", 4, -3.0, 3.0)),
            ],
            2.49,
        )
        .with_target(
            TargetSettings::new(TargetMode::well_tempered(10.0))
                .with_grid_points(vec![40])
                .with_cutoff(BiasCutoff::with_value(20.0).unwrap()),
        )
        .with_optimizer(
            OptimizerSettings::new(500, StepSize::Fixed(0.001))
                .with_rule(UpdateRule::averaged_sgd())
                .with_hessian(HessianMode::Diagonal),
        )
        .with_target_update_stride(50)
    }

    #[test]
    fn serialization() {
        let settings = settings();
        let json = serde_json::to_string(&settings).unwrap();
        let parsed: VesSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn defaults() {
        let json = r#"{
            "arguments": [
                {"name": "s", "basis": {"keyword": "BF_CHEBYSHEV", "order": 4, "interval_min": -1.0, "interval_max": 1.0}}
            ],
            "kbt": 1.0
        }"#;
        let parsed: VesSettings = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.label, "bias");
        assert_eq!(parsed.target, TargetSettings::default());
        assert_eq!(parsed.optimizer, None);
        assert_eq!(parsed.target_update_stride, 1);
        assert!(parsed.grid_points.is_empty());
    }

    #[test]
    fn json_schema() {
        let schema = schemars::schema_for!(VesSettings);
        let json = serde_json::to_value(&schema).unwrap();
        assert!(json["properties"]["arguments"].is_object());
        assert!(json["required"]
            .as_array()
            .unwrap()
            .iter()
            .any(|name| name == "kbt"));
    }

    #[test]
    fn unknown_keyword() {
        let basis = BasisSettings::new("BF_SPLINES", 4, -1.0, 1.0);
        assert_eq!(
            basis.build(&BasisRegistry::default()),
            Err(BasisError::UnknownFamily("BF_SPLINES".to_owned()))
        );
    }
}
