use crate::target::cutoff::BiasCutoff;
use crate::target::target_distribution::TargetDistribution;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Distribution the bias is variationally optimized against
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[non_exhaustive]
pub enum TargetMode {
    /// Flat distribution over the basis intervals
    #[default]
    Uniform,
    /// Fixed distribution
    Static(TargetDistribution),
    /// $p(\mathbf{s}) \propto e^{-\beta F(\mathbf{s}) / \gamma}$ with the free energy estimated
    /// from the current bias
    WellTempered { bias_factor: f64 },
}

impl TargetMode {
    pub fn well_tempered(bias_factor: f64) -> Self {
        Self::WellTempered { bias_factor }
    }

    /// Whether the distribution depends on the bias and must be recomputed after updates
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::WellTempered { .. })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TargetSettings {
    #[serde(default)]
    pub mode: TargetMode,
    /// Points per dimension of the grid the target is evaluated on, a single value is used for
    /// every dimension. Grid-free evaluation is only possible for a uniform target without cutoff.
    #[serde(default)]
    pub grid_points: Vec<usize>,
    #[serde(default)]
    pub cutoff: Option<BiasCutoff>,
}

impl TargetSettings {
    pub fn new(mode: TargetMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_grid_points(mut self, grid_points: Vec<usize>) -> Self {
        self.grid_points = grid_points;
        self
    }

    pub fn with_cutoff(mut self, cutoff: BiasCutoff) -> Self {
        self.cutoff = Some(cutoff);
        self
    }

    pub fn is_dynamic(&self) -> bool {
        self.mode.is_dynamic() || self.cutoff.is_some()
    }

    pub fn needs_grid(&self) -> bool {
        !matches!(self.mode, TargetMode::Uniform) || self.cutoff.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_modes() {
        assert!(!TargetSettings::default().is_dynamic());
        assert!(!TargetSettings::default().needs_grid());
        let well_tempered = TargetSettings::new(TargetMode::well_tempered(10.0));
        assert!(well_tempered.is_dynamic());
        assert!(well_tempered.needs_grid());
        let cutoff = TargetSettings::default().with_cutoff(BiasCutoff::with_value(5.0).unwrap());
        assert!(cutoff.is_dynamic());
        let fixed = TargetSettings::new(TargetMode::Static(TargetDistribution::uniform()));
        assert!(!fixed.is_dynamic());
        assert!(fixed.needs_grid());
    }

    #[test]
    fn deserialization() {
        let json = r#"{"mode":{"WellTempered":{"bias_factor":5.0}},"grid_points":[100]}"#;
        let settings: TargetSettings = serde_json::from_str(json).unwrap();
        assert_eq!(
            settings,
            TargetSettings::new(TargetMode::well_tempered(5.0)).with_grid_points(vec![100])
        );
        let settings: TargetSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, TargetSettings::default());
    }
}
