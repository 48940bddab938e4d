use crate::basis::{BasisFunctions, BasisFunctionsTrait};

/// Description of one coefficient-tensor dimension, taken from its basis set
#[derive(Clone, Debug, PartialEq)]
pub struct DimensionInfo {
    /// Argument name
    pub arg: String,
    /// Basis-function type
    pub kind: String,
    pub order: usize,
    pub min: f64,
    pub max: f64,
    pub periodic: bool,
    /// One label per basis function
    pub labels: Vec<String>,
}

impl DimensionInfo {
    pub fn from_basis(arg: &str, basis: &BasisFunctions) -> Self {
        let interval = basis.interval();
        Self {
            arg: arg.to_owned(),
            kind: basis.kind().to_owned(),
            order: basis.order(),
            min: interval.min(),
            max: interval.max(),
            periodic: interval.is_periodic(),
            labels: basis.labels(),
        }
    }

    /// Dimension of a given size and generic labels
    pub fn plain(arg: &str, size: usize) -> Self {
        Self {
            arg: arg.to_owned(),
            kind: "unknown".to_owned(),
            order: size.saturating_sub(1),
            min: f64::NAN,
            max: f64::NAN,
            periodic: false,
            labels: (0..size).map(|i| format!("f{i}(s)")).collect(),
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.labels.len()
    }

    /// Replace characters which would break the whitespace-separated file format
    pub(crate) fn sanitized(mut self) -> Self {
        self.arg = token(&self.arg);
        self.kind = token(&self.kind);
        self.labels = self.labels.iter().map(|label| token(label).replace(',', ";")).collect();
        self
    }
}

pub(crate) fn token(s: &str) -> String {
    if s.is_empty() {
        return "_".to_owned();
    }
    s.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}
