use crate::basis::BasisFunctions;
use crate::coeffs::dimension::{DimensionInfo, token};
use crate::error::CoeffsError;
use crate::index::IndexMap;

use itertools::Itertools;
use ndarray::{Array1, Zip};
use std::collections::BTreeSet;

/// Dense multi-dimensional tensor of expansion coefficients
///
/// Entries are stored in a flat array ordered by [IndexMap], every dimension corresponds to
/// one basis set. The tensor carries an iteration counter, which is incremented by the optimizer
/// and persisted in coefficient files, and a mask of entries which are excluded from updates.
#[derive(Clone, Debug, PartialEq)]
pub struct CoeffsVector {
    label: String,
    dimensions: Vec<DimensionInfo>,
    index: IndexMap,
    values: Array1<f64>,
    active: Vec<bool>,
    counter: u64,
}

impl CoeffsVector {
    /// Zero-valued tensor
    pub fn new(label: &str, dimensions: Vec<DimensionInfo>) -> Result<Self, CoeffsError> {
        let dimensions: Vec<_> = dimensions.into_iter().map(DimensionInfo::sanitized).collect();
        let mut args = BTreeSet::new();
        for dim in dimensions.iter() {
            if !args.insert(dim.arg.as_str()) {
                return Err(CoeffsError::DuplicateArgument(dim.arg.clone()));
            }
        }
        let index = IndexMap::new(dimensions.iter().map(DimensionInfo::size).collect())?;
        let size = index.size();
        Ok(Self {
            label: token(label),
            dimensions,
            index,
            values: Array1::zeros(size),
            active: vec![true; size],
            counter: 0,
        })
    }

    /// Zero-valued tensor shaped after basis sets
    pub fn from_basis<S: AsRef<str>>(
        label: &str,
        args: &[S],
        basis: &[BasisFunctions],
    ) -> Result<Self, CoeffsError> {
        if args.len() != basis.len() {
            return Err(CoeffsError::DimensionCount(args.len(), basis.len()));
        }
        let dimensions = args
            .iter()
            .zip(basis.iter())
            .map(|(arg, basis)| DimensionInfo::from_basis(arg.as_ref(), basis))
            .collect();
        Self::new(label, dimensions)
    }

    /// Zero-valued tensor with the same shape and descriptions
    pub fn zeros_like(&self, label: &str) -> Self {
        Self {
            label: token(label),
            dimensions: self.dimensions.clone(),
            index: self.index.clone(),
            values: Array1::zeros(self.size()),
            active: vec![true; self.size()],
            counter: 0,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn dimensions(&self) -> &[DimensionInfo] {
        &self.dimensions
    }

    pub fn index_map(&self) -> &IndexMap {
        &self.index
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.index.ndim()
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.index.shape()
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.index.size()
    }

    #[inline]
    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    #[inline]
    pub fn values_mut(&mut self) -> &mut Array1<f64> {
        &mut self.values
    }

    pub fn set_values(&mut self, values: &Array1<f64>) -> Result<(), CoeffsError> {
        if values.len() != self.size() {
            return Err(CoeffsError::shape_mismatch(self.shape(), &[values.len()]));
        }
        self.values.assign(values);
        Ok(())
    }

    pub fn fill(&mut self, value: f64) {
        self.values.fill(value);
    }

    /// Number of accepted updates
    #[inline]
    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn set_counter(&mut self, counter: u64) {
        self.counter = counter;
    }

    pub fn increment_counter(&mut self) {
        self.counter += 1;
    }

    pub fn flatten(&self, index: &[usize]) -> Result<usize, CoeffsError> {
        Ok(self.index.flatten(index)?)
    }

    pub fn unflatten(&self, flat: usize) -> Result<Vec<usize>, CoeffsError> {
        Ok(self.index.unflatten(flat)?)
    }

    pub fn at(&self, index: &[usize]) -> Result<f64, CoeffsError> {
        Ok(self.values[self.flatten(index)?])
    }

    pub fn set(&mut self, index: &[usize], value: f64) -> Result<(), CoeffsError> {
        let flat = self.flatten(index)?;
        self.values[flat] = value;
        Ok(())
    }

    pub fn add_to(&mut self, index: &[usize], delta: f64) -> Result<(), CoeffsError> {
        let flat = self.flatten(index)?;
        self.values[flat] += delta;
        Ok(())
    }

    /// Value by flat index
    pub fn get(&self, flat: usize) -> Result<f64, CoeffsError> {
        self.check_flat(flat)?;
        Ok(self.values[flat])
    }

    fn check_flat(&self, flat: usize) -> Result<(), CoeffsError> {
        if flat < self.size() {
            Ok(())
        } else {
            Err(crate::error::IndexError::FlatOutOfRange {
                index: flat,
                size: self.size(),
            }
            .into())
        }
    }

    /// Product of per-dimension basis labels, e.g. `T1(s)*cos(2*s)`
    pub fn description(&self, flat: usize) -> Result<String, CoeffsError> {
        let index = self.unflatten(flat)?;
        Ok(self.description_of(&index))
    }

    pub(crate) fn description_of(&self, index: &[usize]) -> String {
        index
            .iter()
            .zip(self.dimensions.iter())
            .map(|(&i, dim)| dim.labels[i].as_str())
            .join("*")
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.index.iter().map(|index| self.description_of(&index)).collect()
    }

    #[inline]
    pub fn is_active(&self, flat: usize) -> bool {
        self.active.get(flat).copied().unwrap_or(false)
    }

    pub fn active_mask(&self) -> &[bool] {
        &self.active
    }

    /// Include or exclude an entry from optimizer updates
    pub fn set_active(&mut self, index: &[usize], active: bool) -> Result<(), CoeffsError> {
        let flat = self.flatten(index)?;
        self.active[flat] = active;
        Ok(())
    }

    pub fn same_shape(&self, other: &Self) -> bool {
        self.shape() == other.shape()
    }

    pub fn check_same_shape(&self, other: &Self) -> Result<(), CoeffsError> {
        if self.same_shape(other) {
            Ok(())
        } else {
            Err(CoeffsError::shape_mismatch(self.shape(), other.shape()))
        }
    }

    /// Element-wise sum, the label and the counter are taken from `self`
    pub fn add(&self, other: &Self) -> Result<Self, CoeffsError> {
        let mut result = self.clone();
        result.add_assign(other)?;
        Ok(result)
    }

    /// Element-wise difference, the label and the counter are taken from `self`
    pub fn sub(&self, other: &Self) -> Result<Self, CoeffsError> {
        let mut result = self.clone();
        result.sub_assign(other)?;
        Ok(result)
    }

    pub fn scaled(&self, alpha: f64) -> Self {
        let mut result = self.clone();
        result.scale(alpha);
        result
    }

    pub fn add_assign(&mut self, other: &Self) -> Result<(), CoeffsError> {
        self.scaled_add(1.0, other)
    }

    pub fn sub_assign(&mut self, other: &Self) -> Result<(), CoeffsError> {
        self.scaled_add(-1.0, other)
    }

    pub fn scale(&mut self, alpha: f64) {
        self.values *= alpha;
    }

    /// `self += alpha * other`
    pub fn scaled_add(&mut self, alpha: f64, other: &Self) -> Result<(), CoeffsError> {
        self.check_same_shape(other)?;
        self.values.scaled_add(alpha, &other.values);
        Ok(())
    }

    /// Move towards `target`: `self += rate * (target - self)`
    ///
    /// With `rate = 1 / (n + 1)` for the n-th call, starting from zero, `self` is the plain
    /// running mean of all targets.
    pub fn relax_towards(&mut self, target: &Self, rate: f64) -> Result<(), CoeffsError> {
        self.check_same_shape(target)?;
        Zip::from(&mut self.values)
            .and(&target.values)
            .for_each(|x, &t| *x += rate * (t - *x));
        Ok(())
    }

    /// Euclidean norm of the values
    pub fn norm(&self) -> f64 {
        self.values.dot(&self.values).sqrt()
    }
}
