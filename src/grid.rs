//! Regular grids used for target distributions and diagnostic output

use crate::error::GridError;
use crate::index::IndexMap;

use ndarray::{Array1, Array2, ArrayView1};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// One dimension of a [Grid]
///
/// Periodic axes do not contain the `max` node, it is the image of `min`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GridAxis {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub points: usize,
    #[serde(default)]
    pub periodic: bool,
}

impl GridAxis {
    pub fn new(name: &str, min: f64, max: f64, points: usize, periodic: bool) -> Self {
        Self {
            name: name.to_owned(),
            min,
            max,
            points,
            periodic,
        }
    }

    fn validate(&self, dim: usize) -> Result<(), GridError> {
        if !(self.min.is_finite() && self.max.is_finite() && self.min < self.max) {
            return Err(GridError::InvalidBounds {
                dim,
                min: self.min,
                max: self.max,
            });
        }
        let minimum = if self.periodic { 1 } else { 2 };
        if self.points < minimum {
            return Err(GridError::TooFewPoints {
                dim,
                points: self.points,
                minimum,
            });
        }
        Ok(())
    }

    /// Distance between neighbouring nodes
    pub fn spacing(&self) -> f64 {
        if self.periodic {
            (self.max - self.min) / self.points as f64
        } else {
            (self.max - self.min) / (self.points - 1) as f64
        }
    }

    #[inline]
    pub fn coordinate(&self, i: usize) -> f64 {
        self.min + self.spacing() * i as f64
    }

    /// Trapezoid weight of node `i`, periodic axes weight all nodes equally
    fn weight(&self, i: usize) -> f64 {
        let h = self.spacing();
        if !self.periodic && (i == 0 || i + 1 == self.points) {
            0.5 * h
        } else {
            h
        }
    }
}

/// Scalar field sampled on a regular grid, with optional gradient columns
///
/// Nodes are ordered by an [IndexMap] over the per-axis point counts, the last axis varies
/// fastest.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    label: String,
    axes: Vec<GridAxis>,
    index: IndexMap,
    values: Array1<f64>,
    derivs: Option<Array2<f64>>,
}

impl Grid {
    pub fn new(label: &str, axes: Vec<GridAxis>, with_derivatives: bool) -> Result<Self, GridError> {
        for (dim, axis) in axes.iter().enumerate() {
            axis.validate(dim)?;
        }
        let index = IndexMap::new(axes.iter().map(|axis| axis.points).collect())?;
        let size = index.size();
        let derivs = with_derivatives.then(|| Array2::zeros((size, axes.len())));
        Ok(Self {
            label: label.to_owned(),
            axes,
            index,
            values: Array1::zeros(size),
            derivs,
        })
    }

    /// Empty grid with the same geometry
    pub fn zeros_like(&self, label: &str) -> Self {
        Self {
            label: label.to_owned(),
            axes: self.axes.clone(),
            index: self.index.clone(),
            values: Array1::zeros(self.size()),
            derivs: self.derivs.as_ref().map(|d| Array2::zeros(d.raw_dim())),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn axes(&self) -> &[GridAxis] {
        &self.axes
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.axes.len()
    }

    /// Number of nodes
    #[inline]
    pub fn size(&self) -> usize {
        self.index.size()
    }

    pub fn index_map(&self) -> &IndexMap {
        &self.index
    }

    pub fn has_derivatives(&self) -> bool {
        self.derivs.is_some()
    }

    /// Coordinates of a node
    pub fn point(&self, flat: usize) -> Result<Vec<f64>, GridError> {
        let mut point = vec![0.0; self.ndim()];
        self.point_into(flat, &mut point)?;
        Ok(point)
    }

    pub fn point_into(&self, flat: usize, point: &mut [f64]) -> Result<(), GridError> {
        if point.len() != self.ndim() {
            return Err(GridError::DimensionCount(point.len(), self.ndim()));
        }
        let index = self.index.unflatten(flat)?;
        for ((x, &i), axis) in point.iter_mut().zip(index.iter()).zip(self.axes.iter()) {
            *x = axis.coordinate(i);
        }
        Ok(())
    }

    /// Coordinates of all nodes in flat order
    pub fn points(&self) -> impl Iterator<Item = Vec<f64>> + '_ {
        self.index.iter().map(move |index| {
            index
                .iter()
                .zip(self.axes.iter())
                .map(|(&i, axis)| axis.coordinate(i))
                .collect()
        })
    }

    /// Product of per-axis trapezoid weights, the weights sum to the grid volume
    pub fn integration_weights(&self) -> Array1<f64> {
        self.index
            .iter()
            .map(|index| {
                index
                    .iter()
                    .zip(self.axes.iter())
                    .map(|(&i, axis)| axis.weight(i))
                    .product::<f64>()
            })
            .collect()
    }

    /// Volume of the grid domain
    pub fn volume(&self) -> f64 {
        self.axes.iter().map(|axis| axis.max - axis.min).product()
    }

    #[inline]
    pub fn values(&self) -> ArrayView1<f64> {
        self.values.view()
    }

    #[inline]
    pub fn values_mut(&mut self) -> &mut Array1<f64> {
        &mut self.values
    }

    pub fn value(&self, flat: usize) -> Option<f64> {
        self.values.get(flat).copied()
    }

    pub fn set_value(&mut self, flat: usize, value: f64) -> Result<(), GridError> {
        let size = self.size();
        let slot = self
            .values
            .get_mut(flat)
            .ok_or(crate::error::IndexError::FlatOutOfRange { index: flat, size })?;
        *slot = value;
        Ok(())
    }

    /// Gradient columns, one row per node
    pub fn derivs(&self) -> Option<&Array2<f64>> {
        self.derivs.as_ref()
    }

    pub fn derivs_mut(&mut self) -> Option<&mut Array2<f64>> {
        self.derivs.as_mut()
    }

    pub fn set_derivs(&mut self, flat: usize, derivs: &[f64]) -> Result<(), GridError> {
        let ndim = self.ndim();
        if derivs.len() != ndim {
            return Err(GridError::DimensionCount(derivs.len(), ndim));
        }
        let size = self.size();
        if flat >= size {
            return Err(crate::error::IndexError::FlatOutOfRange { index: flat, size }.into());
        }
        if let Some(d) = self.derivs.as_mut() {
            d.row_mut(flat)
                .iter_mut()
                .zip(derivs.iter())
                .for_each(|(x, &y)| *x = y);
        }
        Ok(())
    }

    /// Trapezoid integral of the values over the grid domain
    pub fn integrate(&self) -> f64 {
        self.integration_weights().dot(&self.values)
    }

    /// Scale values so that they integrate to one, returns the original integral
    pub fn normalize(&mut self) -> Result<f64, GridError> {
        let norm = self.integrate();
        if !(norm.is_finite() && norm > 0.0) {
            return Err(GridError::ZeroNormalization(norm));
        }
        self.scale(norm.recip());
        Ok(norm)
    }

    pub fn scale(&mut self, alpha: f64) {
        self.values *= alpha;
        if let Some(d) = self.derivs.as_mut() {
            *d *= alpha;
        }
    }

    pub fn minimum(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn maximum(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Shift values so that the smallest one is zero
    pub fn set_min_to_zero(&mut self) {
        let min = self.minimum();
        if min.is_finite() {
            self.values -= min;
        }
    }

    /// Text output: `#! FIELDS` and `#! SET` headers, then one node per line
    ///
    /// For multi-dimensional grids a blank line separates blocks of the last axis.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        write!(writer, "#! FIELDS")?;
        for axis in self.axes.iter() {
            write!(writer, " {}", axis.name)?;
        }
        write!(writer, " {}", self.label)?;
        if self.derivs.is_some() {
            for axis in self.axes.iter() {
                write!(writer, " der_{}", axis.name)?;
            }
        }
        writeln!(writer)?;
        for axis in self.axes.iter() {
            crate::io::write_set(writer, &format!("min_{}", axis.name), axis.min)?;
            crate::io::write_set(writer, &format!("max_{}", axis.name), axis.max)?;
            crate::io::write_set(writer, &format!("nbins_{}", axis.name), axis.points)?;
            crate::io::write_set(writer, &format!("periodic_{}", axis.name), axis.periodic)?;
        }
        let last_points = self.axes.last().map_or(1, |axis| axis.points);
        for (flat, point) in self.points().enumerate() {
            if self.ndim() > 1 && flat > 0 && flat % last_points == 0 {
                writeln!(writer)?;
            }
            for x in point.iter() {
                write!(writer, "{x:>24.16e}")?;
            }
            write!(writer, " {:>24.16e}", self.values[flat])?;
            if let Some(d) = self.derivs.as_ref() {
                for x in d.row(flat).iter() {
                    write!(writer, " {x:>24.16e}")?;
                }
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    /// Write through a temporary file which replaces `path` when complete
    pub fn write_to_path(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        crate::io::write_atomically::<std::io::Error, _>(path.as_ref(), |writer| {
            self.write_to(writer)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IndexError;

    use approx::assert_relative_eq;

    fn grid_2d() -> Grid {
        Grid::new(
            "bias",
            vec![
                GridAxis::new("s1", -1.0, 1.0, 5, false),
                GridAxis::new("s2", 0.0, 2.0, 4, true),
            ],
            true,
        )
        .unwrap()
    }

    #[test]
    fn spacing() {
        let grid = grid_2d();
        assert_relative_eq!(grid.axes()[0].spacing(), 0.5);
        assert_relative_eq!(grid.axes()[1].spacing(), 0.5);
        assert_eq!(grid.size(), 20);
        assert_eq!(grid.point(0).unwrap(), vec![-1.0, 0.0]);
        assert_eq!(grid.point(7).unwrap(), vec![-0.5, 1.5]);
        assert_eq!(grid.point(19).unwrap(), vec![1.0, 1.5]);
        assert_eq!(grid.points().nth(7).unwrap(), vec![-0.5, 1.5]);
    }

    #[test]
    fn weights_sum_to_volume() {
        let grid = grid_2d();
        assert_relative_eq!(grid.integration_weights().sum(), grid.volume(), max_relative = 1e-14);
        assert_relative_eq!(grid.volume(), 4.0);
    }

    #[test]
    fn normalize() {
        let mut grid = grid_2d();
        grid.values_mut().fill(3.0);
        let norm = grid.normalize().unwrap();
        assert_relative_eq!(norm, 12.0, max_relative = 1e-14);
        assert_relative_eq!(grid.integrate(), 1.0, max_relative = 1e-14);
    }

    #[test]
    fn zero_normalization() {
        let mut grid = grid_2d();
        assert_eq!(grid.normalize(), Err(GridError::ZeroNormalization(0.0)));
    }

    #[test]
    fn min_to_zero() {
        let mut grid = grid_2d();
        for flat in 0..grid.size() {
            grid.set_value(flat, flat as f64 - 3.0).unwrap();
        }
        assert_eq!(grid.minimum(), -3.0);
        assert_eq!(grid.maximum(), 16.0);
        grid.set_min_to_zero();
        assert_eq!(grid.minimum(), 0.0);
        assert_eq!(grid.value(19), Some(19.0));
    }

    #[test]
    fn invalid_axes() {
        assert_eq!(
            Grid::new("g", vec![GridAxis::new("s", 1.0, 1.0, 10, false)], false),
            Err(GridError::InvalidBounds {
                dim: 0,
                min: 1.0,
                max: 1.0
            })
        );
        assert_eq!(
            Grid::new("g", vec![GridAxis::new("s", 0.0, 1.0, 1, false)], false),
            Err(GridError::TooFewPoints {
                dim: 0,
                points: 1,
                minimum: 2
            })
        );
        assert_eq!(
            Grid::new("g", vec![], false),
            Err(GridError::Index(IndexError::NoDimensions))
        );
    }

    #[test]
    fn text_output() {
        let mut grid = Grid::new(
            "fes",
            vec![
                GridAxis::new("s1", 0.0, 1.0, 2, false),
                GridAxis::new("s2", 0.0, 1.0, 2, false),
            ],
            false,
        )
        .unwrap();
        grid.values_mut().fill(1.0);
        let mut buffer = Vec::new();
        grid.write_to(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "#! FIELDS s1 s2 fes");
        assert_eq!(lines[1], "#! SET min_s1 0");
        assert_eq!(lines[3], "#! SET nbins_s1 2");
        assert_eq!(lines[4], "#! SET periodic_s1 false");
        // header, two records, blank separator, two records
        assert_eq!(lines.len(), 9 + 5);
        assert_eq!(lines[11], "");
        let record: Vec<f64> = lines[12]
            .split_whitespace()
            .map(|x| x.parse().unwrap())
            .collect();
        assert_eq!(record, vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn atomic_write() {
        let path = crate::io::test_dir("grid").join("bias.grid");
        let grid = grid_2d();
        grid.write_to_path(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("#! FIELDS s1 s2 bias der_s1 der_s2\n"));
    }
}
