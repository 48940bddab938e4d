use crate::coeffs::vector::CoeffsVector;
use crate::error::{CoeffsError, IndexError};

use itertools::Either;
use ndarray::{Array1, Array2, ArrayView1, Zip};
use std::io::Write;

#[derive(Clone, Debug, PartialEq)]
enum Storage {
    Diagonal(Array1<f64>),
    Full(Array2<f64>),
}

/// Square matrix over the flat indices of a [CoeffsVector], used for Hessian estimates
///
/// Diagonal matrices store only the diagonal, off-diagonal elements read as zero and cannot be
/// written.
#[derive(Clone, Debug, PartialEq)]
pub struct CoeffsMatrix {
    label: String,
    vector_shape: Vec<usize>,
    storage: Storage,
}

impl CoeffsMatrix {
    pub fn new(label: &str, vector: &CoeffsVector, diagonal: bool) -> Self {
        let n = vector.size();
        let storage = if diagonal {
            Storage::Diagonal(Array1::zeros(n))
        } else {
            Storage::Full(Array2::zeros((n, n)))
        };
        Self {
            label: label.to_owned(),
            vector_shape: vector.shape().to_vec(),
            storage,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Shape of the coefficient tensor the matrix acts on
    pub fn vector_shape(&self) -> &[usize] {
        &self.vector_shape
    }

    /// Number of rows and columns
    pub fn size(&self) -> usize {
        match &self.storage {
            Storage::Diagonal(d) => d.len(),
            Storage::Full(m) => m.nrows(),
        }
    }

    pub fn is_diagonal(&self) -> bool {
        matches!(self.storage, Storage::Diagonal(_))
    }

    fn check_element(&self, row: usize, col: usize) -> Result<(), CoeffsError> {
        for index in [row, col] {
            if index >= self.size() {
                return Err(IndexError::FlatOutOfRange {
                    index,
                    size: self.size(),
                }
                .into());
            }
        }
        Ok(())
    }

    pub fn get(&self, row: usize, col: usize) -> Result<f64, CoeffsError> {
        self.check_element(row, col)?;
        Ok(match &self.storage {
            Storage::Diagonal(d) => {
                if row == col {
                    d[row]
                } else {
                    0.0
                }
            }
            Storage::Full(m) => m[(row, col)],
        })
    }

    fn element_mut(&mut self, row: usize, col: usize) -> Result<&mut f64, CoeffsError> {
        self.check_element(row, col)?;
        match &mut self.storage {
            Storage::Diagonal(d) if row == col => Ok(&mut d[row]),
            Storage::Diagonal(_) => Err(CoeffsError::OffDiagonal { row, col }),
            Storage::Full(m) => Ok(&mut m[(row, col)]),
        }
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<(), CoeffsError> {
        *self.element_mut(row, col)? = value;
        Ok(())
    }

    pub fn add_to(&mut self, row: usize, col: usize, delta: f64) -> Result<(), CoeffsError> {
        *self.element_mut(row, col)? += delta;
        Ok(())
    }

    pub fn diagonal(&self) -> Array1<f64> {
        match &self.storage {
            Storage::Diagonal(d) => d.clone(),
            Storage::Full(m) => m.diag().to_owned(),
        }
    }

    /// `self += weight * v v^T`, only the diagonal for diagonal matrices
    pub fn add_outer_product(&mut self, v: ArrayView1<f64>, weight: f64) -> Result<(), CoeffsError> {
        if v.len() != self.size() {
            return Err(CoeffsError::shape_mismatch(&[self.size()], &[v.len()]));
        }
        match &mut self.storage {
            Storage::Diagonal(d) => {
                Zip::from(d).and(&v).for_each(|d, &x| *d += weight * x * x);
            }
            Storage::Full(m) => {
                for (mut row, &x) in m.rows_mut().into_iter().zip(v.iter()) {
                    row.scaled_add(weight * x, &v);
                }
            }
        }
        Ok(())
    }

    pub fn scale(&mut self, alpha: f64) {
        match &mut self.storage {
            Storage::Diagonal(d) => *d *= alpha,
            Storage::Full(m) => *m *= alpha,
        }
    }

    pub fn fill(&mut self, value: f64) {
        match &mut self.storage {
            Storage::Diagonal(d) => d.fill(value),
            Storage::Full(m) => m.fill(value),
        }
    }

    /// `self += alpha * other`, both matrices must have the same size and storage
    pub fn scaled_add(&mut self, alpha: f64, other: &Self) -> Result<(), CoeffsError> {
        let (left, right) = (self.storage_shape(), other.storage_shape());
        match (&mut self.storage, &other.storage) {
            (Storage::Diagonal(a), Storage::Diagonal(b)) if left == right => {
                a.scaled_add(alpha, b);
                Ok(())
            }
            (Storage::Full(a), Storage::Full(b)) if left == right => {
                a.scaled_add(alpha, b);
                Ok(())
            }
            _ => Err(CoeffsError::shape_mismatch(&left, &right)),
        }
    }

    fn storage_shape(&self) -> Vec<usize> {
        match &self.storage {
            Storage::Diagonal(d) => vec![d.len()],
            Storage::Full(m) => vec![m.nrows(), m.ncols()],
        }
    }

    /// Matrix-vector product with coefficient values
    pub fn dot(&self, v: &CoeffsVector) -> Result<Array1<f64>, CoeffsError> {
        if v.shape() != self.vector_shape() {
            return Err(CoeffsError::shape_mismatch(self.vector_shape(), v.shape()));
        }
        Ok(match &self.storage {
            Storage::Diagonal(d) => d * v.values(),
            Storage::Full(m) => m.dot(v.values()),
        })
    }

    /// Stored elements in a fixed order, used to pack matrices into communication buffers
    pub fn stored(&self) -> impl Iterator<Item = &f64> {
        match &self.storage {
            Storage::Diagonal(d) => Either::Left(d.iter()),
            Storage::Full(m) => Either::Right(m.iter()),
        }
    }

    pub fn stored_mut(&mut self) -> impl Iterator<Item = &mut f64> {
        match &mut self.storage {
            Storage::Diagonal(d) => Either::Left(d.iter_mut()),
            Storage::Full(m) => Either::Right(m.iter_mut()),
        }
    }

    pub fn stored_len(&self) -> usize {
        match &self.storage {
            Storage::Diagonal(d) => d.len(),
            Storage::Full(m) => m.len(),
        }
    }

    /// Write one `row col value` record per stored element
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CoeffsError> {
        writeln!(writer, "#! FIELDS idx_row idx_col {}", self.label)?;
        crate::io::write_set(writer, "diagonal", self.is_diagonal())?;
        crate::io::write_set(writer, "size", self.size())?;
        match &self.storage {
            Storage::Diagonal(d) => {
                for (i, x) in d.iter().enumerate() {
                    writeln!(writer, "{i:>6} {i:>6} {x:>24.16e}")?;
                }
            }
            Storage::Full(m) => {
                for ((row, col), x) in m.indexed_iter() {
                    writeln!(writer, "{row:>6} {col:>6} {x:>24.16e}")?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::BasisFunctions;

    use approx::assert_relative_eq;
    use ndarray::array;

    fn vector() -> CoeffsVector {
        let basis = [BasisFunctions::legendre(2, -1.0, 1.0).unwrap()];
        CoeffsVector::from_basis("c", &["s"], &basis).unwrap()
    }

    #[test]
    fn full_outer_product() {
        let mut m = CoeffsMatrix::new("hessian", &vector(), false);
        m.add_outer_product(array![1.0, 2.0, 3.0].view(), 0.5).unwrap();
        assert_relative_eq!(m.get(1, 2).unwrap(), 3.0);
        assert_relative_eq!(m.get(2, 1).unwrap(), 3.0);
        assert_relative_eq!(m.diagonal(), array![0.5, 2.0, 4.5]);
    }

    #[test]
    fn diagonal_storage() {
        let mut m = CoeffsMatrix::new("hessian", &vector(), true);
        m.add_outer_product(array![1.0, 2.0, 3.0].view(), 1.0).unwrap();
        assert_eq!(m.get(0, 1).unwrap(), 0.0);
        assert_eq!(m.get(2, 2).unwrap(), 9.0);
        assert!(matches!(m.set(0, 1, 1.0), Err(CoeffsError::OffDiagonal { row: 0, col: 1 })));
        assert_eq!(m.stored_len(), 3);
    }

    #[test]
    fn dot() {
        let mut v = vector();
        v.set_values(&array![1.0, -1.0, 2.0]).unwrap();
        let mut m = CoeffsMatrix::new("m", &v, false);
        m.set(0, 0, 2.0).unwrap();
        m.set(0, 2, 1.0).unwrap();
        m.set(2, 1, 3.0).unwrap();
        assert_relative_eq!(m.dot(&v).unwrap(), array![4.0, 0.0, -3.0]);
    }

    #[test]
    fn mismatched_storage() {
        let mut a = CoeffsMatrix::new("a", &vector(), false);
        let b = CoeffsMatrix::new("b", &vector(), true);
        assert!(matches!(a.scaled_add(1.0, &b), Err(CoeffsError::ShapeMismatch { .. })));
        assert!(matches!(a.get(3, 0), Err(CoeffsError::Index(_))));
    }
}
