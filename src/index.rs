use crate::error::IndexError;

use serde::{Deserialize, Serialize};

/// Bijective mapping between multi-indices and flat offsets
///
/// The mapping is a mixed-radix encoding with the shape as the radix vector, the last dimension
/// varies fastest. The same order is used for coefficient storage, coefficient files and grids.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "IndexMapParameters", into = "IndexMapParameters")]
pub struct IndexMap {
    shape: Vec<usize>,
    strides: Vec<usize>,
    size: usize,
}

impl IndexMap {
    pub fn new(shape: Vec<usize>) -> Result<Self, IndexError> {
        if shape.is_empty() {
            return Err(IndexError::NoDimensions);
        }
        if let Some(dim) = shape.iter().position(|&n| n == 0) {
            return Err(IndexError::EmptyDimension(dim));
        }
        let mut strides = vec![1; shape.len()];
        for k in (0..shape.len() - 1).rev() {
            strides[k] = strides[k + 1] * shape[k + 1];
        }
        let size = strides[0] * shape[0];
        Ok(Self {
            shape,
            strides,
            size,
        })
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Total number of elements
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    fn check_rank(&self, rank: usize) -> Result<(), IndexError> {
        if rank == self.ndim() {
            Ok(())
        } else {
            Err(IndexError::WrongRank {
                expected: self.ndim(),
                actual: rank,
            })
        }
    }

    pub fn flatten(&self, index: &[usize]) -> Result<usize, IndexError> {
        self.check_rank(index.len())?;
        index
            .iter()
            .zip(self.shape.iter().zip(self.strides.iter()))
            .enumerate()
            .try_fold(0, |flat, (dim, (&i, (&size, &stride)))| {
                if i < size {
                    Ok(flat + i * stride)
                } else {
                    Err(IndexError::OutOfRange {
                        dim,
                        index: i,
                        size,
                    })
                }
            })
    }

    pub fn unflatten(&self, flat: usize) -> Result<Vec<usize>, IndexError> {
        let mut index = vec![0; self.ndim()];
        self.unflatten_into(flat, &mut index)?;
        Ok(index)
    }

    pub fn unflatten_into(&self, flat: usize, index: &mut [usize]) -> Result<(), IndexError> {
        self.check_rank(index.len())?;
        if flat >= self.size {
            return Err(IndexError::FlatOutOfRange {
                index: flat,
                size: self.size,
            });
        }
        let mut rest = flat;
        for (i, &stride) in index.iter_mut().zip(self.strides.iter()) {
            *i = rest / stride;
            rest %= stride;
        }
        Ok(())
    }

    /// Move a valid multi-index to the next one in flat order
    ///
    /// Returns `false` when the index wraps around to all zeros.
    pub fn advance(&self, index: &mut [usize]) -> bool {
        for (i, &size) in index.iter_mut().zip(self.shape.iter()).rev() {
            *i += 1;
            if *i < size {
                return true;
            }
            *i = 0;
        }
        false
    }

    /// Iterator over all multi-indices in flat order
    pub fn iter(&self) -> MultiIndexIter<'_> {
        MultiIndexIter {
            map: self,
            next: Some(vec![0; self.ndim()]),
        }
    }
}

pub struct MultiIndexIter<'a> {
    map: &'a IndexMap,
    next: Option<Vec<usize>>,
}

impl Iterator for MultiIndexIter<'_> {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let mut following = current.clone();
        if self.map.advance(&mut following) {
            self.next = Some(following);
        }
        Some(current)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename = "IndexMap")]
struct IndexMapParameters {
    shape: Vec<usize>,
}

impl From<IndexMap> for IndexMapParameters {
    fn from(f: IndexMap) -> Self {
        Self { shape: f.shape }
    }
}

impl TryFrom<IndexMapParameters> for IndexMap {
    type Error = IndexError;

    fn try_from(p: IndexMapParameters) -> Result<Self, Self::Error> {
        Self::new(p.shape)
    }
}
