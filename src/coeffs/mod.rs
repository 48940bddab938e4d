//! Coefficient tensors
//!
//! [CoeffsVector] is the dense tensor of expansion coefficients, addressed through an
//! [IndexMap](crate::IndexMap). [CoeffsMatrix] is the square matrix over its flat indices used
//! for curvature estimates.

mod dimension;
pub use dimension::DimensionInfo;

mod file;

mod matrix;
pub use matrix::CoeffsMatrix;

mod vector;
pub use vector::CoeffsVector;
