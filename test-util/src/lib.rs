use include_dir::{Dir, include_dir};
use lazy_static::lazy_static;
use variational_bias::{BasisFunctions, CoeffsVector, LinearExpansion};

const COEFFS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/../test-data/coeffs");

lazy_static! {
    /// File names and contents of the coefficient-file fixtures, invalid ones have names
    /// starting with "invalid"
    pub static ref COEFFS_FILES: Vec<(String, String)> = COEFFS_DIR
        .find("*.data")
        .unwrap()
        .filter_map(|entry| entry.as_file())
        .map(|file| {
            let name = file.path().file_name().unwrap().to_string_lossy().into_owned();
            let text = file.contents_utf8().unwrap().to_owned();
            (name, text)
        })
        .collect();
}

/// Expansion in `ndim` arguments, Legendre polynomials of `order` for odd dimensions and
/// Fourier series of `order` for even ones
pub fn mixed_expansion(ndim: usize, order: usize) -> LinearExpansion {
    let basis: Vec<_> = (0..ndim)
        .map(|dim| {
            if dim % 2 == 0 {
                BasisFunctions::legendre(order, -2.0, 2.0).unwrap()
            } else {
                BasisFunctions::fourier(order, -std::f64::consts::PI, std::f64::consts::PI)
                    .unwrap()
            }
        })
        .collect();
    let names: Vec<_> = (0..ndim).map(|dim| format!("s{}", dim + 1)).collect();
    LinearExpansion::new("bias", &names, basis, 2.5).unwrap()
}

/// Deterministic coefficients decaying with the total order of the multi-index
pub fn decaying_coeffs(expansion: &LinearExpansion) -> CoeffsVector {
    let mut coeffs = expansion.new_coeffs("bias.coeffs");
    for (flat, index) in expansion.index_map().iter().enumerate() {
        let total: usize = index.iter().sum();
        coeffs.values_mut()[flat] = (-1.0f64).powi(total as i32) / (1.0 + total as f64).powi(2);
    }
    coeffs
}

/// Points spread over the working intervals of `mixed_expansion`
pub fn sample_points(ndim: usize, count: usize) -> Vec<Vec<f64>> {
    (0..count)
        .map(|i| {
            (0..ndim)
                .map(|dim| {
                    let fraction = ((i * (dim + 3) + 1) % count) as f64 / count as f64;
                    if dim % 2 == 0 {
                        -2.0 + 4.0 * fraction
                    } else {
                        std::f64::consts::PI * (2.0 * fraction - 1.0)
                    }
                })
                .collect()
        })
        .collect()
}
