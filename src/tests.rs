pub use crate::basis::{BasisFunctions, BasisFunctionsTrait, DEFAULT_INTEGRATION_BINS};

pub use approx::{assert_abs_diff_eq, assert_relative_eq};
pub use rand::prelude::*;

/// Generate tests checking a basis set against the generic evaluation contract
#[macro_export]
macro_rules! basis_contract_test {
    ($basis: expr_2021 $(,)?) => {
        basis_contract_test!(basis, $basis);
    };
    ($name: ident, $basis: expr_2021 $(,)?) => {
        paste::paste! {
            #[test]
            fn [<$name _sizes>]() {
                let basis: $crate::tests::BasisFunctions = $basis.into();
                $crate::tests::check_sizes(&basis);
            }

            #[test]
            fn [<$name _finite_difference_derivatives>]() {
                let basis: $crate::tests::BasisFunctions = $basis.into();
                $crate::tests::check_derivatives(&basis);
            }

            #[test]
            fn [<$name _domain_excursion>]() {
                let basis: $crate::tests::BasisFunctions = $basis.into();
                $crate::tests::check_domain_excursion(&basis);
            }

            #[test]
            fn [<$name _uniform_integrals>]() {
                let basis: $crate::tests::BasisFunctions = $basis.into();
                $crate::tests::check_uniform_integrals(&basis);
            }

            #[test]
            fn [<$name _serialization>]() {
                let basis: $crate::tests::BasisFunctions = $basis.into();
                let json = serde_json::to_string(&basis).unwrap();
                let restored: $crate::tests::BasisFunctions = serde_json::from_str(&json).unwrap();
                assert_eq!(restored, basis);
            }
        }
    };
}

/// Interior points of the working interval
fn interior_points(basis: &BasisFunctions) -> Vec<f64> {
    let interval = basis.interval();
    [0.1, 0.37, 0.5, 0.83]
        .iter()
        .map(|&fraction| interval.min() + fraction * interval.range())
        .collect()
}

pub fn check_sizes(basis: &BasisFunctions) {
    let size = basis.size();
    assert!(size > basis.order(), "size must exceed order");
    assert_eq!(basis.labels().len(), size, "labels have a wrong size");
    assert_eq!(
        basis.uniform_integrals().len(),
        size,
        "uniform integrals have a wrong size"
    );
    for x in interior_points(basis) {
        let result = basis.evaluate(x);
        assert!(result.inside);
        assert_eq!(result.values.len(), size);
        assert_eq!(result.derivs.len(), size);
        assert_eq!(result.values[0], 1.0, "first basis function must be constant");
        assert_eq!(result.derivs[0], 0.0);
    }
}

pub fn check_derivatives(basis: &BasisFunctions) {
    let eps = 1e-6 * basis.interval().range();
    for x in interior_points(basis) {
        let result = basis.evaluate(x);
        let plus = basis.evaluate(x + eps);
        let minus = basis.evaluate(x - eps);
        for i in 0..basis.size() {
            let numerical = (plus.values[i] - minus.values[i]) / (2.0 * eps);
            assert_relative_eq!(
                result.derivs[i],
                numerical,
                epsilon = 1e-6,
                max_relative = 1e-5
            );
        }
    }
}

pub fn check_domain_excursion(basis: &BasisFunctions) {
    let interval = basis.interval();
    let outside = [
        interval.max() + 0.01 * interval.range(),
        interval.min() - 0.01 * interval.range(),
    ];
    for x in outside {
        let result = basis.evaluate(x);
        assert!(!result.inside, "argument {x} must be outside");
        assert!(result.derivs.iter().all(|&d| d == 0.0));
        assert!(result.values.iter().all(|v| v.is_finite()));
        assert!(result.arg_t >= interval.intrinsic_min());
        assert!(result.arg_t <= interval.intrinsic_max());
    }
}

pub fn check_uniform_integrals(basis: &BasisFunctions) {
    let numerical = basis.numerical_uniform_integrals(DEFAULT_INTEGRATION_BINS);
    assert_relative_eq!(basis.uniform_integrals()[0], 1.0);
    for (analytic, numerical) in basis.uniform_integrals().iter().zip(numerical.iter()) {
        assert_abs_diff_eq!(analytic, numerical, epsilon = 1e-4);
    }
}
