use crate::basis::basis_functions::{BasisFunctions, BasisParameters};
use crate::basis::chebyshev::ChebyshevBasis;
use crate::basis::legendre::LegendreBasis;
use crate::basis::powers::PowersBasis;
use crate::basis::trigonometric::{CosineBasis, FourierBasis, SineBasis};
use crate::error::BasisError;

use std::collections::BTreeMap;

/// Function building a basis set from its parameters
pub type BasisConstructor = fn(&BasisParameters) -> Result<BasisFunctions, BasisError>;

/// Explicit mapping from family keywords to constructors
///
/// [Default] registers every built-in family, [BasisRegistry::empty] registers nothing.
/// Callers can add their own families with [BasisRegistry::register].
#[derive(Clone, Debug)]
pub struct BasisRegistry {
    constructors: BTreeMap<String, BasisConstructor>,
}

impl BasisRegistry {
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Register a constructor, replacing a previous one with the same keyword
    pub fn register(&mut self, keyword: impl Into<String>, constructor: BasisConstructor) -> &mut Self {
        self.constructors.insert(keyword.into(), constructor);
        self
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.constructors.contains_key(keyword)
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn create(
        &self,
        keyword: &str,
        parameters: &BasisParameters,
    ) -> Result<BasisFunctions, BasisError> {
        let constructor = self
            .constructors
            .get(keyword)
            .ok_or_else(|| BasisError::UnknownFamily(keyword.to_owned()))?;
        constructor(parameters)
    }
}

impl Default for BasisRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register(ChebyshevBasis::KEYWORD, |p| {
                BasisFunctions::chebyshev(p.order, p.interval_min, p.interval_max)
            })
            .register(LegendreBasis::KEYWORD, |p| {
                BasisFunctions::legendre(p.order, p.interval_min, p.interval_max)
            })
            .register(FourierBasis::KEYWORD, |p| {
                BasisFunctions::fourier(p.order, p.interval_min, p.interval_max)
            })
            .register(CosineBasis::KEYWORD, |p| {
                BasisFunctions::cosine(p.order, p.interval_min, p.interval_max)
            })
            .register(SineBasis::KEYWORD, |p| {
                BasisFunctions::sine(p.order, p.interval_min, p.interval_max)
            })
            .register(PowersBasis::KEYWORD, |p| {
                BasisFunctions::powers(p.order, p.interval_min, p.interval_max)
            });
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::BasisFunctionsTrait;

    fn parameters(order: usize) -> BasisParameters {
        BasisParameters {
            order,
            interval_min: -1.0,
            interval_max: 1.0,
        }
    }

    #[test]
    fn builtin_keywords_match_families() {
        let registry = BasisRegistry::default();
        assert_eq!(registry.keywords().count(), 6);
        for keyword in registry.keywords() {
            let basis = registry.create(keyword, &parameters(3)).unwrap();
            assert_eq!(basis.keyword(), keyword);
        }
    }

    #[test]
    fn unknown_family() {
        let registry = BasisRegistry::empty();
        assert_eq!(
            registry.create("BF_CHEBYSHEV", &parameters(3)),
            Err(BasisError::UnknownFamily("BF_CHEBYSHEV".to_owned()))
        );
    }

    #[test]
    fn custom_family() {
        let mut registry = BasisRegistry::empty();
        registry.register("BF_LINEAR", |p| {
            BasisFunctions::powers(1, p.interval_min, p.interval_max)
        });
        assert!(registry.contains("BF_LINEAR"));
        let basis = registry.create("BF_LINEAR", &parameters(10)).unwrap();
        assert_eq!(basis.size(), 2);
    }

    #[test]
    fn constructor_errors_propagate() {
        let registry = BasisRegistry::default();
        let p = BasisParameters {
            order: 2,
            interval_min: 1.0,
            interval_max: -1.0,
        };
        assert_eq!(
            registry.create("BF_FOURIER", &p),
            Err(BasisError::InvalidInterval { min: 1.0, max: -1.0 })
        );
    }
}
