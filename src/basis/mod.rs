//! One-dimensional basis-function sets
//!
//! Every dimension of a [LinearExpansion](crate::LinearExpansion) uses one basis set. A set maps
//! a raw argument onto its intrinsic interval and returns all basis values and their derivatives
//! with respect to the raw argument, see [BasisFunctionsTrait::eval_all].

mod basis_functions;
pub use basis_functions::{
    BasisFunctions, BasisFunctionsTrait, BasisParameters, BasisPoint, BasisValues,
    DEFAULT_INTEGRATION_BINS,
};

mod chebyshev;
pub use chebyshev::ChebyshevBasis;

pub mod harmonics;

mod interval;
pub use interval::BasisInterval;

mod legendre;
pub use legendre::LegendreBasis;

mod powers;
pub use powers::PowersBasis;

mod registry;
pub use registry::{BasisConstructor, BasisRegistry};

mod trigonometric;
pub use trigonometric::{CosineBasis, FourierBasis, SineBasis};
