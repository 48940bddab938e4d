//! Target distributions and bias cutoff

mod cutoff;
pub use cutoff::BiasCutoff;

mod gaussian;
pub use gaussian::{ExpModGaussianTarget, GaussianTarget};

mod settings;
pub use settings::{TargetMode, TargetSettings};

mod target_distribution;
pub use target_distribution::{
    LinearCombinationTarget, ProductCombinationTarget, TargetDistribution,
    TargetDistributionTrait, UniformTarget,
};
