#![doc = include_str!("../README.md")]

#[cfg(test)]
#[macro_use]
mod tests;

pub mod basis;
pub use basis::{BasisFunctions, BasisFunctionsTrait, BasisParameters, BasisRegistry};

pub mod coeffs;
pub use coeffs::{CoeffsMatrix, CoeffsVector};

mod error;
pub use error::{
    BasisError, CoeffsError, CommunicationError, ExpansionError, GridError, IndexError,
    OptimizerError, TargetDistError, VesError,
};

mod expansion;
pub use expansion::{BiasEvaluation, GridKind, LinearExpansion};

mod grid;
pub use grid::{Grid, GridAxis};

mod index;
pub use index::{IndexMap, MultiIndexIter};

mod io;

mod lnerfc;

pub mod optimizer;
pub use optimizer::{Optimizer, OptimizerSettings};

pub mod target;
pub use target::{BiasCutoff, TargetDistribution, TargetMode, TargetSettings};

mod ves_bias;
pub use ves_bias::{ArgumentSettings, BasisSettings, BiasOutput, VesBias, VesSettings};

pub use ndarray;
