/// Error returned from [crate::IndexMap]
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum IndexError {
    #[error("multi-index has {actual} components, but {expected} dimensions are defined")]
    WrongRank { expected: usize, actual: usize },

    #[error("index {index} is out of range for dimension {dim} of size {size}")]
    OutOfRange {
        dim: usize,
        index: usize,
        size: usize,
    },

    #[error("flat index {index} is out of range for {size} elements")]
    FlatOutOfRange { index: usize, size: usize },

    #[error("dimension {0} has no elements")]
    EmptyDimension(usize),

    #[error("at least one dimension is required")]
    NoDimensions,
}

/// Error returned from basis-function constructors and [crate::BasisRegistry]
#[derive(Debug, thiserror::Error, PartialEq, Clone)]
pub enum BasisError {
    #[error("interval [{min}, {max}] is invalid, minimum must be finite and less than maximum")]
    InvalidInterval { min: f64, max: f64 },

    #[error("basis-function family {0:?} is not registered")]
    UnknownFamily(String),
}

/// Error returned from [crate::CoeffsVector] and [crate::CoeffsMatrix]
#[derive(Debug, thiserror::Error)]
pub enum CoeffsError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("shapes {left:?} and {right:?} are not the same")]
    ShapeMismatch { left: Vec<usize>, right: Vec<usize> },

    #[error("line {line}: {reason}")]
    Format { line: usize, reason: String },

    #[error("coefficient file has shape {found:?}, but {expected:?} is required")]
    SizeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("{0} arguments are given for {1} basis-function sets")]
    DimensionCount(usize, usize),

    #[error("argument name {0:?} is used by more than one dimension")]
    DuplicateArgument(String),

    #[error("element ({row}, {col}) is off-diagonal, but the matrix is diagonal")]
    OffDiagonal { row: usize, col: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoeffsError {
    pub(crate) fn format(line: usize, reason: impl Into<String>) -> Self {
        Self::Format {
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn shape_mismatch(left: &[usize], right: &[usize]) -> Self {
        Self::ShapeMismatch {
            left: left.to_vec(),
            right: right.to_vec(),
        }
    }
}

/// Error returned from [crate::Grid]
#[derive(Debug, thiserror::Error, PartialEq, Clone)]
pub enum GridError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("grid dimension {dim} has invalid bounds [{min}, {max}]")]
    InvalidBounds { dim: usize, min: f64, max: f64 },

    #[error("grid dimension {dim} has {points} points, at least {minimum} are required")]
    TooFewPoints {
        dim: usize,
        points: usize,
        minimum: usize,
    },

    #[error("{0} values are given for a grid of {1} dimensions")]
    DimensionCount(usize, usize),

    #[error("grid integral is {0}, it cannot be normalized")]
    ZeroNormalization(f64),
}

/// Error returned from [crate::TargetDistribution] constructors and evaluation on grids
#[derive(Debug, thiserror::Error, PartialEq, Clone)]
pub enum TargetDistError {
    #[error("distribution is {expected}-dimensional, but {actual} dimensions are used")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("density is negative ({value}) at {point:?}")]
    NegativeDensity { value: f64, point: Vec<f64> },

    #[error("numerically degenerate distribution: {0}")]
    Degenerate(&'static str),

    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Error returned from [crate::LinearExpansion]
#[derive(Debug, thiserror::Error)]
pub enum ExpansionError {
    #[error("{args} arguments are given for {basis} basis-function sets")]
    DimensionCount { args: usize, basis: usize },

    #[error("thermal energy kT must be positive and finite, got {0}")]
    InvalidKbt(f64),

    #[error("well-tempered bias factor must be larger than one, got {0}")]
    InvalidBiasFactor(f64),

    #[error("{0} requires a grid, but no grid points are configured")]
    MissingGrid(&'static str),

    #[error("first basis function of dimension {0} is not constant")]
    NoConstantTerm(usize),

    #[error(transparent)]
    Coeffs(#[from] CoeffsError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    TargetDist(#[from] TargetDistError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error returned from [crate::optimizer::ReplicaCommunicator]
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum CommunicationError {
    #[error("replica {rank} sent {actual} values, {expected} are expected")]
    LengthMismatch {
        rank: usize,
        expected: usize,
        actual: usize,
    },

    #[error("replica group is broken: another participant panicked")]
    Poisoned,

    #[error("replica {rank} left the group")]
    Aborted { rank: usize },
}

/// Error returned from [crate::Optimizer]
#[derive(Debug, thiserror::Error)]
pub enum OptimizerError {
    #[error("update rule {0} requires a Hessian, but Hessian tracking is disabled")]
    HessianRequired(&'static str),

    #[error("Hessian is requested, but Hessian tracking is disabled")]
    HessianNotEnabled,

    #[error("invalid optimizer setting: {0}")]
    InvalidSetting(&'static str),

    #[error("component {0} does not exist")]
    NoComponent(usize),

    #[error("{actual} components are given, {expected} are expected")]
    ComponentCount { expected: usize, actual: usize },

    #[error("no samples are collected since the last update")]
    NoSamples,

    #[error(transparent)]
    Coeffs(#[from] CoeffsError),

    #[error("replica reduction failed: {0}")]
    Communication(#[from] CommunicationError),
}

impl OptimizerError {
    pub(crate) fn shape_mismatch(left: &[usize], right: &[usize]) -> Self {
        CoeffsError::shape_mismatch(left, right).into()
    }
}

/// Error returned from [crate::VesBias]
#[derive(Debug, thiserror::Error)]
pub enum VesError {
    #[error(transparent)]
    Basis(#[from] BasisError),

    #[error(transparent)]
    Coeffs(#[from] CoeffsError),

    #[error(transparent)]
    Expansion(#[from] ExpansionError),

    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    #[error("optimizer is not configured")]
    NoOptimizer,

    #[error("invalid setting: {0}")]
    InvalidSetting(&'static str),
}
