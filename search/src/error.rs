use snafu::Snafu;

use crate::kernel::BranchType;

pub type Result<T, E = SearchError> = std::result::Result<T, E>;

/// Configuration rejected when a generator is built.
///
/// Search-space rejections are not errors; they are counted in
/// [`SearchReport`](crate::SearchReport) instead.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum SearchError {
    #[snafu(display("unroll level list is empty"))]
    EmptyUnrollLevels,

    #[snafu(display("unroll level {tier} has no patterns in the unroll universe"))]
    MissingUnrollTier { tier: usize },

    #[snafu(display("unroll pattern {levels:?} for level {tier} must hold one or two non-zero levels"))]
    InvalidUnrollPattern { tier: usize, levels: Vec<usize> },

    #[snafu(display("{universe} universe is empty"))]
    EmptyUniverse { universe: &'static str },

    #[snafu(display("work-group {x}x{y} has a zero dimension"))]
    ZeroWorkGroup { x: usize, y: usize },

    #[snafu(display("micro-tile range {min}..={max} is empty or starts at zero"))]
    InvalidMicroTileRange { min: usize, max: usize },

    #[snafu(display("{table} aspect-ratio limits must be non-zero, got {limits:?}"))]
    ZeroAspectLimit { table: &'static str, limits: [usize; 2] },

    #[snafu(display("kernel-grid {parameter} must be non-zero"))]
    ZeroKernelGridParameter { parameter: &'static str },

    #[snafu(display("branch type {branch:?} is not a search strategy"))]
    UnsupportedBranchType { branch: BranchType },
}
