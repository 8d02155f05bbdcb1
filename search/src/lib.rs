//! Solution-space search for GPU tensor-contraction kernels.
//!
//! Given a validated [`Problem`], [`SolutionCandidateGenerator`] enumerates
//! every kernel configuration that fits the device budgets and covers the
//! problem correctly:
//!
//! ```ignore
//! let generator = SolutionCandidateGenerator::new(SearchConfig::default())?;
//! for solution in generator.generate(&problem) {
//!     // hand off to kernel and solution writers
//! }
//! ```

pub mod assign;
pub mod config;
pub mod error;
pub mod generator;
pub mod kernel;
pub mod naming;
pub mod report;


pub use assign::{IndexAssignment, assign_indices};
pub use config::{
    AspectLimits, KernelGridConfig, PpdProfile, SearchConfig, SkinnyThresholds, UnrollPattern, UnrollUniverse,
};
pub use error::{Result, SearchError};
pub use generator::SolutionCandidateGenerator;
pub use kernel::{BranchType, Kernel, LoadSplit, Solution, Tile};
pub use naming::{KernelParameter, ParameterValue, SolutionParameter, varying_parameters, varying_solution_parameters};
pub use report::{CandidateSet, Downgrade, DowngradeObserver, DowngradeReason, GridDecision, Rejection, RejectionCounts, SearchReport};

pub use tilegen_problem::{Problem, TensorId};
