//! What a search did besides producing candidates.

use std::fmt;

use strum::{EnumCount, IntoEnumIterator};
use tilegen_problem::Problem;

use crate::config::PpdProfile;
use crate::kernel::Solution;

/// Stage at which a combination was pruned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::EnumCount, strum::EnumIter, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Rejection {
    UnrollPattern,
    WorkGroupRatio,
    MicroTileRatio,
    MacroTileRatio,
    Registers,
    LocalMemory,
    LoadWhole,
    LoadSplit,
    BranchNoBranches,
    BranchExactFit,
    BranchSupertiled,
}

impl Rejection {
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-stage rejection counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RejectionCounts([usize; Rejection::COUNT]);

impl RejectionCounts {
    pub fn get(&self, stage: Rejection) -> usize {
        self.0[stage as usize]
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Rejection, usize)> + '_ {
        Rejection::iter().map(|stage| (stage, self.get(stage)))
    }

    pub(crate) fn record(&mut self, stage: Rejection) {
        self.0[stage as usize] += 1;
    }

    pub(crate) fn record_n(&mut self, stage: Rejection, n: usize) {
        self.0[stage as usize] += n;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DowngradeReason {
    /// Offsets cannot be elided because the operation uses them.
    OffsetsRequired,
    /// Leading strides cannot be assumed 1 because some tensor's is not.
    NonUnitLeadingStride,
}

/// A requested preprocessor optimization that the problem cannot honour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Downgrade {
    /// Position of the profile in the searched universe.
    pub profile: usize,
    pub requested: PpdProfile,
    pub applied: PpdProfile,
    pub reason: DowngradeReason,
}

/// Callback notified of every preprocessor downgrade.
pub trait DowngradeObserver: Send + Sync {
    fn on_downgrade(&self, problem: &Problem, downgrade: &Downgrade);
}

impl<F> DowngradeObserver for F
where
    F: Fn(&Problem, &Downgrade) + Send + Sync,
{
    fn on_downgrade(&self, problem: &Problem, downgrade: &Downgrade) {
        self(problem, downgrade)
    }
}

/// Supertiling decision, made once per problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridDecision {
    pub grid: [usize; 3],
    /// The grid splits the summation while the problem does not accumulate
    /// into C, so beta is switched on.
    pub forces_beta: bool,
}

impl GridDecision {
    pub const UNIT: Self = Self { grid: [1, 1, 1], forces_beta: false };

    pub fn is_supertiled(&self) -> bool {
        self.grid.iter().any(|&g| g > 1)
    }
}

impl Default for GridDecision {
    fn default() -> Self {
        Self::UNIT
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchReport {
    /// `None` when no unroll level divides the unroll extent.
    pub unroll_tier: Option<usize>,
    pub skinny: [bool; 2],
    pub grid: GridDecision,
    pub downgrades: Vec<Downgrade>,
    pub rejections: RejectionCounts,
}

/// Candidates of one problem together with the report of their search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    pub solutions: Vec<Solution>,
    pub report: SearchReport,
}

impl CandidateSet {
    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }
}
