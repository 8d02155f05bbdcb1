//! Solution candidate generator.
//!
//! Walks the configured universes in a fixed nested order:
//!
//! ```text
//! unroll pattern > work-group > micro-tile 0 > micro-tile 1
//!     > parallel loads A > parallel loads B > ppd profile > branch type
//! ```
//!
//! pruning each combination at the first stage it violates. Everything that
//! does not depend on the loop variables (scalar types, index assignment,
//! skinniness, the kernel grid and preprocessor downgrades) is decided once per
//! problem before the walk starts.

use std::sync::Arc;

use itertools::iproduct;
use rayon::prelude::*;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use tilegen_dtype::NumericType;
use tilegen_problem::Problem;

use crate::assign::{IndexAssignment, assign_indices};
use crate::config::{PpdProfile, SearchConfig, UnrollPattern};
use crate::error::Result;
use crate::kernel::{
    BranchType, Kernel, LoadSplit, Solution, Tile, work_group_half_registers, work_group_local_memory_bytes,
};
use crate::report::{
    CandidateSet, Downgrade, DowngradeObserver, DowngradeReason, GridDecision, Rejection, SearchReport,
};

/// Enumerates the solution candidates of problems under one configuration.
///
/// Immutable once built; share it across threads freely.
#[derive(Clone)]
pub struct SolutionCandidateGenerator {
    config: SearchConfig,
    observer: Option<Arc<dyn DowngradeObserver>>,
}

impl std::fmt::Debug for SolutionCandidateGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolutionCandidateGenerator")
            .field("config", &self.config)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

/// Per-problem facts shared by every candidate.
struct SearchContext {
    problem: Arc<Problem>,
    indices: IndexAssignment,
    types: [NumericType; 3],
    sizes: [usize; 2],
    skinny: [bool; 2],
    grid: GridDecision,
    profiles: Vec<PpdProfile>,
}

/// Tile-level choices of one combination, before branch handling.
struct Candidate<'a> {
    unrolls: &'a UnrollPattern,
    tile: Tile,
    loads_a: LoadSplit,
    loads_b: LoadSplit,
}

impl SolutionCandidateGenerator {
    pub fn new(config: SearchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, observer: None })
    }

    /// Generator configured from `TILEGEN_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(SearchConfig::from_env())
    }

    /// Notify `observer` of every preprocessor downgrade.
    pub fn with_observer(mut self, observer: Arc<dyn DowngradeObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn generate(&self, problem: &Problem) -> Vec<Solution> {
        self.generate_with_report(problem).solutions
    }

    /// Generate candidates for independent problems in parallel.
    ///
    /// Results are in input order.
    #[tracing::instrument(skip_all, fields(problems = problems.len()))]
    pub fn generate_batch(&self, problems: &[Problem]) -> Vec<Vec<Solution>> {
        problems.par_iter().map(|problem| self.generate(problem)).collect()
    }

    #[tracing::instrument(skip_all, fields(problem = %problem))]
    pub fn generate_with_report(&self, problem: &Problem) -> CandidateSet {
        let mut report = SearchReport::default();
        let ctx = self.context(problem, &mut report);

        let Some(tier) = self.config.unroll.select_tier(ctx.indices.unroll_dim_size) else {
            debug!(unroll_size = ctx.indices.unroll_dim_size, "no unroll level divides the summation");
            return CandidateSet { solutions: Vec::new(), report };
        };
        report.unroll_tier = Some(tier);
        debug!(
            tier,
            skinny0 = ctx.skinny[0],
            skinny1 = ctx.skinny[1],
            grid = ?ctx.grid.grid,
            "searching candidates"
        );

        let mut solutions = Vec::new();
        for unrolls in self.config.unroll.patterns(tier) {
            if !unroll_fits(unrolls, ctx.indices.unroll_dim_size) {
                reject(&mut report, Rejection::UnrollPattern);
                continue;
            }
            self.search_tiles(&ctx, unrolls, &mut report, &mut solutions);
        }

        debug!(candidates = solutions.len(), rejected = report.rejections.total(), "search finished");
        CandidateSet { solutions, report }
    }

    fn context(&self, input: &Problem, report: &mut SearchReport) -> SearchContext {
        let op = input.operation();
        let c_type = input.tensor_c().data_type;
        let alpha_type = if !self.config.optimize_alpha && !op.use_alpha { c_type } else { op.alpha_type };
        let beta_type = if !self.config.optimize_beta && !op.use_beta { c_type } else { op.beta_type };
        let mut problem = input.with_scalar_types(alpha_type, beta_type);

        let indices = assign_indices(&problem);
        let sizes = [
            problem.index_size(indices.index_assignment_dim0).unwrap_or_default(),
            problem.index_size(indices.index_assignment_dim1).unwrap_or_default(),
        ];
        let skinny = self.skinniness(sizes);

        let grid = self.grid_decision(&indices, skinny, problem.operation().use_beta);
        if grid.forces_beta {
            warn!(grid = ?grid.grid, "kernel grid splits the summation, forcing beta accumulation");
            problem = problem.with_beta_accumulation();
        }

        let profiles = self.resolve_profiles(&problem, report);

        report.skinny = skinny;
        report.grid = grid;
        SearchContext {
            types: [problem.tensor_c().data_type, problem.tensor_a().data_type, problem.tensor_b().data_type],
            problem: Arc::new(problem),
            indices,
            sizes,
            skinny,
            grid,
            profiles,
        }
    }

    fn skinniness(&self, [size0, size1]: [usize; 2]) -> [bool; 2] {
        let t = &self.config.skinny;
        [size0 < t.small && size1 > t.large_dim0, size1 < t.small && size0 > t.large_dim1]
    }

    /// Supertiling grid of a problem.
    ///
    /// Applies only to non-skinny problems whose unroll stride on either tile
    /// side is a multiple of the configured stride. A zero stride counts.
    pub(crate) fn grid_decision(&self, indices: &IndexAssignment, skinny: [bool; 2], use_beta: bool) -> GridDecision {
        let cfg = &self.config.kernel_grid;
        let multiple = |stride: usize| stride % cfg.stride_multiple == 0;
        let (s0, s1) = (indices.unroll_dim_stride0, indices.unroll_dim_stride1);
        if skinny.contains(&true) || !(multiple(s0) || multiple(s1)) {
            return GridDecision::UNIT;
        }
        let grid = [
            (s0 / cfg.stride_divisor).max(1),
            (s1 / cfg.stride_divisor).max(1),
            (indices.unroll_dim_size / cfg.size_divisor).max(1),
        ];
        GridDecision { grid, forces_beta: grid[2] > 1 && !use_beta }
    }

    /// Searched preprocessor profiles with every downgrade the problem forces.
    fn resolve_profiles(&self, problem: &Problem, report: &mut SearchReport) -> Vec<PpdProfile> {
        let uses_offsets = problem.operation().use_offsets;
        let unit_leading = problem.leading_strides_one();
        let mut profiles = self.config.effective_ppd_universe();

        for (position, profile) in profiles.iter_mut().enumerate() {
            let requested = *profile;
            let mut downgrades: SmallVec<[DowngradeReason; 2]> = SmallVec::new();
            if profile.offsets && uses_offsets {
                profile.offsets = false;
                downgrades.push(DowngradeReason::OffsetsRequired);
            }
            if profile.leading_stride && !unit_leading {
                profile.leading_stride = false;
                downgrades.push(DowngradeReason::NonUnitLeadingStride);
            }
            for reason in downgrades {
                let downgrade = Downgrade { profile: position, requested, applied: *profile, reason };
                warn!(profile = position, ?reason, "preprocessor optimization reverted");
                if let Some(observer) = &self.observer {
                    observer.on_downgrade(problem, &downgrade);
                }
                report.downgrades.push(downgrade);
            }
        }
        profiles
    }

    fn search_tiles(
        &self,
        ctx: &SearchContext,
        unrolls: &UnrollPattern,
        report: &mut SearchReport,
        solutions: &mut Vec<Solution>,
    ) {
        let cfg = &self.config;
        let [skinny0, skinny1] = ctx.skinny.map(usize::from);
        let wg_limit = cfg.aspect.work_group;
        let mt_limit = cfg.aspect.micro_tile;
        let macro_limit = cfg.aspect.macro_tile();

        for &work_group in &cfg.work_groups {
            if exceeds_aspect(work_group, wg_limit, skinny0, skinny1) {
                reject(report, Rejection::WorkGroupRatio);
                continue;
            }
            let micro_tiles = cfg.min_micro_tile..=cfg.max_micro_tile;
            for (mt0, mt1) in iproduct!(micro_tiles.clone(), micro_tiles) {
                let tile = Tile { work_group, micro_tile: [mt0, mt1], branch: [BranchType::None; 2] };
                if exceeds_aspect(tile.micro_tile, mt_limit, skinny0, skinny1) {
                    reject(report, Rejection::MicroTileRatio);
                    continue;
                }
                if exceeds_aspect(tile.macro_tile(), macro_limit, skinny0, skinny1) {
                    reject(report, Rejection::MacroTileRatio);
                    continue;
                }
                if work_group_half_registers(&tile, ctx.types) > 2 * cfg.max_registers {
                    reject(report, Rejection::Registers);
                    continue;
                }
                let operands = [ctx.types[1], ctx.types[2]];
                let local_memory = work_group_local_memory_bytes(
                    &tile,
                    unrolls[0],
                    ctx.indices.tensor_assigned_dim0,
                    operands,
                    cfg.local_mem_pad,
                );
                if local_memory > cfg.max_local_memory_bytes {
                    reject(report, Rejection::LocalMemory);
                    continue;
                }
                self.search_loads(ctx, unrolls, tile, report, solutions);
            }
        }
    }

    fn search_loads(
        &self,
        ctx: &SearchContext,
        unrolls: &UnrollPattern,
        tile: Tile,
        report: &mut SearchReport,
        solutions: &mut Vec<Solution>,
    ) {
        let unroll = unrolls[0];
        let threads = tile.num_threads();
        let [mt0, mt1] = tile.macro_tile();
        if (mt0 * unroll) % threads != 0 || (mt1 * unroll) % threads != 0 {
            reject(report, Rejection::LoadWhole);
            return;
        }
        let loads_a = mt0 * unroll / threads;
        let loads_b = mt1 * unroll / threads;

        let indices = &ctx.indices;
        let load_size_a = if indices.unroll_dim_stride_greater_than_tile_dim_stride_a { mt0 } else { unroll };
        let load_size_b = if indices.unroll_dim_stride_less_than_tile_dim_stride_b { unroll } else { mt1 };
        let splits_a = load_splits(loads_a, load_size_a, threads, report);
        let splits_b = load_splits(loads_b, load_size_b, threads, report);

        for &split_a in &splits_a {
            for &split_b in &splits_b {
                let candidate = Candidate { unrolls, tile, loads_a: split_a, loads_b: split_b };
                for &profile in &ctx.profiles {
                    for &branch in &self.config.branch_types {
                        match self.solution(ctx, &candidate, profile, branch) {
                            Ok(solution) => solutions.push(solution),
                            Err(stage) => reject(report, stage),
                        }
                    }
                }
            }
        }
    }

    /// Lay out the kernels of one branch strategy, or name the stage that
    /// rules it out.
    fn solution(
        &self,
        ctx: &SearchContext,
        candidate: &Candidate<'_>,
        profile: PpdProfile,
        branch: BranchType,
    ) -> std::result::Result<Solution, Rejection> {
        let [size0, size1] = ctx.sizes;
        let exact = candidate.tile.fits_exactly(size0, size1);
        let grid = ctx.grid.grid;

        match branch {
            BranchType::Multiple => {
                if self.config.no_branches && !exact {
                    return Err(Rejection::BranchNoBranches);
                }
                let edge = PpdProfile::new(profile.leading_stride, false, false);
                let kernel = |branch, ppd| Some(self.kernel(ctx, candidate, branch, ppd));
                Ok(Solution {
                    kernels: [
                        kernel([BranchType::None, BranchType::None], profile),
                        kernel([BranchType::Multiple, BranchType::None], edge),
                        kernel([BranchType::None, BranchType::Multiple], edge),
                        kernel([BranchType::Multiple, BranchType::Multiple], edge),
                    ],
                    kernel_grid: [grid[0] + 1, grid[1] + 1, grid[2]],
                    branch: [BranchType::Multiple; 2],
                    ppd_leading_stride: profile.leading_stride,
                    ppd_offsets: profile.offsets,
                    ppd_all: false,
                })
            }
            BranchType::Branched => {
                if exact {
                    return Err(Rejection::BranchExactFit);
                }
                if ctx.grid.is_supertiled() {
                    return Err(Rejection::BranchSupertiled);
                }
                if self.config.no_branches {
                    return Err(Rejection::BranchNoBranches);
                }
                let main = self.kernel(ctx, candidate, [BranchType::Branched; 2], profile);
                Ok(Solution {
                    kernels: [Some(main), None, None, None],
                    kernel_grid: grid,
                    branch: [BranchType::Branched; 2],
                    ppd_leading_stride: profile.leading_stride,
                    ppd_offsets: profile.offsets,
                    ppd_all: profile.all,
                })
            }
            // Rejected by `SearchConfig::validate`.
            BranchType::None => Err(Rejection::BranchExactFit),
        }
    }

    fn kernel(&self, ctx: &SearchContext, candidate: &Candidate<'_>, branch: [BranchType; 2], ppd: PpdProfile) -> Kernel {
        let [data_type_c, data_type_a, data_type_b] = ctx.types;
        Kernel {
            data_type_c,
            data_type_a,
            data_type_b,
            problem: Arc::clone(&ctx.problem),
            indices: ctx.indices.clone(),
            tile: Tile { branch, ..candidate.tile },
            unrolls: candidate.unrolls.clone(),
            num_loads_a: candidate.loads_a,
            num_loads_b: candidate.loads_b,
            ppd_leading_stride: ppd.leading_stride,
            ppd_offsets: ppd.offsets,
            ppd_all: ppd.all,
        }
    }
}

fn reject(report: &mut SearchReport, stage: Rejection) {
    trace!(%stage, "candidate rejected");
    report.rejections.record(stage);
}

/// Both summation loops must run at least once and the innermost unroll must
/// divide the extent.
fn unroll_fits(unrolls: &[usize], size: usize) -> bool {
    let (Some(&first), Some(&last)) = (unrolls.first(), unrolls.last()) else {
        return false;
    };
    if size % last != 0 || size < first {
        return false;
    }
    match unrolls.get(1) {
        Some(&second) => size % first >= second,
        None => true,
    }
}

/// Whether `shape` is stretched beyond `limits` along either axis.
///
/// Stretching toward axis 1 is bounded by `limits[skinny0]`, toward axis 0 by
/// `limits[skinny1]`.
fn exceeds_aspect([x, y]: [usize; 2], limits: [usize; 2], skinny0: usize, skinny1: usize) -> bool {
    y > limits[skinny0] * x || x > limits[skinny1] * y
}

/// Parallel/perpendicular splits of `loads`, ascending by parallel count.
fn load_splits(loads: usize, load_size: usize, threads: usize, report: &mut SearchReport) -> SmallVec<[LoadSplit; 8]> {
    let mut splits = SmallVec::new();
    let mut rejected = 0;
    for parallel in (1..=loads).filter(|p| loads % p == 0) {
        if load_size % parallel == 0 && threads % (load_size / parallel) == 0 {
            splits.push(LoadSplit { parallel, perpendicular: loads / parallel });
        } else {
            rejected += 1;
        }
    }
    if rejected > 0 {
        trace!(stage = %Rejection::LoadSplit, rejected, "load splits rejected");
        report.rejections.record_n(Rejection::LoadSplit, rejected);
    }
    splits
}
