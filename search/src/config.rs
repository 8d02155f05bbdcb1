//! Search configuration.
//!
//! Every universe and limit the generator walks lives here, with bon builders
//! for explicit configuration and `TILEGEN_*` environment fallbacks.

use std::collections::BTreeMap;

use bon::bon;
use smallvec::{SmallVec, smallvec};
use snafu::ensure;
use tilegen_dtype::Backend;

use crate::error::*;
use crate::kernel::BranchType;

/// Unroll levels of one candidate, outer to inner.
pub type UnrollPattern = SmallVec<[usize; 2]>;

// ============================================================================
// UNROLL UNIVERSE
// ============================================================================

/// Unroll tiers tried in order, and the patterns enumerated for each tier.
///
/// Only the first tier dividing the unroll extent is searched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrollUniverse {
    pub levels: Vec<usize>,
    pub patterns: BTreeMap<usize, Vec<UnrollPattern>>,
}

impl UnrollUniverse {
    /// First tier that divides `size`.
    pub fn select_tier(&self, size: usize) -> Option<usize> {
        self.levels.iter().copied().find(|&tier| tier != 0 && size % tier == 0)
    }

    pub fn patterns(&self, tier: usize) -> &[UnrollPattern] {
        self.patterns.get(&tier).map_or(&[], Vec::as_slice)
    }

    fn validate(&self) -> Result<()> {
        ensure!(!self.levels.is_empty(), EmptyUnrollLevelsSnafu);
        for &tier in &self.levels {
            let patterns = self.patterns.get(&tier);
            ensure!(patterns.is_some_and(|p| !p.is_empty()), MissingUnrollTierSnafu { tier });
        }
        for (&tier, patterns) in &self.patterns {
            for pattern in patterns {
                ensure!(
                    (1..=2).contains(&pattern.len()) && !pattern.contains(&0),
                    InvalidUnrollPatternSnafu { tier, levels: pattern.to_vec() }
                );
            }
        }
        Ok(())
    }
}

impl Default for UnrollUniverse {
    fn default() -> Self {
        let patterns = BTreeMap::from([
            (1, vec![smallvec![1], smallvec![32, 1], smallvec![16, 1], smallvec![8, 1]]),
            (2, vec![smallvec![2], smallvec![32, 2], smallvec![16, 2], smallvec![8, 2]]),
            (4, vec![smallvec![4], smallvec![32, 4], smallvec![16, 4], smallvec![8, 4]]),
            (8, vec![smallvec![8], smallvec![32, 8], smallvec![16, 8], smallvec![4]]),
            (16, vec![smallvec![16], smallvec![8], smallvec![4]]),
            (32, vec![smallvec![32], smallvec![16], smallvec![8], smallvec![4]]),
        ]);
        Self { levels: vec![32, 16, 8, 4, 2, 1], patterns }
    }
}

// ============================================================================
// TILE SHAPES
// ============================================================================

/// Work-group shapes between 64 and 256 threads.
pub const DEFAULT_WORK_GROUPS: [[usize; 2]; 20] = [
    [4, 16],
    [8, 8],
    [16, 4],
    [4, 32],
    [8, 16],
    [16, 8],
    [32, 4],
    [4, 48],
    [6, 32],
    [8, 24],
    [12, 16],
    [16, 12],
    [24, 8],
    [32, 6],
    [48, 4],
    [4, 64],
    [8, 32],
    [16, 16],
    [32, 8],
    [64, 4],
];

/// When an axis counts as skinny.
///
/// Axis 0 is skinny when its extent is below `small` while axis 1 exceeds
/// `large_dim0`; axis 1 mirrors that with `large_dim1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkinnyThresholds {
    pub small: usize,
    pub large_dim0: usize,
    pub large_dim1: usize,
}

impl Default for SkinnyThresholds {
    fn default() -> Self {
        Self { small: 32, large_dim0: 1024, large_dim1: 4096 }
    }
}

/// Largest allowed tile aspect ratio, indexed by whether the problem is skinny
/// on the axis the tile is stretched away from.
///
/// Macro-tile limits are the elementwise product of the other two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AspectLimits {
    pub work_group: [usize; 2],
    pub micro_tile: [usize; 2],
}

impl AspectLimits {
    pub fn macro_tile(&self) -> [usize; 2] {
        [self.work_group[0] * self.micro_tile[0], self.work_group[1] * self.micro_tile[1]]
    }
}

impl Default for AspectLimits {
    fn default() -> Self {
        Self { work_group: [1, 16], micro_tile: [1, 2] }
    }
}

/// Supertiling of very large strided problems into a grid of kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelGridConfig {
    /// An unroll stride that is a multiple of this, zero included, enables the grid.
    pub stride_multiple: usize,
    /// Grid extent along a tile axis is `unroll stride / stride_divisor`.
    pub stride_divisor: usize,
    /// Grid extent along the summation is `unroll extent / size_divisor`.
    pub size_divisor: usize,
}

impl Default for KernelGridConfig {
    fn default() -> Self {
        Self { stride_multiple: 1024, stride_divisor: 2048, size_divisor: 1024 }
    }
}

// ============================================================================
// PREPROCESSOR PROFILES
// ============================================================================

/// Which runtime arguments a kernel may compile away as constants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PpdProfile {
    /// Leading strides are assumed to be 1.
    pub leading_stride: bool,
    /// Buffer offsets are assumed to be 0.
    pub offsets: bool,
    /// Every size and stride is baked in.
    pub all: bool,
}

impl PpdProfile {
    pub const fn new(leading_stride: bool, offsets: bool, all: bool) -> Self {
        Self { leading_stride, offsets, all }
    }
}

pub const DEFAULT_PPD_UNIVERSE: [PpdProfile; 5] = [
    PpdProfile::new(true, true, true),
    PpdProfile::new(false, false, false),
    PpdProfile::new(true, true, false),
    PpdProfile::new(true, false, false),
    PpdProfile::new(false, true, false),
];

/// The only profile allowed when every kernel must share one signature.
pub const UNIFORM_SIGNATURE_PPD: PpdProfile = PpdProfile::new(true, false, false);

// ============================================================================
// SEARCH CONFIGURATION
// ============================================================================

/// Complete configuration of the candidate search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Never emit candidates that need edge handling.
    pub no_branches: bool,
    /// Keep the declared alpha type even when alpha is unused.
    pub optimize_alpha: bool,
    /// Keep the declared beta type even when beta is unused.
    pub optimize_beta: bool,
    pub backend: Backend,

    /// Register budget of one work-group, in 32-bit registers.
    pub max_registers: usize,
    pub max_local_memory_bytes: usize,
    /// Elements of padding per local-memory row.
    pub local_mem_pad: usize,

    pub skinny: SkinnyThresholds,
    pub aspect: AspectLimits,
    pub kernel_grid: KernelGridConfig,

    pub unroll: UnrollUniverse,
    pub work_groups: Vec<[usize; 2]>,
    pub min_micro_tile: usize,
    pub max_micro_tile: usize,
    pub ppd_universe: Vec<PpdProfile>,
    pub branch_types: Vec<BranchType>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[bon]
impl SearchConfig {
    /// Create a search configuration with builder pattern.
    #[builder]
    pub fn builder(
        #[builder(default = false)] no_branches: bool,
        #[builder(default = false)] optimize_alpha: bool,
        #[builder(default = false)] optimize_beta: bool,
        #[builder(default)] backend: Backend,
        #[builder(default = 16 * 16 * (64 + 16 + 16))] max_registers: usize,
        #[builder(default = 32768)] max_local_memory_bytes: usize,
        #[builder(default = 1)] local_mem_pad: usize,
        #[builder(default)] skinny: SkinnyThresholds,
        #[builder(default)] aspect: AspectLimits,
        #[builder(default)] kernel_grid: KernelGridConfig,
        #[builder(default)] unroll: UnrollUniverse,
        #[builder(default = DEFAULT_WORK_GROUPS.to_vec())] work_groups: Vec<[usize; 2]>,
        #[builder(default = 4)] min_micro_tile: usize,
        #[builder(default = 8)] max_micro_tile: usize,
        #[builder(default = DEFAULT_PPD_UNIVERSE.to_vec())] ppd_universe: Vec<PpdProfile>,
        #[builder(default = vec![BranchType::Multiple, BranchType::Branched])] branch_types: Vec<BranchType>,
    ) -> Self {
        Self {
            no_branches,
            optimize_alpha,
            optimize_beta,
            backend,
            max_registers,
            max_local_memory_bytes,
            local_mem_pad,
            skinny,
            aspect,
            kernel_grid,
            unroll,
            work_groups,
            min_micro_tile,
            max_micro_tile,
            ppd_universe,
            branch_types,
        }
    }
}

impl SearchConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `TILEGEN_NO_BRANCHES` - Only emit candidates that tile the problem exactly
    /// * `TILEGEN_OPTIMIZE_ALPHA` - Keep the declared alpha type when alpha is unused
    /// * `TILEGEN_OPTIMIZE_BETA` - Keep the declared beta type when beta is unused
    /// * `TILEGEN_BACKEND` - `opencl` (default) or `hip`
    /// * `TILEGEN_MAX_REGISTERS` - Register budget per work-group (default: 24576)
    /// * `TILEGEN_MAX_LOCAL_MEMORY` - Local memory budget in bytes (default: 32768)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let backend = std::env::var("TILEGEN_BACKEND").ok().and_then(|s| s.parse().ok()).unwrap_or(defaults.backend);
        let max_registers =
            std::env::var("TILEGEN_MAX_REGISTERS").ok().and_then(|s| s.parse().ok()).unwrap_or(defaults.max_registers);
        let max_local_memory_bytes = std::env::var("TILEGEN_MAX_LOCAL_MEMORY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_local_memory_bytes);

        Self {
            no_branches: std::env::var("TILEGEN_NO_BRANCHES").is_ok(),
            optimize_alpha: std::env::var("TILEGEN_OPTIMIZE_ALPHA").is_ok(),
            optimize_beta: std::env::var("TILEGEN_OPTIMIZE_BETA").is_ok(),
            backend,
            max_registers,
            max_local_memory_bytes,
            ..defaults
        }
    }

    /// Profiles actually searched for this backend.
    pub fn effective_ppd_universe(&self) -> Vec<PpdProfile> {
        if self.backend.requires_uniform_signatures() {
            vec![UNIFORM_SIGNATURE_PPD]
        } else {
            self.ppd_universe.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.unroll.validate()?;

        ensure!(!self.work_groups.is_empty(), EmptyUniverseSnafu { universe: "work-group" });
        for &[x, y] in &self.work_groups {
            ensure!(x > 0 && y > 0, ZeroWorkGroupSnafu { x, y });
        }

        let (min, max) = (self.min_micro_tile, self.max_micro_tile);
        ensure!(min > 0 && min <= max, InvalidMicroTileRangeSnafu { min, max });

        for (table, limits) in [("work-group", self.aspect.work_group), ("micro-tile", self.aspect.micro_tile)] {
            ensure!(!limits.contains(&0), ZeroAspectLimitSnafu { table, limits });
        }

        let grid = &self.kernel_grid;
        for (parameter, value) in [
            ("stride multiple", grid.stride_multiple),
            ("stride divisor", grid.stride_divisor),
            ("size divisor", grid.size_divisor),
        ] {
            ensure!(value > 0, ZeroKernelGridParameterSnafu { parameter });
        }

        ensure!(!self.ppd_universe.is_empty(), EmptyUniverseSnafu { universe: "preprocessor profile" });
        ensure!(!self.branch_types.is_empty(), EmptyUniverseSnafu { universe: "branch type" });
        if let Some(&branch) = self.branch_types.iter().find(|b| b.is_none()) {
            return UnsupportedBranchTypeSnafu { branch }.fail();
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
