//! Kernel and solution records produced by the search.
//!
//! Both are plain values: every accepted combination gets freshly built
//! records, and nothing holds a reference back into the generator.

use std::sync::Arc;

use tilegen_dtype::NumericType;
use tilegen_problem::{Problem, TensorId};

use crate::assign::IndexAssignment;
use crate::config::{PpdProfile, UnrollPattern};

/// How a kernel covers the edge of a problem that its macro-tile does not
/// divide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::EnumIter, strum::VariantArray, strum::IntoStaticStr)]
pub enum BranchType {
    /// Exact tiles only.
    #[default]
    None,
    /// Separate edge and corner kernels.
    Multiple,
    /// One kernel that bounds-checks.
    Branched,
}

impl BranchType {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self, Self::Multiple)
    }

    pub fn is_branched(&self) -> bool {
        matches!(self, Self::Branched)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Tile {
    pub work_group: [usize; 2],
    pub micro_tile: [usize; 2],
    pub branch: [BranchType; 2],
}

impl Tile {
    pub fn macro_tile(&self) -> [usize; 2] {
        [self.work_group[0] * self.micro_tile[0], self.work_group[1] * self.micro_tile[1]]
    }

    pub fn num_threads(&self) -> usize {
        self.work_group[0] * self.work_group[1]
    }

    /// Whether the macro-tile divides both tile extents.
    pub fn fits_exactly(&self, size0: usize, size1: usize) -> bool {
        let [mt0, mt1] = self.macro_tile();
        size0 % mt0 == 0 && size1 % mt1 == 0
    }
}

/// Global loads of one operand per unroll step, split into loads along the
/// tile axis (parallel) and along the unroll axis (perpendicular).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LoadSplit {
    pub parallel: usize,
    pub perpendicular: usize,
}

impl LoadSplit {
    pub fn total(&self) -> usize {
        self.parallel * self.perpendicular
    }
}

/// One device kernel of a solution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Kernel {
    pub data_type_c: NumericType,
    pub data_type_a: NumericType,
    pub data_type_b: NumericType,
    /// The problem as the search saw it, scalar types resolved.
    pub problem: Arc<Problem>,
    pub indices: IndexAssignment,
    pub tile: Tile,
    pub unrolls: UnrollPattern,
    pub num_loads_a: LoadSplit,
    pub num_loads_b: LoadSplit,
    pub ppd_leading_stride: bool,
    pub ppd_offsets: bool,
    pub ppd_all: bool,
}

impl Kernel {
    pub fn macro_tile(&self) -> [usize; 2] {
        self.tile.macro_tile()
    }

    pub fn num_threads(&self) -> usize {
        self.tile.num_threads()
    }

    /// Unroll of the outer (tiled) summation loop.
    pub fn tile_unroll(&self) -> usize {
        self.unrolls.first().copied().unwrap_or(1)
    }

    /// Register footprint of one work-group in half-register units.
    pub fn half_register_usage(&self) -> usize {
        work_group_half_registers(&self.tile, [self.data_type_c, self.data_type_a, self.data_type_b])
    }

    pub fn register_usage(&self) -> f64 {
        self.half_register_usage() as f64 / 2.0
    }

    /// Local memory staged per unroll step, with `pad` elements per row.
    pub fn local_memory_bytes(&self, pad: usize) -> usize {
        let operands = [self.data_type_a, self.data_type_b];
        work_group_local_memory_bytes(&self.tile, self.tile_unroll(), self.indices.tensor_assigned_dim0, operands, pad)
    }

    pub fn ppd(&self) -> PpdProfile {
        PpdProfile::new(self.ppd_leading_stride, self.ppd_offsets, self.ppd_all)
    }
}

/// `threads * (C * mt0 * mt1 + A * mt0 + B * mt1)` over `[C, A, B]` types.
pub(crate) fn work_group_half_registers(tile: &Tile, [c, a, b]: [NumericType; 3]) -> usize {
    let [mt0, mt1] = tile.micro_tile;
    let per_thread = c.half_registers() as usize * mt0 * mt1
        + a.half_registers() as usize * mt0
        + b.half_registers() as usize * mt1;
    tile.num_threads() * per_thread
}

/// Bytes of A and B tiles staged per unroll step.
///
/// The operand owning tile axis 0 is laid out along `mt0`, the other along
/// `mt1`; each row carries `pad` extra elements.
pub(crate) fn work_group_local_memory_bytes(
    tile: &Tile,
    unroll: usize,
    dim0_owner: TensorId,
    [a, b]: [NumericType; 2],
    pad: usize,
) -> usize {
    let (dim0_type, dim1_type) = match dim0_owner {
        TensorId::A => (a, b),
        _ => (b, a),
    };
    let [mt0, mt1] = tile.macro_tile();
    unroll * ((mt0 + pad) * dim0_type.bytes() + (mt1 + pad) * dim1_type.bytes())
}

/// A complete way of executing a problem: up to four kernels plus the grid
/// they are launched over.
///
/// Multiple-branch solutions fill all four slots (main, edge 0, edge 1,
/// corner); branched solutions fill only the first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Solution {
    pub kernels: [Option<Kernel>; 4],
    pub kernel_grid: [usize; 3],
    pub branch: [BranchType; 2],
    pub ppd_leading_stride: bool,
    pub ppd_offsets: bool,
    pub ppd_all: bool,
}

impl Solution {
    pub fn main_kernel(&self) -> Option<&Kernel> {
        self.kernels[0].as_ref()
    }

    pub fn kernels(&self) -> impl Iterator<Item = &Kernel> {
        self.kernels.iter().flatten()
    }

    pub fn num_kernels(&self) -> usize {
        self.kernels().count()
    }

    /// Grid of the supertiling alone, without the extra edge slots that
    /// multiple-branch solutions add on tile axes 0 and 1.
    pub fn supertile_grid(&self) -> [usize; 3] {
        let [g0, g1, g2] = self.kernel_grid;
        match self.branch {
            [BranchType::Multiple, BranchType::Multiple] => [g0.saturating_sub(1), g1.saturating_sub(1), g2],
            _ => self.kernel_grid,
        }
    }

    pub fn ppd(&self) -> PpdProfile {
        PpdProfile::new(self.ppd_leading_stride, self.ppd_offsets, self.ppd_all)
    }
}
