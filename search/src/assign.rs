//! Canonical index ordering and tile-axis selection.
//!
//! The two free axes with the smallest strides become the kernel's tile axes,
//! one from each input tensor where possible; the summation axis with the
//! smallest combined stride becomes the unrolled loop.

use std::cmp::Reverse;

use smallvec::SmallVec;
use tilegen_problem::{Problem, TensorId};

/// Where every index of a problem lands in a kernel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexAssignment {
    /// C's indices: batch by descending stride, then free by descending stride.
    pub index_order_c: SmallVec<[usize; 4]>,
    /// Summation indices by descending A+B stride, relative to `num_indices_c`.
    pub index_order_summation: SmallVec<[usize; 4]>,
    pub index_assignment_dim0: usize,
    pub index_assignment_dim1: usize,
    pub tensor_assigned_dim0: TensorId,
    pub tensor_assigned_dim1: TensorId,
    /// Absolute id of the innermost summation index.
    pub index_unroll: usize,
    pub unroll_dim_size: usize,
    /// Unroll stride in the tensor owning dim0.
    pub unroll_dim_stride0: usize,
    /// Unroll stride in the tensor owning dim1.
    pub unroll_dim_stride1: usize,
    pub unroll_dim_stride_greater_than_tile_dim_stride_a: bool,
    pub unroll_dim_stride_less_than_tile_dim_stride_b: bool,
}

struct FreeAxis {
    stride: usize,
    index: usize,
    owner: TensorId,
}

/// Compute the index assignment of a validated problem.
///
/// Deterministic: ties keep ascending index order.
pub fn assign_indices(problem: &Problem) -> IndexAssignment {
    let roles = problem.roles();
    let num_c = problem.num_indices_c();
    let stride = |tensor, index| problem.stride(tensor, index).unwrap_or_default();
    let stride_ab = |index| stride(TensorId::A, index) + stride(TensorId::B, index);

    let mut batch: SmallVec<[usize; 4]> = roles.batch.clone();
    batch.sort_by_key(|&i| Reverse(stride_ab(i)));

    let mut free: SmallVec<[FreeAxis; 4]> = roles
        .free
        .iter()
        .map(|&index| {
            let owner = if problem.operation().position(TensorId::A, index).is_some() { TensorId::A } else { TensorId::B };
            FreeAxis { stride: stride(owner, index), index, owner }
        })
        .collect();
    free.sort_by_key(|axis| Reverse(axis.stride));

    // The two tile axes should come from different tensors.
    let n = free.len();
    if free[n - 1].owner == free[n - 2].owner
        && let Some(pos) = free[..n - 2].iter().rposition(|axis| axis.owner != free[n - 1].owner)
    {
        let axis = free.remove(pos);
        free.insert(n - 2, axis);
    }

    // dim0 is the tile axis with the smaller stride in C.
    if stride(TensorId::C, free[n - 1].index) > stride(TensorId::C, free[n - 2].index) {
        free.swap(n - 1, n - 2);
    }
    let (dim0, dim1) = (&free[n - 1], &free[n - 2]);

    let mut summation: SmallVec<[usize; 4]> = roles.summation.clone();
    summation.sort_by_key(|&i| Reverse(stride_ab(i)));
    let index_unroll = summation.last().copied().unwrap_or(num_c);

    let unroll_stride_a = stride(TensorId::A, index_unroll);
    let unroll_stride_b = stride(TensorId::B, index_unroll);
    let (tile_stride_a, tile_stride_b, unroll_dim_stride0, unroll_dim_stride1) = match dim0.owner {
        TensorId::A => (dim0.stride, dim1.stride, unroll_stride_a, unroll_stride_b),
        _ => (dim1.stride, dim0.stride, unroll_stride_b, unroll_stride_a),
    };

    IndexAssignment {
        index_order_c: batch.iter().copied().chain(free.iter().map(|axis| axis.index)).collect(),
        index_order_summation: summation.iter().map(|&i| i - num_c).collect(),
        index_assignment_dim0: dim0.index,
        index_assignment_dim1: dim1.index,
        tensor_assigned_dim0: dim0.owner,
        tensor_assigned_dim1: dim1.owner,
        index_unroll,
        unroll_dim_size: problem.index_size(index_unroll).unwrap_or_default(),
        unroll_dim_stride0,
        unroll_dim_stride1,
        unroll_dim_stride_greater_than_tile_dim_stride_a: unroll_stride_a > tile_stride_a,
        unroll_dim_stride_less_than_tile_dim_stride_b: unroll_stride_b < tile_stride_b,
    }
}
