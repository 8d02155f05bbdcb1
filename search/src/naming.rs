//! Which parameters vary across a set of kernels or solutions.
//!
//! Name writers only need to spell out the parameters that actually differ
//! between the candidates of one problem. This module answers that question
//! without formatting anything.

use std::sync::Arc;

use enumset::{EnumSet, EnumSetType};
use smallvec::SmallVec;
use tilegen_dtype::NumericType;
use tilegen_problem::{Problem, TensorId};

use crate::kernel::{BranchType, Kernel, LoadSplit, Solution};

#[derive(Debug, Hash, PartialOrd, Ord)]
#[derive(EnumSetType, strum::EnumIter, strum::EnumCount, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum KernelParameter {
    DataTypeC,
    DataTypeA,
    DataTypeB,
    Problem,
    IndexOrderC,
    IndexOrderSummation,
    IndexAssignmentDim0,
    IndexAssignmentDim1,
    TensorAssignedDim0,
    IndexUnroll,
    WorkGroup,
    MicroTile,
    Branch,
    Unrolls,
    NumLoadsA,
    NumLoadsB,
    PpdLeadingStride,
    PpdOffsets,
    PpdAll,
}

#[derive(Debug, Hash, PartialOrd, Ord)]
#[derive(EnumSetType, strum::EnumIter, strum::EnumCount, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SolutionParameter {
    KernelGrid,
    Branch,
    PpdLeadingStride,
    PpdOffsets,
    PpdAll,
    /// Any field of any kernel slot.
    Kernels,
}

/// A comparable snapshot of one parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParameterValue {
    Type(NumericType),
    Problem(Arc<Problem>),
    Indices(SmallVec<[usize; 4]>),
    Index(usize),
    Tensor(TensorId),
    Pair([usize; 2]),
    Triple([usize; 3]),
    Branch([BranchType; 2]),
    Loads(LoadSplit),
    Flag(bool),
    Kernels([Option<Kernel>; 4]),
}

impl Kernel {
    pub fn parameter(&self, parameter: KernelParameter) -> ParameterValue {
        use KernelParameter as P;
        use ParameterValue as V;

        match parameter {
            P::DataTypeC => V::Type(self.data_type_c),
            P::DataTypeA => V::Type(self.data_type_a),
            P::DataTypeB => V::Type(self.data_type_b),
            P::Problem => V::Problem(Arc::clone(&self.problem)),
            P::IndexOrderC => V::Indices(self.indices.index_order_c.clone()),
            P::IndexOrderSummation => V::Indices(self.indices.index_order_summation.clone()),
            P::IndexAssignmentDim0 => V::Index(self.indices.index_assignment_dim0),
            P::IndexAssignmentDim1 => V::Index(self.indices.index_assignment_dim1),
            P::TensorAssignedDim0 => V::Tensor(self.indices.tensor_assigned_dim0),
            P::IndexUnroll => V::Index(self.indices.index_unroll),
            P::WorkGroup => V::Pair(self.tile.work_group),
            P::MicroTile => V::Pair(self.tile.micro_tile),
            P::Branch => V::Branch(self.tile.branch),
            P::Unrolls => V::Indices(self.unrolls.iter().copied().collect()),
            P::NumLoadsA => V::Loads(self.num_loads_a),
            P::NumLoadsB => V::Loads(self.num_loads_b),
            P::PpdLeadingStride => V::Flag(self.ppd_leading_stride),
            P::PpdOffsets => V::Flag(self.ppd_offsets),
            P::PpdAll => V::Flag(self.ppd_all),
        }
    }
}

impl Solution {
    pub fn parameter(&self, parameter: SolutionParameter) -> ParameterValue {
        use ParameterValue as V;
        use SolutionParameter as P;

        match parameter {
            P::KernelGrid => V::Triple(self.kernel_grid),
            P::Branch => V::Branch(self.branch),
            P::PpdLeadingStride => V::Flag(self.ppd_leading_stride),
            P::PpdOffsets => V::Flag(self.ppd_offsets),
            P::PpdAll => V::Flag(self.ppd_all),
            P::Kernels => V::Kernels(self.kernels.clone()),
        }
    }
}

/// Parameters whose value differs from the first kernel's in any kernel.
pub fn varying_parameters(kernels: &[Kernel]) -> EnumSet<KernelParameter> {
    varying(kernels, EnumSet::all(), Kernel::parameter)
}

/// Parameters whose value differs from the first solution's in any solution.
pub fn varying_solution_parameters(solutions: &[Solution]) -> EnumSet<SolutionParameter> {
    varying(solutions, EnumSet::all(), Solution::parameter)
}

fn varying<T, P>(items: &[T], candidates: EnumSet<P>, value: impl Fn(&T, P) -> ParameterValue) -> EnumSet<P>
where
    P: EnumSetType,
{
    let Some((first, rest)) = items.split_first() else {
        return EnumSet::empty();
    };
    candidates
        .iter()
        .filter(|&p| {
            let reference = value(first, p);
            rest.iter().any(|item| value(item, p) != reference)
        })
        .collect()
}
