//! A concrete contraction problem: three tensors plus the operation tying them.

use std::fmt;

use bon::bon;
use snafu::ensure;
use tilegen_dtype::NumericType;

use crate::error::*;
use crate::{DeviceProfile, IndexRoles, MAX_DIMENSIONS, Operation, Tensor, TensorId};

/// A validated problem instance.
///
/// The only way to obtain one is through [`Problem::new`] or the builder, both
/// of which reject every malformed axis-role configuration. Fields are read
/// through accessors so a validated problem stays valid; the `with_*` methods
/// return modified copies and leave `self` untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Problem {
    tensor_c: Tensor,
    tensor_a: Tensor,
    tensor_b: Tensor,
    operation: Operation,
    device_profile: DeviceProfile,
    roles: IndexRoles,
}

#[bon]
impl Problem {
    #[builder]
    pub fn builder(
        tensor_c: Tensor,
        tensor_a: Tensor,
        tensor_b: Tensor,
        operation: Operation,
        #[builder(default)] device_profile: DeviceProfile,
    ) -> Result<Self> {
        let roles = validate(&tensor_c, &tensor_a, &tensor_b, &operation)?;
        device_profile.validate()?;
        Ok(Self { tensor_c, tensor_a, tensor_b, operation, device_profile, roles })
    }
}

impl Problem {
    pub fn new(tensor_c: Tensor, tensor_a: Tensor, tensor_b: Tensor, operation: Operation) -> Result<Self> {
        Self::builder().tensor_c(tensor_c).tensor_a(tensor_a).tensor_b(tensor_b).operation(operation).build()
    }

    /// Densely packed problem with every tensor of `data_type`.
    ///
    /// `index_sizes[i]` is the extent of shared index `i`; each tensor's axes
    /// follow its assignment list (C's follow index order) with axis 0 at
    /// stride 1.
    pub fn packed(operation: Operation, index_sizes: &[usize], data_type: NumericType) -> Result<Self> {
        let size_of = |index: usize| index_sizes.get(index).copied().unwrap_or(0);
        let sizes_c: Vec<usize> = (0..operation.num_indices_c()).map(size_of).collect();
        let sizes_a: Vec<usize> = operation.index_assignments_a.iter().map(|&i| size_of(i)).collect();
        let sizes_b: Vec<usize> = operation.index_assignments_b.iter().map(|&i| size_of(i)).collect();
        Self::new(
            Tensor::packed(data_type, &sizes_c),
            Tensor::packed(data_type, &sizes_a),
            Tensor::packed(data_type, &sizes_b),
            operation,
        )
    }

    pub fn tensor(&self, id: TensorId) -> &Tensor {
        match id {
            TensorId::A => &self.tensor_a,
            TensorId::B => &self.tensor_b,
            TensorId::C => &self.tensor_c,
        }
    }

    pub fn tensor_a(&self) -> &Tensor {
        &self.tensor_a
    }

    pub fn tensor_b(&self) -> &Tensor {
        &self.tensor_b
    }

    pub fn tensor_c(&self) -> &Tensor {
        &self.tensor_c
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn device_profile(&self) -> &DeviceProfile {
        &self.device_profile
    }

    /// Free/batch/summation partition computed at construction.
    pub fn roles(&self) -> &IndexRoles {
        &self.roles
    }

    pub fn num_indices_c(&self) -> usize {
        self.operation.num_indices_c()
    }

    /// Stride of shared index `index` in `tensor`, if the tensor carries it.
    pub fn stride(&self, tensor: TensorId, index: usize) -> Option<usize> {
        let pos = self.operation.position(tensor, index)?;
        self.tensor(tensor).dimensions.get(pos).map(|d| d.stride)
    }

    /// Extent of shared index `index`, read from C for output indices and from
    /// A for summation indices.
    pub fn index_size(&self, index: usize) -> Option<usize> {
        let tensor = if index < self.num_indices_c() { TensorId::C } else { TensorId::A };
        let pos = self.operation.position(tensor, index)?;
        self.tensor(tensor).dimensions.get(pos).map(|d| d.size)
    }

    /// Whether axis 0 of every tensor has stride 1.
    pub fn leading_strides_one(&self) -> bool {
        [&self.tensor_c, &self.tensor_a, &self.tensor_b].iter().all(|t| t.leading_stride() == Some(1))
    }

    /// Copy with alpha and beta element types replaced.
    pub fn with_scalar_types(&self, alpha_type: NumericType, beta_type: NumericType) -> Self {
        let mut problem = self.clone();
        problem.operation.alpha_type = alpha_type;
        problem.operation.beta_type = beta_type;
        problem
    }

    /// Copy that accumulates into C: beta enabled with C's element type.
    pub fn with_beta_accumulation(&self) -> Self {
        let mut problem = self.clone();
        problem.operation.use_beta = true;
        problem.operation.beta_type = self.tensor_c.data_type;
        problem
    }

    pub fn with_device_profile(&self, device_profile: DeviceProfile) -> Result<Self> {
        device_profile.validate()?;
        Ok(Self { device_profile, ..self.clone() })
    }
}

fn validate(c: &Tensor, a: &Tensor, b: &Tensor, op: &Operation) -> Result<IndexRoles> {
    let tensors = [(TensorId::C, c), (TensorId::A, a), (TensorId::B, b)];

    for (tensor, t) in tensors {
        let rank = t.rank();
        ensure!((1..=MAX_DIMENSIONS).contains(&rank), TensorNumDimensionsInvalidSnafu { tensor, rank, max: MAX_DIMENSIONS });
        if let Some(axis) = t.dimensions.iter().position(|d| d.size == 0) {
            return TensorDimensionSizeInvalidSnafu { tensor, axis }.fail();
        }
    }

    for (tensor, t) in [(TensorId::A, a), (TensorId::B, b)] {
        let assignments = op.assignments(tensor).len();
        ensure!(assignments == t.rank(), OperandNumIndicesMismatchSnafu { tensor, rank: t.rank(), assignments });
    }
    ensure!(
        c.rank() == op.num_indices_c(),
        NumIndicesMismatchSnafu { rank: c.rank(), free: op.num_indices_free, batch: op.num_indices_batch }
    );

    let roles = op.classify()?;

    // Each shared index must have one extent across all tensors carrying it.
    for (tensor, t) in [(TensorId::A, a), (TensorId::B, b)] {
        for (&index, dim) in op.assignments(tensor).iter().zip(&t.dimensions) {
            let (reference, expected) = if index < op.num_indices_c() {
                (TensorId::C, c.dimensions[index].size)
            } else {
                let pos = op.position(TensorId::A, index).unwrap_or_default();
                (TensorId::A, a.dimensions[pos].size)
            };
            ensure!(
                dim.size == expected,
                IndexSizeMismatchSnafu { index, reference, expected, tensor, found: dim.size }
            );
        }
    }

    Ok(roles)
}

impl fmt::Display for Problem {
    /// Operation summary, C's element type, then `B` when beta is used and `I`
    /// when initial strides are, e.g. `Cijk_Aikl_Bjkl_SB`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.operation, self.tensor_c.data_type)?;
        if self.operation.use_beta {
            f.write_str("B")?;
        }
        if self.operation.use_initial_strides {
            f.write_str("I")?;
        }
        Ok(())
    }
}
