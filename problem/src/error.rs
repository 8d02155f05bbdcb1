use snafu::Snafu;

use crate::TensorId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Structural problems found while building a [`Problem`](crate::Problem).
///
/// These are never repaired: a problem that fails validation is rejected
/// before any search runs.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("tensor {tensor} has {rank} dimensions; expected 1..={max}"))]
    TensorNumDimensionsInvalid { tensor: TensorId, rank: usize, max: usize },

    #[snafu(display("tensor {tensor} dimension {axis} has size 0"))]
    TensorDimensionSizeInvalid { tensor: TensorId, axis: usize },

    #[snafu(display("tensor {tensor} has {rank} dimensions but {assignments} index assignments"))]
    OperandNumIndicesMismatch { tensor: TensorId, rank: usize, assignments: usize },

    #[snafu(display("tensor C has {rank} dimensions but the operation declares {free} free + {batch} batch indices"))]
    NumIndicesMismatch { rank: usize, free: usize, batch: usize },

    #[snafu(display("tensor {tensor} assigns index {index}, outside 0..{total}"))]
    IndexAssignmentInvalid { tensor: TensorId, index: usize, total: usize },

    #[snafu(display("tensor {tensor} assigns index {index} more than once"))]
    IndexAssignmentDuplicate { tensor: TensorId, index: usize },

    #[snafu(display("index {index} is not assigned to any input tensor"))]
    IndexUnassigned { index: usize },

    #[snafu(display("summation index {index} must appear in both A and B"))]
    SummationIndexAssignmentInvalid { index: usize },

    #[snafu(display("operation declares {expected} free indices but assignments yield {found}"))]
    NumFreeIndicesInvalid { expected: usize, found: usize },

    #[snafu(display("operation declares {expected} batch indices but assignments yield {found}"))]
    NumBatchIndicesInvalid { expected: usize, found: usize },

    #[snafu(display("kernels tile two free indices; operation has {found}"))]
    TooFewFreeIndices { found: usize },

    #[snafu(display("operation has no summation index to unroll"))]
    NoSummationIndex,

    #[snafu(display("index {index} has extent {expected} in tensor {reference} but {found} in tensor {tensor}"))]
    IndexSizeMismatch { index: usize, reference: TensorId, expected: usize, tensor: TensorId, found: usize },

    #[snafu(display("device profile holds {count} devices; at most {max} supported"))]
    DeviceProfileNumDevicesInvalid { count: usize, max: usize },

    #[snafu(display("device {position} in profile has an empty name"))]
    DeviceNameInvalid { position: usize },
}
