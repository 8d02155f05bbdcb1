//! Tensors as ordered lists of (size, stride) axes.

use std::fmt;

use smallvec::SmallVec;
use tilegen_dtype::NumericType;

/// Upper bound on tensor rank accepted by [`Problem`](crate::Problem).
pub const MAX_DIMENSIONS: usize = 16;

/// Which operand of `C = alpha * A * B + beta * C` a tensor plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TensorId {
    A,
    B,
    C,
}

impl TensorId {
    /// The other input tensor. `C` has no counterpart and maps to itself.
    pub const fn other(&self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
            Self::C => Self::C,
        }
    }
}

impl fmt::Display for TensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        };
        f.write_str(name)
    }
}

/// One tensor axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dimension {
    pub size: usize,
    pub stride: usize,
}

impl Dimension {
    pub const fn new(size: usize, stride: usize) -> Self {
        Self { size, stride }
    }
}

/// Ordered axes plus an element type. Axis position is meaningful: it is the
/// slot the operation's index assignment list refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tensor {
    pub data_type: NumericType,
    pub dimensions: SmallVec<[Dimension; 4]>,
}

impl Tensor {
    pub fn new(data_type: NumericType, dimensions: impl IntoIterator<Item = Dimension>) -> Self {
        Self { data_type, dimensions: dimensions.into_iter().collect() }
    }

    /// Densely packed tensor: axis 0 has stride 1 and each later axis strides
    /// over everything before it.
    pub fn packed(data_type: NumericType, sizes: &[usize]) -> Self {
        let mut stride = 1;
        let dimensions = sizes.iter().map(|&size| {
            let dim = Dimension::new(size, stride);
            stride *= size;
            dim
        });
        Self::new(data_type, dimensions)
    }

    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }

    /// Stride of axis 0, or `None` for a rank-0 tensor.
    pub fn leading_stride(&self) -> Option<usize> {
        self.dimensions.first().map(|d| d.stride)
    }

    pub fn num_elements(&self) -> usize {
        self.dimensions.iter().map(|d| d.size).product()
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.data_type)?;
        for (i, dim) in self.dimensions.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}:{}", dim.size, dim.stride)?;
        }
        f.write_str("]")
    }
}
