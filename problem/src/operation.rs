//! Contraction operations: how A's and B's axes map onto one shared index space.
//!
//! Index ids `0..num_indices_c` name the axes of C in order; ids from
//! `num_indices_c` on are summation indices. For
//!
//! ```text
//! C[i,j,k] = Sum_l Sum_m Sum_n A[n,l,i,m,j] B[j,l,m,k,n]
//! ```
//!
//! the assignments are `A = [5, 3, 0, 4, 1]` and `B = [1, 3, 4, 2, 5]`: `i`
//! and `k` are free, `j` is a batch index and `l m n` are summed over.

use std::fmt;

use bon::bon;
use smallvec::{SmallVec, smallvec};
use snafu::ensure;
use tilegen_dtype::NumericType;

use crate::TensorId;
use crate::error::*;

/// Letters used when printing index ids.
pub const INDEX_CHARS: &[u8] = b"ijklmnopqrstuvwxyz";

pub(crate) fn index_char(index: usize) -> char {
    INDEX_CHARS.get(index).map_or('?', |&c| c as char)
}

pub type Assignments = SmallVec<[usize; 8]>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Operation {
    /// Shared index id of each axis of A, by axis position.
    pub index_assignments_a: Assignments,
    /// Shared index id of each axis of B, by axis position.
    pub index_assignments_b: Assignments,
    pub num_indices_free: usize,
    pub num_indices_batch: usize,
    pub num_indices_summation: usize,
    pub use_alpha: bool,
    pub alpha_type: NumericType,
    pub use_beta: bool,
    pub beta_type: NumericType,
    /// Kernels must accept explicit buffer offsets at runtime.
    pub use_offsets: bool,
    /// Kernels must accept non-unit leading strides.
    pub use_initial_strides: bool,
}

/// Role partition of the shared index space, each list ascending by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndexRoles {
    pub free: SmallVec<[usize; 4]>,
    pub batch: SmallVec<[usize; 4]>,
    pub summation: SmallVec<[usize; 4]>,
}

#[bon]
impl Operation {
    #[builder]
    pub fn builder(
        #[builder(into)] index_assignments_a: Assignments,
        #[builder(into)] index_assignments_b: Assignments,
        num_indices_free: usize,
        #[builder(default)] num_indices_batch: usize,
        num_indices_summation: usize,
        #[builder(default = true)] use_alpha: bool,
        #[builder(default = NumericType::Single)] alpha_type: NumericType,
        #[builder(default = false)] use_beta: bool,
        #[builder(default = NumericType::Single)] beta_type: NumericType,
        #[builder(default = false)] use_offsets: bool,
        #[builder(default = false)] use_initial_strides: bool,
    ) -> Self {
        Self {
            index_assignments_a,
            index_assignments_b,
            num_indices_free,
            num_indices_batch,
            num_indices_summation,
            use_alpha,
            alpha_type,
            use_beta,
            beta_type,
            use_offsets,
            use_initial_strides,
        }
    }
}

impl Operation {
    /// Build a contraction from assignment lists alone, deriving the
    /// free/batch/summation counts from them.
    pub fn contraction(num_indices_c: usize, a: &[usize], b: &[usize]) -> Result<Self> {
        let total = a.iter().chain(b).map(|&i| i + 1).max().unwrap_or(0).max(num_indices_c);
        let num_indices_summation = total - num_indices_c;
        let count = |range: std::ops::Range<usize>, both: bool| {
            range.filter(|i| (a.contains(i) && b.contains(i)) == both && (a.contains(i) || b.contains(i))).count()
        };
        let op = Self::builder()
            .index_assignments_a(a.iter().copied().collect::<Assignments>())
            .index_assignments_b(b.iter().copied().collect::<Assignments>())
            .num_indices_free(count(0..num_indices_c, false))
            .num_indices_batch(count(0..num_indices_c, true))
            .num_indices_summation(num_indices_summation)
            .build();
        op.classify()?;
        Ok(op)
    }

    /// GEMM `C[i,j(,b)] = A[i,s] * B[s,j]`, optionally transposed and batched.
    pub fn gemm(transpose_a: bool, transpose_b: bool, batched: bool) -> Self {
        let sum = if batched { 3 } else { 2 };
        let mut a: Assignments = if transpose_a { smallvec![sum, 0] } else { smallvec![0, sum] };
        let mut b: Assignments = if transpose_b { smallvec![1, sum] } else { smallvec![sum, 1] };
        if batched {
            a.push(2);
            b.push(2);
        }
        Self::builder()
            .index_assignments_a(a)
            .index_assignments_b(b)
            .num_indices_free(2)
            .num_indices_batch(usize::from(batched))
            .num_indices_summation(1)
            .build()
    }

    pub fn num_indices_c(&self) -> usize {
        self.num_indices_free + self.num_indices_batch
    }

    pub fn total_indices(&self) -> usize {
        self.num_indices_c() + self.num_indices_summation
    }

    pub fn assignments(&self, tensor: TensorId) -> &[usize] {
        match tensor {
            TensorId::A => &self.index_assignments_a,
            TensorId::B => &self.index_assignments_b,
            TensorId::C => &[],
        }
    }

    /// Axis position at which `tensor` carries shared index `index`.
    ///
    /// For C every id below `num_indices_c` is its own position.
    pub fn position(&self, tensor: TensorId, index: usize) -> Option<usize> {
        match tensor {
            TensorId::C => (index < self.num_indices_c()).then_some(index),
            _ => self.assignments(tensor).iter().position(|&i| i == index),
        }
    }

    /// Partition the index space into free, batch and summation ids.
    ///
    /// Fails when an id is out of range, duplicated within one tensor, left
    /// unassigned, or a summation id is missing from one side.
    pub fn classify(&self) -> Result<IndexRoles> {
        let num_c = self.num_indices_c();
        let total = self.total_indices();

        for tensor in [TensorId::A, TensorId::B] {
            let assignments = self.assignments(tensor);
            for (pos, &index) in assignments.iter().enumerate() {
                ensure!(index < total, IndexAssignmentInvalidSnafu { tensor, index, total });
                ensure!(!assignments[..pos].contains(&index), IndexAssignmentDuplicateSnafu { tensor, index });
            }
        }

        let mut roles = IndexRoles::default();
        for index in 0..total {
            let in_a = self.index_assignments_a.contains(&index);
            let in_b = self.index_assignments_b.contains(&index);
            match (index < num_c, in_a, in_b) {
                (_, false, false) => return IndexUnassignedSnafu { index }.fail(),
                (true, true, true) => roles.batch.push(index),
                (true, _, _) => roles.free.push(index),
                (false, true, true) => roles.summation.push(index),
                (false, _, _) => return SummationIndexAssignmentInvalidSnafu { index }.fail(),
            }
        }

        ensure!(
            roles.free.len() == self.num_indices_free,
            NumFreeIndicesInvalidSnafu { expected: self.num_indices_free, found: roles.free.len() }
        );
        ensure!(
            roles.batch.len() == self.num_indices_batch,
            NumBatchIndicesInvalidSnafu { expected: self.num_indices_batch, found: roles.batch.len() }
        );
        ensure!(roles.free.len() >= 2, TooFewFreeIndicesSnafu { found: roles.free.len() });
        ensure!(!roles.summation.is_empty(), NoSummationIndexSnafu);

        Ok(roles)
    }
}

impl fmt::Display for Operation {
    /// `Cijk_Ailk_Bljk`-style summary of the index structure.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("C")?;
        for index in 0..self.num_indices_c() {
            write!(f, "{}", index_char(index))?;
        }
        f.write_str("_A")?;
        for &index in &self.index_assignments_a {
            write!(f, "{}", index_char(index))?;
        }
        f.write_str("_B")?;
        for &index in &self.index_assignments_b {
            write!(f, "{}", index_char(index))?;
        }
        Ok(())
    }
}
