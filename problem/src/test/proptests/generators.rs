//! Strategies producing valid problems, shared with downstream crates through
//! the `proptest` feature.

use proptest::prelude::*;
use proptest::sample::select;

use crate::*;

/// Extents that are either powers of two or arbitrary, small enough to keep
/// candidate enumeration quick.
pub fn extent() -> impl Strategy<Value = usize> {
    prop_oneof![select(vec![16usize, 32, 64, 128, 256, 512, 1024, 2048]), 1usize..=700]
}

pub fn numeric_type() -> impl Strategy<Value = NumericType> {
    tilegen_dtype::test::proptests::generators::numeric_type()
}

/// Packed GEMM, optionally transposed and batched.
pub fn gemm_problem() -> impl Strategy<Value = Problem> {
    (any::<bool>(), any::<bool>(), any::<bool>(), extent(), extent(), extent(), 1usize..=8, numeric_type()).prop_map(
        |(transpose_a, transpose_b, batched, m, n, k, batch, data_type)| {
            let op = Operation::gemm(transpose_a, transpose_b, batched);
            let sizes = if batched { vec![m, n, batch, k] } else { vec![m, n, k] };
            Problem::packed(op, &sizes, data_type).expect("generated GEMM is valid")
        },
    )
}

/// Packed contraction with 2..=3 free, 0..=1 batch and 1..=2 summation
/// indices, axis order shuffled per tensor.
pub fn contraction_problem() -> impl Strategy<Value = Problem> {
    (2usize..=3, 0usize..=1, 1usize..=2)
        .prop_flat_map(|(free, batch, summation)| {
            let num_c = free + batch;
            let total = num_c + summation;
            (
                Just((free, batch, summation)),
                prop::collection::vec(any::<bool>(), free),
                prop::collection::vec(select(vec![1usize, 3, 8, 16, 48, 64, 128, 256]), total),
                numeric_type(),
            )
        })
        .prop_flat_map(|((free, batch, summation), owners, sizes, data_type)| {
            let num_c = free + batch;
            let shared: Vec<usize> = (free..num_c).chain(num_c..num_c + summation).collect();
            let mut a = shared.clone();
            let mut b = shared;
            for (index, &in_a) in owners.iter().enumerate() {
                if in_a { a.push(index) } else { b.push(index) }
            }
            (Just(a).prop_shuffle(), Just(b).prop_shuffle(), Just((num_c, sizes, data_type)))
        })
        .prop_map(|(a, b, (num_c, sizes, data_type))| {
            let op = Operation::contraction(num_c, &a, &b).expect("generated contraction is valid");
            Problem::packed(op, &sizes, data_type).expect("generated sizes are consistent")
        })
}
