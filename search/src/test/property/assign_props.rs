//! Property tests for index assignment.

use proptest::prelude::*;

use tilegen_problem::TensorId;
use tilegen_problem::test::proptests::generators::*;

use crate::assign_indices;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Assigning twice gives the same answer.
    #[test]
    fn assignment_is_idempotent(problem in contraction_problem()) {
        prop_assert_eq!(assign_indices(&problem), assign_indices(&problem));
    }

    /// Tile axes are distinct free indices and dim0 has the smaller C stride.
    #[test]
    fn tile_axes_are_free(problem in prop_oneof![gemm_problem(), contraction_problem()]) {
        let a = assign_indices(&problem);
        let free = &problem.roles().free;
        prop_assert!(free.contains(&a.index_assignment_dim0));
        prop_assert!(free.contains(&a.index_assignment_dim1));
        prop_assert_ne!(a.index_assignment_dim0, a.index_assignment_dim1);

        let c_stride = |i| problem.stride(TensorId::C, i).unwrap();
        prop_assert!(c_stride(a.index_assignment_dim0) <= c_stride(a.index_assignment_dim1));

        let n = a.index_order_c.len();
        prop_assert_eq!(n, problem.num_indices_c());
        prop_assert_eq!(a.index_order_c[n - 1], a.index_assignment_dim0);
        prop_assert_eq!(a.index_order_c[n - 2], a.index_assignment_dim1);
    }

    /// The C order is a permutation with batch indices first.
    #[test]
    fn c_order_is_permutation(problem in contraction_problem()) {
        let a = assign_indices(&problem);
        let mut sorted = a.index_order_c.to_vec();
        sorted.sort_unstable();
        prop_assert_eq!(sorted, (0..problem.num_indices_c()).collect::<Vec<_>>());

        let batch = problem.roles().batch.len();
        prop_assert!(a.index_order_c[..batch].iter().all(|i| problem.roles().batch.contains(i)));
    }

    /// The unroll index is the summation index with the smallest A+B stride.
    #[test]
    fn unroll_has_smallest_stride(problem in contraction_problem()) {
        let a = assign_indices(&problem);
        let combined = |i| problem.stride(TensorId::A, i).unwrap() + problem.stride(TensorId::B, i).unwrap();
        let num_c = problem.num_indices_c();

        prop_assert_eq!(a.index_order_summation.len(), problem.roles().summation.len());
        prop_assert_eq!(a.index_unroll, *a.index_order_summation.last().unwrap() + num_c);
        for &s in &problem.roles().summation {
            prop_assert!(combined(a.index_unroll) <= combined(s));
        }
        prop_assert_eq!(a.unroll_dim_size, problem.index_size(a.index_unroll).unwrap());
    }
}
