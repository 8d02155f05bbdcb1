use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tilegen_dtype::Backend;
use tilegen_problem::{Dimension, Operation, Problem, Tensor};

use crate::test::helpers::*;
use crate::*;

#[test]
fn test_batched_gemm_without_supertiling() {
    init_tracing();
    let generator = generator();
    let set = generator.generate_with_report(&batched_sgemm(512, 512, 4, 1024));

    assert_eq!(set.report.unroll_tier, Some(32));
    assert_eq!(set.report.grid, GridDecision::UNIT);
    assert_eq!(set.report.skinny, [false, false]);
    assert!(!set.is_empty());
    assert!(set.solutions.iter().any(|s| s.supertile_grid() == [1, 1, 1]));

    let patterns = generator.config().unroll.patterns(32);
    for kernel in all_kernels(&set.solutions) {
        assert!(patterns.contains(&kernel.unrolls));
        // Non-skinny problems only get square tiles.
        assert_eq!(kernel.tile.work_group[0], kernel.tile.work_group[1]);
        assert_eq!(kernel.tile.micro_tile[0], kernel.tile.micro_tile[1]);
    }
    for solution in &set.solutions {
        assert_solution_layout(solution);
    }
}

#[test]
fn test_supertiling_forces_beta() {
    init_tracing();
    let problem = sgemm(4096, 64, 2048);
    let set = generator().generate_with_report(&problem);

    assert_eq!(set.report.grid, GridDecision { grid: [2, 1, 2], forces_beta: true });
    assert!(!set.is_empty());
    assert!(set.report.rejections.get(Rejection::BranchSupertiled) > 0);
    for solution in &set.solutions {
        assert_eq!(solution.branch, [BranchType::Multiple; 2]);
        assert_eq!(solution.kernel_grid, [3, 2, 2]);
        assert_eq!(solution.supertile_grid(), [2, 1, 2]);
    }
    for kernel in all_kernels(&set.solutions) {
        assert!(kernel.problem.operation().use_beta);
        assert_eq!(kernel.problem.operation().beta_type, NumericType::Single);
    }
    // The caller's problem is never touched.
    assert!(!problem.operation().use_beta);
}

#[test]
fn test_supertiling_keeps_existing_beta() {
    let mut op = Operation::gemm(false, false, false);
    op.use_beta = true;
    op.beta_type = NumericType::Double;
    let problem = Problem::packed(op, &[4096, 64, 2048], NumericType::Single).unwrap();
    let set = generator().generate_with_report(&problem);

    assert_eq!(set.report.grid, GridDecision { grid: [2, 1, 2], forces_beta: false });
    let kernel = set.solutions[0].main_kernel().unwrap();
    assert_eq!(kernel.problem.operation().beta_type, NumericType::Double);
}

#[test]
fn test_zero_unroll_stride_enables_supertiling() {
    // A broadcasts along k: its unroll stride is 0, a multiple of 1024.
    let ty = NumericType::Single;
    let a = Tensor::new(ty, [Dimension::new(256, 1), Dimension::new(2048, 0)]);
    let b = Tensor::new(ty, [Dimension::new(2048, 1), Dimension::new(256, 2048)]);
    let problem = Problem::new(Tensor::packed(ty, &[256, 256]), a, b, Operation::gemm(false, false, false)).unwrap();
    let set = generator().generate_with_report(&problem);

    assert_eq!(set.report.grid, GridDecision { grid: [1, 1, 2], forces_beta: true });
    assert!(set.report.rejections.get(Rejection::BranchSupertiled) > 0);
    assert!(!set.is_empty());
    for solution in &set.solutions {
        assert_eq!(solution.branch, [BranchType::Multiple; 2]);
        assert_eq!(solution.supertile_grid(), [1, 1, 2]);
    }
    for kernel in all_kernels(&set.solutions) {
        assert_eq!(kernel.indices.unroll_dim_stride0, 0);
        assert!(kernel.problem.operation().use_beta);
    }
}

#[test]
fn test_skinny_dim0() {
    init_tracing();
    let set = generator().generate_with_report(&sgemm(16, 2048, 256));
    assert_eq!(set.report.skinny, [true, false]);
    assert!(!set.is_empty());

    let kernels: Vec<_> = all_kernels(&set.solutions).collect();
    for kernel in &kernels {
        let [wg0, wg1] = kernel.tile.work_group;
        let [mt0, mt1] = kernel.tile.micro_tile;
        let [m0, m1] = kernel.macro_tile();
        assert!(wg1 <= 16 * wg0 && wg0 <= wg1);
        assert!(mt1 <= 2 * mt0 && mt0 <= mt1);
        assert!(m1 <= 32 * m0 && m0 <= m1);
    }
    assert!(kernels.iter().any(|k| k.tile.work_group[1] == 16 * k.tile.work_group[0]));
    assert!(kernels.iter().any(|k| k.tile.micro_tile[1] == 2 * k.tile.micro_tile[0]));
}

#[test]
fn test_skinny_dim1_threshold() {
    // Axis 1 is skinny only once axis 0 exceeds the larger threshold.
    let set = generator().generate_with_report(&sgemm(2048, 16, 256));
    assert_eq!(set.report.skinny, [false, false]);

    let set = generator().generate_with_report(&sgemm(8192, 16, 256));
    assert_eq!(set.report.skinny, [false, true]);
    for kernel in all_kernels(&set.solutions) {
        assert!(kernel.tile.work_group[1] <= kernel.tile.work_group[0]);
    }
}

#[test]
fn test_non_unit_leading_stride_downgrades() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let generator = generator().with_observer(Arc::new(move |_: &Problem, downgrade: &Downgrade| {
        assert_eq!(downgrade.reason, DowngradeReason::NonUnitLeadingStride);
        counter.fetch_add(1, Ordering::Relaxed);
    }));

    let set = generator.generate_with_report(&sgemm_strided_a(64, 64, 64, 2));
    assert!(!set.is_empty());
    // TTT, TTF and TFF request leading-stride elision.
    assert_eq!(set.report.downgrades.len(), 3);
    assert_eq!(seen.load(Ordering::Relaxed), 3);
    for downgrade in &set.report.downgrades {
        assert!(downgrade.requested.leading_stride);
        assert!(!downgrade.applied.leading_stride);
    }
    for solution in &set.solutions {
        assert!(!solution.ppd_leading_stride);
        assert!(solution.kernels().all(|k| !k.ppd_leading_stride));
    }
}

#[test]
fn test_offsets_downgrade() {
    let mut op = Operation::gemm(false, false, false);
    op.use_offsets = true;
    let problem = Problem::packed(op, &[64, 64, 64], NumericType::Single).unwrap();
    let set = generator().generate_with_report(&problem);

    let reasons: Vec<_> = set.report.downgrades.iter().map(|d| (d.profile, d.reason)).collect();
    assert_eq!(
        reasons,
        vec![
            (0, DowngradeReason::OffsetsRequired),
            (2, DowngradeReason::OffsetsRequired),
            (4, DowngradeReason::OffsetsRequired),
        ]
    );
    assert!(all_kernels(&set.solutions).all(|k| !k.ppd_offsets));
}

#[test]
fn test_hip_uses_uniform_signatures() {
    let config = SearchConfig::builder().backend(Backend::Hip).build();
    let solutions = generator_with(config).generate(&sgemm(96, 96, 64));
    assert!(!solutions.is_empty());
    let uniform = PpdProfile::new(true, false, false);
    for solution in &solutions {
        assert_eq!(solution.ppd(), uniform);
        assert!(solution.kernels().all(|k| k.ppd() == uniform));
    }
}

#[test]
fn test_no_dividing_unroll_tier() {
    let mut unroll = UnrollUniverse::default();
    unroll.levels = vec![32];
    let set = generator_with(SearchConfig::builder().unroll(unroll).build()).generate_with_report(&sgemm(64, 64, 48));
    assert!(set.is_empty());
    assert_eq!(set.report.unroll_tier, None);
    assert_eq!(set.report.rejections.total(), 0);
}

#[test]
fn test_no_branches() {
    let problem = sgemm(96, 96, 64);
    let set = generator_with(SearchConfig::builder().no_branches(true).build()).generate_with_report(&problem);
    assert!(!set.is_empty());
    assert!(set.report.rejections.get(Rejection::BranchNoBranches) > 0);
    for solution in &set.solutions {
        assert_eq!(solution.branch, [BranchType::Multiple; 2]);
        assert!(solution.main_kernel().unwrap().tile.fits_exactly(96, 96));
    }
}

#[test]
fn test_branch_layouts() {
    let set = generator().generate_with_report(&sgemm(100, 100, 64));
    assert!(set.solutions.iter().any(|s| s.branch == [BranchType::Branched; 2]));
    assert!(set.solutions.iter().any(|s| s.branch == [BranchType::Multiple; 2]));
    for solution in &set.solutions {
        assert_solution_layout(solution);
    }
}

#[test]
fn test_exact_fit_excludes_branched() {
    let set = generator().generate_with_report(&sgemm(256, 256, 64));
    assert!(set.report.rejections.get(Rejection::BranchExactFit) > 0);
    for solution in set.solutions.iter().filter(|s| s.branch == [BranchType::Branched; 2]) {
        assert!(!solution.main_kernel().unwrap().tile.fits_exactly(256, 256));
    }
}

#[test]
fn test_scalar_type_resolution() {
    let mut op = Operation::gemm(false, false, false);
    op.use_alpha = false;
    op.alpha_type = NumericType::Double;
    op.beta_type = NumericType::Half;
    let problem = Problem::packed(op, &[64, 64, 64], NumericType::Single).unwrap();

    let resolved = generator().generate(&problem);
    let kept = generator_with(SearchConfig::builder().optimize_alpha(true).optimize_beta(true).build())
        .generate(&problem);

    let scalars = |solutions: &[Solution]| {
        let op = solutions[0].main_kernel().unwrap().problem.operation().clone();
        (op.alpha_type, op.beta_type)
    };
    assert_eq!(scalars(&resolved), (NumericType::Single, NumericType::Single));
    assert_eq!(scalars(&kept), (NumericType::Double, NumericType::Half));
}

#[test]
fn test_register_budget() {
    let set = generator().generate_with_report(&gemm(false, false, 64, 64, 64, NumericType::ComplexDouble));
    assert!(set.report.rejections.get(Rejection::Registers) > 0);
    assert!(!set.is_empty());
    for kernel in all_kernels(&set.solutions) {
        assert!(kernel.register_usage() <= 24576.0);
        assert!(kernel.local_memory_bytes(1) <= 32768);
    }
}

#[test]
fn test_half_precision_registers_are_exact() {
    let set = generator().generate_with_report(&gemm(false, false, 128, 128, 64, NumericType::Half));
    assert!(!set.is_empty());
    for kernel in all_kernels(&set.solutions) {
        let [mt0, mt1] = kernel.tile.micro_tile;
        assert_eq!(kernel.half_register_usage(), kernel.num_threads() * (mt0 * mt1 + mt0 + mt1));
    }
}

#[test]
fn test_deterministic_order() {
    let generator = generator();
    let problem = sgemm(100, 100, 64);
    assert_eq!(generator.generate(&problem), generator.generate(&problem));
}

#[test]
fn test_batch_matches_sequential() {
    let generator = generator();
    let problems = vec![sgemm(100, 100, 64), batched_sgemm(64, 64, 2, 128), sgemm(16, 2048, 256)];
    let batch = generator.generate_batch(&problems);
    let sequential: Vec<_> = problems.iter().map(|p| generator.generate(p)).collect();
    assert_eq!(batch, sequential);
}

#[test]
fn test_invalid_config_rejected() {
    let config = SearchConfig::builder().min_micro_tile(0).build();
    let err = SolutionCandidateGenerator::new(config).unwrap_err();
    assert_eq!(err, SearchError::InvalidMicroTileRange { min: 0, max: 8 });
}
