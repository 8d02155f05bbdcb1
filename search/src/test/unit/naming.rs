use enumset::EnumSet;

use crate::test::helpers::*;
use crate::*;

fn multiple_solution(profile: PpdProfile) -> Solution {
    let config = SearchConfig::builder().ppd_universe(vec![profile]).branch_types(vec![BranchType::Multiple]).build();
    generator_with(config).generate(&sgemm(100, 100, 64)).remove(0)
}

#[test]
fn test_empty_and_single() {
    assert!(varying_parameters(&[]).is_empty());
    assert!(varying_solution_parameters(&[]).is_empty());

    let solution = multiple_solution(PpdProfile::default());
    let main = solution.main_kernel().unwrap().clone();
    assert!(varying_parameters(&[main]).is_empty());
    assert!(varying_solution_parameters(&[solution]).is_empty());
}

#[test]
fn test_kernels_of_one_solution_differ_in_branch() {
    let solution = multiple_solution(PpdProfile::default());
    let kernels: Vec<_> = solution.kernels().cloned().collect();
    assert_eq!(varying_parameters(&kernels), EnumSet::only(KernelParameter::Branch));
}

#[test]
fn test_edge_kernels_drop_offsets_and_all() {
    let solution = multiple_solution(PpdProfile::new(true, true, true));
    let kernels: Vec<_> = solution.kernels().cloned().collect();
    assert_eq!(
        varying_parameters(&kernels),
        KernelParameter::Branch | KernelParameter::PpdOffsets | KernelParameter::PpdAll
    );
}

#[test]
fn test_solutions_of_one_problem() {
    let solutions = generator().generate(&sgemm(100, 100, 64));
    let varying = varying_solution_parameters(&solutions);
    assert!(varying.contains(SolutionParameter::Kernels));
    assert!(varying.contains(SolutionParameter::Branch));
    assert!(varying.contains(SolutionParameter::KernelGrid));

    let kernels: Vec<_> = solutions.iter().filter_map(|s| s.main_kernel().cloned()).collect();
    let varying = varying_parameters(&kernels);
    for fixed in [KernelParameter::Problem, KernelParameter::IndexOrderC, KernelParameter::DataTypeA] {
        assert!(!varying.contains(fixed), "{fixed:?} should not vary");
    }
    assert!(varying.contains(KernelParameter::WorkGroup));
    assert!(varying.contains(KernelParameter::MicroTile));
}

#[test]
fn test_parameter_values() {
    let solution = multiple_solution(PpdProfile::default());
    let main = solution.main_kernel().unwrap();
    assert_eq!(main.parameter(KernelParameter::IndexUnroll), ParameterValue::Index(2));
    assert_eq!(main.parameter(KernelParameter::DataTypeC), ParameterValue::Type(NumericType::Single));
    assert_eq!(solution.parameter(SolutionParameter::KernelGrid), ParameterValue::Triple([2, 2, 1]));
}
