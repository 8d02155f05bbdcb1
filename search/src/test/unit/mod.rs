pub mod generator;
pub mod naming;
