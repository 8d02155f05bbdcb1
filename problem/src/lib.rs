//! Problem model for the tilegen kernel search.
//!
//! A [`Problem`] bundles the output tensor C, the inputs A and B, and the
//! [`Operation`] describing which shared index each of their axes carries.
//! Construction validates the whole structure up front, so every later stage
//! can rely on:
//!
//! - every index id below `num_indices_c` appears in A, B or both;
//! - every summation id appears in both A and B;
//! - at least two free indices and one summation index exist;
//! - a shared index has the same extent in every tensor carrying it.

pub mod device;
pub mod error;
pub mod operation;
pub mod problem;
pub mod tensor;


pub use device::{Device, DeviceProfile};
pub use error::{Error, Result};
pub use operation::{Assignments, INDEX_CHARS, IndexRoles, Operation};
pub use problem::Problem;
pub use tensor::{Dimension, MAX_DIMENSIONS, Tensor, TensorId};
pub use tilegen_dtype::{Backend, NumericType};
