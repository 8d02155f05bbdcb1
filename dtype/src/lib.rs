//! Element types understood by the tilegen kernel search.
//!
//! Every property is derived from a fixed lookup table; values are `Copy` and
//! compared by variant, so a single `NumericType` can be shared freely between
//! problems, kernels and threads.

use std::fmt;
use std::str::FromStr;

pub mod error;


pub use error::{Error, Result};

use error::{UnknownBackendSnafu, UnknownNumericTypeSnafu};

/// Target device language of the generated kernels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::EnumIter, strum::VariantArray)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Backend {
    #[default]
    OpenCl,
    Hip,
}

impl Backend {
    /// HIP kernels are launched through one shared argument list, so every
    /// kernel of a solution must keep the same signature.
    pub const fn requires_uniform_signatures(&self) -> bool {
        matches!(self, Self::Hip)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::OpenCl => "OpenCL",
            Self::Hip => "HIP",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "opencl" | "ocl" | "cl" => Ok(Self::OpenCl),
            "hip" => Ok(Self::Hip),
            _ => UnknownBackendSnafu { name: s }.fail(),
        }
    }
}

/// Element type of a tensor or scalar.
#[derive(Debug, Hash, PartialOrd, Ord)]
#[derive(strum::EnumCount, strum::EnumIter, strum::VariantArray, strum::FromRepr)]
#[derive(enumset::EnumSetType)]
#[cfg_attr(feature = "proptest", derive(proptest_derive::Arbitrary))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[enumset(repr = "u8")]
pub enum NumericType {
    Single = 0,
    Double = 1,
    ComplexSingle = 2,
    ComplexDouble = 3,
    Half = 4,
}

impl NumericType {
    pub const fn char_code(&self) -> char {
        match self {
            Self::Single => 'S',
            Self::Double => 'D',
            Self::ComplexSingle => 'C',
            Self::ComplexDouble => 'Z',
            Self::Half => 'H',
        }
    }

    /// Register footprint of one element, counted in half registers.
    ///
    /// A half-precision element occupies half a 32-bit register, so the exact
    /// integer form is kept here and [`registers`](Self::registers) derives
    /// from it.
    pub const fn half_registers(&self) -> u32 {
        match self {
            Self::Single => 2,
            Self::Double => 4,
            Self::ComplexSingle => 4,
            Self::ComplexDouble => 8,
            Self::Half => 1,
        }
    }

    /// Number of 32-bit registers one element occupies.
    pub fn registers(&self) -> f64 {
        f64::from(self.half_registers()) / 2.0
    }

    /// Size of one element in bytes (four bytes per register).
    pub const fn bytes(&self) -> usize {
        self.half_registers() as usize * 2
    }

    pub const fn is_real(&self) -> bool {
        matches!(self, Self::Half | Self::Single | Self::Double)
    }

    pub const fn is_complex(&self) -> bool {
        !self.is_real()
    }

    pub const fn is_double(&self) -> bool {
        matches!(self, Self::Double | Self::ComplexDouble)
    }

    /// OpenCL spelling of the type. OpenCL has no half type usable here.
    pub const fn opencl_name(&self) -> Option<&'static str> {
        match self {
            Self::Single => Some("float"),
            Self::Double => Some("double"),
            Self::ComplexSingle => Some("float2"),
            Self::ComplexDouble => Some("double2"),
            Self::Half => None,
        }
    }

    pub const fn hip_name(&self) -> &'static str {
        match self {
            Self::Single => "float",
            Self::Double => "double",
            Self::ComplexSingle => "float_2",
            Self::ComplexDouble => "double_2",
            Self::Half => "fp16",
        }
    }

    pub const fn device_name(&self, backend: Backend) -> Option<&'static str> {
        match backend {
            Backend::OpenCl => self.opencl_name(),
            Backend::Hip => Some(self.hip_name()),
        }
    }

    /// Host-side type name used by the generated library headers.
    pub const fn library_name(&self) -> &'static str {
        match self {
            Self::Single => "float",
            Self::Double => "double",
            Self::ComplexSingle => "TileGenComplexFloat",
            Self::ComplexDouble => "TileGenComplexDouble",
            Self::Half => "TileGenHalf",
        }
    }

    /// Enumerator spelling used by the generated library headers.
    pub const fn library_enum(&self) -> &'static str {
        match self {
            Self::Single => "tilegenDataTypeFloat",
            Self::Double => "tilegenDataTypeDouble",
            Self::ComplexSingle => "tilegenDataTypeComplexFloat",
            Self::ComplexDouble => "tilegenDataTypeComplexDouble",
            Self::Half => "tilegenDataTypeHalf",
        }
    }

    /// Device-language literal for zero, e.g. `(float2)(0.0, 0.0)`.
    pub fn zero_literal(&self, backend: Backend) -> Option<String> {
        let name = self.device_name(backend)?;
        let value = if self.is_real() { "0.0" } else { "0.0, 0.0" };
        Some(format!("({name})({value})"))
    }

    fn spellings(&self) -> [Option<&'static str>; 4] {
        [self.opencl_name(), Some(self.hip_name()), Some(self.library_name()), Some(self.library_enum())]
    }
}

impl fmt::Display for NumericType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.char_code())
    }
}

impl FromStr for NumericType {
    type Err = Error;

    /// Accepts the char code or any device/library spelling, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        use strum::VariantArray;

        let wanted = s.trim();
        Self::VARIANTS
            .iter()
            .copied()
            .find(|ty| {
                let code = ty.char_code();
                (wanted.len() == 1 && wanted.chars().all(|c| c.eq_ignore_ascii_case(&code)))
                    || ty.spellings().into_iter().flatten().any(|name| name.eq_ignore_ascii_case(wanted))
            })
            .map_or_else(|| UnknownNumericTypeSnafu { name: s }.fail(), Ok)
    }
}
