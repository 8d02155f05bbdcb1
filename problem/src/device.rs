//! Device descriptors carried with a problem.
//!
//! The search does not consult these; they travel with the problem so that
//! downstream writers and benchmark drivers know which device a solution set
//! was generated for.

use std::fmt;

use smallvec::SmallVec;
use snafu::ensure;

use crate::error::*;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Device {
    pub name: String,
    pub num_compute_units: usize,
    pub clock_frequency_mhz: usize,
    pub flops_per_clock: usize,
}

impl Device {
    pub fn new(name: impl Into<String>, num_compute_units: usize, clock_frequency_mhz: usize, flops_per_clock: usize) -> Self {
        Self { name: name.into(), num_compute_units, clock_frequency_mhz, flops_per_clock }
    }

    /// Peak throughput in GFLOP/s.
    pub fn peak_gflops(&self) -> usize {
        self.num_compute_units * self.clock_frequency_mhz * self.flops_per_clock / 1000
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Device; {}; {}; {}; {}]",
            self.name, self.num_compute_units, self.clock_frequency_mhz, self.flops_per_clock
        )
    }
}

/// Devices a problem is solved on. Only single-device profiles are supported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceProfile {
    pub devices: SmallVec<[Device; 1]>,
}

impl DeviceProfile {
    pub const MAX_DEVICES: usize = 1;

    pub fn single(device: Device) -> Self {
        Self { devices: smallvec::smallvec![device] }
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        let count = self.devices.len();
        ensure!(count <= Self::MAX_DEVICES, DeviceProfileNumDevicesInvalidSnafu { count, max: Self::MAX_DEVICES });
        if let Some(position) = self.devices.iter().position(|d| d.name.trim().is_empty()) {
            return DeviceNameInvalidSnafu { position }.fail();
        }
        Ok(())
    }
}
