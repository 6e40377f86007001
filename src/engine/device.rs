//! Compute device and numeric precision resolution.

use crate::{Error, Result, config::DevicePreference};
use std::{fmt, process::Command};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda(usize),
    Metal(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    BF16,
    F32,
}

impl Device {
    /// Resolves a preference against what this build and host can run.
    pub fn resolve(preference: DevicePreference) -> Result<Self> {
        match preference {
            DevicePreference::Cpu => Ok(Self::Cpu),
            DevicePreference::Cuda => {
                if !cfg!(feature = "cuda") {
                    return Err(Error::startup(
                        "CUDA requested but this binary was built without the 'cuda' feature",
                    ));
                }
                Ok(Self::Cuda(0))
            }
            DevicePreference::Metal => {
                if !cfg!(feature = "metal") {
                    return Err(Error::startup(
                        "Metal requested but this binary was built without the 'metal' feature",
                    ));
                }
                Ok(Self::Metal(0))
            }
            DevicePreference::Auto => {
                if cfg!(feature = "cuda") && nvidia_gpu_present() {
                    Ok(Self::Cuda(0))
                } else if cfg!(all(feature = "metal", target_os = "macos")) {
                    Ok(Self::Metal(0))
                } else {
                    Ok(Self::Cpu)
                }
            }
        }
    }

    pub fn is_accelerator(&self) -> bool {
        !matches!(self, Self::Cpu)
    }

    /// Lower precision on accelerators, full precision on CPU.
    pub fn precision(&self) -> Precision {
        if self.is_accelerator() {
            Precision::BF16
        } else {
            Precision::F32
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(i) => write!(f, "cuda:{i}"),
            Self::Metal(i) => write!(f, "metal:{i}"),
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BF16 => write!(f, "bf16"),
            Self::F32 => write!(f, "f32"),
        }
    }
}

fn nvidia_gpu_present() -> bool {
    match Command::new("nvidia-smi").arg("--list-gpus").output() {
        Ok(output) => {
            output.status.success() && !String::from_utf8_lossy(&output.stdout).trim().is_empty()
        }
        Err(e) => {
            debug!("nvidia-smi unavailable: {}", e);
            false
        }
    }
}
