// ============================================================
// Layer 3 — Compute Device
// ============================================================
// Which backend a worker runs its forward passes on.
// The coordinator only carries these around; the cost-function
// builder in the ml layer is the one place that inspects them.
//
// Accepted spellings (case-insensitive):
//   cpu
//   gpu, gpu0, gpu1, ...
//   cuda0, cuda:1, wgpu2   (all mean "discrete GPU n")

use std::{fmt, str::FromStr};

use crate::domain::errors::EvalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComputeDevice {
    Cpu,
    Gpu(usize),
}

impl FromStr for ComputeDevice {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if lower == "cpu" {
            return Ok(Self::Cpu);
        }

        let ordinal = ["wgpu", "cuda", "gpu"]
            .iter()
            .find_map(|prefix| lower.strip_prefix(prefix))
            .map(|rest| rest.trim_start_matches(':'));

        match ordinal {
            Some("") => Ok(Self::Gpu(0)),
            Some(n) => n
                .parse::<usize>()
                .map(Self::Gpu)
                .map_err(|_| EvalError::Config(format!("invalid device '{s}'"))),
            None => Err(EvalError::Config(format!("invalid device '{s}'"))),
        }
    }
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Gpu(n) => write!(f, "gpu{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_gpu_spellings() {
        assert_eq!("gpu".parse::<ComputeDevice>().unwrap(), ComputeDevice::Gpu(0));
        assert_eq!("gpu3".parse::<ComputeDevice>().unwrap(), ComputeDevice::Gpu(3));
        assert_eq!("cuda:1".parse::<ComputeDevice>().unwrap(), ComputeDevice::Gpu(1));
        assert_eq!("WGPU2".parse::<ComputeDevice>().unwrap(), ComputeDevice::Gpu(2));
    }

    #[test]
    fn test_rejects_unknown_devices() {
        assert!("tpu0".parse::<ComputeDevice>().is_err());
        assert!("gpuX".parse::<ComputeDevice>().is_err());
        assert!("".parse::<ComputeDevice>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for d in [ComputeDevice::Cpu, ComputeDevice::Gpu(4)] {
            assert_eq!(d.to_string().parse::<ComputeDevice>().unwrap(), d);
        }
    }
}
