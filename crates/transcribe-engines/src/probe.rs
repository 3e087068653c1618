//! Default `SystemProbePort` implementation: real host memory via
//! `sysinfo`, real GPU memory via shelling out to `nvidia-smi`.
//!
//! Grounded on the same active-probing shape the teacher uses for its
//! dependency/hardware checks, minus the toolchain-version detection
//! this system has no use for.

use async_trait::async_trait;
use sysinfo::System;

use transcribe_core::ports::{GpuInfo, SystemMemoryInfo, SystemProbePort};

pub struct DefaultSystemProbe;

impl DefaultSystemProbe {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for DefaultSystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_nvidia_smi(stdout: &str) -> Vec<GpuInfo> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut fields = line.split(',').map(str::trim);
            let name = fields.next()?.to_string();
            let total = fields.next()?.parse::<u64>().ok()?;
            let free = fields.next()?.parse::<u64>().ok()?;
            Some(GpuInfo {
                name,
                total_memory_mb: total,
                free_memory_mb: free,
            })
        })
        .collect()
}

#[async_trait]
impl SystemProbePort for DefaultSystemProbe {
    async fn gpu_info(&self) -> Vec<GpuInfo> {
        let output = tokio::process::Command::new("nvidia-smi")
            .args(["--query-gpu=name,memory.total,memory.free", "--format=csv,noheader,nounits"])
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                parse_nvidia_smi(&String::from_utf8_lossy(&output.stdout))
            }
            _ => Vec::new(),
        }
    }

    async fn memory_info(&self) -> SystemMemoryInfo {
        let mut sys = System::new();
        sys.refresh_memory();
        SystemMemoryInfo {
            total_mb: sys.total_memory() / (1024 * 1024),
            available_mb: sys.available_memory() / (1024 * 1024),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_nvidia_smi_output() {
        let stdout = "NVIDIA GeForce RTX 4090, 24564, 20000\n";
        let gpus = parse_nvidia_smi(stdout);
        assert_eq!(gpus.len(), 1);
        assert_eq!(gpus[0].name, "NVIDIA GeForce RTX 4090");
        assert_eq!(gpus[0].total_memory_mb, 24564);
        assert_eq!(gpus[0].free_memory_mb, 20000);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let stdout = "garbage\n";
        assert!(parse_nvidia_smi(stdout).is_empty());
    }

    #[tokio::test]
    async fn memory_info_reports_nonzero_total() {
        let probe = DefaultSystemProbe::new();
        let mem = probe.memory_info().await;
        assert!(mem.total_mb > 0);
    }
}
