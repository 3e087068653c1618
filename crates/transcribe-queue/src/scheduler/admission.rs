//! Admission limit computation — how many pipeline runs the scheduler
//! lets run concurrently.

use transcribe_core::ports::{GpuInfo, SystemMemoryInfo};

/// Bytes of GPU memory budgeted per concurrent pipeline run.
const GB_PER_SLOT: u64 = 5;

/// Compute the admission limit `N` from probed hardware, per
/// `spec.md` §4.4: `max(1, floor(total_gpu_memory_gb / 5))` if a GPU is
/// present, else a CPU-thread-based fallback.
#[must_use]
pub fn compute_admission_limit(
    gpus: &[GpuInfo],
    memory: SystemMemoryInfo,
    cpu_threads: usize,
    configured_override: Option<u32>,
) -> u32 {
    if let Some(n) = configured_override {
        return n.max(1);
    }

    let total_gpu_mb: u64 = gpus.iter().map(|g| g.total_memory_mb).sum();
    if total_gpu_mb > 0 {
        let gb = total_gpu_mb / 1024;
        return (gb / GB_PER_SLOT).max(1) as u32;
    }

    let _ = memory;
    (cpu_threads / 4).max(1) as u32
}
