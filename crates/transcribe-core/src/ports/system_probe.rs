//! System resource probing port — grounds the scheduler's admission
//! limit on actual GPU/host memory rather than a hardcoded constant.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuInfo {
    pub name: String,
    pub total_memory_mb: u64,
    pub free_memory_mb: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SystemMemoryInfo {
    pub total_mb: u64,
    pub available_mb: u64,
}

#[async_trait]
pub trait SystemProbePort: Send + Sync {
    async fn gpu_info(&self) -> Vec<GpuInfo>;
    async fn memory_info(&self) -> SystemMemoryInfo;
}
