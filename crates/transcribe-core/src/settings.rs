//! Runtime configuration, loaded from the process environment.
//!
//! Mirrors the teacher's `Settings`/`SettingsUpdate`/`validate_settings`
//! shape: a fully-resolved `Settings` for normal use, plus a sparse
//! `SettingsUpdate` (all fields optional) for partial runtime updates
//! from the system API, validated through the same path as startup.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{field} must be greater than zero")]
    MustBePositive { field: &'static str },

    #[error("{field} out of range: {value} (expected {min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("{field} is required")]
    Missing { field: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeDevice {
    Cpu,
    Cuda,
    Metal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputePrecision {
    Fp32,
    Fp16,
    Int8,
}

/// Fully-resolved runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub store_url: String,
    pub uploads_dir: PathBuf,
    pub outputs_dir: PathBuf,
    pub models_dir: PathBuf,
    pub max_upload_bytes: u64,
    pub hf_token: Option<String>,
    pub default_device: ComputeDevice,
    pub compute_precision: ComputePrecision,
    pub default_concurrency: u32,
    pub model_idle_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_url: "sqlite://transcribe.db".to_string(),
            uploads_dir: PathBuf::from("./data/uploads"),
            outputs_dir: PathBuf::from("./data/outputs"),
            models_dir: PathBuf::from("./data/models"),
            max_upload_bytes: 2 * 1024 * 1024 * 1024,
            hf_token: None,
            default_device: ComputeDevice::Cpu,
            compute_precision: ComputePrecision::Fp16,
            default_concurrency: 1,
            model_idle_timeout_secs: 300,
        }
    }
}

impl Settings {
    /// Load from environment variables, falling back to defaults for
    /// anything unset.
    #[must_use]
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Ok(v) = std::env::var("STT_STORE_URL") {
            settings.store_url = v;
        }
        if let Ok(v) = std::env::var("STT_UPLOADS_DIR") {
            settings.uploads_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("STT_OUTPUTS_DIR") {
            settings.outputs_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("STT_MODELS_DIR") {
            settings.models_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("STT_MAX_UPLOAD_BYTES").and_then(|s| {
            s.parse::<u64>()
                .map_err(|_| std::env::VarError::NotPresent)
        }) {
            settings.max_upload_bytes = v;
        }
        if let Ok(v) = std::env::var("HF_TOKEN") {
            settings.hf_token = Some(v);
        }
        if let Ok(v) = std::env::var("STT_DEFAULT_CONCURRENCY").and_then(|s| {
            s.parse::<u32>()
                .map_err(|_| std::env::VarError::NotPresent)
        }) {
            settings.default_concurrency = v;
        }
        if let Ok(v) = std::env::var("STT_MODEL_IDLE_TIMEOUT_SECS").and_then(|s| {
            s.parse::<u64>()
                .map_err(|_| std::env::VarError::NotPresent)
        }) {
            settings.model_idle_timeout_secs = v;
        }

        settings
    }

    /// Merge a sparse update, returning the resulting settings without
    /// mutating `self`; callers validate the result before committing.
    #[must_use]
    pub fn merge(&self, update: &SettingsUpdate) -> Self {
        let mut next = self.clone();
        if let Some(v) = &update.hf_token {
            next.hf_token = v.clone();
        }
        if let Some(v) = update.default_device {
            next.default_device = v;
        }
        if let Some(v) = update.compute_precision {
            next.compute_precision = v;
        }
        if let Some(v) = update.default_concurrency {
            next.default_concurrency = v;
        }
        if let Some(v) = update.model_idle_timeout_secs {
            next.model_idle_timeout_secs = v;
        }
        next
    }
}

/// Sparse update for runtime settings that are safe to change without a
/// process restart. `hf_token` uses `Option<Option<String>>` so a
/// request can distinguish "leave unchanged" from "clear it".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hf_token: Option<Option<String>>,
    pub default_device: Option<ComputeDevice>,
    pub compute_precision: Option<ComputePrecision>,
    pub default_concurrency: Option<u32>,
    pub model_idle_timeout_secs: Option<u64>,
}

/// Validate a fully-resolved `Settings`, rejecting impossible values
/// before they reach the scheduler or pipeline.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if settings.max_upload_bytes == 0 {
        return Err(SettingsError::MustBePositive {
            field: "max_upload_bytes",
        });
    }
    if settings.default_concurrency == 0 {
        return Err(SettingsError::MustBePositive {
            field: "default_concurrency",
        });
    }
    if settings.default_concurrency > 64 {
        return Err(SettingsError::OutOfRange {
            field: "default_concurrency",
            value: i64::from(settings.default_concurrency),
            min: 1,
            max: 64,
        });
    }
    if settings.store_url.is_empty() {
        return Err(SettingsError::Missing { field: "store_url" });
    }
    Ok(())
}
