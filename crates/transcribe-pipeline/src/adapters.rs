//! Resolves a registered [`Model`] to a loaded engine adapter, sharing
//! instances through `transcribe-engines`' idle-timeout cache
//! (`spec.md` §4.6).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use transcribe_core::domain::Model;
use transcribe_core::ports::engines::{DiarizationAdapter, EngineError, SttAdapter, TtsAdapter};
use transcribe_core::settings::{ComputeDevice, ComputePrecision};
use transcribe_engines::cache::AdapterCache;
use transcribe_engines::{ProcessDiarizationAdapter, ProcessSttAdapter, ProcessTtsAdapter};

/// Builds and caches engine adapters for resolved models.
#[async_trait]
pub trait AdapterFactory: Send + Sync {
    async fn stt(&self, model: &Model) -> Result<Arc<dyn SttAdapter>, EngineError>;
    async fn diarization(&self, model: &Model) -> Result<Arc<dyn DiarizationAdapter>, EngineError>;
    async fn tts(&self, model: &Model) -> Result<Arc<dyn TtsAdapter>, EngineError>;
}

fn cache_key(model: &Model, device: ComputeDevice, precision: ComputePrecision) -> String {
    format!("{}:{}:{:?}:{:?}", model.engine, model.id, device, precision)
}

/// Looks up the binary for `model.engine` on the configured search path
/// and shells out to it via a `transcribe-engines` process adapter. One
/// cache per capability, keyed by `(engine, model_id, device,
/// compute_type)`.
pub struct ProcessAdapterFactory {
    device: ComputeDevice,
    precision: ComputePrecision,
    stt_cache: AdapterCache<dyn SttAdapter>,
    diarization_cache: AdapterCache<dyn DiarizationAdapter>,
    tts_cache: AdapterCache<dyn TtsAdapter>,
}

impl ProcessAdapterFactory {
    #[must_use]
    pub fn new(device: ComputeDevice, precision: ComputePrecision) -> Self {
        Self {
            device,
            precision,
            stt_cache: AdapterCache::with_default_timeout(),
            diarization_cache: AdapterCache::with_default_timeout(),
            tts_cache: AdapterCache::with_default_timeout(),
        }
    }

    #[must_use]
    pub fn with_idle_timeout(device: ComputeDevice, precision: ComputePrecision, idle_timeout: Duration) -> Self {
        Self {
            device,
            precision,
            stt_cache: AdapterCache::new(idle_timeout),
            diarization_cache: AdapterCache::new(idle_timeout),
            tts_cache: AdapterCache::new(idle_timeout),
        }
    }
}

#[async_trait]
impl AdapterFactory for ProcessAdapterFactory {
    async fn stt(&self, model: &Model) -> Result<Arc<dyn SttAdapter>, EngineError> {
        let key = cache_key(model, self.device, self.precision);
        let binary = model.engine.clone();
        Ok(self
            .stt_cache
            .get_or_insert_with(&key, move || Arc::new(ProcessSttAdapter::new(binary)))
            .await)
    }

    async fn diarization(&self, model: &Model) -> Result<Arc<dyn DiarizationAdapter>, EngineError> {
        let key = cache_key(model, self.device, self.precision);
        let binary = model.engine.clone();
        Ok(self
            .diarization_cache
            .get_or_insert_with(&key, move || Arc::new(ProcessDiarizationAdapter::new(binary)))
            .await)
    }

    async fn tts(&self, model: &Model) -> Result<Arc<dyn TtsAdapter>, EngineError> {
        let key = cache_key(model, self.device, self.precision);
        let binary = model.engine.clone();
        Ok(self
            .tts_cache
            .get_or_insert_with(&key, move || Arc::new(ProcessTtsAdapter::new(binary)))
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transcribe_core::domain::{ModelCapabilities, ModelSource, ModelType};
    use transcribe_core::domain::DownloadStatus;

    fn sample_model(id: i64) -> Model {
        Model {
            id,
            name: "whisper-base".into(),
            model_type: ModelType::Stt,
            engine: "whisper-cpp".into(),
            source: ModelSource::Registry,
            upstream_id: "ggml-org/whisper-base".into(),
            revision: None,
            capabilities: ModelCapabilities::default(),
            is_default: true,
            download_status: DownloadStatus::Present,
            local_path: Some("/models/whisper-base.bin".into()),
        }
    }

    #[tokio::test]
    async fn resolves_an_stt_adapter_for_a_model() {
        let factory = ProcessAdapterFactory::new(ComputeDevice::Cpu, ComputePrecision::Fp32);
        let adapter = factory.stt(&sample_model(1)).await.unwrap();
        // Distinct calls for the same model id share the cached instance.
        let again = factory.stt(&sample_model(1)).await.unwrap();
        assert!(Arc::ptr_eq(&adapter, &again));
    }
}
