//! Model Registry & Downloader.
//!
//! Registers model descriptors and materializes their bytes. Grounded on
//! the lease-token/single-flight shape used for download management:
//! an in-flight `HashMap<ModelId, ActiveDownload>` guarded by a mutex,
//! a `watch::Sender<u8>` broadcasting progress to every caller awaiting
//! the same download, and a `CancellationToken` for cooperative cancel.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use transcribe_core::domain::{DownloadStatus, Model, ModelType, NewModel};
use transcribe_core::events::{AppEvent, ModelDownloadOutcome, ModelDownloadProgress};
use transcribe_core::ports::store::ModelRepository;
use transcribe_core::ports::{CoreError, EventBus};

/// Fetches the bytes for a registered model. Implementations range from
/// an HTTP download to a no-op "already local" adapter.
#[async_trait]
pub trait ModelFetcher: Send + Sync {
    /// Fetch `upstream_id`'s bytes to a local path, reporting progress
    /// through `progress`. Must observe `cancel` cooperatively.
    async fn fetch(
        &self,
        upstream_id: &str,
        revision: Option<&str>,
        progress: watch::Sender<u8>,
        cancel: CancellationToken,
    ) -> Result<String, CoreError>;

    /// Best-effort removal of a model's local bytes.
    async fn remove(&self, local_path: &str);
}

struct ActiveDownload {
    progress: watch::Receiver<u8>,
    cancel: CancellationToken,
}

/// Registers and materializes models, enforcing single-flight downloads
/// per model id.
pub struct ModelRegistry {
    models: Arc<dyn ModelRepository>,
    fetcher: Arc<dyn ModelFetcher>,
    events: Arc<dyn EventBus>,
    in_flight: Mutex<HashMap<i64, ActiveDownload>>,
}

impl ModelRegistry {
    #[must_use]
    pub fn new(
        models: Arc<dyn ModelRepository>,
        fetcher: Arc<dyn ModelFetcher>,
        events: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            models,
            fetcher,
            events,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Fails if `(engine, upstream_id)` already exists. If `is_default`,
    /// atomically unsets `default` on other models of the same type.
    pub async fn register(&self, desc: NewModel) -> Result<Model, CoreError> {
        if self.models.get_by_upstream_id(&desc.engine, &desc.upstream_id).await.is_ok() {
            return Err(CoreError::PreconditionFailed(format!(
                "model already registered: {} ({})",
                desc.upstream_id, desc.engine
            )));
        }

        let make_default = desc.is_default;
        let model_type = desc.model_type;
        let model = self.models.create(desc).await?;

        if make_default {
            self.unset_other_defaults(model_type, model.id).await?;
        }
        Ok(model)
    }

    /// Atomic swap of the default flag within `model.model_type`.
    pub async fn set_default(&self, id: i64) -> Result<Model, CoreError> {
        let model = self.models.update(id, &|mut model| {
            model.is_default = true;
            model
        }).await?;
        self.unset_other_defaults(model.model_type, id).await?;
        Ok(model)
    }

    async fn unset_other_defaults(&self, model_type: ModelType, keep_id: i64) -> Result<(), CoreError> {
        for other in self.models.list().await? {
            if other.id != keep_id && other.model_type == model_type && other.is_default {
                self.models
                    .update(other.id, &|mut other| {
                        other.is_default = false;
                        other
                    })
                    .await?;
            }
        }
        Ok(())
    }

    /// Returns the default model for a type, or `ResourceMissing`.
    pub async fn resolve(&self, model_type: ModelType) -> Result<Model, CoreError> {
        self.models
            .list()
            .await?
            .into_iter()
            .find(|m| m.model_type == model_type && m.is_default)
            .ok_or_else(|| CoreError::ResourceMissing(format!("no default model for {model_type:?}")))
    }

    /// Idempotent: if already `present` and `!force`, returns
    /// immediately. Duplicate concurrent calls for the same model id
    /// observe the same in-flight download and share its progress.
    pub async fn download(&self, id: i64, force: bool) -> Result<Model, CoreError> {
        let model = self.models.get(id).await?;
        if model.download_status.is_present() && !force {
            return Ok(model);
        }

        let mut guard = self.in_flight.lock().await;
        if let Some(active) = guard.get(&id) {
            let mut rx = active.progress.clone();
            drop(guard);
            while rx.changed().await.is_ok() {}
            return self.models.get(id).await;
        }

        let (tx, rx) = watch::channel(0u8);
        let cancel = CancellationToken::new();
        guard.insert(
            id,
            ActiveDownload {
                progress: rx,
                cancel: cancel.clone(),
            },
        );
        drop(guard);

        let result = self.run_download(&model, tx, cancel).await;
        self.in_flight.lock().await.remove(&id);
        result
    }

    async fn run_download(
        &self,
        model: &Model,
        progress_tx: watch::Sender<u8>,
        cancel: CancellationToken,
    ) -> Result<Model, CoreError> {
        let mut model = self
            .models
            .update(model.id, &|mut model| {
                model.download_status = DownloadStatus::Downloading { progress: 0 };
                model
            })
            .await?;

        let mut progress_rx = progress_tx.subscribe();
        let model_id = model.id;
        let events = self.events.clone();
        let watcher = tokio::spawn(async move {
            while progress_rx.changed().await.is_ok() {
                let pct = *progress_rx.borrow();
                events.emit(AppEvent::ModelDownloadProgress {
                    progress: ModelDownloadProgress {
                        model_id,
                        progress: pct,
                        bytes_downloaded: 0,
                        bytes_total: None,
                    },
                });
            }
        });

        let outcome = self
            .fetcher
            .fetch(&model.upstream_id, model.revision.as_deref(), progress_tx, cancel.clone())
            .await;
        watcher.abort();

        match outcome {
            Ok(local_path) => {
                let local_path_for_update = local_path.clone();
                model = self
                    .models
                    .update(model.id, &move |mut model| {
                        model.download_status = DownloadStatus::Present;
                        model.local_path = Some(local_path_for_update.clone());
                        model
                    })
                    .await?;
                self.events.emit(AppEvent::ModelDownloadCompleted {
                    outcome: ModelDownloadOutcome {
                        model_id: model.id,
                        local_path: Some(local_path),
                        error: None,
                    },
                });
                info!(model_id = model.id, "model download completed");
                Ok(model)
            }
            Err(err) => {
                let message = if cancel.is_cancelled() {
                    "cancelled".to_string()
                } else {
                    err.to_string()
                };
                let message_for_update = message.clone();
                self.models
                    .update(model.id, &move |mut model| {
                        model.download_status = DownloadStatus::Error { message: message_for_update.clone() };
                        model
                    })
                    .await?;
                self.events.emit(AppEvent::ModelDownloadFailed {
                    outcome: ModelDownloadOutcome {
                        model_id: model.id,
                        local_path: None,
                        error: Some(message),
                    },
                });
                Err(err)
            }
        }
    }

    /// Cooperatively cancel an in-flight download, if one exists.
    pub async fn cancel_download(&self, id: i64) {
        if let Some(active) = self.in_flight.lock().await.get(&id) {
            active.cancel.cancel();
        }
    }

    /// Removes the registration; if `remove_files` and the model is
    /// local, best-effort removes its bytes (failures logged, not
    /// fatal).
    pub async fn delete(&self, id: i64, remove_files: bool) -> Result<(), CoreError> {
        let model = self.models.get(id).await?;
        if remove_files {
            if let Some(path) = &model.local_path {
                self.fetcher.remove(path).await;
            }
        }
        self.models.delete(id).await.map_err(Into::into)
    }

    pub async fn list(&self) -> Result<Vec<Model>, CoreError> {
        self.models.list().await.map_err(Into::into)
    }
}

/// `ModelFetcher` backed by a real HTTP download, used for registry/
/// URL-sourced models. Streams the response body to `models_dir`,
/// reporting coarse percentage progress from `Content-Length` when the
/// server sends one (falls back to a single 100% tick at completion
/// otherwise), and aborts the stream as soon as `cancel` fires.
pub struct HttpModelFetcher {
    client: reqwest::Client,
    models_dir: std::path::PathBuf,
    hf_token: Option<String>,
}

impl HttpModelFetcher {
    #[must_use]
    pub fn new(models_dir: std::path::PathBuf, hf_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            models_dir,
            hf_token,
        }
    }

    fn url_for(&self, upstream_id: &str, revision: Option<&str>) -> String {
        match revision {
            Some(rev) => format!("https://huggingface.co/{upstream_id}/resolve/{rev}"),
            None => format!("https://huggingface.co/{upstream_id}/resolve/main"),
        }
    }
}

#[async_trait]
impl ModelFetcher for HttpModelFetcher {
    async fn fetch(
        &self,
        upstream_id: &str,
        revision: Option<&str>,
        progress: watch::Sender<u8>,
        cancel: CancellationToken,
    ) -> Result<String, CoreError> {
        use futures_util::StreamExt;
        use tokio::io::AsyncWriteExt;

        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        let mut request = self.client.get(self.url_for(upstream_id, revision));
        if let Some(token) = &self.hf_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| CoreError::Engine(err.to_string()))?
            .error_for_status()
            .map_err(|err| CoreError::Engine(err.to_string()))?;

        let total = response.content_length();
        tokio::fs::create_dir_all(&self.models_dir)
            .await
            .map_err(|err| CoreError::Internal(err.to_string()))?;
        let dest = self.models_dir.join(upstream_id.replace('/', "_"));
        let mut file = tokio::fs::File::create(&dest)
            .await
            .map_err(|err| CoreError::Internal(err.to_string()))?;

        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            if cancel.is_cancelled() {
                drop(file);
                let _ = tokio::fs::remove_file(&dest).await;
                return Err(CoreError::Cancelled);
            }
            let chunk = chunk.map_err(|err| CoreError::Engine(err.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(|err| CoreError::Internal(err.to_string()))?;
            downloaded += chunk.len() as u64;
            if let Some(total) = total {
                let pct = ((downloaded * 100) / total.max(1)).min(100) as u8;
                let _ = progress.send(pct);
            }
        }
        let _ = progress.send(100);

        Ok(dest.display().to_string())
    }

    async fn remove(&self, local_path: &str) {
        if let Err(err) = tokio::fs::remove_file(local_path).await {
            warn!(%local_path, %err, "failed to remove model file");
        }
    }
}

/// `ModelFetcher` used in tests and offline deployments: simulates a
/// download with no network access, for models already staged on disk.
pub struct LocalModelFetcher;

#[async_trait]
impl ModelFetcher for LocalModelFetcher {
    async fn fetch(
        &self,
        upstream_id: &str,
        _revision: Option<&str>,
        progress: watch::Sender<u8>,
        cancel: CancellationToken,
    ) -> Result<String, CoreError> {
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        let _ = progress.send(100);
        Ok(format!("/models/{upstream_id}"))
    }

    async fn remove(&self, local_path: &str) {
        if let Err(err) = tokio::fs::remove_file(local_path).await {
            warn!(%local_path, %err, "failed to remove model file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use transcribe_core::domain::ModelCapabilities;
    use transcribe_core::domain::ModelSource;
    use transcribe_core::ports::event_bus::Subscription;
    use transcribe_core::ports::store::RepositoryError;

    #[test]
    fn http_fetcher_resolves_pinned_revision() {
        let fetcher = HttpModelFetcher::new(std::env::temp_dir(), None);
        assert_eq!(
            fetcher.url_for("org/model", Some("v2")),
            "https://huggingface.co/org/model/resolve/v2"
        );
    }

    #[test]
    fn http_fetcher_falls_back_to_main_without_a_revision() {
        let fetcher = HttpModelFetcher::new(std::env::temp_dir(), None);
        assert_eq!(
            fetcher.url_for("org/model", None),
            "https://huggingface.co/org/model/resolve/main"
        );
    }

    #[tokio::test]
    async fn http_fetcher_honors_cancellation_before_any_request() {
        let fetcher = HttpModelFetcher::new(std::env::temp_dir(), None);
        let (tx, _rx) = watch::channel(0u8);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = fetcher.fetch("org/model", None, tx, cancel).await;
        assert!(matches!(result, Err(CoreError::Cancelled)));
    }

    #[derive(Default)]
    struct FakeModels {
        inner: StdMutex<HashMap<i64, Model>>,
        next_id: StdMutex<i64>,
    }

    #[async_trait]
    impl ModelRepository for FakeModels {
        async fn create(&self, new_model: NewModel) -> Result<Model, RepositoryError> {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            let id = *next;
            let model = Model {
                id,
                name: new_model.name,
                model_type: new_model.model_type,
                engine: new_model.engine,
                source: new_model.source,
                upstream_id: new_model.upstream_id,
                revision: new_model.revision,
                capabilities: new_model.capabilities,
                is_default: new_model.is_default,
                download_status: DownloadStatus::Absent,
                local_path: None,
            };
            self.inner.lock().unwrap().insert(id, model.clone());
            Ok(model)
        }

        async fn get(&self, id: i64) -> Result<Model, RepositoryError> {
            self.inner
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .ok_or_else(|| RepositoryError::NotFound { kind: "model", id: id.to_string() })
        }

        async fn get_by_upstream_id(&self, engine: &str, upstream_id: &str) -> Result<Model, RepositoryError> {
            self.inner
                .lock()
                .unwrap()
                .values()
                .find(|m| m.engine == engine && m.upstream_id == upstream_id)
                .cloned()
                .ok_or_else(|| RepositoryError::NotFound { kind: "model", id: upstream_id.to_string() })
        }

        async fn update(
            &self,
            id: i64,
            mutator: transcribe_core::ports::store::ModelMutator<'_>,
        ) -> Result<Model, RepositoryError> {
            let mut guard = self.inner.lock().unwrap();
            let current = guard
                .get(&id)
                .cloned()
                .ok_or_else(|| RepositoryError::NotFound { kind: "model", id: id.to_string() })?;
            let updated = mutator(current);
            guard.insert(id, updated.clone());
            Ok(updated)
        }

        async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
            self.inner.lock().unwrap().remove(&id);
            Ok(())
        }

        async fn list(&self) -> Result<Vec<Model>, RepositoryError> {
            Ok(self.inner.lock().unwrap().values().cloned().collect())
        }

        async fn count_present(&self) -> Result<u64, RepositoryError> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .values()
                .filter(|m| m.download_status.is_present())
                .count() as u64)
        }
    }

    struct NoopSub;
    #[async_trait]
    impl Subscription for NoopSub {
        async fn recv(&mut self) -> Option<AppEvent> {
            None
        }
    }
    #[derive(Default)]
    struct NoopBus;
    #[async_trait]
    impl EventBus for NoopBus {
        fn emit(&self, _event: AppEvent) {}
        async fn subscribe(&self) -> Box<dyn Subscription> {
            Box::new(NoopSub)
        }
    }

    fn desc(upstream_id: &str, is_default: bool) -> NewModel {
        desc_with_engine(upstream_id, "whisper.cpp", is_default)
    }

    fn desc_with_engine(upstream_id: &str, engine: &str, is_default: bool) -> NewModel {
        NewModel {
            name: "whisper-base".into(),
            model_type: ModelType::Stt,
            engine: engine.into(),
            source: ModelSource::Registry,
            upstream_id: upstream_id.into(),
            revision: None,
            capabilities: ModelCapabilities::default(),
            is_default,
        }
    }

    #[tokio::test]
    async fn register_rejects_duplicate_upstream_id() {
        let registry = ModelRegistry::new(
            Arc::new(FakeModels::default()),
            Arc::new(LocalModelFetcher),
            Arc::new(NoopBus),
        );
        registry.register(desc("m1", false)).await.unwrap();
        assert!(registry.register(desc("m1", false)).await.is_err());
    }

    #[tokio::test]
    async fn register_allows_same_upstream_id_under_a_different_engine() {
        let registry = ModelRegistry::new(
            Arc::new(FakeModels::default()),
            Arc::new(LocalModelFetcher),
            Arc::new(NoopBus),
        );
        registry.register(desc_with_engine("shared/model", "whisper-cpp", false)).await.unwrap();
        let second = registry.register(desc_with_engine("shared/model", "onnx", false)).await;
        assert!(second.is_ok(), "same upstream_id under a different engine is not a duplicate");
    }

    #[tokio::test]
    async fn set_default_unsets_siblings() {
        let registry = ModelRegistry::new(
            Arc::new(FakeModels::default()),
            Arc::new(LocalModelFetcher),
            Arc::new(NoopBus),
        );
        let a = registry.register(desc("a", true)).await.unwrap();
        let b = registry.register(desc("b", false)).await.unwrap();
        registry.set_default(b.id).await.unwrap();

        let a_after = registry.models.get(a.id).await.unwrap();
        assert!(!a_after.is_default);
    }

    #[tokio::test]
    async fn download_is_idempotent_when_already_present() {
        let registry = ModelRegistry::new(
            Arc::new(FakeModels::default()),
            Arc::new(LocalModelFetcher),
            Arc::new(NoopBus),
        );
        let model = registry.register(desc("m1", false)).await.unwrap();
        let downloaded = registry.download(model.id, false).await.unwrap();
        assert!(downloaded.download_status.is_present());

        let second = registry.download(model.id, false).await.unwrap();
        assert_eq!(second.local_path, downloaded.local_path);
    }

    #[tokio::test]
    async fn resolve_fails_without_a_default() {
        let registry = ModelRegistry::new(
            Arc::new(FakeModels::default()),
            Arc::new(LocalModelFetcher),
            Arc::new(NoopBus),
        );
        registry.register(desc("m1", false)).await.unwrap();
        assert!(matches!(
            registry.resolve(ModelType::Stt).await,
            Err(CoreError::ResourceMissing(_))
        ));
    }
}
