//! Persistence ports — the Store.

use async_trait::async_trait;

use crate::domain::{Job, JobBatch, JobStatus, Model, NewJob, NewModel, Transcript};
use crate::ports::RepositoryError;

/// Sort order for a listing query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// `priority asc, created_at asc` — the scheduler's admission order.
    Admission,
    CreatedAtDesc,
}

/// Pagination window for a listing query.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub offset: u32,
    pub limit: u32,
}

impl Page {
    #[must_use]
    pub const fn first(limit: u32) -> Self {
        Self { offset: 0, limit }
    }
}

/// Filter predicate for job listings.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub status: Option<JobStatus>,
    pub batch_id: Option<String>,
}

impl Filter {
    #[must_use]
    pub fn by_status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            batch_id: None,
        }
    }

    #[must_use]
    pub fn by_batch(batch_id: impl Into<String>) -> Self {
        Self {
            status: None,
            batch_id: Some(batch_id.into()),
        }
    }
}

/// A mutator is handed the row currently in the store and returns the row
/// to write back; it may be invoked more than once if the write loses a
/// race for the row's write lock, so it must be pure in terms of its
/// argument (read external state before calling `update`, not inside the
/// mutator).
pub type JobMutator<'a> = &'a (dyn Fn(Job) -> Job + Send + Sync);
pub type BatchMutator<'a> = &'a (dyn Fn(JobBatch) -> JobBatch + Send + Sync);
pub type ModelMutator<'a> = &'a (dyn Fn(Model) -> Model + Send + Sync);

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, job: NewJob) -> Result<Job, RepositoryError>;
    async fn get(&self, id: &str) -> Result<Job, RepositoryError>;
    /// Reads the current row, applies `mutator`, and writes the result
    /// back in one transaction, retrying `mutator` if another writer wins
    /// the row's lock first. Returns the row as written.
    async fn update(&self, id: &str, mutator: JobMutator<'_>) -> Result<Job, RepositoryError>;
    async fn delete(&self, id: &str) -> Result<(), RepositoryError>;
    async fn list(
        &self,
        filter: Filter,
        order: Order,
        page: Page,
    ) -> Result<Vec<Job>, RepositoryError>;
    /// All jobs in `Pending` or `Queued`, ordered for scheduling.
    async fn list_admissible(&self) -> Result<Vec<Job>, RepositoryError>;
    async fn count_by_status(&self, status: JobStatus) -> Result<u64, RepositoryError>;
    /// Jobs that transitioned into a terminal state within the trailing hour.
    async fn count_completed_last_hour(&self) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait BatchRepository: Send + Sync {
    async fn create(&self, batch: JobBatch) -> Result<JobBatch, RepositoryError>;
    async fn get(&self, id: &str) -> Result<JobBatch, RepositoryError>;
    async fn update(&self, id: &str, mutator: BatchMutator<'_>) -> Result<JobBatch, RepositoryError>;
    async fn list(&self, page: Page) -> Result<Vec<JobBatch>, RepositoryError>;
}

#[async_trait]
pub trait TranscriptRepository: Send + Sync {
    async fn put(&self, transcript: Transcript) -> Result<(), RepositoryError>;
    async fn get(&self, job_id: &str) -> Result<Transcript, RepositoryError>;
    async fn delete(&self, job_id: &str) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ModelRepository: Send + Sync {
    async fn create(&self, model: NewModel) -> Result<Model, RepositoryError>;
    async fn get(&self, id: i64) -> Result<Model, RepositoryError>;
    async fn get_by_upstream_id(&self, engine: &str, upstream_id: &str) -> Result<Model, RepositoryError>;
    async fn update(&self, id: i64, mutator: ModelMutator<'_>) -> Result<Model, RepositoryError>;
    async fn delete(&self, id: i64) -> Result<(), RepositoryError>;
    async fn list(&self) -> Result<Vec<Model>, RepositoryError>;
    async fn count_present(&self) -> Result<u64, RepositoryError>;
}
