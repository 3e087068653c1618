//! The Scheduler: a single logical queue ordered by `(priority asc,
//! created_at asc)` with a GPU-memory-derived admission policy.

pub mod admission;
pub mod queue;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

use transcribe_core::domain::{Job, JobStatus, NewJob};
use transcribe_core::events::{AppEvent, JobSummary};
use transcribe_core::ports::store::{Filter, JobMutator, JobRepository, Order, Page};
use transcribe_core::ports::{CoreError, EventBus, SystemProbePort};

use admission::compute_admission_limit;
use queue::{AdmissionKey, AdmissionQueue};

fn job_summary(job: &Job) -> JobSummary {
    JobSummary {
        id: job.id.clone(),
        status: job.status,
        progress: job.progress,
        priority: job.priority,
        error_message: job.error_message.clone(),
    }
}

/// Configuration for the scheduler's admission policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerConfig {
    /// Overrides the computed admission limit when set.
    pub max_concurrency: Option<u32>,
}

/// Owns the admission queue and the count of in-flight pipeline runs.
pub struct Scheduler {
    jobs: Arc<dyn JobRepository>,
    events: Arc<dyn EventBus>,
    queue: Mutex<AdmissionQueue>,
    admission_limit: AtomicU32,
    in_flight: AtomicU32,
    notify: Notify,
}

impl Scheduler {
    /// Build a scheduler, resolving the admission limit from the probed
    /// system unless `config.max_concurrency` overrides it.
    pub async fn new(
        jobs: Arc<dyn JobRepository>,
        events: Arc<dyn EventBus>,
        probe: &dyn SystemProbePort,
        config: SchedulerConfig,
    ) -> Result<Self, CoreError> {
        let gpus = probe.gpu_info().await;
        let memory = probe.memory_info().await;
        let cpu_threads = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(4);
        let limit = compute_admission_limit(&gpus, memory, cpu_threads, config.max_concurrency);
        info!(limit, "scheduler admission limit resolved");

        let mut queue = AdmissionQueue::new();
        for job in jobs.list_admissible().await? {
            queue.insert(job.id.clone(), AdmissionKey::new(job.priority, job.created_at));
        }

        Ok(Self {
            jobs,
            events,
            queue: Mutex::new(queue),
            admission_limit: AtomicU32::new(limit),
            in_flight: AtomicU32::new(0),
            notify: Notify::new(),
        })
    }

    #[must_use]
    pub fn admission_limit(&self) -> u32 {
        self.admission_limit.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn in_flight(&self) -> u32 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Wait until a slot may be free and an admissible job may exist.
    /// Callers should re-check `try_admit` in a loop, since this is a
    /// best-effort wake, not a guarantee.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }

    /// Persist a new job as `queued` and register it with the admission
    /// queue, assigning `queue_position`.
    pub async fn enqueue(&self, new_job: NewJob) -> Result<Job, CoreError> {
        let job = self.jobs.create(new_job).await?;
        let mut job = self
            .jobs
            .update(&job.id, &|mut current| {
                current.status = JobStatus::Queued;
                current
            })
            .await?;

        let mut queue = self.queue.lock().await;
        queue.insert(job.id.clone(), AdmissionKey::new(job.priority, job.created_at));
        job.queue_position = queue.position(&job.id);
        drop(queue);

        self.events.emit(AppEvent::StatusChanged { job: job_summary(&job) });
        self.notify.notify_waiters();
        Ok(job)
    }

    /// Reorder the given jobs: each gets priority equal to its 1-based
    /// position (capped at 10). Fails with no partial effect if any job
    /// is not in a reorderable status.
    pub async fn reorder(&self, job_ids: &[String]) -> Result<(), CoreError> {
        let mut jobs = Vec::with_capacity(job_ids.len());
        for id in job_ids {
            let job = self.jobs.get(id).await?;
            if !job.status.is_reorderable() {
                return Err(CoreError::PreconditionFailed(format!(
                    "job {id} is not reorderable in status {:?}",
                    job.status
                )));
            }
            jobs.push(job);
        }

        let mut queue = self.queue.lock().await;
        for (idx, job) in jobs.iter_mut().enumerate() {
            let priority = u8::try_from(idx + 1).unwrap_or(10).min(10);
            *job = self
                .jobs
                .update(&job.id, &move |mut current| {
                    current.priority = priority;
                    current
                })
                .await?;
            queue.insert(job.id.clone(), AdmissionKey::new(job.priority, job.created_at));
        }
        drop(queue);

        self.events.emit(AppEvent::QueueBatchReordered {
            order: job_ids.to_vec(),
        });
        Ok(())
    }

    /// Only legal for jobs in a reorderable status.
    pub async fn set_priority(&self, job_id: &str, priority: u8) -> Result<(), CoreError> {
        let job = self.jobs.get(job_id).await?;
        if !job.status.is_reorderable() {
            return Err(CoreError::PreconditionFailed(format!(
                "job {job_id} is not reorderable in status {:?}",
                job.status
            )));
        }
        let priority = priority.clamp(1, 10);
        let job = self
            .jobs
            .update(&job.id, &move |mut current| {
                current.priority = priority;
                current
            })
            .await?;

        let mut queue = self.queue.lock().await;
        queue.insert(job.id.clone(), AdmissionKey::new(job.priority, job.created_at));
        drop(queue);

        self.events.emit(AppEvent::PriorityChanged {
            job_id: job_id.to_string(),
            priority: job.priority,
        });
        Ok(())
    }

    /// For queued jobs: cancel immediately. For running jobs: the caller
    /// (pipeline executor) owns cooperative cancellation; this only
    /// removes the job from the admission queue if still present.
    pub async fn cancel(&self, job_id: &str) -> Result<(), CoreError> {
        let job = self.jobs.get(job_id).await?;
        if job.status.is_terminal() {
            return Ok(());
        }

        let mut queue = self.queue.lock().await;
        let was_queued = queue.remove(job_id);
        drop(queue);

        if was_queued || job.status == JobStatus::Pending {
            let job = self
                .jobs
                .update(&job.id, &|mut current| {
                    current.status = JobStatus::Cancelled;
                    current
                })
                .await?;
            self.events.emit(AppEvent::JobCancelled { job: job_summary(&job) });
        }
        // Running jobs: the pipeline executor polls cancellation itself;
        // nothing further to do here.
        Ok(())
    }

    /// Pop the next admissible job whose models are all present, if a
    /// slot is free. Returns `None` if at capacity or the queue is empty.
    ///
    /// A job whose models are missing is still admitted (per
    /// `spec.md` §4.4 it fails fast in stage 0) — this method only
    /// enforces the concurrency limit.
    pub async fn try_admit(&self) -> Option<Job> {
        loop {
            if self.in_flight.load(Ordering::Relaxed) >= self.admission_limit() {
                return None;
            }

            let next_id = {
                let queue = self.queue.lock().await;
                queue.peek_front()?.to_string()
            };

            let mut job = match self.jobs.get(&next_id).await {
                Ok(job) => job,
                Err(err) => {
                    warn!(%next_id, %err, "admissible job vanished from store");
                    self.queue.lock().await.remove(&next_id);
                    continue;
                }
            };

            self.queue.lock().await.remove(&next_id);
            self.in_flight.fetch_add(1, Ordering::Relaxed);
            match self
                .jobs
                .update(&job.id, &|mut current| {
                    current.status = JobStatus::Preparing;
                    current
                })
                .await
            {
                Ok(persisted) => job = persisted,
                Err(err) => {
                    warn!(%err, "failed to persist admission transition");
                    job.status = JobStatus::Preparing;
                }
            }
            job.queue_position = None;
            self.events.emit(AppEvent::StatusChanged { job: job_summary(&job) });
            debug!(job_id = %job.id, "admitted job");
            return Some(job);
        }
    }

    /// Release an admission slot once a run (success, failure, or
    /// cancellation) has completed, and wake anyone waiting to admit.
    pub fn release_slot(&self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
        self.notify.notify_waiters();
    }

    /// Queue status counts plus the ordered queue, for `GET /api/queue`.
    pub async fn snapshot(&self, limit: u32) -> Result<Vec<Job>, CoreError> {
        Ok(self
            .jobs
            .list(Filter::default(), Order::Admission, Page::first(limit))
            .await?)
    }
}
