//! In-process worker pool executing background invalidation jobs

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::DomainError;
use crate::domain::invalidation::{InvalidationJob, InvalidationQueue};

use super::blocking::BlockingInvalidator;

/// Configuration for the worker pool
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerPoolConfig {
    /// Number of concurrent workers
    pub workers: usize,
    /// Jobs buffered before enqueue starts failing
    pub queue_capacity: usize,
    /// Attempts per job, including the first
    pub max_attempts: u32,
    /// Delay between attempts
    pub retry_backoff: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 1024,
            max_attempts: 3,
            retry_backoff: Duration::from_millis(200),
        }
    }
}

impl WorkerPoolConfig {
    /// Sets the number of workers
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the queue capacity
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Sets the maximum attempts per job
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the retry backoff
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }
}

/// Sending half of the pool; `enqueue` never waits for a free slot
#[derive(Debug)]
pub struct WorkerPoolQueue {
    sender: Mutex<Option<mpsc::Sender<InvalidationJob>>>,
}

impl WorkerPoolQueue {
    fn close(&self) {
        match self.sender.lock() {
            Ok(mut sender) => sender.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
    }
}

#[async_trait]
impl InvalidationQueue for WorkerPoolQueue {
    async fn enqueue(&self, job: InvalidationJob) -> Result<(), DomainError> {
        let sender = self
            .sender
            .lock()
            .map_err(|_| DomainError::queue("Worker pool queue poisoned"))?
            .clone()
            .ok_or_else(|| DomainError::queue("Worker pool is shut down"))?;

        sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(job) => DomainError::queue(format!(
                "Worker pool queue full, dropped job for '{}'",
                job.pattern
            )),
            TrySendError::Closed(_) => DomainError::queue("Worker pool is shut down"),
        })
    }
}

/// Tokio worker pool draining a bounded job channel
pub struct WorkerPool {
    queue: Arc<WorkerPoolQueue>,
    handles: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.handles.len())
            .finish()
    }
}

impl WorkerPool {
    /// Spawns the workers on the current tokio runtime
    pub fn start(invalidator: BlockingInvalidator, config: WorkerPoolConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let worker_count = config.workers.max(1);

        let handles = (0..worker_count)
            .map(|worker| {
                let receiver = receiver.clone();
                let invalidator = invalidator.clone();
                let config = config.clone();

                tokio::spawn(async move {
                    loop {
                        // The lock is held only while waiting for the next job
                        let job = receiver.lock().await.recv().await;

                        match job {
                            Some(job) => run_job(worker, &invalidator, &job, &config).await,
                            None => break,
                        }
                    }
                })
            })
            .collect();

        info!(workers = worker_count, "Invalidation worker pool started");

        Self {
            queue: Arc::new(WorkerPoolQueue {
                sender: Mutex::new(Some(sender)),
            }),
            handles,
        }
    }

    /// Queue handle to pass to the invalidation engine
    pub fn queue(&self) -> Arc<dyn InvalidationQueue> {
        self.queue.clone()
    }

    /// Stops accepting jobs, drains the queue, and waits for the workers
    pub async fn shutdown(self) {
        self.queue.close();

        for result in join_all(self.handles).await {
            if let Err(e) = result {
                error!(error = %e, "Invalidation worker panicked");
            }
        }

        info!("Invalidation worker pool stopped");
    }
}

async fn run_job(
    worker: usize,
    invalidator: &BlockingInvalidator,
    job: &InvalidationJob,
    config: &WorkerPoolConfig,
) {
    let max_attempts = config.max_attempts.max(1);
    let queued_ms = job.queued_for().as_millis() as u64;

    debug!(
        worker,
        job_id = %job.id,
        pattern = %job.pattern,
        queued_ms,
        "Invalidation job picked up"
    );

    for attempt in 1..=max_attempts {
        match invalidator.perform(job).await {
            Ok(deleted) => {
                info!(
                    worker,
                    job_id = %job.id,
                    pattern = %job.pattern,
                    deleted,
                    attempt,
                    queued_ms,
                    "Invalidation job completed"
                );
                return;
            }
            Err(e) if e.is_transient() && attempt < max_attempts => {
                warn!(
                    worker,
                    job_id = %job.id,
                    pattern = %job.pattern,
                    attempt,
                    error = %e,
                    "Invalidation job failed, retrying"
                );
                tokio::time::sleep(config.retry_backoff).await;
            }
            Err(e) => {
                error!(
                    worker,
                    job_id = %job.id,
                    pattern = %job.pattern,
                    attempt,
                    error = %e,
                    "Invalidation job failed"
                );
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::{CacheStore, MockCacheStore, ScanPage};
    use crate::infrastructure::store::{InMemoryStore, StoreAccessor};

    fn invalidator_with(store: Arc<dyn CacheStore>) -> BlockingInvalidator {
        BlockingInvalidator::new(Arc::new(StoreAccessor::with_store(store)))
    }

    #[tokio::test]
    async fn test_jobs_run_before_shutdown_returns() {
        let store = Arc::new(InMemoryStore::new());
        for i in 0..10 {
            store
                .hset(&format!("MultiCache:Widget:{}", i), "summary", "{}")
                .await
                .unwrap();
        }
        store.hset("MultiCache:Gadget:1", "summary", "{}").await.unwrap();

        let pool = WorkerPool::start(invalidator_with(store.clone()), WorkerPoolConfig::default());
        pool.queue()
            .enqueue(InvalidationJob::new("MultiCache:Widget:*", 3))
            .await
            .unwrap();
        pool.shutdown().await;

        assert!(store.hget_all("MultiCache:Widget:3").await.unwrap().is_empty());
        assert!(!store.hget_all("MultiCache:Gadget:1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_enqueue_after_shutdown_fails() {
        let pool = WorkerPool::start(
            invalidator_with(Arc::new(InMemoryStore::new())),
            WorkerPoolConfig::default().with_workers(1),
        );
        let queue = pool.queue();
        pool.shutdown().await;

        let result = queue.enqueue(InvalidationJob::new("MultiCache:Widget:*", 10)).await;
        assert!(matches!(result, Err(DomainError::Queue { .. })));
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let mut store = MockCacheStore::new();
        let mut seq = mockall::Sequence::new();
        store
            .expect_del()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(DomainError::store("connection reset")));
        store
            .expect_del()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(true));
        store
            .expect_scan()
            .times(1)
            .returning(|_, _, _| Ok(ScanPage::new(0, vec![])));

        let config = WorkerPoolConfig::default()
            .with_workers(1)
            .with_retry_backoff(Duration::from_millis(1));
        let pool = WorkerPool::start(invalidator_with(Arc::new(store)), config);

        pool.queue()
            .enqueue(InvalidationJob::new("MultiCache:Widget:*", 10))
            .await
            .unwrap();
        pool.shutdown().await;
    }

    #[test]
    fn test_config_builders() {
        let config = WorkerPoolConfig::default()
            .with_workers(4)
            .with_queue_capacity(8)
            .with_max_attempts(1);

        assert_eq!(config.workers, 4);
        assert_eq!(config.queue_capacity, 8);
        assert_eq!(config.max_attempts, 1);
    }
}
