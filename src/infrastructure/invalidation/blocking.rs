//! Synchronous scan-delete

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument};

use crate::domain::DomainError;
use crate::domain::cache::{guard_key, is_guard_key};
use crate::domain::invalidation::InvalidationJob;
use crate::infrastructure::observability::{ScanDeleteMetricParams, record_scan_delete};
use crate::infrastructure::store::StoreAccessor;

/// Rejects patterns that are blank or would match the whole key-space
pub fn validate_pattern(pattern: &str) -> Result<&str, DomainError> {
    let pattern = pattern.trim();

    if pattern.is_empty() {
        return Err(DomainError::invalid_pattern("Pattern can not be blank"));
    }

    if pattern.chars().all(|c| c == '*') {
        return Err(DomainError::invalid_pattern(format!(
            "Refusing to invalidate universal pattern '{}'",
            pattern
        )));
    }

    Ok(pattern)
}

/// Deletes keys matching a pattern in bounded cursor batches
#[derive(Debug, Clone)]
pub struct BlockingInvalidator {
    accessor: Arc<StoreAccessor>,
}

impl BlockingInvalidator {
    pub fn new(accessor: Arc<StoreAccessor>) -> Self {
        Self { accessor }
    }

    /// Deletes `pattern` literally, or every key matching it
    ///
    /// A literal key is used untrimmed. Pattern scans never delete guard keys.
    ///
    /// Returns the number of keys deleted. A store failure aborts the run; keys
    /// already deleted stay deleted.
    #[instrument(skip(self))]
    pub async fn invalidate_sync(
        &self,
        pattern: &str,
        exact_match: bool,
        block_size: usize,
    ) -> Result<usize, DomainError> {
        let validated = validate_pattern(pattern)?;
        let target = if exact_match { pattern } else { validated };
        let started = Instant::now();

        let result = self.scan_delete(target, exact_match, block_size).await;

        record_scan_delete(ScanDeleteMetricParams {
            deleted: *result.as_ref().unwrap_or(&0),
            duration: started.elapsed(),
            background: false,
            success: result.is_ok(),
        });

        result
    }

    async fn scan_delete(
        &self,
        pattern: &str,
        exact_match: bool,
        block_size: usize,
    ) -> Result<usize, DomainError> {
        let store = self.accessor.get_store().await?;

        if exact_match {
            let deleted = store.del(pattern).await?;
            return Ok(usize::from(deleted));
        }

        let mut cursor = 0u64;
        let mut total_deleted = 0usize;

        loop {
            let page = store.scan(cursor, pattern, block_size.max(1)).await?;

            // Guards of queued jobs are released only by their own job
            for key in page.keys.iter().filter(|key| !is_guard_key(key)) {
                if store.del(key).await? {
                    total_deleted += 1;
                }
            }

            debug!(
                pattern,
                batch = page.keys.len(),
                total_deleted,
                "Scan-delete batch done"
            );

            if page.is_last() {
                break;
            }

            cursor = page.cursor;
        }

        Ok(total_deleted)
    }

    /// Runs one background job: release its guard, then scan-delete its pattern
    #[instrument(skip(self, job), fields(job_id = %job.id, pattern = %job.pattern))]
    pub async fn perform(&self, job: &InvalidationJob) -> Result<usize, DomainError> {
        let started = Instant::now();

        // The guard is released first so mutations during the scan can schedule a follow-up
        let result = async {
            self.scan_delete(&guard_key(&job.pattern), true, 1).await?;
            let pattern = validate_pattern(&job.pattern)?;
            self.scan_delete(pattern, false, job.block_size).await
        }
        .await;

        record_scan_delete(ScanDeleteMetricParams {
            deleted: *result.as_ref().unwrap_or(&0),
            duration: started.elapsed(),
            background: true,
            success: result.is_ok(),
        });

        result
    }
}
