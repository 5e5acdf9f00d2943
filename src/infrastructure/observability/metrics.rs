//! Cache and invalidation metrics
//!
//! Counters go through the `metrics` facade; installing an exporter is left to
//! the host application.

use std::time::Duration;

use metrics::{counter, histogram};

use crate::domain::invalidation::ScheduleOutcome;

/// Record a cache read for one entity type
pub fn record_cache_read(type_name: &str, category: &str, hit: bool) {
    let labels = [
        ("type", type_name.to_string()),
        ("category", category.to_string()),
    ];

    if hit {
        counter!("multicache_hits_total", &labels).increment(1);
    } else {
        counter!("multicache_misses_total", &labels).increment(1);
    }
}

/// Record a background invalidation request
pub fn record_invalidation_request(outcome: ScheduleOutcome) {
    let label = match outcome {
        ScheduleOutcome::Scheduled => "scheduled",
        ScheduleOutcome::AlreadyScheduled => "deduplicated",
    };

    counter!("multicache_invalidation_requests_total", "outcome" => label).increment(1);
}

/// Record a completed scan-delete
pub fn record_scan_delete(params: ScanDeleteMetricParams) {
    let mode = if params.background { "background" } else { "sync" };

    counter!("multicache_keys_deleted_total", "mode" => mode).increment(params.deleted as u64);
    histogram!("multicache_scan_delete_duration_seconds", "mode" => mode)
        .record(params.duration.as_secs_f64());

    if !params.success {
        counter!("multicache_scan_delete_errors_total", "mode" => mode).increment(1);
    }
}

/// Parameters for scan-delete metrics
pub struct ScanDeleteMetricParams {
    pub deleted: usize,
    pub duration: Duration,
    pub background: bool,
    pub success: bool,
}
