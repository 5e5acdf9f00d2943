//! Observability infrastructure - Metrics

mod metrics;

pub use metrics::{
    record_cache_read, record_invalidation_request, record_scan_delete, ScanDeleteMetricParams,
};
