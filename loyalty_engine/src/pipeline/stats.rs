use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters shared by the pipeline components. Each component is handed an `Arc` of the same instance.
#[derive(Debug, Default)]
pub struct PipelineStats {
    dispatch_cycles: AtomicU64,
    dispatch_failures: AtomicU64,
    orders_dispatched: AtomicU64,
    lookups: AtomicU64,
    transport_errors: AtomicU64,
    skipped: AtomicU64,
    protocol_errors: AtomicU64,
    rate_limited: AtomicU64,
    workers_halted: AtomicU64,
    updates_written: AtomicU64,
    write_failures: AtomicU64,
}

/// A point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub dispatch_cycles: u64,
    pub dispatch_failures: u64,
    pub orders_dispatched: u64,
    pub lookups: u64,
    pub transport_errors: u64,
    pub skipped: u64,
    pub protocol_errors: u64,
    pub rate_limited: u64,
    pub workers_halted: u64,
    pub updates_written: u64,
    pub write_failures: u64,
}

macro_rules! counter {
    ($($field:ident => $incr:ident),* $(,)?) => {
        impl PipelineStats {
            $(
                pub fn $incr(&self) {
                    self.$field.fetch_add(1, Ordering::Relaxed);
                }
            )*

            pub fn snapshot(&self) -> StatsSnapshot {
                StatsSnapshot { $($field: self.$field.load(Ordering::Relaxed)),* }
            }
        }
    };
}

counter!(
    dispatch_cycles => record_dispatch_cycle,
    dispatch_failures => record_dispatch_failure,
    orders_dispatched => record_dispatched,
    lookups => record_lookup,
    transport_errors => record_transport_error,
    skipped => record_skip,
    protocol_errors => record_protocol_error,
    rate_limited => record_rate_limited,
    workers_halted => record_worker_halted,
    updates_written => record_write,
    write_failures => record_write_failure,
);
