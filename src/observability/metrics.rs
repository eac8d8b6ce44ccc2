//! Metrics collection.
//!
//! # Metrics
//! - `goblin_startup_step_seconds` (histogram): duration of each setup step
//! - `goblin_migrations_applied_total` (counter): migrations run, by set
//! - `goblin_storage_operations_total` (counter): backend calls, by operation
//! - `goblin_cache_lookups_total` (counter): cache reads, by namespace and result

use std::time::Instant;

pub fn record_startup_step(step: &'static str, started: Instant) {
    metrics::histogram!("goblin_startup_step_seconds", "step" => step)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_migrations_applied(set: &'static str, count: usize) {
    metrics::counter!("goblin_migrations_applied_total", "set" => set).increment(count as u64);
}

pub fn record_storage_op(op: &'static str) {
    metrics::counter!("goblin_storage_operations_total", "op" => op).increment(1);
}

pub fn record_cache_lookup(namespace: &str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!(
        "goblin_cache_lookups_total",
        "namespace" => namespace.to_string(),
        "result" => result
    )
    .increment(1);
}
