//! Prometheus metrics registration and export.

use prometheus::{CounterVec, Encoder, GaugeVec, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::{Mutex, OnceLock};

/// Global Prometheus registry for all gateway metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Jobs submitted, labeled by scheduler.
pub static JOBS_SUBMITTED_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Watch polls, labeled by outcome (unchanged, changed, terminal, error).
pub static JOB_POLLS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Finished transfers, labeled by kind and final status.
pub static TRANSFERS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Transfer duration in seconds, labeled by kind.
pub static TRANSFER_DURATION: OnceLock<HistogramVec> = OnceLock::new();

/// Background tasks in flight, labeled by kind (watch, transfer).
pub static ACTIVE_TASKS: OnceLock<GaugeVec> = OnceLock::new();

/// Telemetry requests, labeled by status.
pub static TELEMETRY_REQUESTS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

static INIT_LOCK: Mutex<()> = Mutex::new(());

/// Initialize all metrics and register them with the registry.
///
/// Calling this more than once keeps the first registry.
///
/// # Errors
///
/// Returns a `prometheus::Error` if metric registration fails.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let _guard = INIT_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    if REGISTRY.get().is_some() {
        return Ok(());
    }

    let registry = Registry::new();

    // Job metrics
    let jobs_submitted_total = CounterVec::new(
        Opts::new("hpc_gateway_jobs_submitted_total", "Total number of jobs submitted"),
        &["scheduler"],
    )?;

    let job_polls_total = CounterVec::new(
        Opts::new("hpc_gateway_job_polls_total", "Total job status polls"),
        &["outcome"],
    )?;

    // Transfer metrics
    let transfers_total = CounterVec::new(
        Opts::new("hpc_gateway_transfers_total", "Total finished file transfers"),
        &["kind", "status"],
    )?;

    let transfer_duration = HistogramVec::new(
        prometheus::HistogramOpts::new(
            "hpc_gateway_transfer_duration_seconds",
            "File transfer duration in seconds",
        )
        .buckets(vec![1.0, 5.0, 15.0, 60.0, 300.0, 900.0, 3600.0]),
        &["kind"],
    )?;

    // Task metrics
    let active_tasks = GaugeVec::new(
        Opts::new("hpc_gateway_active_tasks", "Background tasks in flight"),
        &["kind"],
    )?;

    // Telemetry metrics
    let telemetry_requests_total = CounterVec::new(
        Opts::new(
            "hpc_gateway_telemetry_requests_total",
            "Total telemetry requests",
        ),
        &["status"],
    )?;

    registry.register(Box::new(jobs_submitted_total.clone()))?;
    registry.register(Box::new(job_polls_total.clone()))?;
    registry.register(Box::new(transfers_total.clone()))?;
    registry.register(Box::new(transfer_duration.clone()))?;
    registry.register(Box::new(active_tasks.clone()))?;
    registry.register(Box::new(telemetry_requests_total.clone()))?;

    // The registry goes last: it marks initialization as complete.
    let _ = JOBS_SUBMITTED_TOTAL.set(jobs_submitted_total);
    let _ = JOB_POLLS_TOTAL.set(job_polls_total);
    let _ = TRANSFERS_TOTAL.set(transfers_total);
    let _ = TRANSFER_DURATION.set(transfer_duration);
    let _ = ACTIVE_TASKS.set(active_tasks);
    let _ = TELEMETRY_REQUESTS_TOTAL.set(telemetry_requests_total);
    let _ = REGISTRY.set(registry);

    tracing::info!("Prometheus metrics initialized successfully");

    Ok(())
}

/// Export all registered metrics in Prometheus text format.
///
/// Returns a comment line instead when the registry has not been
/// initialized or encoding fails.
pub fn export_metrics() -> String {
    let Some(registry) = REGISTRY.get() else {
        return "# Metrics not initialized. Call init_metrics() first.\n".to_string();
    };

    let encoder = TextEncoder::new();
    let metric_families = registry.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return format!("# Error encoding metrics: {}\n", e);
    }

    String::from_utf8(buffer)
        .unwrap_or_else(|e| format!("# Error converting metrics to UTF-8: {}\n", e))
}
