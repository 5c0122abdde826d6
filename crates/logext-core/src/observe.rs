//! Optional metrics instrumentation for the pipeline.
//!
//! When the `observe` feature is enabled, key operations emit counters,
//! histograms, and gauges via the [`metrics`] crate. A downstream
//! application must install a metrics recorder to collect the data.
//!
//! When the feature is **not** enabled every function in this module is a
//! zero-cost no-op.

/// Record an ingested or dropped event.
///
/// - `logext.ingest.accepted_total` – counter
/// - `logext.ingest.dropped_total` – counter (backpressure drops)
#[inline]
pub fn record_ingest(accepted: bool) {
    #[cfg(feature = "observe")]
    {
        if accepted {
            metrics::counter!("logext.ingest.accepted_total").increment(1);
        } else {
            metrics::counter!("logext.ingest.dropped_total").increment(1);
        }
    }
    #[cfg(not(feature = "observe"))]
    {
        let _ = accepted;
    }
}

/// Record a drain step.
///
/// - `logext.drain.events_total` – counter
/// - `logext.drain.records_created_total` – counter
/// - `logext.drain.duration_seconds` – histogram
#[inline]
pub fn record_drain(duration: std::time::Duration, events: u64, created: u64) {
    #[cfg(feature = "observe")]
    {
        metrics::counter!("logext.drain.events_total").increment(events);
        metrics::counter!("logext.drain.records_created_total").increment(created);
        metrics::histogram!("logext.drain.duration_seconds").record(duration.as_secs_f64());
    }
    #[cfg(not(feature = "observe"))]
    {
        let _ = (duration, events, created);
    }
}

/// Set the ingestion queue depth gauge.
///
/// - `logext.queue.depth` – gauge
#[inline]
pub fn set_queue_depth(depth: usize) {
    #[cfg(feature = "observe")]
    {
        metrics::gauge!("logext.queue.depth").set(depth as f64);
    }
    #[cfg(not(feature = "observe"))]
    {
        let _ = depth;
    }
}

/// Record a serialized write batch.
///
/// - `logext.writer.lines_total` – counter
/// - `logext.writer.bytes_total` – counter
#[inline]
pub fn record_write_batch(lines: u64, bytes: u64) {
    #[cfg(feature = "observe")]
    {
        metrics::counter!("logext.writer.lines_total").increment(lines);
        metrics::counter!("logext.writer.bytes_total").increment(bytes);
    }
    #[cfg(not(feature = "observe"))]
    {
        let _ = (lines, bytes);
    }
}

/// Record a file rotation.
///
/// - `logext.writer.rotations_total` – counter
#[inline]
pub fn record_rotation() {
    #[cfg(feature = "observe")]
    {
        metrics::counter!("logext.writer.rotations_total").increment(1);
    }
}

/// Record a write, rotate or cleanup failure.
///
/// - `logext.writer.errors_total` – counter with `op` label
#[inline]
pub fn record_write_error(op: &'static str) {
    #[cfg(feature = "observe")]
    {
        metrics::counter!("logext.writer.errors_total", "op" => op).increment(1);
    }
    #[cfg(not(feature = "observe"))]
    {
        let _ = op;
    }
}
