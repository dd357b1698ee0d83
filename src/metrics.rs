use tracing::trace;

// Counters are emitted as trace events; the Prometheus handle only renders
// whatever recorder output exists.

pub fn inc_requests(route: &'static str) {
    trace!(
        target = "media.metrics",
        route = route,
        "requests_total_inc"
    );
}

pub fn lookup_elapsed(source: &'static str, outcome: &'static str, elapsed_ms: u128) {
    trace!(
        target = "media.metrics",
        source = source,
        outcome = outcome,
        elapsed_ms = elapsed_ms as u64,
        "lookup_elapsed"
    );
}
