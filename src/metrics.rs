use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter = register_counter!(
        "blog_gateway_requests_total",
        "Total number of generation requests"
    )
    .unwrap();
    pub static ref RATE_LIMITED: Counter = register_counter!(
        "blog_gateway_rate_limited_total",
        "Requests rejected by the admission gate"
    )
    .unwrap();
    pub static ref PROVIDER_FAILURES: Counter = register_counter!(
        "blog_gateway_provider_failures_total",
        "Failed content provider calls"
    )
    .unwrap();
    pub static ref PROVIDER_LATENCY: Histogram = register_histogram!(
        "blog_gateway_provider_latency_seconds",
        "Content provider latency in seconds"
    )
    .unwrap();
    pub static ref TRACKED_KEYS: Gauge = register_gauge!(
        "blog_gateway_tracked_keys",
        "Client keys currently tracked by the gate"
    )
    .unwrap();
}
