// Metrics and observability module
// Collection of quoting and execution counters for the aggregator
//
// Numan Thabit 2026 Aug

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};

pub static QUOTE_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "aggr_quote_latency_seconds",
        "latency of per-venue return-curve evaluation",
        &["family"]
    )
    .unwrap()
});

pub static QUOTE_ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "aggr_quote_errors_total",
        "venue quote failures converted to zero at the adapter boundary",
        &["source", "kind"]
    )
    .unwrap()
});

pub static SWAPS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "aggr_swaps_total",
        "executed swaps by outcome",
        &["result"]
    )
    .unwrap()
});
