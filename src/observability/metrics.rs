use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Global metrics instance.
pub static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Metrics collector for projection, audit and netting.
#[derive(Debug, Clone)]
pub struct Metrics {
    initialized: bool,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self { initialized: true }
    }

    pub fn record_entry_appended(&self, kind: &str) {
        counter!("ledger_entries_appended_total", "kind" => kind.to_string()).increment(1);
    }

    pub fn record_entry_rejected(&self, kind: &str, reason: &str) {
        counter!("ledger_entries_rejected_total", "kind" => kind.to_string(), "reason" => reason.to_string()).increment(1);
    }

    pub fn record_projection(&self, entry_count: u64, account_count: u64, duration_ms: f64) {
        counter!("ledger_projections_total").increment(1);
        histogram!("ledger_projection_entry_count").record(entry_count as f64);
        histogram!("ledger_projection_account_count").record(account_count as f64);
        histogram!("ledger_projection_duration_ms").record(duration_ms);
    }

    pub fn record_malformed_entry(&self) {
        counter!("ledger_malformed_entries_total").increment(1);
    }

    pub fn record_conservation_violation(&self, check: &str) {
        counter!("ledger_conservation_violations_total", "check" => check.to_string()).increment(1);
    }

    pub fn record_plan(&self, transfer_count: u64, raw_transaction_count: u64, duration_ms: f64) {
        counter!("settlement_plans_total").increment(1);
        histogram!("settlement_plan_transfer_count").record(transfer_count as f64);
        histogram!("settlement_plan_raw_transaction_count").record(raw_transaction_count as f64);
        histogram!("settlement_plan_duration_ms").record(duration_ms);
    }

    pub fn record_plan_committed(&self, transfer_count: u64) {
        counter!("settlement_plans_committed_total").increment(1);
        counter!("settlement_transfers_committed_total").increment(transfer_count);
    }

    pub fn record_cache_lookup(&self, hit: bool) {
        counter!("ledger_projection_cache_lookups_total", "hit" => hit.to_string()).increment(1);
    }

    pub fn record_cache_invalidation(&self) {
        counter!("ledger_projection_cache_invalidations_total").increment(1);
    }
}

/// Timer for measuring operation latency.
pub struct LatencyTimer {
    start: Instant,
}

impl LatencyTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for LatencyTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Initializes the metrics system and returns the Prometheus handle.
pub fn init_metrics() -> PrometheusHandle {
    let handle = METRICS_HANDLE.get_or_init(|| {
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .expect("Failed to install Prometheus recorder");

        describe_metrics();
        handle
    });

    METRICS.get_or_init(Metrics::new);

    handle.clone()
}

/// Describes all metrics for Prometheus.
fn describe_metrics() {
    describe_counter!("ledger_entries_appended_total", Unit::Count, "Total number of ledger entries appended");
    describe_counter!("ledger_entries_rejected_total", Unit::Count, "Total number of entries rejected by validation");
    describe_counter!("ledger_malformed_entries_total", Unit::Count, "Entries the projector refused as malformed");

    describe_counter!("ledger_projections_total", Unit::Count, "Total number of balance projections");
    describe_histogram!("ledger_projection_entry_count", Unit::Count, "Entries folded per projection");
    describe_histogram!("ledger_projection_account_count", Unit::Count, "Accounts produced per projection");
    describe_histogram!("ledger_projection_duration_ms", Unit::Milliseconds, "Projection latency in milliseconds");

    describe_counter!("ledger_conservation_violations_total", Unit::Count, "Audits that found a conservation violation");

    describe_counter!("settlement_plans_total", Unit::Count, "Total number of settlement plans computed");
    describe_histogram!("settlement_plan_transfer_count", Unit::Count, "Transfers per settlement plan");
    describe_histogram!("settlement_plan_raw_transaction_count", Unit::Count, "Raw transactions netted per plan");
    describe_histogram!("settlement_plan_duration_ms", Unit::Milliseconds, "Netting latency in milliseconds");
    describe_counter!("settlement_plans_committed_total", Unit::Count, "Plans committed back to the ledger");
    describe_counter!("settlement_transfers_committed_total", Unit::Count, "Transfers committed back to the ledger");

    describe_counter!("ledger_projection_cache_lookups_total", Unit::Count, "Projection cache lookups");
    describe_counter!("ledger_projection_cache_invalidations_total", Unit::Count, "Projection cache invalidations");
}

/// Returns the global metrics instance.
pub fn get_metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}
