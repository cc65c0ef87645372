//! Prometheus reporter

use ::prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use kapplier_core::{ApplyAttempt, namespace_of, parse_apply_output};

use super::Reporter;
use crate::error::Result;

/// Metrics for apply runs
pub struct PrometheusReporter {
    registry: Registry,

    /// Exit codes of every kubectl invocation
    kubectl_exit_code_count: CounterVec,

    /// Successful and failed applies per namespace
    namespace_apply_count: CounterVec,

    /// Duration of completed runs
    run_latency: HistogramVec,

    /// Last action taken on every object
    result_summary: GaugeVec,
}

impl PrometheusReporter {
    /// Create the metrics and register them in a fresh registry
    pub fn new() -> Result<Self> {
        Self::with_registry(Registry::new())
    }

    /// Create the metrics and register them in `registry`
    pub fn with_registry(registry: Registry) -> Result<Self> {
        let kubectl_exit_code_count = CounterVec::new(
            Opts::new("kubectl_exit_code_count", "Count of kubectl exit codes"),
            &["namespace", "exit_code"],
        )?;
        registry.register(Box::new(kubectl_exit_code_count.clone()))?;

        let namespace_apply_count = CounterVec::new(
            Opts::new(
                "namespace_apply_count",
                "Success metric for every namespace applied",
            ),
            &["namespace", "success"],
        )?;
        registry.register(Box::new(namespace_apply_count.clone()))?;

        let run_latency = HistogramVec::new(
            HistogramOpts::new("run_latency_seconds", "Latency for completed apply runs"),
            &["success"],
        )?;
        registry.register(Box::new(run_latency.clone()))?;

        let result_summary = GaugeVec::new(
            Opts::new("result_summary", "Result summary for every manifest"),
            &["namespace", "type", "name", "action"],
        )?;
        registry.register(Box::new(result_summary.clone()))?;

        Ok(Self {
            registry,
            kubectl_exit_code_count,
            namespace_apply_count,
            run_latency,
            result_summary,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn export(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl Reporter for PrometheusReporter {
    fn kubectl_exit_code(&self, namespace: &str, code: i32) {
        self.kubectl_exit_code_count
            .with_label_values(&[namespace_of(namespace), &code.to_string()])
            .inc();
    }

    fn namespace_apply(&self, target: &str, success: bool) {
        self.namespace_apply_count
            .with_label_values(&[namespace_of(target), &success.to_string()])
            .inc();
    }

    fn run_latency(&self, seconds: f64, success: bool) {
        self.run_latency
            .with_label_values(&[&success.to_string()])
            .observe(seconds);
    }

    fn result_summary(&self, attempts: &[ApplyAttempt]) {
        self.result_summary.reset();

        for attempt in attempts {
            let namespace = namespace_of(&attempt.target);
            for result in parse_apply_output(&attempt.output) {
                self.result_summary
                    .with_label_values(&[namespace, &result.kind, &result.name, &result.action])
                    .set(1.0);
            }
        }
    }
}
