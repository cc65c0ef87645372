//! Run reporting
//!
//! A [`Reporter`] receives everything worth counting during a run. It is
//! constructed by the process entry point and handed to the components that
//! report into it; there is no global registry.
//!
//! - [`PrometheusReporter`]: counters, histogram and gauges in a private
//!   `prometheus::Registry`
//! - [`RecordingReporter`]: in-memory log of calls for tests

mod prometheus;
mod recording;

pub use self::prometheus::PrometheusReporter;
pub use self::recording::{RecordedEvent, RecordingReporter};

use kapplier_core::ApplyAttempt;

/// Sink for run metrics
pub trait Reporter: Send + Sync {
    /// A kubectl invocation finished with `code`
    fn kubectl_exit_code(&self, namespace: &str, code: i32);

    /// A target was applied, successfully or not
    fn namespace_apply(&self, target: &str, success: bool);

    /// A run finished after `seconds`
    fn run_latency(&self, seconds: f64, success: bool);

    /// Replace the per-object summary with the objects reported by `attempts`
    fn result_summary(&self, attempts: &[ApplyAttempt]);
}

impl<R: Reporter + ?Sized> Reporter for std::sync::Arc<R> {
    fn kubectl_exit_code(&self, namespace: &str, code: i32) {
        (**self).kubectl_exit_code(namespace, code)
    }

    fn namespace_apply(&self, target: &str, success: bool) {
        (**self).namespace_apply(target, success)
    }

    fn run_latency(&self, seconds: f64, success: bool) {
        (**self).run_latency(seconds, success)
    }

    fn result_summary(&self, attempts: &[ApplyAttempt]) {
        (**self).result_summary(attempts)
    }
}

