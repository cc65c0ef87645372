//! In-memory reporter for testing
//!
//! Records every call so tests can assert on what was reported and in which
//! order, without a metrics registry.

use std::sync::{Arc, Mutex};

use kapplier_core::ApplyAttempt;

use super::Reporter;

/// A single reporter call
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedEvent {
    KubectlExitCode { namespace: String, code: i32 },
    NamespaceApply { target: String, success: bool },
    RunLatency { success: bool },
    ResultSummary { targets: Vec<String> },
}

/// Reporter that keeps a log of calls
#[derive(Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, oldest first
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.lock().clone()
    }

    /// `(target, success)` of every apply reported
    pub fn namespace_applies(&self) -> Vec<(String, bool)> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                RecordedEvent::NamespaceApply { target, success } => {
                    Some((target.clone(), *success))
                }
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RecordedEvent>> {
        // A poisoned log only means a test already panicked
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, event: RecordedEvent) {
        self.lock().push(event);
    }
}

impl Reporter for RecordingReporter {
    fn kubectl_exit_code(&self, namespace: &str, code: i32) {
        self.push(RecordedEvent::KubectlExitCode {
            namespace: namespace.to_string(),
            code,
        });
    }

    fn namespace_apply(&self, target: &str, success: bool) {
        self.push(RecordedEvent::NamespaceApply {
            target: target.to_string(),
            success,
        });
    }

    fn run_latency(&self, _seconds: f64, success: bool) {
        self.push(RecordedEvent::RunLatency { success });
    }

    fn result_summary(&self, attempts: &[ApplyAttempt]) {
        self.push(RecordedEvent::ResultSummary {
            targets: attempts.iter().map(|a| a.target.clone()).collect(),
        });
    }
}
