//! Crash reporting seam.
//!
//! Every failure the public surface swallows is handed to a
//! [`CrashReporter`] first. Reporting is fire-and-forget: implementations
//! must not panic and have no way to fail back into the caller.

use parking_lot::Mutex;
use std::error::Error;
use tracing::error;

/// Sink for failures that the caller will only see as a sentinel value.
pub trait CrashReporter: Send + Sync {
    fn report(&self, message: &str, error: &(dyn Error + 'static));
}

/// Render `error` and every cause below it as `a: b: c`.
pub fn error_chain(error: &(dyn Error + 'static)) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        // thiserror messages often already embed their source.
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}

/// Emits each report as a `tracing` error event.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl CrashReporter for TracingReporter {
    fn report(&self, message: &str, error: &(dyn Error + 'static)) {
        error!(error = %error_chain(error), "{message}");
    }
}

/// One captured report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub message: String,
    pub error: String,
}

/// Keeps every report in memory. Handy for asserting on fail-soft paths.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<Report>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }

    pub fn clear(&self) {
        self.reports.lock().clear();
    }
}

impl CrashReporter for RecordingReporter {
    fn report(&self, message: &str, error: &(dyn Error + 'static)) {
        self.reports.lock().push(Report {
            message: message.to_string(),
            error: error_chain(error),
        });
    }
}
