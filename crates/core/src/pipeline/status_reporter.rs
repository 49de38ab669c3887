use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// Host-visible state of the detector.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeStatus {
    LoadingModel(&'static str),
    ModelReady(&'static str),
    RunningInference,
    Idle,
    Error(String),
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeStatus::LoadingModel(model) => write!(f, "loading {model} model..."),
            NodeStatus::ModelReady(model) => write!(f, "{model} model is ready"),
            NodeStatus::RunningInference => write!(f, "running inference..."),
            NodeStatus::Idle => write!(f, "idle"),
            NodeStatus::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

/// Cross-cutting sink for status transitions and stage timings.
///
/// Shared between the model loader threads and the pipeline, hence `&self`.
pub trait StatusReporter: Send + Sync {
    fn status(&self, status: NodeStatus);

    /// Record how long a named pipeline stage took. Default: no-op.
    fn timing(&self, _stage: &str, _duration_ms: f64) {}

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent reporter that discards all events.
pub struct NullStatusReporter;

impl StatusReporter for NullStatusReporter {
    fn status(&self, _status: NodeStatus) {}
}

/// Reporter that forwards to the `log` crate and keeps what it saw.
///
/// Errors are logged at error level, everything else at info. Stage
/// timings are kept for the summary.
pub struct LogStatusReporter {
    history: Mutex<Vec<NodeStatus>>,
    timings: Mutex<HashMap<String, Vec<f64>>>,
    start_time: Instant,
}

impl LogStatusReporter {
    pub fn new() -> Self {
        Self {
            history: Mutex::new(Vec::new()),
            timings: Mutex::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    pub fn history(&self) -> Vec<NodeStatus> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn latest(&self) -> Option<NodeStatus> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn timings_for(&self, stage: &str) -> Option<Vec<f64>> {
        self.timings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(stage)
            .cloned()
    }

    /// Returns the formatted summary string, or `None` if no timing recorded.
    pub fn summary_string(&self) -> Option<String> {
        let timings = self.timings.lock().unwrap_or_else(PoisonError::into_inner);
        if timings.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Inference summary ({:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            lines.push(format!(
                "  {stage:10}: {:4} calls  avg {avg_ms:6.1}ms  total {total_ms:7.0}ms",
                durations.len()
            ));
        }

        Some(lines.join("\n"))
    }
}

impl Default for LogStatusReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusReporter for LogStatusReporter {
    fn status(&self, status: NodeStatus) {
        match &status {
            NodeStatus::Error(_) => log::error!("{status}"),
            NodeStatus::Idle => log::debug!("{status}"),
            _ => log::info!("{status}"),
        }
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(status);
    }

    fn timing(&self, stage: &str, duration_ms: f64) {
        self.timings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
