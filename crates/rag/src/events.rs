//! Structured observability for pipeline invocations.
//!
//! An `EventReporter` is handed to the pipeline by its caller and scoped to
//! one invocation through `begin_run`, which stamps a fresh run id and clock.
//! Events always go to `tracing`; a callback receives them too when set.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Pipeline stage an event or timing belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Decompose,
    Retrieve,
    Answer,
    Verify,
    Select,
    Fuse,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Decompose => "decompose",
            Stage::Retrieve => "retrieve",
            Stage::Answer => "answer",
            Stage::Verify => "verify",
            Stage::Select => "select",
            Stage::Fuse => "fuse",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event emitted while a pipeline invocation runs.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineEvent {
    /// Invocation this event belongs to
    pub run_id: Uuid,

    pub stage: Stage,

    /// Sub-question index for per-item events
    pub index: Option<usize>,

    /// Human-readable message
    pub message: String,

    /// Seconds since the invocation started
    pub elapsed_secs: f64,
}

impl PipelineEvent {
    /// Format as a simple user-facing line.
    pub fn format_simple(&self) -> String {
        match self.index {
            Some(i) => format!(
                "[{:>7.2}s] {} #{} - {}",
                self.elapsed_secs,
                self.stage,
                i + 1,
                self.message
            ),
            None => format!("[{:>7.2}s] {} - {}", self.elapsed_secs, self.stage, self.message),
        }
    }
}

/// Callback for pipeline events.
pub type EventCallback = Arc<dyn Fn(PipelineEvent) + Send + Sync>;

/// Emits events for one pipeline invocation.
#[derive(Clone)]
pub struct EventReporter {
    callback: Option<EventCallback>,
    run_id: Uuid,
    start_time: Instant,
}

impl EventReporter {
    /// Create a reporter that forwards events to `callback`.
    pub fn new(callback: EventCallback) -> Self {
        Self {
            callback: Some(callback),
            run_id: Uuid::new_v4(),
            start_time: Instant::now(),
        }
    }

    /// Create a reporter that only logs.
    pub fn noop() -> Self {
        Self {
            callback: None,
            run_id: Uuid::new_v4(),
            start_time: Instant::now(),
        }
    }

    /// A reporter for a new invocation: same sink, fresh run id and clock.
    pub fn begin_run(&self) -> Self {
        Self {
            callback: self.callback.clone(),
            run_id: Uuid::new_v4(),
            start_time: Instant::now(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Emit a stage-level event.
    pub fn stage(&self, stage: Stage, message: impl Into<String>) {
        self.emit(stage, None, message.into());
    }

    /// Emit an event about one sub-question.
    pub fn item(&self, stage: Stage, index: usize, message: impl Into<String>) {
        self.emit(stage, Some(index), message.into());
    }

    fn emit(&self, stage: Stage, index: Option<usize>, message: String) {
        let event = PipelineEvent {
            run_id: self.run_id,
            stage,
            index,
            message,
            elapsed_secs: self.start_time.elapsed().as_secs_f64(),
        };

        tracing::debug!(
            run_id = %event.run_id,
            stage = %event.stage,
            index = ?event.index,
            elapsed_secs = event.elapsed_secs,
            message = %event.message,
            "Pipeline event"
        );

        if let Some(callback) = &self.callback {
            callback(event);
        }
    }
}

impl Default for EventReporter {
    fn default() -> Self {
        Self::noop()
    }
}

/// Wall-clock time spent in one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub secs: f64,
}

/// Collects per-stage timings for one invocation.
#[derive(Debug, Default)]
pub struct StageTimer {
    timings: Vec<StageTiming>,
}

impl StageTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record how long `started` has been running under `stage`.
    pub fn record(&mut self, stage: Stage, started: Instant) {
        self.timings.push(StageTiming {
            stage,
            secs: started.elapsed().as_secs_f64(),
        });
    }

    pub fn finish(self) -> Vec<StageTiming> {
        self.timings
    }
}
