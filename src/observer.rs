//! Run states and the observer hook that reports them.
//!
//! Inject an [`Arc<dyn PipelineObserver>`] via
//! [`crate::review::ReviewPipeline::with_observer`] to see each run move
//! through its states. This is instrumentation for the host process (metrics,
//! test assertions, a CLI spinner); nothing here is returned to HTTP callers.
//!
//! Runs execute concurrently, so one observer receives interleaved events
//! from many runs. Implementations must synchronise their own state.

use crate::error::ReviewError;
use std::fmt;
use std::sync::Arc;

/// Where a run currently is.
///
/// Runs advance one step at a time on success; `Failed` is reachable from
/// every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Idle,
    Fetching,
    Extracting,
    Analyzing,
    Rendering,
    Publishing,
    Done,
    Failed,
}

impl PipelineState {
    /// The state that follows `self` on success. Terminal states have none.
    pub fn next(self) -> Option<PipelineState> {
        use PipelineState::*;
        match self {
            Idle => Some(Fetching),
            Fetching => Some(Extracting),
            Extracting => Some(Analyzing),
            Analyzing => Some(Rendering),
            Rendering => Some(Publishing),
            Publishing => Some(Done),
            Done | Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    /// Lower-case label for log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Fetching => "fetching",
            PipelineState::Extracting => "extracting",
            PipelineState::Analyzing => "analyzing",
            PipelineState::Rendering => "rendering",
            PipelineState::Publishing => "publishing",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives state transitions from the review pipeline.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait PipelineObserver: Send + Sync {
    /// Called every time a run enters a new state, including `Done` and
    /// `Failed`.
    ///
    /// # Arguments
    /// * `run_id` - identifier shared by every event of one run
    /// * `from`   - state being left
    /// * `to`     - state being entered
    fn on_transition(&self, run_id: &str, from: PipelineState, to: PipelineState) {
        let _ = (run_id, from, to);
    }

    /// Called once when a run fails, right before the `Failed` transition.
    ///
    /// # Arguments
    /// * `run_id` - run identifier
    /// * `stage`  - the state that was active when the error occurred
    /// * `error`  - the error the run will return
    fn on_failure(&self, run_id: &str, stage: PipelineState, error: &ReviewError) {
        let _ = (run_id, stage, error);
    }
}

/// Observer that ignores every event. Used when none is configured.
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Shared observer handle.
pub type SharedObserver = Arc<dyn PipelineObserver>;
